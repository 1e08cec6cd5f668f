//! Generation workflow state machine.
//!
//! `Idle -> Validating -> InFlight -> Succeeded | Failed -> Idle`
//!
//! While an attempt is in flight two tasks run side by side: the cosmetic
//! progress ticker and the backend call. Only the backend call decides the
//! terminal state; reaching it stops the ticker wherever it is. The ticker is
//! held in the shared slot so every exit path (success, failure, drop of the
//! attempt, [`Orchestrator::dispose`]) can release it.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    backend::{BackendError, GeneratedRecord, WebsiteBackend},
    error::WizardError,
    models::{GeneratePayload, GeneratedWebsite, GenerationProgress, Notification, SessionUser},
    progress::{ProgressHandle, ProgressSimulator, ProgressSink},
    request::{self, FieldUpdate, GenerationRequest, RequiredField},
    templates,
};

const EVENT_CAPACITY: usize = 64;
/// Oldest notifications are dropped past this many undrained entries.
const NOTIFICATION_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    AuthenticationRequired,
    Transport,
    MalformedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Validating,
    InFlight,
    Succeeded { website: GeneratedWebsite },
    Failed { reason: FailureReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Progress(GenerationProgress),
    PhaseChanged(Phase),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub display_name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardStatus {
    pub phase: Phase,
    pub is_generating: bool,
    pub template: Option<TemplateSummary>,
    pub draft: GenerationRequest,
    pub progress: Option<GenerationProgress>,
}

/// A finished generation together with the business name it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedGeneration {
    pub website: GeneratedWebsite,
    pub business_name: String,
}

struct Slot {
    phase: Phase,
    draft: GenerationRequest,
    progress: Option<GenerationProgress>,
    attempt: Option<Uuid>,
    ticker: Option<ProgressHandle>,
    submitted_name: Option<String>,
    notifications: VecDeque<Notification>,
    disposed: bool,
}

impl Slot {
    fn push_notification(&mut self, notification: Notification) {
        if self.notifications.len() == NOTIFICATION_CAPACITY {
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn WebsiteBackend>,
    simulator: ProgressSimulator,
    slot: Arc<Mutex<Slot>>,
    events: broadcast::Sender<WizardEvent>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn WebsiteBackend>, simulator: ProgressSimulator) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            simulator,
            slot: Arc::new(Mutex::new(Slot {
                phase: Phase::Idle,
                draft: GenerationRequest::default(),
                progress: None,
                attempt: None,
                ticker: None,
                submitted_name: None,
                notifications: VecDeque::new(),
                disposed: false,
            })),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WizardEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub fn status(&self) -> WizardStatus {
        let slot = self.slot.lock();
        WizardStatus {
            phase: slot.phase.clone(),
            is_generating: slot.phase == Phase::InFlight,
            template: slot.draft.template_id.as_ref().map(|id| TemplateSummary {
                id: id.clone(),
                display_name: templates::display_name_or_placeholder(id),
            }),
            draft: slot.draft.clone(),
            progress: slot.progress.clone(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.slot.lock().phase == Phase::InFlight
    }

    pub fn select_template(&self, id: &str) -> Result<(), WizardError> {
        let descriptor = templates::get(id).ok_or_else(|| WizardError::UnknownTemplate(id.to_string()))?;
        let mut slot = self.slot.lock();
        let draft = std::mem::take(&mut slot.draft);
        slot.draft = request::update_field(draft, FieldUpdate::TemplateId(descriptor.id.to_string()));
        info!("🎨 Template selected: {}", descriptor.display_name);
        Ok(())
    }

    pub fn update_field(&self, update: FieldUpdate) -> GenerationRequest {
        let mut slot = self.slot.lock();
        let draft = std::mem::take(&mut slot.draft);
        slot.draft = request::update_field(draft, update);
        slot.draft.clone()
    }

    /// The current result, if the last attempt succeeded.
    pub fn result(&self) -> Option<CompletedGeneration> {
        let slot = self.slot.lock();
        match &slot.phase {
            Phase::Succeeded { website } => Some(CompletedGeneration {
                website: website.clone(),
                business_name: slot.submitted_name.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }

    pub fn notify(&self, notification: Notification) {
        self.slot.lock().push_notification(notification);
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.slot.lock().notifications).into()
    }

    /// Runs a whole attempt: guards, progress, backend call, terminal transition.
    pub async fn submit(&self, user: Option<&SessionUser>) -> Result<GeneratedWebsite, WizardError> {
        self.begin(user)?.run().await
    }

    /// Checks the guards and enters `InFlight`. Guard failures never reach the network.
    pub fn begin(&self, user: Option<&SessionUser>) -> Result<Attempt, WizardError> {
        let mut slot = self.slot.lock();
        if slot.disposed {
            return Err(WizardError::Closed);
        }
        if matches!(slot.phase, Phase::InFlight | Phase::Validating) {
            return Err(WizardError::AlreadyGenerating);
        }

        // A new submit discards whatever the previous attempt left behind.
        slot.phase = Phase::Idle;
        slot.submitted_name = None;
        slot.progress = None;

        let Some(user) = user else {
            slot.phase = Phase::Failed { reason: FailureReason::AuthenticationRequired };
            slot.push_notification(Notification::destructive(
                "Authentication Required",
                "Please sign in to generate a website.",
            ));
            drop(slot);
            warn!("generation refused: no signed-in user");
            self.emit(WizardEvent::PhaseChanged(Phase::Failed { reason: FailureReason::AuthenticationRequired }));
            return Err(WizardError::AuthenticationRequired);
        };

        slot.phase = Phase::Validating;
        let checked = request::validate(&slot.draft)
            .into_result()
            .and_then(|()| request::to_payload(&slot.draft, user));
        let payload = match checked {
            Ok(payload) => payload,
            Err(err) => {
                slot.phase = Phase::Idle;
                slot.push_notification(validation_notification(&err));
                drop(slot);
                warn!("generation refused: {}", err);
                self.emit(WizardEvent::PhaseChanged(Phase::Idle));
                return Err(err);
            }
        };

        let id = Uuid::new_v4();
        slot.attempt = Some(id);
        slot.phase = Phase::InFlight;
        slot.submitted_name = Some(payload.business_name.clone());
        slot.progress = Some(GenerationProgress {
            step_index: 0,
            message: "Starting generation...".into(),
            percent: 0,
        });
        slot.ticker = Some(self.simulator.start(self.progress_sink(id)));
        drop(slot);

        info!(attempt = %id, "🚀 Generating {:?} with template {}", payload.business_name, payload.template);
        self.emit(WizardEvent::PhaseChanged(Phase::InFlight));
        Ok(Attempt { id, payload, orchestrator: self.clone(), settled: false })
    }

    fn progress_sink(&self, attempt: Uuid) -> ProgressSink {
        let this = self.clone();
        Arc::new(move |progress: GenerationProgress| {
            let mut slot = this.slot.lock();
            if slot.attempt != Some(attempt) || slot.phase != Phase::InFlight {
                return;
            }
            slot.progress = Some(progress.clone());
            drop(slot);
            this.emit(WizardEvent::Progress(progress));
        })
    }

    fn complete(
        &self,
        attempt: Uuid,
        payload: &GeneratePayload,
        outcome: Result<GeneratedRecord, BackendError>,
    ) -> Result<GeneratedWebsite, WizardError> {
        let mut slot = self.slot.lock();
        if slot.disposed || slot.attempt != Some(attempt) {
            drop(slot);
            warn!(attempt = %attempt, "discarding late backend response for an abandoned attempt");
            return Err(WizardError::Abandoned);
        }
        slot.stop_ticker();
        slot.attempt = None;

        match outcome {
            Ok(record) => {
                let name = record.name.unwrap_or_else(|| payload.name.clone());
                let website = GeneratedWebsite::from_backend(record.id, name);
                slot.phase = Phase::Succeeded { website: website.clone() };
                slot.push_notification(Notification::info(
                    "Website Generated!",
                    "Your website has been successfully created.",
                ));
                drop(slot);
                info!(attempt = %attempt, "✅ Website {} ready at {}", website.id, website.preview_url);
                self.emit(WizardEvent::PhaseChanged(Phase::Succeeded { website: website.clone() }));
                Ok(website)
            }
            Err(e) => {
                let err = WizardError::from(e);
                let reason = match err {
                    WizardError::MalformedResponse(_) => FailureReason::MalformedResponse,
                    _ => FailureReason::Transport,
                };
                slot.phase = Phase::Failed { reason };
                slot.push_notification(Notification::destructive(
                    "Generation Failed",
                    "There was an error generating your website. Please try again.",
                ));
                drop(slot);
                error!(attempt = %attempt, "❌ Generation failed: {}", err);
                self.emit(WizardEvent::PhaseChanged(Phase::Failed { reason }));
                Err(err)
            }
        }
    }

    fn abandon(&self, attempt: Uuid) {
        let mut slot = self.slot.lock();
        if slot.attempt != Some(attempt) {
            return;
        }
        slot.stop_ticker();
        slot.attempt = None;
        slot.progress = None;
        slot.phase = Phase::Idle;
        drop(slot);
        info!(attempt = %attempt, "generation attempt abandoned");
        self.emit(WizardEvent::PhaseChanged(Phase::Idle));
    }

    /// `Succeeded -> Idle`; the generated website is forgotten.
    pub fn dismiss(&self) -> Phase {
        self.return_to_idle(|phase| matches!(phase, Phase::Succeeded { .. }))
    }

    /// `Failed -> Idle`. Nothing is retried automatically.
    pub fn acknowledge(&self) -> Phase {
        self.return_to_idle(|phase| matches!(phase, Phase::Failed { .. }))
    }

    fn return_to_idle(&self, from: impl Fn(&Phase) -> bool) -> Phase {
        let mut slot = self.slot.lock();
        if !from(&slot.phase) {
            return slot.phase.clone();
        }
        slot.phase = Phase::Idle;
        slot.progress = None;
        slot.submitted_name = None;
        drop(slot);
        self.emit(WizardEvent::PhaseChanged(Phase::Idle));
        Phase::Idle
    }

    /// Tears the wizard down: the ticker stops and any response still on its way is dropped.
    pub fn dispose(&self) {
        let mut slot = self.slot.lock();
        slot.disposed = true;
        slot.stop_ticker();
        slot.attempt = None;
        slot.progress = None;
        slot.phase = Phase::Idle;
        drop(slot);
        info!("wizard disposed");
        self.emit(WizardEvent::PhaseChanged(Phase::Idle));
    }
}

fn validation_notification(err: &WizardError) -> Notification {
    match err {
        WizardError::Validation { missing } if missing.contains(&RequiredField::TemplateId) => {
            Notification::destructive("Template Required", "Please select a template first.")
        }
        WizardError::Validation { missing } => Notification::destructive(
            "Missing Information",
            format!("Please fill in: {}", RequiredField::join(missing)),
        ),
        other => Notification::destructive("Invalid Request", other.to_string()),
    }
}

/// One in-flight generation. Dropping it before [`Attempt::run`] finishes abandons the attempt.
pub struct Attempt {
    id: Uuid,
    payload: GeneratePayload,
    orchestrator: Orchestrator,
    settled: bool,
}

impl Attempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn run(mut self) -> Result<GeneratedWebsite, WizardError> {
        let outcome = self.orchestrator.backend.generate(&self.payload).await;
        self.settled = true;
        self.orchestrator.complete(self.id, &self.payload, outcome)
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if !self.settled {
            self.orchestrator.abandon(self.id);
        }
    }
}
