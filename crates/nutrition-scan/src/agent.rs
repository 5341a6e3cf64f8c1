//! # Acquisition Agent
//!
//! Runs one acquisition session on a single Tokio task. Detections, user
//! intents and service completions all arrive on the same command channel,
//! so every transition is applied in order by one writer.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    AcquisitionAgent Architecture                        │
//! │                                                                         │
//! │   FramePipeline ──try_send──┐                                          │
//! │                             │                                          │
//! │   UI intents ─────send──────┼──► command channel (bounded)             │
//! │   (confirm, submit, ...)    │            │                             │
//! │                             │            ▼                             │
//! │   spawned service calls ────┘   ┌──────────────────────┐               │
//! │   (tagged completions)          │  agent task          │               │
//! │        ▲                        │  session.apply(ev)   │               │
//! │        │                        │        │             │               │
//! │        │      Effect::Lookup    │        ▼             │               │
//! │        └────── Effect::Create ◄─┤  execute effect      │               │
//! │                                 │  publish status      │──► watch      │
//! │   PantryNotifier ◄── Effect::NotifyPantry              │   (observers) │
//! │                                 └──────────────────────┘               │
//! │                                                                         │
//! │  Service calls never block the task: they run in their own spawned     │
//! │  tasks, bounded by the configured timeout, and report back through     │
//! │  the channel tagged with the session that issued them.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use nutrition_core::validation::validate_product_form;
use nutrition_core::{
    AcquisitionEvent, AcquisitionSession, AcquisitionStatus, DetectionResult, Effect,
    IgnoreReason, Outcome, ProductForm, ProductRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::detector::DetectionConsumer;
use crate::error::{ScanError, ScanResult};
use crate::service::{call_with_timeout, ProductService};

// =============================================================================
// Pantry Collaborator
// =============================================================================

/// Receives products the user added to their pantry.
///
/// Fire-and-forget: the agent does not wait for, or look at, the outcome.
#[async_trait]
pub trait PantryNotifier: Send + Sync + 'static {
    async fn add_to_pantry(&self, product: ProductRecord);
}

/// Pantry that discards everything.
pub struct NoOpPantry;

#[async_trait]
impl PantryNotifier for NoOpPantry {
    async fn add_to_pantry(&self, _product: ProductRecord) {}
}

// =============================================================================
// Commands
// =============================================================================

/// Messages processed by the agent task.
#[derive(Debug)]
enum Command {
    /// Apply an event; reply with the outcome if someone is waiting.
    Apply {
        event: AcquisitionEvent,
        reply: Option<oneshot::Sender<Outcome>>,
    },
    /// Stop the agent task.
    Shutdown,
}

// =============================================================================
// Acquisition Agent
// =============================================================================

/// Owns the acquisition session. Created by [`AcquisitionAgentBuilder`],
/// started with [`AcquisitionAgent::start`].
pub struct AcquisitionAgent {
    session: AcquisitionSession,
    service: Arc<dyn ProductService>,
    pantry: Arc<dyn PantryNotifier>,
    call_timeout: Duration,
    command_buffer: usize,
    stale_discarded: u64,
}

impl AcquisitionAgent {
    fn new(
        config: &ScanConfig,
        service: Arc<dyn ProductService>,
        pantry: Arc<dyn PantryNotifier>,
    ) -> Self {
        let session =
            AcquisitionSession::new().with_accepted_symbologies(config.symbologies().to_vec());

        AcquisitionAgent {
            session,
            service,
            pantry,
            call_timeout: config.call_timeout(),
            command_buffer: config.agent.command_buffer,
            stale_discarded: 0,
        }
    }

    /// Spawns the agent task on the current Tokio runtime.
    pub fn start(self) -> AcquisitionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.command_buffer);
        let (status_tx, status_rx) = watch::channel(self.session.status(0));

        let runner = AgentRunner {
            agent: self,
            self_tx: cmd_tx.downgrade(),
            status_tx,
        };
        tokio::spawn(runner.run(cmd_rx));

        AcquisitionHandle { cmd_tx, status_rx }
    }
}

/// The running agent plus its channel ends.
struct AgentRunner {
    agent: AcquisitionAgent,
    /// Weak so that dropping every handle stops the task.
    self_tx: mpsc::WeakSender<Command>,
    status_tx: watch::Sender<AcquisitionStatus>,
}

impl AgentRunner {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        info!(session_id = %self.agent.session.id(), "Acquisition agent started");

        while let Some(command) = cmd_rx.recv().await {
            match command {
                Command::Apply { event, reply } => {
                    let outcome = self.handle(event);
                    if let Some(reply) = reply {
                        let _ = reply.send(outcome);
                    }
                }
                Command::Shutdown => {
                    info!("Acquisition agent received shutdown");
                    break;
                }
            }
        }

        info!(
            stale_discarded = self.agent.stale_discarded,
            "Acquisition agent stopped"
        );
    }

    /// Applies one event and carries out its effect.
    fn handle(&mut self, event: AcquisitionEvent) -> Outcome {
        let event_name = event.name();
        let outcome = self.agent.session.apply(event);

        match &outcome {
            Outcome::Applied(effect) => {
                debug!(
                    session_id = %self.agent.session.id(),
                    event = event_name,
                    state = %self.agent.session.state(),
                    "Transition applied"
                );
                if let Some(effect) = effect {
                    self.execute(effect.clone());
                }
                self.publish();
            }
            Outcome::Ignored(IgnoreReason::StaleSession) => {
                self.agent.stale_discarded += 1;
                info!(
                    session_id = %self.agent.session.id(),
                    event = event_name,
                    "Discarded completion from a superseded session"
                );
                self.publish();
            }
            Outcome::Ignored(reason) => {
                debug!(
                    event = event_name,
                    state = %self.agent.session.state(),
                    reason = %reason,
                    "Event ignored"
                );
            }
        }

        outcome
    }

    fn publish(&self) {
        self.status_tx
            .send_replace(self.agent.session.status(self.agent.stale_discarded));
    }

    /// Spawns the work an effect asks for.
    fn execute(&self, effect: Effect) {
        match effect {
            Effect::Lookup { session, code } => {
                let service = self.agent.service.clone();
                let limit = self.agent.call_timeout;
                let tx = self.self_tx.clone();

                tokio::spawn(async move {
                    debug!(session_id = %session, code = %code, "Looking up product");
                    let result = call_with_timeout(limit, service.lookup_by_code(&code)).await;
                    if let Err(e) = &result {
                        warn!(session_id = %session, code = %code, error = %e, "Lookup failed");
                    }
                    post(&tx, AcquisitionEvent::LookupCompleted { session, result }).await;
                });
            }

            Effect::Create { session, product } => {
                let service = self.agent.service.clone();
                let limit = self.agent.call_timeout;
                let tx = self.self_tx.clone();

                tokio::spawn(async move {
                    debug!(session_id = %session, code = %product.barcode, "Creating product");
                    let result = call_with_timeout(limit, service.create_product(&product)).await;
                    if let Err(e) = &result {
                        warn!(
                            session_id = %session,
                            code = %product.barcode,
                            error = %e,
                            "Create failed"
                        );
                    }
                    post(&tx, AcquisitionEvent::CreateCompleted { session, result }).await;
                });
            }

            Effect::NotifyPantry(product) => {
                let pantry = self.agent.pantry.clone();
                info!(code = %product.barcode, "Adding product to pantry");
                tokio::spawn(async move {
                    pantry.add_to_pantry(product).await;
                });
            }
        }
    }
}

/// Posts a completion back to the agent, if it is still running.
async fn post(tx: &mpsc::WeakSender<Command>, event: AcquisitionEvent) {
    let Some(tx) = tx.upgrade() else {
        debug!(event = event.name(), "Agent gone, dropping completion");
        return;
    };
    if tx.send(Command::Apply { event, reply: None }).await.is_err() {
        debug!("Agent stopped before completion could be applied");
    }
}

// =============================================================================
// Agent Handle (for external control)
// =============================================================================

/// Cloneable handle used by the presentation layer and the frame pipeline.
#[derive(Clone)]
pub struct AcquisitionHandle {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<AcquisitionStatus>,
}

impl AcquisitionHandle {
    async fn apply(&self, event: AcquisitionEvent) -> ScanResult<Outcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Apply {
                event,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| ScanError::ShuttingDown)?;

        reply_rx.await.map_err(|_| ScanError::ShuttingDown)
    }

    /// Confirms the detected code (or retries a failed lookup).
    pub async fn confirm(&self) -> ScanResult<Outcome> {
        self.apply(AcquisitionEvent::Confirm).await
    }

    /// Opens manual entry.
    pub async fn enter_manually(&self) -> ScanResult<Outcome> {
        self.apply(AcquisitionEvent::EnterManually).await
    }

    /// Validates the form and submits it.
    ///
    /// An invalid form is returned as [`ScanError::Validation`] and never
    /// reaches the session.
    pub async fn submit_form(&self, form: &ProductForm) -> ScanResult<Outcome> {
        let product = validate_product_form(form)?;
        self.apply(AcquisitionEvent::SubmitForm(product)).await
    }

    /// Adds the fetched or created product to the pantry.
    pub async fn add_to_pantry(&self) -> ScanResult<Outcome> {
        self.apply(AcquisitionEvent::AddToPantry).await
    }

    /// "Scan another": starts a fresh session.
    pub async fn reset(&self) -> ScanResult<Outcome> {
        self.apply(AcquisitionEvent::Reset).await
    }

    /// Latest published status.
    pub fn status(&self) -> AcquisitionStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<AcquisitionStatus> {
        self.status_rx.clone()
    }

    /// Waits until the published status satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> ScanResult<AcquisitionStatus>
    where
        F: FnMut(&AcquisitionStatus) -> bool,
    {
        let mut rx = self.status_rx.clone();
        let status = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ScanError::ShuttingDown)?;
        Ok(status.clone())
    }

    /// Signals the agent to stop. Outstanding calls finish unobserved.
    pub async fn shutdown(&self) -> ScanResult<()> {
        self.cmd_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| ScanError::ShuttingDown)
    }
}

impl AcquisitionHandle {
    /// Queues a detection without waiting for channel capacity.
    ///
    /// Empty detections are accepted and discarded. A full channel is
    /// [`ScanError::ChannelError`]; a stopped agent is
    /// [`ScanError::ShuttingDown`].
    pub fn offer_detection(&self, result: DetectionResult) -> ScanResult<()> {
        if result.is_empty() {
            return Ok(());
        }

        let command = Command::Apply {
            event: AcquisitionEvent::Detected(result),
            reply: None,
        };
        self.cmd_tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ScanError::ChannelError("command channel full".into())
            }
            mpsc::error::TrySendError::Closed(_) => ScanError::ShuttingDown,
        })
    }
}

impl DetectionConsumer for AcquisitionHandle {
    /// Forwards a detection without blocking the analyzer thread.
    fn on_detection(&self, result: DetectionResult) {
        if let Err(e) = self.offer_detection(result) {
            debug!(error = %e, retryable = e.is_retryable(), "Dropping detection");
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating an AcquisitionAgent with options.
#[derive(Default)]
pub struct AcquisitionAgentBuilder {
    config: Option<ScanConfig>,
    service: Option<Arc<dyn ProductService>>,
    pantry: Option<Arc<dyn PantryNotifier>>,
}

impl AcquisitionAgentBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration (defaults otherwise).
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the product service.
    pub fn with_service(mut self, service: Arc<dyn ProductService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the pantry collaborator.
    pub fn with_pantry(mut self, pantry: Arc<dyn PantryNotifier>) -> Self {
        self.pantry = Some(pantry);
        self
    }

    /// Builds the AcquisitionAgent.
    pub fn build(self) -> ScanResult<AcquisitionAgent> {
        let service = self
            .service
            .ok_or_else(|| ScanError::InvalidConfig("Product service required".into()))?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let pantry = self.pantry.unwrap_or_else(|| Arc::new(NoOpPantry));

        Ok(AcquisitionAgent::new(&config, service, pantry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrition_core::{
        AcquisitionState, CreateResult, DetectedCode, LookupResult, NewProduct, ServerError,
        ServiceError, Symbology,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    // =========================================================================
    // Test Doubles
    // =========================================================================

    #[derive(Default)]
    struct MockService {
        products: Mutex<HashMap<String, ProductRecord>>,
        lookups: AtomicUsize,
        creates: AtomicUsize,
        /// Calls wait for a permit when set.
        gate: Option<Arc<Semaphore>>,
        /// Calls sleep this long before answering.
        delay: Option<Duration>,
        /// Every call fails with this error when set.
        failure: Option<ServiceError>,
    }

    impl MockService {
        fn with_product(barcode: &str) -> Self {
            let service = MockService::default();
            let mut product = ProductRecord::new(barcode);
            product.name = Some("Oats".into());
            service
                .products
                .lock()
                .unwrap()
                .insert(barcode.to_string(), product);
            service
        }

        async fn wait(&self) {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl ProductService for MockService {
        async fn lookup_by_code(&self, code: &str) -> LookupResult {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.wait().await;
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            Ok(self.products.lock().unwrap().get(code).cloned())
        }

        async fn create_product(&self, product: &NewProduct) -> CreateResult {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.wait().await;
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            let record = ProductRecord::from(product.clone());
            self.products
                .lock()
                .unwrap()
                .insert(record.barcode.clone(), record.clone());
            Ok(record)
        }
    }

    struct ChannelPantry(mpsc::UnboundedSender<ProductRecord>);

    #[async_trait]
    impl PantryNotifier for ChannelPantry {
        async fn add_to_pantry(&self, product: ProductRecord) {
            self.0.send(product).ok();
        }
    }

    fn start(service: Arc<MockService>) -> AcquisitionHandle {
        AcquisitionAgentBuilder::new()
            .with_service(service)
            .build()
            .unwrap()
            .start()
    }

    fn detection(code: &str) -> DetectionResult {
        DetectionResult::new(vec![DetectedCode::new(code, Symbology::Ean13)], 640, 480)
    }

    async fn detect(handle: &AcquisitionHandle, code: &str) {
        handle.on_detection(detection(code));
        handle
            .wait_for(|s| s.state == AcquisitionState::BarcodeDetected)
            .await
            .unwrap();
    }

    fn acme_bar_form() -> ProductForm {
        ProductForm {
            barcode: "9999999999999".into(),
            brand: "Acme".into(),
            name: "Bar".into(),
            energy: "230".into(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_lookup_round_trip() {
        let service = Arc::new(MockService::with_product("0123456789012"));
        let handle = start(service.clone());

        detect(&handle, "0123456789012").await;
        assert_eq!(handle.status().active_code.as_deref(), Some("0123456789012"));

        let outcome = handle.confirm().await.unwrap();
        assert!(matches!(outcome.effect(), Some(Effect::Lookup { .. })));

        let status = handle
            .wait_for(|s| s.state == AcquisitionState::Fetched)
            .await
            .unwrap();
        assert_eq!(status.product.unwrap().barcode, "0123456789012");
        assert_eq!(service.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_double_confirm_issues_one_lookup() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(MockService {
            gate: Some(gate.clone()),
            ..MockService::with_product("0123456789012")
        });
        let handle = start(service.clone());

        detect(&handle, "0123456789012").await;
        assert!(handle.confirm().await.unwrap().is_applied());
        assert_eq!(
            handle.confirm().await.unwrap(),
            Outcome::Ignored(IgnoreReason::CallInFlight)
        );

        gate.add_permits(1);
        handle
            .wait_for(|s| s.state == AcquisitionState::Fetched)
            .await
            .unwrap();
        assert_eq!(service.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detections_after_first_are_ignored() {
        let handle = start(Arc::new(MockService::default()));

        detect(&handle, "0123456789012").await;
        handle.on_detection(detection("4006381333931"));
        handle.on_detection(detection("96385074"));

        // Round-trip an intent so the detections above have been processed.
        handle.add_to_pantry().await.unwrap();
        let status = handle.status();
        assert_eq!(status.state, AcquisitionState::BarcodeDetected);
        assert_eq!(status.active_code.as_deref(), Some("0123456789012"));
    }

    #[tokio::test]
    async fn test_not_found_then_create() {
        let service = Arc::new(MockService::default());
        let handle = start(service.clone());

        detect(&handle, "9999999999999").await;
        handle.confirm().await.unwrap();
        handle
            .wait_for(|s| s.state == AcquisitionState::NotFound)
            .await
            .unwrap();

        handle.submit_form(&acme_bar_form()).await.unwrap();
        let status = handle
            .wait_for(|s| s.state == AcquisitionState::Created)
            .await
            .unwrap();

        let product = status.product.unwrap();
        assert_eq!(product.barcode, "9999999999999");
        assert_eq!(product.brand.as_deref(), Some("Acme"));
        assert_eq!(service.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_session() {
        let service = Arc::new(MockService::default());
        let handle = start(service.clone());
        handle.enter_manually().await.unwrap();

        let mut form = acme_bar_form();
        form.fat = "plenty".into();
        let err = handle.submit_form(&form).await.unwrap_err();

        assert!(matches!(err, ScanError::Validation(_)));
        assert_eq!(handle.status().state, AcquisitionState::AddProductManually);
        assert_eq!(service.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_errors_surface_in_state() {
        let errors = vec![ServerError::new("permission denied")];
        let service = Arc::new(MockService {
            failure: Some(ServiceError::Server(errors.clone())),
            ..Default::default()
        });
        let handle = start(service);

        detect(&handle, "0123456789012").await;
        handle.confirm().await.unwrap();
        let status = handle
            .wait_for(|s| s.state.is_failure())
            .await
            .unwrap();

        assert_eq!(status.state, AcquisitionState::Error(errors.clone()));
        assert_eq!(status.last_error, Some(ServiceError::Server(errors)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_exception_then_reset() {
        let service = Arc::new(MockService {
            delay: Some(Duration::from_secs(60)),
            ..MockService::with_product("0123456789012")
        });
        let mut config = ScanConfig::default();
        config.agent.call_timeout_secs = 1;
        let handle = AcquisitionAgentBuilder::new()
            .with_config(config)
            .with_service(service)
            .build()
            .unwrap()
            .start();

        detect(&handle, "0123456789012").await;
        handle.confirm().await.unwrap();
        let status = handle
            .wait_for(|s| matches!(s.state, AcquisitionState::Exception(_)))
            .await
            .unwrap();
        assert!(matches!(status.last_error, Some(ServiceError::Transport(_))));

        let old_session = status.session_id;
        handle.reset().await.unwrap();
        let status = handle.status();
        assert_eq!(status.state, AcquisitionState::Scanning);
        assert_eq!(status.active_code, None);
        assert_eq!(status.product, None);
        assert_ne!(status.session_id, old_session);
    }

    #[tokio::test]
    async fn test_late_response_after_reset_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(MockService {
            gate: Some(gate.clone()),
            ..MockService::with_product("0123456789012")
        });
        let handle = start(service);

        detect(&handle, "0123456789012").await;
        handle.confirm().await.unwrap();
        handle.reset().await.unwrap();
        detect(&handle, "4006381333931").await;

        // Let the first lookup answer now that its session is gone.
        gate.add_permits(1);
        let status = handle.wait_for(|s| s.stale_discarded == 1).await.unwrap();

        assert_eq!(status.state, AcquisitionState::BarcodeDetected);
        assert_eq!(status.active_code.as_deref(), Some("4006381333931"));
        assert_eq!(status.product, None);
    }

    #[tokio::test]
    async fn test_add_to_pantry_notifies_collaborator() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = AcquisitionAgentBuilder::new()
            .with_service(Arc::new(MockService::with_product("0123456789012")))
            .with_pantry(Arc::new(ChannelPantry(tx)))
            .build()
            .unwrap()
            .start();

        detect(&handle, "0123456789012").await;
        handle.confirm().await.unwrap();
        handle
            .wait_for(|s| s.state == AcquisitionState::Fetched)
            .await
            .unwrap();

        assert!(handle.add_to_pantry().await.unwrap().is_applied());
        let product = rx.recv().await.unwrap();
        assert_eq!(product.barcode, "0123456789012");

        let status = handle.status();
        assert_eq!(status.state, AcquisitionState::AddedToPantry);
        assert_eq!(status.product, None);
    }

    #[tokio::test]
    async fn test_symbology_filter_from_config() {
        let mut config = ScanConfig::default();
        config.detection.symbologies = vec![Symbology::Ean13];
        let handle = AcquisitionAgentBuilder::new()
            .with_config(config)
            .with_service(Arc::new(MockService::default()))
            .build()
            .unwrap()
            .start();

        handle.on_detection(DetectionResult::new(
            vec![
                DetectedCode::new("https://example.com", Symbology::QrCode),
                DetectedCode::new("4006381333931", Symbology::Ean13),
            ],
            640,
            480,
        ));
        let status = handle
            .wait_for(|s| s.state == AcquisitionState::BarcodeDetected)
            .await
            .unwrap();
        assert_eq!(status.active_code.as_deref(), Some("4006381333931"));
    }

    #[tokio::test]
    async fn test_offer_detection_reports_full_and_closed_channel() {
        // A handle whose command channel nobody drains.
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let (_status_tx, status_rx) = watch::channel(AcquisitionSession::new().status(0));
        let handle = AcquisitionHandle { cmd_tx, status_rx };

        assert!(handle.offer_detection(DetectionResult::empty(640, 480)).is_ok());
        assert!(handle.offer_detection(detection("0123456789012")).is_ok());

        let err = handle.offer_detection(detection("4006381333931")).unwrap_err();
        assert!(matches!(err, ScanError::ChannelError(_)));
        assert!(err.is_retryable());

        // Empty detections never occupy a slot.
        assert!(handle.offer_detection(DetectionResult::empty(640, 480)).is_ok());

        drop(cmd_rx);
        let err = handle.offer_detection(detection("4006381333931")).unwrap_err();
        assert!(matches!(err, ScanError::ShuttingDown));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_builder_requires_service() {
        let err = AcquisitionAgentBuilder::new().build().err().unwrap();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_intents_after_shutdown_fail() {
        let handle = start(Arc::new(MockService::default()));
        handle.shutdown().await.unwrap();

        // The status channel closes when the agent task exits.
        let mut rx = handle.subscribe();
        while rx.changed().await.is_ok() {}

        assert!(matches!(
            handle.confirm().await,
            Err(ScanError::ShuttingDown)
        ));
    }
}
