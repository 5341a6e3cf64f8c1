//! # Acquisition Module
//!
//! The product acquisition workflow as a pure transition function.
//!
//! ## State Diagram
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Acquisition Session Lifecycle                        │
//! │                                                                         │
//! │   ┌──────────┐  Detected   ┌─────────────────┐  Confirm   ┌──────────┐  │
//! │   │ Scanning │────────────►│ BarcodeDetected │───────────►│ Fetching │  │
//! │   └────┬─────┘             └────────┬────────┘            └────┬─────┘  │
//! │        │ EnterManually              │ EnterManually            │        │
//! │        ▼                            ▼                          │        │
//! │   ┌────────────────────┐                                       │        │
//! │   │ AddProductManually │── SubmitForm ──► Fetching (create)    │        │
//! │   └────────────────────┘                                       │        │
//! │                                                                │        │
//! │        ┌──────────────┬──────────────┬──────────────┬──────────┘        │
//! │        ▼              ▼              ▼              ▼                   │
//! │   ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐            │
//! │   │ Fetched │   │ NotFound │   │  Error   │   │ Exception  │            │
//! │   │ Created │   │          │   │ (server) │   │ (transport)│            │
//! │   └────┬────┘   └────┬─────┘   └──────────┘   └────────────┘            │
//! │        │ AddToPantry │ SubmitForm                                       │
//! │        ▼             ▼                                                  │
//! │   ┌───────────────┐  Fetching (create)                                  │
//! │   │ AddedToPantry │                                                     │
//! │   └───────────────┘                                                     │
//! │                                                                         │
//! │   Reset from ANY state → Scanning with a fresh SessionId                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects, Not I/O
//! `apply` never calls anything. When a transition needs the outside world
//! it returns an [`Effect`] and the runtime executes it, tagging the eventual
//! completion with the [`SessionId`] carried by the effect. Completions whose
//! tag no longer matches are ignored, so a response that arrives after a
//! reset cannot resurrect the old workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ServiceError;
use crate::types::{
    CreateResult, DetectionResult, LookupResult, NewProduct, ProductRecord, ServerError,
    SessionId, Symbology,
};

// =============================================================================
// State
// =============================================================================

/// Where the session is in acquiring a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "detail")]
pub enum AcquisitionState {
    /// Waiting for a detection (initial).
    Scanning,
    /// A code was picked; waiting for the user to confirm it.
    BarcodeDetected,
    /// One lookup or create call is outstanding.
    Fetching,
    /// Lookup found the product.
    Fetched,
    /// Lookup succeeded but no product is registered under the code.
    NotFound,
    /// Manual entry form is open.
    AddProductManually,
    /// The product was created.
    Created,
    /// The product was handed to the pantry.
    AddedToPantry,
    /// The server answered with GraphQL errors.
    Error(Vec<ServerError>),
    /// The call failed before the server could answer.
    Exception(String),
}

impl AcquisitionState {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Scanning => "scanning",
            AcquisitionState::BarcodeDetected => "barcode_detected",
            AcquisitionState::Fetching => "fetching",
            AcquisitionState::Fetched => "fetched",
            AcquisitionState::NotFound => "not_found",
            AcquisitionState::AddProductManually => "add_product_manually",
            AcquisitionState::Created => "created",
            AcquisitionState::AddedToPantry => "added_to_pantry",
            AcquisitionState::Error(_) => "error",
            AcquisitionState::Exception(_) => "exception",
        }
    }

    /// True for the two failure states.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Error(_) | AcquisitionState::Exception(_)
        )
    }

    /// True for the states that hold a product.
    pub fn holds_product(&self) -> bool {
        matches!(self, AcquisitionState::Fetched | AcquisitionState::Created)
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which external call a session issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Lookup,
    Create,
}

// =============================================================================
// Events, Effects, Outcomes
// =============================================================================

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// The pipeline analysed a frame.
    Detected(DetectionResult),
    /// The user confirmed the detected code.
    Confirm,
    /// The user chose to type the product in.
    EnterManually,
    /// The user submitted a validated manual form.
    SubmitForm(NewProduct),
    /// A lookup issued by `session` finished.
    LookupCompleted {
        session: SessionId,
        result: LookupResult,
    },
    /// A create issued by `session` finished.
    CreateCompleted {
        session: SessionId,
        result: CreateResult,
    },
    /// The user added the product to their pantry.
    AddToPantry,
    /// "Scan another".
    Reset,
}

impl AcquisitionEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionEvent::Detected(_) => "detected",
            AcquisitionEvent::Confirm => "confirm",
            AcquisitionEvent::EnterManually => "enter_manually",
            AcquisitionEvent::SubmitForm(_) => "submit_form",
            AcquisitionEvent::LookupCompleted { .. } => "lookup_completed",
            AcquisitionEvent::CreateCompleted { .. } => "create_completed",
            AcquisitionEvent::AddToPantry => "add_to_pantry",
            AcquisitionEvent::Reset => "reset",
        }
    }
}

/// Work the runtime must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call `lookupByCode(code)` and report back tagged with `session`.
    Lookup { session: SessionId, code: String },
    /// Call `createProduct(product)` and report back tagged with `session`.
    Create {
        session: SessionId,
        product: NewProduct,
    },
    /// Hand the product to the pantry collaborator. No completion expected.
    NotifyPantry(ProductRecord),
}

/// Why an event left the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Detection arrived while not scanning.
    NotScanning,
    /// Detection had no usable code.
    NoAcceptedCode,
    /// A call is already outstanding.
    CallInFlight,
    /// The event has no transition from the current state.
    InvalidInState,
    /// Completion tagged with a superseded session.
    StaleSession,
    /// Completion for a call this session is not waiting on.
    UnexpectedCompletion,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::NotScanning => "not scanning",
            IgnoreReason::NoAcceptedCode => "no accepted code",
            IgnoreReason::CallInFlight => "call in flight",
            IgnoreReason::InvalidInState => "invalid in current state",
            IgnoreReason::StaleSession => "stale session",
            IgnoreReason::UnexpectedCompletion => "unexpected completion",
        };
        f.write_str(text)
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// State changed; the runtime must run the effect, if any.
    Applied(Option<Effect>),
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// Returns the effect of an applied transition.
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Outcome::Applied(effect) => effect.as_ref(),
            Outcome::Ignored(_) => None,
        }
    }

    pub fn into_effect(self) -> Option<Effect> {
        match self {
            Outcome::Applied(effect) => effect,
            Outcome::Ignored(_) => None,
        }
    }

    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Ignored(reason) => Some(*reason),
        }
    }
}

// =============================================================================
// Status Snapshot
// =============================================================================

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionStatus {
    #[ts(as = "String")]
    pub session_id: SessionId,

    pub state: AcquisitionState,

    pub active_code: Option<String>,

    pub product: Option<ProductRecord>,

    pub last_error: Option<ServiceError>,

    /// Completions discarded because their session was superseded.
    pub stale_discarded: u64,

    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
}

// =============================================================================
// Session
// =============================================================================

/// One scanning attempt.
///
/// Mutated only through [`AcquisitionSession::apply`]. The fields obey:
/// - `active_code` is set in every state after `BarcodeDetected` on the scan
///   path, and on every state after the first submit on the manual path;
/// - `product` is set if and only if the state is `Fetched` or `Created`;
/// - `last_error` is set if and only if the state is `Error` or `Exception`.
#[derive(Debug, Clone)]
pub struct AcquisitionSession {
    id: SessionId,
    state: AcquisitionState,
    active_code: Option<String>,
    product: Option<ProductRecord>,
    last_error: Option<ServiceError>,
    last_request: Option<RequestKind>,
    /// The code came from the camera, so manual submits may not change it.
    code_locked: bool,
    accepted: Option<Vec<Symbology>>,
    started_at: DateTime<Utc>,
}

impl Default for AcquisitionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionSession {
    /// Creates a session in `Scanning` that accepts every symbology.
    pub fn new() -> Self {
        AcquisitionSession {
            id: SessionId::new(),
            state: AcquisitionState::Scanning,
            active_code: None,
            product: None,
            last_error: None,
            last_request: None,
            code_locked: false,
            accepted: None,
            started_at: Utc::now(),
        }
    }

    /// Restricts detections to the given symbologies. An empty list accepts
    /// everything. The filter survives resets.
    pub fn with_accepted_symbologies(mut self, accepted: Vec<Symbology>) -> Self {
        self.accepted = if accepted.is_empty() {
            None
        } else {
            Some(accepted)
        };
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn active_code(&self) -> Option<&str> {
        self.active_code.as_deref()
    }

    pub fn product(&self) -> Option<&ProductRecord> {
        self.product.as_ref()
    }

    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    /// The most recently dispatched call kind.
    pub fn last_request(&self) -> Option<RequestKind> {
        self.last_request
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn accepts(&self, symbology: Symbology) -> bool {
        match &self.accepted {
            Some(list) => list.contains(&symbology),
            None => true,
        }
    }

    /// Builds the observer snapshot.
    pub fn status(&self, stale_discarded: u64) -> AcquisitionStatus {
        AcquisitionStatus {
            session_id: self.id,
            state: self.state.clone(),
            active_code: self.active_code.clone(),
            product: self.product.clone(),
            last_error: self.last_error.clone(),
            stale_discarded,
            started_at: self.started_at,
        }
    }

    // =========================================================================
    // Transition Function
    // =========================================================================

    /// Applies one event. Never performs I/O.
    pub fn apply(&mut self, event: AcquisitionEvent) -> Outcome {
        match event {
            AcquisitionEvent::Detected(detection) => self.on_detected(&detection),
            AcquisitionEvent::Confirm => self.on_confirm(),
            AcquisitionEvent::EnterManually => self.on_enter_manually(),
            AcquisitionEvent::SubmitForm(product) => self.on_submit(product),
            AcquisitionEvent::LookupCompleted { session, result } => {
                self.on_lookup_completed(session, result)
            }
            AcquisitionEvent::CreateCompleted { session, result } => {
                self.on_create_completed(session, result)
            }
            AcquisitionEvent::AddToPantry => self.on_add_to_pantry(),
            AcquisitionEvent::Reset => {
                self.reset();
                Outcome::Applied(None)
            }
        }
    }

    /// Returns to `Scanning` under a fresh id.
    ///
    /// Outstanding calls are not cancelled; their completions will carry the
    /// old id and be ignored.
    pub fn reset(&mut self) {
        self.id = SessionId::new();
        self.state = AcquisitionState::Scanning;
        self.active_code = None;
        self.product = None;
        self.last_error = None;
        self.last_request = None;
        self.code_locked = false;
        self.started_at = Utc::now();
    }

    fn on_detected(&mut self, detection: &DetectionResult) -> Outcome {
        if self.state != AcquisitionState::Scanning {
            return Outcome::Ignored(IgnoreReason::NotScanning);
        }

        let Some(code) = detection.first_code(|s| self.accepts(s)) else {
            return Outcome::Ignored(IgnoreReason::NoAcceptedCode);
        };

        self.active_code = Some(code.raw_value.trim().to_string());
        self.code_locked = true;
        self.state = AcquisitionState::BarcodeDetected;
        Outcome::Applied(None)
    }

    fn on_confirm(&mut self) -> Outcome {
        match self.state {
            AcquisitionState::BarcodeDetected => self.dispatch_lookup(),
            AcquisitionState::Error(_) | AcquisitionState::Exception(_)
                if self.last_request == Some(RequestKind::Lookup) =>
            {
                self.dispatch_lookup()
            }
            AcquisitionState::Fetching => Outcome::Ignored(IgnoreReason::CallInFlight),
            _ => Outcome::Ignored(IgnoreReason::InvalidInState),
        }
    }

    fn dispatch_lookup(&mut self) -> Outcome {
        let Some(code) = self.active_code.clone() else {
            return Outcome::Ignored(IgnoreReason::InvalidInState);
        };

        self.state = AcquisitionState::Fetching;
        self.last_error = None;
        self.last_request = Some(RequestKind::Lookup);
        Outcome::Applied(Some(Effect::Lookup {
            session: self.id,
            code,
        }))
    }

    fn on_enter_manually(&mut self) -> Outcome {
        match self.state {
            AcquisitionState::Scanning | AcquisitionState::BarcodeDetected => {
                self.state = AcquisitionState::AddProductManually;
                self.active_code = None;
                self.code_locked = false;
                Outcome::Applied(None)
            }
            AcquisitionState::Fetching => Outcome::Ignored(IgnoreReason::CallInFlight),
            _ => Outcome::Ignored(IgnoreReason::InvalidInState),
        }
    }

    fn on_submit(&mut self, mut product: NewProduct) -> Outcome {
        let allowed = match self.state {
            AcquisitionState::NotFound | AcquisitionState::AddProductManually => true,
            AcquisitionState::Error(_) | AcquisitionState::Exception(_) => {
                self.last_request == Some(RequestKind::Create)
            }
            AcquisitionState::Fetching => return Outcome::Ignored(IgnoreReason::CallInFlight),
            _ => false,
        };
        if !allowed {
            return Outcome::Ignored(IgnoreReason::InvalidInState);
        }

        if self.code_locked {
            if let Some(code) = &self.active_code {
                product.barcode = code.clone();
            }
        } else {
            self.active_code = Some(product.barcode.clone());
        }

        self.state = AcquisitionState::Fetching;
        self.last_error = None;
        self.last_request = Some(RequestKind::Create);
        Outcome::Applied(Some(Effect::Create {
            session: self.id,
            product,
        }))
    }

    /// Shared guard for both completion kinds.
    fn accept_completion(&self, session: SessionId, kind: RequestKind) -> Option<IgnoreReason> {
        if session != self.id {
            return Some(IgnoreReason::StaleSession);
        }
        if self.state != AcquisitionState::Fetching || self.last_request != Some(kind) {
            return Some(IgnoreReason::UnexpectedCompletion);
        }
        None
    }

    fn on_lookup_completed(&mut self, session: SessionId, result: LookupResult) -> Outcome {
        if let Some(reason) = self.accept_completion(session, RequestKind::Lookup) {
            return Outcome::Ignored(reason);
        }

        match result {
            Ok(Some(product)) => {
                self.product = Some(product);
                self.state = AcquisitionState::Fetched;
            }
            Ok(None) => self.state = AcquisitionState::NotFound,
            Err(err) => self.fail(err),
        }
        Outcome::Applied(None)
    }

    fn on_create_completed(&mut self, session: SessionId, result: CreateResult) -> Outcome {
        if let Some(reason) = self.accept_completion(session, RequestKind::Create) {
            return Outcome::Ignored(reason);
        }

        match result {
            Ok(product) => {
                self.product = Some(product);
                self.state = AcquisitionState::Created;
            }
            Err(err) => self.fail(err),
        }
        Outcome::Applied(None)
    }

    fn fail(&mut self, err: ServiceError) {
        self.state = match &err {
            ServiceError::Server(errors) => AcquisitionState::Error(errors.clone()),
            ServiceError::Transport(cause) => AcquisitionState::Exception(cause.clone()),
        };
        self.last_error = Some(err);
    }

    fn on_add_to_pantry(&mut self) -> Outcome {
        if !self.state.holds_product() {
            return Outcome::Ignored(IgnoreReason::InvalidInState);
        }
        let Some(product) = self.product.take() else {
            return Outcome::Ignored(IgnoreReason::InvalidInState);
        };

        self.state = AcquisitionState::AddedToPantry;
        Outcome::Applied(Some(Effect::NotifyPantry(product)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
