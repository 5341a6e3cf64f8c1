//! # nutrition-core: Pure Product Acquisition Logic
//!
//! This crate is the **heart** of the barcode scanner. It contains the
//! product acquisition workflow as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Nutrition Scanner Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation layer (mobile UI)                  │   │
//! │  │   Scanner ──► Confirm ──► Fetched / Create form ──► Pantry      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ intents / status snapshots             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           nutrition-scan (pipeline + acquisition agent)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ nutrition-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐ ┌──────────┐  │   │
//! │  │   │   types   │  │ quantity  │  │ acquisition │ │validation│  │   │
//! │  │   │  Frame    │  │ Quantity  │  │  Session    │ │ forms    │  │   │
//! │  │   │  Product  │  │           │  │  apply()    │ │          │  │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO THREADS • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Frame, DetectionResult, ProductRecord, ...)
//! - [`quantity`] - Fixed-point nutrient amounts (no floating point!)
//! - [`acquisition`] - The acquisition session and its transition function
//! - [`graphql`] - Response envelopes for the product lookup/creation API
//! - [`error`] - Domain error types
//! - [`validation`] - Manual product form validation
//!
//! ## Example Usage
//!
//! ```rust
//! use nutrition_core::acquisition::{AcquisitionEvent, AcquisitionSession, AcquisitionState};
//! use nutrition_core::types::{DetectedCode, DetectionResult, Symbology};
//!
//! let mut session = AcquisitionSession::new();
//! let detection = DetectionResult::new(
//!     vec![DetectedCode::new("0123456789012", Symbology::Ean13)],
//!     640,
//!     480,
//! );
//!
//! session.apply(AcquisitionEvent::Detected(detection));
//! assert_eq!(session.state(), &AcquisitionState::BarcodeDetected);
//! assert_eq!(session.active_code(), Some("0123456789012"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod acquisition;
pub mod error;
pub mod graphql;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use acquisition::{
    AcquisitionEvent, AcquisitionSession, AcquisitionState, AcquisitionStatus, Effect,
    IgnoreReason, Outcome, RequestKind,
};
pub use error::{ServiceError, ValidationError};
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a barcode payload accepted from the manual form.
///
/// GS1 element strings top out at 48 characters; anything longer is
/// almost certainly a QR payload rather than a product code.
pub const MAX_BARCODE_LEN: usize = 48;

/// Maximum length of free-text product fields (brand, name).
pub const MAX_TEXT_FIELD_LEN: usize = 200;
