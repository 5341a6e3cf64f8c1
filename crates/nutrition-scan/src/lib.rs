//! # nutrition-scan: Scanner Runtime
//!
//! Runs the product acquisition workflow from `nutrition-core` against real
//! collaborators: a camera frame source, a barcode detector, the product
//! service and the pantry.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scanner Runtime Architecture                     │
//! │                                                                         │
//! │  camera ──submit_frame──► ┌──────────────────────────────┐              │
//! │                           │ FramePipeline                │              │
//! │                           │ busy flag + 1-frame slot     │              │
//! │                           │ analyzer thread (own runtime)│              │
//! │                           └──────────────┬───────────────┘              │
//! │                                          │ DetectionConsumer            │
//! │                                          ▼                              │
//! │  UI intents ────────────► ┌──────────────────────────────┐              │
//! │  (AcquisitionHandle)      │ AcquisitionAgent             │──► watch     │
//! │                           │ one task, one session        │   (status)   │
//! │                           └──────┬───────────────┬───────┘              │
//! │                                  │               │                      │
//! │                                  ▼               ▼                      │
//! │                         ProductService    PantryNotifier                │
//! │                         (timeout-bounded) (fire-and-forget)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`agent`] - `AcquisitionAgent`, its handle and builder
//! - [`config`] - Runtime configuration (TOML + environment)
//! - [`detector`] - Detector and detection-consumer traits
//! - [`error`] - Runtime error types
//! - [`pipeline`] - Keep-latest frame analysis pipeline
//! - [`service`] - Product service trait and GraphQL adapter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nutrition_scan::{AcquisitionAgentBuilder, FramePipeline, ScanConfig};
//!
//! let config = ScanConfig::load_or_default(None);
//!
//! let handle = AcquisitionAgentBuilder::new()
//!     .with_config(config.clone())
//!     .with_service(service)
//!     .build()?
//!     .start();
//!
//! let pipeline = FramePipeline::spawn(detector, handle.clone(), &config.pipeline)?;
//! camera.on_frame(move |frame| pipeline.submit_frame(frame));
//!
//! handle.confirm().await?;
//! let status = handle.wait_for(|s| !matches!(s.state, AcquisitionState::Fetching)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{
    AcquisitionAgent, AcquisitionAgentBuilder, AcquisitionHandle, NoOpPantry, PantryNotifier,
};
pub use config::{AgentSettings, DetectionSettings, PipelineSettings, ScanConfig};
pub use detector::{BarcodeDetector, DetectionConsumer, DetectorError};
pub use error::{ScanError, ScanResult};
pub use pipeline::{FramePipeline, PipelineStats};
pub use service::{call_with_timeout, GraphQlProductService, GraphQlTransport, ProductService};
