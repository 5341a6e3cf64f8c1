//! # Detector Seams
//!
//! The two ends of the frame pipeline: the barcode detector it calls and the
//! consumer it reports to. Decoding itself is an external concern (a camera
//! SDK, an ML model); this crate only schedules it.

use async_trait::async_trait;
use nutrition_core::{DetectionResult, Frame};
use thiserror::Error;

/// A detector failure. The pipeline logs it and reports an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Detector failed: {0}")]
pub struct DetectorError(pub String);

impl DetectorError {
    pub fn new(cause: impl Into<String>) -> Self {
        DetectorError(cause.into())
    }
}

/// Decodes barcodes from a frame.
///
/// Called on the pipeline's analyzer thread, one frame at a time.
#[async_trait]
pub trait BarcodeDetector: Send + Sync + 'static {
    async fn detect(&self, frame: &Frame) -> Result<DetectionResult, DetectorError>;
}

/// Receives every completed detection, including empty ones.
///
/// Called on the analyzer thread; implementations must not block.
pub trait DetectionConsumer: Send + Sync + 'static {
    fn on_detection(&self, result: DetectionResult);
}

impl<F> DetectionConsumer for F
where
    F: Fn(DetectionResult) + Send + Sync + 'static,
{
    fn on_detection(&self, result: DetectionResult) {
        self(result)
    }
}
