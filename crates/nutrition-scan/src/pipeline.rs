//! # Frame Analysis Pipeline
//!
//! Bridges a camera-rate frame source to a detector that can only handle
//! one frame at a time.
//!
//! ## Keep-Latest Backpressure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  camera thread                          analyzer thread                 │
//! │  ─────────────                          ───────────────                 │
//! │                                                                         │
//! │  submit_frame(f)                                                        │
//! │    │                                                                    │
//! │    ├─ busy CAS false→true ──► dispatch ──► detect(f) ──► consumer       │
//! │    │                                           │                        │
//! │    └─ busy already set                         ▼                        │
//! │         │                              busy = false                     │
//! │         ▼                                      │                        │
//! │    ┌──────────────┐   overwrite              try_drain                  │
//! │    │ pending slot │◄──────────               (newest frame, if any)     │
//! │    │  (1 frame)   │──────────────────────────────┘                      │
//! │    └──────────────┘                                                     │
//! │                                                                         │
//! │  The producer never blocks and never queues more than one frame.        │
//! │  Only the frame in the slot when an analysis ends is analysed next.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The slot mutex is held only for a `replace`/`take`; no lock is held
//! across the detector's await.
//!
//! Each detection runs as its own task on the analyzer runtime, so a
//! panicking detector is reported like any other detector failure.

use nutrition_core::{DetectionResult, Frame};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PipelineSettings;
use crate::detector::{BarcodeDetector, DetectionConsumer, DetectorError};
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Frames handed to `submit_frame`.
    pub submitted: u64,
    /// Frames that went through the detector.
    pub analyzed: u64,
    /// Frames overwritten in, or superseded out of, the pending slot.
    pub dropped: u64,
    /// Detector calls that failed (reported as empty results).
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    analyzed: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            analyzed: self.analyzed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

/// State touched by both the producer and the analyzer thread.
#[derive(Default)]
struct Shared {
    busy: AtomicBool,
    pending: Mutex<Option<Frame>>,
    counters: Counters,
}

impl Shared {
    fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    fn take_pending(&self) -> Option<Frame> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Stores `frame` in the slot; returns true if it overwrote another one.
    fn replace_pending(&self, frame: Frame) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(frame)
            .is_some()
    }

    fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Claims the busy flag for the pending frame, if there is one.
    ///
    /// Whoever wins the CAS owns the next analysis. A winner that finds the
    /// slot already emptied by someone else gives the flag back and looks
    /// again.
    fn try_drain(&self) -> Option<Frame> {
        loop {
            if !self.has_pending() || !self.try_acquire() {
                return None;
            }
            if let Some(frame) = self.take_pending() {
                return Some(frame);
            }
            self.release();
        }
    }
}

/// Clears the busy flag when dropped, including during unwinding.
struct BusyGuard<'a>(&'a Shared);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

// =============================================================================
// Frame Pipeline
// =============================================================================

/// Keep-latest frame analysis pipeline.
///
/// ## Usage
/// ```rust,ignore
/// let pipeline = FramePipeline::spawn(detector, handle.clone(), &config.pipeline)?;
///
/// // From the camera callback:
/// pipeline.submit_frame(frame);
///
/// pipeline.shutdown();
/// ```
pub struct FramePipeline {
    shared: Arc<Shared>,
    dispatch_tx: Option<mpsc::UnboundedSender<Frame>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl FramePipeline {
    /// Starts the analyzer thread.
    pub fn spawn<D, C>(detector: D, consumer: C, settings: &PipelineSettings) -> ScanResult<Self>
    where
        D: BarcodeDetector,
        C: DetectionConsumer,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| ScanError::RuntimeFailed(e.to_string()))?;

        let shared = Arc::new(Shared::default());
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(settings.thread_name.clone())
            .spawn(move || {
                runtime.block_on(analyze_loop(detector, consumer, worker_shared, dispatch_rx));
            })
            .map_err(|e| ScanError::RuntimeFailed(e.to_string()))?;

        info!(thread = %settings.thread_name, "Frame pipeline started");

        Ok(FramePipeline {
            shared,
            dispatch_tx: Some(dispatch_tx),
            worker: Some(worker),
        })
    }

    /// Offers a frame for analysis. Never blocks.
    ///
    /// Starts an analysis right away when the analyzer is idle; otherwise the
    /// frame replaces whatever was waiting in the pending slot.
    pub fn submit_frame(&self, frame: Frame) {
        let counters = &self.shared.counters;
        counters.submitted.fetch_add(1, Ordering::Relaxed);

        if self.shared.try_acquire() {
            // A frame still waiting in the slot is older than this one.
            if self.shared.take_pending().is_some() {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            self.dispatch(frame);
            return;
        }

        if self.shared.replace_pending(frame) {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
        }

        // The analyzer may have gone idle between the CAS and the replace.
        if let Some(frame) = self.shared.try_drain() {
            self.dispatch(frame);
        }
    }

    fn dispatch(&self, frame: Frame) {
        let sent = match &self.dispatch_tx {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        };

        if !sent {
            // Stopped pipeline: account for the frame and stay idle.
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            self.shared.release();
        }
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> PipelineStats {
        self.shared.counters.snapshot()
    }

    /// True while an analysis is running or dispatched.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Stops accepting frames and joins the analyzer thread.
    ///
    /// An analysis already running completes and is delivered first.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.dispatch_tx.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Frame analyzer thread panicked");
            }
            let stats = self.stats();
            info!(
                submitted = stats.submitted,
                analyzed = stats.analyzed,
                dropped = stats.dropped,
                failed = stats.failed,
                "Frame pipeline stopped"
            );
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Analyzer Loop
// =============================================================================

async fn analyze_loop<D, C>(
    detector: D,
    consumer: C,
    shared: Arc<Shared>,
    mut dispatch_rx: mpsc::UnboundedReceiver<Frame>,
) where
    D: BarcodeDetector,
    C: DetectionConsumer,
{
    let detector = Arc::new(detector);

    while let Some(frame) = dispatch_rx.recv().await {
        let mut next = Some(frame);

        while let Some(frame) = next.take() {
            let busy = BusyGuard(&shared);
            let result = analyze(&detector, &shared, frame).await;
            shared.counters.analyzed.fetch_add(1, Ordering::Relaxed);
            consumer.on_detection(result);

            drop(busy);
            next = shared.try_drain();
        }
    }

    debug!("Dispatch channel closed, analyzer exiting");
}

/// Runs the detector on one frame, failing open.
async fn analyze<D: BarcodeDetector>(
    detector: &Arc<D>,
    shared: &Shared,
    frame: Frame,
) -> DetectionResult {
    let (width, height) = (frame.width, frame.height);

    let task_detector = detector.clone();
    let detection = tokio::spawn(async move { task_detector.detect(&frame).await })
        .await
        .unwrap_or_else(|e| Err(DetectorError::new(format!("detector panicked: {}", e))));

    match detection {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, width, height, "Detection failed, reporting empty result");
            shared.counters.failed.fetch_add(1, Ordering::Relaxed);
            DetectionResult::empty(width, height)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
