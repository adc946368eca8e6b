use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{anyhow, Result};
use image::RgbImage;

use super::FramePipeline;
use crate::frame::{Frame, LatestFrameSlot, Rotation};
use crate::present::Delivery;

/// Counters shared between the worker thread and its handle.
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    dropped: AtomicU64,
    alerts: AtomicU64,
    errors: AtomicU64,
}

impl WorkerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Frames the pipeline dropped because no detector was available.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Runs a `FramePipeline` on a dedicated thread, fed through a latest-only
/// slot. Results leave through the delivery channel in frame order.
pub struct PipelineWorker {
    slot: Arc<LatestFrameSlot>,
    stats: Arc<WorkerStats>,
    join: Option<JoinHandle<FramePipeline>>,
}

impl PipelineWorker {
    pub fn spawn(mut pipeline: FramePipeline, deliveries: Sender<Delivery>) -> Self {
        let slot = Arc::new(LatestFrameSlot::new());
        let stats = Arc::new(WorkerStats::default());
        let worker_slot = slot.clone();
        let worker_stats = stats.clone();

        let join = std::thread::spawn(move || {
            while let Some(frame) = worker_slot.take() {
                let report = pipeline.process(frame, Instant::now());
                worker_stats.processed.fetch_add(1, Ordering::Relaxed);
                if report.is_dropped() {
                    worker_stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                if report.utterance.is_some() {
                    worker_stats.alerts.fetch_add(1, Ordering::Relaxed);
                }
                worker_stats
                    .errors
                    .fetch_add(report.errors.len() as u64, Ordering::Relaxed);

                for delivery in report.deliveries() {
                    if deliveries.send(delivery).is_err() {
                        log::warn!("presentation channel closed; stopping pipeline worker");
                        return pipeline;
                    }
                }
            }
            pipeline
        });

        Self {
            slot,
            stats,
            join: Some(join),
        }
    }

    /// Offer a frame. Returns `true` when it superseded a frame that had not
    /// started processing yet.
    pub fn submit_frame(&self, image: RgbImage, rotation: Rotation) -> bool {
        self.slot.submit(Frame::new(image, rotation))
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Frames replaced in the slot before the worker reached them.
    pub fn superseded(&self) -> u64 {
        self.slot.superseded()
    }

    /// Stop accepting frames, finish the pending one and return the pipeline.
    /// The worker's delivery sender is dropped when the thread exits.
    pub fn shutdown(mut self) -> Result<FramePipeline> {
        self.slot.close();
        let join = self
            .join
            .take()
            .ok_or_else(|| anyhow!("pipeline worker already stopped"))?;
        join.join()
            .map_err(|_| anyhow!("pipeline worker panicked"))
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.slot.close();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
