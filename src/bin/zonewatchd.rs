//! zonewatchd - zone alert daemon
//!
//! This daemon:
//! 1. Loads configuration (ZONEWATCH_CONFIG file + env overrides)
//! 2. Builds the detector from the backend registry
//! 3. Runs the frame pipeline on a dedicated worker thread
//! 4. Delivers alerts, overlays and errors on a presentation thread
//! 5. Feeds frames from the configured source at the target rate

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use zonewatch::config::ZonewatchConfig;
use zonewatch::{
    default_registry, DeviceCapabilities, FramePipeline, FrameSource, PipelineWorker,
    Presentation, SourceConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ZonewatchConfig::load()?;
    log::info!(
        "zonewatchd {} starting: backend={} delegate={} source={}",
        env!("CARGO_PKG_VERSION"),
        cfg.detector.backend,
        cfg.detector.options.delegate.as_str(),
        cfg.source.path
    );

    let registry = default_registry(Vec::new(), cfg.detector.model_dir.as_deref());
    let factory = registry.select(Some(&cfg.detector.backend))?;

    // No acceleration probing on this host; anything but the default
    // delegate is reported and downgraded.
    let capabilities = DeviceCapabilities::cpu_only();
    let mut pipeline = FramePipeline::new(factory, cfg.pipeline_settings(), &capabilities);
    if let Err(err) = pipeline.warm_up() {
        log::error!("{}; will retry on the first frame", err);
    }

    let (tx, rx) = mpsc::channel();
    let presenter = Presentation::logging().spawn(rx);
    let worker = PipelineWorker::spawn(pipeline, tx);

    let mut source = FrameSource::open(SourceConfig {
        path: cfg.source.path.clone(),
        target_fps: cfg.source.target_fps,
        width: cfg.source.width,
        height: cfg.source.height,
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let frame_interval = Duration::from_millis(1000 / cfg.source.target_fps.max(1) as u64);
    let mut last_health_log = Instant::now();

    log::info!("zonewatchd running at {} fps", cfg.source.target_fps);
    while running.load(Ordering::SeqCst) {
        let tick = Instant::now();
        match source.next_frame()? {
            Some((image, rotation)) => {
                worker.submit_frame(image, rotation);
            }
            None => {
                log::info!("source exhausted");
                break;
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = worker.stats();
            log::info!(
                "health: captured={} processed={} superseded={} dropped={} alerts={} errors={}",
                source.stats().frames_captured,
                stats.processed(),
                worker.superseded(),
                stats.dropped(),
                stats.alerts(),
                stats.errors()
            );
            last_health_log = Instant::now();
        }

        if let Some(rest) = frame_interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!("shutting down pipeline worker...");
    let pipeline = worker.shutdown()?;
    let delivered = presenter
        .join()
        .map_err(|_| anyhow::anyhow!("presentation thread panicked"))?;
    log::info!(
        "stopped: {} deliveries, final threshold {:.2}",
        delivered,
        pipeline.threshold_state().current_threshold()
    );
    Ok(())
}
