use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::barcode::LotNumberScanner;
use crate::capture::session::{CaptureSession, SessionReport};
use crate::capture::simulated::SimulatedCamera;
use crate::capture::state_machine::CaptureView;
use crate::capture::types::{BarcodeScan, Phase, StepOutcome, Symbology};
use crate::checksum;
use crate::cli::commands::Command;
use crate::config::CaptureGuideConfig;
use crate::kit;
use crate::paths::PathSubstitutions;
use crate::photos::{PhotoLog, PhotoLogSink};

/// Extra wait on top of the QR step's own timings before giving up on a scan
const SCAN_SLACK: Duration = Duration::from_secs(2);

/// Everything a demo run produced
#[derive(Debug, Clone, Serialize)]
pub struct DemoOutcome {
    pub report: SessionReport,
    pub lot_number: Option<String>,
    pub photos: PhotoLog,
}

pub struct DemoCommand {
    pub config: CaptureGuideConfig,
    pub payload: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl DemoCommand {
    pub fn new(config: CaptureGuideConfig) -> Self {
        Self {
            config,
            payload: None,
            output_dir: None,
            json: false,
        }
    }

    pub fn with_payload(mut self, payload: Option<String>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// A kit payload whose lot number carries a valid check digit
    pub fn sample_payload() -> String {
        format!("KIT,{},2021-07", checksum::append_check_digit("LOT-2021-07"))
    }

    /// Drive the kit workflow the way a user would: scan, then photograph
    pub async fn run(&self) -> Result<DemoOutcome> {
        let demo = &self.config.demo;
        let timings = self.config.timings.to_timings();
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&demo.output_dir));
        let payload = self.payload.clone().unwrap_or_else(Self::sample_payload);
        let grace = Duration::from_millis(demo.qr_grace_ms);

        let scanner = LotNumberScanner::new();
        let lot_slot = scanner.slot();
        let log = Arc::new(Mutex::new(PhotoLog::new()));
        let sink = Arc::new(PhotoLogSink::new(
            Arc::clone(&log),
            Arc::clone(&lot_slot),
            PathSubstitutions::new().with(output_dir.to_string_lossy(), "CacheDir"),
        ));
        let camera = Arc::new(
            SimulatedCamera::new(&output_dir)
                .with_shot_latency(Duration::from_millis(demo.shot_latency_ms))
                .with_emulated(demo.emulated),
        );

        let steps = kit::kit_steps(scanner, sink, grace)?;
        let (session, handle) = CaptureSession::builder(steps)
            .camera(camera)
            .timings(timings)
            .build()?;
        info!(session.id = %handle.session_id(), "Starting demo session");
        let runner = tokio::spawn(session.run());
        let mut view = handle.watch();

        handle.camera_ready();
        handle.scan(BarcodeScan::new(Symbology::Qr, payload.as_str()));

        let scan_window = timings.entry_fade
            + grace
            + timings.success_animation
            + timings.success_hold
            + timings.exit_fade
            + timings.entry_fade
            + SCAN_SLACK;
        let on_photo_step = |v: &CaptureView| v.step_index == 1 && v.phase == Phase::Active;
        if tokio::time::timeout(scan_window, wait_for(&mut view, on_photo_step))
            .await
            .is_err()
        {
            warn!(payload = %payload, "Kit code rejected, skipping the QR step");
            handle.skip();
            wait_for(&mut view, on_photo_step).await?;
        }

        handle.capture();
        let report = runner.await.context("Capture session task failed")?;
        drop(handle);

        let lot_number = match lot_slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let photos = match log.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Ok(DemoOutcome {
            report,
            lot_number,
            photos,
        })
    }
}

async fn wait_for(
    view: &mut watch::Receiver<CaptureView>,
    ready: impl Fn(&CaptureView) -> bool,
) -> Result<()> {
    view.wait_for(|v| ready(v))
        .await
        .map(|_| ())
        .context("Capture session ended early")
}

impl Command for DemoCommand {
    async fn execute(&self) -> Result<()> {
        let outcome = self.run().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        println!("📷 CAPTURE GUIDE DEMO");
        println!("=====================");
        println!("Session: {}", outcome.report.session_id);
        println!();
        for record in &outcome.report.records {
            match &record.outcome {
                StepOutcome::Scanned { payload } => println!(
                    "✅ {} scanned: {}",
                    record.step_id,
                    payload.as_deref().unwrap_or("-")
                ),
                StepOutcome::Captured { image } => {
                    println!("✅ {} captured: {}", record.step_id, image)
                }
                StepOutcome::Skipped => println!("⏭️  {} skipped", record.step_id),
            }
        }
        println!();
        match &outcome.lot_number {
            Some(lot) => println!("🏷️  Lot number: {lot}"),
            None => println!("🏷️  Lot number: none"),
        }
        for item in outcome.photos.items() {
            println!("🖼️  {}", item.photo_file_path);
        }
        println!(
            "⏱️  {} phase transitions, outcome: {:?}",
            outcome.report.history.len(),
            outcome.report.outcome
        );
        Ok(())
    }
}
