//! Exam Session Host
//!
//! Wires the integrity engine to its collaborators:
//! - Layered settings and logging/metrics initialization
//! - Event sink selection behind the non-blocking forwarder
//! - Recording hand-off and report export on stop
//! - JSON-lines replay of recorded perception output

pub mod logging;
pub mod replay;
pub mod settings;

pub use logging::{init_logging, init_metrics};
pub use replay::{ReplayFile, ReplayFrame, ReplaySource};
pub use settings::{LoggingSettings, MetricsSettings, RecordingSettings, Settings, SinkKind, SinkSettings};

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use event_sink::{
    hand_off_once, EventSink, ForwarderStats, LocalRecordingStore, LogSink, MemorySink, MqttSink,
    SinkForwarder,
};
use integrity::{Report, SessionDriver};
use perception::PerceptionError;
use report_export::{CsvExporter, JsonExporter, ReportExporter};
use tracing::{info, warn};

/// One replayed session
#[derive(Debug, Clone, Default)]
pub struct ReplayArgs {
    pub input: PathBuf,
    pub candidate: String,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    /// Run as if the face model failed to load
    pub no_face_model: bool,
    /// Run as if the object model failed to load
    pub no_object_model: bool,
}

/// Result of a replayed session
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub report: Report,
    pub forwarded: ForwarderStats,
    pub recording: Option<PathBuf>,
}

/// Replay a recorded session end to end
pub async fn run_replay(settings: &Settings, args: &ReplayArgs) -> Result<ReplayOutcome> {
    let replay = ReplayFile::load(&args.input)?;
    if replay.is_empty() {
        warn!("Replay file {} has no usable frames", args.input.display());
    }

    let (report, forwarded) = match settings.sink.kind {
        SinkKind::Log => run_session(LogSink, settings, args, &replay).await?,
        SinkKind::Memory => {
            let sink = MemorySink::new(settings.sink.memory_capacity);
            let result = run_session(sink.clone(), settings, args, &replay).await?;
            info!("In-memory event log holds {} events", sink.len());
            result
        }
        SinkKind::Mqtt => {
            let mut sink = MqttSink::new(settings.sink.mqtt.clone());
            if let Err(e) = sink.connect().await {
                warn!("Event sink unreachable, events will be dropped: {}", e);
            }
            run_session(sink, settings, args, &replay).await?
        }
    };

    let recording = match &settings.recording.dir {
        Some(dir) => {
            let bytes = std::fs::read(&args.input)
                .with_context(|| format!("Failed to read recording {}", args.input.display()))?;
            hand_off_once(LocalRecordingStore::new(dir), report.session_id, bytes).await
        }
        None => None,
    };

    if let Some(path) = &args.json {
        JsonExporter::default().write_to(&report, path)?;
    }
    if let Some(path) = &args.csv {
        CsvExporter.write_to(&report, path)?;
    }

    Ok(ReplayOutcome {
        report,
        forwarded,
        recording,
    })
}

async fn run_session<S: EventSink>(
    sink: S,
    settings: &Settings,
    args: &ReplayArgs,
    replay: &ReplayFile,
) -> Result<(Report, ForwarderStats)> {
    let (forwarder, task) = SinkForwarder::spawn(sink);

    let face_model = if args.no_face_model {
        Err(PerceptionError::ModelUnavailable("face model disabled".to_string()))
    } else {
        Ok(replay.face_model())
    };
    let object_model = if args.no_object_model {
        Err(PerceptionError::ModelUnavailable("object model disabled".to_string()))
    } else {
        Ok(replay.object_model())
    };

    let mut driver = SessionDriver::new(settings.integrity.clone(), face_model, object_model, forwarder);
    let started_at = Utc::now();
    let session_id = driver.start(args.candidate.clone(), started_at)?;
    info!(
        "Replaying {} frames for {} (session {})",
        replay.len(),
        args.candidate,
        session_id
    );

    let mut source = replay.source(started_at);
    let report = driver
        .run(&mut source)
        .await?
        .context("Session ended without a report")?;

    // Dropping the driver closes the forwarder queue
    drop(driver);
    let forwarded = task.finish().await;
    Ok((report, forwarded))
}
