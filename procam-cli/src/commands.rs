use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use procam_config::ProcamConfig;
use procam_core::prelude::*;
use procam_protocol::{CallbackEvent, FaceRecord, LockStatus, Message};
use procam_telemetry::{EventLogger, MetricsRecorder};
use tracing::info;

use crate::event_source::RandomEventSource;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/procam.yaml plus PROCAM_* variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode one hex-encoded message and print the event or the rejection
    Inspect(InspectArgs),
    /// Send a seeded stream of random events through both ends over loopback
    Loopback(LoopbackArgs),
    /// Print the effective configuration as YAML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Message bytes as hex; whitespace is ignored
    pub hex: String,
}

#[derive(Args, Debug, Clone)]
pub struct LoopbackArgs {
    /// Number of events to send
    #[arg(long, default_value_t = 100)]
    pub events: usize,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

pub fn inspect(config: &ProcamConfig, args: &InspectArgs) -> anyhow::Result<()> {
    let message = Message::from_hex(&args.hex).context("message is not valid hex")?;

    match config.protocol.codec().decode(&message) {
        Ok(event) => {
            println!("{} ({} bytes)", event.kind(), message.len());
            println!("{event:#?}");
            Ok(())
        }
        Err(e) => {
            let reason = DispatchError::from(e.clone()).reason();
            bail!("rejected ({reason}): {e}")
        }
    }
}

pub fn show_config(config: &ProcamConfig) -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Listener that logs every delivered callback.
#[derive(Default)]
struct LoggingListener;

impl ProCameraListener for LoggingListener {
    fn notify_callback(&self, msg_type: i32, ext1: i32, ext2: i32) {
        EventLogger::log_event(
            "notify",
            &format!("msg_type={msg_type:#x} ext1={ext1} ext2={ext2}"),
        );
    }

    fn data_callback(&self, msg_type: i32, image: &ImageData, faces: Option<&[FaceRecord]>) {
        let faces = faces.map_or_else(|| "none".to_string(), |f| f.len().to_string());
        EventLogger::log_event(
            "data",
            &format!("msg_type={msg_type:#x} bytes={} faces={faces}", image.len()),
        );
    }

    fn data_callback_timestamp(&self, timestamp: i64, msg_type: i32, image: &ImageData) {
        EventLogger::log_event(
            "data_timestamp",
            &format!("ts={timestamp} msg_type={msg_type:#x} bytes={}", image.len()),
        );
    }

    fn on_lock_status_changed(&self, status: LockStatus) {
        EventLogger::log_event("lock_status_changed", &format!("{status:?}"));
    }

    fn on_result_received(&self, frame_id: i32, metadata: Option<&[u8]>) {
        EventLogger::log_event(
            "result_received",
            &format!("frame={frame_id} metadata={}", metadata.map_or(0, <[u8]>::len)),
        );
    }
}

fn submit<T: Transport>(
    sender: &CallbackSender<T>,
    event: &CallbackEvent,
) -> Result<(), TransportError> {
    match event {
        CallbackEvent::Notify(p) => sender.notify_callback(p.msg_type, p.ext1, p.ext2),
        CallbackEvent::Data(p) => sender.data_callback(p.msg_type, &p.image, p.faces.as_deref()),
        CallbackEvent::TimestampedData(p) => {
            sender.data_callback_timestamp(p.timestamp, p.msg_type, &p.image)
        }
        CallbackEvent::LockStatusChanged(p) => sender.on_lock_status_changed(p.status),
        CallbackEvent::ResultReceived(p) => sender.on_result_received(p.frame_id, &p.metadata),
    }
}

/// Outcome of a loopback session.
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackReport {
    pub sent: usize,
    pub delivered: usize,
}

pub async fn run_loopback(config: &ProcamConfig, args: LoopbackArgs) -> anyhow::Result<()> {
    let metrics = session_metrics(config)?;
    let report = loopback_session(config, &args, metrics.clone()).await?;

    println!(
        "sent {} events, {} delivered (seed {})",
        report.sent, report.delivered, args.seed
    );
    if let Some(metrics) = &metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

/// A recorder only when metrics are enabled in configuration.
fn session_metrics(config: &ProcamConfig) -> anyhow::Result<Option<MetricsRecorder>> {
    if !config.telemetry.metrics {
        return Ok(None);
    }
    let metrics = MetricsRecorder::new().context("creating metrics registry")?;
    Ok(Some(metrics))
}

async fn loopback_session(
    config: &ProcamConfig,
    args: &LoopbackArgs,
    metrics: Option<MetricsRecorder>,
) -> anyhow::Result<LoopbackReport> {
    let transport = Arc::new(LoopbackTransport::new());
    let destination = Destination::new("procam-loopback");
    let endpoint = transport.bind(destination.clone());
    let pool = Arc::new(SharedMemoryPool::new());

    let mut dispatcher = Dispatcher::from_config(&config.protocol, LoggingListener, pool.clone());
    let mut sender = CallbackSender::from_config(&config.protocol, transport.clone(), destination);
    if let Some(metrics) = metrics {
        dispatcher = dispatcher.with_metrics(metrics.clone());
        sender = sender.with_metrics(metrics);
    }

    let dispatcher = Arc::new(dispatcher);
    endpoint.on_message(dispatcher.handler());
    let server = tokio::task::spawn_blocking(move || endpoint.serve());

    let mut source = RandomEventSource::new(args.seed);
    let mut sent = 0;
    for _ in 0..args.events {
        let event = source.next_event(&pool)?;
        submit(&sender, &event)?;
        sent += 1;
    }
    info!(sent, seed = args.seed, "loopback events submitted");

    transport.unbind(sender.destination());
    let delivered = server.await.context("loopback endpoint panicked")?;
    source.release(&pool);
    Ok(LoopbackReport { sent, delivered })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        let cli =
            Cli::try_parse_from(["procam", "loopback", "--events", "5", "--seed", "9"]).unwrap();
        match cli.command {
            Commands::Loopback(args) => {
                assert_eq!(args.events, 5);
                assert_eq!(args.seed, 9);
            }
            _ => panic!("expected loopback"),
        }

        let cli = Cli::try_parse_from(["procam", "inspect", "00ff", "-c", "x.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert!(matches!(cli.command, Commands::Inspect(InspectArgs { hex }) if hex == "00ff"));
    }

    #[test]
    fn inspect_accepts_valid_and_rejects_foreign() {
        let config = ProcamConfig::default();
        let notify = config.protocol.codec().encode_notify(1, 2, 3);
        assert!(inspect(&config, &InspectArgs { hex: notify.to_hex() }).is_ok());

        let foreign = procam_protocol::CallbackCodec::new()
            .with_descriptor("com.example.IOther")
            .encode_notify(1, 2, 3);
        let err = inspect(&config, &InspectArgs { hex: foreign.to_hex() }).unwrap_err();
        assert!(err.to_string().contains("protocol_mismatch"));

        assert!(inspect(&config, &InspectArgs { hex: "zz".into() }).is_err());
    }

    #[tokio::test]
    async fn loopback_delivers_everything() {
        let metrics = MetricsRecorder::new().unwrap();
        let args = LoopbackArgs { events: 40, seed: 3 };
        let report = loopback_session(&ProcamConfig::default(), &args, Some(metrics.clone()))
            .await
            .unwrap();

        assert_eq!(report, LoopbackReport { sent: 40, delivered: 40 });
        let dispatched: u64 = procam_protocol::EventKind::ALL
            .iter()
            .map(|k| metrics.dispatched(k.as_str()))
            .sum();
        assert_eq!(dispatched, 40);
    }

    #[tokio::test]
    async fn disabled_metrics_record_nothing() {
        let mut config = ProcamConfig::default();
        assert!(session_metrics(&config).unwrap().is_some());

        config.telemetry.metrics = false;
        let metrics = session_metrics(&config).unwrap();
        assert!(metrics.is_none());

        let args = LoopbackArgs { events: 10, seed: 11 };
        let report = loopback_session(&config, &args, metrics).await.unwrap();
        assert_eq!(report, LoopbackReport { sent: 10, delivered: 10 });
    }
}
