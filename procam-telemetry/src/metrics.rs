//! ## procam-telemetry::metrics
//! Prometheus counters for both ends of the callback channel.
//!
//! Counters are labelled with the stable event-kind and rejection-reason
//! strings, so dashboards survive renames of the Rust types.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub transactions: IntCounterVec,
    pub rejections: IntCounterVec,
    pub sent: IntCounterVec,
    pub send_failures: IntCounter,
    pub dispatch_latency: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transactions = IntCounterVec::new(
            Opts::new(
                "procam_transactions_total",
                "Callback transactions dispatched to a listener",
            ),
            &["kind"],
        )?;
        let rejections = IntCounterVec::new(
            Opts::new(
                "procam_rejections_total",
                "Callback transactions refused before dispatch",
            ),
            &["reason"],
        )?;
        let sent = IntCounterVec::new(
            Opts::new("procam_sent_total", "Callback transactions submitted"),
            &["kind"],
        )?;
        let send_failures = IntCounter::new(
            "procam_send_failures_total",
            "Callback submissions refused by the transport",
        )?;
        let dispatch_latency = Histogram::with_opts(
            HistogramOpts::new(
                "procam_dispatch_latency_ns",
                "Time from arrival to listener return",
            )
            .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]),
        )?;

        registry.register(Box::new(transactions.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(sent.clone()))?;
        registry.register(Box::new(send_failures.clone()))?;
        registry.register(Box::new(dispatch_latency.clone()))?;

        Ok(Self {
            registry,
            transactions,
            rejections,
            sent,
            send_failures,
            dispatch_latency,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_dispatched(&self, kind: &str) {
        self.transactions.with_label_values(&[kind]).inc();
    }

    pub fn inc_rejected(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }

    pub fn inc_sent(&self, kind: &str) {
        self.sent.with_label_values(&[kind]).inc();
    }

    pub fn inc_send_failures(&self) {
        self.send_failures.inc();
    }

    pub fn observe_dispatch_ns(&self, nanos: f64) {
        self.dispatch_latency.observe(nanos);
    }

    pub fn dispatched(&self, kind: &str) -> u64 {
        self.transactions.with_label_values(&[kind]).get()
    }

    pub fn rejected(&self, reason: &str) -> u64 {
        self.rejections.with_label_values(&[reason]).get()
    }
}
