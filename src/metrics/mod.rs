use std::sync::Once;

use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;


lazy_static! {
    pub static ref EVENTS_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("notifier_events_published", "Events published, by event type"),
        &["event_type"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_DELIVERED: IntCounterVec = IntCounterVec::new(
        Opts::new("notifier_events_delivered", "Events handed to listeners, by delivery mode"),
        &["mode"]
    )
    .expect("metric can not be created");

    pub static ref DELIVERY_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("notifier_delivery_failures", "Listener callbacks that returned an error, by delivery mode"),
        &["mode"]
    )
    .expect("metric can not be created");

    pub static ref SYNTHETIC_EVENTS: IntCounter = IntCounter::new(
        "notifier_synthetic_events",
        "Synthetic created events emitted by initial state transfer"
    )
    .expect("metric can not be created");

    pub static ref EVENTS_CAPTURED: IntCounter = IntCounter::new(
        "notifier_events_captured",
        "Live events queued while an initial state transfer was running"
    )
    .expect("metric can not be created");

    pub static ref CLUSTER_SEND_FAILURES: IntCounter = IntCounter::new(
        "notifier_cluster_send_failures",
        "Clustered event batches the transport failed to ship"
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_LISTENERS: IntGauge = IntGauge::new(
        "notifier_active_listeners",
        "Registrations currently indexed"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Registers the notifier collectors with [`REGISTRY`]. Safe to call repeatedly.
pub fn register_custom_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(EVENTS_PUBLISHED.clone()),
            Box::new(EVENTS_DELIVERED.clone()),
            Box::new(DELIVERY_FAILURES.clone()),
            Box::new(SYNTHETIC_EVENTS.clone()),
            Box::new(EVENTS_CAPTURED.clone()),
            Box::new(CLUSTER_SEND_FAILURES.clone()),
            Box::new(ACTIVE_LISTENERS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                error!("collector can not be registered: {:?}", e);
            }
        }
    });
}

/// Renders the notifier metrics followed by the autometrics ones in
/// Prometheus text format
pub fn gather() -> String {
    register_custom_metrics();

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    let mut res = String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    });

    res.push_str(&prometheus_exporter::encode_http_response().into_body());
    res
}
