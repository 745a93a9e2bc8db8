use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::locations::METRIC_LOCATION_REBUILD_MS;
use crate::cache::{
    METRIC_GROUP_FLUSH, METRIC_LOCAL_HIT, METRIC_MISS, METRIC_SHARED_ERROR, METRIC_SHARED_HIT,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with the installed recorder. Runs once per process.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_LOCAL_HIT,
            Unit::Count,
            "Total number of process-local cache hits."
        );
        describe_counter!(
            METRIC_SHARED_HIT,
            Unit::Count,
            "Total number of shared cache hits promoted to the local tier."
        );
        describe_counter!(
            METRIC_MISS,
            Unit::Count,
            "Total number of reads missing both cache tiers."
        );
        describe_counter!(
            METRIC_SHARED_ERROR,
            Unit::Count,
            "Total number of shared cache failures absorbed, labelled by operation."
        );
        describe_counter!(
            METRIC_GROUP_FLUSH,
            Unit::Count,
            "Total number of shared cache group flushes."
        );
        describe_histogram!(
            METRIC_LOCATION_REBUILD_MS,
            Unit::Milliseconds,
            "Published location list rebuild latency in milliseconds."
        );
    });
}
