use std::{io, sync::Once};

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::render::METRIC_DOCUMENTS_TOTAL,
    config::{LogFormat, LoggingSettings},
    engine::{
        block::METRIC_BLOCKS_TOTAL, context::METRIC_EMISSIONS_TOTAL,
        inline::METRIC_INLINES_TOTAL,
    },
};

use super::error::InfraError;

/// Counters recorded while weaving, with their descriptions.
pub(crate) const COUNTERS: [(&str, &str); 4] = [
    (METRIC_BLOCKS_TOTAL, "Code blocks executed."),
    (METRIC_INLINES_TOTAL, "Inline expressions evaluated."),
    (METRIC_EMISSIONS_TOTAL, "Values emitted by snippets."),
    (METRIC_DOCUMENTS_TOTAL, "Documents woven successfully."),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. Every layer writes to standard error;
/// standard output carries only the woven document.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(name, Unit::Count, description);
        }
    });

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .without_time()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber already set: {err}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::COUNTERS;

    #[test]
    fn counter_names_are_unique_and_prefixed() {
        let names: HashSet<_> = COUNTERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), COUNTERS.len());
        assert!(names.iter().all(|name| name.starts_with("tessera_")));
    }
}
