//! Tracing subscriber setup for the `codeweaver` binary.
//!
//! Pipeline events go to stderr so stdout carries only the result envelope.
//! HTTP client internals are held at `warn` unless `RUST_LOG` says otherwise.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose debug output drowns the pipeline's own events.
const QUIET_TARGETS: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "rustls=warn",
    "h2=warn",
];

/// `RUST_LOG` when set, else `level` with the HTTP stack quietened.
fn build_filter(level: Level) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    QUIET_TARGETS
        .iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(
            EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
            EnvFilter::add_directive,
        )
}

/// Install the global subscriber. Only the first call in a process has effect.
///
/// With `json`, each line is one JSON object carrying the enclosing
/// `codeweaver.run` span, so `run_id` and `repo` appear on every event.
pub fn init_tracing(json: bool, level: Level) {
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .ok();
}
