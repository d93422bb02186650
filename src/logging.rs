//! Subscriber setup for the `papertag` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded result, enrichment for a paper lost |
//! | WARN  | Recoverable issue, fallback applied (score nulled, tagging skipped) |
//! | INFO  | Lifecycle events, ingestion and batch completions |
//! | DEBUG | Decision points: tag/combo creation, novelty changes, cache recomputes |
//! | TRACE | Per-item signals (individual tag confidences, pair sightings) |

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "papertag=info";

/// Install a global fmt subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. With `json` set, events
/// are emitted as JSON lines.
pub fn init(default_filter: &str, json: bool) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_installs_once() {
        assert!(init(DEFAULT_FILTER, true).is_ok());
        assert!(init(DEFAULT_FILTER, false).is_err());
    }
}
