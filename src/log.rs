use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Directives from `RUST_LOG` when present and valid, the crate default otherwise.
fn env_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
  let level = if verbose { "debug" } else { "info" };
  directives
    .and_then(|d| EnvFilter::try_new(d).ok())
    .unwrap_or_else(|| EnvFilter::new(format!("frontier_rs={level}")))
}

/// Install the global subscriber. `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) {
  let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

  tracing_subscriber::registry()
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time(),
    )
    .with(env_filter(verbose, directives.as_deref()))
    .init();
}
