//! Log output for binaries and tests embedding playmesh.
//!
//! Libraries only emit `tracing` events; nothing is printed until some
//! subscriber is installed. Games with their own subscriber skip this
//! module entirely.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "playmesh=info,playmesh_session=info";

/// Installs a compact stderr subscriber filtered by `RUST_LOG`, falling
/// back to [`DEFAULT_DIRECTIVES`].
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes. Safe to call more than once.
pub fn init() -> bool {
    init_with(DEFAULT_DIRECTIVES)
}

/// Like [`init`], with caller-chosen fallback directives.
pub fn init_with(default_directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}
