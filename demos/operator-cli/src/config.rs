//! Demo settings
//!
//! Everything comes from the environment so the demo can be pointed at a
//! local backend without flags.

use std::path::PathBuf;

/// Log filter variable, e.g. `SKYSHOT_LOG=skyshot_client=debug`
pub const LOG_ENV: &str = "SKYSHOT_LOG";

/// Password variable for non-interactive sign-in
pub const PASSWORD_ENV: &str = "SKYSHOT_PASSWORD";

/// Secure store location for the demo session
pub fn store_path() -> PathBuf {
    std::env::var_os("SKYSHOT_STORE")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("skyshot-operator-cli")
                .join("session.json")
        })
}

/// Install the tracing subscriber; quiet unless `SKYSHOT_LOG` is set
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
