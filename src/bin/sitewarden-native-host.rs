//! Chrome Native Messaging Host for Sitewarden
//!
//! Runs the tracking, blocking and reminder core for the Sitewarden browser
//! extension, talking to it over stdin/stdout with Chrome's native
//! messaging protocol. Logs go to stderr.

use sitewarden_lib::{init, native_host::NativeHost};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    init_logging();

    let (config, store) = match init() {
        Ok(initialized) => initialized,
        Err(e) => {
            log::error!("Sitewarden initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Sitewarden native host using {}", config.db_path.display());
    let host = NativeHost::new(store, &config);

    // Runs until Chrome closes the connection
    if let Err(e) = runtime.block_on(host.run(tokio::io::stdin(), tokio::io::stdout())) {
        log::error!("Native host error: {e}");
        std::process::exit(1);
    }
}
