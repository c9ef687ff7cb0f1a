//! # Static Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, instala el subscriber de logs y corre el
//! servidor hasta recibir Ctrl-C.

use static_server::config::Config;
use static_server::server::Server;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let config = Config::new();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_thread_names(true)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("cannot install log subscriber: {}", e);
    }

    config.log_summary();

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "cannot start server");
            std::process::exit(1);
        }
    };

    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || handle.shutdown()) {
        error!(error = %e, "cannot install Ctrl-C handler");
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        error!(error = %e, "fatal server error");
        std::process::exit(1);
    }

    info!("bye");
}
