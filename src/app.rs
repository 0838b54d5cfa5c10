use std::io;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::infrastructure::bootstrap;
use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::start_server;

pub fn run() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = AppConfig::load().map_err(|err| {
        error!(error = %err, "Failed to load configuration");
        io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
    })?;

    let state = bootstrap::setup(&config).map_err(|err| {
        error!(error = %err, "Failed to initialize components");
        io::Error::new(io::ErrorKind::Other, err.to_string())
    })?;

    actix_web::rt::System::new().block_on(async move {
        let server = start_server(state, &config.server.host, config.server.port)?;
        let result = server.await;
        info!("Server stopped");
        result
    })
}
