//! `skillspark-server` binary entrypoint.
//!
//! This starts the Actix server using configuration from environment
//! variables (and `SKILLSPARK_CONFIG`, if set).

use skillspark_server::{serve, telemetry, ServerConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    telemetry::init_subscriber(&config.telemetry);

    serve(config).await
}
