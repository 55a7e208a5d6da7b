use coursedb::{Config, define_schema, provision};
use mimalloc::MiMalloc;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = Config::load();
    let loglevel = cfg
        .as_ref()
        .map(|c| c.loglevel.clone())
        .unwrap_or_else(|_| "info".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loglevel));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_level(true)
                .with_target(false),
        )
        .init();

    let conn = match cfg.and_then(|c| c.connection()) {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match provision(&define_schema(), &conn).await {
        Ok(report) => {
            info!(
                created = ?report.created,
                verified = ?report.verified,
                "schema provisioned"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "provisioning failed");
            ExitCode::FAILURE
        }
    }
}
