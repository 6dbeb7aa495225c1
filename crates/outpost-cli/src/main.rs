use outpost_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "outpost_cli=info".into()))
        .init();

    if let Err(e) = run_cli().await {
        error!("outpost CLI error: {e}");

        let exit_code = match e {
            CliError::Configuration(_) => 1,
            CliError::Request(_) => 2,
            CliError::ServiceError { .. } => 3,
            CliError::InvalidArgument { .. } => 4,
            CliError::Io(_) => 5,
            CliError::Json(_) => 6,
            CliError::Serialization(_) => 7,
        };

        std::process::exit(exit_code);
    }
}
