use std::process::ExitCode;

use log::error;
use santa_core::{init_logging, LoggingConfig};
use santa_server::{config::ServerConfig, start_server};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("santa-server: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = LoggingConfig::new(config.log_level.clone(), config.log_dir.clone())
        .with_stderr_echo(true);
    if let Err(err) = init_logging(&logging) {
        eprintln!("santa-server: {err}");
        return ExitCode::FAILURE;
    }

    match start_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=http status=error error={err}");
            eprintln!("santa-server: {err}");
            ExitCode::FAILURE
        }
    }
}
