//! Secrets HTTP proxy
//!
//! Exposes a secret-management client as a small RESTful API on a local
//! socket, so any HTTP-capable program can read and write secrets.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http server ─▶ routing ─▶ secret handler ──┼──▶ Secret
//!                           │    (request id,   (strip      (validate path, │    Service
//!     Client Response       │     timeout)      prefix)      dispatch verb) │
//!     ◀─────────────────────┼── response mapping ◀────────── secret client ◀┼───
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser};

use secrets_http_proxy::lifecycle::{self, StartupOptions};
use secrets_http_proxy::observability::{logging, metrics};
use secrets_http_proxy::{ClientProxy, PROGRAM};

#[derive(Debug, Parser)]
#[command(name = PROGRAM, version, about, disable_help_flag = true)]
struct Args {
    /// Credential file, or the encoded credential itself.
    #[arg(short = 'C', long, env = "SECRETS_PROXY_CREDENTIAL")]
    credential: Option<String>,

    /// Passphrase to decrypt the credential. Asked for on the terminal if omitted.
    #[arg(short = 'P', long, env = "SECRETS_PROXY_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Host to listen on [default: 127.0.0.1].
    #[arg(short = 'h', long)]
    host: Option<String>,

    /// Port to listen on [default: 8080].
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(long, env = "SECRETS_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl From<Args> for StartupOptions {
    fn from(args: Args) -> Self {
        Self {
            credential: args.credential,
            passphrase: args.passphrase,
            host: args.host,
            port: args.port,
            config_path: args.config,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version requests are "errors" that go to stdout.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args.into()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{PROGRAM}: error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: StartupOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = lifecycle::resolve_config(&options)?;
    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address(),
        revision = %config.api.revision,
        request_timeout_secs = config.timeouts.request_secs,
        "{PROGRAM} starting"
    );

    if config.observability.metrics_enabled {
        let address = config.observability.metrics_address.parse()?;
        metrics::init_metrics(address)?;
    }

    let proxy: Arc<dyn ClientProxy> = Arc::new(lifecycle::build_proxy(&config, &options)?);

    let serving = tokio::spawn({
        let proxy = Arc::clone(&proxy);
        async move { proxy.start().await }
    });
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => {
            // The server only returns on its own when it failed to start or serve.
            result??;
            return Ok(());
        }
        _ = lifecycle::shutdown_signal() => {
            tracing::info!("Shutting down gracefully...");
        }
    }

    proxy.stop().await?;
    serving.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
