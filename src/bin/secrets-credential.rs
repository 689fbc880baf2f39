use clap::{Parser, Subcommand};

use secrets_http_proxy::credential::{self, Credential};

#[derive(Parser)]
#[command(name = "secrets-credential")]
#[command(about = "Create and inspect credentials for the secrets HTTP proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a credential, encrypted when a passphrase is given
    Encode {
        /// Base URL of the secret service
        #[arg(short, long)]
        endpoint: String,

        /// Access token for the secret service
        #[arg(short, long, env = "SECRETS_PROXY_TOKEN", hide_env_values = true)]
        token: String,

        #[arg(short = 'P', long, env = "SECRETS_PROXY_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },
    /// Decode a credential (file path or inline) and show its endpoint
    Inspect {
        credential: String,

        #[arg(short = 'P', long, env = "SECRETS_PROXY_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            endpoint,
            token,
            passphrase,
        } => {
            let credential = Credential::new(&endpoint, token)?;
            let encoded = match passphrase.as_deref().filter(|p| !p.is_empty()) {
                Some(passphrase) => credential.encrypt(passphrase)?,
                None => credential.encode(),
            };
            println!("{encoded}");
        }
        Commands::Inspect {
            credential: reference,
            passphrase,
        } => {
            let credential = credential::load(&reference, passphrase.as_deref())?;
            println!("endpoint: {}", credential.endpoint());
        }
    }

    Ok(())
}
