//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply command-line overrides
//! - Decode the credential and build the secret client
//! - Assemble the proxy around the client
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Command-line flags override the configuration file
//! - The socket is bound later, by `RestProxy::start`
//! - An encrypted credential without `--passphrase` prompts only on a terminal

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::Term;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::client::{ClientError, RemoteClient, SecretClient};
use crate::config::{load_config, validate_config, ConfigError, ProxyConfig};
use crate::credential::{self, Credential, CredentialError};
use crate::http::RestProxy;

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Credential file path or inline encoded credential.
    pub credential: Option<String>,
    pub passphrase: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("credential is required")]
    MissingCredential,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("could not create secret client: {0}")]
    Client(#[from] ClientError),

    #[error("could not read passphrase: {0}")]
    Prompt(#[source] io::Error),
}

const PASSPHRASE_PROMPT: &str = "Please put in the passphrase to unlock your credential: ";

/// Configuration file (or defaults) with command-line overrides applied.
pub fn resolve_config(options: &StartupOptions) -> Result<ProxyConfig, StartupError> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(host) = &options.host {
        config.listener.host = host.clone();
    }
    if let Some(port) = options.port {
        config.listener.port = port;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read a passphrase without echo, or `None` when not attached to a terminal.
pub fn terminal_prompt() -> io::Result<Option<Zeroizing<String>>> {
    let term = Term::stderr();
    if !io::stdin().is_terminal() || !term.is_term() {
        return Ok(None);
    }

    term.write_str(PASSPHRASE_PROMPT)?;
    let passphrase = term.read_secure_line()?;
    Ok(Some(Zeroizing::new(passphrase)))
}

/// Load the credential, asking `prompt` for a passphrase if it is encrypted
/// and none was given.
pub fn load_credential<P>(
    reference: &str,
    passphrase: Option<&str>,
    prompt: P,
) -> Result<Credential, StartupError>
where
    P: FnOnce() -> io::Result<Option<Zeroizing<String>>>,
{
    match credential::load(reference, passphrase) {
        Err(CredentialError::PassphraseRequired) if passphrase.is_none() => {
            match prompt().map_err(StartupError::Prompt)? {
                Some(entered) => Ok(credential::load(reference, Some(entered.as_str()))?),
                None => Err(CredentialError::PassphraseRequired.into()),
            }
        }
        result => Ok(result?),
    }
}

/// Build the proxy in front of a remote client authenticated by the credential.
pub fn build_proxy(config: &ProxyConfig, options: &StartupOptions) -> Result<RestProxy, StartupError> {
    build_proxy_with(config, options, terminal_prompt)
}

/// [`build_proxy`] with a custom passphrase prompt.
pub fn build_proxy_with<P>(
    config: &ProxyConfig,
    options: &StartupOptions,
    prompt: P,
) -> Result<RestProxy, StartupError>
where
    P: FnOnce() -> io::Result<Option<Zeroizing<String>>>,
{
    let reference = options
        .credential
        .as_deref()
        .filter(|reference| !reference.trim().is_empty())
        .ok_or(StartupError::MissingCredential)?;

    let credential = load_credential(reference, options.passphrase.as_deref(), prompt)?;
    let client = RemoteClient::new(
        &credential,
        Duration::from_secs(config.timeouts.upstream_secs),
    )?;

    tracing::info!(
        endpoint = %credential.endpoint(),
        revision = %config.api.revision,
        mount_prefix = config.api.revision.mount_prefix(),
        "Secret client ready"
    );

    let client: Arc<dyn SecretClient> = Arc::new(client);
    Ok(RestProxy::new(config, client))
}
