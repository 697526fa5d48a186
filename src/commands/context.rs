use anyhow::{Context as _, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::output::Output;
use crate::api::Sdk;
use crate::config::{Settings, Workspace, default_config_path};
use crate::http::{ApiClient, ClientConfig, RetryOptions};
use crate::runtime::Runtime;

/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "xc-token";

/// Connection flags given on the command line; each one wins over the
/// selected workspace.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Workspace to use instead of the current one
    #[arg(long, short = 'w', env = "TABLECTL_WORKSPACE", global = true)]
    pub workspace: Option<String>,

    /// Service URL, e.g. https://db.example.com
    #[arg(long = "base-url", env = "TABLECTL_BASE_URL", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// API token, sent as the xc-token header
    #[arg(long, env = "TABLECTL_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Base id or alias
    #[arg(long = "base", value_name = "BASE", global = true)]
    pub base_id: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Total attempts per request, the first included (0 disables retrying)
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<u32>,

    /// Delay between attempts in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub retry_delay_ms: Option<u64>,

    /// Never retry failed requests
    #[arg(long, global = true)]
    pub no_retry: bool,
}

/// Everything a command needs: system access, settings and output.
pub struct Context<R: Runtime> {
    pub runtime: R,
    pub config_path: PathBuf,
    pub settings: Settings,
    pub output: Output,
}

impl<R: Runtime> Context<R> {
    #[tracing::instrument(skip(runtime, output))]
    pub fn load(runtime: R, config_path: Option<PathBuf>, output: Output) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path(&runtime)?,
        };
        debug!("Using settings file {:?}", config_path);
        let settings = Settings::load(&runtime, &config_path)?;
        Ok(Self {
            runtime,
            config_path,
            settings,
            output,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.settings.save(&self.runtime, &self.config_path)
    }

    fn workspace(&self, args: &ConnectionArgs) -> Result<Option<&Workspace>> {
        Ok(self
            .settings
            .workspace(args.workspace.as_deref())?
            .map(|(_, ws)| ws))
    }

    /// Resolves the effective client configuration: flags, then workspace,
    /// then defaults.
    pub fn client_config(&self, args: &ConnectionArgs) -> Result<ClientConfig> {
        let workspace = self.workspace(args)?;

        let base_url = args
            .base_url
            .clone()
            .or_else(|| workspace.map(|ws| ws.base_url.clone()))
            .context("No base URL configured. Pass --base-url or run `tablectl workspace add`")?;

        let mut config = ClientConfig::new(&base_url)?;

        if let Some(ws) = workspace {
            for (name, value) in &ws.headers {
                config = config.with_header(name, value)?;
            }
            if let Some(ms) = ws.timeout_ms {
                config = config.with_timeout(Duration::from_millis(ms));
            }
            if let Some(retry) = &ws.retry {
                config = config.with_retry(retry.clone());
            }
        }

        let token = args
            .token
            .clone()
            .or_else(|| workspace.and_then(|ws| ws.token.clone()));
        if let Some(token) = token {
            config = config.with_secret_header(TOKEN_HEADER, &token)?;
        }

        if let Some(ms) = args.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }

        if args.no_retry {
            config = config.with_retry(RetryOptions::disabled());
        } else {
            let mut retry = config.retry.clone();
            if let Some(attempts) = args.retries {
                retry.max_attempts = attempts;
            }
            if let Some(delay) = args.retry_delay_ms {
                retry.delay_ms = delay;
            }
            config = config.with_retry(retry);
        }

        Ok(config)
    }

    pub fn client(&self, args: &ConnectionArgs) -> Result<ApiClient> {
        Ok(ApiClient::new(self.client_config(args)?)?)
    }

    pub fn sdk(&self, args: &ConnectionArgs) -> Result<Sdk<ApiClient>> {
        Ok(Sdk::new(self.client(args)?))
    }

    /// The base to operate on: `--base`, else the workspace default.
    pub fn base_id(&self, args: &ConnectionArgs) -> Result<String> {
        let base = match &args.base_id {
            Some(base) => base.clone(),
            None => self
                .workspace(args)?
                .and_then(|ws| ws.base_id.clone())
                .context("No base selected. Pass --base or set a workspace default base")?,
        };
        Ok(self.resolve(&base).to_string())
    }

    /// Maps an alias to its id.
    pub fn resolve<'a>(&'a self, id_or_alias: &'a str) -> &'a str {
        self.settings.resolve(id_or_alias)
    }

    /// Reads a JSON argument given inline or as `@path`.
    pub fn read_json(&self, input: &str) -> Result<serde_json::Value> {
        let text = match input.strip_prefix('@') {
            Some(path) => self.runtime.read_to_string(Path::new(path))?,
            None => input.to_string(),
        };
        serde_json::from_str(&text).context("Invalid JSON input")
    }
}
