use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use crate::auth::Token;
use crate::commands::ci::CiCommand;
use crate::commands::label::LabelCommand;
use crate::commands::mr::MrCommand;
use crate::commands::release::ReleaseCommand;
use crate::commands::snippet::SnippetCommand;
use crate::commands::update::UpdateCommand;
use crate::commands::{self, Context};
use crate::config::{Config, OutputFormat};
use crate::error::LabError;
use crate::gitlab::GitLabClient;
use crate::update;

#[derive(Parser)]
#[command(name = "lab")]
#[command(
    author,
    version,
    about = "Work with GitLab pipelines, merge requests, releases, labels and snippets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Instance URL, e.g. https://gitlab.com
    #[arg(long, global = true, env = "LAB_CORE_HOST")]
    host: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "LAB_CORE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Project path such as group/project; detected from the git remote otherwise
    #[arg(short = 'P', long, global = true, env = "LAB_PROJECT")]
    project: Option<String>,

    /// Git remote to detect the project from
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// More logging; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Pipelines and jobs
    #[command(subcommand)]
    Ci(CiCommand),

    /// Merge requests
    #[command(subcommand)]
    Mr(MrCommand),

    /// Releases and their assets
    #[command(subcommand)]
    Release(ReleaseCommand),

    /// Project labels
    #[command(subcommand)]
    Label(LabelCommand),

    /// Project and personal snippets
    #[command(subcommand)]
    Snippet(SnippetCommand),

    /// Check for a newer lab
    #[command(subcommand)]
    Update(UpdateCommand),
}

impl Cli {
    /// Default `env_logger` filter for the requested verbosity.
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    fn context(&self, config: &Config, format: OutputFormat) -> Result<Context> {
        let host = self.host.as_deref().unwrap_or(&config.core.host);
        let token = self
            .token
            .as_deref()
            .or(config.core.token.as_deref())
            .and_then(Token::non_empty);
        if token.is_none() {
            debug!("No token configured, requests are anonymous");
        }
        let client =
            GitLabClient::new(host, token).with_context(|| format!("connect to '{host}'"))?;

        let remote = self
            .remote
            .clone()
            .unwrap_or_else(|| config.core.remote.clone());
        Ok(Context::new(client, self.project.clone(), remote, format))
    }

    pub async fn execute(&self) -> Result<()> {
        let config_path = Config::resolve_path(self.config.as_deref());
        let mut config = Config::load(config_path.as_deref())
            .map_err(|e| LabError::Config(format!("{e:#}")))?;
        if let Some(path) = &config_path {
            debug!("Config file: {}", path.display());
        }
        let format = self.output.unwrap_or(config.output.format);

        if let Commands::Update(command) = &self.command {
            return commands::update::execute(command, &mut config, config_path.as_deref(), format)
                .await;
        }

        let ctx = self.context(&config, format)?;
        info!("Using {}", ctx.client.base_url());
        let result = match &self.command {
            Commands::Ci(command) => commands::ci::execute(&ctx, command).await,
            Commands::Mr(command) => commands::mr::execute(&ctx, command).await,
            Commands::Release(command) => commands::release::execute(&ctx, command).await,
            Commands::Label(command) => commands::label::execute(&ctx, command).await,
            Commands::Snippet(command) => commands::snippet::execute(&ctx, command).await,
            Commands::Update(_) => Ok(()),
        };

        update::run_automatic(&mut config, config_path.as_deref()).await;
        result
    }
}
