use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;

use crate::config::{Config, OutputFormat};
use crate::update::{self, UpdateStatus};

#[derive(Subcommand)]
pub enum UpdateCommand {
    /// Check now whether a newer lab release exists
    Check,
}

#[derive(Serialize)]
struct CheckReport {
    current: String,
    latest: String,
    update_available: bool,
}

impl From<&UpdateStatus> for CheckReport {
    fn from(status: &UpdateStatus) -> Self {
        match status {
            UpdateStatus::UpToDate(current) => Self {
                current: current.to_string(),
                latest: current.to_string(),
                update_available: false,
            },
            UpdateStatus::Available { current, latest } => Self {
                current: current.to_string(),
                latest: latest.to_string(),
                update_available: true,
            },
        }
    }
}

/// Runs without an API context: the release host is configured separately.
pub async fn execute(
    command: &UpdateCommand,
    config: &mut Config,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        UpdateCommand::Check => {
            let status = update::check(&config.update)
                .await
                .with_context(|| format!("check {} for updates", config.update.project))?;
            update::record_check(config, config_path, Utc::now());
            crate::output::emit(format, &CheckReport::from(&status), |_| status.notice())
        }
    }
}
