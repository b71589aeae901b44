pub mod ci;
pub mod label;
pub mod mr;
pub mod release;
pub mod snippet;
pub mod update;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use log::{debug, info};
use reqwest::Response;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::config::OutputFormat;
use crate::error::LabError;
use crate::git;
use crate::gitlab::GitLabClient;
use crate::output::{self, TransferProgress};
use crate::prompt;

/// What every command handler gets to work with.
#[derive(Debug)]
pub struct Context {
    pub client: GitLabClient,
    pub format: OutputFormat,
    pub remote: String,
    project: Option<String>,
}

impl Context {
    pub fn new(
        client: GitLabClient,
        project: Option<String>,
        remote: String,
        format: OutputFormat,
    ) -> Self {
        Self {
            client,
            format,
            remote,
            project,
        }
    }

    /// The explicit `--project`, else the path derived from the git remote.
    pub fn project(&self) -> Result<String> {
        if let Some(project) = &self.project {
            return Ok(project.clone());
        }
        let url = git::remote_url(&self.remote)
            .with_context(|| format!("detect project from remote '{}'", self.remote))?;
        let project = git::project_from_remote_url(&url)?;
        debug!("Using project {project} from remote {}", self.remote);
        Ok(project)
    }

    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        output::emit(self.format, value, render)
    }

    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

/// A file written by a download command.
#[derive(Debug, Serialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

impl SavedFile {
    pub fn message(&self) -> String {
        format!("Saved {}", self.path.display())
    }
}

/// The given branch, or the checked-out one.
pub fn branch_or_current(explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(branch) if !branch.is_empty() => Ok(branch.to_string()),
        _ => Ok(git::current_branch()?),
    }
}

/// Ask before a destructive action unless `--yes` was given or nobody is at
/// the terminal to answer.
pub fn confirmed(question: &str, yes: bool) -> Result<bool> {
    if yes || !prompt::stdin_is_terminal() {
        return Ok(true);
    }
    let answer = prompt::confirm(question)?;
    if !answer {
        eprintln!("Aborted.");
    }
    Ok(answer)
}

/// Reduce a server-provided name to a safe local file name.
///
/// Only the last path component is kept; empty names, `.`, `..` and names
/// containing NUL are rejected.
pub fn sanitize_filename(name: &str) -> crate::error::Result<String> {
    if name.contains('\0') {
        return Err(LabError::validation(format!(
            "refusing file name containing NUL: {name:?}"
        )));
    }
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." {
        return Err(LabError::validation(format!(
            "refusing unsafe file name: {name:?}"
        )));
    }
    Ok(last.to_string())
}

/// Stream a response body into `path`, showing transfer progress.
///
/// Without `force` an existing file is left alone and reported as an error.
/// A partially written file is removed when the transfer fails.
pub async fn download_to(response: Response, path: &Path, force: bool) -> Result<u64> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = match options.open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(LabError::validation(format!(
                "{} already exists, pass --force to overwrite",
                path.display()
            ))
            .into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("create {}", path.display()));
        }
    };

    let label = path
        .file_name()
        .map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
    let progress = TransferProgress::start(&label, response.content_length());

    match write_body(response, file, &progress).await {
        Ok(written) => {
            progress.finish();
            info!("Wrote {written} bytes to {}", path.display());
            Ok(written)
        }
        Err(e) => {
            progress.fail();
            let _ = tokio::fs::remove_file(path).await;
            Err(e).with_context(|| format!("download {}", path.display()))
        }
    }
}

async fn write_body(
    mut response: Response,
    mut file: tokio::fs::File,
    progress: &TransferProgress,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        let len = chunk.len() as u64;
        progress.advance(len);
        written += len;
    }
    file.flush().await?;
    Ok(written)
}
