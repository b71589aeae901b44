use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use log::info;
use url::Url;

use super::{download_to, sanitize_filename, Context, SavedFile};
use crate::error::LabError;
use crate::gitlab::client::releases::{NewRelease, NewReleaseLink};
use crate::gitlab::links::upload_url;
use crate::gitlab::types::{Release, ReleaseLink};
use crate::output::render::render_release;
use crate::output::styling::{bright, cyan};
use crate::output::tables::releases_table;

#[derive(Subcommand)]
pub enum ReleaseCommand {
    /// List releases, newest first
    List(ListArgs),
    /// Show a release and its assets
    Show(ShowArgs),
    /// Create a release, uploading any assets
    Create(CreateArgs),
    /// Upload files and link them to an existing release
    Upload(UploadArgs),
    /// Download linked assets of a release
    Download(DownloadArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LinkType {
    #[default]
    Other,
    Runbook,
    Image,
    Package,
}

impl LinkType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Runbook => "runbook",
            Self::Image => "image",
            Self::Package => "package",
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    tag: String,
}

#[derive(Args)]
pub struct CreateArgs {
    tag: String,

    /// Release title; defaults to the tag
    #[arg(long)]
    name: Option<String>,

    /// Release notes
    #[arg(short, long)]
    notes: Option<String>,

    /// Read release notes from a file
    #[arg(short = 'F', long, conflicts_with = "notes")]
    notes_file: Option<PathBuf>,

    /// Commit, branch or tag to create the tag from if it does not exist
    #[arg(long = "ref", value_name = "REF")]
    ref_: Option<String>,

    /// Milestone title, repeatable
    #[arg(long = "milestone")]
    milestones: Vec<String>,

    /// File to upload and attach, repeatable
    #[arg(short, long = "asset")]
    assets: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = LinkType::Other)]
    link_type: LinkType,
}

#[derive(Args)]
pub struct UploadArgs {
    tag: String,

    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = LinkType::Other)]
    link_type: LinkType,
}

#[derive(Args)]
pub struct DownloadArgs {
    tag: String,

    /// Asset names; all linked assets when omitted
    assets: Vec<String>,

    /// Directory to save into
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

pub async fn execute(ctx: &Context, command: &ReleaseCommand) -> Result<()> {
    match command {
        ReleaseCommand::List(args) => list(ctx, args).await,
        ReleaseCommand::Show(args) => show(ctx, args).await,
        ReleaseCommand::Create(args) => create(ctx, args).await,
        ReleaseCommand::Upload(args) => upload(ctx, args).await,
        ReleaseCommand::Download(args) => download(ctx, args).await,
    }
}

async fn list(ctx: &Context, args: &ListArgs) -> Result<()> {
    let project = ctx.project()?;
    let releases = ctx
        .client
        .list_releases(&project, args.limit)
        .await
        .context("list releases")?;
    ctx.emit(&releases, |releases| releases_table(releases).to_string())
}

async fn show(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let project = ctx.project()?;
    let release = get_release(ctx, &project, &args.tag).await?;
    ctx.emit(&release, render_release)
}

async fn get_release(ctx: &Context, project: &str, tag: &str) -> Result<Release> {
    ctx.client
        .get_release(project, tag)
        .await
        .with_context(|| format!("get release {tag}"))
}

async fn create(ctx: &Context, args: &CreateArgs) -> Result<()> {
    // Fail on unreadable inputs before anything is created remotely
    let description = match &args.notes_file {
        Some(path) => Some(
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
        ),
        None => args.notes.clone(),
    };
    for asset in &args.assets {
        ensure_file(asset)?;
    }

    let project = ctx.project()?;
    let request = NewRelease {
        tag_name: args.tag.clone(),
        name: args.name.clone(),
        description,
        ref_: args.ref_.clone(),
        milestones: args.milestones.clone(),
    };
    let release = ctx
        .client
        .create_release(&project, &request)
        .await
        .with_context(|| format!("create release {}", args.tag))?;
    info!("Created release {}", release.tag_name);

    let links = upload_assets(ctx, &project, &args.tag, &args.assets, args.link_type).await?;

    if ctx.is_json() {
        let release = if links.is_empty() {
            release
        } else {
            get_release(ctx, &project, &args.tag).await?
        };
        return crate::output::print_json(&release);
    }
    println!("Created release {}", bright(&release.tag_name));
    Ok(())
}

async fn upload(ctx: &Context, args: &UploadArgs) -> Result<()> {
    for file in &args.files {
        ensure_file(file)?;
    }
    let project = ctx.project()?;
    let links = upload_assets(ctx, &project, &args.tag, &args.files, args.link_type).await?;
    if ctx.is_json() {
        crate::output::print_json(&links)?;
    }
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        let message = format!("no such file: {}", path.display());
        return Err(LabError::validation(message).into());
    }
    Ok(())
}

/// Upload each file and attach it to the release under its base name.
async fn upload_assets(
    ctx: &Context,
    project: &str,
    tag: &str,
    files: &[PathBuf],
    link_type: LinkType,
) -> Result<Vec<ReleaseLink>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let web_url = ctx
        .client
        .get_project(project)
        .await
        .with_context(|| format!("get project {project}"))?
        .web_url;

    let mut links = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LabError::validation(format!("not a file: {}", file.display()))
            })?;

        let upload = ctx
            .client
            .upload_file(project, file)
            .await
            .with_context(|| format!("upload {}", file.display()))?;
        let link = NewReleaseLink {
            name,
            url: upload_url(&web_url, &upload),
            link_type: Some(link_type.as_str().to_string()),
        };
        let created = ctx
            .client
            .create_release_link(project, tag, &link)
            .await
            .with_context(|| format!("link {} to release {tag}", link.name))?;

        if !ctx.is_json() {
            println!("Attached {} {}", bright(&created.name), cyan(&created.url));
        }
        links.push(created);
    }
    Ok(links)
}

/// The requested links, or all of them; an unknown name is an error.
fn select_links<'a>(
    release: &'a Release,
    requested: &[String],
) -> crate::error::Result<Vec<&'a ReleaseLink>> {
    if requested.is_empty() {
        return Ok(release.assets.links.iter().collect());
    }
    requested
        .iter()
        .map(|name| {
            release
                .assets
                .links
                .iter()
                .find(|link| link.name == *name)
                .ok_or_else(|| {
                    LabError::NotFound(format!(
                        "asset '{name}' in release {}",
                        release.tag_name
                    ))
                })
        })
        .collect()
}

async fn download(ctx: &Context, args: &DownloadArgs) -> Result<()> {
    let project = ctx.project()?;
    let release = get_release(ctx, &project, &args.tag).await?;
    let links = select_links(&release, &args.assets)?;
    if links.is_empty() {
        eprintln!("Release {} has no linked assets", release.tag_name);
        return Ok(());
    }

    // Validate every target before the first transfer starts
    let targets = links
        .into_iter()
        .map(|link| -> crate::error::Result<_> {
            Ok((link, args.dir.join(sanitize_filename(&link.name)?)))
        })
        .collect::<crate::error::Result<Vec<_>>>()?;

    tokio::fs::create_dir_all(&args.dir)
        .await
        .with_context(|| format!("create {}", args.dir.display()))?;

    let mut saved = Vec::with_capacity(targets.len());
    for (link, path) in targets {
        let source = link.direct_asset_url.as_deref().unwrap_or(&link.url);
        let url = Url::parse(source)
            .map_err(LabError::from)
            .with_context(|| format!("asset {} has an invalid URL", link.name))?;
        let response = ctx
            .client
            .fetch(url)
            .await
            .with_context(|| format!("download {}", link.name))?;
        let bytes = download_to(response, &path, args.force).await?;
        let file = SavedFile { path, bytes };
        if !ctx.is_json() {
            println!("{}", file.message());
        }
        saved.push(file);
    }
    if ctx.is_json() {
        crate::output::print_json(&saved)?;
    }
    Ok(())
}
