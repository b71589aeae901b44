use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Args, Subcommand};
use log::debug;
use serde::Serialize;

use super::{branch_or_current, download_to, sanitize_filename, Context, SavedFile};
use crate::error::LabError;
use crate::gitlab::types::{Job, Pipeline};
use crate::gitlab::GitLabClient;
use crate::output::render::{render_pipeline, sort_jobs_by_stage};
use crate::output::styling::{bright, status};
use crate::output::tables::pipelines_table;

const TRACE_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Subcommand)]
pub enum CiCommand {
    /// List pipelines, newest first
    List(ListArgs),
    /// Show a pipeline and its jobs
    Get(PipelineArgs),
    /// Retry a job, or every failed job of the pipeline
    Retry(JobArgs),
    /// Cancel a pipeline
    Cancel(PipelineArgs),
    /// Run a new pipeline on a ref
    Create(CreateArgs),
    /// Print a job's log
    Trace(TraceArgs),
    /// Download a job's artifacts archive
    Artifacts(ArtifactsArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Only pipelines for this branch or tag
    #[arg(value_name = "REF")]
    ref_: Option<String>,

    /// Only pipelines with this status (e.g. running, failed)
    #[arg(long)]
    status: Option<String>,

    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
pub struct PipelineArgs {
    /// Branch or tag; defaults to the current branch
    #[arg(value_name = "REF")]
    ref_: Option<String>,

    /// Pipeline ID instead of the latest pipeline of the ref
    #[arg(long)]
    pipeline: Option<u64>,
}

#[derive(Args)]
pub struct JobArgs {
    /// Branch or tag, or `REF:JOB`; defaults to the current branch
    #[arg(value_name = "REF")]
    ref_: Option<String>,

    /// Job name; defaults to the running, pending or newest job
    job: Option<String>,

    /// Pipeline ID instead of the latest pipeline of the ref
    #[arg(long)]
    pipeline: Option<u64>,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Branch or tag; defaults to the current branch
    #[arg(value_name = "REF")]
    ref_: Option<String>,

    /// Pipeline variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    variables: Vec<String>,
}

#[derive(Args)]
pub struct TraceArgs {
    #[command(flatten)]
    target: JobArgs,

    /// Keep printing new output until the job finishes
    #[arg(short, long)]
    follow: bool,
}

#[derive(Args)]
pub struct ArtifactsArgs {
    #[command(flatten)]
    target: JobArgs,

    /// Directory to save the archive in
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Overwrite an existing archive
    #[arg(long)]
    force: bool,
}

#[derive(Serialize)]
struct PipelineWithJobs<'a> {
    #[serde(flatten)]
    pipeline: &'a Pipeline,
    jobs: Vec<&'a Job>,
}

impl<'a> PipelineWithJobs<'a> {
    /// Jobs ordered by stage then id, the same for text and JSON.
    fn new(pipeline: &'a Pipeline, jobs: &'a [Job]) -> Self {
        Self {
            pipeline,
            jobs: sort_jobs_by_stage(jobs),
        }
    }
}

/// Ref and job name picked out of the positional arguments.
#[derive(Debug, PartialEq, Eq)]
struct JobTarget {
    ref_: Option<String>,
    job: Option<String>,
}

impl JobArgs {
    /// `REF JOB`, `REF:JOB` (`:JOB` for the current branch), or with
    /// `--pipeline` a lone `JOB`; refs cannot contain `:`.
    fn target(&self) -> JobTarget {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        match (self.ref_.as_deref(), self.job.as_deref()) {
            (first, Some(job)) => JobTarget {
                ref_: first.and_then(non_empty),
                job: non_empty(job),
            },
            (Some(first), None) => match first.split_once(':') {
                Some((ref_, job)) => JobTarget {
                    ref_: non_empty(ref_),
                    job: non_empty(job),
                },
                None if self.pipeline.is_some() => JobTarget {
                    ref_: None,
                    job: non_empty(first),
                },
                None => JobTarget {
                    ref_: non_empty(first),
                    job: None,
                },
            },
            (None, None) => JobTarget {
                ref_: None,
                job: None,
            },
        }
    }
}

pub async fn execute(ctx: &Context, command: &CiCommand) -> Result<()> {
    match command {
        CiCommand::List(args) => list(ctx, args).await,
        CiCommand::Get(args) => get(ctx, args).await,
        CiCommand::Retry(args) => retry(ctx, args).await,
        CiCommand::Cancel(args) => cancel(ctx, args).await,
        CiCommand::Create(args) => create(ctx, args).await,
        CiCommand::Trace(args) => trace(ctx, args).await,
        CiCommand::Artifacts(args) => artifacts(ctx, args).await,
    }
}

/// An explicit pipeline ID, else the latest pipeline of the ref.
async fn resolve_pipeline(
    client: &GitLabClient,
    project: &str,
    ref_: Option<&str>,
    pipeline_id: Option<u64>,
) -> Result<Pipeline> {
    if let Some(id) = pipeline_id {
        return client
            .get_pipeline(project, id)
            .await
            .with_context(|| format!("get pipeline {id}"));
    }
    let ref_ = branch_or_current(ref_)?;
    match client.latest_pipeline(project, &ref_).await {
        Ok(pipeline) => Ok(pipeline),
        Err(e) if e.is_not_found() => bail!("no pipeline found for '{ref_}'"),
        Err(e) => Err(e).with_context(|| format!("find latest pipeline for '{ref_}'")),
    }
}

/// First running job, else first pending, else the most recently created.
fn default_job(jobs: &[Job]) -> Option<&Job> {
    jobs.iter()
        .find(|job| job.status == "running")
        .or_else(|| jobs.iter().find(|job| job.status == "pending"))
        .or_else(|| jobs.iter().max_by_key(|job| (job.created_at, job.id)))
}

async fn resolve_job(
    client: &GitLabClient,
    project: &str,
    pipeline_id: u64,
    name: Option<&str>,
) -> Result<Job> {
    if let Some(name) = name {
        return client
            .find_pipeline_job(project, pipeline_id, name)
            .await
            .context("list pipeline jobs")?
            .ok_or_else(|| anyhow!("failed to find job: {name}"));
    }

    let jobs = client
        .pipeline_jobs(project, pipeline_id)
        .await
        .context("list pipeline jobs")?;
    default_job(&jobs)
        .cloned()
        .ok_or_else(|| anyhow!("pipeline {pipeline_id} has no jobs"))
}

async fn target_job(ctx: &Context, project: &str, args: &JobArgs) -> Result<Job> {
    let target = args.target();
    let pipeline =
        resolve_pipeline(&ctx.client, project, target.ref_.as_deref(), args.pipeline).await?;
    debug!("Using pipeline {}", pipeline.id);
    resolve_job(&ctx.client, project, pipeline.id, target.job.as_deref()).await
}

async fn list(ctx: &Context, args: &ListArgs) -> Result<()> {
    let project = ctx.project()?;
    let pipelines = ctx
        .client
        .list_pipelines(
            &project,
            args.ref_.as_deref(),
            args.status.as_deref(),
            args.limit,
        )
        .await
        .context("list pipelines")?;
    ctx.emit(&pipelines, |list| pipelines_table(list).to_string())
}

async fn get(ctx: &Context, args: &PipelineArgs) -> Result<()> {
    let project = ctx.project()?;
    let pipeline =
        resolve_pipeline(&ctx.client, &project, args.ref_.as_deref(), args.pipeline).await?;
    let jobs = ctx
        .client
        .pipeline_jobs(&project, pipeline.id)
        .await
        .context("list pipeline jobs")?;

    let view = PipelineWithJobs::new(&pipeline, &jobs);
    ctx.emit(&view, |view| render_pipeline(view.pipeline, &view.jobs))
}

async fn retry(ctx: &Context, args: &JobArgs) -> Result<()> {
    let project = ctx.project()?;
    let target = args.target();

    if target.job.is_none() {
        let pipeline =
            resolve_pipeline(&ctx.client, &project, target.ref_.as_deref(), args.pipeline).await?;
        let retried = ctx
            .client
            .retry_pipeline(&project, pipeline.id)
            .await
            .with_context(|| format!("retry pipeline {}", pipeline.id))?;
        return ctx.emit(&retried, |p| {
            format!(
                "Retried failed jobs of pipeline #{} ({})",
                p.id,
                status(&p.status)
            )
        });
    }

    let job = target_job(ctx, &project, args).await?;
    let retried = ctx
        .client
        .retry_job(&project, job.id)
        .await
        .with_context(|| format!("retry job {}", job.name))?;
    ctx.emit(&retried, |new| {
        format!("Retried {} (#{}) as #{}", bright(&new.name), job.id, new.id)
    })
}

async fn cancel(ctx: &Context, args: &PipelineArgs) -> Result<()> {
    let project = ctx.project()?;
    let pipeline =
        resolve_pipeline(&ctx.client, &project, args.ref_.as_deref(), args.pipeline).await?;
    let canceled = ctx
        .client
        .cancel_pipeline(&project, pipeline.id)
        .await
        .with_context(|| format!("cancel pipeline {}", pipeline.id))?;
    ctx.emit(&canceled, |p| {
        format!("Pipeline #{} is {}", p.id, status(&p.status))
    })
}

/// Split `KEY=VALUE`; the key must be non-empty, the value may be.
fn parse_variable(raw: &str) -> crate::error::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(LabError::validation(format!(
            "invalid variable '{raw}', expected KEY=VALUE"
        ))),
    }
}

async fn create(ctx: &Context, args: &CreateArgs) -> Result<()> {
    let variables = args
        .variables
        .iter()
        .map(|raw| parse_variable(raw))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let project = ctx.project()?;
    let ref_ = branch_or_current(args.ref_.as_deref())?;

    let pipeline = ctx
        .client
        .create_pipeline(&project, &ref_, &variables)
        .await
        .with_context(|| format!("create pipeline for '{ref_}'"))?;
    ctx.emit(&pipeline, |p| {
        format!("Created pipeline #{} on {}\n{}", p.id, p.ref_, p.web_url)
    })
}

/// The part of `trace` not printed yet. A log shorter than what was already
/// printed was restarted and is shown again in full.
fn unseen_output(trace: &str, printed: usize) -> &str {
    trace.get(printed..).unwrap_or(trace)
}

async fn trace(ctx: &Context, args: &TraceArgs) -> Result<()> {
    let project = ctx.project()?;
    let job = target_job(ctx, &project, &args.target).await?;
    debug!("Tracing job {} ({})", job.name, job.id);

    let mut stdout = std::io::stdout();
    follow_log(
        &ctx.client,
        &project,
        &job,
        args.follow,
        TRACE_POLL_INTERVAL,
        &mut stdout,
    )
    .await
}

/// Write the job log to `out`; when following, poll until the job is done.
async fn follow_log<W: Write>(
    client: &GitLabClient,
    project: &str,
    job: &Job,
    follow: bool,
    poll: Duration,
    out: &mut W,
) -> Result<()> {
    let mut printed = 0;
    loop {
        // Status before log, so the last fetch after the job ended is complete
        let active = follow
            && client
                .get_job(project, job.id)
                .await
                .with_context(|| format!("get job {}", job.id))?
                .is_active();

        let log = client
            .job_trace(project, job.id)
            .await
            .with_context(|| format!("get log of job {}", job.name))?;
        out.write_all(unseen_output(&log, printed).as_bytes())?;
        out.flush()?;
        printed = log.len();

        if !active {
            return Ok(());
        }
        tokio::time::sleep(poll).await;
    }
}

async fn artifacts(ctx: &Context, args: &ArtifactsArgs) -> Result<()> {
    let project = ctx.project()?;
    let job = target_job(ctx, &project, &args.target).await?;
    if job.artifacts_file.is_none() {
        bail!("job {} (#{}) has no artifacts", job.name, job.id);
    }

    let file_name = format!("{}-artifacts.zip", sanitize_filename(&job.name)?);
    tokio::fs::create_dir_all(&args.dir)
        .await
        .with_context(|| format!("create {}", args.dir.display()))?;
    let path = args.dir.join(file_name);
    let response = ctx
        .client
        .job_artifacts(&project, job.id)
        .await
        .with_context(|| format!("download artifacts of job {}", job.name))?;
    let bytes = download_to(response, &path, args.force).await?;
    ctx.emit(&SavedFile { path, bytes }, SavedFile::message)
}
