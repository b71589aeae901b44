use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use log::{debug, info};
use serde::Serialize;

use super::{branch_or_current, confirmed, Context};
use crate::error::LabError;
use crate::git;
use crate::gitlab::client::merge_requests::{
    MergeOptions, MergeRequestFilter, NewMergeRequest, StateEvent,
};
use crate::gitlab::links::merge_request_head_ref;
use crate::gitlab::types::{MergeRequest, Note};
use crate::output::render::render_merge_request;
use crate::output::styling::{bright, cyan, status};
use crate::output::tables::merge_requests_table;
use crate::prompt;

const DRAFT_PREFIX: &str = "Draft: ";

#[derive(Subcommand)]
pub enum MrCommand {
    /// List merge requests
    List(ListArgs),
    /// Show a merge request
    Show(ShowArgs),
    /// Open a merge request
    Create(CreateArgs),
    /// Close a merge request
    Close(ConfirmArgs),
    /// Reopen a closed merge request
    Reopen(IidArgs),
    /// Merge a merge request
    Merge(MergeArgs),
    /// Rebase the source branch onto the target branch
    Rebase(RebaseArgs),
    Approve(IidArgs),
    Unapprove(IidArgs),
    /// Fetch a merge request's head into a local branch and check it out
    Checkout(CheckoutArgs),
    /// Comment on a merge request
    Note(NoteArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateFilter {
    Opened,
    Closed,
    Merged,
    Locked,
    All,
}

impl StateFilter {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Locked => "locked",
            Self::All => "all",
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = StateFilter::Opened)]
    state: StateFilter,

    /// Only merge requests with this label, repeatable
    #[arg(long = "label")]
    labels: Vec<String>,

    #[arg(long)]
    author: Option<String>,

    #[arg(long)]
    assignee: Option<String>,

    #[arg(long)]
    target_branch: Option<String>,

    /// Milestone title
    #[arg(long)]
    milestone: Option<String>,

    /// Only drafts
    #[arg(long)]
    draft: bool,

    /// Only merge requests assigned to you
    #[arg(long)]
    mine: bool,

    #[arg(long)]
    search: Option<String>,

    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

impl ListArgs {
    fn filter(&self) -> MergeRequestFilter {
        MergeRequestFilter {
            state: Some(self.state.as_str().to_string()),
            labels: self.labels.clone(),
            author: self.author.clone(),
            assignee: self.assignee.clone(),
            source_branch: None,
            target_branch: self.target_branch.clone(),
            milestone: self.milestone.clone(),
            search: self.search.clone(),
            draft: self.draft.then_some(true),
            assigned_to_me: self.mine,
        }
    }
}

#[derive(Args)]
pub struct IidArgs {
    /// Merge request IID; defaults to the one for the current branch
    iid: Option<u64>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    target: IidArgs,

    /// Include comments
    #[arg(long)]
    comments: bool,
}

#[derive(Args)]
pub struct ConfirmArgs {
    #[command(flatten)]
    target: IidArgs,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Source branch; defaults to the current branch
    #[arg(long)]
    source: Option<String>,

    /// Target branch; defaults to the project's default branch
    #[arg(long)]
    target: Option<String>,

    /// Title; defaults to the last commit's subject
    #[arg(short, long)]
    title: Option<String>,

    #[arg(short, long)]
    description: Option<String>,

    #[arg(long = "label")]
    labels: Vec<String>,

    /// Milestone title
    #[arg(long)]
    milestone: Option<String>,

    /// Username to assign, repeatable
    #[arg(long = "assignee")]
    assignees: Vec<String>,

    #[arg(long)]
    draft: bool,

    #[arg(long)]
    remove_source_branch: bool,

    #[arg(long)]
    squash: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    #[command(flatten)]
    target: IidArgs,

    #[arg(long)]
    squash: bool,

    #[arg(long)]
    remove_source_branch: bool,

    /// Merge once the head pipeline succeeds
    #[arg(long)]
    when_pipeline_succeeds: bool,

    /// Merge commit message
    #[arg(short, long)]
    message: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args)]
pub struct RebaseArgs {
    #[command(flatten)]
    target: IidArgs,

    /// Do not run a pipeline for the rebased commits
    #[arg(long)]
    skip_ci: bool,
}

#[derive(Args)]
pub struct CheckoutArgs {
    iid: u64,

    /// Local branch name; defaults to the source branch
    #[arg(short, long)]
    branch: Option<String>,

    /// Overwrite an existing local branch
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
pub struct NoteArgs {
    #[command(flatten)]
    target: IidArgs,

    /// Message paragraph, repeatable
    #[arg(short, long = "message")]
    messages: Vec<String>,

    /// Read the message from a file
    #[arg(short = 'F', long, conflicts_with = "messages")]
    file: Option<PathBuf>,
}

#[derive(Serialize)]
struct MergeRequestView<'a> {
    #[serde(flatten)]
    merge_request: &'a MergeRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a [Note]>,
}

#[derive(Debug, Serialize)]
struct RebaseReport {
    iid: u64,
    rebase_in_progress: bool,
}

impl RebaseReport {
    fn message(&self) -> String {
        if self.rebase_in_progress {
            format!("Rebase of !{} started", self.iid)
        } else {
            format!("Rebased !{}", self.iid)
        }
    }
}

#[derive(Debug, Serialize)]
struct ApprovalReport {
    iid: u64,
    approved: bool,
}

impl ApprovalReport {
    fn message(&self) -> String {
        if self.approved {
            format!("Approved !{}", self.iid)
        } else {
            format!("Removed approval from !{}", self.iid)
        }
    }
}

pub async fn execute(ctx: &Context, command: &MrCommand) -> Result<()> {
    match command {
        MrCommand::List(args) => list(ctx, args).await,
        MrCommand::Show(args) => show(ctx, args).await,
        MrCommand::Create(args) => create(ctx, args).await,
        MrCommand::Close(args) => close(ctx, args).await,
        MrCommand::Reopen(args) => reopen(ctx, args).await,
        MrCommand::Merge(args) => merge(ctx, args).await,
        MrCommand::Rebase(args) => rebase(ctx, args).await,
        MrCommand::Approve(args) => approve(ctx, args, true).await,
        MrCommand::Unapprove(args) => approve(ctx, args, false).await,
        MrCommand::Checkout(args) => checkout(ctx, args).await,
        MrCommand::Note(args) => note(ctx, args).await,
    }
}

/// The given IID, or the open merge request of the current branch.
async fn resolve_iid(ctx: &Context, project: &str, iid: Option<u64>) -> Result<u64> {
    if let Some(iid) = iid {
        return Ok(iid);
    }
    let branch = git::current_branch()?;
    let mr = ctx
        .client
        .merge_request_for_branch(project, &branch)
        .await
        .with_context(|| format!("find merge request for branch '{branch}'"))?;
    match mr {
        Some(mr) => {
            debug!("Branch {branch} has merge request !{}", mr.iid);
            Ok(mr.iid)
        }
        None => bail!("no open merge request for branch '{branch}'"),
    }
}

async fn list(ctx: &Context, args: &ListArgs) -> Result<()> {
    let project = ctx.project()?;
    let merge_requests = ctx
        .client
        .list_merge_requests(&project, &args.filter(), args.limit)
        .await
        .context("list merge requests")?;
    ctx.emit(&merge_requests, |mrs| merge_requests_table(mrs).to_string())
}

async fn show(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.target.iid).await?;
    let merge_request = ctx
        .client
        .get_merge_request(&project, iid)
        .await
        .with_context(|| format!("get merge request !{iid}"))?;

    let notes = if args.comments {
        Some(
            ctx.client
                .merge_request_notes(&project, iid)
                .await
                .with_context(|| format!("list comments of !{iid}"))?,
        )
    } else {
        None
    };

    let view = MergeRequestView {
        merge_request: &merge_request,
        notes: notes.as_deref(),
    };
    ctx.emit(&view, |view| {
        render_merge_request(view.merge_request, view.notes)
    })
}

/// Prefix a title with `Draft: ` unless it already is one.
fn draft_title(title: &str, draft: bool) -> String {
    let title = title.trim();
    let already = title.to_ascii_lowercase().starts_with("draft:");
    if draft && !already {
        format!("{DRAFT_PREFIX}{title}")
    } else {
        title.to_string()
    }
}

async fn create(ctx: &Context, args: &CreateArgs) -> Result<()> {
    let project = ctx.project()?;
    let source_branch = branch_or_current(args.source.as_deref())?;

    let target_branch = match &args.target {
        Some(target) => target.clone(),
        None => ctx
            .client
            .get_project(&project)
            .await
            .with_context(|| format!("get project {project}"))?
            .default_branch
            .ok_or_else(|| LabError::validation("project has no default branch, pass --target"))?,
    };

    let title = match &args.title {
        Some(title) => title.clone(),
        None => git::last_commit_subject()?,
    };
    if title.trim().is_empty() {
        return Err(LabError::validation("merge request title is empty").into());
    }

    let milestone_id = match &args.milestone {
        Some(title) => Some(
            ctx.client
                .milestone_id(&project, title)
                .await
                .context("resolve milestone")?,
        ),
        None => None,
    };

    let mut assignee_ids = Vec::with_capacity(args.assignees.len());
    for username in &args.assignees {
        let id = ctx
            .client
            .user_id(username)
            .await
            .context("resolve assignee")?;
        assignee_ids.push(id);
    }

    let request = NewMergeRequest {
        source_branch,
        target_branch,
        title: draft_title(&title, args.draft),
        description: args.description.clone(),
        labels: args.labels.join(","),
        milestone_id,
        assignee_ids,
        remove_source_branch: args.remove_source_branch,
        squash: args.squash,
    };
    info!(
        "Opening merge request {} -> {}",
        request.source_branch, request.target_branch
    );

    let merge_request = ctx
        .client
        .create_merge_request(&project, &request)
        .await
        .context("create merge request")?;
    ctx.emit(&merge_request, |mr| {
        let title = format!("!{} {}", mr.iid, mr.title);
        format!("Created {}\n{}", bright(title), cyan(&mr.web_url))
    })
}

async fn close(ctx: &Context, args: &ConfirmArgs) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.target.iid).await?;
    if !confirmed(&format!("Close merge request !{iid}?"), args.yes)? {
        return Ok(());
    }
    set_state(ctx, &project, iid, StateEvent::Close).await
}

async fn reopen(ctx: &Context, args: &IidArgs) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.iid).await?;
    set_state(ctx, &project, iid, StateEvent::Reopen).await
}

async fn set_state(ctx: &Context, project: &str, iid: u64, event: StateEvent) -> Result<()> {
    let merge_request = ctx
        .client
        .set_merge_request_state(project, iid, event)
        .await
        .with_context(|| format!("update merge request !{iid}"))?;
    ctx.emit(&merge_request, |mr| {
        format!("Merge request !{} is {}", mr.iid, status(&mr.state))
    })
}

async fn merge(ctx: &Context, args: &MergeArgs) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.target.iid).await?;
    if !confirmed(&format!("Merge merge request !{iid}?"), args.yes)? {
        return Ok(());
    }

    let options = MergeOptions {
        squash: args.squash,
        should_remove_source_branch: args.remove_source_branch,
        merge_when_pipeline_succeeds: args.when_pipeline_succeeds,
        merge_commit_message: args.message.clone(),
        sha: None,
    };
    let merge_request = ctx
        .client
        .merge_merge_request(&project, iid, &options)
        .await
        .with_context(|| format!("merge !{iid}"))?;

    let when_pipeline_succeeds = args.when_pipeline_succeeds;
    ctx.emit(&merge_request, |mr| {
        if when_pipeline_succeeds && mr.state != "merged" {
            format!("!{} will be merged when its pipeline succeeds", mr.iid)
        } else {
            format!("Merged !{} into {}", mr.iid, mr.target_branch)
        }
    })
}

async fn rebase(ctx: &Context, args: &RebaseArgs) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.target.iid).await?;
    let status = ctx
        .client
        .rebase_merge_request(&project, iid, args.skip_ci)
        .await
        .with_context(|| format!("rebase !{iid}"))?;
    let report = RebaseReport {
        iid,
        rebase_in_progress: status.rebase_in_progress,
    };
    ctx.emit(&report, RebaseReport::message)
}

async fn approve(ctx: &Context, args: &IidArgs, approve: bool) -> Result<()> {
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.iid).await?;
    if approve {
        ctx.client
            .approve_merge_request(&project, iid)
            .await
            .with_context(|| format!("approve !{iid}"))?;
    } else {
        ctx.client
            .unapprove_merge_request(&project, iid)
            .await
            .with_context(|| format!("unapprove !{iid}"))?;
    }
    let report = ApprovalReport {
        iid,
        approved: approve,
    };
    ctx.emit(&report, ApprovalReport::message)
}

async fn checkout(ctx: &Context, args: &CheckoutArgs) -> Result<()> {
    let branch = match &args.branch {
        Some(branch) => branch.clone(),
        None => {
            let project = ctx.project()?;
            ctx.client
                .get_merge_request(&project, args.iid)
                .await
                .with_context(|| format!("get merge request !{}", args.iid))?
                .source_branch
        }
    };

    let refspec = format!("{}:{branch}", merge_request_head_ref(args.iid));
    git::fetch(&ctx.remote, &refspec, args.force)?;
    git::checkout(&branch)?;
    eprintln!("Switched to {} for !{}", bright(&branch), args.iid);
    Ok(())
}

/// Paragraphs given with `-m`, separated by blank lines.
fn join_messages(messages: &[String]) -> String {
    messages
        .iter()
        .map(|message| message.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn note_body(args: &NoteArgs) -> Result<String> {
    let body = if !args.messages.is_empty() {
        join_messages(&args.messages)
    } else if let Some(path) = &args.file {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    } else {
        prompt::read_stdin("Enter the comment")?
    };

    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(LabError::validation("aborting note due to empty message").into());
    }
    Ok(body)
}

async fn note(ctx: &Context, args: &NoteArgs) -> Result<()> {
    let body = note_body(args)?;
    let project = ctx.project()?;
    let iid = resolve_iid(ctx, &project, args.target.iid).await?;
    let note = ctx
        .client
        .create_merge_request_note(&project, iid, &body)
        .await
        .with_context(|| format!("comment on !{iid}"))?;
    ctx.emit(&note, |note| format!("Added note #{} to !{iid}", note.id))
}
