use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};

use super::Context;
use crate::error::LabError;
use crate::gitlab::client::labels::NewLabel;
use crate::output::styling::bright;
use crate::output::tables::labels_table;

const DEFAULT_COLOR: &str = "#428BCA";

#[derive(Subcommand)]
pub enum LabelCommand {
    /// List project labels
    List(ListArgs),
    /// Create a label
    Create(CreateArgs),
    /// Delete a label by name or ID
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Only labels whose name contains this
    #[arg(long)]
    search: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    name: String,

    /// `#RRGGBB`, `#RGB` or a CSS color name
    #[arg(short, long, default_value = DEFAULT_COLOR)]
    color: String,

    #[arg(short, long)]
    description: Option<String>,

    /// Lower numbers sort first
    #[arg(short, long)]
    priority: Option<i64>,
}

#[derive(Args)]
pub struct DeleteArgs {
    name_or_id: String,
}

pub async fn execute(ctx: &Context, command: &LabelCommand) -> Result<()> {
    match command {
        LabelCommand::List(args) => list(ctx, args).await,
        LabelCommand::Create(args) => create(ctx, args).await,
        LabelCommand::Delete(args) => delete(ctx, args).await,
    }
}

/// Add the `#` the API needs to bare 3- or 6-digit hex colors.
fn normalize_color(color: &str) -> crate::error::Result<String> {
    let color = color.trim();
    if color.is_empty() {
        return Err(LabError::validation("label color is empty"));
    }
    let is_hex = matches!(color.len(), 3 | 6) && color.chars().all(|c| c.is_ascii_hexdigit());
    Ok(if is_hex {
        format!("#{color}")
    } else {
        color.to_string()
    })
}

async fn list(ctx: &Context, args: &ListArgs) -> Result<()> {
    let project = ctx.project()?;
    let labels = ctx
        .client
        .list_labels(&project, args.search.as_deref())
        .await
        .context("list labels")?;
    ctx.emit(&labels, |labels| labels_table(labels).to_string())
}

async fn create(ctx: &Context, args: &CreateArgs) -> Result<()> {
    if args.name.trim().is_empty() {
        return Err(LabError::validation("label name is empty").into());
    }
    let label = NewLabel {
        name: args.name.trim().to_string(),
        color: normalize_color(&args.color)?,
        description: args.description.clone(),
        priority: args.priority,
    };

    let project = ctx.project()?;
    let created = ctx
        .client
        .create_label(&project, &label)
        .await
        .with_context(|| format!("create label '{}'", label.name))?;
    ctx.emit(&created, |label| {
        format!("Created label {} ({})", bright(&label.name), label.color)
    })
}

async fn delete(ctx: &Context, args: &DeleteArgs) -> Result<()> {
    let project = ctx.project()?;
    ctx.client
        .delete_label(&project, &args.name_or_id)
        .await
        .with_context(|| format!("delete label '{}'", args.name_or_id))?;
    ctx.emit(&serde_json::json!({ "deleted": args.name_or_id }), |_| {
        format!("Deleted label {}", bright(&args.name_or_id))
    })
}
