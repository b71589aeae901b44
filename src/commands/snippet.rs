use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};

use super::Context;
use crate::error::LabError;
use crate::gitlab::client::snippets::{NewSnippet, SnippetFile, SnippetScope};
use crate::output::styling::{bright, cyan};
use crate::output::tables::snippets_table;
use crate::prompt;

const DEFAULT_FILE_NAME: &str = "snippet.txt";

#[derive(Subcommand)]
pub enum SnippetCommand {
    /// Create a snippet from a file or stdin
    Create(CreateArgs),
    List(ListArgs),
    Delete(DeleteArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

impl Visibility {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Internal => "internal",
            Self::Public => "public",
        }
    }
}

#[derive(Args)]
pub struct ScopeArgs {
    /// Personal snippet instead of a project snippet
    #[arg(long)]
    personal: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    /// File to share; read from stdin when omitted
    file: Option<PathBuf>,

    /// Title; defaults to the file name
    #[arg(short, long)]
    title: Option<String>,

    /// File name shown in the snippet
    #[arg(short, long)]
    name: Option<String>,

    #[arg(short, long)]
    description: Option<String>,

    #[arg(long, value_enum, default_value_t = Visibility::Private)]
    visibility: Visibility,

    #[command(flatten)]
    scope: ScopeArgs,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
pub struct DeleteArgs {
    id: u64,

    #[command(flatten)]
    scope: ScopeArgs,
}

pub async fn execute(ctx: &Context, command: &SnippetCommand) -> Result<()> {
    match command {
        SnippetCommand::Create(args) => create(ctx, args).await,
        SnippetCommand::List(args) => list(ctx, args).await,
        SnippetCommand::Delete(args) => delete(ctx, args).await,
    }
}

/// Project path for project snippets, `None` for personal ones.
fn scope_project(ctx: &Context, scope: &ScopeArgs) -> Result<Option<String>> {
    if scope.personal {
        Ok(None)
    } else {
        ctx.project().map(Some)
    }
}

fn snippet_scope(project: Option<&str>) -> SnippetScope<'_> {
    project.map_or(SnippetScope::Personal, SnippetScope::Project)
}

fn build_snippet(args: &CreateArgs, content: String) -> crate::error::Result<NewSnippet> {
    if content.trim().is_empty() {
        return Err(LabError::validation("aborting snippet due to empty content"));
    }

    let file_name = args
        .name
        .clone()
        .or_else(|| {
            args.file
                .as_ref()
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let title = args.title.clone().unwrap_or_else(|| file_name.clone());

    Ok(NewSnippet {
        title,
        description: args.description.clone(),
        visibility: args.visibility.as_str().to_string(),
        files: vec![SnippetFile {
            file_path: file_name,
            content,
        }],
    })
}

async fn create(ctx: &Context, args: &CreateArgs) -> Result<()> {
    let content = match &args.file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => prompt::read_stdin("Enter the snippet content")?,
    };
    let snippet = build_snippet(args, content)?;

    let project = scope_project(ctx, &args.scope)?;
    let created = ctx
        .client
        .create_snippet(snippet_scope(project.as_deref()), &snippet)
        .await
        .context("create snippet")?;
    ctx.emit(&created, |snippet| {
        format!(
            "Created snippet {} {}",
            bright(format!("${}", snippet.id)),
            cyan(&snippet.web_url)
        )
    })
}

async fn list(ctx: &Context, args: &ListArgs) -> Result<()> {
    let project = scope_project(ctx, &args.scope)?;
    let snippets = ctx
        .client
        .list_snippets(snippet_scope(project.as_deref()), args.limit)
        .await
        .context("list snippets")?;
    ctx.emit(&snippets, |snippets| snippets_table(snippets).to_string())
}

async fn delete(ctx: &Context, args: &DeleteArgs) -> Result<()> {
    let project = scope_project(ctx, &args.scope)?;
    ctx.client
        .delete_snippet(snippet_scope(project.as_deref()), args.id)
        .await
        .with_context(|| format!("delete snippet {}", args.id))?;
    ctx.emit(&serde_json::json!({ "deleted": args.id }), |_| {
        format!("Deleted snippet ${}", args.id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::context_for;
    use crate::gitlab::fixtures::{snippet_json, PROJECT_PATH};
    use mockito::Matcher;
    use std::io::Write;

    fn create_args(file: Option<PathBuf>) -> CreateArgs {
        CreateArgs {
            file,
            title: None,
            name: None,
            description: None,
            visibility: Visibility::Private,
            scope: ScopeArgs { personal: false },
        }
    }

    #[test]
    fn test_title_defaults_to_file_name() {
        let snippet = build_snippet(
            &create_args(Some(PathBuf::from("/tmp/notes.md"))),
            "# Notes".to_string(),
        )
        .unwrap();
        assert_eq!(snippet.title, "notes.md");
        assert_eq!(snippet.files[0].file_path, "notes.md");
    }

    #[test]
    fn test_stdin_snippet_gets_placeholder_name() {
        let snippet = build_snippet(&create_args(None), "echo hi".to_string()).unwrap();
        assert_eq!(snippet.files[0].file_path, DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let err = build_snippet(&create_args(None), " \n\t".to_string()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_create_project_snippet_from_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("{PROJECT_PATH}/snippets").as_str())
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"visibility": "internal"})),
                Matcher::Regex(r#""content":"fn main\(\) \{\}\\n""#.to_string()),
            ]))
            .with_status(201)
            .with_body(snippet_json(5, "main.rs"))
            .create_async()
            .await;

        let mut file = tempfile::Builder::new().suffix(".rs").tempfile().unwrap();
        writeln!(file, "fn main() {{}}").unwrap();
        let args = CreateArgs {
            visibility: Visibility::Internal,
            ..create_args(Some(file.path().to_path_buf()))
        };
        create(&context_for(&server), &args).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_personal_snippet() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v4/snippets/9")
            .with_status(204)
            .create_async()
            .await;

        let args = DeleteArgs {
            id: 9,
            scope: ScopeArgs { personal: true },
        };
        delete(&context_for(&server), &args).await.unwrap();

        mock.assert_async().await;
    }
}
