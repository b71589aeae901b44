use serde::Serialize;

use super::GitLabClient;
use crate::error::Result;
use crate::gitlab::types::Snippet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetFile {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSnippet {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
    pub files: Vec<SnippetFile>,
}

/// Where a snippet lives: inside a project or on the user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetScope<'a> {
    Project(&'a str),
    Personal,
}

impl GitLabClient {
    fn snippets_endpoint(&self, scope: SnippetScope<'_>, rest: &str) -> Result<url::Url> {
        match scope {
            SnippetScope::Project(project) => {
                self.project_endpoint(project, &format!("snippets{rest}"))
            }
            SnippetScope::Personal => self.endpoint(&format!("snippets{rest}")),
        }
    }

    pub async fn create_snippet(
        &self,
        scope: SnippetScope<'_>,
        snippet: &NewSnippet,
    ) -> Result<Snippet> {
        let url = self.snippets_endpoint(scope, "")?;
        self.post_json(url, snippet).await
    }

    pub async fn list_snippets(
        &self,
        scope: SnippetScope<'_>,
        limit: usize,
    ) -> Result<Vec<Snippet>> {
        let url = self.snippets_endpoint(scope, "")?;
        self.paginate(url, &[], Some(limit)).await
    }

    pub async fn delete_snippet(&self, scope: SnippetScope<'_>, id: u64) -> Result<()> {
        let url = self.snippets_endpoint(scope, &format!("/{id}"))?;
        self.delete(url).await
    }
}
