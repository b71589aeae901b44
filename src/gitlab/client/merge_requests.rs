use serde::{Deserialize, Serialize};

use super::GitLabClient;
use crate::error::Result;
use crate::gitlab::types::MergeRequest;

/// Filters for listing merge requests of a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeRequestFilter {
    pub state: Option<String>,
    pub labels: Vec<String>,
    pub author: Option<String>,
    pub assignee: Option<String>,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub milestone: Option<String>,
    pub search: Option<String>,
    pub draft: Option<bool>,
    pub assigned_to_me: bool,
}

impl MergeRequestFilter {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("order_by", "created_at".to_string()),
            ("sort", "desc".to_string()),
        ];
        let optional = [
            ("state", &self.state),
            ("author_username", &self.author),
            ("assignee_username", &self.assignee),
            ("source_branch", &self.source_branch),
            ("target_branch", &self.target_branch),
            ("milestone", &self.milestone),
            ("search", &self.search),
        ];
        query.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.clone().map(|value| (key, value))),
        );
        if !self.labels.is_empty() {
            query.push(("labels", self.labels.join(",")));
        }
        if let Some(draft) = self.draft {
            query.push(("draft", if draft { "yes" } else { "no" }.to_string()));
        }
        if self.assigned_to_me {
            query.push(("scope", "assigned_to_me".to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewMergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub labels: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignee_ids: Vec<u64>,
    pub remove_source_branch: bool,
    pub squash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateEvent {
    Close,
    Reopen,
}

#[derive(Debug, Serialize)]
struct StateUpdate {
    state_event: StateEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub squash: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub should_remove_source_branch: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub merge_when_pipeline_succeeds: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_message: Option<String>,
    /// Refuse to merge if the source branch head moved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RebaseStatus {
    pub rebase_in_progress: bool,
}

impl GitLabClient {
    pub async fn list_merge_requests(
        &self,
        project: &str,
        filter: &MergeRequestFilter,
        limit: usize,
    ) -> Result<Vec<MergeRequest>> {
        let url = self.project_endpoint(project, "merge_requests")?;
        self.paginate(url, &filter.to_query(), Some(limit)).await
    }

    pub async fn get_merge_request(&self, project: &str, iid: u64) -> Result<MergeRequest> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}"))?;
        self.get(url).await
    }

    /// Open merge request whose source is `branch`, if any.
    pub async fn merge_request_for_branch(
        &self,
        project: &str,
        branch: &str,
    ) -> Result<Option<MergeRequest>> {
        let filter = MergeRequestFilter {
            state: Some("opened".to_string()),
            source_branch: Some(branch.to_string()),
            ..MergeRequestFilter::default()
        };
        let mut found = self.list_merge_requests(project, &filter, 1).await?;
        Ok(found.pop())
    }

    pub async fn create_merge_request(
        &self,
        project: &str,
        request: &NewMergeRequest,
    ) -> Result<MergeRequest> {
        let url = self.project_endpoint(project, "merge_requests")?;
        self.post_json(url, request).await
    }

    pub async fn set_merge_request_state(
        &self,
        project: &str,
        iid: u64,
        state_event: StateEvent,
    ) -> Result<MergeRequest> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}"))?;
        self.put_json(url, &StateUpdate { state_event }).await
    }

    pub async fn merge_merge_request(
        &self,
        project: &str,
        iid: u64,
        options: &MergeOptions,
    ) -> Result<MergeRequest> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/merge"))?;
        self.put_json(url, options).await
    }

    pub async fn rebase_merge_request(
        &self,
        project: &str,
        iid: u64,
        skip_ci: bool,
    ) -> Result<RebaseStatus> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/rebase"))?;
        self.put_json(url, &serde_json::json!({ "skip_ci": skip_ci }))
            .await
    }

    pub async fn approve_merge_request(&self, project: &str, iid: u64) -> Result<()> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/approve"))?;
        self.post_discard(url).await
    }

    pub async fn unapprove_merge_request(&self, project: &str, iid: u64) -> Result<()> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/unapprove"))?;
        self.post_discard(url).await
    }
}
