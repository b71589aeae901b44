use super::GitLabClient;
use crate::error::{LabError, Result};
use crate::gitlab::types::Milestone;

impl GitLabClient {
    pub async fn find_milestone(&self, project: &str, title: &str) -> Result<Option<Milestone>> {
        let url = self.project_endpoint(project, "milestones")?;
        // `title` is an exact-match filter on the API side
        self.find_paginated(url, &[("title", title.to_string())], |m: &Milestone| {
            m.title == title
        })
        .await
    }

    /// Resolve a milestone title to its ID, failing when it does not exist.
    pub async fn milestone_id(&self, project: &str, title: &str) -> Result<u64> {
        self.find_milestone(project, title)
            .await?
            .map(|milestone| milestone.id)
            .ok_or_else(|| LabError::NotFound(format!("milestone '{title}'")))
    }
}
