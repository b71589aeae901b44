use super::{path_segment, GitLabClient};
use crate::error::Result;
use crate::gitlab::types::Project;

impl GitLabClient {
    pub async fn get_project(&self, project: &str) -> Result<Project> {
        let url = self.endpoint(&format!("projects/{}", path_segment(project)?))?;
        self.get(url).await
    }
}
