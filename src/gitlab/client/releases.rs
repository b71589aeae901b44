use serde::Serialize;

use super::{path_segment, GitLabClient};
use crate::error::Result;
use crate::gitlab::types::{Release, ReleaseLink};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Commit or branch to create the tag from when it does not exist yet
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReleaseLink {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

impl GitLabClient {
    fn release_endpoint(&self, project: &str, tag: &str, rest: &str) -> Result<url::Url> {
        let segment = path_segment(tag)?;
        self.project_endpoint(project, &format!("releases/{segment}{rest}"))
    }

    pub async fn list_releases(&self, project: &str, limit: usize) -> Result<Vec<Release>> {
        let url = self.project_endpoint(project, "releases")?;
        let query = [
            ("order_by", "released_at".to_string()),
            ("sort", "desc".to_string()),
        ];
        self.paginate(url, &query, Some(limit)).await
    }

    pub async fn get_release(&self, project: &str, tag: &str) -> Result<Release> {
        self.get(self.release_endpoint(project, tag, "")?).await
    }

    /// Most recent release of a project.
    pub async fn latest_release(&self, project: &str) -> Result<Release> {
        let url = self.project_endpoint(project, "releases/permalink/latest")?;
        self.get(url).await
    }

    pub async fn create_release(&self, project: &str, release: &NewRelease) -> Result<Release> {
        let url = self.project_endpoint(project, "releases")?;
        self.post_json(url, release).await
    }

    pub async fn create_release_link(
        &self,
        project: &str,
        tag: &str,
        link: &NewReleaseLink,
    ) -> Result<ReleaseLink> {
        let url = self.release_endpoint(project, tag, "/assets/links")?;
        self.post_json(url, link).await
    }
}
