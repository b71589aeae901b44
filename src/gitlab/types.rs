//! Records mirroring the REST API's JSON resources.
//!
//! Only the fields lab displays or acts on are modelled; everything else in
//! the payload is ignored. All records serialize back out for `--output json`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A user as embedded in other resources (author, assignee, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
    pub default_branch: Option<String>,
    pub web_url: String,
    pub ssh_url_to_repo: Option<String>,
    pub http_url_to_repo: Option<String>,
}

/// A CI pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub iid: Option<u64>,
    #[serde(default)]
    pub project_id: u64,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub sha: String,
    pub source: Option<String>,
    pub web_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Seconds; only present on single-pipeline responses
    pub duration: Option<u64>,
    pub user: Option<User>,
}

/// The pipeline summary embedded in a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRef {
    pub id: u64,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub sha: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactsFile {
    pub filename: String,
    pub size: u64,
}

/// A single CI job within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub stage: String,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds, fractional
    pub duration: Option<f64>,
    pub web_url: String,
    #[serde(default)]
    pub allow_failure: bool,
    pub user: Option<User>,
    pub pipeline: PipelineRef,
    pub artifacts_file: Option<ArtifactsFile>,
}

impl Job {
    /// Whether the job can still produce log output.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.as_str(),
            "created" | "pending" | "running" | "waiting_for_resource" | "preparing"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    pub state: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub author: User,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub milestone: Option<Milestone>,
    pub web_url: String,
    pub sha: Option<String>,
    pub merge_status: Option<String>,
    pub detailed_merge_status: Option<String>,
    #[serde(default)]
    pub has_conflicts: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_project_id: u64,
    pub target_project_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub body: String,
    pub author: User,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseLink {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub direct_asset_url: Option<String>,
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSource {
    pub format: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAssets {
    #[serde(default)]
    pub links: Vec<ReleaseLink>,
    #[serde(default)]
    pub sources: Vec<ReleaseSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub author: Option<User>,
    #[serde(default)]
    pub assets: ReleaseAssets,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub priority: Option<i64>,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub open_merge_requests_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: u64,
    pub title: String,
    pub file_name: Option<String>,
    pub description: Option<String>,
    pub visibility: String,
    pub web_url: String,
    pub raw_url: String,
    pub author: Option<User>,
    pub created_at: DateTime<Utc>,
}

/// Response of the project uploads endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub alt: String,
    /// Path relative to the project web URL, e.g. `/uploads/<hash>/file.tar.gz`
    pub url: String,
    pub full_path: Option<String>,
    pub markdown: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserializes_api_payload() {
        let job: Job = serde_json::from_str(
            r#"{
                "id": 8,
                "name": "rspec:other",
                "stage": "test",
                "status": "running",
                "ref": "main",
                "tag": false,
                "coverage": null,
                "created_at": "2015-12-24T15:51:21.802Z",
                "started_at": "2015-12-24T17:54:24.729Z",
                "finished_at": null,
                "duration": 0.465,
                "web_url": "https://example.com/foo/bar/-/jobs/8",
                "allow_failure": false,
                "pipeline": {"id": 6, "ref": "main", "sha": "0ff3ae19", "status": "running"}
            }"#,
        )
        .unwrap();

        assert_eq!(job.name, "rspec:other");
        assert_eq!(job.pipeline.id, 6);
        assert!(job.is_active());
        assert!(job.artifacts_file.is_none());
    }

    #[test]
    fn test_release_without_assets_key() {
        let release: Release = serde_json::from_str(
            r#"{"tag_name": "v1.0.0", "name": null, "created_at": "2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(release.assets.links.is_empty());
        assert!(release.milestones.is_empty());
    }
}
