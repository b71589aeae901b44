//! JSON payloads shaped like API responses, shared by the test suites.

use super::client::GitLabClient;
use super::types::{Job, MergeRequest, Pipeline, Release};
use crate::auth::Token;

pub const PROJECT: &str = "group/proj";
pub const PROJECT_PATH: &str = "/api/v4/projects/group%2Fproj";

pub fn client_for(server: &mockito::Server) -> GitLabClient {
    GitLabClient::new(&server.url(), Some(Token::from("secret"))).unwrap()
}

pub fn user_json(id: u64, username: &str) -> String {
    format!(
        r#"{{"id": {id}, "username": "{username}", "name": "{username} name",
            "web_url": "https://gitlab.example.com/{username}"}}"#
    )
}

pub fn project_json() -> String {
    r#"{"id": 1, "path_with_namespace": "group/proj", "default_branch": "main",
        "web_url": "https://gitlab.example.com/group/proj",
        "ssh_url_to_repo": "git@gitlab.example.com:group/proj.git",
        "http_url_to_repo": "https://gitlab.example.com/group/proj.git"}"#
        .to_string()
}

pub fn pipeline_json(id: u64, status: &str, ref_: &str) -> String {
    format!(
        r#"{{"id": {id}, "iid": 3, "project_id": 1, "status": "{status}", "ref": "{ref_}",
            "sha": "a91957a858320c0e17f3a0eca7cfacbff50ea29a", "source": "push",
            "web_url": "https://gitlab.example.com/group/proj/-/pipelines/{id}",
            "created_at": "2026-10-01T10:00:00Z", "updated_at": "2026-10-01T10:05:00Z"}}"#
    )
}

pub fn job_json(id: u64, name: &str, stage: &str, status: &str) -> String {
    format!(
        r#"{{"id": {id}, "name": "{name}", "stage": "{stage}", "status": "{status}", "ref": "main",
            "created_at": "2026-10-01T10:00:{:02}Z", "started_at": null, "finished_at": null,
            "duration": null, "web_url": "https://gitlab.example.com/group/proj/-/jobs/{id}",
            "allow_failure": false,
            "pipeline": {{"id": 46, "ref": "main", "sha": "a91957a8", "status": "running"}}}}"#,
        id % 60
    )
}

pub fn job_with_artifacts_json(id: u64, name: &str) -> String {
    job_json(id, name, "build", "success").replacen(
        r#""allow_failure": false,"#,
        r#""allow_failure": false, "artifacts_file": {"filename": "artifacts.zip", "size": 12},"#,
        1,
    )
}

pub fn merge_request_json(iid: u64, title: &str, source_branch: &str, state: &str) -> String {
    format!(
        r#"{{"id": {}, "iid": {iid}, "title": "{title}", "description": "Fixes things",
            "state": "{state}", "draft": false, "source_branch": "{source_branch}",
            "target_branch": "main", "author": {}, "assignees": [], "labels": ["bug"],
            "milestone": null, "web_url": "https://gitlab.example.com/group/proj/-/merge_requests/{iid}",
            "sha": "8888888888888888888888888888888888888888", "merge_status": "can_be_merged",
            "detailed_merge_status": "mergeable", "has_conflicts": false,
            "created_at": "2026-09-30T08:00:00Z", "updated_at": "2026-10-01T08:00:00Z",
            "source_project_id": 1, "target_project_id": 1}}"#,
        iid + 100,
        user_json(5, "alice")
    )
}

pub fn note_json(id: u64, body: &str, system: bool) -> String {
    format!(
        r#"{{"id": {id}, "body": "{body}", "author": {}, "created_at": "2026-10-01T09:00:00Z",
            "system": {system}}}"#,
        user_json(5, "alice")
    )
}

pub fn release_json(tag: &str, links: &[(u64, &str, &str)]) -> String {
    let links = links
        .iter()
        .map(|(id, name, url)| {
            format!(r#"{{"id": {id}, "name": "{name}", "url": "{url}", "link_type": "other"}}"#)
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{"tag_name": "{tag}", "name": "Release {tag}", "description": "Notes",
            "created_at": "2026-10-01T12:00:00Z", "released_at": "2026-10-01T12:00:00Z",
            "author": {}, "assets": {{"count": 0, "links": [{links}],
            "sources": [{{"format": "zip", "url": "https://gitlab.example.com/group/proj/-/archive/{tag}/proj-{tag}.zip"}}]}},
            "milestones": []}}"#,
        user_json(5, "alice")
    )
}

pub fn label_json(id: u64, name: &str, color: &str) -> String {
    format!(
        r##"{{"id": {id}, "name": "{name}", "color": "{color}", "description": null,
             "priority": null, "open_issues_count": 2, "open_merge_requests_count": 1}}"##
    )
}

pub fn snippet_json(id: u64, title: &str) -> String {
    format!(
        r#"{{"id": {id}, "title": "{title}", "file_name": "notes.md", "description": null,
            "visibility": "private", "web_url": "https://gitlab.example.com/-/snippets/{id}",
            "raw_url": "https://gitlab.example.com/-/snippets/{id}/raw", "author": {},
            "created_at": "2026-10-01T12:00:00Z"}}"#,
        user_json(5, "alice")
    )
}

pub fn job(id: u64, name: &str, stage: &str, status: &str) -> Job {
    serde_json::from_str(&job_json(id, name, stage, status)).unwrap()
}

pub fn pipeline(id: u64, status: &str, ref_: &str) -> Pipeline {
    serde_json::from_str(&pipeline_json(id, status, ref_)).unwrap()
}

pub fn merge_request(iid: u64, title: &str, source_branch: &str, state: &str) -> MergeRequest {
    serde_json::from_str(&merge_request_json(iid, title, source_branch, state)).unwrap()
}

pub fn release(tag: &str, links: &[(u64, &str, &str)]) -> Release {
    serde_json::from_str(&release_json(tag, links)).unwrap()
}
