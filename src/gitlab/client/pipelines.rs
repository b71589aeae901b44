use log::debug;
use serde::Serialize;

use super::GitLabClient;
use crate::error::Result;
use crate::gitlab::types::{Job, Pipeline};

#[derive(Debug, Serialize)]
struct PipelineVariable<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePipeline<'a> {
    #[serde(rename = "ref")]
    ref_: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variables: Vec<PipelineVariable<'a>>,
}

impl GitLabClient {
    /// List pipelines newest first, optionally filtered by ref and status.
    pub async fn list_pipelines(
        &self,
        project: &str,
        ref_: Option<&str>,
        status: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Pipeline>> {
        let mut query = vec![
            ("order_by", "id".to_string()),
            ("sort", "desc".to_string()),
        ];
        if let Some(ref_) = ref_ {
            query.push(("ref", ref_.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }

        let url = self.project_endpoint(project, "pipelines")?;
        self.paginate(url, &query, Some(limit)).await
    }

    pub async fn get_pipeline(&self, project: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.project_endpoint(project, &format!("pipelines/{pipeline_id}"))?;
        self.get(url).await
    }

    /// Latest pipeline for a ref.
    pub async fn latest_pipeline(&self, project: &str, ref_: &str) -> Result<Pipeline> {
        let url = self.project_endpoint(project, "pipelines/latest")?;
        self.get_with_query(url, &[("ref", ref_.to_string())]).await
    }

    pub async fn create_pipeline(
        &self,
        project: &str,
        ref_: &str,
        variables: &[(String, String)],
    ) -> Result<Pipeline> {
        let body = CreatePipeline {
            ref_,
            variables: variables
                .iter()
                .map(|(key, value)| PipelineVariable { key, value })
                .collect(),
        };
        let url = self.project_endpoint(project, "pipeline")?;
        self.post_json(url, &body).await
    }

    /// Retry the failed jobs of a pipeline.
    pub async fn retry_pipeline(&self, project: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.project_endpoint(project, &format!("pipelines/{pipeline_id}/retry"))?;
        self.post_action(url).await
    }

    pub async fn cancel_pipeline(&self, project: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.project_endpoint(project, &format!("pipelines/{pipeline_id}/cancel"))?;
        self.post_action(url).await
    }

    /// All current (non-retried) jobs of a pipeline.
    pub async fn pipeline_jobs(&self, project: &str, pipeline_id: u64) -> Result<Vec<Job>> {
        let url = self.project_endpoint(project, &format!("pipelines/{pipeline_id}/jobs"))?;
        self.paginate(url, &[("include_retried", "false".to_string())], None)
            .await
    }

    /// Find a job by name, scanning the pipeline's jobs page by page.
    ///
    /// Returns `None` once every page was checked without a match.
    pub async fn find_pipeline_job(
        &self,
        project: &str,
        pipeline_id: u64,
        name: &str,
    ) -> Result<Option<Job>> {
        debug!("Searching pipeline {pipeline_id} for job '{name}'");
        let url = self.project_endpoint(project, &format!("pipelines/{pipeline_id}/jobs"))?;
        self.find_paginated(
            url,
            &[("include_retried", "false".to_string())],
            |job: &Job| job.name == name,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::LabError;
    use crate::gitlab::fixtures::{client_for, job_json, pipeline_json};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_latest_pipeline_uses_ref() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/group%2Fproj/pipelines/latest")
            .match_query(Matcher::UrlEncoded("ref".into(), "feature/x".into()))
            .with_body(pipeline_json(46, "running", "feature/x"))
            .create_async()
            .await;

        let pipeline = client_for(&server)
            .latest_pipeline("group/proj", "feature/x")
            .await
            .unwrap();

        assert_eq!(pipeline.id, 46);
        assert_eq!(pipeline.ref_, "feature/x");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_pipeline_job_scans_pages() {
        let mut server = mockito::Server::new_async().await;
        let path = "/api/v4/projects/group%2Fproj/pipelines/46/jobs";
        server
            .mock("GET", path)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("include_retried".into(), "false".into()),
            ]))
            .with_header("x-next-page", "2")
            .with_body(format!("[{}]", job_json(1, "build", "build", "success")))
            .create_async()
            .await;
        server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("x-next-page", "3")
            .with_body(format!(
                "[{}, {}]",
                job_json(2, "lint", "test", "failed"),
                job_json(3, "rspec", "test", "running")
            ))
            .create_async()
            .await;
        let never = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
            .expect(0)
            .create_async()
            .await;

        let job = client_for(&server)
            .find_pipeline_job("group/proj", 46, "rspec")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.id, 3);
        never.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_pipeline_sends_variables() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/group%2Fproj/pipeline")
            .match_body(Matcher::Json(serde_json::json!({
                "ref": "main",
                "variables": [{"key": "DEPLOY", "value": "1"}]
            })))
            .with_status(201)
            .with_body(pipeline_json(50, "created", "main"))
            .create_async()
            .await;

        let pipeline = client_for(&server)
            .create_pipeline(
                "group/proj",
                "main",
                &[("DEPLOY".to_string(), "1".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(pipeline.status, "created");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_latest_pipeline_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/group%2Fproj/pipelines/latest")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .latest_pipeline("group/proj", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Api { status: 404, .. }));
    }
}
