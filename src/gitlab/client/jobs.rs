use reqwest::Response;

use super::GitLabClient;
use crate::error::Result;
use crate::gitlab::types::Job;

impl GitLabClient {
    pub async fn get_job(&self, project: &str, job_id: u64) -> Result<Job> {
        let url = self.project_endpoint(project, &format!("jobs/{job_id}"))?;
        self.get(url).await
    }

    /// Retry a job; the API answers with the newly created job.
    pub async fn retry_job(&self, project: &str, job_id: u64) -> Result<Job> {
        let url = self.project_endpoint(project, &format!("jobs/{job_id}/retry"))?;
        self.post_action(url).await
    }

    /// Full log of a job as plain text.
    pub async fn job_trace(&self, project: &str, job_id: u64) -> Result<String> {
        let url = self.project_endpoint(project, &format!("jobs/{job_id}/trace"))?;
        self.get_text(url).await
    }

    /// Streaming response for the job's artifacts archive.
    pub async fn job_artifacts(&self, project: &str, job_id: u64) -> Result<Response> {
        let url = self.project_endpoint(project, &format!("jobs/{job_id}/artifacts"))?;
        self.fetch(url).await
    }
}
