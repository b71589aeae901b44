use serde::Serialize;

use super::GitLabClient;
use crate::error::Result;
use crate::gitlab::types::Note;

#[derive(Debug, Serialize)]
struct NewNote<'a> {
    body: &'a str,
}

impl GitLabClient {
    /// Comments on a merge request, oldest first.
    pub async fn merge_request_notes(&self, project: &str, iid: u64) -> Result<Vec<Note>> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/notes"))?;
        let query = [
            ("order_by", "created_at".to_string()),
            ("sort", "asc".to_string()),
        ];
        self.paginate(url, &query, None).await
    }

    pub async fn create_merge_request_note(
        &self,
        project: &str,
        iid: u64,
        body: &str,
    ) -> Result<Note> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/notes"))?;
        self.post_json(url, &NewNote { body }).await
    }
}
