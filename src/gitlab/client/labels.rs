use serde::Serialize;

use super::{path_segment, GitLabClient};
use crate::error::Result;
use crate::gitlab::types::Label;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLabel {
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl GitLabClient {
    pub async fn list_labels(&self, project: &str, search: Option<&str>) -> Result<Vec<Label>> {
        let url = self.project_endpoint(project, "labels")?;
        let mut query = vec![("with_counts", "true".to_string())];
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }
        self.paginate(url, &query, None).await
    }

    pub async fn create_label(&self, project: &str, label: &NewLabel) -> Result<Label> {
        let url = self.project_endpoint(project, "labels")?;
        self.post_json(url, label).await
    }

    /// Delete a label by numeric ID or by name.
    pub async fn delete_label(&self, project: &str, name_or_id: &str) -> Result<()> {
        let segment = path_segment(name_or_id)?;
        let url = self.project_endpoint(project, &format!("labels/{segment}"))?;
        self.delete(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::fixtures::{client_for, label_json, PROJECT, PROJECT_PATH};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_create_label() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("{PROJECT_PATH}/labels").as_str())
            .match_body(Matcher::Json(serde_json::json!({
                "name": "needs review",
                "color": "#FF0000",
                "description": "Waiting on a reviewer"
            })))
            .with_status(201)
            .with_body(label_json(7, "needs review", "#FF0000"))
            .create_async()
            .await;

        let label = NewLabel {
            name: "needs review".to_string(),
            color: "#FF0000".to_string(),
            description: Some("Waiting on a reviewer".to_string()),
            priority: None,
        };
        let created = client_for(&server)
            .create_label(PROJECT, &label)
            .await
            .unwrap();

        assert_eq!(created.id, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_label_encodes_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", format!("{PROJECT_PATH}/labels/kind%2Fbug").as_str())
            .with_status(204)
            .create_async()
            .await;

        client_for(&server)
            .delete_label(PROJECT, "kind/bug")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_label_rejects_dot_segments() {
        let mut server = mockito::Server::new_async().await;
        let project_delete = server
            .mock("DELETE", Matcher::Regex(format!("^{PROJECT_PATH}")))
            .expect(0)
            .create_async()
            .await;

        for name in ["..", "."] {
            let err = client_for(&server)
                .delete_label(PROJECT, name)
                .await
                .unwrap_err();
            assert_eq!(err.exit_code(), 2);
        }
        project_delete.assert_async().await;
    }
}
