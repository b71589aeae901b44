use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Body;

use super::GitLabClient;
use crate::error::{LabError, Result};
use crate::gitlab::types::Upload;

impl GitLabClient {
    /// Stream a local file to the project uploads endpoint.
    pub async fn upload_file(&self, project: &str, path: &Path) -> Result<Upload> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                LabError::validation(format!("not a file: {}", path.display()))
            })?
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let part = Part::stream_with_length(Body::from(file), length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let url = self.project_endpoint(project, "uploads")?;
        let form = Form::new().part("file", part);
        self.post_multipart(url, form).await
    }
}

#[cfg(test)]
mod tests {
    use crate::gitlab::fixtures::{client_for, PROJECT, PROJECT_PATH};
    use mockito::Matcher;
    use std::io::Write;

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("{PROJECT_PATH}/uploads").as_str())
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::Regex(r#"filename="build.log""#.into()))
            .with_status(201)
            .with_body(
                r#"{"alt": "build.log", "url": "/uploads/66dbcd21ec5d24ed6ea225176098d52b/build.log",
                    "full_path": "/-/project/1/uploads/66dbcd21ec5d24ed6ea225176098d52b/build.log",
                    "markdown": "[build.log](/uploads/66dbcd21ec5d24ed6ea225176098d52b/build.log)"}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.log");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"all green")
            .unwrap();

        let upload = client_for(&server)
            .upload_file(PROJECT, &path)
            .await
            .unwrap();

        assert!(upload.url.ends_with("/build.log"));
        mock.assert_async().await;
    }
}
