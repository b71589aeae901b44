use super::types::Upload;

/// Absolute URL of an uploaded file.
///
/// The uploads endpoint answers with a path relative to the project's web page
/// (e.g. `/uploads/<hash>/lab.tar.gz`), which release links cannot use as is.
///
/// # Returns
///
/// Clickable URL (e.g. <https://gitlab.com/group/project/uploads/abc/lab.tar.gz>)
pub fn upload_url(project_web_url: &str, upload: &Upload) -> String {
    format!(
        "{}/{}",
        project_web_url.trim_end_matches('/'),
        upload.url.trim_start_matches('/')
    )
}

/// Ref the server keeps for a merge request's head commit.
pub fn merge_request_head_ref(iid: u64) -> String {
    format!("merge-requests/{iid}/head")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(url: &str) -> Upload {
        Upload {
            alt: "lab.tar.gz".to_string(),
            url: url.to_string(),
            full_path: None,
            markdown: String::new(),
        }
    }

    #[test]
    fn test_upload_url_joins_once() {
        let url = upload_url(
            "https://gitlab.com/group/project/",
            &upload("/uploads/abc/lab.tar.gz"),
        );
        assert_eq!(url, "https://gitlab.com/group/project/uploads/abc/lab.tar.gz");
    }

    #[test]
    fn test_merge_request_head_ref() {
        assert_eq!(merge_request_head_ref(12), "merge-requests/12/head");
    }
}
