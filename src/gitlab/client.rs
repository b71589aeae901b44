use std::time::Duration;

use log::{debug, trace};
use reqwest::header::HeaderMap;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::Token;
use crate::error::{LabError, Result};

pub mod jobs;
pub mod labels;
pub mod merge_requests;
pub mod milestones;
pub mod notes;
pub mod pipelines;
pub mod projects;
pub mod releases;
pub mod snippets;
pub mod uploads;
pub mod users;

pub(super) const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const CONNECT_TIMEOUT_SECONDS: u64 = 10;
const NEXT_PAGE_HEADER: &str = "x-next-page";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Query parameters as sent on the wire.
pub type Query<'a> = [(&'a str, String)];

#[derive(Debug)]
pub struct GitLabClient {
    client: Client,
    base_url: Url,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("lab/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| LabError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| LabError::Config(format!("Invalid base URL: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_url = base_url
            .join("api/v4/")
            .map_err(|e| LabError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_url,
            token,
        })
    }

    /// Instance web root, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Helper to build authenticated requests
    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.header(TOKEN_HEADER, token.as_str())
        } else {
            request
        }
    }

    /// API URL for a path relative to `api/v4/`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_url.join(path)?)
    }

    /// Construct project base URL
    pub fn project_url(&self, project_id: &str) -> Result<Url> {
        self.api_url
            .join(&format!("projects/{}/", path_segment(project_id)?))
            .map_err(|e| LabError::Config(format!("Invalid project URL: {e}")))
    }

    /// API URL for a path below a project, e.g. `pipelines/latest`
    pub fn project_endpoint(&self, project_id: &str, path: &str) -> Result<Url> {
        Ok(self.project_url(project_id)?.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{method} {url}");
        self.auth_request(self.client.request(method, url))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &Query<'_>,
    ) -> Result<T> {
        let response = self
            .send(self.request(Method::GET, url).query(query))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn get_text(&self, url: Url) -> Result<String> {
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.text().await?)
    }

    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::POST, url).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// POST without a body, for action endpoints like `retry` or `approve`
    pub async fn post_action<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.request(Method::POST, url)).await?;
        Ok(response.json().await?)
    }

    /// POST to an action endpoint whose response body is not needed
    pub async fn post_discard(&self, url: Url) -> Result<()> {
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    pub async fn put_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::PUT, url).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, url: Url) -> Result<()> {
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        url: Url,
        form: multipart::Form,
    ) -> Result<T> {
        debug!("POST {url} (multipart)");
        let request = self.auth_request(self.client.post(url)).multipart(form);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Start a streaming download.
    ///
    /// The token is only attached when the URL points at this instance, so
    /// release links hosted elsewhere never see it. No request timeout is set
    /// beyond the connect timeout.
    pub async fn fetch(&self, url: Url) -> Result<Response> {
        debug!("GET {url} (download)");
        let request = if url.origin() == self.base_url.origin() {
            self.auth_request(self.client.get(url))
        } else {
            self.client.get(url)
        };
        self.send(request).await
    }

    /// Collect every page of a list endpoint.
    ///
    /// Stops when the `X-Next-Page` header is empty or missing, when a page
    /// comes back empty, or once `limit` items were collected.
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &Query<'_>,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let per_page = limit.map_or(PAGE_SIZE, |limit| limit.clamp(1, PAGE_SIZE));
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let (items, next_page) = self
                .fetch_page::<T>(url.clone(), query, per_page, page)
                .await?;
            let fetched = items.len();
            all_items.extend(items);

            if let Some(limit) = limit {
                if all_items.len() >= limit {
                    all_items.truncate(limit);
                    break;
                }
            }

            match next_page {
                Some(next) if fetched > 0 => page = next,
                _ => break,
            }
        }

        Ok(all_items)
    }

    /// Walk pages of a list endpoint until an item matches.
    ///
    /// Later pages are never requested once a match is found.
    pub async fn find_paginated<T, F>(
        &self,
        url: Url,
        query: &Query<'_>,
        mut predicate: F,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let mut page = 1;

        loop {
            let (items, next_page) = self
                .fetch_page::<T>(url.clone(), query, PAGE_SIZE, page)
                .await?;
            let fetched = items.len();

            if let Some(found) = items.into_iter().find(|item| predicate(item)) {
                return Ok(Some(found));
            }

            match next_page {
                Some(next) if fetched > 0 => page = next,
                _ => return Ok(None),
            }
        }
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &Query<'_>,
        per_page: usize,
        page: usize,
    ) -> Result<(Vec<T>, Option<usize>)> {
        let mut params = query.to_vec();
        params.push(("per_page", per_page.to_string()));
        params.push(("page", page.to_string()));

        let response = self
            .send(self.request(Method::GET, url).query(&params))
            .await?;
        let next_page = next_page(response.headers());
        trace!("page {page} fetched, next page: {next_page:?}");

        Ok((response.json().await?, next_page))
    }
}

/// Percent-encode a user-supplied name as a single path segment.
///
/// `.` and `..` survive encoding (the URL parser also reads `%2E` as a dot)
/// and would climb out of the endpoint on `join`, so they are rejected.
pub fn path_segment(value: &str) -> Result<String> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(LabError::validation(format!(
            "invalid name {value:?}: not usable as a path segment"
        )));
    }
    Ok(urlencoding::encode(value).into_owned())
}

fn next_page(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(LabError::Api {
        status: status.as_u16(),
        message: api_message(&body, status.canonical_reason()),
    })
}

/// Extract the human-readable part of an API error body.
///
/// The API reports errors as `{"message": ...}` or `{"error": ...}`, where the
/// value is a string, a list, or a map of field errors.
fn api_message(body: &str, reason: Option<&str>) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed
        .as_ref()
        .and_then(|value| value.get("message").or_else(|| value.get("error")));

    match field {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None if body.trim().is_empty() => reason.unwrap_or("no response body").to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u64,
    }

    fn client_for(server: &mockito::Server) -> GitLabClient {
        GitLabClient::new(&server.url(), Some(Token::from("secret"))).unwrap()
    }

    fn page_query(page: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), page.into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
        ])
    }

    #[test]
    fn test_project_url_encodes_namespace() {
        let client = GitLabClient::new("https://gitlab.com", None).unwrap();
        let url = client
            .project_endpoint("group/sub/proj", "pipelines/latest")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproj/pipelines/latest"
        );
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        let client = GitLabClient::new("https://gitlab.com", None).unwrap();
        for name in ["", ".", ".."] {
            let err = client.project_url(name).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{name:?} should be rejected");
        }
        assert_eq!(path_segment("v1.0..2").unwrap(), "v1.0..2");
        assert_eq!(path_segment("kind/bug").unwrap(), "kind%2Fbug");
    }

    #[test]
    fn test_base_url_with_subpath_is_kept() {
        let client = GitLabClient::new("https://example.com/gitlab", None).unwrap();
        assert_eq!(
            client.endpoint("user").unwrap().as_str(),
            "https://example.com/gitlab/api/v4/user"
        );
        assert_eq!(client.base_url().as_str(), "https://example.com/gitlab/");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitLabClient::new("not a url", None);
        assert!(matches!(result, Err(LabError::Config(_))));
    }

    #[test]
    fn test_api_message_variants() {
        assert_eq!(
            api_message(r#"{"message":"404 Job Not Found"}"#, None),
            "404 Job Not Found"
        );
        assert_eq!(
            api_message(r#"{"error":"insufficient_scope"}"#, None),
            "insufficient_scope"
        );
        assert_eq!(
            api_message(r#"{"message":{"title":["can't be blank"]}}"#, None),
            r#"{"title":["can't be blank"]}"#
        );
        assert_eq!(api_message("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(api_message("<html>oops</html>\n", None), "<html>oops</html>");
    }

    #[tokio::test]
    async fn test_get_sends_private_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/user")
            .match_header("private-token", "secret")
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.endpoint("user").unwrap();
        let item: Item = client.get(url).await.unwrap();

        assert_eq!(item, Item { id: 7 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/group%2Fproj/jobs/1")
            .with_status(404)
            .with_body(r#"{"message":"404 Not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.project_endpoint("group/proj", "jobs/1").unwrap();
        let err = client.get::<Item>(url).await.unwrap_err();

        match err {
            LabError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "404 Not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_paginate_follows_next_page_header() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("1"))
            .with_header("x-next-page", "2")
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("2"))
            .with_header("x-next-page", "")
            .with_body(r#"[{"id": 3}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let items: Vec<Item> = client
            .paginate(client.endpoint("items").unwrap(), &[], None)
            .await
            .unwrap();

        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_paginate_stops_at_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/items")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "2".into()),
                Matcher::UrlEncoded("scope".into(), "all".into()),
            ]))
            .with_header("x-next-page", "2")
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;
        let never = server
            .mock("GET", "/api/v4/items")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let items: Vec<Item> = client
            .paginate(
                client.endpoint("items").unwrap(),
                &[("scope", "all".to_string())],
                Some(2),
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        never.assert_async().await;
    }

    #[tokio::test]
    async fn test_paginate_stops_on_empty_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("1"))
            .with_header("x-next-page", "2")
            .with_body("[]")
            .create_async()
            .await;
        let never = server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("2"))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let items: Vec<Item> = client
            .paginate(client.endpoint("items").unwrap(), &[], None)
            .await
            .unwrap();

        assert!(items.is_empty());
        never.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_paginated_exits_early() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("1"))
            .with_header("x-next-page", "2")
            .with_body(r#"[{"id": 1}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("2"))
            .with_header("x-next-page", "3")
            .with_body(r#"[{"id": 2}, {"id": 3}]"#)
            .create_async()
            .await;
        let never = server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("3"))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.endpoint("items").unwrap();
        let found: Option<Item> = client
            .find_paginated(url, &[], |item: &Item| item.id == 2)
            .await
            .unwrap();

        assert_eq!(found, Some(Item { id: 2 }));
        never.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_paginated_exhausts_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/items")
            .match_query(page_query("1"))
            .with_body(r#"[{"id": 1}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.endpoint("items").unwrap();
        let found: Option<Item> = client
            .find_paginated(url, &[], |item: &Item| item.id == 9)
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_token_for_foreign_hosts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/file.bin")
            .match_header("private-token", Matcher::Missing)
            .with_body("data")
            .create_async()
            .await;

        let token = Some(Token::from("secret"));
        let client = GitLabClient::new("https://gitlab.invalid", token).unwrap();
        let url = Url::parse(&format!("{}/file.bin", server.url())).unwrap();
        let response = client.fetch(url).await.unwrap();

        assert_eq!(response.text().await.unwrap(), "data");
        mock.assert_async().await;
    }
}
