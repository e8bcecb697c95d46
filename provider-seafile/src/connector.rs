//! Seafile Web API connector
//!
//! Implements [`RemoteLibraryApi`] over the `api2` endpoints. Each method is a
//! single HTTP request; throttling comes back as `BridgeError::RateLimited`
//! so the caller's [`RateLimitedGateway`](crate::gateway::RateLimitedGateway)
//! can wait it out.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{ByteRange, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{RemoteEntry, RemoteLibrary, RemoteLibraryApi};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::SeafileError;
use crate::types::{AuthTokenResponse, DetailResponse, DirEntry, NonFieldErrors, RepoEntry};

/// Seafile Web API connector
///
/// # Example
///
/// ```ignore
/// use provider_seafile::SeafileConnector;
/// use bridge_traits::storage::RemoteLibraryApi;
///
/// let connector = SeafileConnector::new(http_client, "https://seafile.example.org/")
///     .with_token(token);
/// let libraries = connector.list_libraries().await?;
/// ```
pub struct SeafileConnector {
    http_client: Arc<dyn HttpClient>,

    /// Server base URI without trailing slash
    server: String,

    /// API token for `Authorization: Token ...`
    token: Option<String>,

    request_timeout: Duration,
}

impl SeafileConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, server_uri: impl AsRef<str>) -> Self {
        Self {
            http_client,
            server: server_uri.as_ref().trim_end_matches('/').to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api2/{}", self.server, path)
    }

    fn authorized_get(&self, url: String) -> Result<HttpRequest> {
        let token = self.token.as_deref().ok_or_else(|| {
            SeafileError::AuthenticationFailed("no API token configured".to_string())
        })?;

        Ok(HttpRequest::new(HttpMethod::Get, url)
            .api_token(token)
            .header("Accept", "application/json")
            .timeout(self.request_timeout))
    }

    /// Human-readable message from an error body.
    fn error_detail(response: &HttpResponse) -> String {
        if let Ok(body) = response.json::<DetailResponse>() {
            return body.detail;
        }
        if let Ok(body) = response.json::<NonFieldErrors>() {
            return body.non_field_errors.join("; ");
        }
        String::from_utf8_lossy(&response.body).trim().to_string()
    }

    /// Map a non-success status onto the error classes callers act on.
    fn check_status(response: HttpResponse, resource: &str) -> Result<HttpResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let detail = Self::error_detail(&response);
        let error = match response.status {
            429 => SeafileError::Throttled { detail },
            404 => SeafileError::NotFound {
                path: resource.to_string(),
            },
            401 | 403 => SeafileError::AuthenticationFailed(detail),
            status => SeafileError::ApiError {
                status_code: status,
                message: detail,
            },
        };

        if response.status != 404 {
            warn!(status = response.status, resource, error = %error, "Seafile request failed");
        }

        Err(error.into())
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            SeafileError::ParseError(format!("Failed to parse {} response: {}", what, e)).into()
        })
    }
}

#[async_trait]
impl RemoteLibraryApi for SeafileConnector {
    #[instrument(skip(self, password), fields(server = %self.server))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        info!("Requesting Seafile API token");

        let request = HttpRequest::new(HttpMethod::Post, self.api_url("auth-token/"))
            .header("Accept", "application/json")
            .form(&[("username", username), ("password", password)])
            .timeout(self.request_timeout);

        let response = self.http_client.execute(request).await?;
        if response.status == 400 {
            // bad credentials are reported as a validation error
            return Err(SeafileError::AuthenticationFailed(Self::error_detail(&response)).into());
        }
        let response = Self::check_status(response, "auth-token")?;
        let body: AuthTokenResponse = Self::parse(&response, "auth-token")?;

        if body.token.is_empty() {
            return Err(SeafileError::AuthenticationFailed(
                "server returned an empty token".to_string(),
            )
            .into());
        }

        Ok(body.token)
    }

    #[instrument(skip(self))]
    async fn list_libraries(&self) -> Result<Vec<RemoteLibrary>> {
        let request = self.authorized_get(self.api_url("repos/"))?;
        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response, "repos")?;

        let repos: Vec<RepoEntry> = Self::parse(&response, "repos")?;
        debug!(count = repos.len(), "Listed libraries");

        Ok(repos.into_iter().map(RemoteLibrary::from).collect())
    }

    #[instrument(skip(self, library), fields(library = %library.name))]
    async fn list_directory(&self, library: &RemoteLibrary, path: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.api_url(&format!(
            "repos/{}/dir/?p={}",
            library.id,
            urlencoding::encode(path)
        ));

        let request = self.authorized_get(url)?;
        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response, path)?;

        let entries: Vec<DirEntry> = Self::parse(&response, "dir")?;
        let entries: Vec<RemoteEntry> = entries
            .into_iter()
            .filter_map(DirEntry::into_remote_entry)
            .collect();

        debug!(path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    #[instrument(skip(self, library), fields(library = %library.name))]
    async fn get_download_url(
        &self,
        library: &RemoteLibrary,
        path: &str,
        file_name: &str,
    ) -> Result<String> {
        let full_path = format!("{}{}", path, file_name);
        let url = self.api_url(&format!(
            "repos/{}/file/?p={}&reuse=1",
            library.id,
            urlencoding::encode(&full_path)
        ));

        let request = self.authorized_get(url)?;
        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response, &full_path)?;

        // the link comes back as a JSON string literal
        let link: String = Self::parse(&response, "file")?;
        Ok(link)
    }

    #[instrument(skip(self, url), fields(range = ?range))]
    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let mut request =
            HttpRequest::new(HttpMethod::Get, url).timeout(self.request_timeout * 4);
        if let Some(range) = range {
            request = request.range(range);
        }

        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response, url)?;

        let mut body = response.body;
        if let Some(range) = range {
            // servers that ignore Range send the whole file
            let limit = usize::try_from(range.length).unwrap_or(usize::MAX);
            if response.status == 200 && body.len() > limit {
                body.truncate(limit);
            }
        }

        debug!(bytes = body.len(), "Fetched file content");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn library() -> RemoteLibrary {
        RemoteLibrary {
            name: "Music".to_string(),
            id: "repo-1".to_string(),
        }
    }

    fn connector(mock: MockHttpClient) -> SeafileConnector {
        SeafileConnector::new(Arc::new(mock), "https://seafile.example.org/").with_token("tok")
    }

    #[tokio::test]
    async fn test_authenticate_posts_form() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url == "https://seafile.example.org/api2/auth-token/"
                    && req.body.as_deref() == Some(&b"username=me%40example.org&password=pw"[..])
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"token": "24fd3c026886e3121b2ca630805ed425c272cb96"}"#)));

        let connector = SeafileConnector::new(Arc::new(mock), "https://seafile.example.org");
        let token = connector.authenticate("me@example.org", "pw").await.unwrap();
        assert_eq!(token, "24fd3c026886e3121b2ca630805ed425c272cb96");
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                400,
                r#"{"non_field_errors": ["Unable to login with provided credentials."]}"#,
            ))
        });

        let err = connector(mock).authenticate("me", "bad").await.unwrap_err();
        match err {
            BridgeError::Unauthorized(msg) => assert!(msg.contains("Unable to login")),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_libraries() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.url == "https://seafile.example.org/api2/repos/"
                    && req.headers.get("Authorization") == Some(&"Token tok".to_string())
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"[{"id": "repo-1", "name": "Music", "type": "repo"},
                        {"id": "repo-2", "name": "Photos", "type": "repo"}]"#,
                ))
            });

        let libraries = connector(mock).list_libraries().await.unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[0], library());
    }

    #[tokio::test]
    async fn test_list_directory_encodes_path() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.url == "https://seafile.example.org/api2/repos/repo-1/dir/?p=%2FA%20B%2F")
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"[{"type": "dir", "name": "Live"}, {"type": "file", "name": "song1.mp3", "size": 4000000}]"#,
                ))
            });

        let entries = connector(mock).list_directory(&library(), "/A B/").await.unwrap();
        assert_eq!(
            entries,
            vec![
                RemoteEntry::directory("Live"),
                RemoteEntry::file("song1.mp3", 4_000_000)
            ]
        );
    }

    #[tokio::test]
    async fn test_list_directory_not_found() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, r#"{"error_msg": "Folder /B/ not found."}"#)));

        let err = connector(mock).list_directory(&library(), "/B/").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_throttle_surfaces_detail() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                429,
                r#"{"detail": "Request was throttled. Expected available in 17 seconds."}"#,
            ))
        });

        let err = connector(mock).list_directory(&library(), "/").await.unwrap_err();
        match err {
            BridgeError::RateLimited { detail } => assert!(detail.contains("17 seconds")),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_download_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.url
                    == "https://seafile.example.org/api2/repos/repo-1/file/?p=%2FA%2Fsong1.mp3&reuse=1"
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#""https://seafile.example.org/seafhttp/files/abc/song1.mp3""#,
                ))
            });

        let url = connector(mock)
            .get_download_url(&library(), "/A/", "song1.mp3")
            .await
            .unwrap();
        assert_eq!(url, "https://seafile.example.org/seafhttp/files/abc/song1.mp3");
    }

    #[tokio::test]
    async fn test_fetch_sends_range_and_truncates_full_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.headers.get("Range") == Some(&"bytes=0-3".to_string()))
            .times(1)
            .returning(|_| Ok(response(200, "0123456789")));

        let bytes = connector(mock)
            .fetch("https://seafile.example.org/seafhttp/files/abc/x", Some(ByteRange::head(4)))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"0123");
    }

    #[tokio::test]
    async fn test_fetch_without_range_returns_everything() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| !req.headers.contains_key("Range"))
            .times(1)
            .returning(|_| Ok(response(200, "0123456789")));

        let bytes = connector(mock)
            .fetch("https://seafile.example.org/seafhttp/files/abc/x", None)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 10);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let mock = MockHttpClient::new();
        let connector = SeafileConnector::new(Arc::new(mock), "https://seafile.example.org");
        let err = connector.list_libraries().await.unwrap_err();
        assert!(matches!(err, BridgeError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_operation_failed() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(502, "Bad Gateway")));

        let err = connector(mock).list_libraries().await.unwrap_err();
        match err {
            BridgeError::OperationFailed(msg) => assert!(msg.contains("502")),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
    }
}
