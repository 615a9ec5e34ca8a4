use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Config,
    error::AppError,
    types::{GraphErrorBody, Profile},
};

pub const OAUTH_SCOPES: &[&str] = &["read_stream", "offline_access"];

const HOME_FIELDS: &str = "home.limit(50),id,username,name,link,updated_time,bio,location";
const USER_AGENT: &str = "facebook-atom/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound GET. One call per handler invocation, no retries.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: Url) -> Result<UpstreamResponse, AppError>;
}

pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: Url) -> Result<UpstreamResponse, AppError> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(UpstreamResponse { status, body })
    }
}

#[derive(Clone)]
pub struct FacebookApi {
    config: Arc<Config>,
    http: Arc<dyn HttpFetch>,
}

impl FacebookApi {
    pub fn new(config: Arc<Config>, http: Arc<dyn HttpFetch>) -> Self {
        Self { config, http }
    }

    pub fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        let scopes = OAUTH_SCOPES.join(",");
        let redirect_uri = self.config.redirect_uri();
        parse_url(
            &self.config.auth_url,
            &[
                ("scope", scopes.as_str()),
                ("client_id", self.config.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("state", state),
            ],
        )
    }

    pub fn access_token_url(&self, code: &str) -> Result<Url, AppError> {
        let redirect_uri = self.config.redirect_uri();
        let credentials = &self.config.credentials;
        parse_url(
            &self.config.graph_endpoint("oauth/access_token"),
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code),
            ],
        )
    }

    pub fn home_url(&self, access_token: &str) -> Result<Url, AppError> {
        parse_url(
            &self.config.graph_endpoint("me"),
            &[("access_token", access_token), ("fields", HOME_FIELDS)],
        )
    }

    /// Trades an authorization code for a long-lived access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let url = self.access_token_url(code)?;
        info!("Getting access token via {}", redact(&url, "client_secret"));

        let response = self.http.get(url).await?;
        debug!("Access token response: {} {}", response.status, response.body);
        if !response.is_success() {
            return Err(upstream_error(&response));
        }
        parse_access_token(&response.body)
    }

    /// Fetches the user's profile along with the first page of their news feed.
    pub async fn fetch_home(&self, access_token: &str) -> Result<Profile, AppError> {
        let url = self.home_url(access_token)?;
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(upstream_error(&response));
        }
        parse_profile(&response.body)
    }
}

fn parse_url(base: &str, params: &[(&str, &str)]) -> Result<Url, AppError> {
    Url::parse_with_params(base, params)
        .map_err(|e| AppError::Upstream(format!("invalid endpoint {}: {}", base, e)))
}

fn redact(url: &Url, param: &str) -> Url {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == param { "REDACTED".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}

// reqwest errors print the request URL, and token URLs carry the app secret.
fn transport_error(e: reqwest::Error) -> AppError {
    AppError::Transport(e.without_url())
}

fn upstream_error(response: &UpstreamResponse) -> AppError {
    match serde_json::from_str::<GraphErrorBody>(&response.body) {
        Ok(body) => graph_error(body),
        Err(_) => AppError::Upstream(format!("HTTP {}", response.status)),
    }
}

fn graph_error(body: GraphErrorBody) -> AppError {
    let error = body.error;
    warn!(
        "Graph API error (type: {}, code: {}): {}",
        error.kind.as_deref().unwrap_or("unknown"),
        error.code.map(|c| c.to_string()).unwrap_or_default(),
        error.message
    );
    AppError::Upstream(error.message)
}

/// The token endpoint answers `access_token=...&expires=...`; newer API
/// versions answer with JSON instead. Both are accepted.
pub fn parse_access_token(body: &str) -> Result<String, AppError> {
    let body = body.trim();
    if body.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if let Ok(error) = serde_json::from_value::<GraphErrorBody>(value.clone()) {
            return Err(graph_error(error));
        }
        return match &value["access_token"] {
            serde_json::Value::String(token) if !token.is_empty() => Ok(token.clone()),
            serde_json::Value::Array(tokens) => tokens
                .iter()
                .find_map(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or_else(missing_token),
            _ => Err(missing_token()),
        };
    }

    url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, token)| token.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(missing_token)
}

fn missing_token() -> AppError {
    AppError::Upstream("no access_token in token response".to_string())
}

pub fn parse_profile(body: &str) -> Result<Profile, AppError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if let Ok(error) = serde_json::from_value::<GraphErrorBody>(value.clone()) {
        return Err(graph_error(error));
    }
    Ok(serde_json::from_value(value)?)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeFetch;
    use super::*;
    use crate::config::test_config;

    fn api(fake: Arc<FakeFetch>) -> FacebookApi {
        FacebookApi::new(Arc::new(test_config()), fake)
    }

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_authorization_url() {
        let url = api(Arc::new(FakeFetch::default()))
            .authorization_url("abc123")
            .unwrap();

        assert!(url.as_str().starts_with("https://www.facebook.com/dialog/oauth/?"));
        assert_eq!(query(&url, "scope").as_deref(), Some("read_stream,offline_access"));
        assert_eq!(query(&url, "client_id").as_deref(), Some("app-123"));
        assert_eq!(
            query(&url, "redirect_uri").as_deref(),
            Some("https://feeds.example.com/got_auth_code")
        );
        assert_eq!(query(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(query(&url, "state").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_access_token_url_uses_same_redirect_uri() {
        let url = api(Arc::new(FakeFetch::default()))
            .access_token_url("ABC")
            .unwrap();

        assert_eq!(url.path(), "/oauth/access_token");
        assert_eq!(query(&url, "client_secret").as_deref(), Some("s3cret"));
        assert_eq!(query(&url, "code").as_deref(), Some("ABC"));
        assert_eq!(
            query(&url, "redirect_uri").as_deref(),
            Some("https://feeds.example.com/got_auth_code")
        );
    }

    #[test]
    fn test_redact_hides_secret() {
        let url = api(Arc::new(FakeFetch::default()))
            .access_token_url("ABC")
            .unwrap();
        let logged = redact(&url, "client_secret").to_string();
        assert!(!logged.contains("s3cret"));
        assert!(logged.contains("client_secret=REDACTED"));
        assert!(logged.contains("code=ABC"));
    }

    #[test]
    fn test_parse_access_token() {
        assert_eq!(
            parse_access_token("access_token=T123&expires=5183999").unwrap(),
            "T123"
        );
        assert_eq!(
            parse_access_token("access_token=first&access_token=second").unwrap(),
            "first"
        );
        assert_eq!(
            parse_access_token(r#"{"access_token": "T123", "token_type": "bearer"}"#).unwrap(),
            "T123"
        );
        assert_eq!(
            parse_access_token(r#"{"access_token": ["T123"]}"#).unwrap(),
            "T123"
        );
        assert!(matches!(
            parse_access_token("expires=5183999"),
            Err(AppError::Upstream(_))
        ));
        assert!(matches!(
            parse_access_token(r#"{"error": {"message": "Invalid verification code format.", "type": "OAuthException", "code": 100}}"#),
            Err(AppError::Upstream(msg)) if msg == "Invalid verification code format."
        ));
    }

    #[test]
    fn test_parse_profile_error_payload() {
        let result = parse_profile(
            r#"{"error": {"message": "Error validating access token", "type": "OAuthException", "code": 190}}"#,
        );
        assert!(matches!(result, Err(AppError::Upstream(msg)) if msg == "Error validating access token"));
        assert!(matches!(
            parse_profile("<html>"),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_home_requests_fields() {
        let fake = Arc::new(FakeFetch::with_body(
            200,
            r#"{"id": "1", "name": "Alice", "home": {"data": []}}"#,
        ));
        let profile = api(Arc::clone(&fake)).fetch_home("T").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));

        let requests = fake.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path(), "/me");
        assert_eq!(query(&requests[0], "access_token").as_deref(), Some("T"));
        assert_eq!(query(&requests[0], "fields").as_deref(), Some(HOME_FIELDS));
    }

    #[tokio::test]
    async fn test_non_success_status_surfaces_graph_message() {
        let fake = Arc::new(FakeFetch::with_body(
            400,
            r#"{"error": {"message": "This authorization code has been used.", "type": "OAuthException"}}"#,
        ));
        let result = api(fake).exchange_code("ABC").await;
        assert!(matches!(result, Err(AppError::Upstream(msg)) if msg == "This authorization code has been used."));
    }

    #[tokio::test]
    async fn test_transport_error_omits_secret() {
        let mut config = test_config();
        config.graph_url = "http://127.0.0.1:1/".to_string();
        let api = FacebookApi::new(Arc::new(config), Arc::new(ReqwestFetch::new().unwrap()));

        let error = api.exchange_code("ABC").await.unwrap_err();
        assert!(matches!(error, AppError::Transport(_)));
        assert!(!error.to_string().contains("s3cret"));
        assert!(!format!("{:?}", error).contains("s3cret"));
    }
}
