use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Process-wide settings, built once in `main` and shared by every handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: ClientCredentials,
    pub scheme: String,
    pub host: String,
    pub debug: bool,
    pub auth_url: String,
    pub graph_url: String,
    pub state_ttl: Duration,
}

impl Config {
    pub fn host_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Must be identical in the dialog request and the token request.
    pub fn redirect_uri(&self) -> String {
        format!("{}/got_auth_code", self.host_url())
    }

    /// Callback role carried through the OAuth dance for the next step.
    pub fn next_step_url(&self) -> String {
        format!("{}/got_auth_token", self.host_url())
    }

    pub fn atom_url(&self, access_token: &str) -> String {
        let token: String = url::form_urlencoded::byte_serialize(access_token.as_bytes()).collect();
        format!("{}/atom?access_token={}", self.host_url(), token)
    }

    /// The URL a request was made to, as the client saw it. Falls back to the
    /// configured host when the request has no Host header.
    pub fn request_url(&self, host: Option<&str>, path_and_query: &str) -> String {
        let host = host.filter(|h| !h.is_empty()).unwrap_or(&self.host);
        format!("{}://{}{}", self.scheme, host, path_and_query)
    }

    pub fn graph_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.graph_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        credentials: ClientCredentials {
            client_id: "app-123".to_string(),
            client_secret: "s3cret".to_string(),
        },
        scheme: "https".to_string(),
        host: "feeds.example.com".to_string(),
        debug: false,
        auth_url: "https://www.facebook.com/dialog/oauth/".to_string(),
        graph_url: "https://graph.facebook.com/".to_string(),
        state_ttl: Duration::from_secs(600),
    }
}
