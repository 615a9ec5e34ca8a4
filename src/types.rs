use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    // Set by Facebook when the user declines the permission dialog
    pub error: Option<String>,
    pub error_reason: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AtomParams {
    pub access_token: Option<String>,
}

/// The `/me` object, with the home feed nested under `home`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "graph_id")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub link: Option<String>,
    pub bio: Option<String>,
    pub home: Option<HomeFeed>,
}

impl Profile {
    pub fn posts(&self) -> &[Post] {
        self.home.as_ref().map(|h| h.data.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeFeed {
    #[serde(default)]
    pub data: Vec<Post>,
}

/// Reference to another graph object (`from`, `place`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "graph_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "graph_id")]
    pub id: Option<String>,
    pub from: Option<NamedRef>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub story: Option<String>,
    pub picture: Option<String>,
    pub link: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_time: Option<String>,
    pub updated_time: Option<String>,
    pub place: Option<NamedRef>,
}

// Graph API error payload
#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<i64>,
}

/// Graph ids are strings, but test fixtures and mock servers often send numbers.
fn graph_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_accepts_numeric_ids() {
        let profile: Profile = serde_json::from_str(
            r#"{"id": 1, "name": "Alice", "home": {"data": [{"id": "1_2", "from": {"id": 1}}]}}"#,
        )
        .unwrap();

        assert_eq!(profile.id.as_deref(), Some("1"));
        assert_eq!(profile.posts().len(), 1);
        assert_eq!(
            profile.posts()[0].from.as_ref().unwrap().id.as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_profile_without_home_has_no_posts() {
        let profile: Profile = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert!(profile.posts().is_empty());
    }
}
