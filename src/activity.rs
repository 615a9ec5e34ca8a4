//! Normalizes Graph API users and posts into activity-stream style objects.

use chrono::{DateTime, Utc};

use crate::types::{NamedRef, Post, Profile};

const TAG_DOMAIN: &str = "facebook.com";
const TAG_YEAR: i32 = 2012;
const FACEBOOK_URL: &str = "https://www.facebook.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Note,
    Image,
    Article,
    Video,
    Place,
    Event,
    Application,
    Group,
    Page,
    Person,
    Unknown,
}

impl ObjectType {
    pub fn from_post_type(kind: Option<&str>) -> Self {
        match kind {
            None | Some("status") | Some("post") | Some("question") | Some("stream") => {
                ObjectType::Note
            }
            Some("photo") => ObjectType::Image,
            Some("link") => ObjectType::Article,
            Some("video") | Some("swf") | Some("music") => ObjectType::Video,
            Some("checkin") | Some("location") => ObjectType::Place,
            Some("event") => ObjectType::Event,
            Some("application") => ObjectType::Application,
            Some("group") => ObjectType::Group,
            Some("page") => ObjectType::Page,
            Some("user") => ObjectType::Person,
            Some(_) => ObjectType::Unknown,
        }
    }

    /// Name in the activity schema (`http://activitystrea.ms/schema/1.0/<name>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Note | ObjectType::Unknown => "note",
            ObjectType::Image => "image",
            ObjectType::Article => "article",
            ObjectType::Video => "video",
            ObjectType::Place => "place",
            ObjectType::Event => "event",
            ObjectType::Application => "application",
            ObjectType::Group => "group",
            ObjectType::Page => "page",
            ObjectType::Person => "person",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Actor {
    pub fn from_profile(profile: &Profile) -> Self {
        let handle = profile.username.as_ref().or(profile.id.as_ref());
        Self {
            id: handle.map(|h| tag_uri(h)),
            display_name: profile.name.clone(),
            username: profile.username.clone(),
            url: profile
                .link
                .clone()
                .or_else(|| handle.map(|h| format!("{}/{}", FACEBOOK_URL, h))),
            image: profile.id.as_deref().map(picture_url),
            description: profile.bio.clone(),
        }
    }

    pub fn from_ref(who: &NamedRef) -> Self {
        let handle = who.username.as_ref().or(who.id.as_ref());
        Self {
            id: handle.map(|h| tag_uri(h)),
            display_name: who.name.clone(),
            username: who.username.clone(),
            url: handle.map(|h| format!("{}/{}", FACEBOOK_URL, h)),
            image: who.id.as_deref().map(picture_url),
            ..Default::default()
        }
    }

    /// Display name, falling back to username.
    pub fn name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
            .filter(|n| !n.is_empty())
    }
}

/// A link shared in a post.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub url: String,
    pub display_name: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityObject {
    pub id: Option<String>,
    pub object_type: ObjectType,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub location: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: Option<String>,
    pub actor: Actor,
    pub verb: &'static str,
    pub object: ActivityObject,
}

pub fn post_to_activity(post: &Post) -> FeedItem {
    let actor = post.from.as_ref().map(Actor::from_ref).unwrap_or_default();
    let object_type = ObjectType::from_post_type(post.kind.as_deref());

    let object = ActivityObject {
        id: post.id.as_deref().map(tag_uri),
        object_type,
        content: post_content(post),
        url: post.id.as_deref().map(post_url),
        image: post.picture.clone(),
        published: post.created_time.as_deref().map(to_rfc3339),
        updated: post
            .updated_time
            .as_deref()
            .or(post.created_time.as_deref())
            .map(to_rfc3339),
        location: post.place.as_ref().and_then(|p| p.name.clone()),
        attachment: post.link.as_ref().map(|link| Attachment {
            url: link.clone(),
            display_name: post.name.clone(),
            summary: post.description.clone(),
        }),
    };

    FeedItem {
        id: object.id.clone(),
        actor,
        verb: "post",
        object,
    }
}

/// Text for a post: its message or story, or a synthesized line for the types
/// that are meaningless without one.
pub fn post_content(post: &Post) -> Option<String> {
    let text = post
        .message
        .as_deref()
        .or(post.story.as_deref())
        .filter(|t| !t.trim().is_empty());
    if let Some(text) = text {
        return Some(text.to_string());
    }

    match ObjectType::from_post_type(post.kind.as_deref()) {
        ObjectType::Image => {
            let author = post.from.as_ref().map(Actor::from_ref).unwrap_or_default();
            author.name().map(|who| format!("{} added a new photo.", who))
        }
        ObjectType::Note
        | ObjectType::Article
        | ObjectType::Video
        | ObjectType::Place
        | ObjectType::Event
        | ObjectType::Application
        | ObjectType::Group
        | ObjectType::Page
        | ObjectType::Person => None,
        ObjectType::Unknown => None,
    }
}

pub fn tag_uri(name: &str) -> String {
    format!("tag:{},{}:{}", TAG_DOMAIN, TAG_YEAR, name)
}

fn picture_url(id: &str) -> String {
    format!("https://graph.facebook.com/{}/picture?type=large", id)
}

// Post ids look like `<user id>_<post id>`.
fn post_url(id: &str) -> String {
    match id.split_once('_') {
        Some((user, post)) => format!("{}/{}/posts/{}", FACEBOOK_URL, user, post),
        None => format!("{}/{}", FACEBOOK_URL, id),
    }
}

/// Graph timestamps look like `2012-05-01T12:00:00+0000`; Atom wants RFC 3339.
/// Unparseable values pass through untouched.
pub fn to_rfc3339(timestamp: &str) -> String {
    DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(timestamp))
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .unwrap_or_else(|_| timestamp.to_string())
}
