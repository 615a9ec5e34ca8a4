use askama::Template;

use crate::{
    activity::{post_to_activity, Actor, FeedItem},
    types::Profile,
};

const TITLE_WORDS: usize = 10;

/// A user's news feed, normalized and ready to render.
#[derive(Debug, Clone)]
pub struct NewsFeed {
    pub actor: Actor,
    pub items: Vec<FeedItem>,
}

impl NewsFeed {
    /// Items keep the order Facebook returned them in (newest first).
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            actor: Actor::from_profile(profile),
            items: profile.posts().iter().map(post_to_activity).collect(),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "Facebook news feed for {}",
            self.actor.name().unwrap_or_default()
        )
    }

    /// The first item's timestamp, or empty when there are no items.
    pub fn updated(&self) -> &str {
        self.items
            .first()
            .and_then(|item| item.object.updated.as_deref())
            .unwrap_or_default()
    }

    pub fn render_atom(&self, host_url: &str, request_url: &str) -> Result<String, askama::Error> {
        let actor = &self.actor;
        AtomTemplate {
            feed_id: format!("{}/", host_url),
            title: self.title(),
            subtitle: actor.description.as_deref().unwrap_or_default(),
            updated: self.updated(),
            actor_id: actor.id.as_deref().unwrap_or_default(),
            actor_name: actor.name().unwrap_or_default(),
            actor_url: actor.url.as_deref().unwrap_or_default(),
            actor_image: actor.image.as_deref().unwrap_or_default(),
            self_url: request_url,
            entries: self.items.iter().map(AtomEntry::from_item).collect(),
        }
        .render()
    }
}

#[derive(Template)]
#[template(path = "atom.xml")]
struct AtomTemplate<'a> {
    feed_id: String,
    title: String,
    subtitle: &'a str,
    updated: &'a str,
    actor_id: &'a str,
    actor_name: &'a str,
    actor_url: &'a str,
    actor_image: &'a str,
    self_url: &'a str,
    entries: Vec<AtomEntry<'a>>,
}

struct AtomEntry<'a> {
    id: &'a str,
    title: String,
    content: &'a str,
    url: &'a str,
    image: &'a str,
    object_type: &'static str,
    verb: &'static str,
    author_id: &'a str,
    author_name: &'a str,
    author_url: &'a str,
    published: &'a str,
    updated: &'a str,
    location: &'a str,
    link_url: &'a str,
    link_title: &'a str,
    link_summary: &'a str,
}

impl<'a> AtomEntry<'a> {
    fn from_item(item: &'a FeedItem) -> Self {
        let object = &item.object;
        let content = object.content.as_deref().unwrap_or_default();
        let author_name = item.actor.name().unwrap_or_default();
        let attachment = object.attachment.as_ref();

        Self {
            id: item.id.as_deref().unwrap_or_default(),
            title: entry_title(content, author_name),
            content,
            url: object.url.as_deref().unwrap_or_default(),
            image: object.image.as_deref().unwrap_or_default(),
            object_type: object.object_type.as_str(),
            verb: item.verb,
            author_id: item.actor.id.as_deref().unwrap_or_default(),
            author_name,
            author_url: item.actor.url.as_deref().unwrap_or_default(),
            published: object.published.as_deref().unwrap_or_default(),
            updated: object.updated.as_deref().unwrap_or_default(),
            location: object.location.as_deref().unwrap_or_default(),
            link_url: attachment.map(|a| a.url.as_str()).unwrap_or_default(),
            link_title: attachment
                .and_then(|a| a.display_name.as_deref())
                .unwrap_or_default(),
            link_summary: attachment
                .and_then(|a| a.summary.as_deref())
                .unwrap_or_default(),
        }
    }
}

fn entry_title(content: &str, author_name: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return author_name.to_string();
    }
    if words.len() > TITLE_WORDS {
        format!("{} ...", words[..TITLE_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(json: &str) -> Profile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_feed() {
        let feed = NewsFeed::from_profile(&fixture(
            r#"{"id": "1", "name": "Alice", "home": {"data": []}}"#,
        ));
        assert!(feed.items.is_empty());
        assert_eq!(feed.updated(), "");

        let xml = feed
            .render_atom("https://feeds.example.com", "https://feeds.example.com/atom?access_token=T")
            .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<title>Facebook news feed for Alice</title>"));
        assert!(xml.contains("<updated></updated>"));
        assert!(!xml.contains("<entry>"));
        assert!(xml.trim_end().ends_with("</feed>"));
    }

    #[test]
    fn test_photo_feed() {
        let feed = NewsFeed::from_profile(&fixture(
            r#"{
                "id": "1",
                "name": "Alice",
                "home": {"data": [{
                    "id": "1_100",
                    "from": {"id": "1", "name": "Alice"},
                    "type": "photo",
                    "picture": "https://fbcdn.example/p.jpg",
                    "created_time": "2012-05-01T12:00:00+0000"
                }]}
            }"#,
        ));
        assert_eq!(feed.updated(), "2012-05-01T12:00:00+00:00");

        let xml = feed
            .render_atom("https://feeds.example.com", "https://feeds.example.com/atom?access_token=T")
            .unwrap();
        assert_eq!(xml.matches("<entry>").count(), 1);
        assert!(xml.contains(">Alice added a new photo.</content>"));
        assert!(xml.contains("<updated>2012-05-01T12:00:00+00:00</updated>"));
        assert!(xml.contains("http://activitystrea.ms/schema/1.0/image"));
        assert!(xml.contains(
            r#"<link rel="self" type="application/atom+xml" href="https://feeds.example.com/atom?access_token=T" />"#
        ));
    }

    #[test]
    fn test_entries_keep_upstream_order_and_escape() {
        let feed = NewsFeed::from_profile(&fixture(
            r#"{
                "id": "1",
                "name": "Alice",
                "home": {"data": [
                    {"id": "2_1", "from": {"id": "2", "name": "Bob"}, "type": "status",
                     "message": "newer <b>bold</b> & loud", "created_time": "2012-05-02T00:00:00+0000"},
                    {"id": "3_1", "from": {"id": "3", "name": "Carol"}, "type": "status",
                     "message": "older", "created_time": "2012-05-01T00:00:00+0000"}
                ]}
            }"#,
        ));
        assert_eq!(feed.updated(), "2012-05-02T00:00:00+00:00");

        let xml = feed.render_atom("https://h", "https://h/atom").unwrap();
        let newer = xml.find("tag:facebook.com,2012:2_1").unwrap();
        let older = xml.find("tag:facebook.com,2012:3_1").unwrap();
        assert!(newer < older);
        assert!(xml.contains("newer &lt;b&gt;bold&lt;/b&gt; &amp; loud"));
    }

    #[test]
    fn test_entry_title() {
        assert_eq!(entry_title("", "Alice"), "Alice");
        assert_eq!(entry_title("short  post", "Alice"), "short post");
        assert_eq!(
            entry_title("one two three four five six seven eight nine ten eleven", "Alice"),
            "one two three four five six seven eight nine ten ..."
        );
    }
}
