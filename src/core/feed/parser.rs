use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::types::{ContentCard, ContentKind};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const YOUTUBE_NS: &str = "http://www.youtube.com/xml/schemas/2015";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const DESCRIPTION_PREVIEW_CHARS: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("xml feed parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("unexpected feed root element: {0}")]
    UnexpectedRoot(String),
    #[error("json feed parse error: {0}")]
    Json(#[from] serde_json::Error),
}

struct BlogPatterns {
    item: Regex,
    title: FieldPattern,
    link: FieldPattern,
    pub_date: FieldPattern,
    description: FieldPattern,
    tag: Regex,
}

/// CDATA form first, plain element form as the fallback.
struct FieldPattern {
    cdata: Regex,
    plain: Regex,
}

impl FieldPattern {
    fn new(tag: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            cdata: Regex::new(&format!(
                r"(?s)<{tag}>\s*<!\[CDATA\[(.*?)\]\]>\s*</{tag}>"
            ))?,
            plain: Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>"))?,
        })
    }

    fn extract<'a>(&self, block: &'a str) -> Option<&'a str> {
        self.cdata
            .captures(block)
            .or_else(|| self.plain.captures(block))
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
    }
}

impl BlogPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            item: Regex::new(r"(?s)<item(?:\s[^>]*)?>(.*?)</item>")?,
            title: FieldPattern::new("title")?,
            link: FieldPattern::new("link")?,
            pub_date: FieldPattern::new("pubDate")?,
            description: FieldPattern::new("description")?,
            tag: Regex::new(r"<[^>]*>")?,
        })
    }
}

fn blog_patterns() -> &'static BlogPatterns {
    static PATTERNS: OnceLock<BlogPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| BlogPatterns::compile().expect("blog patterns are valid regexes"))
}

/// Scrapes up to `limit` `<item>` blocks out of an RSS document treated as
/// plain text.
///
/// This tolerates malformed XML on purpose: blocks are matched by pattern,
/// not by a parser. Blocks without both a title and a link are skipped and
/// still count against `limit`.
pub fn scrape_blog_items(xml: &str, base_url: &str, limit: usize) -> Vec<ContentCard> {
    let patterns = blog_patterns();
    let mut cards = Vec::new();

    for captures in patterns.item.captures_iter(xml).take(limit) {
        let Some(block) = captures.get(1).map(|value| value.as_str()) else {
            continue;
        };
        let (Some(title), Some(raw_link)) =
            (patterns.title.extract(block), patterns.link.extract(block))
        else {
            continue;
        };
        let raw_link = raw_link.trim();
        if title.trim().is_empty() || raw_link.is_empty() {
            continue;
        }
        let link = resolve_link(raw_link, base_url);

        let published_at = patterns
            .pub_date
            .extract(block)
            .unwrap_or_default()
            .to_string();
        let description = patterns
            .description
            .extract(block)
            .map(|raw| preview_description(&patterns.tag, raw))
            .unwrap_or_default();

        cards.push(ContentCard {
            id: link.clone(),
            kind: ContentKind::Blog,
            title: title.to_string(),
            link,
            published_at,
            thumbnail: None,
            description: Some(description),
        });
    }

    cards
}

/// Absolute links pass through; anything else is joined onto `base_url`.
pub fn resolve_link(link: &str, base_url: &str) -> String {
    if link.starts_with("http") {
        return link.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if link.starts_with('/') {
        format!("{base}{link}")
    } else {
        format!("{base}/{link}")
    }
}

fn preview_description(tag: &Regex, raw: &str) -> String {
    let text = tag.replace_all(raw, "");
    let text = text.replace("&nbsp;", " ");
    let preview: String = text.trim().chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{preview}...")
}

/// Maps a YouTube channel Atom feed into cards of kind `youtube`.
///
/// Every `<entry>` lands in the returned `Vec`, so a single-entry feed is a
/// one-element list like any other.
pub fn parse_youtube_atom(raw: &str) -> Result<Vec<ContentCard>, FeedParseError> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }

    let doc = roxmltree::Document::parse(trimmed)?;
    let root = doc.root_element();
    if !root.has_tag_name((ATOM_NS, "feed")) {
        return Err(FeedParseError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let cards = root
        .children()
        .filter(|node| node.has_tag_name((ATOM_NS, "entry")))
        .filter_map(card_from_atom_entry)
        .collect();
    Ok(cards)
}

fn card_from_atom_entry(entry: roxmltree::Node<'_, '_>) -> Option<ContentCard> {
    let video_id = child_text(entry, YOUTUBE_NS, "videoId")?;
    let title = child_text(entry, ATOM_NS, "title")?;
    let published_at = child_text(entry, ATOM_NS, "published")
        .or_else(|| child_text(entry, ATOM_NS, "updated"))
        .unwrap_or_default();

    let media_group = entry
        .children()
        .find(|node| node.has_tag_name((MEDIA_NS, "group")));
    let thumbnail = media_group
        .and_then(|group| {
            group
                .children()
                .find(|node| node.has_tag_name((MEDIA_NS, "thumbnail")))
        })
        .and_then(|node| node.attribute("url"))
        .map(ToString::to_string);
    let description = media_group
        .and_then(|group| child_text(group, MEDIA_NS, "description"))
        .map(ToString::to_string);

    Some(ContentCard {
        id: video_id.to_string(),
        kind: ContentKind::Youtube,
        title: title.to_string(),
        link: format!("{WATCH_URL}{video_id}"),
        published_at: published_at.to_string(),
        thumbnail,
        description,
    })
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, namespace: &str, name: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name((namespace, name)))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistItem {
    snippet: Option<PlaylistSnippet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    resource_id: Option<ResourceId>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best_url(self) -> Option<String> {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|thumbnail| thumbnail.url)
    }
}

/// Maps a Data API `playlistItems.list` response into cards of kind
/// `sermon`.
pub fn parse_playlist_items(raw: &[u8]) -> Result<Vec<ContentCard>, FeedParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(FeedParseError::EmptyPayload);
    }

    let response: PlaylistResponse = serde_json::from_slice(raw)?;
    let cards = response
        .items
        .into_iter()
        .filter_map(|item| item.snippet)
        .filter_map(|snippet| {
            let video_id = snippet
                .resource_id
                .and_then(|resource| resource.video_id)
                .filter(|value| !value.trim().is_empty())?;
            let title = snippet.title.filter(|value| !value.trim().is_empty())?;
            Some(ContentCard {
                link: format!("{WATCH_URL}{video_id}"),
                id: video_id,
                kind: ContentKind::Sermon,
                title,
                published_at: snippet.published_at.unwrap_or_default(),
                thumbnail: snippet.thumbnails.best_url(),
                description: snippet.description.filter(|value| !value.is_empty()),
            })
        })
        .collect();
    Ok(cards)
}
