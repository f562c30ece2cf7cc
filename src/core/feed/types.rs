use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Sermon,
    Notice,
    Bulletin,
    Meditation,
    Newcomer,
    Youtube,
    Blog,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Sermon => "sermon",
            ContentKind::Notice => "notice",
            ContentKind::Bulletin => "bulletin",
            ContentKind::Meditation => "meditation",
            ContentKind::Newcomer => "newcomer",
            ContentKind::Youtube => "youtube",
            ContentKind::Blog => "blog",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type: {0}")]
pub struct UnknownContentKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sermon" => Ok(ContentKind::Sermon),
            "notice" => Ok(ContentKind::Notice),
            "bulletin" => Ok(ContentKind::Bulletin),
            "meditation" => Ok(ContentKind::Meditation),
            "newcomer" => Ok(ContentKind::Newcomer),
            "youtube" => Ok(ContentKind::Youtube),
            "blog" => Ok(ContentKind::Blog),
            other => Err(UnknownContentKind(other.to_string())),
        }
    }
}

/// One displayable item, whatever feed or collection it came from.
///
/// Cards are built fresh on every fetch. `id` and `title` are never empty;
/// the parsers drop entries that cannot satisfy that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentCard {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub link: String,
    pub published_at: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}
