use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::feed::types::{ContentCard, ContentKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContent {
    pub kind: ContentKind,
    pub title: String,
    pub link_url: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub published_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentRecord {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub link_url: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub published_at: String,
    pub created_at: String,
}

impl ContentRecord {
    /// Rows are only written through `NewContent`, so an unreadable kind
    /// means the row was edited by hand; it falls back to `notice`.
    pub fn into_card(self) -> ContentCard {
        ContentCard {
            id: self.id.to_string(),
            kind: self.kind.parse().unwrap_or(ContentKind::Notice),
            title: self.title,
            link: self.link_url,
            published_at: self.published_at,
            thumbnail: self.thumbnail,
            description: self.description,
        }
    }
}
