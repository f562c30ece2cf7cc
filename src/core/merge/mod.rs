use super::feed::types::{ContentCard, ContentKind};
use super::feed::{FeedError, FeedService};
use super::storage::{ContentRepository, StorageError};

pub const DEFAULT_LISTING_LIMIT: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Feed-derived cards first, stored cards after. Nothing is de-duplicated,
/// so a video that was also entered by hand shows up twice.
pub fn merge_cards(feed_cards: Vec<ContentCard>, stored_cards: Vec<ContentCard>) -> Vec<ContentCard> {
    let mut merged = feed_cards;
    merged.extend(stored_cards);
    merged
}

#[derive(Debug, Clone)]
pub struct ListingService {
    feed: FeedService,
    repository: ContentRepository,
}

impl ListingService {
    pub fn new(feed: FeedService, repository: ContentRepository) -> Self {
        Self { feed, repository }
    }

    pub fn name(&self) -> &'static str {
        "listing"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }

    /// Loads the video feed (playlist when given, channel feed otherwise) and
    /// the stored cards of `kind`. Either side failing fails the listing.
    pub async fn load(
        &self,
        kind: ContentKind,
        playlist_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ContentCard>, ListingError> {
        let feed_cards = match playlist_id {
            Some(id) => self.feed.fetch_playlist_videos(id).await?,
            None => self.feed.fetch_channel_videos().await?,
        };
        let stored_cards = self
            .repository
            .list_contents(Some(kind), limit)
            .await?
            .into_iter()
            .map(|record| record.into_card())
            .collect();
        Ok(merge_cards(feed_cards, stored_cards))
    }
}
