use chrono::{DateTime, Utc};
use pastebin_lite_common::PasteView;

use crate::short_code::PasteId;

/// A stored paste, as persisted by a [`crate::store::PasteStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paste {
    pub id: PasteId,
    pub content: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_views: Option<i64>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Paste {
    /// A fresh paste with no views taken.
    pub fn new(
        id: PasteId,
        content: String,
        expires_at: Option<DateTime<Utc>>,
        max_views: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content,
            expires_at,
            max_views,
            view_count: 0,
            created_at,
        }
    }

    /// Whether the paste may still be viewed at `now`. Both bounds are
    /// strict: a paste expiring exactly at `now` is dead.
    ///
    /// The store evaluates the same predicate inside its conditional update;
    /// this copy exists for inspection of raw rows.
    pub fn is_alive(&self, now: DateTime<Utc>) -> bool {
        let within_time = self.expires_at.map_or(true, |expires| expires > now);
        let within_views = self.max_views.map_or(true, |max| self.view_count < max);
        within_time && within_views
    }

    /// Views left after the ones already counted, or `None` when unlimited.
    pub fn remaining_views(&self) -> Option<i64> {
        self.max_views.map(|max| max - self.view_count)
    }
}

impl From<Paste> for PasteView {
    fn from(paste: Paste) -> Self {
        Self {
            remaining_views: paste.remaining_views(),
            expires_at: paste.expires_at,
            content: paste.content,
        }
    }
}
