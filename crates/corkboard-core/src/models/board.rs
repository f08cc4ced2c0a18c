//! Board model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::image::CanvasImageRef;

/// A unique identifier for a board, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardId(Uuid);

impl BoardId {
    /// Create a new unique board ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for BoardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BoardId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1350,
        }
    }
}

/// A board in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Unique identifier, shared with the remote copy
    pub id: BoardId,
    pub title: String,
    pub caption: String,
    /// Category tags, lowercase and deduplicated
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// CSS-style color, e.g. `#f4efe6`
    pub background_color: String,
    pub canvas: CanvasSize,
    pub has_margin: bool,
    pub is_pinned: bool,
    /// Image placements in paint order
    #[serde(default)]
    pub images: Vec<CanvasImageRef>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local mutation timestamp (Unix ms)
    pub updated_at: i64,
    /// Server-maintained version fence
    #[serde(default)]
    pub sync_version: i64,
}

impl Board {
    /// Create a new empty board with the given title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: BoardId::new(),
            title: title.into(),
            caption: String::new(),
            tags: BTreeSet::new(),
            background_color: "#ffffff".to_string(),
            canvas: CanvasSize::default(),
            has_margin: false,
            is_pinned: false,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    /// Record a local mutation.
    ///
    /// `updated_at` always moves strictly forward, even when the wall clock
    /// has not advanced since the previous mutation.
    pub fn touch(&mut self) {
        let now = chrono::Utc::now().timestamp_millis();
        self.updated_at = now.max(self.updated_at.saturating_add(1));
    }

    /// Add a tag (normalized to lowercase) and record the mutation
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && self.tags.insert(tag) {
            self.touch();
        }
    }

    /// Place an image on the canvas and record the mutation
    pub fn add_image(&mut self, image: CanvasImageRef) {
        self.images.push(image);
        self.touch();
    }

    /// Whether this board changed locally after the given watermark.
    ///
    /// A `None` watermark means nothing has been synced yet.
    #[must_use]
    pub fn is_modified_since(&self, since: Option<i64>) -> bool {
        since.map_or(true, |watermark| self.updated_at > watermark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_id_unique() {
        let id1 = BoardId::new();
        let id2 = BoardId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_board_id_parse() {
        let id = BoardId::new();
        let parsed: BoardId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_board_new() {
        let board = Board::new("Moodboard");
        assert_eq!(board.title, "Moodboard");
        assert!(board.images.is_empty());
        assert_eq!(board.sync_version, 0);
        assert_eq!(board.created_at, board.updated_at);
    }

    #[test]
    fn test_touch_is_strictly_monotonic() {
        let mut board = Board::new("Clock");
        board.updated_at = i64::MAX - 10;
        let before = board.updated_at;
        board.touch();
        assert_eq!(board.updated_at, before + 1);
    }

    #[test]
    fn test_add_tag_normalizes_and_dedups() {
        let mut board = Board::new("Tags");
        board.add_tag("Travel");
        board.add_tag(" travel ");
        board.add_tag("   ");
        assert_eq!(board.tags.len(), 1);
        assert!(board.tags.contains("travel"));
    }

    #[test]
    fn test_is_modified_since() {
        let mut board = Board::new("Watermark");
        board.updated_at = 1_000;
        assert!(board.is_modified_since(None));
        assert!(board.is_modified_since(Some(999)));
        assert!(!board.is_modified_since(Some(1_000)));
        assert!(!board.is_modified_since(Some(1_005)));
    }
}
