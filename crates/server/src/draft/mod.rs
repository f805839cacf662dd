//! The list a visitor is editing before it is published.

pub mod store;

pub use store::DraftStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{AlbumRecord, ProfileRecord};

/// A list holds at most this many albums.
pub const MAX_ALBUMS: usize = 10;

/// One editable row. The id only keeps rows apart while editing; it is
/// never published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAlbum {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub why: String,
}

impl DraftAlbum {
    pub fn blank() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            artist: String::new(),
            why: String::new(),
        }
    }
}

/// Fields to overwrite on a row; `None` leaves the field alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlbumPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub why: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Display name; the public username is derived from it on publish
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub albums: Vec<DraftAlbum>,
}

impl Draft {
    pub fn is_full(&self) -> bool {
        self.albums.len() >= MAX_ALBUMS
    }

    /// Append an empty row. Returns `false` (and changes nothing) when the
    /// list is already full.
    pub fn add_blank(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.albums.push(DraftAlbum::blank());
        true
    }

    pub fn update_album(&mut self, index: usize, patch: AlbumPatch) -> bool {
        let Some(album) = self.albums.get_mut(index) else {
            return false;
        };
        if let Some(title) = patch.title {
            album.title = title;
        }
        if let Some(artist) = patch.artist {
            album.artist = artist;
        }
        if let Some(why) = patch.why {
            album.why = why;
        }
        true
    }

    /// Swap a row with its neighbour. Moving past either end is a no-op.
    pub fn move_album(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < self.albums.len() && target < self.albums.len() => {
                self.albums.swap(index, target);
                true
            }
            _ => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> bool {
        if index < self.albums.len() {
            self.albums.remove(index);
            true
        } else {
            false
        }
    }

    /// Empty the list but keep the name.
    pub fn clear(&mut self) {
        self.albums.clear();
    }

    /// Rows to publish: ranks run 1..N in the current order.
    pub fn ranked_rows(&self, user_id: &str) -> Vec<AlbumRecord> {
        self.albums
            .iter()
            .zip(1..)
            .map(|(album, rank)| AlbumRecord {
                user_id: user_id.to_string(),
                rank,
                title: album.title.clone(),
                artist: album.artist.clone(),
                why: album.why.clone(),
            })
            .collect()
    }

    /// Pull in what the signed-in user already published. A stored display
    /// name wins over the local one; stored albums, if any, replace the rows.
    pub fn replace_from_remote(&mut self, profile: Option<&ProfileRecord>, albums: &[AlbumRecord]) {
        if let Some(profile) = profile {
            if !profile.display_name.is_empty() {
                self.name = profile.display_name.clone();
            }
        }

        if !albums.is_empty() {
            self.albums = albums
                .iter()
                .take(MAX_ALBUMS)
                .map(|row| DraftAlbum {
                    id: Uuid::new_v4().to_string(),
                    title: row.title.clone(),
                    artist: row.artist.clone(),
                    why: row.why.clone(),
                })
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_with(titles: &[&str]) -> Draft {
        let mut draft = Draft::default();
        for title in titles {
            draft.add_blank();
            let last = draft.albums.len() - 1;
            draft.update_album(
                last,
                AlbumPatch {
                    title: Some(title.to_string()),
                    ..AlbumPatch::default()
                },
            );
        }
        draft
    }

    fn titles(draft: &Draft) -> Vec<&str> {
        draft.albums.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_add_stops_at_ten() {
        let mut draft = Draft::default();
        for _ in 0..MAX_ALBUMS {
            assert!(draft.add_blank());
        }
        let before = draft.clone();

        assert!(!draft.add_blank());
        assert_eq!(draft, before);
        assert_eq!(draft.albums.len(), MAX_ALBUMS);
    }

    #[test]
    fn test_blank_rows_get_distinct_ids() {
        let mut draft = Draft::default();
        draft.add_blank();
        draft.add_blank();
        assert_ne!(draft.albums[0].id, draft.albums[1].id);
    }

    #[test]
    fn test_update_patches_only_given_fields() {
        let mut draft = draft_with(&["Blue"]);
        draft.update_album(
            0,
            AlbumPatch {
                artist: Some("Joni Mitchell".to_string()),
                ..AlbumPatch::default()
            },
        );
        assert_eq!(draft.albums[0].title, "Blue");
        assert_eq!(draft.albums[0].artist, "Joni Mitchell");

        assert!(!draft.update_album(5, AlbumPatch::default()));
    }

    #[test]
    fn test_move_swaps_neighbours() {
        let mut draft = draft_with(&["a", "b", "c"]);

        assert!(draft.move_album(1, Direction::Up));
        assert_eq!(titles(&draft), ["b", "a", "c"]);

        assert!(draft.move_album(1, Direction::Down));
        assert_eq!(titles(&draft), ["b", "c", "a"]);
    }

    #[test]
    fn test_move_past_ends_is_noop() {
        let mut draft = draft_with(&["a", "b", "c"]);

        assert!(!draft.move_album(0, Direction::Up));
        assert!(!draft.move_album(2, Direction::Down));
        assert!(!draft.move_album(7, Direction::Up));
        assert_eq!(titles(&draft), ["a", "b", "c"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut draft = draft_with(&["a", "b", "c"]);
        draft.name = "Jane".to_string();

        assert!(draft.remove_at(1));
        assert_eq!(titles(&draft), ["a", "c"]);
        assert!(!draft.remove_at(2));

        draft.clear();
        assert!(draft.albums.is_empty());
        assert_eq!(draft.name, "Jane");
    }

    #[test]
    fn test_ranked_rows_follow_current_order() {
        let mut draft = draft_with(&["a", "b", "c"]);
        draft.move_album(2, Direction::Up);

        let rows = draft.ranked_rows("user-1");
        let ranked: Vec<_> = rows.iter().map(|r| (r.rank, r.title.as_str())).collect();
        assert_eq!(ranked, [(1, "a"), (2, "c"), (3, "b")]);
        assert!(rows.iter().all(|r| r.user_id == "user-1"));
    }

    #[test]
    fn test_replace_from_remote() {
        let mut draft = draft_with(&["local"]);
        draft.name = "Local Name".to_string();

        // nothing stored remotely: keep the local draft
        draft.replace_from_remote(None, &[]);
        assert_eq!(titles(&draft), ["local"]);
        assert_eq!(draft.name, "Local Name");

        let profile = ProfileRecord {
            id: "u1".to_string(),
            username: "jane".to_string(),
            display_name: "Jane".to_string(),
        };
        let stored = vec![AlbumRecord {
            user_id: "u1".to_string(),
            rank: 1,
            title: "Remote".to_string(),
            artist: "Band".to_string(),
            why: "because".to_string(),
        }];
        draft.replace_from_remote(Some(&profile), &stored);
        assert_eq!(draft.name, "Jane");
        assert_eq!(titles(&draft), ["Remote"]);
        assert_eq!(draft.albums[0].why, "because");
    }
}
