//! Server-level facts: identity, network position and library contents

use serde::{Deserialize, Serialize};

/// Identity of the Emby server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub operating_system: Option<String>,
    pub id: Option<String>,
}

/// Where this monitor sits relative to the server's network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub is_local: bool,
    pub is_in_network: bool,
}

/// Per media type item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub movie_count: u64,
    pub series_count: u64,
    pub episode_count: u64,
    pub song_count: u64,
    pub album_count: u64,
    pub artist_count: u64,
}

/// Library statistics as published downstream
///
/// `recently_added_count` is counted from the bounded activity log, so it is
/// a lower bound when many items were added in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryCounts {
    pub movie_count: u64,
    pub series_count: u64,
    pub episode_count: u64,
    pub song_count: u64,
    pub album_count: u64,
    pub artist_count: u64,
    pub recently_added_count: u64,
    pub library_folder_count: u64,
}

impl LibraryCounts {
    /// Assemble counts from the individual query results
    pub fn new(items: ItemCounts, folder_count: u64, recently_added_count: u64) -> Self {
        Self {
            movie_count: items.movie_count,
            series_count: items.series_count,
            episode_count: items.episode_count,
            song_count: items.song_count,
            album_count: items.album_count,
            artist_count: items.artist_count,
            recently_added_count,
            library_folder_count: folder_count,
        }
    }

    /// Movies, series and episodes combined
    pub fn total_items(&self) -> u64 {
        self.movie_count
            .saturating_add(self.series_count)
            .saturating_add(self.episode_count)
    }
}

/// A configured library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFolder {
    pub id: Option<String>,
    pub name: String,
    pub collection_type: Option<String>,
}

/// A server user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}
