//! Requêtes et résultats de recherche

use crate::ids::{AlbumId, ArtistId, TrackId};
use serde::{Deserialize, Serialize};

const DEFAULT_COUNT: u32 = 50;

/// Paramètres d'une recherche
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub track_offset: u32,
    pub track_count: u32,
    pub album_offset: u32,
    pub album_count: u32,
    pub artist_offset: u32,
    pub artist_count: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            track_offset: 0,
            track_count: DEFAULT_COUNT,
            album_offset: 0,
            album_count: DEFAULT_COUNT,
            artist_offset: 0,
            artist_count: DEFAULT_COUNT,
        }
    }

    pub fn with_tracks(mut self, offset: u32, count: u32) -> Self {
        self.track_offset = offset;
        self.track_count = count;
        self
    }

    pub fn with_albums(mut self, offset: u32, count: u32) -> Self {
        self.album_offset = offset;
        self.album_count = count;
        self
    }

    pub fn with_artists(mut self, offset: u32, count: u32) -> Self {
        self.artist_offset = offset;
        self.artist_count = count;
        self
    }
}

/// Résultat d'une recherche
///
/// Chaque identifiant des trois listes tient une référence sur l'entité du
/// cache ; le résultat doit être rendu via
/// [`crate::session::Session::release_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub artists: Vec<ArtistId>,
    pub albums: Vec<AlbumId>,
    pub tracks: Vec<TrackId>,
    /// Suggestion du service, chaîne vide si absente
    pub did_you_mean: String,
    pub total_artists: u32,
    pub total_albums: u32,
    pub total_tracks: u32,
}

impl SearchResult {
    /// Résultat vide, sans aucune référence tenue
    pub fn empty(query: SearchQuery) -> Self {
        Self {
            query,
            artists: Vec::new(),
            albums: Vec::new(),
            tracks: Vec::new(),
            did_you_mean: String::new(),
            total_artists: 0,
            total_albums: 0,
            total_tracks: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.albums.is_empty() && self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let q = SearchQuery::new("kind of blue")
            .with_tracks(10, 20)
            .with_artists(0, 5);
        assert_eq!(q.track_offset, 10);
        assert_eq!(q.track_count, 20);
        assert_eq!(q.album_count, DEFAULT_COUNT);
        assert_eq!(q.artist_count, 5);
    }

    #[test]
    fn test_empty_result() {
        let r = SearchResult::empty(SearchQuery::new("x"));
        assert!(r.is_empty());
        assert_eq!(r.did_you_mean, "");
    }
}
