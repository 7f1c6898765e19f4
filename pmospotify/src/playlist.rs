//! Playlists et conteneur de playlists de la session.
//!
//! Le conteneur garde les playlists dans l'ordre de découverte ; la position
//! d'une playlist est son index dans ce vecteur et sert de poignée stable
//! aux requêtes de chargement (aucune suppression n'existe côté pipeline).

use crate::ids::{PlaylistId, TrackId};
use serde::Serialize;
use std::time::Instant;

/// État de chargement d'une playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaylistState {
    /// Id découvert dans le conteneur, contenu pas encore reçu
    Added,
    /// Liste des tracks reçue
    Listed,
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: PlaylistId,
    /// Not populated by the retrieval pipeline
    pub name: Option<String>,
    tracks: Vec<TrackId>,
    pub state: PlaylistState,
    /// Advisory ordering hint, equal to the index in the container
    pub position: usize,
    pub last_request: Option<Instant>,
}

impl Playlist {
    pub fn new(id: PlaylistId, position: usize) -> Self {
        Self {
            id,
            name: None,
            tracks: Vec::new(),
            state: PlaylistState::Added,
            position,
            last_request: None,
        }
    }

    /// Track handles in playlist order; each one holds a cache reference.
    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.state == PlaylistState::Listed
    }

    /// Swaps in a freshly parsed track list and returns the previous one,
    /// whose references the caller must release.
    pub(crate) fn replace_tracks(&mut self, tracks: Vec<TrackId>) -> Vec<TrackId> {
        self.state = PlaylistState::Listed;
        std::mem::replace(&mut self.tracks, tracks)
    }

    pub(crate) fn take_tracks(&mut self) -> Vec<TrackId> {
        std::mem::take(&mut self.tracks)
    }
}

/// Observer notified when the container changes.
pub trait ContainerObserver: Send {
    fn playlist_added(&mut self, _playlist: &Playlist) {}

    fn playlist_loaded(&mut self, _playlist: &Playlist) {}
}

#[derive(Default)]
pub struct PlaylistContainer {
    playlists: Vec<Playlist>,
    observer: Option<Box<dyn ContainerObserver>>,
}

impl PlaylistContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: Box<dyn ContainerObserver>) {
        self.observer = Some(observer);
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Playlist> {
        self.playlists.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Playlist> {
        self.playlists.get_mut(position)
    }

    /// First playlist carrying `id`
    pub fn find(&self, id: &PlaylistId) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == *id)
    }

    /// Appends one playlist per id, in order, and returns their positions.
    ///
    /// Ids already present are appended again: the container mirrors the
    /// sequence of `add` operations it receives.
    pub fn append(&mut self, ids: &[PlaylistId]) -> Vec<usize> {
        let mut positions = Vec::with_capacity(ids.len());
        for id in ids {
            let position = self.playlists.len();
            self.playlists.push(Playlist::new(*id, position));
            if let Some(observer) = self.observer.as_mut() {
                observer.playlist_added(&self.playlists[position]);
            }
            positions.push(position);
        }
        positions
    }

    pub(crate) fn notify_loaded(&mut self, position: usize) {
        if let (Some(observer), Some(playlist)) =
            (self.observer.as_mut(), self.playlists.get(position))
        {
            observer.playlist_loaded(playlist);
        }
    }

    pub(crate) fn drain(&mut self) -> Vec<Playlist> {
        std::mem::take(&mut self.playlists)
    }
}
