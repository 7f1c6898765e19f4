//! Contexte explicite passé à chaque opération du pipeline.
//!
//! La session possède le cache d'entités et le conteneur de playlists. Elle
//! applique le résultat d'un parseur d'étape en deux temps : extraction des
//! champs de toutes les entités pas encore chargées, puis mutation du cache.
//! Un noeud malformé fait échouer l'étape sans laisser d'état partiel.

use crate::cache::{CacheStats, CachedEntity, EntityCache};
use crate::checksum;
use crate::error::{Result, SpotifyError};
use crate::ids::{EntityId, PlaylistId, TrackId};
use crate::models::{Album, Artist, Track};
use crate::parser::{BrowsePlan, SearchPlan};
use crate::playlist::PlaylistContainer;
use crate::search::{SearchQuery, SearchResult};
use std::collections::HashSet;
use tracing::{debug, info};
use xmltree::Element;

#[derive(Default)]
pub struct Session {
    pub cache: EntityCache,
    pub container: PlaylistContainer,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the playlists discovered by a container load and returns
    /// their positions.
    pub fn add_playlists(&mut self, ids: &[PlaylistId]) -> Vec<usize> {
        self.container.append(ids)
    }

    /// Replaces the track list of the playlist at `position`.
    ///
    /// New references are taken before the previous list is released, so
    /// tracks present in both lists are never freed in between.
    pub fn set_playlist_tracks(&mut self, position: usize, tracks: Vec<TrackId>) -> Result<()> {
        if self.container.get(position).is_none() {
            return Err(SpotifyError::UnknownPlaylist(position));
        }

        for id in &tracks {
            self.cache.add_ref::<Track>(*id);
        }

        let previous = match self.container.get_mut(position) {
            Some(playlist) => playlist.replace_tracks(tracks),
            None => return Err(SpotifyError::UnknownPlaylist(position)),
        };
        for id in previous {
            self.cache.release::<Track>(id);
        }

        self.container.notify_loaded(position);
        Ok(())
    }

    /// Takes the temporary references of a browse batch.
    pub fn retain_batch(&mut self, tracks: &[TrackId]) {
        for id in tracks {
            self.cache.add_ref::<Track>(*id);
        }
    }

    /// Releases exactly the references taken by [`Session::retain_batch`].
    pub fn release_batch(&mut self, tracks: &[TrackId]) {
        for id in tracks {
            self.cache.release::<Track>(*id);
        }
    }

    /// Extracts the fields of every node whose entity is not loaded yet.
    ///
    /// Fails on the first malformed node, before the cache is modified. A
    /// repeated id is only read once.
    fn extract_pending<E: CachedEntity>(
        &self,
        nodes: Vec<(EntityId, Element)>,
    ) -> Result<Vec<(EntityId, Option<E::Data>)>> {
        let mut seen = HashSet::with_capacity(nodes.len());
        nodes
            .into_iter()
            .map(|(id, node)| {
                if !seen.insert(id) {
                    return Ok((id, None));
                }
                Ok((id, self.cache.extract_unloaded::<E>(&id, &node)?))
            })
            .collect()
    }

    fn apply_pending<E: CachedEntity>(&mut self, id: EntityId, data: Option<E::Data>) -> bool {
        match data {
            Some(data) => self.cache.hydrate::<E>(id, data),
            None => false,
        }
    }

    /// Hydrates the tracks of a browse response that belong to `batch`.
    ///
    /// Returns how many were hydrated by this call; already loaded tracks are
    /// left untouched and tracks outside the batch are ignored.
    pub fn hydrate_tracks(&mut self, plan: BrowsePlan, batch: &[TrackId]) -> Result<usize> {
        let requested: HashSet<&TrackId> = batch.iter().collect();
        let nodes = plan
            .tracks
            .into_iter()
            .filter(|(id, _)| {
                let wanted = requested.contains(id);
                if !wanted {
                    debug!(track = %id, "Track outside the browse batch, ignoring");
                }
                wanted
            })
            .collect();

        let mut hydrated = 0;
        for (id, data) in self.extract_pending::<Track>(nodes)? {
            if self.apply_pending::<Track>(id, data) {
                hydrated += 1;
            }
        }
        Ok(hydrated)
    }

    /// Builds the result of a search, one holding reference per listed entity.
    ///
    /// Nothing is retained or hydrated if a node of the plan is malformed.
    pub fn commit_search(&mut self, query: &SearchQuery, plan: SearchPlan) -> Result<SearchResult> {
        let artists = self.extract_pending::<Artist>(plan.artists)?;
        let albums = self.extract_pending::<Album>(plan.albums)?;
        let tracks = self.extract_pending::<Track>(plan.tracks)?;

        let mut result = SearchResult::empty(query.clone());
        result.did_you_mean = plan.did_you_mean;
        result.total_artists = plan.total_artists;
        result.total_albums = plan.total_albums;
        result.total_tracks = plan.total_tracks;

        for (id, data) in artists {
            self.cache.add_ref::<Artist>(id);
            self.apply_pending::<Artist>(id, data);
            result.artists.push(id);
        }
        for (id, data) in albums {
            self.cache.add_ref::<Album>(id);
            self.apply_pending::<Album>(id, data);
            result.albums.push(id);
        }
        for (id, data) in tracks {
            self.cache.add_ref::<Track>(id);
            self.apply_pending::<Track>(id, data);
            result.tracks.push(id);
        }

        debug!(
            query = %result.query.query,
            artists = result.artists.len(),
            albums = result.albums.len(),
            tracks = result.tracks.len(),
            "Search result committed"
        );
        Ok(result)
    }

    /// Drops the references held by a search result.
    pub fn release_search(&mut self, result: SearchResult) {
        for id in result.tracks {
            self.cache.release::<Track>(id);
        }
        for id in result.albums {
            self.cache.release::<Album>(id);
        }
        for id in result.artists {
            self.cache.release::<Artist>(id);
        }
    }

    pub fn checksum_playlist(&self, position: usize) -> Option<u32> {
        self.container.get(position).map(checksum::checksum_playlist)
    }

    pub fn checksum_container(&self) -> u32 {
        checksum::checksum_container(&self.container)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Releases the references held by every playlist and empties the
    /// container. No channel may still be running.
    pub fn teardown(&mut self) {
        let playlists = self.container.drain();
        let count = playlists.len();
        for mut playlist in playlists {
            for id in playlist.take_tracks() {
                self.cache.release::<Track>(id);
            }
        }
        let purged = self.cache.purge_unreferenced();
        info!(
            playlists = count,
            purged,
            remaining = self.cache.stats().total_count(),
            "Session torn down"
        );
    }
}
