//! Cache d'entités dédupliqué à comptage de références.
//!
//! Le cache est l'unique propriétaire des tracks, artistes et albums ; tous
//! les autres détenteurs (playlists, résultats de recherche, lots de browse
//! en vol, liens album→artiste ou track→album) ne gardent qu'un identifiant
//! et comptent pour une référence.
//!
//! Une entité est libérée quand son compteur retombe à zéro, et libère à son
//! tour les entités qu'elle référence. Libérer une entité dont le compteur
//! est déjà nul est un bug de comptage : le cache le journalise puis panique.

use crate::error::Result;
use crate::ids::EntityId;
use crate::models::{Album, Artist, EntityLink, Hydrate, Track};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, trace};
use xmltree::Element;

/// Kind of cached entity, used in logs and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Track,
    Artist,
    Album,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Track => "track",
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
        })
    }
}

struct Slot<E> {
    entity: E,
    ref_count: u32,
    loaded: bool,
}

/// Storage for one entity kind, keyed by id
pub struct EntityArena<E> {
    slots: HashMap<EntityId, Slot<E>>,
}

impl<E> EntityArena<E> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Entities stored in the [`EntityCache`].
pub trait CachedEntity: Hydrate + Sized {
    const KIND: EntityKind;

    fn create(id: EntityId) -> Self;

    fn arena(cache: &EntityCache) -> &EntityArena<Self>;

    fn arena_mut(cache: &mut EntityCache) -> &mut EntityArena<Self>;
}

impl CachedEntity for Track {
    const KIND: EntityKind = EntityKind::Track;

    fn create(id: EntityId) -> Self {
        Track::new(id)
    }

    fn arena(cache: &EntityCache) -> &EntityArena<Self> {
        &cache.tracks
    }

    fn arena_mut(cache: &mut EntityCache) -> &mut EntityArena<Self> {
        &mut cache.tracks
    }
}

impl CachedEntity for Artist {
    const KIND: EntityKind = EntityKind::Artist;

    fn create(id: EntityId) -> Self {
        Artist::new(id)
    }

    fn arena(cache: &EntityCache) -> &EntityArena<Self> {
        &cache.artists
    }

    fn arena_mut(cache: &mut EntityCache) -> &mut EntityArena<Self> {
        &mut cache.artists
    }
}

impl CachedEntity for Album {
    const KIND: EntityKind = EntityKind::Album;

    fn create(id: EntityId) -> Self {
        Album::new(id)
    }

    fn arena(cache: &EntityCache) -> &EntityArena<Self> {
        &cache.albums
    }

    fn arena_mut(cache: &mut EntityCache) -> &mut EntityArena<Self> {
        &mut cache.albums
    }
}

/// Statistiques du cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub tracks_count: usize,
    pub artists_count: usize,
    pub albums_count: usize,
}

impl CacheStats {
    /// Retourne le nombre total d'entrées en cache
    pub fn total_count(&self) -> usize {
        self.tracks_count + self.artists_count + self.albums_count
    }
}

/// Deduplicated, reference-counted entity store.
pub struct EntityCache {
    tracks: EntityArena<Track>,
    artists: EntityArena<Artist>,
    albums: EntityArena<Album>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            tracks: EntityArena::new(),
            artists: EntityArena::new(),
            albums: EntityArena::new(),
        }
    }

    /// Returns the live entity for `id`, creating an unhydrated one if absent.
    ///
    /// The boolean is `true` when the entity was created by this call. A new
    /// entity starts with no holding reference.
    pub fn get_or_create<E: CachedEntity>(&mut self, id: EntityId) -> (&mut E, bool) {
        let arena = E::arena_mut(self);
        let created = !arena.slots.contains_key(&id);
        let slot = arena.slots.entry(id).or_insert_with(|| {
            trace!(kind = %E::KIND, %id, "Creating cache entry");
            Slot {
                entity: E::create(id),
                ref_count: 0,
                loaded: false,
            }
        });
        (&mut slot.entity, created)
    }

    pub fn get<E: CachedEntity>(&self, id: &EntityId) -> Option<&E> {
        E::arena(self).slots.get(id).map(|slot| &slot.entity)
    }

    pub fn contains<E: CachedEntity>(&self, id: &EntityId) -> bool {
        E::arena(self).slots.contains_key(id)
    }

    /// `false` for unknown ids
    pub fn is_loaded<E: CachedEntity>(&self, id: &EntityId) -> bool {
        E::arena(self)
            .slots
            .get(id)
            .is_some_and(|slot| slot.loaded)
    }

    /// Current number of holding references, 0 for unknown ids
    pub fn ref_count<E: CachedEntity>(&self, id: &EntityId) -> u32 {
        E::arena(self)
            .slots
            .get(id)
            .map_or(0, |slot| slot.ref_count)
    }

    /// Takes one holding reference, creating the entry if needed.
    pub fn add_ref<E: CachedEntity>(&mut self, id: EntityId) {
        self.get_or_create::<E>(id);
        if let Some(slot) = E::arena_mut(self).slots.get_mut(&id) {
            slot.ref_count += 1;
        }
    }

    /// Drops one holding reference; the entity is freed at zero and releases
    /// the entities it links to.
    ///
    /// # Panics
    ///
    /// Panics when `id` is unknown or its count is already zero.
    pub fn release<E: CachedEntity>(&mut self, id: EntityId) {
        let arena = E::arena_mut(self);
        let Some(slot) = arena.slots.get_mut(&id) else {
            error!(kind = %E::KIND, %id, "Release of an entity that is not cached");
            panic!("release of unknown {} {}", E::KIND, id);
        };

        if slot.ref_count == 0 {
            error!(kind = %E::KIND, %id, "Release below zero references");
            panic!("release of {} {} with zero references", E::KIND, id);
        }

        slot.ref_count -= 1;
        if slot.ref_count > 0 {
            return;
        }

        if let Some(freed) = arena.slots.remove(&id) {
            debug!(kind = %E::KIND, %id, "Freeing cache entry");
            for link in freed.entity.links() {
                self.release_link(link);
            }
        }
    }

    fn retain_link(&mut self, link: EntityLink) {
        match link {
            EntityLink::Artist(id) => self.add_ref::<Artist>(id),
            EntityLink::Album(id) => self.add_ref::<Album>(id),
        }
    }

    fn release_link(&mut self, link: EntityLink) {
        match link {
            EntityLink::Artist(id) => self.release::<Artist>(id),
            EntityLink::Album(id) => self.release::<Album>(id),
        }
    }

    /// Hydrates the entity from already extracted fields.
    ///
    /// Returns `false` without touching anything when the entity is already
    /// loaded. Linked entities are created if needed and retained.
    pub fn hydrate<E: CachedEntity>(&mut self, id: EntityId, data: E::Data) -> bool {
        if self.is_loaded::<E>(&id) {
            trace!(kind = %E::KIND, %id, "Already loaded, skipping hydration");
            return false;
        }

        self.get_or_create::<E>(id);
        let links = match E::arena_mut(self).slots.get_mut(&id) {
            Some(slot) => {
                slot.entity.apply(data);
                slot.loaded = true;
                slot.entity.links()
            }
            None => return false,
        };

        for link in links {
            self.retain_link(link);
        }
        true
    }

    /// Extracts the fields of `node` for an entity that still needs them.
    ///
    /// Returns `None` without reading the node when the entity is already
    /// loaded.
    pub fn extract_unloaded<E: CachedEntity>(
        &self,
        id: &EntityId,
        node: &Element,
    ) -> Result<Option<E::Data>> {
        if self.is_loaded::<E>(id) {
            trace!(kind = %E::KIND, %id, "Already loaded, node not read");
            return Ok(None);
        }
        E::extract(node).map(Some)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tracks_count: self.tracks.len(),
            artists_count: self.artists.len(),
            albums_count: self.albums.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stats().total_count() == 0
    }

    /// Removes entries nobody holds, such as entities created by a lookup
    /// and never retained. Returns how many were dropped.
    pub fn purge_unreferenced(&mut self) -> usize {
        let mut purged = 0;
        loop {
            let candidates = self.unreferenced();
            if candidates.is_empty() {
                return purged;
            }
            for (kind, id) in candidates {
                purged += 1;
                let links = match kind {
                    EntityKind::Track => self.tracks.slots.remove(&id).map(|s| s.entity.links()),
                    EntityKind::Artist => self.artists.slots.remove(&id).map(|s| s.entity.links()),
                    EntityKind::Album => self.albums.slots.remove(&id).map(|s| s.entity.links()),
                };
                for link in links.unwrap_or_default() {
                    self.release_link(link);
                }
            }
        }
    }

    fn unreferenced(&self) -> Vec<(EntityKind, EntityId)> {
        fn zero<E>(
            arena: &EntityArena<E>,
            kind: EntityKind,
        ) -> impl Iterator<Item = (EntityKind, EntityId)> + '_ {
            arena
                .slots
                .iter()
                .filter(|(_, slot)| slot.ref_count == 0)
                .map(move |(id, _)| (kind, *id))
        }

        zero(&self.tracks, EntityKind::Track)
            .chain(zero(&self.albums, EntityKind::Album))
            .chain(zero(&self.artists, EntityKind::Artist))
            .collect()
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlbumData, TrackData};

    fn id(byte: u8) -> EntityId {
        EntityId::from_bytes([byte; 16])
    }

    #[test]
    fn test_get_or_create_dedups() {
        let mut cache = EntityCache::new();
        let (_, created) = cache.get_or_create::<Track>(id(1));
        assert!(created);
        cache.get_or_create::<Track>(id(1)).0.title = "same".into();

        let (track, created) = cache.get_or_create::<Track>(id(1));
        assert!(!created);
        assert_eq!(track.title, "same");
        assert_eq!(cache.stats().tracks_count, 1);
    }

    #[test]
    fn test_kinds_do_not_share_ids() {
        let mut cache = EntityCache::new();
        cache.get_or_create::<Track>(id(1));
        cache.get_or_create::<Album>(id(1));
        assert_eq!(cache.stats().total_count(), 2);
    }

    #[test]
    fn test_release_frees_at_zero() {
        let mut cache = EntityCache::new();
        cache.add_ref::<Track>(id(1));
        cache.add_ref::<Track>(id(1));
        assert_eq!(cache.ref_count::<Track>(&id(1)), 2);

        cache.release::<Track>(id(1));
        assert!(cache.contains::<Track>(&id(1)));
        cache.release::<Track>(id(1));
        assert!(!cache.contains::<Track>(&id(1)));
    }

    #[test]
    #[should_panic(expected = "zero references")]
    fn test_release_below_zero_panics() {
        let mut cache = EntityCache::new();
        cache.get_or_create::<Artist>(id(7));
        cache.release::<Artist>(id(7));
    }

    #[test]
    #[should_panic(expected = "release of unknown")]
    fn test_release_unknown_panics() {
        let mut cache = EntityCache::new();
        cache.release::<Track>(id(9));
    }

    #[test]
    fn test_release_cascades_through_links() {
        let mut cache = EntityCache::new();
        cache.add_ref::<Track>(id(1));
        let hydrated = cache.hydrate::<Track>(
            id(1),
            TrackData {
                title: "t".into(),
                album: Some(id(2)),
                artist: Some(id(3)),
                ..Default::default()
            },
        );
        assert!(hydrated);

        cache.hydrate::<Album>(
            id(2),
            AlbumData {
                name: "a".into(),
                artist: Some(id(3)),
                ..Default::default()
            },
        );
        assert_eq!(cache.ref_count::<Album>(&id(2)), 1);
        assert_eq!(cache.ref_count::<Artist>(&id(3)), 2);

        cache.release::<Track>(id(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hydrate_is_idempotent() {
        let mut cache = EntityCache::new();
        cache.add_ref::<Track>(id(1));
        cache.hydrate::<Track>(
            id(1),
            TrackData {
                title: "first".into(),
                ..Default::default()
            },
        );
        cache.get_or_create::<Track>(id(1)).0.title = "edited".into();

        let again = cache.hydrate::<Track>(
            id(1),
            TrackData {
                title: "second".into(),
                album: Some(id(2)),
                ..Default::default()
            },
        );

        assert!(!again);
        let track = cache.get::<Track>(&id(1)).unwrap();
        assert_eq!(track.title, "edited");
        assert_eq!(track.album, None);
        assert!(!cache.contains::<Album>(&id(2)));
    }

    #[test]
    fn test_extract_skips_loaded_entities() {
        let node = pmoutils::parse_xml(b"<track><title>x</title><album-id>zz</album-id></track>")
            .unwrap();
        let mut cache = EntityCache::new();
        assert!(cache.extract_unloaded::<Track>(&id(1), &node).is_err());

        cache.add_ref::<Track>(id(1));
        cache.hydrate::<Track>(id(1), TrackData::default());
        assert!(cache.extract_unloaded::<Track>(&id(1), &node).unwrap().is_none());
    }

    #[test]
    fn test_purge_unreferenced() {
        let mut cache = EntityCache::new();
        cache.get_or_create::<Track>(id(1));
        cache.hydrate::<Track>(
            id(1),
            TrackData {
                artist: Some(id(3)),
                ..Default::default()
            },
        );
        cache.add_ref::<Track>(id(2));

        // L'artiste est libéré en cascade, pas purgé directement
        assert_eq!(cache.purge_unreferenced(), 1);
        assert!(cache.contains::<Track>(&id(2)));
        assert!(!cache.contains::<Artist>(&id(3)));
    }
}
