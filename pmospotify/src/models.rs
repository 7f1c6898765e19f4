//! Structures de données des entités du catalogue et leur hydratation XML.
//!
//! L'hydratation se fait en deux temps : extraction pure des champs depuis
//! le noeud XML (`Hydrate::extract`), puis application sur l'entité du cache
//! ([`crate::cache::EntityCache::hydrate`]). Un parseur d'étape peut ainsi
//! valider toute sa réponse avant de toucher au cache.
//!
//! Seuls les identifiants sont stricts : un champ descriptif absent ou non
//! numérique reste simplement vide.

use crate::error::Result;
use crate::ids::{AlbumId, ArtistId, EntityId, TrackId};
use pmoutils::child_text;
use xmltree::Element;

/// Reference held by an entity on another cached entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLink {
    Artist(ArtistId),
    Album(AlbumId),
}

/// Représente un artiste
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    /// Identifiant de l'image de l'artiste
    pub portrait: Option<String>,
    pub popularity: Option<f32>,
}

/// Représente un album
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    /// Artiste principal (référence tenue sur l'entrée du cache)
    pub artist: Option<ArtistId>,
    pub artist_name: Option<String>,
    pub cover: Option<String>,
    pub year: Option<u32>,
    pub popularity: Option<f32>,
}

/// Représente une piste (track)
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<ArtistId>,
    pub artist_name: Option<String>,
    pub album: Option<AlbumId>,
    pub album_name: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    /// Durée en millisecondes
    pub duration_ms: Option<u32>,
    pub popularity: Option<f32>,
}

impl Artist {
    pub fn new(id: ArtistId) -> Self {
        Self {
            id,
            name: String::new(),
            portrait: None,
            popularity: None,
        }
    }
}

impl Album {
    pub fn new(id: AlbumId) -> Self {
        Self {
            id,
            name: String::new(),
            artist: None,
            artist_name: None,
            cover: None,
            year: None,
            popularity: None,
        }
    }
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            title: String::new(),
            artist: None,
            artist_name: None,
            album: None,
            album_name: None,
            year: None,
            track_number: None,
            duration_ms: None,
            popularity: None,
        }
    }
}

/// Entities that can be populated from an XML node.
pub trait Hydrate {
    /// Fields extracted from the node, validated but not yet applied
    type Data: Clone + std::fmt::Debug;

    fn extract(node: &Element) -> Result<Self::Data>;

    fn apply(&mut self, data: Self::Data);

    /// Other entities this one holds a reference on
    fn links(&self) -> Vec<EntityLink>;
}

#[derive(Debug, Clone, Default)]
pub struct ArtistData {
    pub name: String,
    pub portrait: Option<String>,
    pub popularity: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumData {
    pub name: String,
    pub artist: Option<ArtistId>,
    pub artist_name: Option<String>,
    pub cover: Option<String>,
    pub year: Option<u32>,
    pub popularity: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackData {
    pub title: String,
    pub artist: Option<ArtistId>,
    pub artist_name: Option<String>,
    pub album: Option<AlbumId>,
    pub album_name: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub duration_ms: Option<u32>,
    pub popularity: Option<f32>,
}

impl Hydrate for Artist {
    type Data = ArtistData;

    fn extract(node: &Element) -> Result<ArtistData> {
        let portrait = node
            .get_child("portrait")
            .and_then(|p| child_text(p, "id"))
            .filter(|s| !s.is_empty());

        Ok(ArtistData {
            name: child_text(node, "name").unwrap_or_default(),
            portrait,
            popularity: optional_number(node, "popularity"),
        })
    }

    fn apply(&mut self, data: ArtistData) {
        self.name = data.name;
        self.portrait = data.portrait;
        self.popularity = data.popularity;
    }

    fn links(&self) -> Vec<EntityLink> {
        Vec::new()
    }
}

impl Hydrate for Album {
    type Data = AlbumData;

    fn extract(node: &Element) -> Result<AlbumData> {
        Ok(AlbumData {
            name: child_text(node, "name").unwrap_or_default(),
            artist: optional_id(node, "artist-id")?,
            artist_name: optional_text(node, "artist-name"),
            cover: optional_text(node, "cover"),
            year: optional_number(node, "year"),
            popularity: optional_number(node, "popularity"),
        })
    }

    fn apply(&mut self, data: AlbumData) {
        self.name = data.name;
        self.artist = data.artist;
        self.artist_name = data.artist_name;
        self.cover = data.cover;
        self.year = data.year;
        self.popularity = data.popularity;
    }

    fn links(&self) -> Vec<EntityLink> {
        self.artist.map(EntityLink::Artist).into_iter().collect()
    }
}

impl Hydrate for Track {
    type Data = TrackData;

    fn extract(node: &Element) -> Result<TrackData> {
        Ok(TrackData {
            title: child_text(node, "title").unwrap_or_default(),
            artist: optional_id(node, "artist-id")?,
            artist_name: optional_text(node, "artist"),
            album: optional_id(node, "album-id")?,
            album_name: optional_text(node, "album"),
            year: optional_number(node, "year"),
            track_number: optional_number(node, "track-number"),
            duration_ms: optional_number(node, "length"),
            popularity: optional_number(node, "popularity"),
        })
    }

    fn apply(&mut self, data: TrackData) {
        self.title = data.title;
        self.artist = data.artist;
        self.artist_name = data.artist_name;
        self.album = data.album;
        self.album_name = data.album_name;
        self.year = data.year;
        self.track_number = data.track_number;
        self.duration_ms = data.duration_ms;
        self.popularity = data.popularity;
    }

    fn links(&self) -> Vec<EntityLink> {
        let mut links = Vec::with_capacity(2);
        if let Some(album) = self.album {
            links.push(EntityLink::Album(album));
        }
        if let Some(artist) = self.artist {
            links.push(EntityLink::Artist(artist));
        }
        links
    }
}

fn optional_text(node: &Element, name: &str) -> Option<String> {
    child_text(node, name).filter(|s| !s.is_empty())
}

fn optional_number<T: std::str::FromStr>(node: &Element, name: &str) -> Option<T> {
    child_text(node, name).and_then(|s| s.parse().ok())
}

fn optional_id(node: &Element, name: &str) -> Result<Option<EntityId>> {
    match optional_text(node, name) {
        Some(token) => Ok(Some(EntityId::from_hex(&token)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmoutils::parse_xml;

    const ARTIST: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ALBUM: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_track_extract() {
        let xml = format!(
            "<track><id>cccccccccccccccccccccccccccccccc</id><title> Blue in Green </title>\
             <artist-id>{ARTIST}</artist-id><artist>Miles Davis</artist>\
             <album-id>{ALBUM}</album-id><album>Kind of Blue</album>\
             <year>1959</year><track-number>3</track-number><length>337000</length>\
             <popularity>0.8</popularity></track>"
        );
        let node = parse_xml(xml.as_bytes()).unwrap();
        let data = Track::extract(&node).unwrap();

        assert_eq!(data.title, "Blue in Green");
        assert_eq!(data.artist, Some(ArtistId::from_hex(ARTIST).unwrap()));
        assert_eq!(data.album_name.as_deref(), Some("Kind of Blue"));
        assert_eq!(data.year, Some(1959));
        assert_eq!(data.track_number, Some(3));
        assert_eq!(data.duration_ms, Some(337_000));

        let mut track = Track::new(TrackId::from_hex("cccccccccccccccccccccccccccccccc").unwrap());
        track.apply(data);
        assert_eq!(track.links().len(), 2);
    }

    #[test]
    fn test_lenient_descriptive_fields() {
        let node = parse_xml(b"<track><year>soon</year><album></album></track>").unwrap();
        let data = Track::extract(&node).unwrap();
        assert_eq!(data.title, "");
        assert_eq!(data.year, None);
        assert_eq!(data.album_name, None);
    }

    #[test]
    fn test_malformed_link_id_is_fatal() {
        let node =
            parse_xml(b"<album><name>x</name><artist-id>nothex</artist-id></album>").unwrap();
        assert!(Album::extract(&node).is_err());
    }

    #[test]
    fn test_artist_portrait() {
        let node =
            parse_xml(b"<artist><name>Nina</name><portrait><id>abc</id></portrait></artist>")
                .unwrap();
        let data = Artist::extract(&node).unwrap();
        assert_eq!(data.portrait.as_deref(), Some("abc"));
        assert_eq!(data.name, "Nina");
    }
}
