//! Réponse de recherche (XML compressé)

use crate::error::{Result, SpotifyError};
use crate::ids::{AlbumId, ArtistId, EntityId, TrackId};
use pmoutils::{child_text, get_path, inflate, parse_xml, siblings};
use tracing::debug;
use xmltree::Element;

const SUPPORTED_VERSION: i64 = 1;

/// Validated content of a search response
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    pub did_you_mean: String,
    pub total_artists: u32,
    pub total_albums: u32,
    pub total_tracks: u32,
    pub artists: Vec<(ArtistId, Element)>,
    pub albums: Vec<(AlbumId, Element)>,
    pub tracks: Vec<(TrackId, Element)>,
}

/// Inflates and parses a search response.
pub fn parse_search(payload: &[u8]) -> Result<SearchPlan> {
    let xml = inflate(payload)?;
    let root = parse_xml(&xml)?;

    let version = child_text(&root, "version").ok_or_else(|| SpotifyError::missing(&["version"]))?;
    if version.parse::<i64>().ok() != Some(SUPPORTED_VERSION) {
        return Err(SpotifyError::UnsupportedVersion(version));
    }

    let did_you_mean = child_text(&root, "did-you-mean").unwrap_or_default();

    let total_artists = total(&root, "total-artists")?;
    let artists = entries(&root, "artists", "artist", total_artists)?;

    let total_albums = total(&root, "total-albums")?;
    let albums = entries(&root, "albums", "album", total_albums)?;

    let total_tracks = total(&root, "total-tracks")?;
    let tracks = entries(&root, "tracks", "track", total_tracks)?;

    debug!(
        artists = artists.len(),
        albums = albums.len(),
        tracks = tracks.len(),
        total_tracks,
        "Parsed search response"
    );

    Ok(SearchPlan {
        did_you_mean,
        total_artists,
        total_albums,
        total_tracks,
        artists,
        albums,
        tracks,
    })
}

/// Le compteur est vérifié présent avant d'être lu
fn total(root: &Element, name: &str) -> Result<u32> {
    let text = child_text(root, name).ok_or_else(|| SpotifyError::missing(&[name]))?;
    text.parse()
        .map_err(|_| SpotifyError::invalid_number(name, &text))
}

/// Up to `count` `<list>/<item>` nodes, each with a mandatory `<id>`.
fn entries(root: &Element, list: &str, item: &str, count: u32) -> Result<Vec<(EntityId, Element)>> {
    let Some(parent) = get_path(root, &[list]) else {
        return Ok(Vec::new());
    };

    siblings(parent, item)
        .take(count as usize)
        .map(|node| {
            let token = child_text(node, "id")
                .ok_or_else(|| SpotifyError::missing(&[list, item, "id"]))?;
            Ok((EntityId::from_hex(&token)?, node.clone()))
        })
        .collect()
}
