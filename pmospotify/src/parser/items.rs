//! Listes d'identifiants des documents `<playlist>` (conteneur et playlist)

use crate::error::{Result, SpotifyError};
use crate::ids::{PlaylistId, TrackId};
use pmoutils::{get_path, parse_xml};
use tracing::debug;

/// Chemin du noeud texte portant la liste d'ids
pub const ITEMS_PATH: [&str; 5] = ["next-change", "change", "ops", "add", "items"];

fn item_tokens(document: &[u8]) -> Result<Vec<String>> {
    let root = parse_xml(document)?;
    let items = get_path(&root, &ITEMS_PATH).ok_or_else(|| SpotifyError::missing(&ITEMS_PATH))?;
    let text = items.get_text().unwrap_or_default();

    Ok(text
        .split([',', '\n'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect())
}

/// Playlist ids listed by the container document, in discovery order
pub fn parse_container(document: &[u8]) -> Result<Vec<PlaylistId>> {
    let ids = item_tokens(document)?
        .iter()
        .map(|token| PlaylistId::from_hex(token))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = ids.len(), "Parsed playlist container");
    Ok(ids)
}

/// Track ids listed by a playlist document, duplicates kept
pub fn parse_playlist(document: &[u8]) -> Result<Vec<TrackId>> {
    let ids = item_tokens(document)?
        .iter()
        .map(|token| TrackId::from_hex(token))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = ids.len(), "Parsed playlist");
    Ok(ids)
}
