//! Réponse de browse des tracks d'une playlist (XML compressé)

use crate::error::{Result, SpotifyError};
use crate::ids::TrackId;
use pmoutils::{child_text, get_path, inflate, parse_xml, siblings};
use tracing::debug;
use xmltree::Element;

/// Track nodes of a browse response, in document order
#[derive(Debug, Clone, Default)]
pub struct BrowsePlan {
    pub tracks: Vec<(TrackId, Element)>,
}

pub fn parse_browse(payload: &[u8]) -> Result<BrowsePlan> {
    let xml = inflate(payload)?;
    let root = parse_xml(&xml)?;

    let tracks = match get_path(&root, &["tracks"]) {
        Some(list) => siblings(list, "track")
            .map(|node| {
                let token = child_text(node, "id")
                    .ok_or_else(|| SpotifyError::missing(&["tracks", "track", "id"]))?;
                Ok((TrackId::from_hex(&token)?, node.clone()))
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    debug!(tracks = tracks.len(), "Parsed browse response");
    Ok(BrowsePlan { tracks })
}
