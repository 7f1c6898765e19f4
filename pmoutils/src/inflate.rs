//! Décompression des réponses du service.
//!
//! Les réponses arrivent soit en gzip complet, soit en deflate brut quand
//! l'en-tête gzip minimal (10 octets) a déjà été retiré par la couche canal.

use flate2::read::{DeflateDecoder, GzDecoder};
use std::io::Read;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum InflateError {
    #[error("empty compressed payload")]
    Empty,

    #[error("corrupted compressed payload: {0}")]
    Corrupted(#[from] std::io::Error),
}

/// Décompresse `data` (gzip si l'en-tête magique est présent, deflate brut sinon)
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, InflateError> {
    if data.is_empty() {
        return Err(InflateError::Empty);
    }

    let mut out = Vec::with_capacity(data.len() * 4);
    if data.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(data).read_to_end(&mut out)?;
    } else {
        DeflateDecoder::new(data).read_to_end(&mut out)?;
    }

    tracing::trace!(compressed = data.len(), inflated = out.len(), "Inflated payload");
    Ok(out)
}
