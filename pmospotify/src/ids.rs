//! Identifiants binaires du protocole.
//!
//! Les entités (tracks, artistes, albums) sont identifiées par 16 octets.
//! Les playlists portent un 17e octet de tag qui sépare les domaines de
//! checksum (`0x01` pour les tracks, `0x02` pour les playlists).

use crate::error::{Result, SpotifyError};
use pmoutils::{bytes_to_hex, hex_to_bytes};
use std::fmt;
use std::str::FromStr;

/// Tag byte appended to track ids when folding a playlist checksum
pub const TRACK_TAG: u8 = 0x01;

/// Tag byte appended to playlist ids when folding a container checksum
pub const PLAYLIST_TAG: u8 = 0x02;

/// 16-byte identifier of a cached entity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId([u8; EntityId::LEN]);

pub type TrackId = EntityId;
pub type ArtistId = EntityId;
pub type AlbumId = EntityId;

impl EntityId {
    pub const LEN: usize = 16;

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Décode un token hexadécimal de 32 caractères.
    ///
    /// Les listes d'items de playlist suffixent parfois l'id avec l'octet de
    /// tag (34 caractères) : le tag doit être valide, seul le préfixe est
    /// conservé. Toute autre longueur est une erreur.
    pub fn from_hex(token: &str) -> Result<Self> {
        let token = token.trim();
        let mut tagged = [0u8; Self::LEN + 1];
        let digits = match token.len() {
            n if n == Self::LEN * 2 => &mut tagged[..Self::LEN],
            n if n == Self::LEN * 2 + 2 => &mut tagged[..],
            _ => {
                return Err(SpotifyError::IdLength {
                    token: token.to_string(),
                    expected: "32 or 34",
                });
            }
        };
        hex_to_bytes(token, digits)?;

        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&tagged[..Self::LEN]);
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = SpotifyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.to_hex())
    }
}

/// 17-byte playlist identifier (16 id bytes followed by a tag byte)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaylistId([u8; PlaylistId::LEN]);

impl PlaylistId {
    pub const LEN: usize = 17;

    /// Identifiant (nul) utilisé pour demander le conteneur de playlists
    pub const CONTAINER: PlaylistId = PlaylistId([0u8; Self::LEN]);

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// The 16 identifying bytes, without the tag
    pub fn base(&self) -> &[u8] {
        &self.0[..Self::LEN - 1]
    }

    pub fn tag(&self) -> u8 {
        self.0[Self::LEN - 1]
    }

    /// Décode un token de exactement 34 caractères hexadécimaux
    pub fn from_hex(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.len() != Self::LEN * 2 {
            return Err(SpotifyError::IdLength {
                token: token.to_string(),
                expected: "34",
            });
        }

        let mut bytes = [0u8; Self::LEN];
        hex_to_bytes(token, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl FromStr for PlaylistId {
    type Err = SpotifyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaylistId({})", self.to_hex())
    }
}
