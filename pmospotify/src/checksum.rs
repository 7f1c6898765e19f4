//! Checksums Adler-32 des playlists et du conteneur.
//!
//! Chaque identifiant est replié suivi de son octet de tag, ce qui sépare le
//! domaine « ids de tracks » du domaine « ids de playlists ». Le planificateur
//! compare ces valeurs au jeton de synchronisation du service pour détecter
//! un contenu périmé.

use crate::ids::{PLAYLIST_TAG, PlaylistId, TRACK_TAG, TrackId};
use crate::playlist::{Playlist, PlaylistContainer};
use adler2::Adler32;

/// Checksum of an ordered track id sequence (1 for an empty sequence)
pub fn checksum_tracks(tracks: &[TrackId]) -> u32 {
    let mut adler = Adler32::new();
    for id in tracks {
        adler.write_slice(id.as_bytes());
        adler.write_slice(&[TRACK_TAG]);
    }
    adler.checksum()
}

/// Checksum of an ordered playlist id sequence (1 for an empty sequence)
pub fn checksum_playlist_ids<'a>(ids: impl IntoIterator<Item = &'a PlaylistId>) -> u32 {
    let mut adler = Adler32::new();
    for id in ids {
        adler.write_slice(id.base());
        adler.write_slice(&[PLAYLIST_TAG]);
    }
    adler.checksum()
}

pub fn checksum_playlist(playlist: &Playlist) -> u32 {
    checksum_tracks(playlist.tracks())
}

pub fn checksum_container(container: &PlaylistContainer) -> u32 {
    checksum_playlist_ids(container.playlists().iter().map(|p| &p.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;

    fn tid(byte: u8) -> TrackId {
        EntityId::from_bytes([byte; 16])
    }

    #[test]
    fn test_empty_sequences_fold_to_one() {
        assert_eq!(checksum_tracks(&[]), 1);
        assert_eq!(checksum_playlist_ids([]), 1);
    }

    #[test]
    fn test_matches_reference_adler32() {
        let ids = [tid(0x11), tid(0x22)];
        let mut raw = Vec::new();
        for id in &ids {
            raw.extend_from_slice(id.as_bytes());
            raw.push(TRACK_TAG);
        }
        assert_eq!(checksum_tracks(&ids), adler2::adler32_slice(&raw));
    }

    #[test]
    fn test_domains_are_separated() {
        let track = tid(0x42);
        let mut playlist_bytes = [0x42u8; PlaylistId::LEN];
        playlist_bytes[16] = TRACK_TAG;
        let playlist = PlaylistId::from_bytes(playlist_bytes);

        assert_ne!(checksum_tracks(&[track]), checksum_playlist_ids([&playlist]));
    }

    #[test]
    fn test_playlist_tag_is_normalised() {
        let mut a = [0x10u8; PlaylistId::LEN];
        let mut b = a;
        a[16] = 0x02;
        b[16] = 0x07;
        assert_eq!(
            checksum_playlist_ids([&PlaylistId::from_bytes(a)]),
            checksum_playlist_ids([&PlaylistId::from_bytes(b)])
        );
    }
}
