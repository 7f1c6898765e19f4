//! Canaux de transport et adaptateur d'événements.
//!
//! Le multiplexeur de canaux est un collaborateur externe : le pipeline ne
//! connaît que [`Transport::open_channel`] et les [`ChannelEvent`] qui lui
//! sont rendus, dans l'ordre d'arrivée, pour chaque [`ChannelHandle`].
//!
//! Chaque canal en vol porte une petite machine à états (`Dispatched` →
//! `Buffering` → `Completed`) qui possède le buffer de la réponse.

use crate::buffer::{SEARCH_HEADER_LEN, StreamBuffer};
use crate::error::Result;
use crate::ids::{PlaylistId, TrackId};
use crate::request::{BrowseBatch, RequestId};
use crate::search::SearchQuery;
use bytes::Bytes;
use std::fmt;

/// Numéro de canal attribué par le transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle(pub u32);

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Événement délivré par le transport pour un canal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Chunk de réponse, à bufferiser tel quel
    Data(Bytes),
    /// Erreur transitoire : la requête sera réessayée
    Error,
    /// Fin de flux, toujours le dernier événement du canal
    End,
}

/// Latest revision of a playlist
pub const LATEST_REVISION: u32 = u32::MAX;

/// Protocol command sent when opening a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Contenu d'une playlist ([`PlaylistId::CONTAINER`] pour le conteneur)
    GetPlaylist { id: PlaylistId, revision: u32 },
    Search(SearchQuery),
    BrowseTracks { ids: Vec<TrackId> },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetPlaylist { .. } => "get-playlist",
            Command::Search(_) => "search",
            Command::BrowseTracks { .. } => "browse-tracks",
        }
    }
}

/// Channel multiplexer the pipeline issues commands through.
///
/// Implementations encode the command, allocate a channel and return its
/// handle without waiting for the response. Events for that handle are fed
/// back through [`crate::pipeline::Pipeline::on_channel_event`].
pub trait Transport {
    fn open_channel(&mut self, command: Command) -> Result<ChannelHandle>;
}

/// Étape du pipeline servie par un canal, avec les données dont son
/// parseur aura besoin en fin de flux
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Container,
    Playlist { position: usize, id: PlaylistId },
    Search(SearchQuery),
    Browse(BrowseBatch),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Container => f.write_str("container"),
            Stage::Playlist { position, .. } => write!(f, "playlist[{position}]"),
            Stage::Search(query) => write!(f, "search '{}'", query.query),
            Stage::Browse(batch) => write!(f, "browse[{}]", batch.position),
        }
    }
}

/// Phase of an in-flight channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Commande envoyée, aucun octet reçu
    Dispatched,
    Buffering,
    /// Terminal event seen, the state is about to be dropped
    Completed,
}

/// What the adapter decided for one event
#[derive(Debug)]
pub(crate) enum Step {
    /// Waiting for more events
    Continue,
    /// Transient failure, the buffer was discarded
    Failed,
    /// Full payload, ready for the stage parser
    Finished(Bytes),
}

/// Private state of one in-flight channel
#[derive(Debug)]
pub struct InFlight {
    pub request: RequestId,
    pub stage: Stage,
    phase: ChannelPhase,
    buffer: Option<StreamBuffer>,
}

impl InFlight {
    pub(crate) fn new(request: RequestId, stage: Stage) -> Self {
        let buffer = match stage {
            Stage::Container | Stage::Playlist { .. } => StreamBuffer::playlist_document(),
            Stage::Search(_) => StreamBuffer::skipping_header(SEARCH_HEADER_LEN),
            Stage::Browse(_) => StreamBuffer::new(),
        };
        Self {
            request,
            stage,
            phase: ChannelPhase::Dispatched,
            buffer: Some(buffer),
        }
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// Bytes received on the channel so far
    pub fn received(&self) -> usize {
        self.buffer.as_ref().map_or(0, StreamBuffer::received)
    }

    pub(crate) fn apply(&mut self, event: ChannelEvent) -> Step {
        if self.phase == ChannelPhase::Completed {
            return Step::Continue;
        }

        match event {
            ChannelEvent::Data(chunk) => {
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.push(&chunk);
                }
                self.phase = ChannelPhase::Buffering;
                Step::Continue
            }
            ChannelEvent::Error => {
                self.phase = ChannelPhase::Completed;
                self.buffer = None;
                Step::Failed
            }
            ChannelEvent::End => {
                self.phase = ChannelPhase::Completed;
                match self.buffer.take() {
                    Some(buffer) => Step::Finished(buffer.finish()),
                    None => Step::Failed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PLAYLIST_PROLOGUE;

    fn browse_stage() -> Stage {
        Stage::Browse(BrowseBatch {
            playlist: PlaylistId::from_bytes([7; PlaylistId::LEN]),
            position: 0,
            tracks: Vec::new(),
        })
    }

    #[test]
    fn test_phases() {
        let mut state = InFlight::new(RequestId(1), browse_stage());
        assert_eq!(state.phase(), ChannelPhase::Dispatched);

        assert!(matches!(
            state.apply(ChannelEvent::Data(Bytes::from_static(b"abc"))),
            Step::Continue
        ));
        assert_eq!(state.phase(), ChannelPhase::Buffering);
        assert_eq!(state.received(), 3);

        match state.apply(ChannelEvent::End) {
            Step::Finished(payload) => assert_eq!(&payload[..], b"abc"),
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(state.phase(), ChannelPhase::Completed);
    }

    #[test]
    fn test_error_discards_buffer() {
        let mut state = InFlight::new(RequestId(1), Stage::Container);
        state.apply(ChannelEvent::Data(Bytes::from_static(b"<next-change>")));
        assert!(matches!(state.apply(ChannelEvent::Error), Step::Failed));
        assert_eq!(state.received(), 0);
        // Un événement tardif ne ressuscite pas le canal
        assert!(matches!(state.apply(ChannelEvent::End), Step::Continue));
    }

    #[test]
    fn test_playlist_stage_is_wrapped() {
        let stage = Stage::Playlist {
            position: 0,
            id: PlaylistId::from_bytes([1; PlaylistId::LEN]),
        };
        let mut state = InFlight::new(RequestId(2), stage);
        match state.apply(ChannelEvent::End) {
            Step::Finished(payload) => {
                assert!(payload.starts_with(PLAYLIST_PROLOGUE));
                assert!(payload.ends_with(b"</playlist>"));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_search_stage_skips_header() {
        let mut state = InFlight::new(RequestId(3), Stage::Search(SearchQuery::new("miles")));
        state.apply(ChannelEvent::Data(Bytes::from_static(b"0123456789xyz")));
        match state.apply(ChannelEvent::End) {
            Step::Finished(payload) => assert_eq!(&payload[..], b"xyz"),
            other => panic!("unexpected step {other:?}"),
        }
    }
}
