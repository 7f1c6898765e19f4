//! Outils partagés par les tests d'intégration : transport factice et
//! fabrication de réponses XML.
#![allow(dead_code)]

use bytes::Bytes;
use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use pmospotify::{
    ChannelEvent, ChannelHandle, Command, PipelineConfig, SpotifyClient, SpotifyError, Transport,
    TransportEvent,
};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

pub const PLAYLIST_A: &str = "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a02";
pub const PLAYLIST_B: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b02";

pub const T1: &str = "11111111111111111111111111111111";
pub const T2: &str = "22222222222222222222222222222222";
pub const T3: &str = "33333333333333333333333333333333";

pub const ALBUM: &str = "a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0";
pub const ARTIST: &str = "e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0";

pub const RETRY: Duration = Duration::from_secs(10);

/// Transport recording the commands it is asked to send
#[derive(Debug, Default)]
pub struct FakeTransport {
    next: u32,
    pub opened: Vec<(ChannelHandle, Command)>,
    /// Number of upcoming `open_channel` calls that fail
    pub failures: usize,
}

impl Transport for FakeTransport {
    fn open_channel(&mut self, command: Command) -> pmospotify::Result<ChannelHandle> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SpotifyError::Transport("connection lost".into()));
        }
        self.next += 1;
        let handle = ChannelHandle(self.next);
        self.opened.push((handle, command));
        Ok(handle)
    }
}

impl FakeTransport {
    pub fn last(&self) -> ChannelHandle {
        self.opened.last().expect("no channel opened").0
    }

    pub fn handles(&self) -> Vec<ChannelHandle> {
        self.opened.iter().map(|(h, _)| *h).collect()
    }
}

pub fn client() -> SpotifyClient<FakeTransport> {
    SpotifyClient::new(FakeTransport::default(), PipelineConfig::uniform(RETRY))
}

/// Delivers `payload` in one chunk, then ends the channel.
pub fn respond<T: Transport>(client: &mut SpotifyClient<T>, handle: ChannelHandle, payload: &[u8]) {
    client.handle_event(handle, ChannelEvent::Data(Bytes::copy_from_slice(payload)));
    client.handle_event(handle, ChannelEvent::End);
}

/// Playlist or container body as sent on the wire: the `<playlist>` root is
/// added by the receiving buffer.
pub fn items_xml(ids: &[&str]) -> String {
    format!(
        "<next-change><change><ops><add><items>{}</items></add></ops></change></next-change>",
        ids.join(",\n")
    )
}

pub fn track_xml(id: &str, title: &str) -> String {
    format!(
        "<track><id>{id}</id><title>{title}</title><album-id>{ALBUM}</album-id>\
         <album>Kind of Blue</album><artist-id>{ARTIST}</artist-id><artist>Miles Davis</artist>\
         <year>1959</year><length>545000</length></track>"
    )
}

pub fn browse_xml(tracks: &[(&str, &str)]) -> String {
    let body: String = tracks.iter().map(|(id, title)| track_xml(id, title)).collect();
    format!("<result><tracks>{body}</tracks></result>")
}

pub fn search_xml(version: &str, tracks: &[(&str, &str)]) -> String {
    let body: String = tracks.iter().map(|(id, title)| track_xml(id, title)).collect();
    format!(
        "<result><version>{version}</version><did-you-mean>miles davis</did-you-mean>\
         <total-artists>1</total-artists><artists><artist><id>{ARTIST}</id><name>Miles Davis</name></artist></artists>\
         <total-albums>0</total-albums><albums/>\
         <total-tracks>{}</total-tracks><tracks>{body}</tracks></result>",
        tracks.len()
    )
}

pub fn gzip(xml: &str) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(xml.as_bytes()).unwrap();
    enc.finish().unwrap()
}

/// Search response stream: 10 header bytes followed by a raw deflate body.
pub fn search_stream(xml: &str) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(xml.as_bytes()).unwrap();
    let mut stream = vec![0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0x03];
    stream.extend(enc.finish().unwrap());
    stream
}

/// Transport answering every command on an mpsc stream, as the I/O side
/// of a connection would. The sender is dropped after `expected` channels.
pub struct ScriptedTransport {
    next: u32,
    expected: usize,
    tx: Option<mpsc::Sender<TransportEvent>>,
    pub playlist_tracks: Vec<&'static str>,
}

impl ScriptedTransport {
    pub fn new(
        expected: usize,
        playlist_tracks: Vec<&'static str>,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(256);
        (
            Self {
                next: 0,
                expected,
                tx: Some(tx),
                playlist_tracks,
            },
            rx,
        )
    }

    fn body(&self, command: &Command) -> Vec<u8> {
        match command {
            Command::GetPlaylist { id, .. } if *id == pmospotify::PlaylistId::CONTAINER => {
                items_xml(&[PLAYLIST_A, PLAYLIST_B]).into_bytes()
            }
            Command::GetPlaylist { .. } => items_xml(&self.playlist_tracks).into_bytes(),
            Command::BrowseTracks { ids } => {
                let tracks: Vec<(String, String)> = ids
                    .iter()
                    .map(|id| (id.to_hex(), format!("Track {}", id.to_hex())))
                    .collect();
                let refs: Vec<(&str, &str)> =
                    tracks.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
                gzip(&browse_xml(&refs))
            }
            Command::Search(_) => search_stream(&search_xml("1", &[(T1, "So What")])),
        }
    }
}

impl Transport for ScriptedTransport {
    fn open_channel(&mut self, command: Command) -> pmospotify::Result<ChannelHandle> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(SpotifyError::Transport("closed".into()));
        };
        self.next += 1;
        let handle = ChannelHandle(self.next);
        let body = self.body(&command);

        // Deux chunks pour exercer l'accumulation
        let (head, tail) = body.split_at(body.len() / 2);
        for event in [
            ChannelEvent::Data(Bytes::copy_from_slice(head)),
            ChannelEvent::Data(Bytes::copy_from_slice(tail)),
            ChannelEvent::End,
        ] {
            tx.try_send((handle, event))
                .map_err(|e| SpotifyError::Transport(e.to_string()))?;
        }

        if self.next as usize >= self.expected {
            self.tx = None;
        }
        Ok(handle)
    }
}
