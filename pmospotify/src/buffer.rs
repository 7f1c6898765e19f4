//! Buffer d'accumulation d'un canal en vol.
//!
//! Les réponses de playlist arrivent sans élément racine fermant (le
//! protocole le retire pour tenir dans la charge utile du canal) : le buffer
//! est amorcé avec la déclaration XML et `<playlist>`, et `finish` ajoute la
//! balise fermante. Les réponses de recherche commencent par un en-tête gzip
//! minimal de 10 octets, sauté octet par octet quel que soit le découpage des
//! chunks.

use bytes::{Bytes, BytesMut};

/// XML prologue of playlist and container documents
pub const PLAYLIST_PROLOGUE: &[u8] = b"<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<playlist>\n";

/// Closing tag the protocol strips from playlist documents
pub const PLAYLIST_EPILOGUE: &[u8] = b"</playlist>";

/// Length of the minimal gzip header preceding search responses
pub const SEARCH_HEADER_LEN: usize = 10;

#[derive(Debug)]
pub struct StreamBuffer {
    data: BytesMut,
    skip: usize,
    received: usize,
    epilogue: &'static [u8],
}

impl StreamBuffer {
    /// Plain buffer, bytes kept verbatim
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
            skip: 0,
            received: 0,
            epilogue: b"",
        }
    }

    /// Buffer wrapping a playlist document in its prologue and epilogue
    pub fn playlist_document() -> Self {
        let mut data = BytesMut::with_capacity(4096);
        data.extend_from_slice(PLAYLIST_PROLOGUE);
        Self {
            data,
            skip: 0,
            received: 0,
            epilogue: PLAYLIST_EPILOGUE,
        }
    }

    /// Buffer discarding the first `len` bytes of the cumulative stream
    pub fn skipping_header(len: usize) -> Self {
        Self {
            skip: len,
            ..Self::new()
        }
    }

    /// Appends one chunk, minus whatever part of the header it still covers
    pub fn push(&mut self, chunk: &[u8]) {
        let already = self.received;
        self.received += chunk.len();

        let start = self.skip.saturating_sub(already).min(chunk.len());
        self.data.extend_from_slice(&chunk[start..]);
    }

    /// Bytes delivered by the channel so far, header included
    pub fn received(&self) -> usize {
        self.received
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Closes the payload and hands it over for parsing
    pub fn finish(mut self) -> Bytes {
        self.data.extend_from_slice(self.epilogue);
        self.data.freeze()
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = b"HHHHHHHHHHpayload-bytes";

    fn deliver(splits: &[usize]) -> Bytes {
        let mut buffer = StreamBuffer::skipping_header(SEARCH_HEADER_LEN);
        let mut offset = 0;
        for &len in splits {
            buffer.push(&STREAM[offset..offset + len]);
            offset += len;
        }
        buffer.push(&STREAM[offset..]);
        buffer.finish()
    }

    #[test]
    fn test_header_skip_is_split_independent() {
        let whole = deliver(&[]);
        assert_eq!(&whole[..], b"payload-bytes");

        assert_eq!(deliver(&[3, 7]), whole);
        assert_eq!(deliver(&[1; 10]), whole);
        assert_eq!(deliver(&[4, 9]), whole);
        assert_eq!(deliver(&[0, 10, 0]), whole);
    }

    #[test]
    fn test_short_stream_keeps_nothing() {
        let mut buffer = StreamBuffer::skipping_header(SEARCH_HEADER_LEN);
        buffer.push(b"abc");
        assert!(buffer.is_empty());
        assert_eq!(buffer.received(), 3);
    }

    #[test]
    fn test_playlist_document_is_closed() {
        let mut buffer = StreamBuffer::playlist_document();
        buffer.push(b"<next-change/>");
        let doc = buffer.finish();
        assert!(doc.starts_with(PLAYLIST_PROLOGUE));
        assert!(doc.ends_with(b"<next-change/></playlist>"));
    }
}
