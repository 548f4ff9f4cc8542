//! Line framing over either body delivery mode.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use crate::error::Result;
use crate::transport::{ByteStream, ResponseBody};

enum Source {
    Stream(ByteStream),
    Buffered(Option<Bytes>),
}

/// Splits a response body into newline-delimited lines.
///
/// A fully buffered body is fed through the same splitter as a chunked one,
/// so both produce the same line sequence. Lines are yielded without their
/// `\n` or `\r\n` terminator; a final unterminated line is still yielded.
pub struct FrameReader {
    source: Source,
    pending: BytesMut,
    raw: BytesMut,
    exhausted: bool,
}

impl FrameReader {
    pub fn new(body: ResponseBody) -> Self {
        let source = match body {
            ResponseBody::Streaming(stream) => Source::Stream(stream),
            ResponseBody::Buffered(bytes) => Source::Buffered(Some(bytes)),
        };
        Self {
            source,
            pending: BytesMut::new(),
            raw: BytesMut::new(),
            exhausted: false,
        }
    }

    /// Everything read from the body so far.
    pub fn raw_body(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Next line, or `None` once the body is exhausted.
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line = self.pending.split_to(pos + 1);
                return Some(Ok(decode_line(&line[..pos])));
            }
            if self.exhausted {
                if self.pending.is_empty() {
                    return None;
                }
                let rest = self.pending.split();
                return Some(Ok(decode_line(&rest)));
            }
            match self.next_chunk().await {
                Some(Ok(chunk)) => {
                    self.raw.extend_from_slice(&chunk);
                    self.pending.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
                None => self.exhausted = true,
            }
        }
    }

    async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        match &mut self.source {
            Source::Stream(stream) => stream.next().await,
            Source::Buffered(bytes) => bytes.take().map(Ok),
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use pretty_assertions::assert_eq;

    async fn collect(mut reader: FrameReader) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await {
            lines.push(line.unwrap());
        }
        lines
    }

    #[tokio::test]
    async fn buffered_and_chunked_bodies_yield_same_lines() {
        let text = "data: a\r\n\ndata: b\nlast";
        let buffered = collect(FrameReader::new(ResponseBody::Buffered(Bytes::from(text)))).await;

        let chunks: Vec<Result<Bytes>> = text
            .as_bytes()
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let streamed =
            collect(FrameReader::new(ResponseBody::Streaming(stream::iter(chunks).boxed()))).await;

        assert_eq!(buffered, vec!["data: a", "", "data: b", "last"]);
        assert_eq!(streamed, buffered);
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_chunks() {
        let text = "data: 午餐\n".as_bytes().to_vec();
        let chunks: Vec<Result<Bytes>> = text
            .chunks(1)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let lines =
            collect(FrameReader::new(ResponseBody::Streaming(stream::iter(chunks).boxed()))).await;
        assert_eq!(lines, vec!["data: 午餐"]);
    }

    #[tokio::test]
    async fn raw_body_tracks_everything_read() {
        let mut reader = FrameReader::new(ResponseBody::Buffered(Bytes::from("x\ny")));
        while reader.next_line().await.is_some() {}
        assert_eq!(reader.raw_body(), "x\ny");
    }
}
