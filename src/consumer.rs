//! Line reader for incoming requests

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tracing::debug;

/// Reads newline-delimited requests from an input stream
///
/// Lines are returned as raw bytes; decoding them is part of handling the
/// request, so an undecodable line fails on its own instead of ending the
/// stream.
pub struct RequestConsumer<R> {
    segments: Split<R>,
    lines_read: u64,
}

impl<R: AsyncBufRead + Unpin> RequestConsumer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            segments: reader.split(b'\n'),
            lines_read: 0,
        }
    }

    /// Next non-blank line without its terminator, or `None` once the input is closed
    pub async fn next_request(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let segment = self
                .segments
                .next_segment()
                .await
                .context("Failed to read request line")?;

            match segment {
                Some(mut line) => {
                    self.lines_read += 1;
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        debug!(line = self.lines_read, "Skipping blank line");
                        continue;
                    }
                    return Ok(Some(line));
                }
                None => return Ok(None),
            }
        }
    }

    /// Number of lines consumed so far, blank ones included
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skips_blank_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\r\n";
        let mut consumer = RequestConsumer::new(input);

        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"{\"b\":2}"[..]));
        assert_eq!(consumer.next_request().await.unwrap(), None);
        assert_eq!(consumer.lines_read(), 4);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let input: &[u8] = b"first\nsecond";
        let mut consumer = RequestConsumer::new(input);

        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"second"[..]));
        assert_eq!(consumer.next_request().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_returned_not_an_error() {
        let input: &[u8] = b"{\"a\":1}\n\xff\xfe garbage\n{\"b\":2}\n";
        let mut consumer = RequestConsumer::new(input);

        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(
            consumer.next_request().await.unwrap().as_deref(),
            Some(&b"\xff\xfe garbage"[..])
        );
        assert_eq!(consumer.next_request().await.unwrap().as_deref(), Some(&b"{\"b\":2}"[..]));
        assert_eq!(consumer.next_request().await.unwrap(), None);
    }
}
