//! Server-sent-event record decoding.
//!
//! The streaming endpoints frame each record as `data:<json>` followed by a
//! blank line (LF or CRLF). Decoding is single-pass and lazy: records are
//! parsed as frame boundaries arrive, a consumer may stop early, and records
//! yielded before a later wire error remain valid. Any non-`data:` frame is a
//! hard format violation.
//!
//! Buffering happens on raw bytes; a frame is only decoded as UTF-8 once its
//! boundary has arrived, so multi-byte characters split across network
//! chunks are reassembled instead of corrupted.

use crate::{BoxStream, Error, Result};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::Value;

/// Parse one complete frame. `Ok(None)` means a blank frame to skip.
fn parse_frame(frame: &[u8]) -> Result<Option<Value>> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| Error::MalformedBody(format!("stream frame is not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let payload = trimmed
        .strip_prefix("data:")
        .ok_or_else(|| {
            Error::MalformedBody(format!("unexpected stream frame (no data prefix): {trimmed:?}"))
        })?
        .trim_start();
    let value = serde_json::from_str(payload).map_err(|e| {
        Error::MalformedBody(format!("stream record is not valid JSON: {e}"))
    })?;
    Ok(Some(value))
}

/// Earliest blank-line boundary in the buffer, with its delimiter length.
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Decode a byte stream into a lazy stream of JSON records.
pub fn decode_sse(input: BoxStream<'static, Bytes>) -> BoxStream<'static, Value> {
    let decoded = stream::unfold(
        (input, BytesMut::new(), false),
        |(mut input, mut buf, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some((idx, delim_len)) = find_boundary(&buf) {
                    let frame = buf.split_to(idx + delim_len);
                    match parse_frame(&frame[..idx]) {
                        Ok(Some(value)) => return Some((Ok(value), (input, buf, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (input, buf, true))),
                    }
                }

                match input.next().await {
                    Some(Ok(bytes)) => {
                        buf.extend_from_slice(&bytes);
                        continue;
                    }
                    Some(Err(e)) => return Some((Err(e), (input, buf, true))),
                    None => {
                        // EOF: the remainder, if any, must still be a
                        // well-formed record.
                        let frame = std::mem::take(&mut buf);
                        return match parse_frame(&frame) {
                            Ok(Some(value)) => Some((Ok(value), (input, buf, true))),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (input, buf, true))),
                        };
                    }
                }
            }
        },
    );
    Box::pin(decoded)
}
