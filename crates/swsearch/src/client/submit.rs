//! Submission stream correlation.
//!
//! Submitting a search opens a server-sent-event feed; every well-formed
//! frame carries the hit-list id of the result set being built. The stream is
//! only consumed far enough to learn that id. The upstream is known to cut
//! the connection off after sending its summary and to occasionally emit
//! truncated or garbled frames, so stream errors are tolerated and decode
//! failures downgrade the whole submission to "no results".

use std::collections::BTreeSet;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::SmallWorldClient;
use super::params::{SUBMIT_ENDPOINT, submit_params};
use super::types::{HitListId, SearchError};

#[derive(Deserialize)]
struct SubmitFrame {
    hlid: Value,
}

/// Outcome of parsing a single stream line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Blank keep-alive line.
    Skip,
    /// A frame carrying a hit-list id.
    Id(String),
    /// A frame that could not be decoded.
    Malformed,
}

/// Parse one event line. The `data:` prefix is optional and whitespace
/// after it is tolerated; the payload must be a JSON object with an `hlid`
/// field that is a number or a string.
pub(crate) fn parse_frame(line: &str) -> Frame {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Frame::Skip;
    }

    let payload = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    match serde_json::from_str::<SubmitFrame>(payload) {
        Ok(frame) => match frame.hlid {
            Value::Number(n) => Frame::Id(n.to_string()),
            Value::String(s) => Frame::Id(s),
            _ => Frame::Malformed,
        },
        Err(_) => Frame::Malformed,
    }
}

/// Incremental newline splitter over response body chunks.
///
/// Lines that are not valid UTF-8 are dropped, matching the upstream feed
/// which interleaves binary frames with its JSON events.
pub(crate) struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Ok(text) = String::from_utf8(line) {
                lines.push(text);
            }
        }
        lines
    }

    /// Hand back whatever trails the final newline once the stream ends.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        String::from_utf8(rest).ok()
    }
}

/// Submit one structure and correlate the acknowledgement stream down to at
/// most one hit-list id.
///
/// Returns `Ok(None)` when the search produced no results, including the
/// defensive cases: an empty stream, or a frame whose payload cannot be
/// decoded. A connection cut mid-stream is tolerated and whatever ids were
/// already collected are used; a truncation arriving right after the single
/// valid id is therefore indistinguishable from a clean completion, which is
/// accepted. Observing two distinct ids breaks the service contract and is a
/// fatal [`SearchError::ProtocolViolation`].
pub(crate) async fn submit(
    client: &SmallWorldClient,
    smiles: &str,
) -> Result<Option<HitListId>, SearchError> {
    let url = client.endpoint(SUBMIT_ENDPOINT)?;
    let params = submit_params(client.config(), smiles);
    let response = client.send_get("submit", url, params).await?;

    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::new();
    let mut ids: BTreeSet<String> = BTreeSet::new();
    let mut truncated = false;

    'read: loop {
        let lines = match stream.next().await {
            Some(Ok(chunk)) => buffer.feed(&chunk),
            Some(Err(err)) => {
                // The server cuts the connection after its summary frame.
                warn!(
                    stage = "submit_stream",
                    smiles,
                    error = %err,
                    "submission stream truncated; using ids collected so far"
                );
                truncated = true;
                break 'read;
            }
            None => break 'read,
        };

        for line in lines {
            match parse_frame(&line) {
                Frame::Id(id) => {
                    ids.insert(id);
                }
                Frame::Skip => {}
                Frame::Malformed => {
                    debug!(
                        stage = "submit_stream",
                        smiles, line, "undecodable event frame; treating submission as empty"
                    );
                    return Ok(None);
                }
            }
        }
    }

    if !truncated {
        if let Some(rest) = buffer.finish() {
            match parse_frame(&rest) {
                Frame::Id(id) => {
                    ids.insert(id);
                }
                Frame::Skip => {}
                Frame::Malformed => {
                    debug!(
                        stage = "submit_stream",
                        smiles, "undecodable trailing frame; treating submission as empty"
                    );
                    return Ok(None);
                }
            }
        }
    }

    match ids.len() {
        0 => {
            debug!(stage = "submit", smiles, "no hit-list id observed");
            Ok(None)
        }
        1 => {
            let id = ids.pop_first().expect("set has exactly one element");
            Ok(Some(HitListId(id)))
        }
        _ => Err(SearchError::ProtocolViolation {
            ids: ids.into_iter().collect(),
        }),
    }
}
