//! Server-Sent Events rendering of a finished reply.

use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream};

/// Maximum characters per streamed chunk
pub const STREAM_CHUNK_CHARS: usize = 12;

/// Terminal event payload
pub const DONE_MARKER: &str = "[DONE]";

/// Split `text` into pieces of at most `size` chars, never inside a code point
pub fn chunk_reply(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// One `data:` event per chunk, then `data: [DONE]`.
///
/// Chunks are sent as JSON strings so line breaks arrive verbatim and a chunk
/// that reads `[DONE]` is never mistaken for the bare terminal marker.
pub fn reply_event_stream(
    reply: &str,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>> + Send + 'static> {
    let events: Vec<Result<Event, axum::Error>> = chunk_reply(reply, STREAM_CHUNK_CHARS)
        .into_iter()
        .map(|chunk| Event::default().json_data(chunk))
        .chain(std::iter::once(Ok(Event::default().data(DONE_MARKER))))
        .collect();

    Sse::new(stream::iter(events))
}
