use std::io::{self, Write};

use tracing::debug;

use crate::generate::progress::ProgressSnapshot;
use crate::state::session::WriteSession;

/// How the chunk loop stopped when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    Completed,
    Cancelled,
}

/// Writes `chunk` into `sink` until the session reaches its target or is
/// cancelled. The token is only consulted between chunks, so a write in
/// flight always finishes. The final chunk is cut to the remaining length.
pub fn write_filler<W, F>(
    sink: &mut W,
    session: &mut WriteSession,
    chunk: &[u8],
    mut on_progress: F,
) -> io::Result<LoopEnd>
where
    W: Write,
    F: FnMut(&ProgressSnapshot),
{
    if chunk.is_empty() && !session.is_complete() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk buffer is empty",
        ));
    }

    while !session.should_stop() {
        let to_write = (chunk.len() as u64).min(session.remaining()) as usize;
        sink.write_all(&chunk[..to_write])?;
        session.record(to_write as u64);

        let snapshot = session.snapshot();
        debug!(
            written = snapshot.bytes_written,
            target = snapshot.target_size,
            "chunk flushed"
        );
        on_progress(&snapshot);
    }

    if session.is_complete() {
        Ok(LoopEnd::Completed)
    } else {
        Ok(LoopEnd::Cancelled)
    }
}
