/// Failure modes while decoding a send stream.
///
/// All variants are hard errors: the decoder stops at the first one and
/// any partially decoded commands should be discarded by the caller.
/// Tolerated irregularities (unknown commands, unknown attribute tags)
/// are not errors; they are surfaced in the decoded records instead.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The byte stream is not a well-formed send stream.
    #[error("malformed stream at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// The envelope names a stream version this build does not accept.
    #[error("unsupported stream version {got} (supported: {supported:?})")]
    UnsupportedVersion { got: u32, supported: Vec<u32> },

    /// Command checksum verification failed (only with verification on).
    #[error("command checksum mismatch at offset {offset}: expected {expected:#010x}, got {got:#010x}")]
    CorruptCommand {
        offset: usize,
        expected: u32,
        got: u32,
    },

    /// The buffer ran out before the `end` command.
    #[error("stream truncated at offset {offset} before the end command")]
    Truncated { offset: usize },

    /// Cooperative cancellation was requested.
    #[error("decoding cancelled")]
    Cancelled,
}

impl StreamError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        StreamError::Malformed {
            offset,
            reason: reason.into(),
        }
    }
}
