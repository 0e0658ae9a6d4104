use core::fmt;

/// Typed failure from a backend operation (buffer creation, uploads).
///
/// Precondition violations are not errors; they are skipped where they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    /// The GPU context is gone; no further GPU calls should be issued.
    ContextLost,
    /// Requested buffer exceeds what the backend can allocate.
    BufferTooLarge { size: usize, limit: usize },
    /// A resource handed to the backend was created by a different backend.
    ForeignResource(&'static str),
    /// Backend-specific failure message.
    Backend(String),
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::ContextLost => write!(f, "GPU context lost"),
            GfxError::BufferTooLarge { size, limit } => {
                write!(f, "buffer of {size} bytes exceeds limit of {limit} bytes")
            }
            GfxError::ForeignResource(what) => write!(f, "{what} was not created by this backend"),
            GfxError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for GfxError {}
