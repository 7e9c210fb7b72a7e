// Domain errors - Failure kinds of a single remux attempt

use thiserror::Error;

/// `AVERROR(EINVAL)`
pub const CODE_INVALID_ARGUMENT: i32 = -22;
/// `AVERROR(EIO)`
pub const CODE_IO: i32 = -5;
/// `AVERROR_INVALIDDATA` (`-MKTAG('I','N','D','A')`)
pub const CODE_INVALID_DATA: i32 = -0x4144_4E49;
/// `AVERROR_UNKNOWN` (`-MKTAG('U','N','K','N')`)
pub const CODE_UNKNOWN: i32 = -0x4E4B_4E55;

/// Failure of one pipeline stage.
///
/// Every variant except [`RemuxError::NoStreams`] and [`RemuxError::BadArgs`]
/// keeps the integer code reported by the media collaborator so the entry
/// point can surface it unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemuxError {
    /// Missing or blank source locator / destination path
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Source cannot be opened or demultiplexed at all
    #[error("Failed to open source: {cause}")]
    Open { cause: String, code: i32 },

    /// Stream discovery failed outright
    #[error("Failed to discover source streams: {cause}")]
    Metadata { cause: String, code: i32 },

    /// The mapping policy excluded every source stream
    #[error("No audio or video stream selected for output")]
    NoStreams,

    /// Destination refused to allocate a stream
    #[error("Failed to create output stream: {cause}")]
    StreamCreation { cause: String, code: i32 },

    /// Destination header could not be written
    #[error("Failed to write output header: {cause}")]
    WriteHeader { cause: String, code: i32 },

    /// Mid-stream packet write failure
    #[error("Failed to write packet: {cause}")]
    WriteFrame { cause: String, code: i32 },

    /// Source read failed for a reason other than end of stream
    #[error("Failed to read packet: {cause}")]
    Read { cause: String, code: i32 },

    /// Output sink could not be opened or closed
    #[error("Output I/O failure: {cause}")]
    Io { cause: String, code: i32 },
}

impl RemuxError {
    /// Stage tag used in diagnostics
    pub fn stage(&self) -> &'static str {
        match self {
            RemuxError::BadArgs(_) => "args",
            RemuxError::Open { .. } => "open_input",
            RemuxError::Metadata { .. } => "find_stream_info",
            RemuxError::NoStreams => "no_streams",
            RemuxError::StreamCreation { .. } => "new_stream",
            RemuxError::WriteHeader { .. } => "write_header",
            RemuxError::WriteFrame { .. } => "write_frame",
            RemuxError::Read { .. } => "read_frame",
            RemuxError::Io { .. } => "avio_open",
        }
    }

    /// Negative status code surfaced at the integer entry point
    pub fn code(&self) -> i32 {
        match self {
            RemuxError::BadArgs(_) => CODE_INVALID_ARGUMENT,
            RemuxError::NoStreams => CODE_INVALID_DATA,
            RemuxError::Open { code, .. }
            | RemuxError::Metadata { code, .. }
            | RemuxError::StreamCreation { code, .. }
            | RemuxError::WriteHeader { code, .. }
            | RemuxError::WriteFrame { code, .. }
            | RemuxError::Read { code, .. }
            | RemuxError::Io { code, .. } => {
                if *code < 0 {
                    *code
                } else {
                    CODE_UNKNOWN
                }
            }
        }
    }

    pub fn open(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::Open { cause: cause.into(), code }
    }

    pub fn metadata(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::Metadata { cause: cause.into(), code }
    }

    pub fn stream_creation(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::StreamCreation { cause: cause.into(), code }
    }

    pub fn write_header(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::WriteHeader { cause: cause.into(), code }
    }

    pub fn write_frame(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::WriteFrame { cause: cause.into(), code }
    }

    pub fn read(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::Read { cause: cause.into(), code }
    }

    pub fn io(cause: impl Into<String>, code: i32) -> Self {
        RemuxError::Io { cause: cause.into(), code }
    }
}
