use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a .bvh text is rejected. Lines are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A section keyword (`HIERARCHY`, `MOTION`) was not found
    #[error("missing {0} section")]
    MissingSection(&'static str),

    #[error("line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: CHANNELS declares {declared} channels but lists {listed}")]
    ChannelCountMismatch {
        line: usize,
        declared: usize,
        listed: usize,
    },

    #[error("line {line}: unknown channel '{tag}'")]
    UnknownChannel { line: usize, tag: String },

    #[error("line {line}: channel '{tag}' declared twice for joint '{joint}'")]
    DuplicateChannel {
        line: usize,
        joint: String,
        tag: String,
    },

    /// Position and rotation channels come in complete triples
    #[error("line {line}: joint '{joint}' declares {count} {kind} channel(s), expected 0 or 3")]
    IncompleteChannels {
        line: usize,
        joint: String,
        kind: &'static str,
        count: usize,
    },

    #[error("line {line}: CHANNELS for joint '{joint}' must come before its children")]
    ChannelsAfterChildren { line: usize, joint: String },

    #[error("line {line}: joint '{joint}' has no OFFSET")]
    MissingOffset { line: usize, joint: String },

    #[error("skeleton declares no channels")]
    NoChannels,

    #[error("line {line}: invalid frame time '{value}', expected a positive number of seconds")]
    InvalidFrameTime { line: usize, value: String },

    #[error("motion declares zero frames")]
    NoFrames,

    #[error("line {line}: motion row has {found} values, expected {expected}")]
    RowLength {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("motion declares {declared} frames but contains {found} rows")]
    FrameCountMismatch { declared: usize, found: usize },
}

/// Error type for loading a skeleton from disk
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, FormatError>;
