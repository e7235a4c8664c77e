use thiserror::Error;

use crate::models::VerseKey;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the presentation layer. None of them are fatal; the
/// user can navigate away and repeat the action.
#[derive(Debug, Error)]
pub enum Error {
    #[error("content unavailable: {0}")]
    ContentUnavailable(#[from] Unavailable),

    #[error("could not play audio for {0}")]
    PlaybackFailed(VerseKey),
}

/// Why a chapter list or chapter detail could not be produced.
#[derive(Debug, Error)]
pub enum Unavailable {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("chapter {chapter} lists {expected} verses but {actual} were returned")]
    VerseCountMismatch {
        chapter: u32,
        expected: u32,
        actual: usize,
    },

    #[error("verse {key} is out of order in chapter {chapter}")]
    VerseOrder { chapter: u32, key: String },

    #[error("chapter {chapter} was cut short; page {next_page} was never requested")]
    Truncated { chapter: u32, next_page: u32 },

    #[error("unknown chapter {0}")]
    UnknownChapter(u32),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("send failed: {url}: {message}")]
    Send { url: String, message: String },
}
