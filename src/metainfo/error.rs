use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when parsing, building or validating torrent metainfo.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file contains invalid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A required field is missing from the torrent file.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field has an invalid value or type.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The info hash is not 20 bytes of hex.
    #[error("invalid info hash length")]
    InvalidInfoHashLength,

    /// The file list and piece list do not describe the same byte stream.
    #[error("inconsistent layout: {0}")]
    InvalidLayout(String),

    /// An I/O error occurred while reading a torrent or source file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
