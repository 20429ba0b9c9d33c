use thiserror::Error;

use crate::metainfo::MetainfoError;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference or candidate metainfo failed layout validation.
    #[error("invalid {side} metadata: {source}")]
    InvalidMetadata {
        side: &'static str,
        #[source]
        source: MetainfoError,
    },
}

impl ResolveError {
    pub(crate) fn reference(source: MetainfoError) -> Self {
        ResolveError::InvalidMetadata {
            side: "reference",
            source,
        }
    }

    pub(crate) fn candidate(source: MetainfoError) -> Self {
        ResolveError::InvalidMetadata {
            side: "candidate",
            source,
        }
    }
}
