//! Cross-torrent file resolution for hard-link deduplication.
//!
//! Given a reference torrent, [`Resolver`] finds which files of other
//! torrents are byte-identical to one of the reference's files. Nothing is
//! read from disk: equality is decided purely from the piece hashes already
//! present in the metainfo, so a file can only be matched when both sides
//! store it starting on a piece boundary and every piece hash covering it
//! agrees, trailing padding bytes included.
//!
//! # Examples
//!
//! ```
//! use rlinks::metainfo::TorrentBuilder;
//! use rlinks::resolve::Resolver;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let shared = vec![0x5a; 1000];
//!
//! let padded = TorrentBuilder::new("release")
//!     .piece_length(256)
//!     .add_file("shared.bin", shared.clone())
//!     .add_file("extra.nfo", vec![1; 300])
//!     .pad_files(true)
//!     .build_metainfo()?;
//! let single = TorrentBuilder::new("shared")
//!     .piece_length(256)
//!     .add_file("shared.bin", shared)
//!     .pad_tail(true)
//!     .build_metainfo()?;
//!
//! let resolver = Resolver::new(Arc::new(padded))?;
//! assert_eq!(resolver.match_torrent(&single, "/downloads/shared")?, 1);
//!
//! let links = resolver.links(&single.info_hash).unwrap();
//! let (file_index, link) = links.matched().next().unwrap();
//! assert_eq!(file_index, 0);
//! assert_eq!(link.file().path.to_str(), Some("release/shared.bin"));
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! Torrents with different piece lengths never match, and neither do files
//! that are only partially contained in a reference file.

mod config;
mod error;
mod index;
mod resolver;

pub use config::ResolverConfig;
pub use error::ResolveError;
pub use index::{PieceHashIndex, PieceLocation};
pub use resolver::{CandidateLinks, Link, LinkResult, Resolver};

#[cfg(test)]
mod tests;
