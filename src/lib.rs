//! rlinks - find identical files across BitTorrent releases
//!
//! The same content is frequently published in several torrents: a
//! single-file release, a multi-file pack, a re-pack with BEP-47 padding.
//! This library works out which files of one torrent are byte-identical to
//! files of another using only the piece hashes in their metainfo, so a
//! client can hard-link existing data instead of storing it twice.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding
//! - [`metainfo`] - v1 torrent metainfo with BEP-47 padding files, and a builder
//! - [`resolve`] - Piece hash index and the cross-torrent file resolver
//!
//! # Example
//!
//! ```no_run
//! use rlinks::{Metainfo, Resolver};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let seeding = Arc::new(Metainfo::from_file("seeding.torrent")?);
//! let incoming = Metainfo::from_file("incoming.torrent")?;
//!
//! let resolver = Resolver::new(seeding)?;
//! resolver.match_torrent(&incoming, "/downloads/incoming")?;
//!
//! if let Some(links) = resolver.links(&incoming.info_hash) {
//!     for (index, link) in links.matched() {
//!         println!(
//!             "{} -> {}",
//!             incoming.info.files[index].path.display(),
//!             link.file().path.display()
//!         );
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod bencode;
pub mod metainfo;
pub mod resolve;

pub use bencode::{decode, encode, BencodeError, Value};
pub use metainfo::{File, Info, InfoHash, Metainfo, MetainfoError, PieceHash, TorrentBuilder};
pub use resolve::{
    CandidateLinks, Link, LinkResult, PieceHashIndex, PieceLocation, ResolveError, Resolver,
    ResolverConfig,
};
