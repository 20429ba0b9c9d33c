//! Torrent metainfo handling ([BEP-3], [BEP-47]).
//!
//! This is the metadata container the resolver reads: the ordered file list
//! (with offsets and padding flags), the piece length and the SHA-1 hash of
//! every piece of the concatenated content stream.
//!
//! # Parsing a torrent file
//!
//! ```no_run
//! use rlinks::metainfo::Metainfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Metainfo::from_file("example.torrent")?;
//! torrent.info.validate()?;
//!
//! println!("Info hash: {}", torrent.info_hash);
//! println!("Pieces: {} x {} bytes", torrent.info.piece_count(), torrent.info.piece_length);
//! for (index, file) in torrent.info.files.iter().enumerate() {
//!     let kind = if file.is_padding { "pad" } else { "file" };
//!     println!("{index}: {kind} {} ({} bytes)", file.path.display(), file.length);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Piece layout
//!
//! Files are laid end to end in one stream that is cut into pieces of
//! `piece length` bytes; only the last piece may be shorter. A file that
//! does not start on a piece boundary shares its first piece with the
//! previous file. Padding files (`attr` containing `p`) are runs of zeros
//! inserted so that the next file starts on a boundary.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-47]: http://bittorrent.org/beps/bep_0047.html

mod builder;
mod error;
mod info_hash;
mod torrent;

pub use builder::{TorrentBuilder, DEFAULT_PIECE_LENGTH};
pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{File, Info, Metainfo, PieceHash};
