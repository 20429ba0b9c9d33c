//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialization format of `.torrent` files. Only the subset
//! needed to read and write metainfo lives here: integers, byte strings,
//! lists and dictionaries with byte-string keys.
//!
//! # Examples
//!
//! ```
//! use rlinks::bencode::{decode, encode, Value};
//!
//! let value = decode(b"d4:name4:test12:piece lengthi16384ee").unwrap();
//! assert_eq!(value.get(b"name").and_then(|v| v.as_str()), Some("test"));
//! assert_eq!(value.get(b"piece length").and_then(|v| v.as_integer()), Some(16384));
//!
//! // Dictionaries re-encode with sorted keys, so canonical input round-trips.
//! assert_eq!(encode(&value).unwrap(), b"d4:name4:test12:piece lengthi16384ee");
//! ```
//!
//! Decoding rejects leading zeros in integers, `-0`, non-string dictionary
//! keys, nesting deeper than 64 levels and trailing bytes after the root
//! value.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;
