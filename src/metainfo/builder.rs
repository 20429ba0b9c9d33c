//! Builder for v1 torrent files, with optional BEP-47 padding.
//!
//! Releases of the same content are often published twice: once as a
//! tightly packed torrent and once with padding files that push every file
//! onto a piece boundary. [`TorrentBuilder`] produces either layout so the
//! two can be compared.
//!
//! # Examples
//!
//! ```
//! use rlinks::metainfo::{Metainfo, TorrentBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = TorrentBuilder::new("album")
//!     .piece_length(16384)
//!     .add_file("01.flac", vec![1u8; 20000])
//!     .add_file("02.flac", vec![2u8; 5000])
//!     .pad_files(true)
//!     .build()?;
//!
//! let metainfo = Metainfo::from_bytes(&bytes)?;
//! // 01.flac, its padding file, then 02.flac on a piece boundary
//! assert_eq!(metainfo.info.files.len(), 3);
//! assert!(metainfo.info.files[1].is_padding);
//! assert_eq!(metainfo.info.files[2].offset % 16384, 0);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use sha1::{Digest, Sha1};

use super::error::MetainfoError;
use super::torrent::{Metainfo, PieceHash};
use crate::bencode::{encode, Value};

/// Default piece length (256 KiB).
pub const DEFAULT_PIECE_LENGTH: u64 = 262144;

#[derive(Debug, Clone)]
struct BuilderFile {
    /// Path components relative to the torrent root.
    path: Vec<String>,
    data: Vec<u8>,
}

/// One entry of the files list: real content or a run of padding zeros.
enum Entry<'a> {
    Data(&'a BuilderFile),
    Pad(u64),
}

impl Entry<'_> {
    fn len(&self) -> u64 {
        match self {
            Entry::Data(file) => file.data.len() as u64,
            Entry::Pad(len) => *len,
        }
    }
}

/// Builder for creating v1 torrent files.
#[derive(Debug)]
pub struct TorrentBuilder {
    name: String,
    files: Vec<BuilderFile>,
    piece_length: u64,
    /// Pad every non-final file to a piece boundary.
    pad_files: bool,
    /// Pad the final file to a piece boundary as well.
    pad_tail: bool,
    piece_overrides: BTreeMap<u32, PieceHash>,
    announce: Option<String>,
    private: bool,
    comment: Option<String>,
    created_by: Option<String>,
    creation_date: Option<i64>,
}

impl TorrentBuilder {
    /// Creates a new torrent builder with the given name.
    ///
    /// The name is the file name of a single-file torrent and the root
    /// directory of a multi-file torrent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            piece_length: DEFAULT_PIECE_LENGTH,
            pad_files: false,
            pad_tail: false,
            piece_overrides: BTreeMap::new(),
            announce: None,
            private: false,
            comment: None,
            created_by: Some(format!("rlinks/{}", env!("CARGO_PKG_VERSION"))),
            creation_date: None,
        }
    }

    pub fn piece_length(mut self, length: u64) -> Self {
        self.piece_length = length;
        self
    }

    /// Adds a file with raw data. The path is relative to the torrent root.
    pub fn add_file(mut self, path: impl AsRef<Path>, data: Vec<u8>) -> Self {
        let path = path
            .as_ref()
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_string_lossy().into_owned(),
                Component::CurDir => ".".to_string(),
                _ => "..".to_string(),
            })
            .collect();

        self.files.push(BuilderFile { path, data });
        self
    }

    /// Adds a file from disk under its file name.
    pub fn add_file_from_path(self, path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .ok_or(MetainfoError::InvalidField("file path"))?
            .to_owned();
        let data = std::fs::read(path)?;
        Ok(self.add_file(name, data))
    }

    /// Inserts a padding file after each file (except the last) that does
    /// not end on a piece boundary.
    pub fn pad_files(mut self, enabled: bool) -> Self {
        self.pad_files = enabled;
        self
    }

    /// Pads the last file to a piece boundary too.
    pub fn pad_tail(mut self, enabled: bool) -> Self {
        self.pad_tail = enabled;
        self
    }

    /// Replaces the computed hash of piece `index` with `hash`.
    ///
    /// The resulting torrent no longer verifies against its content; this
    /// exists to construct metainfo with placeholder or colliding hashes.
    pub fn set_piece_hash(mut self, index: u32, hash: PieceHash) -> Self {
        self.piece_overrides.insert(index, hash);
        self
    }

    pub fn add_tracker(mut self, url: impl Into<String>) -> Self {
        self.announce = Some(url.into());
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn creation_date(mut self, timestamp: i64) -> Self {
        self.creation_date = Some(timestamp);
        self
    }

    /// Builds the torrent file and returns the bencoded bytes.
    pub fn build(self) -> Result<Vec<u8>, MetainfoError> {
        self.validate()?;

        let mut root = BTreeMap::new();
        root.insert(Bytes::from_static(b"info"), self.build_info()?);
        self.add_common_fields(&mut root);

        Ok(encode(&Value::Dict(root))?)
    }

    /// Builds the torrent and parses it back.
    pub fn build_metainfo(self) -> Result<Metainfo, MetainfoError> {
        Metainfo::from_bytes(&self.build()?)
    }

    fn validate(&self) -> Result<(), MetainfoError> {
        if self.name.is_empty() {
            return Err(MetainfoError::MissingField("name"));
        }
        if self.files.is_empty() {
            return Err(MetainfoError::MissingField("files"));
        }
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }

        for file in &self.files {
            if file.path.is_empty() {
                return Err(MetainfoError::InvalidField("empty file path"));
            }
            for component in &file.path {
                if component == "." || component == ".." || component.is_empty() {
                    return Err(MetainfoError::InvalidField("invalid path component"));
                }
            }
        }

        Ok(())
    }

    /// Lays out files and padding in stream order.
    fn entries(&self) -> Vec<Entry<'_>> {
        let last = self.files.len() - 1;
        let mut entries = Vec::with_capacity(self.files.len() * 2);
        let mut position = 0u64;

        for (i, file) in self.files.iter().enumerate() {
            entries.push(Entry::Data(file));
            position += file.data.len() as u64;

            let wants_pad = if i == last { self.pad_tail } else { self.pad_files };
            let remainder = position % self.piece_length;
            if wants_pad && !file.data.is_empty() && remainder != 0 {
                let pad = self.piece_length - remainder;
                entries.push(Entry::Pad(pad));
                position += pad;
            }
        }

        entries
    }

    fn compute_pieces(&self, entries: &[Entry<'_>]) -> Result<Vec<PieceHash>, MetainfoError> {
        let mut stream = Vec::with_capacity(entries.iter().map(|e| e.len() as usize).sum());
        for entry in entries {
            match entry {
                Entry::Data(file) => stream.extend_from_slice(&file.data),
                Entry::Pad(len) => stream.extend(std::iter::repeat_n(0u8, *len as usize)),
            }
        }

        let mut pieces: Vec<PieceHash> = stream
            .chunks(self.piece_length as usize)
            .map(|chunk| Sha1::digest(chunk).into())
            .collect();

        for (&index, hash) in &self.piece_overrides {
            let slot = pieces
                .get_mut(index as usize)
                .ok_or(MetainfoError::InvalidField("piece hash index out of range"))?;
            *slot = *hash;
        }

        Ok(pieces)
    }

    fn build_info(&self) -> Result<Value, MetainfoError> {
        let entries = self.entries();
        let pieces = self.compute_pieces(&entries)?;

        let mut info = BTreeMap::new();
        info.insert(Bytes::from_static(b"name"), Value::string(&self.name));
        info.insert(
            Bytes::from_static(b"piece length"),
            Value::Integer(self.piece_length as i64),
        );
        info.insert(
            Bytes::from_static(b"pieces"),
            Value::from(pieces.concat()),
        );
        if self.private {
            info.insert(Bytes::from_static(b"private"), Value::Integer(1));
        }

        match entries.as_slice() {
            [Entry::Data(file)] if file.path.len() == 1 => {
                info.insert(
                    Bytes::from_static(b"length"),
                    Value::Integer(file.data.len() as i64),
                );
            }
            _ => {
                let files = entries.iter().map(Self::file_entry).collect::<Vec<_>>();
                info.insert(Bytes::from_static(b"files"), Value::List(files));
            }
        }

        Ok(Value::Dict(info))
    }

    fn file_entry(entry: &Entry<'_>) -> Value {
        let mut dict = BTreeMap::new();
        dict.insert(
            Bytes::from_static(b"length"),
            Value::Integer(entry.len() as i64),
        );

        let path = match entry {
            Entry::Data(file) => file.path.iter().map(|p| Value::string(p)).collect(),
            Entry::Pad(len) => {
                dict.insert(Bytes::from_static(b"attr"), Value::string("p"));
                vec![Value::string(".pad"), Value::string(&len.to_string())]
            }
        };
        dict.insert(Bytes::from_static(b"path"), Value::List(path));

        Value::Dict(dict)
    }

    fn add_common_fields(&self, root: &mut BTreeMap<Bytes, Value>) {
        let optional = [
            (b"announce".as_slice(), &self.announce),
            (b"comment".as_slice(), &self.comment),
            (b"created by".as_slice(), &self.created_by),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                root.insert(Bytes::copy_from_slice(key), Value::string(value));
            }
        }

        let timestamp = self.creation_date.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });
        root.insert(
            Bytes::from_static(b"creation date"),
            Value::Integer(timestamp),
        );
    }
}
