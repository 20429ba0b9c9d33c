use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::{Range, RangeInclusive};
use std::path::{Path, PathBuf};

/// SHA-1 digest of one piece of the concatenated content stream.
pub type PieceHash = [u8; 20];

/// First path component used by legacy padding files that predate the `attr` key.
const LEGACY_PAD_DIR: &str = ".pad";

/// A parsed v1 torrent file.
///
/// # Examples
///
/// ```no_run
/// use rlinks::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let metainfo = Metainfo::from_file("release.torrent")?;
///
/// println!("{} ({})", metainfo.info.name, metainfo.info_hash);
/// for file in metainfo.info.files.iter().filter(|f| !f.is_padding) {
///     println!("  {} {} bytes @ {}", file.path.display(), file.length, file.offset);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// The info dictionary containing file and piece information.
    pub info: Info,
    /// SHA-1 of the bencoded info dictionary.
    pub info_hash: InfoHash,
    /// Primary tracker URL.
    pub announce: Option<String>,
    /// Unix timestamp when the torrent was created.
    pub creation_date: Option<i64>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    raw_info: Bytes,
}

/// The info dictionary from a torrent file.
#[derive(Debug, Clone)]
pub struct Info {
    /// Suggested name for the file or directory.
    pub name: String,
    /// Number of bytes per piece. Every piece but the last has exactly this size.
    pub piece_length: u64,
    /// Hash of each piece, in stream order.
    pub pieces: Vec<PieceHash>,
    /// Files in stream order, padding files included.
    pub files: Vec<File>,
    /// Total size of all files combined, padding included.
    pub total_length: u64,
    pub private: bool,
}

/// A file within a torrent.
///
/// Identity is the file's position in [`Info::files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Path to the file (relative to the download directory).
    pub path: PathBuf,
    /// Size of the file in bytes.
    pub length: u64,
    /// Byte offset of the file within the concatenated content stream.
    pub offset: u64,
    /// Padding files ([BEP-47](http://bittorrent.org/beps/bep_0047.html)) hold
    /// only zeros and exist to align the next file to a piece boundary.
    pub is_padding: bool,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, length: u64, offset: u64) -> Self {
        Self {
            path: path.into(),
            length,
            offset,
            is_padding: false,
        }
    }

    pub fn padding(length: u64, offset: u64) -> Self {
        Self {
            path: PathBuf::from(LEGACY_PAD_DIR).join(length.to_string()),
            length,
            offset,
            is_padding: true,
        }
    }

    /// Byte offset one past the end of the file.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

impl Metainfo {
    /// Parses a torrent file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid bencode, if required fields
    /// are missing or have the wrong type, or if the `pieces` string is not a
    /// multiple of 20 bytes. The piece/file layout itself is checked
    /// separately by [`Info::validate`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        let dict = root.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;

        let raw_info = Bytes::from(encode(info_value)?);
        let info_hash = InfoHash::from_info_bytes(&raw_info);
        let info = parse_info(info_value)?;

        Ok(Self {
            info,
            info_hash,
            announce: string_field(dict, b"announce"),
            creation_date: dict
                .get(b"creation date".as_slice())
                .and_then(|v| v.as_integer()),
            comment: string_field(dict, b"comment"),
            created_by: string_field(dict, b"created by"),
            raw_info,
        })
    }

    /// Reads and parses a `.torrent` file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Returns the raw bencoded info dictionary the info hash was computed from.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

impl Info {
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Size in bytes of the piece at `index`; only the final piece may be short.
    pub fn piece_size(&self, index: u32) -> Option<u64> {
        let start = u64::from(index).checked_mul(self.piece_length)?;
        if start >= self.total_length {
            return None;
        }
        Some((self.total_length - start).min(self.piece_length))
    }

    /// Inclusive range of piece indices overlapping the file at `file_index`.
    ///
    /// Returns `None` for zero-length files, which cover no piece, and for
    /// indices past the end of the file list.
    pub fn file_piece_range(&self, file_index: usize) -> Option<RangeInclusive<u32>> {
        let file = self.files.get(file_index)?;
        if file.length == 0 || self.piece_length == 0 {
            return None;
        }
        let first = u32::try_from(file.offset / self.piece_length).ok()?;
        let last = u32::try_from((file.end() - 1) / self.piece_length).ok()?;
        Some(first..=last)
    }

    /// Returns `true` if the file at `file_index` starts on a piece boundary.
    pub fn is_piece_aligned(&self, file_index: usize) -> bool {
        self.piece_length != 0
            && self
                .files
                .get(file_index)
                .is_some_and(|f| f.offset % self.piece_length == 0)
    }

    /// Checks that the file list and the piece list describe the same stream.
    ///
    /// Piece range arithmetic elsewhere assumes this holds, so callers
    /// receiving metainfo from untrusted sources should validate first.
    pub fn validate(&self) -> Result<(), MetainfoError> {
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidLayout("piece length is zero".into()));
        }

        let mut expected_offset = 0u64;
        for (index, file) in self.files.iter().enumerate() {
            if file.offset != expected_offset {
                return Err(MetainfoError::InvalidLayout(format!(
                    "file {} starts at byte {}, expected {}",
                    index, file.offset, expected_offset
                )));
            }
            expected_offset = file.offset.checked_add(file.length).ok_or_else(|| {
                MetainfoError::InvalidLayout(format!("file {} overflows the stream", index))
            })?;
        }

        if expected_offset != self.total_length {
            return Err(MetainfoError::InvalidLayout(format!(
                "files cover {} bytes but total length is {}",
                expected_offset, self.total_length
            )));
        }

        let expected_pieces = self.total_length.div_ceil(self.piece_length);
        if self.pieces.len() as u64 != expected_pieces {
            return Err(MetainfoError::InvalidLayout(format!(
                "{} piece hashes for {} pieces",
                self.pieces.len(),
                expected_pieces
            )));
        }

        if expected_pieces > u64::from(u32::MAX) {
            return Err(MetainfoError::InvalidLayout("too many pieces".into()));
        }

        // piece boundaries up to the end of the last piece must fit in a u64
        if expected_pieces.checked_mul(self.piece_length).is_none() {
            return Err(MetainfoError::InvalidLayout(
                "piece boundaries overflow the stream".into(),
            ));
        }

        Ok(())
    }
}

fn string_field(dict: &BTreeMap<Bytes, Value>, key: &[u8]) -> Option<String> {
    dict.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn parse_length(value: Option<&Value>, field: &'static str) -> Result<u64, MetainfoError> {
    let length = value
        .and_then(|v| v.as_integer())
        .ok_or(MetainfoError::MissingField(field))?;
    u64::try_from(length).map_err(|_| MetainfoError::InvalidField(field))
}

fn parse_info(value: &Value) -> Result<Info, MetainfoError> {
    let dict = value.as_dict().ok_or(MetainfoError::InvalidField("info"))?;

    let name = dict
        .get(b"name".as_slice())
        .and_then(|v| v.as_str())
        .ok_or(MetainfoError::MissingField("name"))?
        .to_string();

    let piece_length = parse_length(dict.get(b"piece length".as_slice()), "piece length")?;

    let pieces_bytes = dict
        .get(b"pieces".as_slice())
        .and_then(|v| v.as_bytes())
        .ok_or(MetainfoError::MissingField("pieces"))?;

    if pieces_bytes.len() % 20 != 0 {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    let pieces: Vec<PieceHash> = pieces_bytes
        .chunks_exact(20)
        .map(|chunk| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            hash
        })
        .collect();

    let private = dict
        .get(b"private".as_slice())
        .and_then(|v| v.as_integer())
        == Some(1);

    let files = if let Some(length) = dict.get(b"length".as_slice()) {
        vec![File::new(&name, parse_length(Some(length), "length")?, 0)]
    } else if let Some(entries) = dict.get(b"files".as_slice()).and_then(|v| v.as_list()) {
        let mut files = Vec::with_capacity(entries.len());
        let mut offset = 0u64;

        for entry in entries {
            let length = parse_length(entry.get(b"length"), "file length")?;
            let components: Vec<&str> = entry
                .get(b"path")
                .and_then(|v| v.as_list())
                .ok_or(MetainfoError::MissingField("file path"))?
                .iter()
                .map(|p| p.as_str().ok_or(MetainfoError::InvalidField("file path")))
                .collect::<Result<_, _>>()?;

            let is_padding = entry
                .get(b"attr")
                .and_then(|v| v.as_bytes())
                .is_some_and(|attr| attr.contains(&b'p'))
                || components.first() == Some(&LEGACY_PAD_DIR);

            let path: PathBuf = std::iter::once(name.as_str()).chain(components).collect();

            files.push(File {
                path,
                length,
                offset,
                is_padding,
            });

            offset = offset
                .checked_add(length)
                .ok_or(MetainfoError::InvalidField("file length"))?;
        }

        files
    } else {
        return Err(MetainfoError::MissingField("length or files"));
    };

    let total_length = files.last().map(File::end).unwrap_or(0);

    Ok(Info {
        name,
        piece_length,
        pieces,
        files,
        total_length,
        private,
    })
}
