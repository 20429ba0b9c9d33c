use std::collections::BTreeMap;

use crate::metainfo::{Info, PieceHash};

/// Where a piece sits relative to the reference file it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceLocation {
    /// Index of the file in the reference torrent's file list.
    pub file_index: usize,
    /// Piece index relative to the piece holding the file's first byte.
    pub piece_offset: u32,
}

/// Multi-valued map from piece hash to every reference location carrying it.
///
/// Identical content legitimately produces identical hashes (duplicate
/// files, zero-filled regions, placeholder hashes), so each hash keeps all
/// of its locations in insertion order: reference file order, then piece
/// order.
#[derive(Debug, Default)]
pub struct PieceHashIndex {
    entries: BTreeMap<PieceHash, Vec<PieceLocation>>,
    len: usize,
}

impl PieceHashIndex {
    /// Indexes every piece that belongs to exactly one non-padding file.
    ///
    /// A piece belongs to the file holding its first byte. It is skipped when
    /// it runs past that file's end into another non-padding file, unless it
    /// is the file's first piece.
    ///
    /// `info` must have passed [`Info::validate`].
    pub fn build(info: &Info) -> Self {
        let mut index = Self::default();
        let piece_length = info.piece_length;
        if piece_length == 0 {
            return index;
        }

        for (file_index, file) in info.files.iter().enumerate() {
            if file.is_padding || file.length == 0 {
                continue;
            }

            let base = file.offset / piece_length;
            let first = file.offset.div_ceil(piece_length);
            let end = file.end().div_ceil(piece_length);

            for piece in first..end {
                let Some(hash) = info.pieces.get(piece as usize) else {
                    break;
                };
                // validated layouts have at most u32::MAX pieces
                let piece_offset = (piece - base) as u32;
                let piece_end = (piece + 1)
                    .saturating_mul(piece_length)
                    .min(info.total_length);

                if piece_offset != 0
                    && piece_end > file.end()
                    && !only_padding_before(info, file_index + 1, piece_end)
                {
                    continue;
                }

                index.insert(
                    *hash,
                    PieceLocation {
                        file_index,
                        piece_offset,
                    },
                );
            }
        }

        index
    }

    fn insert(&mut self, hash: PieceHash, location: PieceLocation) {
        self.entries.entry(hash).or_default().push(location);
        self.len += 1;
    }

    /// Returns every location with this exact hash, in insertion order.
    pub fn get(&self, hash: &PieceHash) -> &[PieceLocation] {
        self.entries.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of indexed locations.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct hashes.
    pub fn hash_count(&self) -> usize {
        self.entries.len()
    }
}

/// Returns `true` if every file from `start` up to byte `end` is padding or empty.
fn only_padding_before(info: &Info, start: usize, end: u64) -> bool {
    info.files[start..]
        .iter()
        .take_while(|f| f.offset < end)
        .all(|f| f.is_padding || f.length == 0)
}
