use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use super::config::ResolverConfig;
use super::error::ResolveError;
use super::index::PieceHashIndex;
use crate::metainfo::{File, Info, InfoHash, Metainfo, PieceHash};

/// A reference file that a candidate file is byte-identical to.
#[derive(Debug, Clone)]
pub struct Link {
    torrent: Arc<Metainfo>,
    file_index: usize,
}

impl Link {
    /// The reference torrent holding the linked file.
    pub fn torrent(&self) -> &Arc<Metainfo> {
        &self.torrent
    }

    pub fn file_index(&self) -> usize {
        self.file_index
    }

    pub fn file(&self) -> &File {
        &self.torrent.info.files[self.file_index]
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.torrent.info_hash == other.torrent.info_hash && self.file_index == other.file_index
    }
}

impl Eq for Link {}

/// Outcome of resolving one candidate file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkResult {
    #[default]
    Unmatched,
    Linked(Link),
}

impl LinkResult {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkResult::Linked(_))
    }

    pub fn link(&self) -> Option<&Link> {
        match self {
            LinkResult::Linked(link) => Some(link),
            LinkResult::Unmatched => None,
        }
    }
}

/// Link results for every file of one candidate torrent, indexed by file.
///
/// Cloning is cheap; the results are shared.
#[derive(Debug, Clone)]
pub struct CandidateLinks {
    info_hash: InfoHash,
    save_path: PathBuf,
    links: Arc<[LinkResult]>,
}

impl CandidateLinks {
    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    /// The save path passed to [`Resolver::match_torrent`]; not interpreted here.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, file_index: usize) -> Option<&LinkResult> {
        self.links.get(file_index)
    }

    pub fn as_slice(&self) -> &[LinkResult] {
        &self.links
    }

    /// Iterates `(candidate file index, link)` for every linked file.
    pub fn matched(&self) -> impl Iterator<Item = (usize, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, result)| result.link().map(|link| (i, link)))
    }

    pub fn match_count(&self) -> usize {
        self.links.iter().filter(|r| r.is_linked()).count()
    }
}

/// Resolves files of candidate torrents against one reference torrent.
///
/// The piece hash index over the reference is built once, on construction.
/// Results accumulate per candidate info hash; matching the same candidate
/// again replaces its previous results. `match_torrent` takes `&self`, so
/// independent candidates may be matched from several threads at once.
pub struct Resolver {
    reference: Arc<Metainfo>,
    index: PieceHashIndex,
    config: ResolverConfig,
    links: DashMap<InfoHash, CandidateLinks>,
}

impl Resolver {
    /// Builds a resolver with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMetadata`] if the reference file list
    /// and piece list are inconsistent.
    pub fn new(reference: Arc<Metainfo>) -> Result<Self, ResolveError> {
        Self::with_config(reference, ResolverConfig::default())
    }

    pub fn with_config(
        reference: Arc<Metainfo>,
        config: ResolverConfig,
    ) -> Result<Self, ResolveError> {
        reference
            .info
            .validate()
            .map_err(ResolveError::reference)?;

        let index = PieceHashIndex::build(&reference.info);
        debug!(
            info_hash = %reference.info_hash,
            locations = index.len(),
            hashes = index.hash_count(),
            "built piece hash index"
        );

        Ok(Self {
            reference,
            index,
            config,
            links: DashMap::new(),
        })
    }

    pub fn reference(&self) -> &Arc<Metainfo> {
        &self.reference
    }

    pub fn index(&self) -> &PieceHashIndex {
        &self.index
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every file of `candidate` against the reference torrent.
    ///
    /// Replaces any results previously recorded for this candidate and
    /// returns the number of files that were linked. `save_path` is kept
    /// alongside the results for whoever creates the links.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMetadata`] if the candidate file list
    /// and piece list are inconsistent. Results are left untouched.
    pub fn match_torrent(
        &self,
        candidate: &Metainfo,
        save_path: impl Into<PathBuf>,
    ) -> Result<usize, ResolveError> {
        let info = &candidate.info;
        info.validate().map_err(ResolveError::candidate)?;

        let links: Arc<[LinkResult]> = if info.piece_length != self.reference.info.piece_length {
            debug!(
                candidate = %candidate.info_hash,
                candidate_piece_length = info.piece_length,
                reference_piece_length = self.reference.info.piece_length,
                "piece lengths differ, nothing can match"
            );
            vec![LinkResult::Unmatched; info.files.len()].into()
        } else {
            let mut claimed = HashSet::new();
            (0..info.files.len())
                .map(|file_index| self.resolve_file(info, file_index, &mut claimed))
                .collect()
        };

        let candidate_links = CandidateLinks {
            info_hash: candidate.info_hash,
            save_path: save_path.into(),
            links,
        };
        let matched = candidate_links.match_count();

        debug!(
            candidate = %candidate.info_hash,
            reference = %self.reference.info_hash,
            files = candidate_links.len(),
            matched,
            "resolved candidate"
        );

        self.links.insert(candidate.info_hash, candidate_links);
        Ok(matched)
    }

    fn resolve_file(
        &self,
        candidate: &Info,
        file_index: usize,
        claimed: &mut HashSet<usize>,
    ) -> LinkResult {
        let file = &candidate.files[file_index];
        if file.is_padding || file.length == 0 || file.length < self.config.min_file_length {
            return LinkResult::Unmatched;
        }

        // the first piece of an unaligned file hashes bytes of the previous file
        if !candidate.is_piece_aligned(file_index) {
            trace!(file_index, offset = file.offset, "candidate file not piece aligned");
            return LinkResult::Unmatched;
        }

        let Some(ours) = piece_hashes(candidate, file_index) else {
            return LinkResult::Unmatched;
        };

        let reference = &self.reference.info;
        for location in self.index.get(&ours[0]) {
            if location.piece_offset != 0 {
                continue;
            }
            if self.config.exclusive_targets && claimed.contains(&location.file_index) {
                continue;
            }
            if reference.files[location.file_index].length != file.length {
                continue;
            }

            // both files start on a boundary and have equal length, so their
            // piece ranges line up one to one, final partial piece included
            let Some(theirs) = piece_hashes(reference, location.file_index) else {
                continue;
            };
            if ours != theirs {
                trace!(
                    file_index,
                    reference_file = location.file_index,
                    "leading piece matched but later pieces differ"
                );
                continue;
            }

            trace!(file_index, reference_file = location.file_index, "linked");
            if self.config.exclusive_targets {
                claimed.insert(location.file_index);
            }
            return LinkResult::Linked(Link {
                torrent: Arc::clone(&self.reference),
                file_index: location.file_index,
            });
        }

        LinkResult::Unmatched
    }

    /// Results for one candidate, if it has been matched.
    pub fn links(&self, candidate: &InfoHash) -> Option<CandidateLinks> {
        self.links.get(candidate).map(|entry| entry.value().clone())
    }

    /// Results for every candidate matched so far, ordered by info hash.
    pub fn results(&self) -> Vec<CandidateLinks> {
        let mut results: Vec<CandidateLinks> =
            self.links.iter().map(|entry| entry.value().clone()).collect();
        results.sort_by_key(|links| links.info_hash);
        results
    }
}

/// Piece hashes covering the file at `file_index`, or `None` for empty files.
fn piece_hashes(info: &Info, file_index: usize) -> Option<&[PieceHash]> {
    let range = info.file_piece_range(file_index)?;
    info.pieces
        .get(*range.start() as usize..=*range.end() as usize)
}
