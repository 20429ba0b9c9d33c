/// Tuning knobs for a [`Resolver`](super::Resolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Link each reference file to at most one file per candidate torrent.
    ///
    /// When several candidate files are identical, only the first one (in
    /// candidate order) is linked to a given reference file.
    pub exclusive_targets: bool,
    /// Candidate files shorter than this are never linked. Zero-length files
    /// are never linked regardless.
    pub min_file_length: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exclusive_targets: false,
            min_file_length: 1,
        }
    }
}

impl ResolverConfig {
    pub fn exclusive_targets(mut self, exclusive: bool) -> Self {
        self.exclusive_targets = exclusive;
        self
    }

    pub fn min_file_length(mut self, length: u64) -> Self {
        self.min_file_length = length;
        self
    }
}
