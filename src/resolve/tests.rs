use std::sync::Arc;

use super::*;
use crate::metainfo::{Metainfo, MetainfoError, TorrentBuilder};

const PIECE: u64 = 64;

const SHARED: usize = 1000;
const SMALL: usize = 100;

/// Deterministic, non-periodic filler so distinct files never share pieces.
fn content(seed: u8, len: usize) -> Vec<u8> {
    (0..len as u32)
        .map(|i| ((i * 131 + u32::from(seed) * 17 + (i >> 3)) % 251) as u8)
        .collect()
}

fn shared() -> Vec<u8> {
    content(1, SHARED)
}

fn small() -> Vec<u8> {
    content(2, SMALL)
}

/// Test torrents modelled on a release published in several layouts.
///
/// `test1` starts with the shared file, `test2` and `test3` push it off a
/// piece boundary. The `_pad_files` variants align every file.
fn corpus(name: &str) -> Metainfo {
    let (base, padded) = match name.strip_suffix("_pad_files") {
        Some(base) => (base, true),
        None => (name, false),
    };

    let builder = TorrentBuilder::new(base).piece_length(PIECE);
    let builder = match base {
        "test1" => builder
            .add_file("shared.bin", shared())
            .add_file("small.bin", small())
            .add_file("a_only.bin", content(10, 500)),
        "test2" => builder
            .add_file("b_only.bin", content(20, 300))
            .add_file("shared.bin", shared())
            .add_file("small.bin", small())
            .add_file("b_tail.bin", content(21, 200)),
        "test3" => builder
            .add_file("c_only.bin", content(30, 777))
            .add_file("small.bin", small())
            .add_file("shared.bin", shared())
            .add_file("c_tail.bin", content(31, 50)),
        "test1_single" => builder.add_file("shared.bin", shared()),
        "test1_single_padded" => builder.add_file("shared.bin", shared()).pad_tail(true),
        other => panic!("unknown corpus torrent {other}"),
    };

    builder.pad_files(padded).build_metainfo().unwrap()
}

fn count_matches(reference: &Metainfo, candidate: &Metainfo) -> usize {
    let resolver = Resolver::new(Arc::new(reference.clone())).unwrap();
    let matched = resolver.match_torrent(candidate, ".").unwrap();
    assert_eq!(
        resolver.links(&candidate.info_hash).unwrap().match_count(),
        matched
    );
    matched
}

#[test]
fn test_corpus_expected_matches() {
    let cases = [
        // shared file is not aligned in test2/test3
        ("test2", "test1_pad_files", 0),
        ("test3", "test1_pad_files", 0),
        // aligned at the start of test1, but its tail runs into the next file
        ("test1", "test1_pad_files", 0),
        ("test2", "test1_single", 0),
        // fully padded layouts agree on the shared and the small file
        ("test2_pad_files", "test1_pad_files", 2),
        ("test3_pad_files", "test1_pad_files", 2),
        ("test3_pad_files", "test2_pad_files", 2),
        ("test1_pad_files", "test2_pad_files", 2),
        ("test1_pad_files", "test3_pad_files", 2),
        ("test2_pad_files", "test3_pad_files", 2),
        // the single-file torrent's last piece is short, so its hash differs
        ("test1_pad_files", "test1_single", 0),
        ("test1_pad_files", "test1_single_padded", 1),
    ];

    for (reference, candidate, expected) in cases {
        let matched = count_matches(&corpus(reference), &corpus(candidate));
        assert_eq!(
            matched, expected,
            "{reference} <- {candidate}: expected {expected} matches, got {matched}"
        );
    }
}

#[test]
fn test_misaligned_pairs_are_symmetric() {
    let pairs = [
        ("test1", "test1_pad_files"),
        ("test2", "test1_pad_files"),
        ("test3", "test2_pad_files"),
        ("test2", "test3"),
        ("test1_pad_files", "test1_single"),
    ];

    for (a, b) in pairs {
        let (a, b) = (corpus(a), corpus(b));
        assert_eq!(count_matches(&a, &b), 0);
        assert_eq!(count_matches(&b, &a), 0);
    }
}

#[test]
fn test_padded_pair_links_correct_files() {
    let reference = Arc::new(corpus("test1_pad_files"));
    let candidate = corpus("test3_pad_files");
    let resolver = Resolver::new(Arc::clone(&reference)).unwrap();
    resolver.match_torrent(&candidate, "/srv/test3").unwrap();

    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.len(), candidate.info.files.len());
    assert_eq!(links.save_path().to_str(), Some("/srv/test3"));

    for (file_index, link) in links.matched() {
        let ours = &candidate.info.files[file_index];
        assert_eq!(ours.path.file_name(), link.file().path.file_name());
        assert_eq!(ours.length, link.file().length);
        assert!(Arc::ptr_eq(link.torrent(), &reference));
    }

    // padding entries are present but never linked
    for (file, result) in candidate.info.files.iter().zip(links.as_slice()) {
        if file.is_padding {
            assert_eq!(*result, LinkResult::Unmatched);
        }
    }
}

#[test]
fn test_unpadded_small_file_matches_when_following_bytes_agree() {
    let build = |tail_seed| {
        TorrentBuilder::new("release")
            .piece_length(PIECE)
            .add_file("small.bin", small())
            .add_file("shared.bin", shared())
            .add_file("tail.bin", content(tail_seed, 90))
            .build_metainfo()
            .unwrap()
    };
    let (a, b) = (build(40), build(41));

    let resolver = Resolver::new(Arc::new(a)).unwrap();
    assert_eq!(resolver.match_torrent(&b, ".").unwrap(), 1);

    let links = resolver.links(&b.info_hash).unwrap();
    assert_eq!(links.get(0).and_then(|r| r.link()).map(|l| l.file_index()), Some(0));
    // shared.bin starts at byte 100, which is not a piece boundary
    assert_eq!(links.get(1), Some(&LinkResult::Unmatched));
}

#[test]
fn test_range_lookup_duplicated_hashes() {
    const SENTINEL: [u8; 20] = [0xff; 20];

    let build = |second_hash| {
        TorrentBuilder::new("dir")
            .piece_length(1024)
            .add_file("tmp1", vec![0u8; 1024])
            .add_file("tmp2", vec![0u8; 1024])
            .set_piece_hash(0, SENTINEL)
            .set_piece_hash(1, second_hash)
            .build_metainfo()
            .unwrap()
    };
    let reference = build(SENTINEL);
    let candidate = build(*b"01234567890123456789");

    let resolver = Resolver::new(Arc::new(reference)).unwrap();
    assert_eq!(
        resolver.index().get(&SENTINEL),
        &[
            PieceLocation {
                file_index: 0,
                piece_offset: 0
            },
            PieceLocation {
                file_index: 1,
                piece_offset: 0
            },
        ]
    );

    assert_eq!(resolver.match_torrent(&candidate, ".").unwrap(), 1);
    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.get(0).and_then(|r| r.link()).map(|l| l.file_index()), Some(0));
    assert_eq!(links.get(1), Some(&LinkResult::Unmatched));
}

#[test]
fn test_shared_leading_piece_resolves_to_later_file() {
    let lead = vec![b'a'; PIECE as usize];
    let with_tail = |byte: u8| {
        let mut data = lead.clone();
        data.extend(std::iter::repeat_n(byte, PIECE as usize));
        data
    };

    let reference = TorrentBuilder::new("dir")
        .piece_length(PIECE)
        .add_file("x.bin", with_tail(b'b'))
        .add_file("y.bin", with_tail(b'c'))
        .build_metainfo()
        .unwrap();
    let candidate = TorrentBuilder::new("y.bin")
        .piece_length(PIECE)
        .add_file("y.bin", with_tail(b'c'))
        .build_metainfo()
        .unwrap();

    let resolver = Resolver::new(Arc::new(reference)).unwrap();
    assert_eq!(resolver.index().get(&candidate.info.pieces[0]).len(), 2);
    assert_eq!(resolver.match_torrent(&candidate, ".").unwrap(), 1);

    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.get(0).and_then(|r| r.link()).map(|l| l.file_index()), Some(1));
}

#[test]
fn test_difference_in_last_byte_is_not_a_match() {
    let mut altered = shared();
    altered[SHARED - 1] ^= 0x01;

    let reference = TorrentBuilder::new("shared.bin")
        .piece_length(PIECE)
        .add_file("shared.bin", shared())
        .build_metainfo()
        .unwrap();
    let candidate = TorrentBuilder::new("shared.bin")
        .piece_length(PIECE)
        .add_file("shared.bin", altered)
        .build_metainfo()
        .unwrap();

    assert_eq!(count_matches(&reference, &candidate), 0);
}

#[test]
fn test_prefix_of_longer_file_is_not_a_match() {
    let reference = TorrentBuilder::new("long.bin")
        .piece_length(PIECE)
        .add_file("long.bin", content(5, 256))
        .build_metainfo()
        .unwrap();
    let candidate = TorrentBuilder::new("short.bin")
        .piece_length(PIECE)
        .add_file("short.bin", content(5, 128))
        .build_metainfo()
        .unwrap();

    assert_eq!(count_matches(&reference, &candidate), 0);
    assert_eq!(count_matches(&candidate, &reference), 0);
}

#[test]
fn test_different_piece_lengths_never_match() {
    let reference = corpus("test1_pad_files");
    let candidate = TorrentBuilder::new("test1")
        .piece_length(PIECE * 2)
        .add_file("shared.bin", shared())
        .add_file("small.bin", small())
        .pad_files(true)
        .build_metainfo()
        .unwrap();

    let resolver = Resolver::new(Arc::new(reference)).unwrap();
    assert_eq!(resolver.match_torrent(&candidate, ".").unwrap(), 0);

    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.len(), candidate.info.files.len());
    assert!(links.as_slice().iter().all(|r| !r.is_linked()));
}

#[test]
fn test_zero_length_files_never_match() {
    let build = || {
        TorrentBuilder::new("dir")
            .piece_length(PIECE)
            .add_file("empty", Vec::new())
            .add_file("data.bin", content(3, 128))
            .build_metainfo()
            .unwrap()
    };
    let reference = build();
    let candidate = build();

    let resolver = Resolver::new(Arc::new(reference)).unwrap();
    assert_eq!(resolver.match_torrent(&candidate, ".").unwrap(), 1);

    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.get(0), Some(&LinkResult::Unmatched));
    assert!(links.get(1).is_some_and(LinkResult::is_linked));
}

#[test]
fn test_min_file_length_skips_small_files() {
    let reference = corpus("test1_pad_files");
    let candidate = corpus("test2_pad_files");

    let config = ResolverConfig::default().min_file_length(SMALL as u64 + 1);
    let resolver = Resolver::with_config(Arc::new(reference), config).unwrap();
    assert_eq!(resolver.match_torrent(&candidate, ".").unwrap(), 1);
}

#[test]
fn test_exclusive_targets_claims_each_reference_file_once() {
    let reference = corpus("test1_pad_files");
    let candidate = TorrentBuilder::new("twice")
        .piece_length(PIECE)
        .add_file("first.bin", shared())
        .add_file("second.bin", shared())
        .pad_files(true)
        .pad_tail(true)
        .build_metainfo()
        .unwrap();

    let shared_links = Resolver::new(Arc::new(reference.clone())).unwrap();
    assert_eq!(shared_links.match_torrent(&candidate, ".").unwrap(), 2);
    let shared_targets: Vec<usize> = shared_links
        .links(&candidate.info_hash)
        .unwrap()
        .matched()
        .map(|(_, link)| link.file_index())
        .collect();
    assert_eq!(shared_targets.len(), 2);
    assert_eq!(shared_targets[0], shared_targets[1]);

    let config = ResolverConfig::default().exclusive_targets(true);
    let exclusive = Resolver::with_config(Arc::new(reference), config).unwrap();
    assert_eq!(exclusive.match_torrent(&candidate, ".").unwrap(), 1);

    let links = exclusive.links(&candidate.info_hash).unwrap();
    let matched: Vec<usize> = links.matched().map(|(i, _)| i).collect();
    assert_eq!(matched, vec![0]);
}

#[test]
fn test_match_is_idempotent() {
    let reference = corpus("test2_pad_files");
    let candidate = corpus("test3_pad_files");
    let resolver = Resolver::new(Arc::new(reference)).unwrap();

    resolver.match_torrent(&candidate, ".").unwrap();
    let first = resolver.links(&candidate.info_hash).unwrap();
    resolver.match_torrent(&candidate, ".").unwrap();
    let second = resolver.links(&candidate.info_hash).unwrap();

    assert_eq!(first.as_slice(), second.as_slice());
    assert_eq!(resolver.results().len(), 1);
}

#[test]
fn test_rematch_replaces_previous_results() {
    let resolver = Resolver::new(Arc::new(corpus("test1_pad_files"))).unwrap();
    let candidate = corpus("test1_single_padded");

    resolver.match_torrent(&candidate, "/old").unwrap();
    resolver.match_torrent(&candidate, "/new").unwrap();

    let links = resolver.links(&candidate.info_hash).unwrap();
    assert_eq!(links.save_path().to_str(), Some("/new"));
    assert_eq!(links.match_count(), 1);
}

#[test]
fn test_results_accumulate_per_candidate() {
    let resolver = Resolver::new(Arc::new(corpus("test1_pad_files"))).unwrap();
    let candidates = [
        corpus("test2_pad_files"),
        corpus("test1_single"),
        corpus("test1_single_padded"),
    ];

    for candidate in &candidates {
        resolver.match_torrent(candidate, ".").unwrap();
    }

    let results = resolver.results();
    assert_eq!(results.len(), candidates.len());
    assert!(results
        .windows(2)
        .all(|w| w[0].info_hash() < w[1].info_hash()));

    let total: usize = results.iter().map(CandidateLinks::match_count).sum();
    assert_eq!(total, 3);
    assert!(resolver.links(&corpus("test3").info_hash).is_none());
}

#[test]
fn test_concurrent_matching_of_independent_candidates() {
    let resolver = Resolver::new(Arc::new(corpus("test1_pad_files"))).unwrap();
    let candidates = [
        corpus("test2_pad_files"),
        corpus("test3_pad_files"),
        corpus("test1_single_padded"),
        corpus("test2"),
    ];

    std::thread::scope(|scope| {
        for candidate in &candidates {
            let resolver = &resolver;
            scope.spawn(move || resolver.match_torrent(candidate, ".").unwrap());
        }
    });

    let counts: Vec<usize> = candidates
        .iter()
        .map(|c| resolver.links(&c.info_hash).unwrap().match_count())
        .collect();
    assert_eq!(counts, vec![2, 2, 1, 0]);
}

#[test]
fn test_invalid_reference_is_rejected() {
    let mut reference = corpus("test1_pad_files");
    reference.info.pieces.pop();

    let result = Resolver::new(Arc::new(reference));
    assert!(matches!(
        result,
        Err(ResolveError::InvalidMetadata {
            side: "reference",
            source: MetainfoError::InvalidLayout(_),
        })
    ));
}

#[test]
fn test_invalid_candidate_is_rejected_without_recording() {
    let resolver = Resolver::new(Arc::new(corpus("test1_pad_files"))).unwrap();
    let mut candidate = corpus("test2_pad_files");
    candidate.info.files[1].offset += 1;

    let result = resolver.match_torrent(&candidate, ".");
    assert!(matches!(
        result,
        Err(ResolveError::InvalidMetadata {
            side: "candidate",
            ..
        })
    ));
    assert!(resolver.links(&candidate.info_hash).is_none());
}

#[test]
fn test_index_skips_pieces_straddling_two_files() {
    let unpadded = TorrentBuilder::new("dir")
        .piece_length(PIECE)
        .add_file("a.bin", content(7, 100))
        .add_file("b.bin", content(8, 100))
        .build_metainfo()
        .unwrap();
    let index = PieceHashIndex::build(&unpadded.info);

    // a: piece 0 only (piece 1 runs into b); b: pieces 2 and 3
    assert_eq!(index.len(), 3);
    assert_eq!(
        index.get(&unpadded.info.pieces[1]),
        &[] as &[PieceLocation]
    );
    assert_eq!(
        index.get(&unpadded.info.pieces[2]),
        &[PieceLocation {
            file_index: 1,
            piece_offset: 1
        }]
    );
}

#[test]
fn test_index_keeps_tail_piece_followed_by_padding() {
    let padded = TorrentBuilder::new("dir")
        .piece_length(PIECE)
        .add_file("a.bin", content(7, 100))
        .add_file("b.bin", content(8, 100))
        .pad_files(true)
        .build_metainfo()
        .unwrap();
    let index = PieceHashIndex::build(&padded.info);

    assert_eq!(index.len(), 4);
    assert_eq!(
        index.get(&padded.info.pieces[1]),
        &[PieceLocation {
            file_index: 0,
            piece_offset: 1
        }]
    );
    // b.bin is file 2, after the padding file
    assert_eq!(
        index.get(&padded.info.pieces[2]),
        &[PieceLocation {
            file_index: 2,
            piece_offset: 0
        }]
    );
}

#[test]
fn test_empty_index_for_padding_only_torrent() {
    let info = crate::metainfo::Info {
        name: "pad".into(),
        piece_length: PIECE,
        pieces: vec![[0; 20]],
        files: vec![crate::metainfo::File::padding(PIECE, 0)],
        total_length: PIECE,
        private: false,
    };
    info.validate().unwrap();

    let index = PieceHashIndex::build(&info);
    assert!(index.is_empty());
    assert_eq!(index.hash_count(), 0);
}

/// Layout whose piece count is consistent but whose last piece boundary
/// lies past `u64::MAX`.
fn overflowing_info() -> crate::metainfo::Info {
    use crate::metainfo::{File, Info};

    let piece_length = i64::MAX as u64;
    Info {
        name: "huge".into(),
        piece_length,
        pieces: vec![[0; 20]; 3],
        files: vec![
            File::new("huge/a", piece_length, 0),
            File::new("huge/b", piece_length, piece_length),
            File::new("huge/c", 1, 2 * piece_length),
        ],
        total_length: u64::MAX,
        private: false,
    }
}

#[test]
fn test_overflowing_piece_boundaries_are_rejected() {
    let info = overflowing_info();
    assert!(matches!(
        info.validate(),
        Err(MetainfoError::InvalidLayout(_))
    ));

    let mut reference = corpus("test1_pad_files");
    reference.info = info;
    assert!(matches!(
        Resolver::new(Arc::new(reference)),
        Err(ResolveError::InvalidMetadata {
            side: "reference",
            source: MetainfoError::InvalidLayout(_),
        })
    ));
}

#[test]
fn test_index_build_saturates_piece_end() {
    // building directly skips validation; the last piece end clamps to the stream end
    let info = overflowing_info();
    let index = PieceHashIndex::build(&info);
    assert_eq!(
        index.get(&[0; 20]),
        &[
            PieceLocation {
                file_index: 0,
                piece_offset: 0
            },
            PieceLocation {
                file_index: 1,
                piece_offset: 0
            },
            PieceLocation {
                file_index: 2,
                piece_offset: 0
            },
        ]
    );
}

#[test]
fn test_resolver_exposes_reference_and_config() {
    let reference = Arc::new(corpus("test1_pad_files"));
    let config = ResolverConfig::default()
        .exclusive_targets(true)
        .min_file_length(10);
    let resolver = Resolver::with_config(Arc::clone(&reference), config.clone()).unwrap();

    assert!(Arc::ptr_eq(resolver.reference(), &reference));
    assert_eq!(resolver.config(), &config);
    assert_eq!(Resolver::new(reference).unwrap().config(), &ResolverConfig::default());
}
