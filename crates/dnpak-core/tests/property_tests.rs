//! Property-based tests for the codecs, entry tree, compression, and
//! segment analysis.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{Read, Write};

use dnpak_core::format::{FileRecord, HEADER_SIZE, PakHeader};
use dnpak_core::index::EntryTree;
use dnpak_core::inspect::{coalesce, discontinuity};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use proptest::prelude::*;

fn record_at(path: &str, offset: u32, size: u32) -> FileRecord {
    FileRecord {
        path: path.to_string(),
        disk_size: size,
        decompressed_size: size,
        compressed_size: size,
        disk_offset: offset,
        unknown: [0; 4],
    }
}

proptest! {
    /// Any valid header survives an encode/decode round trip.
    #[test]
    fn prop_header_round_trip(
        entry_count in any::<u32>(),
        file_table_offset in (HEADER_SIZE as u32)..=u32::MAX,
    ) {
        let header = PakHeader { entry_count, file_table_offset };
        let decoded = PakHeader::decode(&header.encode()).unwrap();
        prop_assert_eq!(decoded, header);
    }

    /// Any record with a representable path survives a round trip,
    /// including the opaque reserved field.
    #[test]
    fn prop_record_round_trip(
        path in r"[a-z0-9_]{1,12}(\\[a-z0-9_]{1,12}){0,3}",
        disk_size in any::<u32>(),
        decompressed_size in any::<u32>(),
        disk_offset in any::<u32>(),
        unknown in any::<[u8; 4]>(),
    ) {
        let record = FileRecord {
            path,
            disk_size,
            decompressed_size,
            compressed_size: disk_size,
            disk_offset,
            unknown,
        };
        let decoded = FileRecord::decode(&record.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    /// Inflating a deflated buffer restores it exactly.
    #[test]
    fn prop_deflate_inflate_round_trip(content in prop::collection::vec(any::<u8>(), 0..4096)) {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&content).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut inflated = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut inflated)
            .unwrap();
        prop_assert_eq!(inflated, content);
    }

    /// Every inserted path resolves back to a file entry holding the
    /// record it was inserted with.
    #[test]
    fn prop_tree_insert_get_identity(
        dirs in prop::collection::vec("[a-z]{1,8}", 1..5),
        leaf_count in 1usize..8,
    ) {
        let mut tree = EntryTree::new();
        let mut paths = Vec::new();
        for (index, dir) in dirs.iter().enumerate() {
            for leaf in 0..leaf_count {
                let path = format!("{dir}{index}\\file{leaf}.dat");
                let marker = (index * leaf_count + leaf) as u32;
                tree.insert(&path, record_at(&path, 0, marker)).unwrap();
                paths.push((path, marker));
            }
        }
        for (path, marker) in paths {
            let id = tree.get(&path).unwrap().unwrap();
            let record = tree.record(id).unwrap();
            prop_assert_eq!(record.disk_size, marker);
        }
    }

    /// Never-inserted paths resolve to absence, not an error, as long as
    /// no prefix of them is a file.
    #[test]
    fn prop_tree_absence_is_not_an_error(
        present in "[a-z]{1,8}",
        absent in "[A-Z]{1,8}",
    ) {
        let mut tree = EntryTree::new();
        let path = format!("{present}\\data.bin");
        tree.insert(&path, record_at(&path, 0, 1)).unwrap();
        let miss = format!("{absent}\\data.bin");
        prop_assert!(tree.get(&miss).unwrap().is_none());
    }

    /// Coalesced ranges are ascending, pairwise disjoint, and cover
    /// every input segment.
    #[test]
    fn prop_coalesce_is_disjoint_ascending_cover(
        raw in prop::collection::vec((0u32..10_000, 1u32..500), 1..32),
    ) {
        let records: Vec<FileRecord> = raw
            .iter()
            .enumerate()
            .map(|(index, &(offset, size))| record_at(&format!("f{index}"), offset, size))
            .collect();
        let merged = coalesce(&records);

        for pair in merged.windows(2) {
            prop_assert!(pair[0].end < pair[1].start, "ranges must stay disjoint and ascending");
        }
        for record in &records {
            let start = u64::from(record.disk_offset);
            let end = start + u64::from(record.disk_size);
            prop_assert!(
                merged.iter().any(|span| span.start <= start && end <= span.end),
                "every payload must fall inside one merged range"
            );
        }
    }

    /// For disjoint ranges built gap by gap, the discontinuity sum is
    /// exactly the total gap size.
    #[test]
    fn prop_discontinuity_equals_gap_sum(
        sizes_and_gaps in prop::collection::vec((1u32..500, 0u32..100), 1..16),
    ) {
        let mut records = Vec::new();
        let mut cursor = 0u32;
        let mut gap_total = 0i64;
        for (index, &(size, gap)) in sizes_and_gaps.iter().enumerate() {
            records.push(record_at(&format!("f{index}"), cursor, size));
            cursor += size + gap;
            if index + 1 < sizes_and_gaps.len() {
                gap_total += i64::from(gap);
            }
        }
        prop_assert_eq!(discontinuity(&records), gap_total);
    }
}
