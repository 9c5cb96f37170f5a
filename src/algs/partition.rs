//! Even block partitioning of a sequence across ranks.
//!
//! `len` items over `parts` ranks: every rank gets `len / parts` items and the
//! first `len % parts` ranks get one more. Blocks are contiguous and in rank
//! order, so block `i` starts where block `i - 1` ends.

use std::ops::Range;

/// Index ranges of each rank's block. Returns an empty vector when `parts == 0`.
pub fn block_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let avg = len / parts;
    let extra = len % parts;
    let mut offset = 0;
    (0..parts)
        .map(|i| {
            let n = if i < extra { avg + 1 } else { avg };
            let r = offset..offset + n;
            offset += n;
            r
        })
        .collect()
}

/// Range of a single rank's block without materializing the others.
pub fn block_range(len: usize, parts: usize, index: usize) -> Range<usize> {
    if parts == 0 || index >= parts {
        return len..len;
    }
    let avg = len / parts;
    let extra = len % parts;
    let start = index * avg + index.min(extra);
    let n = if index < extra { avg + 1 } else { avg };
    start..start + n
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rows_over_workers() {
        // 62 rows over 4 workers: 16, 16, 15, 15
        let r = block_ranges(62, 4);
        assert_eq!(r, vec![0..16, 16..32, 32..47, 47..62]);
    }

    #[test]
    fn fewer_items_than_parts() {
        let r = block_ranges(2, 4);
        assert_eq!(r, vec![0..1, 1..2, 2..2, 2..2]);
        assert!(block_ranges(5, 0).is_empty());
    }

    proptest! {
        #[test]
        fn ranges_tile_the_sequence(len in 0usize..500, parts in 1usize..40) {
            let r = block_ranges(len, parts);
            prop_assert_eq!(r.len(), parts);
            prop_assert_eq!(r[0].start, 0);
            prop_assert_eq!(r[parts - 1].end, len);
            for w in r.windows(2) {
                prop_assert_eq!(w[0].end, w[1].start);
                prop_assert!(w[0].len() >= w[1].len());
                prop_assert!(w[0].len() - w[1].len() <= 1);
            }
            for (i, want) in r.iter().enumerate() {
                prop_assert_eq!(&block_range(len, parts, i), want);
            }
        }
    }
}
