use std::ops::Range;

/// Splits `0..len` into at most `parts` contiguous ranges whose sizes differ by at most one.
///
/// The first `len % parts` ranges hold the extra element. Empty ranges are omitted, so
/// fewer than `parts` ranges come back when `len < parts`. `parts == 0` is treated as 1.
pub fn split_balanced(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let extra = len % parts;

    let mut ranges = Vec::with_capacity(parts.min(len));
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        if size == 0 {
            break;
        }
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_chunks_take_the_remainder() {
        assert_eq!(split_balanced(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(split_balanced(7, 7), (0..7).map(|i| i..i + 1).collect::<Vec<_>>());
    }

    #[test]
    fn empty_chunks_are_dropped() {
        assert_eq!(split_balanced(2, 5), vec![0..1, 1..2]);
        assert!(split_balanced(0, 4).is_empty());
    }

    #[test]
    fn zero_parts_means_one() {
        assert_eq!(split_balanced(5, 0), vec![0..5]);
    }

    #[test]
    fn ranges_cover_input_exactly_once() {
        for len in 0..40 {
            for parts in 1..12 {
                let ranges = split_balanced(len, parts);
                let covered: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(covered, (0..len).collect::<Vec<_>>());
                let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
                if let (Some(max), Some(min)) = (sizes.iter().max(), sizes.iter().min()) {
                    assert!(max - min <= 1);
                }
            }
        }
    }
}
