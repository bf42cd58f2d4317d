#![forbid(unsafe_code)]

//! Longest increasing subsequence over the keyed-diff index map.

/// Indices of a longest strictly increasing subsequence of `nums`.
///
/// Zero entries mark "no match" in the keyed diff and never take part.
/// Uses the O(n²) table: `len[i]` is the longest run ending at `i` and
/// `prev[i]` its predecessor. Equal values never extend a run. Among runs of
/// maximal length, the one ending earliest is returned.
#[must_use]
pub fn longest_increasing_subsequence(nums: &[usize]) -> Vec<usize> {
    let n = nums.len();
    let mut len = vec![0usize; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut best: Option<usize> = None;

    for i in 0..n {
        if nums[i] == 0 {
            continue;
        }
        len[i] = 1;
        for j in 0..i {
            if nums[j] != 0 && nums[j] < nums[i] && len[j] + 1 > len[i] {
                len[i] = len[j] + 1;
                prev[i] = Some(j);
            }
        }
        if best.is_none_or(|b| len[i] > len[b]) {
            best = Some(i);
        }
    }

    let mut out = Vec::with_capacity(best.map_or(0, |b| len[b]));
    let mut cursor = best;
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_all_zero() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[0, 0, 0]).is_empty());
    }

    #[test]
    fn already_sorted() {
        assert_eq!(longest_increasing_subsequence(&[1, 2, 3, 4]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn swap_keeps_one_of_pair() {
        // [D, C] from old indices [4, 3].
        assert_eq!(longest_increasing_subsequence(&[4, 3]), vec![0]);
    }

    #[test]
    fn zeros_are_skipped() {
        assert_eq!(longest_increasing_subsequence(&[5, 0, 3, 4, 0, 6]), vec![2, 3, 5]);
    }

    #[test]
    fn equal_values_do_not_extend() {
        assert_eq!(longest_increasing_subsequence(&[2, 2, 2]).len(), 1);
    }

    #[test]
    fn classic_sequence() {
        let nums = [10, 9, 2, 5, 3, 7, 101, 18];
        let lis = longest_increasing_subsequence(&nums);
        assert_eq!(lis.len(), 4);
        assert!(lis.windows(2).all(|w| w[0] < w[1] && nums[w[0]] < nums[w[1]]));
    }
}
