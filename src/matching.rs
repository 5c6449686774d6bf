//! Alignment of ascending time arrays.

/// Default tolerance, in years, below which two timestamps are the same.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Find the common timestamps of two ascending arrays.
///
/// Returns index arrays `(ia, ib)` such that `ta[ia[k]]` and `tb[ib[k]]` are
/// within `tol` of each other for every `k`. When a timestamp repeats, its
/// first occurrence is the one matched. No overlap gives two empty arrays.
pub fn match_times(ta: &[f64], tb: &[f64], tol: f64) -> (Vec<usize>, Vec<usize>) {
    let mut ia = Vec::new();
    let mut ib = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < ta.len() && j < tb.len() {
        let (a, b) = (ta[i], tb[j]);
        if (a - b).abs() <= tol {
            ia.push(i);
            ib.push(j);
            // skip later duplicates of the matched stamp on both sides
            while i < ta.len() && (ta[i] - a).abs() <= tol {
                i += 1;
            }
            while j < tb.len() && (tb[j] - b).abs() <= tol {
                j += 1;
            }
        } else if a < b {
            i += 1;
        } else {
            j += 1;
        }
    }

    (ia, ib)
}

/// Timestamps present in every array, in ascending order. Taken from the
/// first array.
pub fn common_times<'a, I>(arrays: I, tol: f64) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = arrays.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut common = first.to_vec();
    for t in iter {
        let (ia, _) = match_times(&common, t, tol);
        common = ia.into_iter().map(|i| common[i]).collect();
        if common.is_empty() {
            break;
        }
    }
    common
}

/// Ascending union of several ascending arrays; stamps within `tol` of an
/// earlier one are folded into it.
pub fn union_times<'a, I>(arrays: I, tol: f64) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut all: Vec<f64> = arrays
        .into_iter()
        .flat_map(|t| t.iter().copied())
        .filter(|t| t.is_finite())
        .collect();
    all.sort_by(f64::total_cmp);

    let mut out: Vec<f64> = Vec::with_capacity(all.len());
    for t in all {
        match out.last() {
            Some(&last) if (t - last).abs() <= tol => {}
            _ => out.push(t),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_match_is_identity() {
        let t: Vec<f64> = (0..48).map(|i| 2000.0 + i as f64 / 12.0).collect();
        let (ia, ib) = match_times(&t, &t, DEFAULT_TOLERANCE);
        let expected: Vec<usize> = (0..t.len()).collect();
        assert_eq!(ia, expected);
        assert_eq!(ib, expected);
    }

    #[test]
    fn partial_overlap() {
        let ta = [1.0, 2.0, 3.0, 4.0];
        let tb = [2.5, 3.0, 4.0, 5.0];
        let (ia, ib) = match_times(&ta, &tb, DEFAULT_TOLERANCE);
        assert_eq!(ia, vec![2, 3]);
        assert_eq!(ib, vec![1, 2]);
    }

    #[test]
    fn disjoint_arrays_give_empty_match() {
        let (ia, ib) = match_times(&[1.0, 2.0], &[3.0, 4.0], DEFAULT_TOLERANCE);
        assert!(ia.is_empty() && ib.is_empty());
    }

    #[test]
    fn first_duplicate_wins() {
        let ta = [1.0, 2.0, 2.0, 3.0];
        let tb = [2.0, 2.0, 3.0];
        let (ia, ib) = match_times(&ta, &tb, DEFAULT_TOLERANCE);
        assert_eq!(ia, vec![1, 3]);
        assert_eq!(ib, vec![0, 2]);
    }

    #[test]
    fn tolerance_absorbs_float_noise() {
        let ta = [2000.0 + 1.0 / 12.0];
        let tb = [2000.083_333_333_4];
        let (ia, _) = match_times(&ta, &tb, DEFAULT_TOLERANCE);
        assert_eq!(ia, vec![0]);
    }

    #[test]
    fn common_and_union() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0];
        let c = [3.0, 4.0];
        assert_eq!(common_times([&a[..], &b[..], &c[..]], DEFAULT_TOLERANCE), vec![3.0]);
        assert_eq!(
            union_times([&a[..], &b[..], &c[..]], DEFAULT_TOLERANCE),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert!(common_times([&a[..], &[9.0][..]], DEFAULT_TOLERANCE).is_empty());
    }
}
