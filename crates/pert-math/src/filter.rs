//! Sliding median filter, applied independently to each feature column.
//!
//! Optional pre-fit smoothing for noisy diagnostic channels. Matches
//! the usual reflect boundary handling of image-style median filters.

use ndarray::Array2;

/// Reflect an out-of-range index back into `[0, n)`.
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// Median-filter every column of `x` in time with the given window.
///
/// A window of 0 or 1 is a no-op. The median of an even window is the
/// upper of the two middle elements.
pub fn median_filter_columns(x: &Array2<f64>, window: usize) -> Array2<f64> {
    let (n, f) = x.dim();
    if window <= 1 || n == 0 {
        return x.clone();
    }

    let half = (window / 2) as isize;
    let mut out = Array2::zeros((n, f));
    let mut buf = vec![0.0f64; window];

    for col in 0..f {
        for row in 0..n {
            for (j, slot) in buf.iter_mut().enumerate() {
                let src = reflect_index(row as isize + j as isize - half, n);
                *slot = x[[src, col]];
            }
            buf.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            out[[row, col]] = buf[window / 2];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_constant_column_unchanged() {
        let x = Array2::from_elem((10, 3), 4.2);
        let y = median_filter_columns(&x, 5);
        assert_eq!(y, x);
    }

    #[test]
    fn test_spike_removed() {
        let x = array![[1.0], [1.0], [100.0], [1.0], [1.0]];
        let y = median_filter_columns(&x, 3);
        assert_eq!(y.column(0).to_vec(), vec![1.0; 5]);
    }

    #[test]
    fn test_window_one_noop() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(median_filter_columns(&x, 1), x);
    }

    #[test]
    fn test_columns_independent() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let y = median_filter_columns(&x, 3);
        assert_eq!(y[[1, 0]], 2.0);
        assert_eq!(y[[1, 1]], 20.0);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 0);
        assert_eq!(reflect_index(-2, 5), 1);
        assert_eq!(reflect_index(5, 5), 4);
        assert_eq!(reflect_index(6, 5), 3);
        assert_eq!(reflect_index(2, 5), 2);
    }
}
