//! Grand-sum of the elementwise product of a square matrix with its transpose
//!
//! A locality micro-exercise: the blocked variant is tuned to keep its working set inside a
//! small direct-mapped cache for the fixed matrix sizes the exercise grades. Matrices are
//! row-major `i32` slices; sums accumulate in `i64` so large inputs can't overflow.

/// Row-wise baseline: sums `a[i][j] * a[j][i]` over the whole matrix
pub fn grand_sum_naive(n: usize, a: &[i32]) -> i64 {
    assert_eq!(a.len(), n * n);
    let mut sum = 0i64;
    for i in 0..n {
        for j in 0..n {
            sum += a[j * n + i] as i64 * a[i * n + j] as i64;
        }
    }
    sum
}

/// Cache-friendly blocked variant
///
/// Walks the matrix in square blocks sized for 32x32, 64x64, and 67x67 inputs, and exploits
/// the symmetry of the access pattern: the diagonal contributes once, and each pair below the
/// diagonal contributes twice. Any other size falls back to the naive scan.
pub fn grand_sum_blocked(n: usize, a: &[i32]) -> i64 {
    assert_eq!(a.len(), n * n);
    let block = match n {
        32 => 8,
        64 => 4,
        67 => 16,
        _ => return grand_sum_naive(n, a),
    };
    let mut sum = 0i64;
    let mut row_block = 0;
    while row_block < n {
        let mut col_block = 0;
        while col_block < n {
            for row in row_block..n.min(row_block + block) {
                for col in col_block..n.min(col_block + block) {
                    let forward = a[row * n + col] as i64;
                    let transposed = a[col * n + row] as i64;
                    if row == col {
                        sum += forward * transposed;
                    } else if row > col {
                        sum += 2 * forward * transposed;
                    }
                }
            }
            col_block += block;
        }
        row_block += block;
    }
    sum
}
