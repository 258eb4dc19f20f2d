//! Test data generators for creating synthetic raster bands.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. All grids are row-major.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a smooth gradient from `low` (top-left) to `high` (bottom-right).
pub fn create_gradient_grid(width: usize, height: usize, low: f64, high: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    let span = (width + height).saturating_sub(2).max(1) as f64;
    for row in 0..height {
        for col in 0..width {
            let t = (row + col) as f64 / span;
            data.push(low + t * (high - low));
        }
    }
    data
}

/// Creates a grid with deterministic pseudo-random integer values in `0..modulus`.
///
/// Integer values keep sums exact, which makes comparisons between serial
/// and parallel runs meaningful.
pub fn create_noise_grid(width: usize, height: usize, modulus: u32, seed: u32) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            data.push((hash % modulus.max(1)) as f64);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a grid filled with a constant value.
///
/// Useful for testing edge cases and simple scenarios.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// Creates a grid with `missing` at specified positions.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `missing` - Value written at the listed positions (a sentinel or NaN)
/// * `positions` - List of (col, row) positions
///
/// # Returns
///
/// A `Vec<f64>` with `missing` at specified positions, ones elsewhere.
pub fn create_grid_with_missing(
    width: usize,
    height: usize,
    missing: f64,
    positions: &[(usize, usize)],
) -> Vec<f64> {
    let mut data = vec![1.0; width * height];
    for &(col, row) in positions {
        if col < width && row < height {
            data[row * width + col] = missing;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0); // col=0, row=0
        assert_eq!(grid[1], 1000.0); // col=1, row=0
        assert_eq!(grid[10], 1.0); // col=0, row=1
        assert_eq!(grid[11], 1001.0); // col=1, row=1
    }

    #[test]
    fn test_create_gradient_grid() {
        let grid = create_gradient_grid(5, 5, 10.0, 20.0);
        assert_eq!(grid[0], 10.0);
        assert_eq!(grid[24], 20.0);
        assert!(grid.iter().all(|v| (10.0..=20.0).contains(v)));
    }

    #[test]
    fn test_create_constant_grid() {
        let grid = create_constant_grid(10, 10, 42.0);
        assert_eq!(grid.len(), 100);
        assert!(grid.iter().all(|&v| v == 42.0));
    }

    #[test]
    fn test_create_grid_with_missing() {
        let grid = create_grid_with_missing(10, 10, f64::NAN, &[(5, 5), (0, 0)]);
        assert!(grid[0].is_nan()); // (0, 0)
        assert!(grid[55].is_nan()); // (5, 5) = row 5 * 10 + col 5
        assert_eq!(grid[1], 1.0); // (1, 0)
    }

    #[test]
    fn test_noise_deterministic() {
        let grid1 = create_noise_grid(50, 50, 100, 42);
        let grid2 = create_noise_grid(50, 50, 100, 42);
        assert_eq!(grid1, grid2, "Same seed should produce same data");
        assert!(grid1.iter().all(|v| *v >= 0.0 && *v < 100.0 && v.fract() == 0.0));

        let grid3 = create_noise_grid(50, 50, 100, 43);
        assert_ne!(grid1, grid3, "Different seed should produce different data");
    }
}
