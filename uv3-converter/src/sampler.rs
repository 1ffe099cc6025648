/// Bilinear resampling of a grid at fractional pixel coordinates.
use crate::raster::Grid;

/// Bilinear interpolation at `(row_f, col_f)` from the four surrounding nodes.
///
/// The caller must ensure the full footprint `[r0, r0 + 1] x [c0, c0 + 1]` lies
/// inside the grid (see [`footprint_contains`]); out-of-grid nodes panic.
/// Integer coordinates reproduce the node value exactly.
pub fn interpolate(row_f: f64, col_f: f64, grid: &Grid) -> f64 {
    let r0 = row_f.floor();
    let c0 = col_f.floor();
    let dr = row_f - r0;
    let dc = col_f - c0;

    let (r0, c0) = (r0 as usize, c0 as usize);
    let (r1, c1) = (r0 + 1, c0 + 1);

    let v00 = grid.get(r0, c0);
    let v01 = grid.get(r0, c1);
    let v10 = grid.get(r1, c0);
    let v11 = grid.get(r1, c1);

    v00 + (v10 - v00) * dr + (v01 - v00) * dc + (v00 + v11 - v10 - v01) * dr * dc
}

/// True when the interpolation footprint of `(row_f, col_f)` lies inside a
/// `rows x cols` grid: `0 <= r0`, `0 <= c0`, `r0 + 1 < rows`, `c0 + 1 < cols`.
pub fn footprint_contains(row_f: f64, col_f: f64, rows: usize, cols: usize) -> bool {
    if !(row_f.is_finite() && col_f.is_finite()) {
        return false;
    }
    let r0 = row_f.floor();
    let c0 = col_f.floor();
    r0 >= 0.0 && c0 >= 0.0 && r0 + 1.0 < rows as f64 && c0 + 1.0 < cols as f64
}

/// Interpolate when the footprint is inside the grid, otherwise return `fallback`.
pub fn interpolate_or(row_f: f64, col_f: f64, grid: &Grid, fallback: f64) -> f64 {
    if footprint_contains(row_f, col_f, grid.rows(), grid.cols()) {
        interpolate(row_f, col_f, grid)
    } else {
        fallback
    }
}
