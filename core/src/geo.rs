//! GeoGrid: maps continuous coordinates onto discrete, grid-aligned turf cells.
//!
//! The grid is aligned on both axes with a uniform cell size expressed in
//! degrees. A coordinate resolves to the cell whose centroid is the nearest
//! multiple of the cell size on each axis, so every coordinate that lies
//! strictly within half a cell of a centroid resolves to that centroid's key.

use crate::{CellKey, Coordinate};

/// Mean Earth radius used for great-circle distances, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Discrete grid cell produced by aligning a coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    key: CellKey,
    centroid: Coordinate,
    row: i64,
    column: i64,
}

impl GridCell {
    /// Deterministic key identifying the cell.
    #[must_use]
    pub fn key(&self) -> &CellKey {
        &self.key
    }

    /// Consumes the cell, yielding its key.
    #[must_use]
    pub fn into_key(self) -> CellKey {
        self.key
    }

    /// Aligned centroid of the cell.
    #[must_use]
    pub const fn centroid(&self) -> Coordinate {
        self.centroid
    }

    /// Integer latitude index of the cell.
    #[must_use]
    pub const fn row(&self) -> i64 {
        self.row
    }

    /// Integer longitude index of the cell.
    #[must_use]
    pub const fn column(&self) -> i64 {
        self.column
    }
}

/// Resolves the key and aligned centroid of the cell containing `coordinate`.
#[must_use]
pub fn cell_key(coordinate: Coordinate, hex_size: f64) -> (CellKey, Coordinate) {
    let cell = cell_at(coordinate, hex_size);
    let centroid = cell.centroid();
    (cell.into_key(), centroid)
}

/// Resolves the full grid cell containing `coordinate`.
#[must_use]
pub fn cell_at(coordinate: Coordinate, hex_size: f64) -> GridCell {
    let row = grid_index(coordinate.latitude(), hex_size);
    let column = grid_index(coordinate.longitude(), hex_size);
    cell_from_indices(row, column, hex_size)
}

/// Enumerates the square neighborhood of `radius` cells around `center`.
///
/// Cells are returned row-major, starting at the south-west corner, and the
/// center cell is always included.
#[must_use]
pub fn neighborhood(center: Coordinate, hex_size: f64, radius: u32) -> Vec<GridCell> {
    let origin = cell_at(center, hex_size);
    let reach = i64::from(radius);
    let side = usize::try_from(2 * reach + 1).unwrap_or(1);
    let mut cells = Vec::with_capacity(side * side);
    for row_offset in -reach..=reach {
        for column_offset in -reach..=reach {
            cells.push(cell_from_indices(
                origin.row + row_offset,
                origin.column + column_offset,
                hex_size,
            ));
        }
    }
    cells
}

/// Great-circle distance between two coordinates in metres (haversine).
#[must_use]
pub fn distance_m(from: Coordinate, to: Coordinate) -> f64 {
    let lat_from = from.latitude().to_radians();
    let lat_to = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let half_chord = (delta_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).max(0.0).sqrt());
    EARTH_RADIUS_M * angle
}

/// Procedural display name for a cell centroid, e.g. `Sector 7749-4194`.
#[must_use]
pub fn sector_name(centroid: Coordinate) -> String {
    format!(
        "Sector {}-{}",
        last_four_digits(centroid.latitude()),
        last_four_digits(centroid.longitude())
    )
}

fn grid_index(value: f64, hex_size: f64) -> i64 {
    if !(hex_size > 0.0) || !value.is_finite() {
        return 0;
    }
    (value / hex_size).round() as i64
}

fn cell_from_indices(row: i64, column: i64, hex_size: f64) -> GridCell {
    // Adding zero folds -0.0 into 0.0 so the key never renders as "-0".
    let latitude = row as f64 * hex_size + 0.0;
    let longitude = column as f64 * hex_size + 0.0;
    GridCell {
        key: CellKey::new(format!("{latitude}:{longitude}")),
        centroid: Coordinate::new(latitude, longitude),
        row,
        column,
    }
}

fn last_four_digits(value: f64) -> String {
    let digits: Vec<char> = format!("{value:.4}")
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let start = digits.len().saturating_sub(4);
    digits[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEX: f64 = 0.0001;

    #[test]
    fn alignment_rounds_to_nearest_multiple() {
        let (key, centroid) = cell_key(Coordinate::new(37.774_921, -122.419_367), HEX);
        assert!((centroid.latitude() - 37.7749).abs() < 1e-9);
        assert!((centroid.longitude() + 122.4194).abs() < 1e-9);
        assert_eq!(
            key.as_str(),
            format!("{}:{}", centroid.latitude(), centroid.longitude())
        );
    }

    #[test]
    fn alignment_is_idempotent() {
        let (key, centroid) = cell_key(Coordinate::new(51.507_35, -0.127_75), HEX);
        let (again, realigned) = cell_key(centroid, HEX);
        assert_eq!(key, again);
        assert_eq!(centroid, realigned);
    }

    #[test]
    fn negative_zero_never_appears_in_keys() {
        let (key, _) = cell_key(Coordinate::new(-0.000_01, -0.000_02), HEX);
        assert_eq!(key.as_str(), "0:0");
    }

    #[test]
    fn neighborhood_is_square_and_contains_center() {
        let center = Coordinate::new(10.0, 20.0);
        let cells = neighborhood(center, HEX, 3);
        assert_eq!(cells.len(), 49);
        let (center_key, _) = cell_key(center, HEX);
        assert!(cells.iter().any(|cell| cell.key() == &center_key));
    }

    #[test]
    fn neighborhood_cells_realign_to_themselves() {
        for cell in neighborhood(Coordinate::new(-33.8688, 151.2093), HEX, 2) {
            let (key, _) = cell_key(cell.centroid(), HEX);
            assert_eq!(&key, cell.key());
        }
    }

    #[test]
    fn distance_between_identical_points_is_zero() {
        let point = Coordinate::new(37.7749, -122.4194);
        assert!(distance_m(point, point).abs() < 1e-9);
    }

    #[test]
    fn distance_matches_known_small_offset() {
        let first = Coordinate::new(37.7749, -122.4194);
        let second = Coordinate::new(37.7750, -122.4195);
        let distance = distance_m(first, second);
        assert!(distance > 0.0);
        assert!(distance < 100.0, "distance was {distance}");
    }

    #[test]
    fn sector_name_uses_last_four_digits() {
        assert_eq!(
            sector_name(Coordinate::new(37.7749, -122.4194)),
            "Sector 7749-4194"
        );
    }

    proptest! {
        #[test]
        fn coordinates_near_a_centroid_share_its_key(
            row in -900_000i64..900_000,
            column in -1_800_000i64..1_800_000,
            lat_offset in -0.49f64..0.49,
            lon_offset in -0.49f64..0.49,
        ) {
            let centroid = Coordinate::new(row as f64 * HEX, column as f64 * HEX);
            let (expected, _) = cell_key(centroid, HEX);
            let nearby = Coordinate::new(
                centroid.latitude() + lat_offset * HEX,
                centroid.longitude() + lon_offset * HEX,
            );
            let (actual, _) = cell_key(nearby, HEX);
            prop_assert_eq!(actual, expected);
        }
    }
}
