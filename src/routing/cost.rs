use super::{Coordinate, Stop, StopId};
use thiserror::Error;

/// Travel cost of one arc. Also used as travel time when checking time windows.
pub type Cost = f64;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors a cost model may raise for a particular arc.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CostError {
    /// A graph index is outside the cost matrix.
    #[error("Graph index {index} is outside the {size}x{size} cost matrix")]
    IndexOutOfRange { index: usize, size: usize },

    /// The matrix rows are not all as long as the number of rows.
    #[error("Cost matrix is not square: row {row} has {len} entries, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },

    /// The model knows nothing about this pair of stops.
    #[error("No cost data between {from} and {to}")]
    Unavailable { from: StopId, to: StopId },
}

/// Arc cost model the planner searches over.
///
/// Any `Fn(&Stop, &Stop) -> Result<Cost, CostError>` closure is a cost model, which makes it
/// easy to plug in road-network lookups.
pub trait ArcCost: Send + Sync {
    fn cost(&self, from: &Stop, to: &Stop) -> Result<Cost, CostError>;
}

impl<F> ArcCost for F
where
    F: Fn(&Stop, &Stop) -> Result<Cost, CostError> + Send + Sync,
{
    fn cost(&self, from: &Stop, to: &Stop) -> Result<Cost, CostError> {
        self(from, to)
    }
}

/// Every arc costs one unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCost;

impl ArcCost for UnitCost {
    fn cost(&self, _: &Stop, _: &Stop) -> Result<Cost, CostError> {
        Ok(1.0)
    }
}

/// Great-circle distance in kilometres between coordinates.
///
/// Falls back to one unit when either stop has no coordinate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoCost;

impl ArcCost for GeoCost {
    fn cost(&self, from: &Stop, to: &Stop) -> Result<Cost, CostError> {
        match (from.coordinate(), to.coordinate()) {
            (Some(a), Some(b)) => Ok(haversine_km(a, b)),
            _ => Ok(1.0),
        }
    }
}

/// Haversine distance between two coordinates.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Precomputed square matrix indexed by [`Location::Index`](super::Location::Index).
///
/// Stops without a graph index cost one unit.
#[derive(Debug, Clone)]
pub struct MatrixCost {
    size: usize,
    values: Vec<Cost>,
}

impl MatrixCost {
    pub fn new(rows: Vec<Vec<Cost>>) -> Result<Self, CostError> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != size {
                return Err(CostError::NotSquare { row, len: entries.len(), size });
            }
            values.extend(entries);
        }
        Ok(Self { size, values })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl ArcCost for MatrixCost {
    fn cost(&self, from: &Stop, to: &Stop) -> Result<Cost, CostError> {
        let (Some(i), Some(j)) = (from.graph_index(), to.graph_index()) else {
            return Ok(1.0);
        };
        for index in [i, j] {
            if index >= self.size {
                return Err(CostError::IndexOutOfRange { index, size: self.size });
            }
        }
        Ok(self.values[i * self.size + j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cost() {
        assert_eq!(UnitCost.cost(&Stop::new("a"), &Stop::new("b")), Ok(1.0));
    }

    #[test]
    fn test_geo_cost_known_distance() {
        // San Francisco to Oakland, roughly 13 km.
        let sf = Stop::new("sf").with_coordinate(37.7749, -122.4194);
        let oak = Stop::new("oak").with_coordinate(37.8044, -122.2712);
        let km = GeoCost.cost(&sf, &oak).unwrap();
        assert!((12.0..15.0).contains(&km), "unexpected distance {km}");
        assert_eq!(GeoCost.cost(&sf, &sf).unwrap(), 0.0);
    }

    #[test]
    fn test_geo_cost_falls_back_to_unit() {
        let sf = Stop::new("sf").with_coordinate(37.7749, -122.4194);
        assert_eq!(GeoCost.cost(&sf, &Stop::new("unknown")), Ok(1.0));
    }

    #[test]
    fn test_matrix_cost_lookup_and_bounds() {
        let matrix = MatrixCost::new(vec![vec![0.0, 4.0], vec![3.0, 0.0]]).unwrap();
        let a = Stop::new("a").with_index(0);
        let b = Stop::new("b").with_index(1);
        assert_eq!(matrix.cost(&a, &b), Ok(4.0));
        assert_eq!(matrix.cost(&b, &a), Ok(3.0));
        assert_eq!(matrix.cost(&a, &Stop::new("c")), Ok(1.0));

        let far = Stop::new("far").with_index(7);
        assert_eq!(matrix.cost(&a, &far), Err(CostError::IndexOutOfRange { index: 7, size: 2 }));
    }

    #[test]
    fn test_matrix_must_be_square() {
        let err = MatrixCost::new(vec![vec![0.0, 1.0], vec![1.0]]).unwrap_err();
        assert_eq!(err, CostError::NotSquare { row: 1, len: 1, size: 2 });
    }

    #[test]
    fn test_closure_is_a_cost_model() {
        let model = |from: &Stop, to: &Stop| -> Result<Cost, CostError> {
            Ok((from.id.len() + to.id.len()) as f64)
        };
        assert_eq!(model.cost(&Stop::new("ab"), &Stop::new("c")), Ok(3.0));
    }
}
