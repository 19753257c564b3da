use serde::{Deserialize, Serialize};

/// Identifier of a stop, unique within one request.
pub type StopId = String;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Where a stop is, either on the map or as a node of a precomputed cost graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Coordinate(Coordinate),
    Index(usize),
}

/// Earliest and latest acceptable arrival, in the same unit as arc costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub earliest: f64,
    pub latest: f64,
}

impl TimeWindow {
    pub fn new(earliest: f64, latest: f64) -> Self {
        Self { earliest, latest }
    }

    pub fn is_valid(&self) -> bool {
        self.earliest.is_finite() && self.latest.is_finite() && self.earliest <= self.latest
    }
}

/// A place the vehicle has to visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub window: Option<TimeWindow>,
    /// Time spent at the stop before departing.
    #[serde(default)]
    pub service: f64,
}

impl Stop {
    pub fn new(id: impl Into<StopId>) -> Self {
        Self {
            id: id.into(),
            location: None,
            window: None,
            service: 0.0,
        }
    }

    pub fn with_coordinate(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(Location::Coordinate(Coordinate::new(lat, lng)));
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.location = Some(Location::Index(index));
        self
    }

    pub fn with_window(mut self, earliest: f64, latest: f64) -> Self {
        self.window = Some(TimeWindow::new(earliest, latest));
        self
    }

    pub fn with_service(mut self, service: f64) -> Self {
        self.service = service;
        self
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self.location {
            Some(Location::Coordinate(coordinate)) => Some(coordinate),
            _ => None,
        }
    }

    pub fn graph_index(&self) -> Option<usize> {
        match self.location {
            Some(Location::Index(index)) => Some(index),
            _ => None,
        }
    }
}

/// The stops of one delivery. `stops[start_index]` is the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub start_index: usize,
}

impl RouteRequest {
    pub fn new(stops: Vec<Stop>) -> Self {
        Self {
            stops,
            start_index: 0,
        }
    }

    pub fn with_start(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn depot(&self) -> Option<&Stop> {
        self.stops.get(self.start_index)
    }
}
