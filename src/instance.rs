//! Module for building and representing TSP instances.
//!
//! An instance is a set of cities keyed by id with planar coordinates.
//! Instances come from a CSV file (`city_id,x,y`) or from a seeded random
//! generator. All validation of coordinate fields happens here, so the
//! heuristics can assume well-formed input.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMatrix;

/// City identifier. Ordering of ids is the iteration order used everywhere.
pub type CityId = usize;

/// Planar coordinate of a city
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y }
    }

    /// Euclidean distance to another coordinate
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One row of the CSV exchange format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CityRecord {
    city_id: CityId,
    x: f64,
    y: f64,
}

/// Represents a complete TSP instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Cities keyed by id, iterated in ascending id order
    pub cities: BTreeMap<CityId, Coordinate>,
}

impl Instance {
    pub fn new(name: &str) -> Self {
        Instance {
            name: name.to_string(),
            cities: BTreeMap::new(),
        }
    }

    /// Build an instance from `(id, x, y)` triples.
    ///
    /// Fails on a duplicate id or a non-finite coordinate.
    pub fn from_points<I>(name: &str, points: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (CityId, f64, f64)>,
    {
        let mut instance = Instance::new(name);
        for (id, x, y) in points {
            instance.add_city(id, x, y)?;
        }
        Ok(instance)
    }

    /// Insert a validated city
    pub fn add_city(&mut self, id: CityId, x: f64, y: f64) -> Result<(), String> {
        if !x.is_finite() || !y.is_finite() {
            return Err(format!("Coordinates of city {} must be finite numbers", id));
        }
        if self.cities.contains_key(&id) {
            return Err(format!("Duplicate city id {}", id));
        }
        self.cities.insert(id, Coordinate::new(x, y));
        Ok(())
    }

    /// Generate `num_cities` cities with ids `1..=num_cities` and integer
    /// coordinates drawn uniformly in `[0, max_x] x [0, max_y]`.
    pub fn random(num_cities: usize, max_x: u32, max_y: u32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut instance = Instance::new(&format!("random-{}-{}", num_cities, seed));

        for id in 1..=num_cities {
            let x = rng.gen_range(0..=max_x) as f64;
            let y = rng.gen_range(0..=max_y) as f64;
            instance.cities.insert(id, Coordinate::new(x, y));
        }

        instance
    }

    /// Parse an instance from a CSV file with header `city_id,x,y`
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let file = File::open(&path)
            .map_err(|e| format!("Cannot open file: {}", e))?;

        let name = path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self::from_csv_reader(&name, file)
    }

    /// Parse an instance from any CSV source with header `city_id,x,y`
    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Self, String> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()
            .map_err(|e| format!("Read error: {}", e))?
            .clone();
        for required in ["city_id", "x", "y"] {
            if !headers.iter().any(|h| h == required) {
                return Err(format!("File must have columns: city_id, x, y (missing '{}')", required));
            }
        }

        let mut instance = Instance::new(name);
        for (line, record) in csv_reader.deserialize::<CityRecord>().enumerate() {
            let record = record.map_err(|e| format!("Invalid row {}: {}", line + 1, e))?;
            instance.add_city(record.city_id, record.x, record.y)?;
        }

        log::info!("Loaded instance '{}' with {} cities", instance.name, instance.len());
        Ok(instance)
    }

    /// Write the instance in the `city_id,x,y` format
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for (&city_id, coord) in &self.cities {
            writer.serialize(CityRecord { city_id, x: coord.x, y: coord.y })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the instance to a CSV file
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        self.write_csv(file)
    }

    /// Number of cities
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// City ids in ascending order
    pub fn city_ids(&self) -> Vec<CityId> {
        self.cities.keys().copied().collect()
    }

    pub fn coordinate(&self, id: CityId) -> Option<&Coordinate> {
        self.cities.get(&id)
    }

    /// Precompute the pairwise distance table
    pub fn distance_matrix(&self) -> DistanceMatrix {
        DistanceMatrix::from_instance(self)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let coords: Vec<&Coordinate> = self.cities.values().collect();

        let mut distances: Vec<f64> = Vec::new();
        for i in 0..coords.len() {
            for j in i + 1..coords.len() {
                distances.push(coords[i].distance_to(coords[j]));
            }
        }

        let (avg_distance, min_distance, max_distance) = if distances.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                distances.iter().sum::<f64>() / distances.len() as f64,
                distances.iter().cloned().fold(f64::INFINITY, f64::min),
                distances.iter().cloned().fold(0.0, f64::max),
            )
        };

        let bounds = coords.iter().fold(None, |acc: Option<(f64, f64, f64, f64)>, c| {
            Some(match acc {
                None => (c.x, c.x, c.y, c.y),
                Some((min_x, max_x, min_y, max_y)) => {
                    (min_x.min(c.x), max_x.max(c.x), min_y.min(c.y), max_y.max(c.y))
                }
            })
        });

        InstanceStatistics {
            name: self.name.clone(),
            num_cities: self.len(),
            bounds,
            avg_distance,
            min_distance,
            max_distance,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_cities: usize,
    /// `(min_x, max_x, min_y, max_y)`, absent for an empty instance
    pub bounds: Option<(f64, f64, f64, f64)>,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.num_cities)?;
        if let Some((min_x, max_x, min_y, max_y)) = self.bounds {
            writeln!(f, "  X range: [{:.2}, {:.2}]", min_x, max_x)?;
            writeln!(f, "  Y range: [{:.2}, {:.2}]", min_y, max_y)?;
        }
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
