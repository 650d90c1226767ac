//! Precomputed pairwise distances and tour evaluation.

use std::collections::HashMap;

use crate::instance::{CityId, Instance};

/// Symmetric Euclidean distance table over the cities of an instance.
///
/// Lookups involving an id that is not part of the instance return
/// `f64::INFINITY`, so comparisons between tour costs stay well ordered.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    ids: Vec<CityId>,
    index: HashMap<CityId, usize>,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute the Euclidean distance for every pair of cities
    pub fn from_instance(instance: &Instance) -> Self {
        let ids = instance.city_ids();
        let coords: Vec<_> = instance.cities.values().copied().collect();
        let n = ids.len();
        let mut data = vec![0.0; n * n];

        for i in 0..n {
            for j in i + 1..n {
                let d = coords[i].distance_to(&coords[j]);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }

        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        DistanceMatrix { ids, index, data }
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, a: CityId, b: CityId) -> f64 {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(&i), Some(&j)) => self.data[i * self.ids.len() + j],
            _ => f64::INFINITY,
        }
    }

    /// Total cyclic length of a tour, closing edge included
    pub fn tour_cost(&self, tour: &[CityId]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let mut cost = 0.0;
        for i in 0..tour.len() - 1 {
            cost += self.distance(tour[i], tour[i + 1]);
        }

        cost += self.distance(tour[tour.len() - 1], tour[0]);

        cost
    }

    /// City ids covered by the table, in ascending order
    pub fn ids(&self) -> &[CityId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: CityId) -> bool {
        self.index.contains_key(&id)
    }
}
