//! Parameter sets and the candidate grid the study orchestrator
//! enumerates them from (component F).
//!
//! A `ParamGrid` is what an external config-file loader hands the core
//! (out of scope per §6): one or more candidate values per named
//! parameter. `cartesian_product` expands that into the full set of
//! `ParamSet`s the optimizer trains against.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use ahash::AHasher;

/// A single parameter value. Strategies only ever need scalars to
/// configure themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Canonical string rendering, used both for stable hashing and as
    /// the properties column an external CSV/JSON writer would emit.
    pub fn canonical(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Float(v) => format!("{v}"),
            ParamValue::Str(v) => v.clone(),
        }
    }
}

/// A single parameter set: one concrete value per named parameter,
/// exactly what `Strategy::configure` consumes.
pub type ParamMap = HashMap<String, ParamValue>;

/// The full candidate space an optimizer enumerates: every named
/// parameter mapped to its list of candidate values.
pub type ParamGrid = HashMap<String, Vec<ParamValue>>;

pub type ParamSetId = u64;

/// One point in the parameter space, plus a stable identity derived
/// from its contents. Two `ParamSet`s are equal iff their `params` are
/// equal.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    pub id: ParamSetId,
    pub params: ParamMap,
}

impl PartialEq for ParamSet {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl ParamSet {
    pub fn new(params: ParamMap) -> Self {
        let id = hash_params(&params);
        Self { id, params }
    }
}

/// Stable hash of a `ParamMap`'s canonicalized (sorted-key) encoding.
/// `AHasher::default()` uses fixed keys rather than `ahash`'s usual
/// per-process random seed, so the same params always hash to the same
/// ID across runs and processes — required for `ParamSetId` to serve
/// as a stable map key across a study's training/validation phases.
fn hash_params(params: &ParamMap) -> ParamSetId {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    let mut hasher = AHasher::default();
    for key in keys {
        key.hash(&mut hasher);
        params[key].canonical().hash(&mut hasher);
    }
    hasher.finish()
}

/// Expands a `ParamGrid` into one `ParamSet` per combination in the
/// Cartesian product of its candidate lists. Keys are visited in
/// lexicographic order so the output is deterministic.
pub fn cartesian_product(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut keys: Vec<&String> = grid.keys().collect();
    keys.sort();

    let mut combos: Vec<ParamMap> = vec![ParamMap::new()];
    for key in keys {
        let values = &grid[key];
        let mut next = Vec::with_capacity(combos.len() * values.len().max(1));
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.insert(key.clone(), value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }

    combos.into_iter().map(ParamSet::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ParamGrid {
        let mut grid = ParamGrid::new();
        grid.insert("fast".into(), vec![ParamValue::Int(5), ParamValue::Int(10)]);
        grid.insert("slow".into(), vec![ParamValue::Int(20), ParamValue::Int(40)]);
        grid
    }

    #[test]
    fn cartesian_product_covers_every_combination() {
        let sets = cartesian_product(&grid());
        assert_eq!(sets.len(), 4);

        let mut seen_fast_slow: Vec<(i64, i64)> = sets
            .iter()
            .map(|s| {
                let fast = match s.params["fast"] {
                    ParamValue::Int(v) => v,
                    _ => unreachable!(),
                };
                let slow = match s.params["slow"] {
                    ParamValue::Int(v) => v,
                    _ => unreachable!(),
                };
                (fast, slow)
            })
            .collect();
        seen_fast_slow.sort();
        assert_eq!(seen_fast_slow, vec![(5, 20), (5, 40), (10, 20), (10, 40)]);
    }

    #[test]
    fn identical_params_hash_to_the_same_id() {
        let mut a = ParamMap::new();
        a.insert("x".into(), ParamValue::Int(1));
        a.insert("y".into(), ParamValue::Str("hi".into()));

        let mut b = ParamMap::new();
        b.insert("y".into(), ParamValue::Str("hi".into()));
        b.insert("x".into(), ParamValue::Int(1));

        assert_eq!(ParamSet::new(a).id, ParamSet::new(b).id);
    }

    #[test]
    fn different_params_hash_differently() {
        let mut a = ParamMap::new();
        a.insert("x".into(), ParamValue::Int(1));
        let mut b = ParamMap::new();
        b.insert("x".into(), ParamValue::Int(2));
        assert_ne!(ParamSet::new(a).id, ParamSet::new(b).id);
    }

    #[test]
    fn empty_grid_yields_one_empty_param_set() {
        let sets = cartesian_product(&ParamGrid::new());
        assert_eq!(sets.len(), 1);
        assert!(sets[0].params.is_empty());
    }
}
