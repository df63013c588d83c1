//! Deterministic synthetic categorical columns.
//!
//! All randomness flows through one `SyntheticRng` seeded from the report
//! config. Columns are drawn in `SYNTHETIC_COLUMNS` order, one draw per row,
//! all rows of a column before the next. Reordering the table changes every
//! column after the moved entry.

use crate::data::describe;
use log::info;
use polars::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A categorical attribute and its sampling weights
#[derive(Debug, Clone, Copy)]
pub struct CategoricalSpec {
    pub name: &'static str,
    pub labels: &'static [&'static str],
    pub weights: &'static [f64],
}

/// Synthetic columns in draw order.
/// NEVER reorder: the shared seed makes the order observable.
pub const SYNTHETIC_COLUMNS: [CategoricalSpec; 5] = [
    CategoricalSpec {
        name: "Region",
        labels: &["Urban", "Rural"],
        weights: &[0.5, 0.5],
    },
    CategoricalSpec {
        name: "Device_Type",
        labels: &["Android", "iOS", "Feature Phone"],
        weights: &[0.65, 0.25, 0.10],
    },
    CategoricalSpec {
        name: "Network_Type",
        labels: &["2G", "3G", "4G", "5G"],
        weights: &[0.10, 0.20, 0.50, 0.20],
    },
    CategoricalSpec {
        name: "SIM_Provider",
        labels: &["Airtel", "Jio", "VI", "BSNL"],
        weights: &[0.35, 0.40, 0.15, 0.10],
    },
    CategoricalSpec {
        name: "Usage_Pattern",
        labels: &["Low", "Medium", "High"],
        weights: &[0.30, 0.45, 0.25],
    },
];

/// Seeded generator threaded through the augmentation step
pub struct SyntheticRng {
    inner: Pcg64Mcg,
}

impl SyntheticRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Draw `n` labels from a weighted categorical distribution
    pub fn draw(&mut self, spec: &CategoricalSpec, n: usize) -> crate::Result<Vec<&'static str>> {
        let dist = WeightedIndex::new(spec.weights)
            .map_err(|e| anyhow::anyhow!("invalid weights for {}: {}", spec.name, e))?;
        Ok((0..n)
            .map(|_| spec.labels[dist.sample(&mut self.inner)])
            .collect())
    }
}

/// Append every synthetic column to `df` in place
pub fn add_synthetic_columns(df: &mut DataFrame, rng: &mut SyntheticRng) -> crate::Result<()> {
    let n_rows = df.height();
    for spec in SYNTHETIC_COLUMNS.iter() {
        let values = rng.draw(spec, n_rows)?;
        df.with_column(Series::new(spec.name, values))?;
    }

    info!("Synthetic columns added: {} rows", n_rows);
    describe(df, "Dataset after augmentation");
    Ok(())
}
