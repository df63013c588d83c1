//! Aggregations behind the churn charts: cross-tabulation, value counts,
//! group means and Pearson correlation.
//!
//! Grouping runs through Polars lazy `group_by`; the small results are then
//! ordered and reshaped into dense matrices here.

use crate::data::{self, require_columns};
use crate::derive::quantile_sorted;
use crate::error::ReportError;
use log::debug;
use ndarray::Array2;
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How group keys are ordered on the chart axis
#[derive(Debug, Clone, Copy)]
pub enum KeyOrder<'a> {
    /// Per key part: numbers first in numeric order, then text lexicographically
    Natural,
    /// Fixed label order for bucketed columns; labels absent from the data are skipped
    Explicit(&'a [&'a str]),
}

/// Frequency table of grouping keys against target labels
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    /// Group labels, one per row of `counts`
    pub index: Vec<String>,
    /// Target labels, one per column of `counts`
    pub columns: Vec<String>,
    /// `counts[g][l]` = rows with key `g` and label `l`
    pub counts: Vec<Vec<u64>>,
}

impl CrossTab {
    /// Count rows per (key..., target) combination
    ///
    /// # Arguments
    /// * `df` - Frame to aggregate
    /// * `keys` - One or more grouping columns; multi-column keys are labeled `(a, b)`
    /// * `target` - Column whose labels become the table columns
    /// * `order` - Ordering of the group keys
    pub fn from_frame(
        df: &DataFrame,
        keys: &[&str],
        target: &str,
        order: KeyOrder<'_>,
    ) -> crate::Result<Self> {
        let mut needed: Vec<&str> = keys.to_vec();
        needed.push(target);
        require_columns(df, &needed)?;

        let grouped = count_combinations(df, &needed)?;
        let target_values = string_column(&grouped, target)?;
        let key_values = keys
            .iter()
            .map(|k| string_column(&grouped, k))
            .collect::<crate::Result<Vec<_>>>()?;
        let n_values = count_column(&grouped)?;

        let mut cells: BTreeMap<(Vec<String>, String), u64> = BTreeMap::new();
        for row in 0..grouped.height() {
            let key: Vec<String> = key_values.iter().map(|col| col[row].clone()).collect();
            *cells.entry((key, target_values[row].clone())).or_default() += n_values[row];
        }

        let mut raw_keys: Vec<Vec<String>> = cells.keys().map(|(k, _)| k.clone()).collect();
        raw_keys.dedup();
        let raw_keys = order_keys(raw_keys, order);

        let mut columns: Vec<String> = cells.keys().map(|(_, t)| t.clone()).collect();
        columns.sort_by(|a, b| natural_cmp(a, b));
        columns.dedup();

        if raw_keys.is_empty() || columns.is_empty() {
            return Err(ReportError::EmptyAggregation {
                what: format!("{} by {}", target, keys.join(" x ")),
            }
            .into());
        }

        let counts = raw_keys
            .iter()
            .map(|key| {
                columns
                    .iter()
                    .map(|label| {
                        cells
                            .get(&(key.clone(), label.clone()))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        let index = raw_keys.iter().map(|key| key_label(key)).collect();
        debug!("crosstab {:?} x {}: {:?}", keys, target, counts);

        Ok(Self {
            index,
            columns,
            counts,
        })
    }

    /// Row totals, one per group
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Within-group percentage of each label; groups with no rows are never present
    pub fn row_percentages(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .zip(self.row_totals())
            .map(|(row, total)| {
                row.iter()
                    .map(|&n| 100.0 * n as f64 / total as f64)
                    .collect()
            })
            .collect()
    }
}

/// Occurrences of each label in a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCounts {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl ValueCounts {
    /// Count non-null values, ordered by descending frequency then label
    pub fn from_frame(df: &DataFrame, column: &str) -> crate::Result<Self> {
        require_columns(df, &[column])?;
        let grouped = count_combinations(df, &[column])?;
        let labels = string_column(&grouped, column)?;
        let counts = count_column(&grouped)?;

        let mut pairs: Vec<(String, u64)> = labels.into_iter().zip(counts).collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| natural_cmp(&a.0, &b.0)));

        if pairs.is_empty() {
            return Err(ReportError::EmptyAggregation {
                what: format!("value counts of {column}"),
            }
            .into());
        }

        let (labels, counts) = pairs.into_iter().unzip();
        Ok(Self { labels, counts })
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Share of all counted rows per label
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total() as f64;
        self.counts
            .iter()
            .map(|&n| 100.0 * n as f64 / total)
            .collect()
    }
}

/// Mean of `value` for every (key, target) pair, as a dense matrix
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMeans {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    /// `means[g][l]`; 0.0 where the pair has no rows
    pub means: Vec<Vec<f64>>,
}

impl GroupMeans {
    pub fn from_frame(df: &DataFrame, key: &str, target: &str, value: &str) -> crate::Result<Self> {
        require_columns(df, &[key, target, value])?;

        let grouped = df
            .clone()
            .lazy()
            .filter(
                col(key)
                    .is_not_null()
                    .and(col(target).is_not_null())
                    .and(col(value).is_not_null()),
            )
            .group_by([
                col(key).cast(DataType::String),
                col(target).cast(DataType::String),
            ])
            .agg([col(value).cast(DataType::Float64).mean().alias("mean")])
            .collect()?;

        let keys = string_column(&grouped, key)?;
        let targets = string_column(&grouped, target)?;
        let mean_series = grouped.column("mean")?.cast(&DataType::Float64)?;
        let means: Vec<f64> = mean_series
            .f64()?
            .into_iter()
            .map(|m| m.unwrap_or(f64::NAN))
            .collect();

        let mut index = keys.clone();
        index.sort_by(|a, b| natural_cmp(a, b));
        index.dedup();
        let mut columns = targets.clone();
        columns.sort_by(|a, b| natural_cmp(a, b));
        columns.dedup();

        if index.is_empty() {
            return Err(ReportError::EmptyAggregation {
                what: format!("mean {value} by {key} x {target}"),
            }
            .into());
        }

        let mut matrix = vec![vec![0.0; columns.len()]; index.len()];
        for ((k, t), m) in keys.iter().zip(targets.iter()).zip(means) {
            let row = index.iter().position(|i| i == k);
            let col_idx = columns.iter().position(|c| c == t);
            if let (Some(row), Some(col_idx)) = (row, col_idx) {
                matrix[row][col_idx] = m;
            }
        }

        Ok(Self {
            index,
            columns,
            means: matrix,
        })
    }

    /// Each cell as a share of its row total
    pub fn row_shares(&self) -> Vec<Vec<f64>> {
        self.means
            .iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                row.iter()
                    .map(|&m| if total > 0.0 { 100.0 * m / total } else { 0.0 })
                    .collect()
            })
            .collect()
    }
}

/// Values of `value` split by the labels of `by`, labels in natural order
pub fn values_by_label(
    df: &DataFrame,
    value: &str,
    by: &str,
) -> crate::Result<Vec<(String, Vec<f64>)>> {
    let values = data::f64_values(df, value)?;
    let labels = data::string_values(df, by)?;

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (v, label) in values.into_iter().zip(labels) {
        if let (Some(v), Some(label)) = (v, label) {
            if !v.is_nan() {
                groups.entry(label).or_default().push(v);
            }
        }
    }

    let mut groups: Vec<(String, Vec<f64>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| natural_cmp(&a.0, &b.0));

    if groups.is_empty() {
        return Err(ReportError::EmptyAggregation {
            what: format!("{value} by {by}"),
        }
        .into());
    }
    Ok(groups)
}

/// Five-number box summary with Tukey whiskers.
///
/// Whiskers end at the most extreme values inside `[q1 - 1.5 IQR, q3 + 1.5 IQR]`;
/// values beyond the fences are outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Summarize the non-NaN values; `None` when nothing is left
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let fences = (q1 - 1.5 * iqr)..=(q3 + 1.5 * iqr);

        let (inside, outliers): (Vec<f64>, Vec<f64>) =
            sorted.into_iter().partition(|v| fences.contains(v));

        Some(Self {
            lower_whisker: inside.first().copied().unwrap_or(q1),
            q1,
            median,
            q3,
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

/// Pearson correlation matrix over every numeric column
#[derive(Debug, Clone)]
pub struct Correlation {
    pub columns: Vec<String>,
    pub matrix: Array2<f64>,
}

impl Correlation {
    /// Pairwise-complete Pearson correlation; zero-variance pairs yield NaN
    pub fn from_frame(df: &DataFrame) -> crate::Result<Self> {
        let numeric: Vec<&Series> = df
            .get_columns()
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .collect();

        if numeric.is_empty() || df.height() < 2 {
            return Err(ReportError::EmptyAggregation {
                what: "correlation of numeric columns".to_string(),
            }
            .into());
        }

        let columns: Vec<String> = numeric.iter().map(|s| s.name().to_string()).collect();
        let mut values = Array2::from_elem((df.height(), numeric.len()), f64::NAN);
        for (j, series) in numeric.iter().enumerate() {
            let cast = series.cast(&DataType::Float64)?;
            for (i, v) in cast.f64()?.into_iter().enumerate() {
                if let Some(v) = v {
                    values[[i, j]] = v;
                }
            }
        }

        let k = columns.len();
        let mut matrix = Array2::from_elem((k, k), f64::NAN);
        for a in 0..k {
            for b in a..k {
                let r = pearson(
                    values.column(a).iter().copied(),
                    values.column(b).iter().copied(),
                );
                matrix[[a, b]] = r;
                matrix[[b, a]] = r;
            }
        }

        Ok(Self { columns, matrix })
    }
}

/// Pearson coefficient over positions where both values are present
pub fn pearson(xs: impl Iterator<Item = f64>, ys: impl Iterator<Item = f64>) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Numeric labels first in numeric order, then the rest lexicographically
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn order_keys(mut keys: Vec<Vec<String>>, order: KeyOrder<'_>) -> Vec<Vec<String>> {
    match order {
        KeyOrder::Natural => {
            keys.sort_by(|a, b| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| natural_cmp(x, y))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
            keys
        }
        KeyOrder::Explicit(labels) => labels
            .iter()
            .filter_map(|label| keys.iter().find(|k| key_label(k) == *label).cloned())
            .collect(),
    }
}

fn key_label(parts: &[String]) -> String {
    if parts.len() == 1 {
        parts[0].clone()
    } else {
        format!("({})", parts.join(", "))
    }
}

/// Row counts per distinct combination of `columns`, nulls dropped
fn count_combinations(df: &DataFrame, columns: &[&str]) -> crate::Result<DataFrame> {
    let not_null = columns
        .iter()
        .map(|c| col(*c).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true));

    let grouped = df
        .clone()
        .lazy()
        .filter(not_null)
        .group_by(
            columns
                .iter()
                .map(|c| col(*c).cast(DataType::String))
                .collect::<Vec<_>>(),
        )
        .agg([len().alias("n")])
        .collect()?;
    Ok(grouped)
}

fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    Ok(data::string_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or_default())
        .collect())
}

fn count_column(df: &DataFrame) -> crate::Result<Vec<u64>> {
    let series = df.column("n")?.cast(&DataType::UInt64)?;
    Ok(series
        .u64()?
        .into_iter()
        .map(|n| n.unwrap_or(0))
        .collect())
}
