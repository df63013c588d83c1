//! Chart descriptions produced by analyses and consumed by the renderer

use crate::aggregate::{CrossTab, GroupMeans, ValueCounts};
use ndarray::Array2;

/// One bar per category, sharing a legend entry
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
    /// Text drawn above each bar
    pub annotations: Vec<String>,
}

/// Clustered bars: one cluster per category, one bar per series
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBarChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
}

impl GroupedBarChart {
    /// Within-group churn percentages, one bar per churn label
    pub fn percent_crosstab(title: &str, x_desc: &str, ct: &CrossTab) -> Self {
        let pct = ct.row_percentages();
        let series = ct
            .columns
            .iter()
            .enumerate()
            .map(|(l, label)| {
                let values: Vec<f64> = pct.iter().map(|row| row[l]).collect();
                BarSeries {
                    name: label.clone(),
                    annotations: values.iter().map(|v| format_percent(*v)).collect(),
                    values,
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: "Percentage (%)".to_string(),
            categories: ct.index.clone(),
            series,
        }
    }

    /// Raw counts, one bar per target label
    pub fn count_crosstab(title: &str, x_desc: &str, ct: &CrossTab) -> Self {
        let series = ct
            .columns
            .iter()
            .enumerate()
            .map(|(l, label)| {
                let counts: Vec<u64> = ct.counts.iter().map(|row| row[l]).collect();
                BarSeries {
                    name: label.clone(),
                    values: counts.iter().map(|&n| n as f64).collect(),
                    annotations: counts.iter().map(u64::to_string).collect(),
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: "Count".to_string(),
            categories: ct.index.clone(),
            series,
        }
    }

    /// Single-series distribution annotated with each label's share of all rows
    pub fn percent_distribution(title: &str, x_desc: &str, vc: &ValueCounts) -> Self {
        let values = vc.percentages();
        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: "Percentage (%)".to_string(),
            categories: vc.labels.clone(),
            series: vec![BarSeries {
                name: x_desc.to_string(),
                annotations: values.iter().map(|v| format_percent(*v)).collect(),
                values,
            }],
        }
    }

    /// Single-series distribution of raw counts
    pub fn count_distribution(title: &str, x_desc: &str, vc: &ValueCounts) -> Self {
        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: "Count".to_string(),
            categories: vc.labels.clone(),
            series: vec![BarSeries {
                name: x_desc.to_string(),
                values: vc.counts.iter().map(|&n| n as f64).collect(),
                annotations: vc.counts.iter().map(u64::to_string).collect(),
            }],
        }
    }

    /// Group means as bar heights, annotated with each bar's share of its row total
    pub fn mean_shares(title: &str, x_desc: &str, y_desc: &str, gm: &GroupMeans) -> Self {
        let shares = gm.row_shares();
        let series = gm
            .columns
            .iter()
            .enumerate()
            .map(|(l, label)| BarSeries {
                name: label.clone(),
                values: gm.means.iter().map(|row| row[l]).collect(),
                annotations: shares.iter().map(|row| format_percent(row[l])).collect(),
            })
            .collect();

        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            categories: gm.index.clone(),
            series,
        }
    }

    /// Largest bar height, used to size the y axis
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Box-and-whisker plot of one numeric column per label
#[derive(Debug, Clone, PartialEq)]
pub struct BoxplotChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub groups: Vec<(String, Vec<f64>)>,
}

/// Square matrix drawn as colored cells
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapChart {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Array2<f64>,
}

/// Everything an analysis can hand to the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bars(GroupedBarChart),
    /// Side-by-side panels sharing one image
    Panels(Vec<GroupedBarChart>),
    Boxplot(BoxplotChart),
    Heatmap(HeatmapChart),
}

impl Chart {
    /// Bar annotations in drawing order; empty for non-bar charts
    pub fn annotations(&self) -> Vec<String> {
        let bars: Vec<&GroupedBarChart> = match self {
            Chart::Bars(chart) => vec![chart],
            Chart::Panels(panels) => panels.iter().collect(),
            Chart::Boxplot(_) | Chart::Heatmap(_) => Vec::new(),
        };
        bars.iter()
            .flat_map(|chart| chart.series.iter())
            .flat_map(|series| series.annotations.iter().cloned())
            .collect()
    }
}

/// One decimal place with a percent sign
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}
