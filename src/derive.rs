//! Derived grouping columns built per analysis

use crate::data::{self, with_derived_column};
use polars::prelude::*;
use std::cmp::Ordering;

pub const TENURE_GROUP: &str = "Tenure_Group";
pub const CHARGES_GROUP: &str = "Charges_Group";
pub const QUARTER: &str = "Quarter";
pub const SIM_GENDER_SENIOR: &str = "SIM_Gender_Senior";

/// Tenure bucket labels in display order
pub const TENURE_LABELS: [&str; 5] = ["0-12", "13-24", "25-48", "49-72", "73+"];

/// Upper (inclusive) edge of each tenure bucket
const TENURE_EDGES: [f64; 5] = [12.0, 24.0, 48.0, 72.0, 100.0];

/// Tertile labels in display order
pub const CHARGES_LABELS: [&str; 3] = ["Low", "Medium", "High"];

/// Bucket a tenure value; `None` outside [0, 100]
pub fn tenure_group(tenure: f64) -> Option<&'static str> {
    if !(0.0..=100.0).contains(&tenure) {
        return None;
    }
    TENURE_EDGES
        .iter()
        .position(|&upper| tenure <= upper)
        .map(|idx| TENURE_LABELS[idx])
}

/// `((tenure - 1) // 3) + 1` with floor division
pub fn quarter(tenure: i64) -> i64 {
    (tenure - 1).div_euclid(3) + 1
}

/// Linear-interpolated quantile of sorted values, `q` in [0, 1]
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Equal-frequency tertile labels; nulls and NaNs stay unassigned
pub fn charges_tertiles(values: &[Option<f64>]) -> Vec<Option<&'static str>> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return vec![None; values.len()];
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let low_cut = quantile_sorted(&sorted, 1.0 / 3.0);
    let mid_cut = quantile_sorted(&sorted, 2.0 / 3.0);

    values
        .iter()
        .map(|value| match value {
            Some(v) if v.is_nan() => None,
            Some(v) if *v <= low_cut => Some(CHARGES_LABELS[0]),
            Some(v) if *v <= mid_cut => Some(CHARGES_LABELS[1]),
            Some(_) => Some(CHARGES_LABELS[2]),
            None => None,
        })
        .collect()
}

/// Composite "provider-gender-Senior|NonSenior" key
pub fn sim_gender_senior(sim: &str, gender: &str, senior: i64) -> String {
    let senior_label = if senior == 1 { "Senior" } else { "NonSenior" };
    format!("{sim}-{gender}-{senior_label}")
}

/// Frame with a `Tenure_Group` column appended
pub fn add_tenure_group(df: &DataFrame) -> crate::Result<DataFrame> {
    let groups: Vec<Option<&str>> = data::f64_values(df, "tenure")?
        .into_iter()
        .map(|t| t.and_then(tenure_group))
        .collect();
    with_derived_column(df, Series::new(TENURE_GROUP, groups))
}

/// Frame with a `Charges_Group` column appended
pub fn add_charges_group(df: &DataFrame) -> crate::Result<DataFrame> {
    let charges = data::f64_values(df, "MonthlyCharges")?;
    let groups = charges_tertiles(&charges);
    with_derived_column(df, Series::new(CHARGES_GROUP, groups))
}

/// Frame with an integer `Quarter` column appended
pub fn add_quarter(df: &DataFrame) -> crate::Result<DataFrame> {
    let quarters: Vec<Option<i64>> = data::i64_values(df, "tenure")?
        .into_iter()
        .map(|t| t.map(quarter))
        .collect();
    with_derived_column(df, Series::new(QUARTER, quarters))
}

/// Frame with the `SIM_Gender_Senior` composite key appended
pub fn add_sim_gender_senior(df: &DataFrame) -> crate::Result<DataFrame> {
    data::require_columns(df, &["SIM_Provider", "gender", "SeniorCitizen"])?;
    let sims = data::string_values(df, "SIM_Provider")?;
    let genders = data::string_values(df, "gender")?;
    let seniors = data::i64_values(df, "SeniorCitizen")?;

    let keys: Vec<Option<String>> = sims
        .iter()
        .zip(genders.iter())
        .zip(seniors.iter())
        .map(|((sim, gender), senior)| match (sim, gender, senior) {
            (Some(sim), Some(gender), Some(senior)) => Some(sim_gender_senior(sim, gender, *senior)),
            _ => None,
        })
        .collect();
    with_derived_column(df, Series::new(SIM_GENDER_SENIOR, keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenure_group_bins() {
        assert_eq!(tenure_group(0.0), Some("0-12"));
        assert_eq!(tenure_group(12.0), Some("0-12"));
        assert_eq!(tenure_group(13.0), Some("13-24"));
        assert_eq!(tenure_group(24.0), Some("13-24"));
        assert_eq!(tenure_group(48.0), Some("25-48"));
        assert_eq!(tenure_group(72.0), Some("49-72"));
        assert_eq!(tenure_group(73.0), Some("73+"));
        assert_eq!(tenure_group(100.0), Some("73+"));
        assert_eq!(tenure_group(-1.0), None);
        assert_eq!(tenure_group(101.0), None);
    }

    #[test]
    fn test_tenure_group_total_on_range() {
        for t in 0..=100 {
            let hits = TENURE_LABELS
                .iter()
                .filter(|&&label| tenure_group(t as f64) == Some(label))
                .count();
            assert_eq!(hits, 1, "tenure {t}");
        }
    }

    #[test]
    fn test_quarter() {
        assert_eq!(quarter(1), 1);
        assert_eq!(quarter(3), 1);
        assert_eq!(quarter(4), 2);
        assert_eq!(quarter(72), 24);
        assert_eq!(quarter(0), 0);
    }

    #[test]
    fn test_charges_tertiles_balanced() {
        for n in [9usize, 10, 11, 12, 30, 31] {
            let values: Vec<Option<f64>> = (0..n).map(|i| Some(20.0 + i as f64 * 1.5)).collect();
            let groups = charges_tertiles(&values);
            let sizes: Vec<usize> = CHARGES_LABELS
                .iter()
                .map(|&label| groups.iter().filter(|g| **g == Some(label)).count())
                .collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "n={n} sizes={sizes:?}");
            assert_eq!(sizes.iter().sum::<usize>(), n);
        }
    }

    #[test]
    fn test_charges_tertiles_with_nulls() {
        let values = vec![Some(10.0), None, Some(20.0), Some(30.0)];
        let groups = charges_tertiles(&values);
        assert_eq!(groups, vec![Some("Low"), None, Some("Medium"), Some("High")]);
        assert!(charges_tertiles(&[None, None]).iter().all(Option::is_none));
    }

    #[test]
    fn test_sim_gender_senior_key() {
        assert_eq!(sim_gender_senior("Jio", "Female", 1), "Jio-Female-Senior");
        assert_eq!(sim_gender_senior("VI", "Male", 0), "VI-Male-NonSenior");
    }

    #[test]
    fn test_add_quarter_keeps_rows() {
        let df = df!("tenure" => &[1i64, 4, 72]).unwrap();
        let derived = add_quarter(&df).unwrap();
        assert_eq!(derived.height(), 3);
        assert_eq!(
            data::i64_values(&derived, QUARTER).unwrap(),
            vec![Some(1), Some(2), Some(24)]
        );
        // input frame is not modified
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_add_sim_gender_senior_requires_senior() {
        let df = df!("SIM_Provider" => &["Jio"], "gender" => &["Male"]).unwrap();
        let err = add_sim_gender_senior(&df).unwrap_err();
        assert!(err.to_string().contains("SeniorCitizen"));
    }
}
