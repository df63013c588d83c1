//! The fixed battery of churn analyses.
//!
//! Every analysis is a pure builder from the table to a `Chart`. Building
//! never touches the filesystem, so a failed analysis leaves no file behind.

use crate::aggregate::{values_by_label, Correlation, CrossTab, GroupMeans, KeyOrder, ValueCounts};
use crate::chart::{BoxplotChart, Chart, GroupedBarChart, HeatmapChart};
use crate::data::{filter_eq, CHURN};
use crate::derive;
use polars::prelude::DataFrame;

type BuildFn = Box<dyn Fn(&DataFrame) -> crate::Result<Chart>>;

/// A named chart with a fixed output filename
pub struct Analysis {
    pub name: String,
    pub filename: String,
    build: BuildFn,
}

impl Analysis {
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        build: impl Fn(&DataFrame) -> crate::Result<Chart> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            build: Box::new(build),
        }
    }

    /// Compute the chart description for `df`
    pub fn build(&self, df: &DataFrame) -> crate::Result<Chart> {
        (self.build)(df)
    }
}

impl std::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analysis")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .finish()
    }
}

/// Columns charted directly as churn percentage breakdowns: (column, file stem, title)
const DIRECT_BREAKDOWNS: [(&str, &str, &str); 17] = [
    ("gender", "Gender", "Churn by Gender"),
    ("SeniorCitizen", "SeniorCitizen", "Churn by Senior Citizen"),
    ("Contract", "Contract", "Churn by Contract"),
    ("InternetService", "InternetService", "Churn by Internet Service"),
    ("PhoneService", "PhoneService", "Churn by Phone Service"),
    ("MultipleLines", "MultipleLines", "Churn by Multiple Lines"),
    ("PaymentMethod", "PaymentMethod", "Churn by Payment Method"),
    ("PaperlessBilling", "PaperlessBilling", "Churn by Paperless Billing"),
    ("OnlineSecurity", "OnlineSecurity", "Churn by Online Security"),
    ("OnlineBackup", "OnlineBackup", "Churn by Online Backup"),
    ("DeviceProtection", "DeviceProtection", "Churn by Device Protection"),
    ("TechSupport", "TechSupport", "Churn by Tech Support"),
    ("StreamingTV", "StreamingTV", "Churn by Streaming TV"),
    ("StreamingMovies", "StreamingMovies", "Churn by Streaming Movies"),
    ("Region", "Region", "Churn by Region (Synthetic)"),
    ("Device_Type", "Device", "Churn by Device Type (Synthetic)"),
    ("Network_Type", "Network", "Churn by Network Type (Synthetic)"),
];

/// Every analysis in report order
pub fn battery() -> Vec<Analysis> {
    let mut analyses = vec![
        Analysis::new("Churn distribution", "Churn_Distribution.png", churn_distribution),
        Analysis::new("Tenure vs churn", "Tenure_vs_Churn.png", |df| {
            churn_boxplot(df, "tenure", "Tenure vs Churn")
        }),
        Analysis::new("Monthly charges vs churn", "MonthlyCharges_vs_Churn.png", |df| {
            churn_boxplot(df, "MonthlyCharges", "Monthly Charges vs Churn")
        }),
        Analysis::new("Contract distribution", "Contract_Distribution.png", |df| {
            count_distribution(df, "Contract", "Contract Type Distribution")
        }),
        Analysis::new(
            "Internet service distribution",
            "InternetService_Distribution.png",
            |df| count_distribution(df, "InternetService", "Internet Service Distribution"),
        ),
    ];

    for (column, stem, title) in DIRECT_BREAKDOWNS {
        analyses.push(Analysis::new(
            title,
            format!("Churn_by_{stem}.png"),
            move |df| churn_by(df, &[column], KeyOrder::Natural, title, column),
        ));
    }

    analyses.extend([
        Analysis::new("Senior churn by gender", "Churn_Senior_by_Gender.png", senior_by_gender),
        Analysis::new("Churn by SIM provider", "Churn_by_SIMProvider.png", |df| {
            churn_by(df, &["SIM_Provider"], KeyOrder::Natural, "Churn by SIM Provider", "SIM_Provider")
        }),
        Analysis::new("Churn by usage pattern", "Churn_by_UsagePattern.png", |df| {
            churn_by(
                df,
                &["Usage_Pattern"],
                KeyOrder::Explicit(&["Low", "Medium", "High"]),
                "Churn by Usage Pattern (Synthetic)",
                "Usage_Pattern",
            )
        }),
        Analysis::new("Churn by tenure group", "Churn_by_TenureGroup.png", tenure_group),
        Analysis::new("Churn by charges group", "Churn_by_ChargesGroup.png", charges_group),
        Analysis::new("Churn by SIM provider and gender", "Churn_by_Gender_SIMProvider.png", |df| {
            churn_by(
                df,
                &["SIM_Provider", "gender"],
                KeyOrder::Natural,
                "Churn by SIM Provider and Gender",
                "(SIM_Provider, gender)",
            )
        }),
        Analysis::new(
            "Churn by SIM provider and senior status",
            "Churn_by_Senior_SIMProvider.png",
            |df| {
                churn_by(
                    df,
                    &["SIM_Provider", "SeniorCitizen"],
                    KeyOrder::Natural,
                    "Churn by SIM Provider and Senior Citizen",
                    "(SIM_Provider, SeniorCitizen)",
                )
            },
        ),
        Analysis::new(
            "Churn by SIM provider, gender and senior status",
            "Churn_by_SIM_Gender_Senior.png",
            sim_gender_senior,
        ),
        Analysis::new("Churn by quarterly tenure", "Churn_by_QuarterlyTenure.png", quarterly_tenure),
        Analysis::new(
            "Average monthly charges by SIM provider",
            "Avg_MonthlyCharges_by_SIM.png",
            avg_charges_by_sim,
        ),
        Analysis::new(
            "Region by gender and senior status",
            "Region_Gender_Senior.png",
            region_gender_senior,
        ),
        Analysis::new("Correlation heatmap", "Correlation_Heatmap.png", correlation_heatmap),
    ]);

    analyses
}

/// Churn percentage breakdown over one or more key columns
fn churn_by(
    df: &DataFrame,
    keys: &[&str],
    order: KeyOrder<'_>,
    title: &str,
    x_desc: &str,
) -> crate::Result<Chart> {
    let ct = CrossTab::from_frame(df, keys, CHURN, order)?;
    Ok(Chart::Bars(GroupedBarChart::percent_crosstab(title, x_desc, &ct)))
}

fn churn_distribution(df: &DataFrame) -> crate::Result<Chart> {
    let vc = ValueCounts::from_frame(df, CHURN)?;
    Ok(Chart::Bars(GroupedBarChart::percent_distribution(
        "Churn Distribution",
        CHURN,
        &vc,
    )))
}

fn count_distribution(df: &DataFrame, column: &str, title: &str) -> crate::Result<Chart> {
    let vc = ValueCounts::from_frame(df, column)?;
    Ok(Chart::Bars(GroupedBarChart::count_distribution(title, column, &vc)))
}

fn churn_boxplot(df: &DataFrame, value: &str, title: &str) -> crate::Result<Chart> {
    let groups = values_by_label(df, value, CHURN)?;
    Ok(Chart::Boxplot(BoxplotChart {
        title: title.to_string(),
        x_desc: CHURN.to_string(),
        y_desc: value.to_string(),
        groups,
    }))
}

fn senior_by_gender(df: &DataFrame) -> crate::Result<Chart> {
    let seniors = filter_eq(df, "SeniorCitizen", 1)?;
    churn_by(
        &seniors,
        &["gender"],
        KeyOrder::Natural,
        "Churn among Senior Citizens by Gender",
        "gender",
    )
}

fn tenure_group(df: &DataFrame) -> crate::Result<Chart> {
    let grouped = derive::add_tenure_group(df)?;
    churn_by(
        &grouped,
        &[derive::TENURE_GROUP],
        KeyOrder::Explicit(&derive::TENURE_LABELS),
        "Churn by Tenure Group",
        "Tenure (months)",
    )
}

fn charges_group(df: &DataFrame) -> crate::Result<Chart> {
    let grouped = derive::add_charges_group(df)?;
    churn_by(
        &grouped,
        &[derive::CHARGES_GROUP],
        KeyOrder::Explicit(&derive::CHARGES_LABELS),
        "Churn by Monthly Charges Group",
        "MonthlyCharges tertile",
    )
}

fn sim_gender_senior(df: &DataFrame) -> crate::Result<Chart> {
    let keyed = derive::add_sim_gender_senior(df)?;
    churn_by(
        &keyed,
        &[derive::SIM_GENDER_SENIOR],
        KeyOrder::Natural,
        "Churn by SIM Provider, Gender and Senior Status",
        "SIM-Gender-Senior",
    )
}

fn quarterly_tenure(df: &DataFrame) -> crate::Result<Chart> {
    let quartered = derive::add_quarter(df)?;
    churn_by(
        &quartered,
        &[derive::QUARTER],
        KeyOrder::Natural,
        "Churn by Quarterly Tenure",
        "Quarter",
    )
}

fn avg_charges_by_sim(df: &DataFrame) -> crate::Result<Chart> {
    let means = GroupMeans::from_frame(df, "SIM_Provider", CHURN, "MonthlyCharges")?;
    Ok(Chart::Bars(GroupedBarChart::mean_shares(
        "Average Monthly Charges by SIM Provider and Churn",
        "SIM_Provider",
        "Average MonthlyCharges",
        &means,
    )))
}

/// Gender counts per region, one panel per senior status
fn region_gender_senior(df: &DataFrame) -> crate::Result<Chart> {
    crate::data::require_columns(df, &["Region", "gender", "SeniorCitizen"])?;

    let panels = [(0, "Non-Senior Citizens"), (1, "Senior Citizens")]
        .into_iter()
        .map(|(senior, title)| -> crate::Result<GroupedBarChart> {
            let subset = filter_eq(df, "SeniorCitizen", senior)?;
            let ct = CrossTab::from_frame(&subset, &["Region"], "gender", KeyOrder::Natural)?;
            Ok(GroupedBarChart::count_crosstab(title, "Region", &ct))
        })
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(Chart::Panels(panels))
}

fn correlation_heatmap(df: &DataFrame) -> crate::Result<Chart> {
    let corr = Correlation::from_frame(df)?;
    Ok(Chart::Heatmap(HeatmapChart {
        title: "Correlation Heatmap".to_string(),
        labels: corr.columns,
        values: corr.matrix,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::collections::HashSet;

    fn churn_frame() -> DataFrame {
        df!(
            "gender" => &["Female", "Male", "Male", "Female", "Male", "Female"],
            "SeniorCitizen" => &[0i64, 1, 1, 0, 0, 1],
            "tenure" => &[1i64, 34, 2, 45, 8, 72],
            "MonthlyCharges" => &[29.85, 56.95, 53.85, 42.3, 99.65, 89.1],
            "Contract" => &["Month-to-month", "One year", "Month-to-month", "One year", "Month-to-month", "Two year"],
            "Region" => &["Urban", "Rural", "Urban", "Urban", "Rural", "Rural"],
            "SIM_Provider" => &["Jio", "Airtel", "Jio", "VI", "Jio", "BSNL"],
            "Churn" => &["No", "No", "Yes", "No", "Yes", "No"]
        )
        .unwrap()
    }

    fn find(name: &str) -> Analysis {
        battery()
            .into_iter()
            .find(|a| a.filename == name)
            .unwrap_or_else(|| panic!("no analysis writes {name}"))
    }

    #[test]
    fn test_battery_filenames_are_unique_and_complete() {
        let analyses = battery();
        let names: HashSet<&str> = analyses.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names.len(), analyses.len());

        for expected in [
            "Churn_Distribution.png",
            "Churn_by_Gender.png",
            "Churn_by_SeniorCitizen.png",
            "Churn_Senior_by_Gender.png",
            "Churn_by_Contract.png",
            "Churn_by_InternetService.png",
            "Churn_by_PhoneService.png",
            "Churn_by_MultipleLines.png",
            "Churn_by_PaymentMethod.png",
            "Churn_by_PaperlessBilling.png",
            "Churn_by_OnlineSecurity.png",
            "Churn_by_OnlineBackup.png",
            "Churn_by_DeviceProtection.png",
            "Churn_by_TechSupport.png",
            "Churn_by_StreamingTV.png",
            "Churn_by_StreamingMovies.png",
            "Churn_by_TenureGroup.png",
            "Churn_by_ChargesGroup.png",
            "Churn_by_SIMProvider.png",
            "Churn_by_Gender_SIMProvider.png",
            "Churn_by_Senior_SIMProvider.png",
            "Churn_by_SIM_Gender_Senior.png",
            "Churn_by_QuarterlyTenure.png",
            "Avg_MonthlyCharges_by_SIM.png",
            "Churn_by_Device.png",
            "Churn_by_Network.png",
            "Churn_by_UsagePattern.png",
            "Region_Gender_Senior.png",
            "Correlation_Heatmap.png",
        ] {
            assert!(names.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_senior_by_gender_uses_seniors_only() {
        let chart = find("Churn_Senior_by_Gender.png").build(&churn_frame()).unwrap();
        let Chart::Bars(bars) = chart else {
            panic!("expected bars")
        };
        // seniors: Male/No, Male/Yes, Female/No
        assert_eq!(bars.categories, vec!["Female", "Male"]);
        assert_eq!(bars.series[0].annotations, vec!["100.0%", "50.0%"]);
        assert_eq!(bars.series[1].annotations, vec!["0.0%", "50.0%"]);
    }

    #[test]
    fn test_tenure_group_order() {
        let chart = find("Churn_by_TenureGroup.png").build(&churn_frame()).unwrap();
        let Chart::Bars(bars) = chart else {
            panic!("expected bars")
        };
        assert_eq!(bars.categories, vec!["0-12", "25-48", "49-72"]);
    }

    #[test]
    fn test_quarterly_tenure_numeric_order() {
        let chart = find("Churn_by_QuarterlyTenure.png").build(&churn_frame()).unwrap();
        let Chart::Bars(bars) = chart else {
            panic!("expected bars")
        };
        assert_eq!(bars.categories, vec!["1", "3", "12", "15", "24"]);
    }

    #[test]
    fn test_sim_gender_senior_keys() {
        let chart = find("Churn_by_SIM_Gender_Senior.png").build(&churn_frame()).unwrap();
        let Chart::Bars(bars) = chart else {
            panic!("expected bars")
        };
        assert!(bars.categories.contains(&"Jio-Male-Senior".to_string()));
        assert!(bars.categories.contains(&"BSNL-Female-Senior".to_string()));
    }

    #[test]
    fn test_region_gender_senior_panels() {
        let chart = find("Region_Gender_Senior.png").build(&churn_frame()).unwrap();
        let Chart::Panels(panels) = chart else {
            panic!("expected panels")
        };
        assert_eq!(panels.len(), 2);
        // non-seniors: Urban Female x2, Rural Male x1
        assert_eq!(panels[0].categories, vec!["Rural", "Urban"]);
        assert_eq!(panels[0].series[0].name, "Female");
        assert_eq!(panels[0].series[0].values, vec![0.0, 2.0]);
        assert_eq!(panels[0].y_desc, "Count");
    }

    #[test]
    fn test_avg_charges_annotations_are_row_shares() {
        let chart = find("Avg_MonthlyCharges_by_SIM.png").build(&churn_frame()).unwrap();
        let Chart::Bars(bars) = chart else {
            panic!("expected bars")
        };
        let jio = bars.categories.iter().position(|c| c == "Jio").unwrap();
        // Jio: No mean 29.85, Yes mean (53.85 + 99.65) / 2 = 76.75
        assert!((bars.series[0].values[jio] - 29.85).abs() < 1e-9);
        assert!((bars.series[1].values[jio] - 76.75).abs() < 1e-9);
        assert_eq!(bars.series[0].annotations[jio], "28.0%");
        assert_eq!(bars.series[1].annotations[jio], "72.0%");
    }

    #[test]
    fn test_missing_column_fails_only_dependent_analyses() {
        let df = churn_frame().drop("SeniorCitizen").unwrap();
        assert!(find("Churn_by_SeniorCitizen.png").build(&df).is_err());
        assert!(find("Churn_Senior_by_Gender.png").build(&df).is_err());
        assert!(find("Region_Gender_Senior.png").build(&df).is_err());
        assert!(find("Churn_by_Contract.png").build(&df).is_ok());
        assert!(find("Correlation_Heatmap.png").build(&df).is_ok());
    }

    #[test]
    fn test_boxplot_groups() {
        let chart = find("Tenure_vs_Churn.png").build(&churn_frame()).unwrap();
        let Chart::Boxplot(boxplot) = chart else {
            panic!("expected boxplot")
        };
        assert_eq!(boxplot.groups[0].0, "No");
        assert_eq!(boxplot.groups[1].1, vec![2.0, 8.0]);
    }
}
