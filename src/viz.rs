//! Chart rendering using Plotters

use crate::aggregate::BoxStats;
use crate::chart::{BoxplotChart, Chart, GroupedBarChart, HeatmapChart};
use crate::config::ReportConfig;
use crate::error::ReportError;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Color palette for bar series and boxes
const SERIES_COLORS: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

/// Share of each category slot covered by its bar cluster
const CLUSTER_WIDTH: f64 = 0.8;

/// Share of each category slot covered by a box
const BOX_WIDTH: f64 = 0.5;

const LABEL_FONT_SIZE: u32 = 12;

/// Approximate pixel width of one label character at `LABEL_FONT_SIZE`
const LABEL_CHAR_WIDTH: u32 = 7;

/// Pixels between the x axis and the start of a rotated label
const LABEL_GAP: i32 = 6;

/// Render a chart description to a PNG file
///
/// # Arguments
/// * `chart` - Fully computed chart description
/// * `output_path` - Destination PNG path; its directory must exist
/// * `config` - Supplies the image sizes
///
/// # Returns
/// * `ReportError::Render` on any drawing or write failure; no file is left behind
pub fn render_chart(chart: &Chart, output_path: &Path, config: &ReportConfig) -> crate::Result<()> {
    let result = match chart {
        Chart::Bars(bars) => render_bars(bars, output_path, config.chart_size),
        Chart::Panels(panels) => render_panels(panels, output_path, config.wide_chart_size),
        Chart::Boxplot(boxplot) => render_boxplot(boxplot, output_path, config.chart_size),
        Chart::Heatmap(heatmap) => {
            let side = config.chart_size.0.max(config.chart_size.1);
            render_heatmap(heatmap, output_path, (side + 100, side))
        }
    };

    if let Err(e) = result {
        if output_path.exists() {
            let _ = std::fs::remove_file(output_path);
        }
        return Err(ReportError::Render {
            file: output_path.display().to_string(),
            reason: format!("{e:#}"),
        }
        .into());
    }

    info!("Chart saved to: {}", output_path.display());
    Ok(())
}

fn render_bars(chart: &GroupedBarChart, path: &Path, size: (u32, u32)) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw_grouped_bars(&root, chart)?;
    root.present()?;
    Ok(())
}

fn render_panels(charts: &[GroupedBarChart], path: &Path, size: (u32, u32)) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, charts.len().max(1)));
    for (panel, chart) in panels.iter().zip(charts) {
        draw_grouped_bars(panel, chart)?;
    }
    root.present()?;
    Ok(())
}

fn render_boxplot(chart: &BoxplotChart, path: &Path, size: (u32, u32)) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw_boxplot(&root, chart)?;
    root.present()?;
    Ok(())
}

fn render_heatmap(chart: &HeatmapChart, path: &Path, size: (u32, u32)) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let (matrix_area, bar_area) = root.split_horizontally(size.0 as i32 - 100);
    draw_heatmap(&matrix_area, chart)?;
    draw_colorbar(&bar_area, rotated_label_area(&chart.labels) + 10)?;
    root.present()?;
    Ok(())
}

/// Clustered bars with a text annotation above every bar
fn draw_grouped_bars(area: &Area<'_>, chart: &GroupedBarChart) -> crate::Result<()> {
    let n_categories = chart.categories.len();
    let n_series = chart.series.len().max(1);
    let y_max = value_axis_max(chart.max_value(), n_series);
    let categories = &chart.categories;
    let rotate = needs_rotated_labels(categories, area.dim_in_pixel().0);
    let label_area = if rotate {
        rotated_label_area(categories)
    } else {
        60
    };

    let mut ctx = ChartBuilder::on(area)
        .caption(chart.title.as_str(), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(label_area)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n_categories as f64 - 0.5), 0f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n_categories)
        .x_label_formatter(&|x| {
            if rotate {
                String::new()
            } else {
                category_label(categories, *x)
            }
        })
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    if rotate {
        let anchors: Vec<(i32, i32)> = (0..n_categories)
            .map(|i| ctx.backend_coord(&(i as f64, 0.0)))
            .collect();
        draw_rotated_labels(area, categories, &anchors)?;
    }

    let bar_width = CLUSTER_WIDTH / n_series as f64;
    for (s, series) in chart.series.iter().enumerate() {
        let color = SERIES_COLORS[s % SERIES_COLORS.len()];
        let offset = -CLUSTER_WIDTH / 2.0 + s as f64 * bar_width;

        ctx.draw_series(series.values.iter().enumerate().map(|(i, &value)| {
            let x0 = i as f64 + offset;
            Rectangle::new([(x0, 0.0), (x0 + bar_width, value)], color.filled())
        }))?
        .label(series.name.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        ctx.draw_series(
            series
                .values
                .iter()
                .zip(series.annotations.iter())
                .enumerate()
                .map(|(i, (&value, text))| {
                    let x = i as f64 + offset + bar_width / 2.0;
                    Text::new(text.clone(), (x, value), annotation_style(11))
                }),
        )?;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Tukey boxplot: box from q1 to q3, median line, whiskers clamped to the data
fn draw_boxplot(area: &Area<'_>, chart: &BoxplotChart) -> crate::Result<()> {
    let labels: Vec<String> = chart.groups.iter().map(|(label, _)| label.clone()).collect();
    let stats = chart
        .groups
        .iter()
        .map(|(label, values)| {
            BoxStats::from_values(values)
                .ok_or_else(|| anyhow::anyhow!("no values to summarize for '{label}'"))
        })
        .collect::<crate::Result<Vec<BoxStats>>>()?;

    let (lo, hi) = stats
        .iter()
        .flat_map(|s| {
            s.outliers
                .iter()
                .copied()
                .chain([s.lower_whisker, s.upper_whisker])
        })
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.05).max(1.0);
    let n = labels.len();

    let mut ctx = ChartBuilder::on(area)
        .caption(chart.title.as_str(), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), (lo - pad)..(hi + pad))?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| category_label(&labels, *x))
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let half = BOX_WIDTH / 2.0;
    for (i, s) in stats.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        let x = i as f64;

        ctx.draw_series([
            Rectangle::new([(x - half, s.q1), (x + half, s.q3)], color.mix(0.3).filled()),
            Rectangle::new([(x - half, s.q1), (x + half, s.q3)], color.stroke_width(2)),
        ])?;

        let cap = half / 2.0;
        ctx.draw_series([
            PathElement::new(vec![(x, s.q3), (x, s.upper_whisker)], color.stroke_width(1)),
            PathElement::new(vec![(x, s.q1), (x, s.lower_whisker)], color.stroke_width(1)),
            PathElement::new(
                vec![(x - cap, s.upper_whisker), (x + cap, s.upper_whisker)],
                color.stroke_width(1),
            ),
            PathElement::new(
                vec![(x - cap, s.lower_whisker), (x + cap, s.lower_whisker)],
                color.stroke_width(1),
            ),
            PathElement::new(vec![(x - half, s.median), (x + half, s.median)], BLACK.stroke_width(2)),
        ])?;

        ctx.draw_series(
            s.outliers
                .iter()
                .map(|&v| Circle::new((x, v), 3, color.stroke_width(1))),
        )?;
    }

    Ok(())
}

fn draw_heatmap(area: &Area<'_>, chart: &HeatmapChart) -> crate::Result<()> {
    let k = chart.labels.len();
    let labels = &chart.labels;
    let range = -0.5f64..(k as f64 - 0.5);

    let mut ctx = ChartBuilder::on(area)
        .caption(chart.title.as_str(), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(rotated_label_area(labels))
        .y_label_area_size(140)
        .build_cartesian_2d(range.clone(), range)?;

    // Row 0 is drawn at the top
    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(k)
        .y_labels(k)
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|y| category_label(labels, k as f64 - 1.0 - *y))
        .y_label_style(("sans-serif", LABEL_FONT_SIZE))
        .draw()?;

    let anchors: Vec<(i32, i32)> = (0..k)
        .map(|column| ctx.backend_coord(&(column as f64, -0.5)))
        .collect();
    draw_rotated_labels(area, labels, &anchors)?;

    let cells = (0..k).flat_map(|row| (0..k).map(move |column| (row, column)));
    ctx.draw_series(cells.clone().map(|(row, column)| {
        let value = chart.values[[row, column]];
        let y = (k - 1 - row) as f64;
        let x = column as f64;
        Rectangle::new(
            [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
            diverging_color(value).filled(),
        )
    }))?;

    ctx.draw_series(cells.map(|(row, column)| {
        let value = chart.values[[row, column]];
        let text = if value.is_nan() {
            "nan".to_string()
        } else {
            format!("{value:.2}")
        };
        let y = (k - 1 - row) as f64;
        Text::new(text, (column as f64, y), centered_style(11))
    }))?;

    Ok(())
}

/// `bottom` matches the heatmap's x label area so both scales line up
fn draw_colorbar(area: &Area<'_>, bottom: u32) -> crate::Result<()> {
    const STEPS: usize = 100;

    let mut ctx = ChartBuilder::on(area)
        .margin_top(50)
        .margin_bottom(bottom)
        .margin_right(10)
        .y_label_area_size(40)
        .build_cartesian_2d(0f64..1f64, -1f64..1f64)?;

    ctx.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(5)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()?;

    let step = 2.0 / STEPS as f64;
    ctx.draw_series((0..STEPS).map(|i| {
        let y0 = -1.0 + i as f64 * step;
        Rectangle::new(
            [(0.0, y0), (1.0, y0 + step)],
            diverging_color(y0 + step / 2.0).filled(),
        )
    }))?;

    Ok(())
}

/// Category labels rotated to read downward, each starting just under its axis anchor.
///
/// `anchors` are backend pixel positions on the x axis line.
fn draw_rotated_labels(area: &Area<'_>, labels: &[String], anchors: &[(i32, i32)]) -> crate::Result<()> {
    let (base_x, base_y) = area.get_base_pixel();
    let style = TextStyle::from(("sans-serif", LABEL_FONT_SIZE).into_font())
        .transform(FontTransform::Rotate90)
        .pos(Pos::new(HPos::Left, VPos::Center));

    for (label, &(x, y)) in labels.iter().zip(anchors) {
        area.draw_text(label, &style, (x - base_x, y - base_y + LABEL_GAP))?;
    }
    Ok(())
}

fn longest_label(labels: &[String]) -> u32 {
    labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32
}

/// Horizontal labels collide once the longest outgrows its category slot
fn needs_rotated_labels(labels: &[String], area_width: u32) -> bool {
    if labels.is_empty() {
        return false;
    }
    // y label area plus both margins
    let slot = area_width.saturating_sub(80) / labels.len() as u32;
    longest_label(labels) * LABEL_CHAR_WIDTH > slot * 9 / 10
}

/// Height of an x label area holding the longest label rotated
fn rotated_label_area(labels: &[String]) -> u32 {
    (longest_label(labels) * LABEL_CHAR_WIDTH + LABEL_GAP as u32 + 30).clamp(60, 220)
}

/// Top of the value axis; each series adds headroom for the legend box
/// above the tallest bar and its annotation
fn value_axis_max(max_value: f64, n_series: usize) -> f64 {
    (max_value * (1.2 + 0.1 * n_series as f64)).max(1.0)
}

/// Label for an integer-centered category slot; blank between slots
fn category_label(labels: &[String], position: f64) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Blue-white-red color for a correlation in [-1, 1]; NaN is grey
fn diverging_color(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if value.is_nan() {
        return RGBColor(160, 160, 160);
    }
    let t = value.clamp(-1.0, 1.0);
    let (from, to, frac) = if t < 0.0 { (MID, COLD, -t) } else { (MID, HOT, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * frac).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn annotation_style(size: u32) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom))
}

fn centered_style(size: u32) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Center, VPos::Center))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::BarSeries;
    use ndarray::Array2;
    use tempfile::tempdir;

    fn bar_chart() -> GroupedBarChart {
        GroupedBarChart {
            title: "Churn by Contract".to_string(),
            x_desc: "Contract".to_string(),
            y_desc: "Percentage (%)".to_string(),
            categories: vec!["Month-to-month".into(), "One year".into(), "Two year".into()],
            series: vec![
                BarSeries {
                    name: "No".into(),
                    values: vec![57.3, 88.7, 97.2],
                    annotations: vec!["57.3%".into(), "88.7%".into(), "97.2%".into()],
                },
                BarSeries {
                    name: "Yes".into(),
                    values: vec![42.7, 11.3, 2.8],
                    annotations: vec!["42.7%".into(), "11.3%".into(), "2.8%".into()],
                },
            ],
        }
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, 0.0), "a");
        assert_eq!(category_label(&labels, 1.0), "b");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_long_labels_rotate() {
        let short = vec!["Month-to-month".to_string(), "One year".into(), "Two year".into()];
        assert!(!needs_rotated_labels(&short, 800));
        assert!(!needs_rotated_labels(&[], 800));

        let joint: Vec<String> = ["Airtel", "BSNL", "Jio", "VI"]
            .iter()
            .flat_map(|sim| {
                ["Female-NonSenior", "Female-Senior", "Male-NonSenior", "Male-Senior"]
                    .iter()
                    .map(move |rest| format!("{sim}-{rest}"))
            })
            .collect();
        assert_eq!(joint.len(), 16);
        assert!(needs_rotated_labels(&joint, 800));

        // "Airtel-Female-NonSenior" is 23 characters
        let area = rotated_label_area(&joint);
        assert!(area >= 23 * LABEL_CHAR_WIDTH + LABEL_GAP as u32);
        assert!(area <= 220);
    }

    #[test]
    fn test_value_axis_leaves_legend_room() {
        let y_max = value_axis_max(90.0, 2);
        assert!((y_max - 126.0).abs() < 1e-9);
        assert!(value_axis_max(90.0, 3) > y_max);
        assert_eq!(value_axis_max(0.0, 2), 1.0);
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(0.0), RGBColor(221, 221, 221));
        assert_eq!(diverging_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging_color(f64::NAN), RGBColor(160, 160, 160));
    }

    #[test]
    fn test_render_bars() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("bars.png");
        let chart = Chart::Bars(bar_chart());

        render_chart(&chart, &output_path, &ReportConfig::default()).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_panels() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("panels.png");
        let chart = Chart::Panels(vec![bar_chart(), bar_chart()]);

        render_chart(&chart, &output_path, &ReportConfig::default()).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_bars_with_rotated_labels() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("rotated.png");
        let mut chart = bar_chart();
        chart.categories = vec![
            "Bank transfer (automatic)".into(),
            "Credit card (automatic)".into(),
            "Electronic check".into(),
        ];
        assert!(needs_rotated_labels(&chart.categories, 400));

        let config = ReportConfig {
            chart_size: (400, 400),
            ..ReportConfig::default()
        };
        render_chart(&Chart::Bars(chart), &output_path, &config).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_boxplot() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("box.png");
        let chart = Chart::Boxplot(BoxplotChart {
            title: "Tenure vs Churn".into(),
            x_desc: "Churn".into(),
            y_desc: "tenure".into(),
            groups: vec![
                ("No".into(), vec![1.0, 20.0, 34.0, 45.0, 72.0]),
                ("Yes".into(), vec![1.0, 2.0, 3.0, 4.0, 72.0]),
            ],
        });

        render_chart(&chart, &output_path, &ReportConfig::default()).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_heatmap() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("heatmap.png");
        let chart = Chart::Heatmap(HeatmapChart {
            title: "Correlation Heatmap".into(),
            labels: vec!["tenure".into(), "MonthlyCharges".into()],
            values: Array2::from_shape_vec((2, 2), vec![1.0, 0.25, 0.25, 1.0]).unwrap(),
        });

        render_chart(&chart, &output_path, &ReportConfig::default()).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_into_missing_directory_fails() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("missing").join("bars.png");
        let err = render_chart(&Chart::Bars(bar_chart()), &output_path, &ReportConfig::default())
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Render { .. })
        ));
        assert!(!output_path.exists());
    }
}
