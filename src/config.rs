//! Report configuration

use std::path::PathBuf;

/// Seed used for synthetic column generation
pub const DEFAULT_SEED: u64 = 42;

/// Settings shared by every analysis in a report run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Directory receiving the rendered charts
    pub save_dir: PathBuf,
    /// Seed for the synthetic column generator
    pub seed: u64,
    /// Pixel size of single-panel charts
    pub chart_size: (u32, u32),
    /// Pixel size of multi-panel and heatmap charts
    pub wide_chart_size: (u32, u32),
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("plots"),
            seed: DEFAULT_SEED,
            chart_size: (800, 600),
            wide_chart_size: (1200, 500),
        }
    }
}

impl ReportConfig {
    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    /// Full output path for a chart file
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.save_dir.join(filename)
    }
}
