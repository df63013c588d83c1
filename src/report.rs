//! Report orchestration: load, augment, then run every analysis fail-soft

use crate::analyses::{battery, Analysis};
use crate::config::ReportConfig;
use crate::data::load_dataset;
use crate::error::{FailureKind, ReportError};
use crate::synth::{add_synthetic_columns, SyntheticRng};
use crate::viz::render_chart;
use anyhow::Context;
use log::{error, info};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

/// A failed analysis and why it failed
#[derive(Debug, Clone)]
pub struct AnalysisFailure {
    pub name: String,
    pub filename: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a battery run
#[derive(Debug, Clone, Default)]
pub struct ReportSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<AnalysisFailure>,
}

impl ReportSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the loaded table and renders the analysis battery into `save_dir`
pub struct ReportGenerator {
    config: ReportConfig,
    table: Option<DataFrame>,
}

impl ReportGenerator {
    /// Create the generator and its output directory
    pub fn new(config: ReportConfig) -> crate::Result<Self> {
        std::fs::create_dir_all(&config.save_dir).with_context(|| {
            format!("creating output directory {}", config.save_dir.display())
        })?;
        Ok(Self {
            config,
            table: None,
        })
    }

    /// Generator over an already loaded table
    pub fn with_table(config: ReportConfig, table: DataFrame) -> crate::Result<Self> {
        let mut generator = Self::new(config)?;
        generator.table = Some(table);
        Ok(generator)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn table(&self) -> Option<&DataFrame> {
        self.table.as_ref()
    }

    /// Load the dataset; on failure the error is logged and the table stays empty
    pub fn load(&mut self, file_path: impl AsRef<Path>) -> bool {
        match load_dataset(file_path.as_ref()) {
            Ok(df) => {
                self.table = Some(df);
                true
            }
            Err(e) => {
                error!("Loading dataset failed: {e:#}");
                self.table = None;
                false
            }
        }
    }

    /// Append the synthetic columns using the configured seed
    pub fn augment(&mut self) -> bool {
        let Some(table) = self.table.as_mut() else {
            error!("Adding synthetic columns failed: {}", ReportError::NoDataset);
            return false;
        };

        let mut rng = SyntheticRng::new(self.config.seed);
        match add_synthetic_columns(table, &mut rng) {
            Ok(()) => true,
            Err(e) => {
                error!("Adding synthetic columns failed: {e:#}");
                false
            }
        }
    }

    /// Build and render one analysis
    pub fn run_analysis(&self, analysis: &Analysis) -> crate::Result<PathBuf> {
        let table = self.table.as_ref().ok_or(ReportError::NoDataset)?;
        let chart = analysis
            .build(table)
            .with_context(|| format!("building {}", analysis.filename))?;

        let output_path = self.config.output_path(&analysis.filename);
        render_chart(&chart, &output_path, &self.config)?;
        Ok(output_path)
    }

    /// Run every analysis; failures are logged and collected, never propagated
    pub fn run_battery(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();

        for analysis in battery() {
            match self.run_analysis(&analysis) {
                Ok(path) => summary.written.push(path),
                Err(e) => {
                    let kind = FailureKind::classify(&e);
                    error!("ERROR in {} ({}): {e:#}", analysis.name, analysis.filename);
                    summary.failures.push(AnalysisFailure {
                        name: analysis.name.clone(),
                        filename: analysis.filename.clone(),
                        kind,
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            "{} charts written, {} failed",
            summary.written.len(),
            summary.failures.len()
        );
        summary
    }

    /// Load, augment and render the full report
    pub fn run(&mut self, file_path: impl AsRef<Path>) -> ReportSummary {
        if self.load(file_path) {
            self.augment();
        }
        self.run_battery()
    }
}
