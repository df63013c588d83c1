//! Error taxonomy for report generation

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures an analysis step can report.
///
/// Library functions return `anyhow::Result`, and these values travel inside it.
/// The orchestrator downcasts to classify a failure without unwinding the whole run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to load dataset from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("required column '{column}' not found")]
    ColumnMissing { column: String },

    #[error("nothing to plot for {what}")]
    EmptyAggregation { what: String },

    #[error("failed to render {file}: {reason}")]
    Render { file: String, reason: String },

    #[error("no dataset loaded")]
    NoDataset,

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

/// Coarse failure category recorded in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Load,
    ColumnMissing,
    EmptyAggregation,
    Render,
    Other,
}

impl FailureKind {
    /// Classify an error chain produced by an analysis step
    pub fn classify(err: &anyhow::Error) -> Self {
        match err.chain().find_map(|e| e.downcast_ref::<ReportError>()) {
            Some(ReportError::Load { .. }) | Some(ReportError::NoDataset) => FailureKind::Load,
            Some(ReportError::ColumnMissing { .. }) => FailureKind::ColumnMissing,
            Some(ReportError::EmptyAggregation { .. }) => FailureKind::EmptyAggregation,
            Some(ReportError::Render { .. }) => FailureKind::Render,
            Some(ReportError::Polars(PolarsError::ColumnNotFound(_))) => FailureKind::ColumnMissing,
            Some(ReportError::Polars(_)) | None => FailureKind::Other,
        }
    }
}
