//! churnviz: exploratory churn report generator
//!
//! Loads a customer-churn CSV, adds seeded synthetic categorical attributes,
//! and renders a fixed battery of churn breakdown charts to PNG files.

pub mod aggregate;
pub mod analyses;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod derive;
pub mod error;
pub mod report;
pub mod synth;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::ReportConfig;
pub use data::load_dataset;
pub use error::{FailureKind, ReportError};
pub use report::{ReportGenerator, ReportSummary};
pub use synth::{add_synthetic_columns, SyntheticRng};
pub use viz::render_chart;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
