//! Command-line interface definitions and argument parsing

use crate::config::ReportConfig;
use clap::Parser;

/// Churn exploratory-analysis report: renders a fixed set of PNG charts from a CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    pub input: String,

    /// Directory receiving the charts (created if absent)
    #[arg(default_value = "plots")]
    pub output_dir: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Report configuration for these arguments
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig::default().with_save_dir(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_positional_paths() {
        let args = Args::try_parse_from(["churnviz", "telco.csv", "out"]).unwrap();
        assert_eq!(args.input, "telco.csv");
        assert_eq!(args.output_dir, "out");
        assert_eq!(args.verbose, 0);
        assert_eq!(args.report_config().save_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_default_output_dir() {
        let args = Args::try_parse_from(["churnviz", "telco.csv", "-vv"]).unwrap();
        assert_eq!(args.output_dir, "plots");
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["churnviz"]).is_err());
        assert!(Args::try_parse_from(["churnviz", "a.csv", "-v", "-q"]).is_err());
    }
}
