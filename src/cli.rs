//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::model::{DEFAULT_MAX_ITERATIONS, DEFAULT_RESTARTS, DEFAULT_SEED};
use crate::SegmentationConfig;

/// Customer segmentation CLI: RFM features + K-Means value tiers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON payload ({"orders": [...]}); reads stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Write the result JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base seed for the clustering restarts
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of independent seeded restarts
    #[arg(long, default_value_t = DEFAULT_RESTARTS)]
    pub restarts: usize,

    /// Maximum iterations per restart
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iters: usize,

    /// Save a scatter plot of the segments to this PNG path
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,

    /// Enable verbose progress output on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Segmentation tunables selected on the command line.
    pub fn config(&self) -> SegmentationConfig {
        SegmentationConfig {
            seed: self.seed,
            n_restarts: self.restarts,
            max_iterations: self.max_iters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_mapping() {
        let args = Args {
            input: None,
            output: None,
            seed: 7,
            restarts: 12,
            max_iters: 50,
            plot: None,
            pretty: false,
            verbose: false,
        };

        let config = args.config();
        assert_eq!(config.seed, 7);
        assert_eq!(config.n_restarts, 12);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["segmentforge"]);
        assert_eq!(args.seed, DEFAULT_SEED);
        assert_eq!(args.restarts, DEFAULT_RESTARTS);
        assert_eq!(args.max_iters, DEFAULT_MAX_ITERATIONS);
        assert!(args.input.is_none());
    }
}
