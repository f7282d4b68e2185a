//! SegmentForge: customer segmentation CLI over JSON order payloads.
//!
//! Reads `{"orders": [...]}` from a file or stdin, runs the segmentation
//! pipeline, and writes the result JSON to stdout or a file. Core failures
//! are reported as a JSON error envelope with a variant-specific exit code.

use std::fs;
use std::io::Read;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use segmentforge::{segment_customers, viz, Args, SegmentationRequest};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let envelope = serde_json::json!({ "error": failure.message });
            println!("{envelope}");
            ExitCode::from(failure.code)
        }
    }
}

struct Failure {
    message: String,
    code: u8,
}

impl Failure {
    fn io(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            code: 1,
        }
    }
}

fn run(args: &Args) -> Result<(), Failure> {
    let start_time = Instant::now();

    if args.verbose {
        eprintln!("SegmentForge - Customer Segmentation using K-Means");
        eprintln!("Step 1: Loading order payload");
    }

    let payload = read_payload(args).map_err(Failure::io)?;
    let request: SegmentationRequest = serde_json::from_str(&payload)
        .context("malformed request payload")
        .map_err(Failure::io)?;

    if args.verbose {
        eprintln!("  Loaded {} orders", request.orders.len());
        eprintln!(
            "Step 2: Segmenting (seed={}, restarts={}, max_iters={})",
            args.seed, args.restarts, args.max_iters
        );
    }

    let result = segment_customers(&request.orders, &args.config()).map_err(|err| Failure {
        message: err.to_string(),
        code: err.exit_code() as u8,
    })?;

    if args.verbose {
        for summary in &result.segments_summary {
            eprintln!(
                "  {}: {} customers (R={:.1}, F={:.1}, M={:.2})",
                summary.segment,
                summary.customers,
                summary.recency,
                summary.frequency,
                summary.monetary
            );
        }
    }

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("failed to serialize result")
    .map_err(Failure::io)?;

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))
            .map_err(Failure::io)?,
        None => println!("{rendered}"),
    }

    if let Some(plot_path) = &args.plot {
        viz::render_segment_plot(&result, plot_path)
            .context("failed to render segment plot")
            .map_err(Failure::io)?;
        if args.verbose {
            eprintln!("  Plot saved to: {}", plot_path.display());
        }
    }

    if args.verbose {
        eprintln!(
            "Done: {} customers segmented in {:.2}s",
            result.customer_segments.len(),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

fn read_payload(args: &Args) -> anyhow::Result<String> {
    match &args.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read payload from stdin")?;
            Ok(buffer)
        }
    }
}
