//! Segment scatter plot rendering using Plotters.

use std::path::Path;

use plotters::prelude::*;

use crate::segment::{SegmentLabel, SegmentationResult};

/// One color per value tier, low to high.
const SEGMENT_COLORS: [(SegmentLabel, RGBColor); 3] = [
    (SegmentLabel::LowValue, RED),
    (SegmentLabel::MidValue, BLUE),
    (SegmentLabel::HighValue, GREEN),
];

/// Draw a recency-vs-monetary scatter of the segmented customers.
pub fn render_segment_plot(
    result: &SegmentationResult,
    output_path: &Path,
) -> crate::Result<()> {
    let recency: Vec<f64> = result
        .customer_segments
        .iter()
        .map(|c| c.recency as f64)
        .collect();
    let monetary: Vec<f64> = result
        .customer_segments
        .iter()
        .map(|c| c.monetary)
        .collect();

    let x_min = recency.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - 1.0;
    let x_max = recency.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + 1.0;
    let y_pad = (monetary.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)).abs() * 0.05).max(1.0);
    let y_min = monetary.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - y_pad;
    let y_max = monetary.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + y_pad;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Customer Segments: Recency vs Monetary",
            ("sans-serif", 30),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Recency (days)")
        .y_desc("Monetary")
        .draw()?;

    for (label, color) in SEGMENT_COLORS {
        let points: Vec<(f64, f64)> = result
            .customer_segments
            .iter()
            .filter(|c| c.segment == label)
            .map(|c| (c.recency as f64, c.monetary))
            .collect();

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )?
            .label(label.to_string())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
