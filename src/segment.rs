//! Cluster ranking, segment labeling, and result assembly.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::data::RfmRow;
use crate::model::{KMeansFit, SEGMENT_COUNT};
use crate::scale::Scaler;

/// Ordinal customer value tier, derived from ranking clusters by mean
/// monetary value. Never computed independently per customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentLabel {
    #[serde(rename = "Low Value")]
    LowValue,
    #[serde(rename = "Mid Value")]
    MidValue,
    #[serde(rename = "High Value")]
    HighValue,
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LowValue => "Low Value",
            Self::MidValue => "Mid Value",
            Self::HighValue => "High Value",
        };
        f.write_str(name)
    }
}

const RANKED_LABELS: [SegmentLabel; SEGMENT_COUNT] = [
    SegmentLabel::LowValue,
    SegmentLabel::MidValue,
    SegmentLabel::HighValue,
];

/// Per-cluster aggregate annotated with its value tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    /// Original cluster index from the fit
    pub cluster: usize,
    pub segment: SegmentLabel,
    /// Mean recency of members, in days
    pub recency: f64,
    /// Mean order count of members
    pub frequency: f64,
    /// Mean spend of members
    pub monetary: f64,
    /// Member count
    pub customers: usize,
}

/// One customer's cleaned RFM values and assigned tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSegment {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
    pub segment: SegmentLabel,
}

/// Full segmentation output: exactly [`SEGMENT_COUNT`] summaries ordered
/// ascending by mean monetary, and one record per cleaned customer.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationResult {
    pub segments_summary: Vec<SegmentSummary>,
    pub customer_segments: Vec<CustomerSegment>,
    /// Scaler statistics fitted for this invocation; informational only
    #[serde(skip_serializing)]
    pub scaler: Scaler,
}

/// Rank clusters by mean monetary value and assemble the output.
///
/// Clusters with equal mean monetary are ordered by ascending original
/// cluster index, a stable documented tie-break. Customer records keep the
/// cleaned rows' first-seen order.
pub fn build_result(rows: Vec<RfmRow>, fit: &KMeansFit, scaler: Scaler) -> SegmentationResult {
    let mut sums = [[0.0f64; 3]; SEGMENT_COUNT];
    let mut counts = [0usize; SEGMENT_COUNT];
    for (row, &cluster) in rows.iter().zip(&fit.labels) {
        sums[cluster][0] += row.recency as f64;
        sums[cluster][1] += row.frequency as f64;
        sums[cluster][2] += row.monetary;
        counts[cluster] += 1;
    }

    let mut summaries: Vec<SegmentSummary> = (0..SEGMENT_COUNT)
        .map(|cluster| {
            let n = counts[cluster] as f64;
            SegmentSummary {
                cluster,
                // placeholder until ranked below
                segment: SegmentLabel::LowValue,
                recency: sums[cluster][0] / n,
                frequency: sums[cluster][1] / n,
                monetary: sums[cluster][2] / n,
                customers: counts[cluster],
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.monetary
            .partial_cmp(&b.monetary)
            .unwrap_or(Ordering::Equal)
            .then(a.cluster.cmp(&b.cluster))
    });

    let mut label_of_cluster = [SegmentLabel::LowValue; SEGMENT_COUNT];
    for (rank, summary) in summaries.iter_mut().enumerate() {
        summary.segment = RANKED_LABELS[rank];
        label_of_cluster[summary.cluster] = RANKED_LABELS[rank];
    }

    let customer_segments = rows
        .into_iter()
        .zip(&fit.labels)
        .map(|(row, &cluster)| CustomerSegment {
            customer_id: row.customer_id,
            recency: row.recency,
            frequency: row.frequency,
            monetary: row.monetary,
            segment: label_of_cluster[cluster],
        })
        .collect();

    SegmentationResult {
        segments_summary: summaries,
        customer_segments,
        scaler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn row(id: &str, recency: i64, frequency: u64, monetary: f64) -> RfmRow {
        RfmRow {
            customer_id: id.to_string(),
            recency,
            frequency,
            monetary,
        }
    }

    fn fit_with(labels: Vec<usize>) -> KMeansFit {
        KMeansFit {
            labels,
            centroids: Array2::zeros((SEGMENT_COUNT, 3)),
            inertia: 0.0,
            run_index: 0,
            iterations: 1,
            converged: true,
        }
    }

    #[test]
    fn test_labels_follow_monetary_ranking() {
        let rows = vec![
            row("big", 2, 9, 1000.0),
            row("small", 200, 1, 10.0),
            row("middle", 30, 3, 300.0),
        ];
        // cluster indices deliberately unordered relative to spend
        let fit = fit_with(vec![0, 2, 1]);
        let result = build_result(rows, &fit, Scaler { mean: [0.0; 3], std: [1.0; 3] });

        let order: Vec<(usize, SegmentLabel)> = result
            .segments_summary
            .iter()
            .map(|s| (s.cluster, s.segment))
            .collect();
        assert_eq!(
            order,
            vec![
                (2, SegmentLabel::LowValue),
                (1, SegmentLabel::MidValue),
                (0, SegmentLabel::HighValue),
            ]
        );

        let by_id: Vec<(&str, SegmentLabel)> = result
            .customer_segments
            .iter()
            .map(|c| (c.customer_id.as_str(), c.segment))
            .collect();
        assert_eq!(
            by_id,
            vec![
                ("big", SegmentLabel::HighValue),
                ("small", SegmentLabel::LowValue),
                ("middle", SegmentLabel::MidValue),
            ]
        );
    }

    #[test]
    fn test_summary_means_and_counts() {
        let rows = vec![
            row("a", 10, 2, 100.0),
            row("b", 20, 4, 200.0),
            row("c", 5, 1, 50.0),
            row("d", 90, 1, 900.0),
        ];
        let fit = fit_with(vec![0, 0, 1, 2]);
        let result = build_result(rows, &fit, Scaler { mean: [0.0; 3], std: [1.0; 3] });

        let cluster0 = result
            .segments_summary
            .iter()
            .find(|s| s.cluster == 0)
            .unwrap();
        assert_eq!(cluster0.customers, 2);
        assert_eq!(cluster0.recency, 15.0);
        assert_eq!(cluster0.frequency, 3.0);
        assert_eq!(cluster0.monetary, 150.0);

        let total: usize = result.segments_summary.iter().map(|s| s.customers).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_tied_monetary_means_break_by_cluster_index() {
        let rows = vec![
            row("a", 10, 1, 100.0),
            row("b", 20, 2, 100.0),
            row("c", 30, 3, 500.0),
        ];
        let fit = fit_with(vec![1, 0, 2]);
        let result = build_result(rows, &fit, Scaler { mean: [0.0; 3], std: [1.0; 3] });

        // clusters 0 and 1 both average 100.0; lower index ranks first
        assert_eq!(result.segments_summary[0].cluster, 0);
        assert_eq!(result.segments_summary[0].segment, SegmentLabel::LowValue);
        assert_eq!(result.segments_summary[1].cluster, 1);
        assert_eq!(result.segments_summary[1].segment, SegmentLabel::MidValue);
        assert_eq!(result.segments_summary[2].segment, SegmentLabel::HighValue);
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(
            serde_json::to_string(&SegmentLabel::LowValue).unwrap(),
            "\"Low Value\""
        );
        assert_eq!(SegmentLabel::HighValue.to_string(), "High Value");
    }

    #[test]
    fn test_scaler_not_serialized() {
        let rows = vec![
            row("a", 1, 1, 1.0),
            row("b", 2, 2, 2.0),
            row("c", 3, 3, 3.0),
        ];
        let fit = fit_with(vec![0, 1, 2]);
        let result = build_result(rows, &fit, Scaler { mean: [0.0; 3], std: [1.0; 3] });
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("segments_summary").is_some());
        assert!(json.get("customer_segments").is_some());
        assert!(json.get("scaler").is_none());
    }
}
