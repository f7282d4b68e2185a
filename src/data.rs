//! Order records, value coercion, and RFM feature derivation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ndarray::Array2;
use serde::{Deserialize, Deserializer};

use crate::error::SegmentationError;
use crate::model::SEGMENT_COUNT;

/// Top-level request payload: `{"orders": [...]}`.
#[derive(Debug, Deserialize)]
pub struct SegmentationRequest {
    /// Raw order records; an absent key means an empty order set
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

/// A single raw order as received from the upstream payload.
///
/// `total_price` and `created_at` coerce leniently: a non-numeric price or
/// an unparsable timestamp becomes `None` rather than a deserialization
/// error. The normalizer decides what to do with missing values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub customer_id: String,
    #[serde(alias = "id", default)]
    pub order_id: String,
    #[serde(default, deserialize_with = "coerce_price")]
    pub total_price: Option<f64>,
    #[serde(default, deserialize_with = "coerce_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw RFM features for one customer, before cleaning.
///
/// `recency` is `None` when the customer has no parsable order date;
/// `monetary` is `None` when no valid price was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFeatures {
    pub customer_id: String,
    pub recency: Option<i64>,
    pub frequency: u64,
    pub monetary: Option<f64>,
}

/// One fully valid RFM row, ready for scaling and clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRow {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn coerce_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let coerced = match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => Some(n),
        RawPrice::Text(s) => s.trim().parse::<f64>().ok(),
        RawPrice::Other(_) => None,
    };
    Ok(coerced.filter(|v| v.is_finite()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn coerce_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(s) => parse_timestamp(&s),
        RawTimestamp::Other(_) => None,
    })
}

/// Parse a timestamp leniently: RFC 3339 first, then common naive formats.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Reference date for recency: latest valid order date plus one day.
///
/// The extra day guarantees every customer's recency is at least 1, so the
/// most recent buyer is never a zero-distance point on the recency axis.
pub fn reference_date(orders: &[OrderRecord]) -> Result<DateTime<Utc>, SegmentationError> {
    orders
        .iter()
        .filter_map(|o| o.created_at)
        .max()
        .map(|latest| latest + Duration::days(1))
        .ok_or(SegmentationError::ParseFailure)
}

/// Derive one RFM feature row per customer, in first-seen customer order.
///
/// Recency is whole days between the reference date and the customer's
/// latest valid order date. Frequency counts every order row for the
/// customer, including rows whose price failed coercion. Monetary sums
/// only valid prices. No row is dropped here; missing values are preserved
/// for [`clean_features`].
pub fn build_features(orders: &[OrderRecord]) -> Result<Vec<CustomerFeatures>, SegmentationError> {
    if orders.is_empty() {
        return Err(SegmentationError::DataAbsent);
    }
    let reference = reference_date(orders)?;

    struct Acc {
        customer_id: String,
        latest: Option<DateTime<Utc>>,
        count: u64,
        spend: Option<f64>,
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Acc> = Vec::new();

    for order in orders {
        let slot = *index.entry(order.customer_id.clone()).or_insert_with(|| {
            groups.push(Acc {
                customer_id: order.customer_id.clone(),
                latest: None,
                count: 0,
                spend: None,
            });
            groups.len() - 1
        });
        let acc = &mut groups[slot];
        acc.count += 1;
        if let Some(at) = order.created_at {
            acc.latest = Some(acc.latest.map_or(at, |prev| prev.max(at)));
        }
        if let Some(price) = order.total_price {
            acc.spend = Some(acc.spend.unwrap_or(0.0) + price);
        }
    }

    Ok(groups
        .into_iter()
        .map(|acc| CustomerFeatures {
            customer_id: acc.customer_id,
            recency: acc.latest.map(|at| (reference - at).num_days()),
            frequency: acc.count,
            monetary: acc.spend,
        })
        .collect())
}

/// Drop rows with missing or non-finite dimensions.
///
/// Dropped customers are silently absent from all downstream output. Fails
/// when fewer rows remain than clusters to populate.
pub fn clean_features(features: Vec<CustomerFeatures>) -> Result<Vec<RfmRow>, SegmentationError> {
    let rows: Vec<RfmRow> = features
        .into_iter()
        .filter_map(|f| {
            let recency = f.recency?;
            let monetary = f.monetary.filter(|m| m.is_finite())?;
            Some(RfmRow {
                customer_id: f.customer_id,
                recency,
                frequency: f.frequency,
                monetary,
            })
        })
        .collect();

    if rows.len() < SEGMENT_COUNT {
        return Err(SegmentationError::insufficient(rows.len()));
    }
    Ok(rows)
}

/// Pack cleaned rows into an `(n, 3)` feature matrix: recency, frequency,
/// monetary.
pub fn to_matrix(rows: &[RfmRow]) -> Array2<f64> {
    let mut matrix = Array2::zeros((rows.len(), 3));
    for (i, row) in rows.iter().enumerate() {
        matrix[[i, 0]] = row.recency as f64;
        matrix[[i, 1]] = row.frequency as f64;
        matrix[[i, 2]] = row.monetary as f64;
    }
    matrix
}
