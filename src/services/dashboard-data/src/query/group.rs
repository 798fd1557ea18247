//! Grouping keys, time buckets and reducers

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{DashboardError, Result};
use crate::record::{FieldKind, FieldValue, Record};

/// Truncation applied to temporal group keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    #[default]
    Day,
    Week,
    Month,
}

impl TimeBucket {
    fn key(&self, day: NaiveDate) -> KeyPart {
        match self {
            Self::Day => KeyPart::Day(day),
            Self::Week => {
                let iso = day.iso_week();
                KeyPart::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            Self::Month => KeyPart::Month {
                year: day.year(),
                month: day.month(),
            },
        }
    }
}

impl std::str::FromStr for TimeBucket {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(DashboardError::invalid_parameter(
                "bucket",
                format!("unknown time bucket '{}'", other),
            )),
        }
    }
}

/// One component of a group key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    Integer(i64),
    Bool(bool),
    Ordinal { rank: u8, label: String },
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl KeyPart {
    fn from_value(value: &FieldValue<'_>, bucket: Option<TimeBucket>) -> Option<Self> {
        match value {
            FieldValue::Text(s) => Some(Self::Text((*s).to_string())),
            FieldValue::Integer(v) => Some(Self::Integer(*v)),
            FieldValue::Bool(v) => Some(Self::Bool(*v)),
            FieldValue::Ordinal { rank, label } => Some(Self::Ordinal {
                rank: *rank,
                label: (*label).to_string(),
            }),
            FieldValue::Date(_) | FieldValue::Timestamp(_) => {
                let day = value.as_date()?;
                Some(bucket.unwrap_or_default().key(day))
            }
            FieldValue::Float(_) | FieldValue::Null => None,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Ordinal { label: s, .. } => f.write_str(s),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Week { year, week } => write!(f, "{}-W{}", year, week),
            Self::Month { year, month } => write!(f, "{}-{:02}", year, month),
        }
    }
}

impl Serialize for KeyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Bool(v) => serializer.serialize_bool(*v),
            other => serializer.collect_str(other),
        }
    }
}

/// A grouping column with an optional time bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKey {
    pub column: String,
    pub bucket: Option<TimeBucket>,
}

impl GroupKey {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            bucket: None,
        }
    }

    pub fn bucketed(column: impl Into<String>, bucket: TimeBucket) -> Self {
        Self {
            column: column.into(),
            bucket: Some(bucket),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// A named reduction over one column of each group
///
/// `Count` without a column counts rows; with a column it counts non-null values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub reducer: Reducer,
    pub column: Option<String>,
}

impl Measure {
    pub fn count() -> Self {
        Self {
            name: "count".to_string(),
            reducer: Reducer::Count,
            column: None,
        }
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self::over(Reducer::Sum, column)
    }

    pub fn mean(column: impl Into<String>) -> Self {
        Self::over(Reducer::Mean, column)
    }

    pub fn min(column: impl Into<String>) -> Self {
        Self::over(Reducer::Min, column)
    }

    pub fn max(column: impl Into<String>) -> Self {
        Self::over(Reducer::Max, column)
    }

    /// Reduce `column` with `reducer`, named `"{reducer}_{column}"`
    pub fn over(reducer: Reducer, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            name: format!("{}_{}", reducer.as_str(), column),
            reducer,
            column: Some(column),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Grouping request: one or two keys plus at least one measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    pub keys: Vec<GroupKey>,
    pub measures: Vec<Measure>,
}

impl GroupBy {
    pub fn new(key: GroupKey) -> Self {
        Self {
            keys: vec![key],
            measures: Vec::new(),
        }
    }

    pub fn then_by(mut self, key: GroupKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn validate<R: Record>(&self) -> Result<()> {
        if self.keys.is_empty() || self.keys.len() > 2 {
            return Err(DashboardError::invalid_parameter(
                "group",
                "group by one or two keys",
            ));
        }
        if self.measures.is_empty() {
            return Err(DashboardError::invalid_parameter(
                "group",
                "at least one measure is required",
            ));
        }

        for key in &self.keys {
            let col = R::require_column(&key.column)?;
            if col.kind == FieldKind::Float {
                return Err(DashboardError::invalid_parameter(
                    key.column.as_str(),
                    "cannot group on a float column",
                ));
            }
            if key.bucket.is_some() && !col.kind.is_temporal() {
                return Err(DashboardError::invalid_parameter(
                    key.column.as_str(),
                    "time buckets need a date or timestamp column",
                ));
            }
        }

        for measure in &self.measures {
            match (&measure.column, measure.reducer) {
                (None, Reducer::Count) => {}
                (None, _) => {
                    return Err(DashboardError::invalid_parameter(
                        measure.name.as_str(),
                        "measure needs a column",
                    ))
                }
                (Some(column), Reducer::Count) => {
                    R::require_column(column)?;
                }
                (Some(column), _) => {
                    let col = R::require_column(column)?;
                    if !col.kind.is_numeric() {
                        return Err(DashboardError::invalid_parameter(
                            column.as_str(),
                            format!("{} needs a numeric column", measure.reducer.as_str()),
                        ));
                    }
                }
            }
        }

        let mut names: Vec<&str> = self.keys.iter().map(|k| k.column.as_str()).collect();
        names.extend(self.measures.iter().map(|m| m.name.as_str()));
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(**n)) {
            return Err(DashboardError::invalid_parameter(
                *dup,
                "duplicate output column name",
            ));
        }
        Ok(())
    }

    pub fn header(&self) -> GroupHeader {
        GroupHeader {
            keys: self.keys.iter().map(|k| k.column.clone()).collect(),
            measures: self.measures.iter().map(|m| m.name.clone()).collect(),
        }
    }

    /// Partition `records` and reduce each group, in first-seen key order.
    /// Records with a null key component are dropped.
    pub fn aggregate<'a, R, I>(&self, records: I) -> Vec<GroupRow>
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<KeyPart>, Vec<Accumulator>)> = Vec::new();

        'records: for record in records {
            let mut key = Vec::with_capacity(self.keys.len());
            for group_key in &self.keys {
                match KeyPart::from_value(&record.value(&group_key.column), group_key.bucket) {
                    Some(part) => key.push(part),
                    None => continue 'records,
                }
            }

            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    let slot = groups.len();
                    index.insert(key.clone(), slot);
                    groups.push((key, vec![Accumulator::default(); self.measures.len()]));
                    slot
                }
            };

            for (acc, measure) in groups[slot].1.iter_mut().zip(&self.measures) {
                match &measure.column {
                    None => acc.push_row(),
                    Some(column) => acc.push(&record.value(column)),
                }
            }
        }

        groups
            .into_iter()
            .map(|(key, accs)| GroupRow {
                values: accs
                    .iter()
                    .zip(&self.measures)
                    .map(|(acc, m)| acc.finish(m.reducer))
                    .collect(),
                key,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn push_row(&mut self) {
        self.count += 1;
    }

    fn push(&mut self, value: &FieldValue<'_>) {
        if value.is_null() {
            return;
        }
        self.count += 1;
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn finish(&self, reducer: Reducer) -> Option<f64> {
        match reducer {
            Reducer::Count => Some(self.count as f64),
            Reducer::Sum => Some(self.sum),
            Reducer::Mean => (self.count > 0).then(|| self.sum / self.count as f64),
            Reducer::Min => self.min,
            Reducer::Max => self.max,
        }
    }
}

/// Output column names of a grouped view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeader {
    pub keys: Vec<String>,
    pub measures: Vec<String>,
}

impl GroupHeader {
    pub fn key_index(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == name)
    }

    pub fn measure_index(&self, name: &str) -> Option<usize> {
        self.measures.iter().position(|m| m == name)
    }
}

/// One group: key components and measure values in header order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: Vec<KeyPart>,
    pub values: Vec<Option<f64>>,
}

impl GroupRow {
    /// Key label, components joined with " / "
    pub fn label(&self) -> String {
        self.key
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, Region, SalesRecord, TicketRecord};
    use pretty_assertions::assert_eq;

    fn sale(day: u32, product: Product, region: Region, quantity: u32) -> SalesRecord {
        let price = product.price();
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            product,
            region,
            quantity,
            price,
            revenue: u64::from(quantity) * u64::from(price),
        }
    }

    #[test]
    fn test_revenue_per_product() {
        let sales = [
            sale(1, Product::A, Region::North, 10),
            sale(1, Product::A, Region::South, 4),
            sale(1, Product::B, Region::North, 2),
        ];
        let group = GroupBy::new(GroupKey::column("product")).measure(Measure::sum("revenue"));
        group.validate::<SalesRecord>().unwrap();

        let rows = group.aggregate(&sales);
        let summary: Vec<(String, Option<f64>)> =
            rows.iter().map(|r| (r.label(), r.value(0))).collect();
        assert_eq!(
            summary,
            vec![
                ("Product A".to_string(), Some(700.0)),
                ("Product B".to_string(), Some(150.0)),
            ]
        );
    }

    #[test]
    fn test_two_keys_keep_first_seen_order() {
        let sales = [
            sale(2, Product::B, Region::East, 1),
            sale(1, Product::A, Region::East, 1),
            sale(2, Product::B, Region::East, 3),
        ];
        let rows = GroupBy::new(GroupKey::column("date"))
            .then_by(GroupKey::column("product"))
            .measure(Measure::count())
            .measure(Measure::mean("quantity"))
            .aggregate(&sales);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label(), "2024-01-02 / Product B");
        assert_eq!(rows[0].values, vec![Some(2.0), Some(2.0)]);
        assert_eq!(rows[1].label(), "2024-01-01 / Product A");
    }

    #[test]
    fn test_week_and_month_labels() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(TimeBucket::Week.key(day).to_string(), "2024-W5");
        assert_eq!(TimeBucket::Month.key(day).to_string(), "2024-02");

        // ISO year differs from calendar year at the boundary
        let day = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(TimeBucket::Week.key(day).to_string(), "2025-W1");
    }

    #[test]
    fn test_null_keys_are_dropped_and_empty_mean_is_null() {
        use crate::types::{Priority, TicketCategory, TicketStatus};
        use chrono::{TimeZone, Utc};

        let open = TicketRecord {
            ticket_id: "TCK-1".into(),
            created_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            resolved_date: None,
            status: TicketStatus::Open,
            title: "Issue 1".into(),
            category: TicketCategory::Bug,
            priority: Priority::Low,
            assigned_to: "Agent 1".into(),
            user_id: "USER1000".into(),
        };

        let by_resolved = GroupBy::new(GroupKey::column("resolved_date")).measure(Measure::count());
        assert!(by_resolved.aggregate([&open]).is_empty());

        let rows = GroupBy::new(GroupKey::column("priority"))
            .measure(Measure::mean("resolution_hours"))
            .measure(Measure::sum("resolution_hours"))
            .measure(Measure::max("resolution_hours"))
            .aggregate([&open]);
        assert_eq!(rows[0].values, vec![None, Some(0.0), None]);
    }

    #[test]
    fn test_validation() {
        let float_key = GroupBy::new(GroupKey::column("resolution_hours")).measure(Measure::count());
        assert!(float_key.validate::<TicketRecord>().is_err());

        let bucket_on_text =
            GroupBy::new(GroupKey::bucketed("status", TimeBucket::Week)).measure(Measure::count());
        assert!(bucket_on_text.validate::<TicketRecord>().is_err());

        let sum_text = GroupBy::new(GroupKey::column("status")).measure(Measure::sum("title"));
        assert!(sum_text.validate::<TicketRecord>().is_err());

        let no_measure = GroupBy::new(GroupKey::column("status"));
        assert!(no_measure.validate::<TicketRecord>().is_err());

        let three_keys = GroupBy::new(GroupKey::column("status"))
            .then_by(GroupKey::column("priority"))
            .then_by(GroupKey::column("category"))
            .measure(Measure::count());
        assert!(three_keys.validate::<TicketRecord>().is_err());
    }
}
