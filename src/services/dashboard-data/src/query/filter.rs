//! Record filters
//!
//! A [`Filter`] is a conjunction of predicates. Membership and search
//! predicates with nothing selected are pass-through, so an untouched
//! multi-select or search box never hides rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::record::{FieldKind, FieldValue, Record};

/// Inclusive time range; either bound may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Closed range; `end` must not precede `start`
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let range = Self {
            start: Some(start),
            end: Some(end),
        };
        range.validate()?;
        Ok(range)
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(DashboardError::invalid_parameter(
                    "time_range",
                    "end must not be before start",
                ));
            }
        }
        Ok(())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    /// Calendar-day containment used for date columns
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start.map_or(true, |s| day >= s.date_naive())
            && self.end.map_or(true, |e| day <= e.date_naive())
    }

    fn matches(&self, value: &FieldValue<'_>) -> bool {
        match value {
            FieldValue::Timestamp(ts) => self.contains(*ts),
            FieldValue::Date(d) => self.contains_day(*d),
            _ => false,
        }
    }
}

/// One filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Temporal column within a time range
    Range { column: String, range: TimeRange },
    /// Column label is one of `values`; empty `values` matches everything
    Membership { column: String, values: Vec<String> },
    /// Case-insensitive substring of any of `columns`; empty `term` matches everything
    Search { columns: Vec<String>, term: String },
}

impl Predicate {
    fn validate<R: Record>(&self) -> Result<()> {
        match self {
            Self::Range { column, range } => {
                let col = R::require_column(column)?;
                if !col.kind.is_temporal() {
                    return Err(DashboardError::invalid_parameter(
                        column.as_str(),
                        "range predicates need a date or timestamp column",
                    ));
                }
                range.validate()
            }
            Self::Membership { column, .. } => {
                let col = R::require_column(column)?;
                if col.kind == FieldKind::Float {
                    return Err(DashboardError::invalid_parameter(
                        column.as_str(),
                        "membership predicates are not supported on float columns",
                    ));
                }
                Ok(())
            }
            Self::Search { columns, .. } => {
                for column in columns {
                    R::require_column(column)?;
                }
                Ok(())
            }
        }
    }

    fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Self::Range { column, range } => range.matches(&record.value(column)),
            Self::Membership { column, values } => {
                if values.is_empty() {
                    return true;
                }
                match record.value(column).label() {
                    Some(label) => values.iter().any(|v| v.as_str() == label.as_ref()),
                    None => false,
                }
            }
            Self::Search { columns, term } => {
                let needle = term.trim().to_lowercase();
                if needle.is_empty() {
                    return true;
                }
                columns.iter().any(|column| {
                    record
                        .value(column)
                        .label()
                        .map_or(false, |label| label.to_lowercase().contains(&needle))
                })
            }
        }
    }
}

/// Conjunction of predicates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, column: impl Into<String>, range: TimeRange) -> Self {
        self.predicates.push(Predicate::Range {
            column: column.into(),
            range,
        });
        self
    }

    /// Restrict `column` to the display labels of `values`
    pub fn with_membership<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.predicates.push(Predicate::Membership {
            column: column.into(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn with_search<I, C>(mut self, columns: I, term: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.predicates.push(Predicate::Search {
            columns: columns.into_iter().map(Into::into).collect(),
            term: term.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Check every predicate against the schema of `R`
    pub fn validate<R: Record>(&self) -> Result<()> {
        self.predicates.iter().try_for_each(|p| p.validate::<R>())
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Priority, Product, Region, SalesRecord, TicketCategory, TicketRecord, TicketStatus,
    };
    use chrono::{Duration, TimeZone};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn ticket(id: &str, status: TicketStatus, created: DateTime<Utc>) -> TicketRecord {
        TicketRecord {
            ticket_id: id.to_string(),
            created_date: created,
            resolved_date: status
                .is_resolved()
                .then(|| created + Duration::days(2)),
            status,
            title: format!("Printer on fire {}", id),
            category: TicketCategory::Bug,
            priority: Priority::High,
            assigned_to: "Agent 1".to_string(),
            user_id: "USER1500".to_string(),
        }
    }

    fn sale(day: u32) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            product: Product::A,
            region: Region::North,
            quantity: 1,
            price: 50,
            revenue: 50,
        }
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(TimeRange::between(ts(5, 0), ts(4, 0)).is_err());
        assert!(TimeRange::between(ts(5, 0), ts(5, 0)).is_ok());
    }

    #[test]
    fn test_membership_on_status() {
        let tickets = [
            ticket("TCK-1", TicketStatus::Resolved, ts(1, 0)),
            ticket("TCK-2", TicketStatus::Open, ts(1, 0)),
        ];
        let filter = Filter::new().with_membership(
            "status",
            [TicketStatus::Open, TicketStatus::InProgress],
        );

        filter.validate::<TicketRecord>().unwrap();
        let kept: Vec<_> = tickets.iter().filter(|t| filter.matches(*t)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ticket_id, "TCK-2");
    }

    #[test]
    fn test_empty_membership_is_pass_through() {
        let filter = Filter::new().with_membership("status", Vec::<String>::new());
        assert!(filter.matches(&ticket("TCK-1", TicketStatus::Closed, ts(1, 0))));
    }

    #[test]
    fn test_range_on_timestamps_is_inclusive() {
        let range = TimeRange::between(ts(2, 0), ts(3, 0)).unwrap();
        let filter = Filter::new().with_range("created_date", range);

        assert!(filter.matches(&ticket("a", TicketStatus::Open, ts(2, 0))));
        assert!(filter.matches(&ticket("b", TicketStatus::Open, ts(3, 0))));
        assert!(!filter.matches(&ticket("c", TicketStatus::Open, ts(3, 1))));
    }

    #[test]
    fn test_range_on_dates_matches_by_day() {
        let filter = Filter::new().with_range("date", TimeRange::since(ts(2, 18)));
        assert!(filter.matches(&sale(2)));
        assert!(!filter.matches(&sale(1)));
    }

    #[test]
    fn test_null_never_matches_range() {
        let filter = Filter::new().with_range("resolved_date", TimeRange::unbounded());
        assert!(!filter.matches(&ticket("a", TicketStatus::Open, ts(1, 0))));
        assert!(filter.matches(&ticket("b", TicketStatus::Closed, ts(1, 0))));
    }

    #[test]
    fn test_search_is_case_insensitive_or() {
        let filter = Filter::new().with_search(["ticket_id", "title"], "PRINTER");
        assert!(filter.matches(&ticket("TCK-9", TicketStatus::Open, ts(1, 0))));

        let filter = Filter::new().with_search(["ticket_id", "user_id"], "tck-9");
        assert!(filter.matches(&ticket("TCK-9", TicketStatus::Open, ts(1, 0))));

        let filter = Filter::new().with_search(["ticket_id"], "nothing");
        assert!(!filter.matches(&ticket("TCK-9", TicketStatus::Open, ts(1, 0))));

        let filter = Filter::new().with_search(["ticket_id"], "   ");
        assert!(filter.matches(&ticket("TCK-9", TicketStatus::Open, ts(1, 0))));
    }

    #[test]
    fn test_schema_validation() {
        let unknown = Filter::new().with_membership("colour", ["red"]);
        assert!(unknown.validate::<TicketRecord>().is_err());

        let not_temporal = Filter::new().with_range("status", TimeRange::unbounded());
        assert!(not_temporal.validate::<TicketRecord>().is_err());

        let float = Filter::new().with_membership("resolution_hours", ["48"]);
        assert!(float.validate::<TicketRecord>().is_err());
    }
}
