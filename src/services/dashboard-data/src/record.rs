//! Column schema and dynamic field access shared by every generated dataset
//!
//! The query pipeline never matches on concrete record types. It validates a
//! request against [`Record::COLUMNS`] / [`Record::DERIVED`] and then reads
//! values through [`Record::value`].

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{DashboardError, Result};

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    Date,
    Timestamp,
}

impl FieldKind {
    /// Date and timestamp columns accept range predicates and time buckets
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Timestamp)
    }

    /// Columns that can be summed or averaged
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Bool)
    }
}

/// A named, typed column of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A borrowed cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// Ordered category: compares by `rank`, displays as `label`
    Ordinal { rank: u8, label: &'a str },
    Null,
}

impl<'a> FieldValue<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view used by reducers; booleans count as 0/1
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Calendar day of a temporal value
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Timestamp(ts) => Some(ts.date_naive()),
            _ => None,
        }
    }

    /// Display label used by membership filters and search; `None` for nulls
    pub fn label(&self) -> Option<Cow<'a, str>> {
        match self {
            Self::Text(s) | Self::Ordinal { label: s, .. } => Some(Cow::Borrowed(*s)),
            Self::Null => None,
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Total order over values of one column. Nulls sort after everything.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Ordinal { rank: a, .. }, Self::Ordinal { rank: b, .. }) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Ordinal { label: s, .. } => f.write_str(s),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Null => Ok(()),
        }
    }
}

/// A row of a generated dataset
pub trait Record {
    /// Human readable entity name used in error messages
    const ENTITY: &'static str;

    /// Stored columns in declaration order. This is also the CSV header.
    const COLUMNS: &'static [Column];

    /// Computed columns available to queries but never exported
    const DERIVED: &'static [Column] = &[];

    /// Read a column. Unknown columns read as [`FieldValue::Null`].
    fn value(&self, column: &str) -> FieldValue<'_>;

    /// Look up a stored or derived column by name
    fn column(name: &str) -> Option<Column> {
        Self::COLUMNS
            .iter()
            .chain(Self::DERIVED.iter())
            .find(|c| c.name == name)
            .copied()
    }

    /// Look up a column or fail with an invalid parameter error
    fn require_column(name: &str) -> Result<Column> {
        Self::column(name).ok_or_else(|| {
            DashboardError::invalid_parameter(
                name,
                format!("unknown column for {}", Self::ENTITY),
            )
        })
    }

    /// Names of the stored columns
    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}
