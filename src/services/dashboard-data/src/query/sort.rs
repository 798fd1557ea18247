use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::group::{GroupHeader, GroupRow};
use crate::error::{DashboardError, Result};
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Sort by one named column. Nulls sort last in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }

    /// Stable sort of records by a record column
    pub fn sort_records<R: Record>(&self, records: &mut [&R]) -> Result<()> {
        R::require_column(&self.column)?;
        records.sort_by(|a, b| {
            let (x, y) = (a.value(&self.column), b.value(&self.column));
            self.nulls_last(x.is_null(), y.is_null(), || x.compare(&y))
        });
        Ok(())
    }

    /// Stable sort of grouped rows by a key or measure name
    pub fn sort_groups(&self, header: &GroupHeader, rows: &mut [GroupRow]) -> Result<()> {
        if let Some(i) = header.key_index(&self.column) {
            rows.sort_by(|a, b| self.order.apply(a.key[i].cmp(&b.key[i])));
            return Ok(());
        }
        if let Some(i) = header.measure_index(&self.column) {
            rows.sort_by(|a, b| {
                let (x, y) = (a.value(i), b.value(i));
                self.nulls_last(x.is_none(), y.is_none(), || match (x, y) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => Ordering::Equal,
                })
            });
            return Ok(());
        }
        Err(DashboardError::invalid_parameter(
            self.column.as_str(),
            "sort column is neither a group key nor a measure",
        ))
    }

    fn nulls_last(&self, a_null: bool, b_null: bool, cmp: impl FnOnce() -> Ordering) -> Ordering {
        match (a_null, b_null) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.order.apply(cmp()),
        }
    }
}
