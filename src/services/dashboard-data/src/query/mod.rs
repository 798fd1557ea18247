//! Filter, group, sort and paginate pipeline over any [`Record`] type
//!
//! The pipeline is stateless: records and the declarative [`Query`] come in,
//! a [`View`] comes out. A query is validated against the record schema
//! before any record is touched.

use serde::Serialize;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::record::Record;

mod filter;
mod group;
mod page;
mod sort;

pub use filter::{Filter, Predicate, TimeRange};
pub use group::{GroupBy, GroupHeader, GroupKey, GroupRow, KeyPart, Measure, Reducer, TimeBucket};
pub use page::{Page, PageRequest};
pub use sort::{SortOrder, SortSpec};

/// Declarative query: filter, then optional group, sort and page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Filter,
    pub group: Option<GroupBy>,
    pub sort: Option<SortSpec>,
    pub page: Option<PageRequest>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn group(mut self, group: GroupBy) -> Self {
        self.group = Some(group);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    /// Validate every part of the query against the schema of `R`
    pub fn validate<R: Record>(&self) -> Result<()> {
        self.filter.validate::<R>()?;
        if let Some(page) = &self.page {
            page.validate()?;
        }
        match (&self.group, &self.sort) {
            (Some(group), Some(sort)) => {
                group.validate::<R>()?;
                let header = group.header();
                if header.key_index(&sort.column).is_none()
                    && header.measure_index(&sort.column).is_none()
                {
                    return Err(DashboardError::invalid_parameter(
                        sort.column.as_str(),
                        "sort column is neither a group key nor a measure",
                    ));
                }
            }
            (Some(group), None) => group.validate::<R>()?,
            (None, Some(sort)) => {
                R::require_column(&sort.column)?;
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// Grouped summary: column names plus one page of rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    pub header: GroupHeader,
    pub page: Page<GroupRow>,
}

impl GroupTable {
    /// Value of `measure` for the row whose key label is `label`
    pub fn lookup(&self, label: &str, measure: &str) -> Option<f64> {
        let index = self.header.measure_index(measure)?;
        self.page
            .items
            .iter()
            .find(|row| row.label() == label)
            .and_then(|row| row.value(index))
    }
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View<R> {
    Records(Page<R>),
    Groups(GroupTable),
}

impl<R> View<R> {
    pub fn total_count(&self) -> usize {
        match self {
            Self::Records(page) => page.total_count,
            Self::Groups(table) => table.page.total_count,
        }
    }

    pub fn into_records(self) -> Option<Page<R>> {
        match self {
            Self::Records(page) => Some(page),
            Self::Groups(_) => None,
        }
    }

    pub fn into_groups(self) -> Option<GroupTable> {
        match self {
            Self::Groups(table) => Some(table),
            Self::Records(_) => None,
        }
    }
}

/// Stateless query executor
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPipeline;

impl QueryPipeline {
    /// Run `query` over `records`
    pub fn apply<R: Record + Clone>(records: &[R], query: &Query) -> Result<View<R>> {
        query.validate::<R>()?;

        let filtered: Vec<&R> = records.iter().filter(|r| query.filter.matches(*r)).collect();
        debug!(
            entity = R::ENTITY,
            input = records.len(),
            matched = filtered.len(),
            grouped = query.group.is_some(),
            "Applied query filter"
        );

        match &query.group {
            Some(group) => {
                let header = group.header();
                let mut rows = group.aggregate(filtered);
                if let Some(sort) = &query.sort {
                    sort.sort_groups(&header, &mut rows)?;
                }
                let page = match query.page {
                    Some(request) => Page::paginate(rows, request),
                    None => Page::single(rows),
                };
                Ok(View::Groups(GroupTable { header, page }))
            }
            None => {
                let mut rows = filtered;
                if let Some(sort) = &query.sort {
                    sort.sort_records(&mut rows)?;
                }
                let rows: Vec<R> = rows.into_iter().cloned().collect();
                let page = match query.page {
                    Some(request) => Page::paginate(rows, request),
                    None => Page::single(rows),
                };
                Ok(View::Records(page))
            }
        }
    }

    /// Records matching `filter`, in input order
    pub fn select<'a, R: Record>(records: &'a [R], filter: &Filter) -> Result<Vec<&'a R>> {
        filter.validate::<R>()?;
        Ok(records.iter().filter(|r| filter.matches(*r)).collect())
    }

    /// Filter then group `records`, unpaged
    pub fn summarize<R: Record + Clone>(
        records: &[R],
        filter: &Filter,
        group: GroupBy,
        sort: Option<SortSpec>,
    ) -> Result<GroupTable> {
        let query = Query {
            filter: filter.clone(),
            group: Some(group),
            sort,
            page: None,
        };
        match Self::apply(records, &query)? {
            View::Groups(table) => Ok(table),
            View::Records(_) => Err(DashboardError::invalid_parameter(
                "group",
                "grouped query produced ungrouped output",
            )),
        }
    }

    /// First record whose `column` label equals `key`
    pub fn find_by<'a, R: Record>(records: &'a [R], column: &str, key: &str) -> Result<&'a R> {
        R::require_column(column)?;
        records
            .iter()
            .find(|r| r.value(column).label().as_deref() == Some(key))
            .ok_or_else(|| DashboardError::not_found(R::ENTITY, key))
    }
}
