//! Per-user session context
//!
//! A [`Session`] owns the random source, the clock anchor and every dataset
//! generated for it. Datasets are memoized per parameter set and handed out as
//! shared read-only snapshots until explicitly regenerated.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::dashboard::DateRangePreset;
use crate::error::{DashboardError, Result};
use crate::generators::{
    SalesDatasetGenerator, SeriesDatasetGenerator, SeriesParams, TicketDatasetGenerator,
    UserDatasetGenerator,
};
use crate::types::{SalesRecord, SeriesPoint, TicketRecord, UserRecord};

/// Source of "now" for generation and relative date ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(ts) => *ts,
        }
    }
}

/// The datasets a session can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Sales,
    Users,
    Tickets,
    Series,
}

impl DatasetKind {
    pub const ALL: &'static [DatasetKind] =
        &[Self::Sales, Self::Users, Self::Tickets, Self::Series];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Users => "users",
            Self::Tickets => "tickets",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DashboardError::invalid_parameter("dataset", format!("unknown dataset '{}'", s))
            })
    }
}

/// Paginated views whose current page a session remembers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagedView {
    UserDirectory,
    TicketQueue,
}

/// Cache key for a series; noise is keyed by its bit pattern
type SeriesKey = (usize, u64);

/// One user's interaction context
pub struct Session {
    id: Uuid,
    rng: StdRng,
    clock: Clock,
    selected_range: DateRangePreset,
    pages: HashMap<PagedView, usize>,
    sales: HashMap<i64, Arc<[SalesRecord]>>,
    users: HashMap<usize, Arc<[UserRecord]>>,
    tickets: HashMap<usize, Arc<[TicketRecord]>>,
    series: HashMap<SeriesKey, Arc<[SeriesPoint]>>,
}

impl Session {
    /// New session seeded from `seed`, or from OS entropy when `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session = Self {
            id: Uuid::new_v4(),
            rng,
            clock: Clock::System,
            selected_range: DateRangePreset::default(),
            pages: HashMap::new(),
            sales: HashMap::new(),
            users: HashMap::new(),
            tickets: HashMap::new(),
            series: HashMap::new(),
        };
        info!(session_id = %session.id, seeded = seed.is_some(), "Session started");
        session
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_selected_range(mut self, range: DateRangePreset) -> Self {
        self.selected_range = range;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn selected_range(&self) -> DateRangePreset {
        self.selected_range
    }

    pub fn select_range(&mut self, range: DateRangePreset) {
        self.selected_range = range;
    }

    /// Current page of a paginated view, 1 until one is selected
    pub fn page(&self, view: PagedView) -> usize {
        self.pages.get(&view).copied().unwrap_or(1)
    }

    pub fn select_page(&mut self, view: PagedView, page: usize) {
        self.pages.insert(view, page);
    }

    /// Sales for the last `window_days` days, generated on first use
    pub fn sales(&mut self, window_days: i64) -> Result<Arc<[SalesRecord]>> {
        if let Some(cached) = self.sales.get(&window_days) {
            return Ok(Arc::clone(cached));
        }
        let now = self.now();
        let data: Arc<[SalesRecord]> = SalesDatasetGenerator::new()
            .generate(window_days, now, &mut self.rng)?
            .into();
        info!(session_id = %self.id, window_days, rows = data.len(), "Generated sales");
        self.sales.insert(window_days, Arc::clone(&data));
        Ok(data)
    }

    pub fn users(&mut self, count: usize) -> Result<Arc<[UserRecord]>> {
        if let Some(cached) = self.users.get(&count) {
            return Ok(Arc::clone(cached));
        }
        let now = self.now();
        let data: Arc<[UserRecord]> = UserDatasetGenerator::new()
            .generate(count, now, &mut self.rng)?
            .into();
        info!(session_id = %self.id, count, "Generated users");
        self.users.insert(count, Arc::clone(&data));
        Ok(data)
    }

    pub fn tickets(&mut self, count: usize) -> Result<Arc<[TicketRecord]>> {
        if let Some(cached) = self.tickets.get(&count) {
            return Ok(Arc::clone(cached));
        }
        let now = self.now();
        let data: Arc<[TicketRecord]> = TicketDatasetGenerator::new()
            .generate(count, now, &mut self.rng)?
            .into();
        info!(session_id = %self.id, count, "Generated tickets");
        self.tickets.insert(count, Arc::clone(&data));
        Ok(data)
    }

    pub fn series(&mut self, params: SeriesParams) -> Result<Arc<[SeriesPoint]>> {
        let key = (params.size, params.noise.to_bits());
        if let Some(cached) = self.series.get(&key) {
            return Ok(Arc::clone(cached));
        }
        let data: Arc<[SeriesPoint]> = SeriesDatasetGenerator::new()
            .generate(params, &mut self.rng)?
            .into();
        info!(session_id = %self.id, size = params.size, noise = params.noise, "Generated series");
        self.series.insert(key, Arc::clone(&data));
        Ok(data)
    }

    /// Drop every cached dataset of `kind`; the next request regenerates it
    pub fn regenerate(&mut self, kind: DatasetKind) {
        let dropped = match kind {
            DatasetKind::Sales => std::mem::take(&mut self.sales).len(),
            DatasetKind::Users => std::mem::take(&mut self.users).len(),
            DatasetKind::Tickets => std::mem::take(&mut self.tickets).len(),
            DatasetKind::Series => std::mem::take(&mut self.series).len(),
        };
        info!(session_id = %self.id, dataset = %kind, dropped, "Regenerating dataset");
    }

    pub fn regenerate_all(&mut self) {
        for &kind in DatasetKind::ALL {
            self.regenerate(kind);
        }
    }

    /// Number of memoized datasets of `kind`
    pub fn cached(&self, kind: DatasetKind) -> usize {
        match kind {
            DatasetKind::Sales => self.sales.len(),
            DatasetKind::Users => self.users.len(),
            DatasetKind::Tickets => self.tickets.len(),
            DatasetKind::Series => self.series.len(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("clock", &self.clock)
            .field("selected_range", &self.selected_range)
            .field("sales", &self.sales.len())
            .field("users", &self.users.len())
            .field("tickets", &self.tickets.len())
            .field("series", &self.series.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> Clock {
        Clock::Fixed(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_datasets_are_memoized() {
        let mut session = Session::new(Some(1)).with_clock(fixed());
        let a = session.users(50).unwrap();
        let b = session.users(50).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = session.users(60).unwrap();
        assert_eq!(c.len(), 60);
        assert_eq!(session.cached(DatasetKind::Users), 2);
    }

    #[test]
    fn test_regenerate_replaces_snapshot() {
        let mut session = Session::new(Some(1)).with_clock(fixed());
        let before = session.tickets(20).unwrap();
        let sales = session.sales(3).unwrap();

        session.regenerate(DatasetKind::Tickets);
        assert_eq!(session.cached(DatasetKind::Tickets), 0);

        let after = session.tickets(20).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        // held snapshot is untouched
        assert_eq!(before.len(), 20);
        assert!(Arc::ptr_eq(&sales, &session.sales(3).unwrap()));
    }

    #[test]
    fn test_same_seed_same_clock_same_data() {
        let mut a = Session::new(Some(42)).with_clock(fixed());
        let mut b = Session::new(Some(42)).with_clock(fixed());
        assert_eq!(*a.sales(10).unwrap(), *b.sales(10).unwrap());
        assert_eq!(*a.users(30).unwrap(), *b.users(30).unwrap());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_rejected_parameters_are_not_cached() {
        let mut session = Session::new(Some(1)).with_clock(fixed());
        assert!(session.users(0).is_err());
        assert_eq!(session.cached(DatasetKind::Users), 0);
    }

    #[test]
    fn test_page_state() {
        let mut session = Session::new(Some(1));
        assert_eq!(session.page(PagedView::TicketQueue), 1);
        session.select_page(PagedView::TicketQueue, 3);
        assert_eq!(session.page(PagedView::TicketQueue), 3);
        assert_eq!(session.page(PagedView::UserDirectory), 1);
    }

    #[test]
    fn test_dataset_kind_parsing() {
        assert_eq!("Tickets".parse::<DatasetKind>().unwrap(), DatasetKind::Tickets);
        assert!("orders".parse::<DatasetKind>().is_err());
    }
}
