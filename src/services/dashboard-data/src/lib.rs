//! # Dashboard Data
//!
//! Synthetic datasets and the query pipeline behind the admin dashboard and
//! the data explorer:
//! - Seeded generators for sales, users, support tickets and noisy signal series
//! - A declarative filter, group, sort and paginate pipeline over any [`Record`]
//! - Summary statistics, histograms and chart projections for series
//! - Per-session dataset memoization with explicit regeneration
//! - CSV export of any dataset
//!
//! ## Usage
//!
//! ```rust
//! use dashboard_data::{Config, Dashboard, ViewRequest, ViewResponse};
//!
//! let dashboard = Dashboard::new(Config::default());
//! let mut session = dashboard.session();
//!
//! let response = dashboard
//!     .render(&mut session, ViewRequest::Overview { range: None })
//!     .unwrap();
//! assert!(matches!(response, ViewResponse::Overview(_)));
//! ```

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod generators;
pub mod query;
pub mod record;
pub mod session;
pub mod types;

pub use analytics::{ChartKind, ChartProjection, ColumnSummary, Histogram};
pub use config::Config;
pub use dashboard::{Dashboard, DateRangePreset, ViewRequest, ViewResponse};
pub use error::{DashboardError, Result};
pub use query::{Filter, Page, PageRequest, Query, QueryPipeline, View};
pub use record::{FieldKind, FieldValue, Record};
pub use session::{Clock, DatasetKind, Session};
pub use types::{SalesRecord, SeriesPoint, TicketRecord, UserRecord};
