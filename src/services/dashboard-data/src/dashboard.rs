//! Dashboard view dispatch
//!
//! Every dashboard page is one [`ViewRequest`] variant with one handler. The
//! handlers only compose pipeline calls over the session's datasets; none of
//! them mutate a dataset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{self, ChartKind, ChartProjection, ColumnSummary};
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::generators::SeriesParams;
use crate::query::{
    Filter, GroupBy, GroupKey, GroupTable, Measure, Page, PageRequest, Query, QueryPipeline,
    SortSpec, TimeBucket, TimeRange,
};
use crate::record::Record;
use crate::session::{PagedView, Session};
use crate::types::{
    ActivityLevel, Priority, Product, Region, SeriesColumn, SeriesPoint, Subscription,
    TicketRecord, TicketStatus, UserRecord,
};

/// Users who logged in within this many days count as active
pub const ACTIVE_USER_DAYS: i64 = 30;

/// Rows shown in the data explorer preview
pub const SERIES_PREVIEW_ROWS: usize = 10;

/// Sidebar date range; every preset is a lower bound relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateRangePreset {
    #[default]
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    /// One year back, not unbounded
    #[serde(rename = "all_time")]
    AllTime,
}

impl DateRangePreset {
    pub const ALL: &'static [DateRangePreset] = &[
        Self::Last7Days,
        Self::Last30Days,
        Self::Last90Days,
        Self::AllTime,
    ];

    pub fn days(&self) -> i64 {
        match self {
            Self::Last7Days => 7,
            Self::Last30Days => 30,
            Self::Last90Days => 90,
            Self::AllTime => 365,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::Last90Days => "Last 90 days",
            Self::AllTime => "All time",
        }
    }

    pub fn time_range(&self, now: DateTime<Utc>) -> TimeRange {
        TimeRange::since(now - Duration::days(self.days()))
    }
}

impl fmt::Display for DateRangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DateRangePreset {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        let found = match wanted.as_str() {
            "7d" | "7" => Some(Self::Last7Days),
            "30d" | "30" => Some(Self::Last30Days),
            "90d" | "90" => Some(Self::Last90Days),
            "all" => Some(Self::AllTime),
            _ => Self::ALL.iter().copied().find(|p| {
                p.label().eq_ignore_ascii_case(&wanted)
                    || p.label().replace(' ', "_").eq_ignore_ascii_case(&wanted)
            }),
        };
        found.ok_or_else(|| {
            DashboardError::invalid_parameter("range", format!("unknown date range '{}'", s))
        })
    }
}

/// One request per dashboard page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewRequest {
    Overview {
        #[serde(default)]
        range: Option<DateRangePreset>,
    },
    SalesAnalytics {
        #[serde(default)]
        range: Option<DateRangePreset>,
        #[serde(default)]
        products: Vec<Product>,
        #[serde(default)]
        regions: Vec<Region>,
        #[serde(default)]
        bucket: TimeBucket,
    },
    UserInsights,
    UserDirectory {
        #[serde(default)]
        search: String,
        #[serde(default)]
        subscriptions: Vec<Subscription>,
        #[serde(default)]
        activity_levels: Vec<ActivityLevel>,
        #[serde(default)]
        page: Option<usize>,
    },
    TicketInsights,
    TicketQueue {
        #[serde(default)]
        search: String,
        #[serde(default)]
        statuses: Vec<TicketStatus>,
        #[serde(default)]
        priorities: Vec<Priority>,
        #[serde(default)]
        page: Option<usize>,
    },
    TicketDetail {
        ticket_id: String,
    },
    SeriesExplorer {
        #[serde(default)]
        params: Option<SeriesParams>,
        #[serde(default)]
        chart: ChartKind,
        #[serde(default)]
        columns: Vec<SeriesColumn>,
    },
}

impl ViewRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Overview { .. } => "overview",
            Self::SalesAnalytics { .. } => "sales_analytics",
            Self::UserInsights => "user_insights",
            Self::UserDirectory { .. } => "user_directory",
            Self::TicketInsights => "ticket_insights",
            Self::TicketQueue { .. } => "ticket_queue",
            Self::TicketDetail { .. } => "ticket_detail",
            Self::SeriesExplorer { .. } => "series_explorer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub range: DateRangePreset,
    pub total_revenue: u64,
    pub new_users: usize,
    pub active_users: usize,
    pub open_tickets: usize,
    pub daily_revenue: GroupTable,
    pub users_by_country: GroupTable,
    pub revenue_by_product: GroupTable,
    pub tickets_by_status: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesAnalyticsView {
    pub range: DateRangePreset,
    pub bucket: TimeBucket,
    pub total_revenue: u64,
    /// Mean revenue per sales record; `None` when nothing matched
    pub average_order_value: Option<f64>,
    pub revenue_over_time: GroupTable,
    pub revenue_by_product: GroupTable,
    pub revenue_by_region: GroupTable,
    /// Quantity and revenue per product and region, highest revenue first
    pub detail: GroupTable,
}

/// New and cumulative users for one join month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    pub month: String,
    pub new_users: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInsightsView {
    pub total_users: usize,
    pub active_users: usize,
    pub active_percent: usize,
    pub premium_users: usize,
    pub premium_percent: usize,
    pub monthly_growth: Vec<GrowthPoint>,
    pub subscriptions: GroupTable,
    pub activity_levels: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketInsightsView {
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    /// Counts in priority order
    pub by_priority: GroupTable,
    pub by_category: GroupTable,
    /// Mean resolution hours of resolved tickets, in priority order
    pub resolution_by_priority: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesExplorerView {
    pub params: SeriesParams,
    pub rows: usize,
    pub preview: Vec<SeriesPoint>,
    pub summaries: Vec<ColumnSummary>,
    pub chart: ChartProjection,
}

/// Rendered dashboard page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewResponse {
    Overview(OverviewView),
    SalesAnalytics(SalesAnalyticsView),
    UserInsights(UserInsightsView),
    UserDirectory(Page<UserRecord>),
    TicketInsights(TicketInsightsView),
    TicketQueue(Page<TicketRecord>),
    /// `None` when no ticket has the requested id
    TicketDetail { ticket: Option<TicketRecord> },
    SeriesExplorer(SeriesExplorerView),
}

/// Renders view requests against a session using configured defaults
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    config: Config,
}

impl Dashboard {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a session with this dashboard's seed and default range
    pub fn session(&self) -> Session {
        Session::new(self.config.generation.seed).with_selected_range(self.config.view.default_range)
    }

    pub fn render(&self, session: &mut Session, request: ViewRequest) -> Result<ViewResponse> {
        debug!(session_id = %session.id(), view = request.name(), "Rendering view");

        match request {
            ViewRequest::Overview { range } => self.overview(session, range),
            ViewRequest::SalesAnalytics {
                range,
                products,
                regions,
                bucket,
            } => self.sales_analytics(session, range, &products, &regions, bucket),
            ViewRequest::UserInsights => self.user_insights(session),
            ViewRequest::UserDirectory {
                search,
                subscriptions,
                activity_levels,
                page,
            } => self.user_directory(session, &search, &subscriptions, &activity_levels, page),
            ViewRequest::TicketInsights => self.ticket_insights(session),
            ViewRequest::TicketQueue {
                search,
                statuses,
                priorities,
                page,
            } => self.ticket_queue(session, &search, &statuses, &priorities, page),
            ViewRequest::TicketDetail { ticket_id } => self.ticket_detail(session, &ticket_id),
            ViewRequest::SeriesExplorer {
                params,
                chart,
                columns,
            } => self.series_explorer(session, params, chart, columns),
        }
    }

    fn overview(
        &self,
        session: &mut Session,
        range: Option<DateRangePreset>,
    ) -> Result<ViewResponse> {
        let preset = resolve_range(session, range);
        let now = session.now();
        let window = preset.time_range(now);

        let sales = session.sales(self.config.generation.sales_window_days)?;
        let users = session.users(self.config.generation.user_count)?;
        let tickets = session.tickets(self.config.generation.ticket_count)?;

        let sales_in_range = Filter::new().with_range("date", window);
        let tickets_in_range = Filter::new().with_range("created_date", window);

        let total_revenue: u64 = QueryPipeline::select(&sales, &sales_in_range)?
            .iter()
            .map(|s| s.revenue)
            .sum();
        let new_users =
            QueryPipeline::select(&users, &Filter::new().with_range("join_date", window))?.len();
        let active_users = QueryPipeline::select(&users, &active_filter(now))?.len();
        let open_tickets = QueryPipeline::select(
            &tickets,
            &tickets_in_range
                .clone()
                .with_membership("status", [TicketStatus::Open, TicketStatus::InProgress]),
        )?
        .len();

        Ok(ViewResponse::Overview(OverviewView {
            range: preset,
            total_revenue,
            new_users,
            active_users,
            open_tickets,
            daily_revenue: QueryPipeline::summarize(
                &sales,
                &sales_in_range,
                GroupBy::new(GroupKey::column("date")).measure(revenue()),
                None,
            )?,
            users_by_country: count_by(&users, &Filter::new(), "country")?,
            revenue_by_product: QueryPipeline::summarize(
                &sales,
                &sales_in_range,
                GroupBy::new(GroupKey::column("product")).measure(revenue()),
                None,
            )?,
            tickets_by_status: count_by(&tickets, &tickets_in_range, "status")?,
        }))
    }

    fn sales_analytics(
        &self,
        session: &mut Session,
        range: Option<DateRangePreset>,
        products: &[Product],
        regions: &[Region],
        bucket: TimeBucket,
    ) -> Result<ViewResponse> {
        let preset = resolve_range(session, range);
        let window = preset.time_range(session.now());
        let sales = session.sales(self.config.generation.sales_window_days)?;

        let filter = Filter::new()
            .with_range("date", window)
            .with_membership("product", products)
            .with_membership("region", regions);

        let selected = QueryPipeline::select(&sales, &filter)?;
        let total_revenue: u64 = selected.iter().map(|s| s.revenue).sum();
        let average_order_value = (!selected.is_empty())
            .then(|| total_revenue as f64 / selected.len() as f64);

        Ok(ViewResponse::SalesAnalytics(SalesAnalyticsView {
            range: preset,
            bucket,
            total_revenue,
            average_order_value,
            revenue_over_time: QueryPipeline::summarize(
                &sales,
                &filter,
                GroupBy::new(GroupKey::bucketed("date", bucket))
                    .then_by(GroupKey::column("product"))
                    .measure(revenue()),
                None,
            )?,
            revenue_by_product: QueryPipeline::summarize(
                &sales,
                &filter,
                GroupBy::new(GroupKey::column("product")).measure(revenue()),
                None,
            )?,
            revenue_by_region: QueryPipeline::summarize(
                &sales,
                &filter,
                GroupBy::new(GroupKey::column("region")).measure(revenue()),
                None,
            )?,
            detail: QueryPipeline::summarize(
                &sales,
                &filter,
                GroupBy::new(GroupKey::column("product"))
                    .then_by(GroupKey::column("region"))
                    .measure(Measure::sum("quantity").named("quantity"))
                    .measure(revenue()),
                Some(SortSpec::descending("revenue")),
            )?,
        }))
    }

    fn user_insights(&self, session: &mut Session) -> Result<ViewResponse> {
        let now = session.now();
        let users = session.users(self.config.generation.user_count)?;

        let total_users = users.len();
        let active_users = QueryPipeline::select(&users, &active_filter(now))?.len();
        let premium_users = QueryPipeline::select(
            &users,
            &Filter::new().with_membership(
                "subscription",
                Subscription::ALL.iter().filter(|s| s.is_premium()),
            ),
        )?
        .len();

        let monthly = QueryPipeline::summarize(
            &users,
            &Filter::new(),
            GroupBy::new(GroupKey::bucketed("join_date", TimeBucket::Month))
                .measure(Measure::count()),
            Some(SortSpec::ascending("join_date")),
        )?;
        let mut cumulative = 0;
        let monthly_growth = monthly
            .page
            .items
            .iter()
            .map(|row| {
                let new_users = row.value(0).unwrap_or(0.0) as usize;
                cumulative += new_users;
                GrowthPoint {
                    month: row.label(),
                    new_users,
                    cumulative,
                }
            })
            .collect();

        Ok(ViewResponse::UserInsights(UserInsightsView {
            total_users,
            active_users,
            active_percent: percent(active_users, total_users),
            premium_users,
            premium_percent: percent(premium_users, total_users),
            monthly_growth,
            subscriptions: count_by(&users, &Filter::new(), "subscription")?,
            activity_levels: count_by(&users, &Filter::new(), "activity_level")?,
        }))
    }

    fn user_directory(
        &self,
        session: &mut Session,
        search: &str,
        subscriptions: &[Subscription],
        activity_levels: &[ActivityLevel],
        page: Option<usize>,
    ) -> Result<ViewResponse> {
        let request = resolve_page(
            session,
            PagedView::UserDirectory,
            page,
            self.config.view.page_size,
        )?;
        let users = session.users(self.config.generation.user_count)?;

        let query = Query::new()
            .filter(
                Filter::new()
                    .with_search(["name", "email", "user_id"], search)
                    .with_membership("subscription", subscriptions)
                    .with_membership("activity_level", activity_levels),
            )
            .page(request);

        let page = records_page(QueryPipeline::apply(&users, &query)?)?;
        Ok(ViewResponse::UserDirectory(page))
    }

    fn ticket_insights(&self, session: &mut Session) -> Result<ViewResponse> {
        let tickets = session.tickets(self.config.generation.ticket_count)?;
        let status_count = |status: TicketStatus| tickets.iter().filter(|t| t.status == status).count();

        let by_priority = QueryPipeline::summarize(
            &tickets,
            &Filter::new(),
            GroupBy::new(GroupKey::column("priority")).measure(Measure::count()),
            Some(SortSpec::ascending("priority")),
        )?;

        let resolution_by_priority = QueryPipeline::summarize(
            &tickets,
            &Filter::new().with_range("resolved_date", TimeRange::unbounded()),
            GroupBy::new(GroupKey::column("priority"))
                .measure(Measure::mean("resolution_hours").named("mean_resolution_hours")),
            Some(SortSpec::ascending("priority")),
        )?;

        Ok(ViewResponse::TicketInsights(TicketInsightsView {
            open: status_count(TicketStatus::Open),
            in_progress: status_count(TicketStatus::InProgress),
            resolved: status_count(TicketStatus::Resolved),
            by_priority,
            by_category: count_by(&tickets, &Filter::new(), "category")?,
            resolution_by_priority,
        }))
    }

    fn ticket_queue(
        &self,
        session: &mut Session,
        search: &str,
        statuses: &[TicketStatus],
        priorities: &[Priority],
        page: Option<usize>,
    ) -> Result<ViewResponse> {
        let request = resolve_page(session, PagedView::TicketQueue, page, self.config.view.page_size)?;
        let tickets = session.tickets(self.config.generation.ticket_count)?;

        let query = Query::new()
            .filter(
                Filter::new()
                    .with_search(["ticket_id", "title", "user_id"], search)
                    .with_membership("status", statuses)
                    .with_membership("priority", priorities),
            )
            .page(request);

        let page = records_page(QueryPipeline::apply(&tickets, &query)?)?;
        Ok(ViewResponse::TicketQueue(page))
    }

    fn ticket_detail(&self, session: &mut Session, ticket_id: &str) -> Result<ViewResponse> {
        let tickets = session.tickets(self.config.generation.ticket_count)?;
        let ticket = match QueryPipeline::find_by(&tickets, "ticket_id", ticket_id.trim()) {
            Ok(ticket) => Some(ticket.clone()),
            Err(DashboardError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(ViewResponse::TicketDetail { ticket })
    }

    fn series_explorer(
        &self,
        session: &mut Session,
        params: Option<SeriesParams>,
        chart: ChartKind,
        columns: Vec<SeriesColumn>,
    ) -> Result<ViewResponse> {
        let params = params.unwrap_or_else(|| self.config.series.params());
        let points = session.series(params)?;

        let columns = if columns.is_empty() {
            vec![SeriesColumn::Sin]
        } else {
            columns
        };

        Ok(ViewResponse::SeriesExplorer(SeriesExplorerView {
            params,
            rows: points.len(),
            preview: points.iter().take(SERIES_PREVIEW_ROWS).copied().collect(),
            summaries: SeriesColumn::ALL
                .iter()
                .map(|&c| analytics::describe(&points, c))
                .collect(),
            chart: analytics::project(&points, chart, &columns)?,
        }))
    }
}

/// Use the requested preset and remember it, or fall back to the remembered one
fn resolve_range(session: &mut Session, range: Option<DateRangePreset>) -> DateRangePreset {
    if let Some(range) = range {
        session.select_range(range);
    }
    session.selected_range()
}

/// Validate the requested page and remember it, or reuse the remembered one
fn resolve_page(
    session: &mut Session,
    view: PagedView,
    page: Option<usize>,
    size: usize,
) -> Result<PageRequest> {
    let request = PageRequest::new(page.unwrap_or_else(|| session.page(view)), size)?;
    session.select_page(view, request.number);
    Ok(request)
}

fn active_filter(now: DateTime<Utc>) -> Filter {
    Filter::new().with_range(
        "last_login",
        TimeRange::since(now - Duration::days(ACTIVE_USER_DAYS)),
    )
}

fn revenue() -> Measure {
    Measure::sum("revenue").named("revenue")
}

/// Row counts per value of `column`, most frequent first
fn count_by<R: Record + Clone>(records: &[R], filter: &Filter, column: &str) -> Result<GroupTable> {
    QueryPipeline::summarize(
        records,
        filter,
        GroupBy::new(GroupKey::column(column)).measure(Measure::count()),
        Some(SortSpec::descending("count")),
    )
}

fn records_page<R>(view: crate::query::View<R>) -> Result<Page<R>> {
    view.into_records().ok_or_else(|| {
        DashboardError::invalid_parameter("query", "record query produced grouped output")
    })
}

/// Integer share, truncated
fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}
