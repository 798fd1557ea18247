//! Integration tests for the dashboard data core
//!
//! These exercise the generators, the query pipeline and CSV export through the
//! public API only.

use std::collections::HashSet;
use std::fs::File;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use dashboard_data::export::{export_to_dir, read_csv};
use dashboard_data::generators::{
    SalesDatasetGenerator, TicketDatasetGenerator, UserDatasetGenerator,
};
use dashboard_data::query::{GroupBy, GroupKey, Measure, SortSpec};
use dashboard_data::types::{
    Priority, Product, Region, TicketCategory, TicketStatus,
};
use dashboard_data::{
    Clock, Config, Dashboard, DatasetKind, Filter, PageRequest, Query, QueryPipeline,
    SalesRecord, Session, TicketRecord, UserRecord, ViewRequest, ViewResponse,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
}

fn ticket(id: &str, status: TicketStatus) -> TicketRecord {
    let created = now() - Duration::days(2);
    TicketRecord {
        ticket_id: id.to_string(),
        created_date: created,
        resolved_date: status.is_resolved().then(|| created + Duration::days(1)),
        status,
        title: format!("Issue {}", id),
        category: TicketCategory::Billing,
        priority: Priority::Medium,
        assigned_to: "Agent 1".to_string(),
        user_id: "USER1000".to_string(),
    }
}

fn sale(product: Product, region: Region, quantity: u32, price: u32) -> SalesRecord {
    SalesRecord {
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        product,
        region,
        quantity,
        price,
        revenue: u64::from(quantity) * u64::from(price),
    }
}

#[test]
fn test_revenue_by_product() {
    let sales = vec![
        sale(Product::A, Region::North, 10, 50),
        sale(Product::A, Region::South, 4, 50),
        sale(Product::B, Region::North, 2, 75),
    ];

    let table = QueryPipeline::summarize(
        &sales,
        &Filter::new(),
        GroupBy::new(GroupKey::column("product")).measure(Measure::sum("revenue")),
        None,
    )
    .unwrap();

    assert_eq!(table.page.total_count, 2);
    assert_eq!(table.lookup("Product A", "sum_revenue"), Some(700.0));
    assert_eq!(table.lookup("Product B", "sum_revenue"), Some(150.0));
}

#[test]
fn test_status_filter_selects_open_ticket() {
    let tickets = vec![
        ticket("TCK-1000", TicketStatus::Resolved),
        ticket("TCK-1001", TicketStatus::Open),
    ];

    let query = Query::new().filter(
        Filter::new().with_membership("status", [TicketStatus::Open, TicketStatus::InProgress]),
    );
    let page = QueryPipeline::apply(&tickets, &query)
        .unwrap()
        .into_records()
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].ticket_id, "TCK-1001");
}

#[test]
fn test_csv_export_round_trip() {
    let mut rng = StdRng::seed_from_u64(11);
    let tickets = TicketDatasetGenerator::new()
        .generate(40, now(), &mut rng)
        .unwrap();

    let users = UserDatasetGenerator::new()
        .generate(40, now(), &mut rng)
        .unwrap();
    let sales = SalesDatasetGenerator::new()
        .generate(6, now(), &mut rng)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();

    let path = export_to_dir(&tickets, DatasetKind::Tickets, dir.path()).unwrap();
    let parsed: Vec<TicketRecord> = read_csv(File::open(&path).unwrap()).unwrap();
    assert_eq!(parsed, tickets);

    let path = export_to_dir(&users, DatasetKind::Users, dir.path()).unwrap();
    let parsed: Vec<UserRecord> = read_csv(File::open(&path).unwrap()).unwrap();
    assert_eq!(parsed, users);

    let path = export_to_dir(&sales, DatasetKind::Sales, dir.path()).unwrap();
    let parsed: Vec<SalesRecord> = read_csv(File::open(&path).unwrap()).unwrap();
    assert_eq!(parsed, sales);
}

#[test]
fn test_pipeline_sorts_priority_by_urgency() {
    let tickets: Vec<TicketRecord> = [Priority::Critical, Priority::Low, Priority::High, Priority::Medium]
        .into_iter()
        .enumerate()
        .map(|(i, priority)| TicketRecord {
            priority,
            ..ticket(&format!("TCK-{}", 1000 + i), TicketStatus::Open)
        })
        .collect();

    let page = QueryPipeline::apply(&tickets, &Query::new().sort(SortSpec::ascending("priority")))
        .unwrap()
        .into_records()
        .unwrap();
    let labels: Vec<&str> = page.items.iter().map(|t| t.priority.as_str()).collect();
    assert_eq!(labels, ["Low", "Medium", "High", "Critical"]);

    let table = QueryPipeline::summarize(
        &tickets,
        &Filter::new(),
        GroupBy::new(GroupKey::column("priority")).measure(Measure::count()),
        Some(SortSpec::descending("priority")),
    )
    .unwrap();
    let labels: Vec<String> = table.page.items.iter().map(|r| r.label()).collect();
    assert_eq!(labels, ["Critical", "High", "Medium", "Low"]);
}

#[test]
fn test_sessions_with_same_seed_render_same_views() {
    let mut config = Config::default();
    config.generation.seed = Some(2024);
    config.generation.user_count = 120;
    config.generation.ticket_count = 60;
    let dashboard = Dashboard::new(config);

    let render = || {
        let mut session = dashboard.session().with_clock(Clock::Fixed(now()));
        dashboard
            .render(
                &mut session,
                ViewRequest::TicketQueue {
                    search: String::new(),
                    statuses: vec![],
                    priorities: vec![Priority::High, Priority::Critical],
                    page: Some(1),
                },
            )
            .unwrap()
    };

    let first = render();
    assert_eq!(first, render());
    match first {
        ViewResponse::TicketQueue(page) => {
            assert!(page
                .items
                .iter()
                .all(|t| matches!(t.priority, Priority::High | Priority::Critical)));
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[test]
fn test_session_overview_uses_cached_datasets() {
    let dashboard = Dashboard::new(Config::default());
    let mut session: Session = Session::new(Some(5)).with_clock(Clock::Fixed(now()));

    let first = dashboard
        .render(&mut session, ViewRequest::Overview { range: None })
        .unwrap();
    let second = dashboard
        .render(&mut session, ViewRequest::Overview { range: None })
        .unwrap();
    assert_eq!(first, second);

    session.regenerate_all();
    assert_eq!(session.cached(DatasetKind::Sales), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_sales_cover_every_day_product_and_region(window in 0i64..60, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let sales = SalesDatasetGenerator::new().generate(window, now(), &mut rng).unwrap();

        let expected = (window as usize + 1) * Product::ALL.len() * Region::ALL.len();
        prop_assert_eq!(sales.len(), expected);

        let triples: HashSet<_> = sales.iter().map(|s| (s.date, s.product, s.region)).collect();
        prop_assert_eq!(triples.len(), expected);

        for s in &sales {
            prop_assert_eq!(s.price, s.product.price());
            prop_assert_eq!(s.revenue, u64::from(s.quantity) * u64::from(s.price));
            prop_assert!(s.date <= now().date_naive());
        }
    }

    #[test]
    fn prop_ticket_resolution_follows_status(count in 1usize..200, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let tickets = TicketDatasetGenerator::new().generate(count, now(), &mut rng).unwrap();

        prop_assert_eq!(tickets.len(), count);
        for t in &tickets {
            prop_assert_eq!(t.resolved_date.is_some(), t.status.is_resolved());
            if let Some(resolved) = t.resolved_date {
                let days = (resolved - t.created_date).num_days();
                prop_assert!((1..=5).contains(&days));
            }
            prop_assert!(t.created_date <= now());
            prop_assert!(t.created_date >= now() - Duration::days(30));
        }
    }

    #[test]
    fn prop_user_logins_are_consistent(count in 1usize..200, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let users = UserDatasetGenerator::new().generate(count, now(), &mut rng).unwrap();

        let ids: HashSet<_> = users.iter().map(|u| u.user_id.as_str()).collect();
        prop_assert_eq!(ids.len(), count);
        for u in &users {
            prop_assert!(u.join_date <= u.last_login);
            prop_assert!(u.last_login <= now());
            prop_assert!(u.activity_level.login_range().contains(&u.login_count));
        }
    }

    #[test]
    fn prop_pages_concatenate_to_full_result(size in 1usize..25, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let tickets = TicketDatasetGenerator::new().generate(73, now(), &mut rng).unwrap();
        let base = Query::new()
            .filter(Filter::new().with_membership("status", [TicketStatus::Open, TicketStatus::InProgress]))
            .sort(SortSpec::descending("created_date"));

        let full = QueryPipeline::apply(&tickets, &base).unwrap().into_records().unwrap();

        let mut stitched = Vec::new();
        let mut number = 1;
        loop {
            let request = PageRequest::new(number, size).unwrap();
            let page = QueryPipeline::apply(&tickets, &base.clone().page(request))
                .unwrap()
                .into_records()
                .unwrap();
            prop_assert_eq!(page.total_count, full.total_count);
            let has_next = page.has_next();
            stitched.extend(page.items);
            if !has_next {
                break;
            }
            number += 1;
        }

        prop_assert_eq!(stitched, full.items);
    }

    #[test]
    fn prop_empty_membership_is_no_filter(count in 1usize..120, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let tickets = TicketDatasetGenerator::new().generate(count, now(), &mut rng).unwrap();

        let unfiltered = QueryPipeline::select(&tickets, &Filter::new()).unwrap();
        let empty = QueryPipeline::select(
            &tickets,
            &Filter::new().with_membership("priority", Vec::<Priority>::new()),
        )
        .unwrap();

        prop_assert_eq!(unfiltered, empty);
    }
}
