//! Plain text rendering of dashboard responses

use std::fmt::Write;

use dashboard_data::analytics::{ChartProjection, ColumnSummary};
use dashboard_data::dashboard::{
    OverviewView, SalesAnalyticsView, SeriesExplorerView, TicketInsightsView, UserInsightsView,
};
use dashboard_data::query::GroupTable;
use dashboard_data::{Page, Record, SeriesPoint, TicketRecord, ViewResponse};

/// Rows of a grouped table shown before truncating
const MAX_GROUP_ROWS: usize = 15;

pub fn render_table(response: &ViewResponse) -> String {
    let mut out = String::new();
    match response {
        ViewResponse::Overview(view) => overview(&mut out, view),
        ViewResponse::SalesAnalytics(view) => sales_analytics(&mut out, view),
        ViewResponse::UserInsights(view) => user_insights(&mut out, view),
        ViewResponse::UserDirectory(page) => records(&mut out, "User Directory", page),
        ViewResponse::TicketInsights(view) => ticket_insights(&mut out, view),
        ViewResponse::TicketQueue(page) => records(&mut out, "Ticket Queue", page),
        ViewResponse::TicketDetail { ticket: Some(ticket) } => {
            heading(&mut out, &format!("Ticket {}", ticket.ticket_id));
            let width = column_width::<TicketRecord>();
            for column in TicketRecord::COLUMNS
                .iter()
                .chain(TicketRecord::DERIVED)
            {
                let _ = writeln!(
                    out,
                    "  {:<width$}  {}",
                    column.name,
                    ticket.value(column.name),
                    width = width
                );
            }
        }
        ViewResponse::TicketDetail { ticket: None } => {
            out.push_str("Ticket not found\n");
        }
        ViewResponse::SeriesExplorer(view) => series_explorer(&mut out, view),
    }
    out
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
}

fn kpis(out: &mut String, items: &[(&str, String)]) {
    let width = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (label, value) in items {
        let _ = writeln!(out, "  {:<width$}  {}", label, value, width = width);
    }
    out.push('\n');
}

fn column_width<R: Record>() -> usize {
    R::COLUMNS
        .iter()
        .chain(R::DERIVED)
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn grid(out: &mut String, header: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let _ = writeln!(out, "  {}", line(header).trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", line(&rule));
    for row in rows {
        let _ = writeln!(out, "  {}", line(row).trim_end());
    }
}

fn group_table(out: &mut String, title: &str, table: &GroupTable) {
    let _ = writeln!(out, "{}", title);
    let header: Vec<String> = table
        .header
        .keys
        .iter()
        .chain(&table.header.measures)
        .cloned()
        .collect();
    let rows: Vec<Vec<String>> = table
        .page
        .items
        .iter()
        .take(MAX_GROUP_ROWS)
        .map(|row| {
            row.key
                .iter()
                .map(ToString::to_string)
                .chain(row.values.iter().map(|v| format_number(*v)))
                .collect()
        })
        .collect();
    grid(out, &header, &rows);
    if table.page.items.len() > MAX_GROUP_ROWS {
        let _ = writeln!(
            out,
            "  ... {} more",
            table.page.items.len() - MAX_GROUP_ROWS
        );
    }
    out.push('\n');
}

fn records<R: Record>(out: &mut String, title: &str, page: &Page<R>) {
    heading(out, title);
    let header: Vec<String> = R::COLUMNS.iter().map(|c| c.name.to_string()).collect();
    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|r| {
            R::COLUMNS
                .iter()
                .map(|c| r.value(c.name).to_string())
                .collect()
        })
        .collect();
    grid(out, &header, &rows);
    let _ = writeln!(
        out,
        "\nPage {} of {} ({} matching)",
        page.page, page.total_pages, page.total_count
    );
}

fn overview(out: &mut String, view: &OverviewView) {
    heading(out, &format!("Overview ({})", view.range));
    kpis(
        out,
        &[
            ("Total revenue", format!("${}", view.total_revenue)),
            ("New users", view.new_users.to_string()),
            ("Active users", view.active_users.to_string()),
            ("Open tickets", view.open_tickets.to_string()),
        ],
    );
    group_table(out, "Daily revenue", &view.daily_revenue);
    group_table(out, "Users by country", &view.users_by_country);
    group_table(out, "Revenue by product", &view.revenue_by_product);
    group_table(out, "Tickets by status", &view.tickets_by_status);
}

fn sales_analytics(out: &mut String, view: &SalesAnalyticsView) {
    heading(out, &format!("Sales Analytics ({})", view.range));
    kpis(
        out,
        &[
            ("Total revenue", format!("${}", view.total_revenue)),
            (
                "Average order value",
                view.average_order_value
                    .map_or_else(|| "-".to_string(), |v| format!("${:.2}", v)),
            ),
        ],
    );
    group_table(out, "Revenue over time", &view.revenue_over_time);
    group_table(out, "Revenue by product", &view.revenue_by_product);
    group_table(out, "Revenue by region", &view.revenue_by_region);
    group_table(out, "Product and region detail", &view.detail);
}

fn user_insights(out: &mut String, view: &UserInsightsView) {
    heading(out, "User Insights");
    kpis(
        out,
        &[
            ("Total users", view.total_users.to_string()),
            (
                "Active users",
                format!("{} ({}%)", view.active_users, view.active_percent),
            ),
            (
                "Premium users",
                format!("{} ({}%)", view.premium_users, view.premium_percent),
            ),
        ],
    );

    let _ = writeln!(out, "Monthly growth");
    let rows: Vec<Vec<String>> = view
        .monthly_growth
        .iter()
        .map(|p| {
            vec![
                p.month.clone(),
                p.new_users.to_string(),
                p.cumulative.to_string(),
            ]
        })
        .collect();
    grid(
        out,
        &["month".to_string(), "new_users".to_string(), "cumulative".to_string()],
        &rows,
    );
    out.push('\n');

    group_table(out, "Subscriptions", &view.subscriptions);
    group_table(out, "Activity levels", &view.activity_levels);
}

fn ticket_insights(out: &mut String, view: &TicketInsightsView) {
    heading(out, "Ticket Insights");
    kpis(
        out,
        &[
            ("Open", view.open.to_string()),
            ("In progress", view.in_progress.to_string()),
            ("Resolved", view.resolved.to_string()),
        ],
    );
    group_table(out, "By priority", &view.by_priority);
    group_table(out, "By category", &view.by_category);
    group_table(out, "Resolution hours by priority", &view.resolution_by_priority);
}

fn summary_row(summary: &ColumnSummary) -> Vec<String> {
    let stats = [
        summary.mean,
        summary.std,
        summary.min,
        summary.p25,
        summary.p50,
        summary.p75,
        summary.max,
    ];
    let mut row = vec![summary.column.to_string(), summary.count.to_string()];
    row.extend(
        stats
            .iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))),
    );
    row
}

fn series_explorer(out: &mut String, view: &SeriesExplorerView) {
    heading(out, "Data Explorer");
    kpis(
        out,
        &[
            ("Size", view.params.size.to_string()),
            ("Noise", format!("{:.2}", view.params.noise)),
            ("Rows", view.rows.to_string()),
        ],
    );

    let _ = writeln!(out, "Preview");
    let header: Vec<String> = SeriesPoint::COLUMNS
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    let rows: Vec<Vec<String>> = view
        .preview
        .iter()
        .map(|p| {
            vec![
                format!("{:.4}", p.x),
                format!("{:.4}", p.sin_x),
                format!("{:.4}", p.cos_x),
                format!("{:.4}", p.sin_cos_x),
            ]
        })
        .collect();
    grid(out, &header, &rows);
    out.push('\n');

    let _ = writeln!(out, "Summary statistics");
    let header: Vec<String> = ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = view.summaries.iter().map(summary_row).collect();
    grid(out, &header, &rows);
    out.push('\n');

    match &view.chart {
        ChartProjection::Points { kind, x, series } => {
            let columns: Vec<String> = series.iter().map(|(c, _)| c.to_string()).collect();
            let _ = writeln!(
                out,
                "{:?} chart: {} points of {}",
                kind,
                x.len(),
                columns.join(", ")
            );
        }
        ChartProjection::Histograms { histograms } => {
            for histogram in histograms {
                let _ = writeln!(out, "Histogram of {}", histogram.column);
                let peak = histogram.bins.iter().map(|b| b.count).max().unwrap_or(0);
                for bin in &histogram.bins {
                    let bar = if peak == 0 { 0 } else { bin.count * 40 / peak };
                    let _ = writeln!(
                        out,
                        "  [{:>8.3}, {:>8.3})  {:>4}  {}",
                        bin.lower,
                        bin.upper,
                        bin.count,
                        "#".repeat(bar)
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_data::query::{GroupHeader, GroupRow, KeyPart, PageRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_table_layout() {
        let table = GroupTable {
            header: GroupHeader {
                keys: vec!["product".to_string()],
                measures: vec!["revenue".to_string()],
            },
            page: Page::single(vec![
                GroupRow {
                    key: vec![KeyPart::Text("Product A".to_string())],
                    values: vec![Some(700.0)],
                },
                GroupRow {
                    key: vec![KeyPart::Text("Product B".to_string())],
                    values: vec![Some(12.5)],
                },
            ]),
        };

        let mut out = String::new();
        group_table(&mut out, "Revenue", &table);
        assert_eq!(
            out,
            "Revenue\n  product    revenue\n  ---------  -------\n  Product A  700\n  Product B  12.50\n\n"
        );
    }

    #[test]
    fn test_missing_ticket() {
        let out = render_table(&ViewResponse::TicketDetail { ticket: None });
        assert_eq!(out, "Ticket not found\n");
    }

    #[test]
    fn test_empty_page_footer() {
        let page = Page::<dashboard_data::UserRecord>::paginate(
            Vec::new(),
            PageRequest::first(10).unwrap(),
        );
        let mut out = String::new();
        records(&mut out, "User Directory", &page);
        assert!(out.ends_with("Page 1 of 0 (0 matching)\n"));
    }
}
