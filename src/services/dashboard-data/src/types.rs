//! Record and category types for the synthetic dashboard datasets
//!
//! Categorical fields are closed enums. Their display labels are the exact
//! strings the dashboards show and the CSV export writes.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::record::{Column, FieldKind, FieldValue, Record};

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DashboardError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        DashboardError::invalid_parameter(
                            stringify!($name),
                            format!("unknown value '{}'", s),
                        )
                    })
            }
        }
    };
}

labelled_enum! {
    /// Catalogue products
    Product {
        A => "Product A",
        B => "Product B",
        C => "Product C",
        D => "Product D",
        E => "Product E",
    }
}

impl Product {
    /// Fixed unit price
    pub fn price(&self) -> u32 {
        match self {
            Product::A => 50,
            Product::B => 75,
            Product::C => 100,
            Product::D => 120,
            Product::E => 200,
        }
    }

    /// Relative popularity multiplier applied to generated quantities
    pub fn popularity(&self) -> f64 {
        match self {
            Product::A => 1.5,
            Product::B => 0.7,
            Product::C => 1.2,
            Product::D => 0.9,
            Product::E => 1.1,
        }
    }
}

labelled_enum! {
    /// Sales regions
    Region {
        North => "North",
        South => "South",
        East => "East",
        West => "West",
        Central => "Central",
    }
}

impl Region {
    /// Relative sales volume multiplier
    pub fn volume_factor(&self) -> f64 {
        match self {
            Region::North => 1.1,
            Region::South => 0.9,
            Region::East => 1.3,
            Region::West => 1.2,
            Region::Central => 0.8,
        }
    }
}

labelled_enum! {
    Country {
        Usa => "USA",
        Canada => "Canada",
        Uk => "UK",
        Germany => "Germany",
        France => "France",
        Australia => "Australia",
        Japan => "Japan",
        Brazil => "Brazil",
        India => "India",
        China => "China",
    }
}

labelled_enum! {
    Subscription {
        Free => "Free",
        Basic => "Basic",
        Premium => "Premium",
        Enterprise => "Enterprise",
    }
}

impl Subscription {
    /// Paid tiers counted as premium on the user dashboard
    pub fn is_premium(&self) -> bool {
        matches!(self, Subscription::Premium | Subscription::Enterprise)
    }
}

labelled_enum! {
    ActivityLevel {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

impl ActivityLevel {
    /// Inclusive login count range for users at this activity level
    pub fn login_range(&self) -> RangeInclusive<u32> {
        match self {
            ActivityLevel::Low => 1..=15,
            ActivityLevel::Medium => 15..=50,
            ActivityLevel::High => 50..=200,
        }
    }
}

labelled_enum! {
    TicketStatus {
        Open => "Open",
        InProgress => "In Progress",
        Closed => "Closed",
        Resolved => "Resolved",
    }
}

impl TicketStatus {
    /// Statuses that carry a resolution timestamp
    pub fn is_resolved(&self) -> bool {
        matches!(self, TicketStatus::Closed | TicketStatus::Resolved)
    }

    /// Statuses still waiting on an agent
    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

labelled_enum! {
    /// Ticket priority, ordered from least to most urgent
    Priority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

impl Priority {
    /// Position in urgency order, `Low` first
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

labelled_enum! {
    TicketCategory {
        Bug => "Bug",
        FeatureRequest => "Feature Request",
        Question => "Question",
        TechnicalIssue => "Technical Issue",
        Billing => "Billing",
    }
}

labelled_enum! {
    /// Noisy signal columns of the data explorer series
    SeriesColumn {
        Sin => "sin(x)",
        Cos => "cos(x)",
        SinCos => "sin(x)cos(x)",
    }
}

/// One synthetic sale for a (day, product, region) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub product: Product,
    pub region: Region,
    pub quantity: u32,
    pub price: u32,
    pub revenue: u64,
}

impl Record for SalesRecord {
    const ENTITY: &'static str = "sales record";

    const COLUMNS: &'static [Column] = &[
        Column::new("date", FieldKind::Date),
        Column::new("product", FieldKind::Text),
        Column::new("region", FieldKind::Text),
        Column::new("quantity", FieldKind::Integer),
        Column::new("price", FieldKind::Integer),
        Column::new("revenue", FieldKind::Integer),
    ];

    fn value(&self, column: &str) -> FieldValue<'_> {
        match column {
            "date" => FieldValue::Date(self.date),
            "product" => FieldValue::Text(self.product.as_str()),
            "region" => FieldValue::Text(self.region.as_str()),
            "quantity" => FieldValue::Integer(i64::from(self.quantity)),
            "price" => FieldValue::Integer(i64::from(self.price)),
            "revenue" => FieldValue::Integer(self.revenue as i64),
            _ => FieldValue::Null,
        }
    }
}

/// A synthetic user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub join_date: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub country: Country,
    pub subscription: Subscription,
    pub activity_level: ActivityLevel,
    pub login_count: u32,
    pub completed_profile: bool,
    pub notifications_enabled: bool,
}

impl Record for UserRecord {
    const ENTITY: &'static str = "user";

    const COLUMNS: &'static [Column] = &[
        Column::new("user_id", FieldKind::Text),
        Column::new("join_date", FieldKind::Timestamp),
        Column::new("last_login", FieldKind::Timestamp),
        Column::new("name", FieldKind::Text),
        Column::new("email", FieldKind::Text),
        Column::new("country", FieldKind::Text),
        Column::new("subscription", FieldKind::Text),
        Column::new("activity_level", FieldKind::Text),
        Column::new("login_count", FieldKind::Integer),
        Column::new("completed_profile", FieldKind::Bool),
        Column::new("notifications_enabled", FieldKind::Bool),
    ];

    fn value(&self, column: &str) -> FieldValue<'_> {
        match column {
            "user_id" => FieldValue::Text(&self.user_id),
            "join_date" => FieldValue::Timestamp(self.join_date),
            "last_login" => FieldValue::Timestamp(self.last_login),
            "name" => FieldValue::Text(&self.name),
            "email" => FieldValue::Text(&self.email),
            "country" => FieldValue::Text(self.country.as_str()),
            "subscription" => FieldValue::Text(self.subscription.as_str()),
            "activity_level" => FieldValue::Text(self.activity_level.as_str()),
            "login_count" => FieldValue::Integer(i64::from(self.login_count)),
            "completed_profile" => FieldValue::Bool(self.completed_profile),
            "notifications_enabled" => FieldValue::Bool(self.notifications_enabled),
            _ => FieldValue::Null,
        }
    }
}

/// A synthetic support ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: String,
    pub created_date: DateTime<Utc>,
    pub resolved_date: Option<DateTime<Utc>>,
    pub status: TicketStatus,
    pub title: String,
    pub category: TicketCategory,
    pub priority: Priority,
    pub assigned_to: String,
    /// Drawn independently of any generated user; not a foreign key
    pub user_id: String,
}

impl TicketRecord {
    /// Time from creation to resolution
    pub fn resolution_time(&self) -> Option<Duration> {
        self.resolved_date.map(|resolved| resolved - self.created_date)
    }

    /// Resolution time in fractional hours
    pub fn resolution_hours(&self) -> Option<f64> {
        self.resolution_time()
            .map(|d| d.num_seconds() as f64 / 3600.0)
    }
}

impl Record for TicketRecord {
    const ENTITY: &'static str = "ticket";

    const COLUMNS: &'static [Column] = &[
        Column::new("ticket_id", FieldKind::Text),
        Column::new("created_date", FieldKind::Timestamp),
        Column::new("resolved_date", FieldKind::Timestamp),
        Column::new("status", FieldKind::Text),
        Column::new("title", FieldKind::Text),
        Column::new("category", FieldKind::Text),
        Column::new("priority", FieldKind::Text),
        Column::new("assigned_to", FieldKind::Text),
        Column::new("user_id", FieldKind::Text),
    ];

    const DERIVED: &'static [Column] = &[Column::new("resolution_hours", FieldKind::Float)];

    fn value(&self, column: &str) -> FieldValue<'_> {
        match column {
            "ticket_id" => FieldValue::Text(&self.ticket_id),
            "created_date" => FieldValue::Timestamp(self.created_date),
            "resolved_date" => self
                .resolved_date
                .map_or(FieldValue::Null, FieldValue::Timestamp),
            "status" => FieldValue::Text(self.status.as_str()),
            "title" => FieldValue::Text(&self.title),
            "category" => FieldValue::Text(self.category.as_str()),
            "priority" => FieldValue::Ordinal {
                rank: self.priority.rank(),
                label: self.priority.as_str(),
            },
            "assigned_to" => FieldValue::Text(&self.assigned_to),
            "user_id" => FieldValue::Text(&self.user_id),
            "resolution_hours" => self
                .resolution_hours()
                .map_or(FieldValue::Null, FieldValue::Float),
            _ => FieldValue::Null,
        }
    }
}

/// One sample of the data explorer series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub x: f64,
    #[serde(rename = "sin(x)")]
    pub sin_x: f64,
    #[serde(rename = "cos(x)")]
    pub cos_x: f64,
    #[serde(rename = "sin(x)cos(x)")]
    pub sin_cos_x: f64,
}

impl SeriesPoint {
    pub fn get(&self, column: SeriesColumn) -> f64 {
        match column {
            SeriesColumn::Sin => self.sin_x,
            SeriesColumn::Cos => self.cos_x,
            SeriesColumn::SinCos => self.sin_cos_x,
        }
    }
}

impl Record for SeriesPoint {
    const ENTITY: &'static str = "series point";

    const COLUMNS: &'static [Column] = &[
        Column::new("x", FieldKind::Float),
        Column::new("sin(x)", FieldKind::Float),
        Column::new("cos(x)", FieldKind::Float),
        Column::new("sin(x)cos(x)", FieldKind::Float),
    ];

    fn value(&self, column: &str) -> FieldValue<'_> {
        match column {
            "x" => FieldValue::Float(self.x),
            "sin(x)" => FieldValue::Float(self.sin_x),
            "cos(x)" => FieldValue::Float(self.cos_x),
            "sin(x)cos(x)" => FieldValue::Float(self.sin_cos_x),
            _ => FieldValue::Null,
        }
    }
}
