use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::types::{Product, Region, SalesRecord};

/// Upper bound on the generated window; ten years of daily rows
pub const MAX_WINDOW_DAYS: i64 = 3650;

const BASE_QUANTITY: std::ops::RangeInclusive<u32> = 5..=50;

/// Generates one sales record per (day, product, region) triple
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesDatasetGenerator;

impl SalesDatasetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate every day in `[now - window_days, now]` for every product and region.
    ///
    /// Quantities are a uniform base in `[5, 50]` scaled by day-of-year
    /// seasonality, product popularity and regional volume, truncated toward zero.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        window_days: i64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<SalesRecord>> {
        if window_days < 0 {
            return Err(DashboardError::invalid_parameter(
                "window_days",
                "must not be negative",
            ));
        }
        if window_days > MAX_WINDOW_DAYS {
            return Err(DashboardError::invalid_parameter(
                "window_days",
                format!("must be at most {}", MAX_WINDOW_DAYS),
            ));
        }

        let days = window_days as usize + 1;
        let mut records = Vec::with_capacity(days * Product::ALL.len() * Region::ALL.len());

        for offset in (0..=window_days).rev() {
            let date = (now - Duration::days(offset)).date_naive();
            let seasonality = 1.0 + 0.3 * (f64::from(date.ordinal()) / 30.0).sin();

            for &product in Product::ALL {
                for &region in Region::ALL {
                    let base = f64::from(rng.gen_range(BASE_QUANTITY));
                    let scaled =
                        base * seasonality * product.popularity() * region.volume_factor();
                    let quantity = scaled.trunc() as u32;
                    let price = product.price();

                    records.push(SalesRecord {
                        date,
                        product,
                        region,
                        quantity,
                        price,
                        revenue: u64::from(quantity) * u64::from(price),
                    });
                }
            }
        }

        debug!(window_days, rows = records.len(), "Generated sales dataset");
        Ok(records)
    }
}
