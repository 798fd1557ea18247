//! Synthetic dataset generators
//!
//! Generators are stateless. Every call takes the clock anchor (`now`) and the
//! random source explicitly, so a seeded [`rand::rngs::StdRng`] plus a fixed
//! `now` reproduces a dataset exactly.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{DashboardError, Result};

mod sales;
mod series;
mod tickets;
mod users;

pub use sales::{SalesDatasetGenerator, MAX_WINDOW_DAYS};
pub use series::{SeriesDatasetGenerator, SeriesParams};
pub use tickets::TicketDatasetGenerator;
pub use users::UserDatasetGenerator;

/// Pick one element uniformly. `items` must not be empty.
pub(crate) fn pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

/// Uniform instant in `[start, end]` at whole-second offsets from `start`
pub(crate) fn instant_between<R: Rng + ?Sized>(
    rng: &mut R,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DateTime<Utc> {
    let span = (end - start).num_seconds().max(0);
    start + Duration::seconds(rng.gen_range(0..=span))
}

/// Reject zero record counts
pub(crate) fn require_positive_count(field: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(DashboardError::invalid_parameter(
            field,
            "must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_instant_between_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(3);
        for _ in 0..500 {
            let t = instant_between(&mut rng, start, end);
            assert!(t >= start && t <= end);
        }
    }

    #[test]
    fn test_instant_between_degenerate_span() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(instant_between(&mut rng, start, start), start);
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(require_positive_count("user_count", 0).is_err());
        assert!(require_positive_count("user_count", 1).is_ok());
    }
}
