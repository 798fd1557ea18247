use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use super::{instant_between, pick, require_positive_count};
use crate::error::Result;
use crate::types::{Priority, TicketCategory, TicketRecord, TicketStatus};

const CREATED_WINDOW_DAYS: i64 = 30;
const RESOLUTION_DAYS: std::ops::RangeInclusive<i64> = 1..=5;
const AGENT_COUNT: u32 = 10;
const TICKET_ID_BASE: usize = 1000;

/// Ticket requesters are drawn from this id range without checking that the
/// user exists in any generated user dataset.
const REQUESTER_IDS: std::ops::RangeInclusive<u32> = 1000..=2000;

/// Generates synthetic support tickets
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketDatasetGenerator;

impl TicketDatasetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate `count` tickets with ids `TCK-1000`, `TCK-1001`, ...
    ///
    /// Closed and resolved tickets get a resolution date one to five whole days
    /// after creation; every other status has none.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        count: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<TicketRecord>> {
        require_positive_count("ticket_count", count)?;

        let earliest = now - Duration::days(CREATED_WINDOW_DAYS);
        let mut tickets = Vec::with_capacity(count);

        for i in 0..count {
            let created_date = instant_between(rng, earliest, now);
            let status = pick(rng, TicketStatus::ALL);
            let resolved_date = if status.is_resolved() {
                Some(created_date + Duration::days(rng.gen_range(RESOLUTION_DAYS)))
            } else {
                None
            };

            tickets.push(TicketRecord {
                ticket_id: format!("TCK-{}", i + TICKET_ID_BASE),
                created_date,
                resolved_date,
                status,
                title: format!("Issue {}", i + 1),
                category: pick(rng, TicketCategory::ALL),
                priority: pick(rng, Priority::ALL),
                assigned_to: format!("Agent {}", rng.gen_range(1..=AGENT_COUNT)),
                user_id: format!("USER{}", rng.gen_range(REQUESTER_IDS)),
            });
        }

        debug!(count, "Generated ticket dataset");
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 13, 30, 0).unwrap()
    }

    #[test]
    fn test_resolution_invariant() {
        let mut rng = StdRng::seed_from_u64(11);
        let tickets = TicketDatasetGenerator::new()
            .generate(400, now(), &mut rng)
            .unwrap();

        for t in &tickets {
            assert_eq!(t.resolved_date.is_some(), t.status.is_resolved(), "{:?}", t);
            if let Some(resolved) = t.resolved_date {
                let days = (resolved - t.created_date).num_days();
                assert!(resolved > t.created_date);
                assert!((1..=5).contains(&days));
            }
        }
    }

    #[test]
    fn test_created_within_last_month() {
        let mut rng = StdRng::seed_from_u64(11);
        let tickets = TicketDatasetGenerator::new()
            .generate(200, now(), &mut rng)
            .unwrap();

        for t in &tickets {
            assert!(t.created_date >= now() - Duration::days(30));
            assert!(t.created_date <= now());
        }
    }

    #[test]
    fn test_identity_and_pools() {
        let mut rng = StdRng::seed_from_u64(11);
        let tickets = TicketDatasetGenerator::new()
            .generate(200, now(), &mut rng)
            .unwrap();

        assert_eq!(tickets[0].ticket_id, "TCK-1000");
        assert_eq!(tickets[0].title, "Issue 1");
        for t in &tickets {
            let agent: u32 = t.assigned_to.trim_start_matches("Agent ").parse().unwrap();
            assert!((1..=10).contains(&agent));
            let user: u32 = t.user_id.trim_start_matches("USER").parse().unwrap();
            assert!((1000..=2000).contains(&user));
        }
    }

    #[test]
    fn test_zero_tickets_rejected() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(TicketDatasetGenerator::new().generate(0, now(), &mut rng).is_err());
    }
}
