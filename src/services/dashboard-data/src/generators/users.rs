use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use super::{instant_between, pick, require_positive_count};
use crate::error::Result;
use crate::types::{ActivityLevel, Country, Subscription, UserRecord};

/// How far back join dates reach
const JOIN_WINDOW_DAYS: i64 = 365;

/// First numeric suffix handed out to generated user ids
const USER_ID_BASE: usize = 1000;

/// Generates synthetic user accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDatasetGenerator;

impl UserDatasetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate `count` users with ids `USER1000`, `USER1001`, ...
    pub fn generate<R: Rng + ?Sized>(
        &self,
        count: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<UserRecord>> {
        require_positive_count("user_count", count)?;

        let earliest = now - Duration::days(JOIN_WINDOW_DAYS);
        let mut users = Vec::with_capacity(count);

        for i in 0..count {
            let join_date = instant_between(rng, earliest, now);
            let activity_level = pick(rng, ActivityLevel::ALL);
            let login_count = rng.gen_range(activity_level.login_range());
            let subscription = pick(rng, Subscription::ALL);
            let last_login = instant_between(rng, join_date, now);
            let country = pick(rng, Country::ALL);

            users.push(UserRecord {
                user_id: format!("USER{}", i + USER_ID_BASE),
                join_date,
                last_login,
                name: format!("User {}", i + 1),
                email: format!("user{}@example.com", i + 1),
                country,
                subscription,
                activity_level,
                login_count,
                completed_profile: rng.gen_bool(0.5),
                notifications_enabled: rng.gen_bool(0.5),
            });
        }

        debug!(count, "Generated user dataset");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 13, 30, 0).unwrap()
    }

    #[test]
    fn test_login_window_invariant() {
        let mut rng = StdRng::seed_from_u64(5);
        let users = UserDatasetGenerator::new()
            .generate(500, now(), &mut rng)
            .unwrap();

        for u in &users {
            assert!(u.join_date >= now() - Duration::days(365));
            assert!(u.join_date <= u.last_login);
            assert!(u.last_login <= now());
        }
    }

    #[test]
    fn test_login_count_matches_activity() {
        let mut rng = StdRng::seed_from_u64(5);
        let users = UserDatasetGenerator::new()
            .generate(500, now(), &mut rng)
            .unwrap();

        for u in &users {
            assert!(u.activity_level.login_range().contains(&u.login_count));
        }
    }

    #[test]
    fn test_sequential_identity_fields() {
        let mut rng = StdRng::seed_from_u64(5);
        let users = UserDatasetGenerator::new()
            .generate(3, now(), &mut rng)
            .unwrap();

        assert_eq!(users[0].user_id, "USER1000");
        assert_eq!(users[2].user_id, "USER1002");
        assert_eq!(users[0].name, "User 1");
        assert_eq!(users[2].email, "user3@example.com");

        let ids: HashSet<_> = users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids.len(), users.len());
    }

    #[test]
    fn test_zero_users_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(UserDatasetGenerator::new().generate(0, now(), &mut rng).is_err());
    }
}
