//! # RentCar Testing
//!
//! Testing utilities for the RentCar back-end.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given/When/Then harness for reducers
//! - [`FixedClock`]: deterministic time
//! - [`InMemoryDatabase`]: every repository trait backed by in-process
//!   tables, with the same uniqueness and state guards as `PostgreSQL`
//!
//! ## Example
//!
//! ```ignore
//! use rentcar_testing::{test_clock, InMemoryDatabase};
//!
//! let db = InMemoryDatabase::with_clock(test_clock());
//! let repos = Repositories::from_shared(Arc::new(db.clone()));
//! let state = AppState::new(repos, &auth, blocklist, images, Arc::new(test_clock()));
//! let app = build_router(state, &config.server, &config.storage);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rentcar_core::environment::Clock;

mod memory;
mod reducer_test;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, NaiveDate, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use rentcar_testing::mocks::FixedClock;
    /// use rentcar_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Clock stopped at midnight UTC on `date`
        #[must_use]
        pub fn on_date(date: NaiveDate) -> Self {
            Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Never in practice: the timestamp is a valid constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use memory::InMemoryDatabase;
pub use mocks::{test_clock, FixedClock};
pub use reducer_test::{assertions, ReducerTest};
