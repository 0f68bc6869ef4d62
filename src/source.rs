//! Time and identity sources
//!
//! The scanner and re-anchoring engine never read the clock or a random
//! generator directly; they go through these traits so tests can supply
//! deterministic values.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::config::AnchorConfig;

/// Source of creation timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of annotation ids and temporary marker colors
pub trait IdSource: Send + Sync {
    /// A new unique annotation id
    fn new_id(&mut self) -> String;

    /// A random `#rrggbb` color
    fn marker_color(&mut self) -> String;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UUID v4 ids and uniformly random marker colors
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn new_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }

    fn marker_color(&mut self) -> String {
        let value: u32 = rand::thread_rng().gen_range(0..=0xFF_FFFF);
        format!("#{:06x}", value)
    }
}

/// Everything a document operation needs besides the document itself
pub struct Context<'a> {
    pub clock: &'a dyn Clock,
    pub ids: &'a mut dyn IdSource,
    pub config: &'a AnchorConfig,
}

#[cfg(test)]
pub mod testing {
    //! Deterministic sources for tests

    use chrono::TimeZone;

    use super::*;

    /// Always returns the same instant
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub DateTime<Utc>);

    impl Default for FixedClock {
        fn default() -> Self {
            Self(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Ids `ann-1`, `ann-2`, ... and colors `#0a0001`, `#0a0002`, ...
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        next_id: u32,
        next_color: u32,
    }

    impl IdSource for SequentialIds {
        fn new_id(&mut self) -> String {
            self.next_id += 1;
            format!("ann-{}", self.next_id)
        }

        fn marker_color(&mut self) -> String {
            self.next_color += 1;
            format!("#{:06x}", 0x0a_0000 + self.next_color)
        }
    }

    /// Owns a clock, id source and config so tests can borrow a [`Context`]
    #[derive(Default)]
    pub struct TestEnv {
        pub clock: FixedClock,
        pub ids: SequentialIds,
        pub config: AnchorConfig,
    }

    impl TestEnv {
        pub fn context(&mut self) -> Context<'_> {
            Context {
                clock: &self.clock,
                ids: &mut self.ids,
                config: &self.config,
            }
        }
    }

    #[test]
    fn test_random_marker_color_format() {
        let mut ids = RandomIds;
        for _ in 0..32 {
            let color = ids.marker_color();
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_random_ids_are_unique() {
        let mut ids = RandomIds;
        assert_ne!(ids.new_id(), ids.new_id());
    }
}
