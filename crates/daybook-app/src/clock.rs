//! Time source for "today" and timestamp rendering.

use daybook_core::DayKey;
use time::{OffsetDateTime, UtcOffset};

/// Wall clock used by the engine.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> OffsetDateTime;

    /// Offset used to decide the current day and render timestamps.
    fn local_offset(&self) -> UtcOffset;

    /// Today's date in [`local_offset`](Self::local_offset).
    fn today(&self) -> DayKey {
        DayKey::from_date(self.now().to_offset(self.local_offset()).date())
    }
}

/// Process clock; falls back to UTC when the local offset is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn local_offset(&self) -> UtcOffset {
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: OffsetDateTime,
}

impl FixedClock {
    /// Freeze at `now`, using its offset as the local one.
    #[must_use]
    pub const fn new(now: OffsetDateTime) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.now
    }

    fn local_offset(&self) -> UtcOffset {
        self.now.offset()
    }
}
