use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

/// A promo code persisted in the ledger.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPromoCode {
    pub user_id: Uuid,
    pub code: String,
    pub window: PromoWindow,
    pub amount: f64,
}

/// Validity window of a promo code: a whole local calendar day,
/// from 00:00:00 to 23:59:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl PromoWindow {
    /// Builds the window for the calendar day `now` falls on, in `now`'s own
    /// timezone. Returns `None` when local midnight does not exist that day.
    ///
    /// `end` is always `start + 24h - 1s` and the window is half-open, so an
    /// instant in the last second of the day (23:59:59 onwards) is not
    /// [`contained`](PromoWindow::contains) in its own window. Across a DST
    /// switch `end` may also land an hour before or after the next local
    /// midnight.
    pub fn for_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<PromoWindow> {
        let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
        let start = now
            .timezone()
            .from_local_datetime(&midnight)
            .earliest()?
            .with_timezone(&Utc);
        let end = start + Duration::hours(24) - Duration::seconds(1);

        Some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&Utc);
        self.start <= instant && instant < self.end
    }
}
