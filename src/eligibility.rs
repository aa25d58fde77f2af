use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::Deserialize;

use crate::domain::User;
use crate::store::{QueryError, UserDirectory, UserFilter};

/// Which stored attribute stands in for "today is the user's birthday".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityWindow {
    /// The minute the user joined at equals the current wall-clock minute.
    JoinedMinute,
    /// Month and day of the birth date equal today's date.
    Birthday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityQuery {
    pub verified: bool,
    pub check_window: bool,
}

pub struct EligibilitySelector {
    directory: Arc<dyn UserDirectory>,
    window: EligibilityWindow,
}

impl EligibilitySelector {
    pub fn new(directory: Arc<dyn UserDirectory>, window: EligibilityWindow) -> Self {
        Self { directory, window }
    }

    pub fn filter_at<Tz: TimeZone>(
        &self,
        query: EligibilityQuery,
        now: &DateTime<Tz>,
    ) -> UserFilter {
        let mut filter = UserFilter {
            verified_status: query.verified.then_some(true),
            ..UserFilter::default()
        };

        if query.check_window {
            match self.window {
                EligibilityWindow::JoinedMinute => {
                    filter.joined_minute_at = Some(now.minute() as i32);
                }
                EligibilityWindow::Birthday => {
                    filter.birthday = Some((now.month(), now.day()));
                }
            }
        }

        filter
    }

    /// Users eligible at `now`. No match is an empty list, not an error.
    pub async fn select<Tz: TimeZone>(
        &self,
        query: EligibilityQuery,
        now: &DateTime<Tz>,
    ) -> Result<Vec<User>, QueryError> {
        let filter = self.filter_at(query, now);
        tracing::debug!(?filter, "Selecting eligible users");

        self.directory.find_users(&filter).await
    }
}
