use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewPromoCode, PromoCode, User};
use crate::error_chain_fmt;

pub mod postgres;

pub use postgres::PgStore;

/// Parameterized predicate over the user directory. `None` fields are not
/// filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub verified_status: Option<bool>,
    pub joined_minute_at: Option<i32>,
    /// `(month, day)` of the birth date.
    pub birthday: Option<(u32, u32)>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        use chrono::Datelike;

        self.verified_status
            .map_or(true, |verified| user.verified_status == verified)
            && self
                .joined_minute_at
                .map_or(true, |minute| user.joined_minute_at == minute)
            && self.birthday.map_or(true, |(month, day)| {
                user.birthday.month() == month && user.birthday.day() == day
            })
    }
}

/// Read side of the store, as seen by the issuance pipeline.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, QueryError>;
}

/// Write side of the store for issued promo codes.
#[async_trait]
pub trait PromoLedger: Send + Sync {
    /// Persists a promo code. Fails with [`PersistenceError::AlreadyIssued`]
    /// when the user already holds a code for the same window.
    async fn create(&self, promo: NewPromoCode) -> Result<PromoCode, PersistenceError>;
}

#[derive(thiserror::Error)]
pub enum QueryError {
    #[error("Failed to query users from the database.")]
    Database(#[from] sqlx::Error),
    #[error("Querying users took too long.")]
    Timeout,
}

#[derive(thiserror::Error)]
pub enum PersistenceError {
    #[error("User {0} does not exist.")]
    UnknownUser(Uuid),
    #[error("User {user_id} already holds a promo code for this window.")]
    AlreadyIssued { user_id: Uuid },
    #[error("Failed to store the promo code in the database.")]
    Database(#[from] sqlx::Error),
    #[error("Storing the promo code took too long.")]
    Timeout,
}

impl std::fmt::Debug for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl std::fmt::Debug for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
