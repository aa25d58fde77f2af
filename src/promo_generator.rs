use chrono::{DateTime, TimeZone};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derives the promo code for a user and validity start.
///
/// The code is the lowercase hex SHA-256 digest of the user's name, the
/// hyphenated user id and the textual start timestamp, in that order. The same
/// inputs always yield the same code.
pub fn generate_promo_code<Tz>(name: &str, start_date: &DateTime<Tz>, user_id: &Uuid) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(user_id.to_string().as_bytes());
    hasher.update(start_date.to_string().as_bytes());

    format!("{:x}", hasher.finalize())
}
