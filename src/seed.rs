use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{JoinedMinute, NewUser, PhoneNumber, UserEmail, UserName};
use crate::error_chain_fmt;
use crate::store::PgStore;

const BIRTHDAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Deserialize)]
struct SeedFile {
    user: Vec<SeedUser>,
}

#[derive(Deserialize, Debug)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub birthday: String,
    pub joined_minute_at: i32,
    pub verified_status: bool,
    pub phone: String,
}

impl TryFrom<SeedUser> for NewUser {
    type Error = String;

    fn try_from(seed: SeedUser) -> Result<Self, Self::Error> {
        let name = UserName::parse(seed.name)?;
        let email = UserEmail::parse(seed.email)?;
        let birthday = NaiveDate::parse_from_str(&seed.birthday, BIRTHDAY_FORMAT)
            .map_err(|err| format!("{} is not a valid birthday: {}", seed.birthday, err))?;
        let joined_minute_at = JoinedMinute::parse(seed.joined_minute_at)?;
        let phone = PhoneNumber::parse(seed.phone)?;

        Ok(NewUser {
            name,
            email,
            birthday,
            joined_minute_at,
            verified_status: seed.verified_status,
            phone,
        })
    }
}

#[derive(thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read the seed file.")]
    Read(#[from] std::io::Error),
    #[error("The seed file is not a valid user list.")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to insert a seed user into the database.")]
    Insert(#[from] sqlx::Error),
}

impl std::fmt::Debug for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Parses a seed document. Entries that fail validation are logged and
/// left out.
pub fn parse_seed_users(contents: &str) -> Result<Vec<NewUser>, serde_json::Error> {
    let seed_file: SeedFile = serde_json::from_str(contents)?;

    let users = seed_file
        .user
        .into_iter()
        .enumerate()
        .filter_map(|(index, seed)| match NewUser::try_from(seed) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!("Skipping seed user #{}: {}", index, err);
                None
            }
        })
        .collect();

    Ok(users)
}

#[tracing::instrument(name = "Seeding users", skip(store, path), fields(path = %path.display()))]
pub async fn seed_users(store: &PgStore, path: &Path) -> Result<usize, SeedError> {
    let contents = std::fs::read_to_string(path)?;
    let users = parse_seed_users(&contents)?;

    for user in &users {
        store.insert_user(user).await?;
    }

    tracing::info!("Seeded {} users", users.len());

    Ok(users.len())
}
