use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::{NewPromoCode, NewUser, PromoCode, User};
use crate::store::{PersistenceError, PromoLedger, QueryError, UserDirectory, UserFilter};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres backed user directory and promo ledger. Every call is bounded by
/// `timeout`, on top of the pool's own acquire timeout.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> PgStore {
        PgStore { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[tracing::instrument(name = "Running database migrations", skip(self))]
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    /// Drops both tables together with the migration history, so the next
    /// [`PgStore::migrate`] recreates the schema from scratch.
    #[tracing::instrument(name = "Dropping the promo schema", skip(self))]
    pub async fn reset(&self) -> Result<(), sqlx::Error> {
        for statement in [
            "DROP TABLE IF EXISTS promo_codes",
            "DROP TABLE IF EXISTS users",
            "DROP TABLE IF EXISTS _sqlx_migrations",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    #[tracing::instrument(
        name = "Insert a new user into the database",
        skip(self, new_user),
        fields(user_email = %new_user.email.as_ref())
    )]
    pub async fn insert_user(&self, new_user: &NewUser) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, birthday, joined_minute_at, verified_status, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(new_user.name.as_ref())
        .bind(new_user.email.as_ref())
        .bind(new_user.birthday)
        .bind(new_user.joined_minute_at.value())
        .bind(new_user.verified_status)
        .bind(new_user.phone.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn bounded<F, T, E>(&self, operation: F, on_timeout: E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout),
        }
    }

    async fn select_users(&self, filter: &UserFilter) -> Result<Vec<User>, QueryError> {
        let (month, day) = match filter.birthday {
            Some((month, day)) => (Some(month as i32), Some(day as i32)),
            None => (None, None),
        };

        let users = sqlx::query(
            r#"
            SELECT id, name, email, birthday, joined_minute_at, verified_status, phone
            FROM users
            WHERE ($1::boolean IS NULL OR verified_status = $1)
              AND ($2::integer IS NULL OR joined_minute_at = $2)
              AND ($3::integer IS NULL OR date_part('month', birthday)::integer = $3)
              AND ($4::integer IS NULL OR date_part('day', birthday)::integer = $4)
            ORDER BY name, id
            "#,
        )
        .bind(filter.verified_status)
        .bind(filter.joined_minute_at)
        .bind(month)
        .bind(day)
        .try_map(|row: PgRow| {
            Ok(User {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                birthday: row.try_get("birthday")?,
                joined_minute_at: row.try_get("joined_minute_at")?,
                verified_status: row.try_get("verified_status")?,
                phone: row.try_get("phone")?,
            })
        })
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn insert_promo_code(&self, promo: &NewPromoCode) -> Result<PromoCode, PersistenceError> {
        let mut transaction = self.pool.begin().await?;

        // Locking the owner serializes concurrent issuances for the same user.
        let owner = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(promo.user_id)
            .fetch_optional(&mut transaction)
            .await?;
        if owner.is_none() {
            return Err(PersistenceError::UnknownUser(promo.user_id));
        }

        // Windows are whole local days, so a shared start means the same day.
        // Comparing end dates would be wrong: after a DST switch a window
        // reaches past the next local midnight.
        let already_issued: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM promo_codes WHERE user_id = $1 AND start_date = $2)",
        )
        .bind(promo.user_id)
        .bind(promo.window.start())
        .fetch_one(&mut transaction)
        .await?
        .try_get(0)?;
        if already_issued {
            return Err(PersistenceError::AlreadyIssued {
                user_id: promo.user_id,
            });
        }

        let promo_code = sqlx::query(
            r#"
            INSERT INTO promo_codes (id, user_id, code, start_date, end_date, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, code, start_date, end_date, amount
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(promo.user_id)
        .bind(&promo.code)
        .bind(promo.window.start())
        .bind(promo.window.end())
        .bind(promo.amount)
        .try_map(|row: PgRow| {
            Ok(PromoCode {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                code: row.try_get("code")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                amount: row.try_get("amount")?,
            })
        })
        .fetch_one(&mut transaction)
        .await
        .map_err(|err| classify_write_error(err, promo.user_id))?;

        transaction.commit().await?;

        Ok(promo_code)
    }
}

fn classify_write_error(err: sqlx::Error, user_id: Uuid) -> PersistenceError {
    let code = match &err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    };

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => PersistenceError::AlreadyIssued { user_id },
        Some(FOREIGN_KEY_VIOLATION) => PersistenceError::UnknownUser(user_id),
        _ => PersistenceError::Database(err),
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    #[tracing::instrument(name = "Fetching users from the database", skip(self))]
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, QueryError> {
        self.bounded(self.select_users(filter), QueryError::Timeout)
            .await
            .map_err(|err| {
                tracing::error!("Failed to execute query: {:?}", err);
                err
            })
    }
}

#[async_trait]
impl PromoLedger for PgStore {
    #[tracing::instrument(
        name = "Insert a new promo code into the database",
        skip(self, promo),
        fields(user_id = %promo.user_id)
    )]
    async fn create(&self, promo: NewPromoCode) -> Result<PromoCode, PersistenceError> {
        self.bounded(self.insert_promo_code(&promo), PersistenceError::Timeout)
            .await
    }
}
