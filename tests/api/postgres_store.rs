//! These tests need a Postgres server reachable with the development
//! settings. Run them with `cargo test -- --ignored`.
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};
use claim::assert_ok;
use sqlx::Row;
use uuid::Uuid;

use birthday_promo::{
    domain::{
        JoinedMinute, NewPromoCode, NewUser, PhoneNumber, PromoWindow, UserEmail, UserName,
    },
    startup::init_store,
    store::{PersistenceError, PromoLedger, UserDirectory, UserFilter},
};

use crate::helpers::{at, configure_db};

fn new_user(name: &str, verified_status: bool, joined_minute_at: i32) -> NewUser {
    NewUser {
        name: UserName::parse(name.to_string()).unwrap(),
        email: UserEmail::parse(format!("{}@example.com", name.to_lowercase())).unwrap(),
        birthday: NaiveDate::from_ymd_opt(1998, 7, 17).unwrap(),
        joined_minute_at: JoinedMinute::parse(joined_minute_at).unwrap(),
        verified_status,
        phone: PhoneNumber::parse("+6281234567890".to_string()).unwrap(),
    }
}

fn new_promo(user_id: Uuid) -> NewPromoCode {
    NewPromoCode {
        user_id,
        code: "c0ffee".to_string(),
        window: PromoWindow::for_day(&at(10, 5)).unwrap(),
        amount: 10000.0,
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn find_users_applies_every_predicate() {
    let (_, store) = configure_db().await;
    let a = store.insert_user(&new_user("A", true, 5)).await.unwrap();
    store.insert_user(&new_user("B", false, 5)).await.unwrap();
    store.insert_user(&new_user("C", true, 6)).await.unwrap();

    let filter = UserFilter {
        verified_status: Some(true),
        joined_minute_at: Some(5),
        birthday: None,
    };
    let users = assert_ok!(store.find_users(&filter).await);

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, a);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn find_users_matches_birthdays_regardless_of_year() {
    let (_, store) = configure_db().await;
    store.insert_user(&new_user("Ilham", true, 5)).await.unwrap();

    let today = UserFilter {
        birthday: Some((7, 17)),
        ..UserFilter::default()
    };
    let tomorrow = UserFilter {
        birthday: Some((7, 18)),
        ..UserFilter::default()
    };

    assert_eq!(assert_ok!(store.find_users(&today).await).len(), 1);
    assert!(assert_ok!(store.find_users(&tomorrow).await).is_empty());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn create_persists_the_promo_code() {
    let (_, store) = configure_db().await;
    let user_id = store.insert_user(&new_user("Ilham", true, 5)).await.unwrap();

    let promo = assert_ok!(store.create(new_promo(user_id)).await);

    let row = sqlx::query("SELECT code, start_date, end_date FROM promo_codes WHERE id = $1")
        .bind(promo.id)
        .fetch_one(store.pool())
        .await
        .expect("Failed to fetch the promo code.");
    let code: String = row.get("code");
    let start: chrono::DateTime<chrono::Utc> = row.get("start_date");
    let end: chrono::DateTime<chrono::Utc> = row.get("end_date");

    assert_eq!(code, "c0ffee");
    assert_eq!(end - start, Duration::hours(24) - Duration::seconds(1));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn second_promo_in_the_same_window_is_refused() {
    let (_, store) = configure_db().await;
    let user_id = store.insert_user(&new_user("Ilham", true, 5)).await.unwrap();

    assert_ok!(store.create(new_promo(user_id)).await);
    let second = store.create(new_promo(user_id)).await;

    assert!(matches!(second, Err(PersistenceError::AlreadyIssued { .. })));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn promo_for_the_day_after_a_spring_forward_switch_is_issued() {
    let (_, store) = configure_db().await;
    let user_id = store.insert_user(&new_user("Ilham", true, 5)).await.unwrap();
    // America/New_York moves from -05:00 to -04:00 on 10 March 2024.
    let switch_day_noon = FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
        .unwrap();
    let next_day_noon = FixedOffset::west_opt(4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 11, 12, 0, 0)
        .unwrap();

    for now in [switch_day_noon, next_day_noon] {
        let promo = NewPromoCode {
            window: PromoWindow::for_day(&now).unwrap(),
            ..new_promo(user_id)
        };
        assert_ok!(store.create(promo).await);
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn promo_for_an_unknown_user_is_refused() {
    let (_, store) = configure_db().await;

    let result = store.create(new_promo(Uuid::new_v4())).await;

    assert!(matches!(result, Err(PersistenceError::UnknownUser(_))));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn refresh_recreates_the_schema_and_seeds_users() {
    let (mut config, store) = configure_db().await;
    store.insert_user(&new_user("Stale", true, 5)).await.unwrap();
    config.database.refresh = true;

    assert_ok!(init_store(&store, &config).await);

    let count: i64 = sqlx::query("SELECT COUNT(*) FROM users")
        .fetch_one(store.pool())
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 4);
}
