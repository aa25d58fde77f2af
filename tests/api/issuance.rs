use birthday_promo::domain::NotificationChannel;
use birthday_promo::promo_generator::generate_promo_code;
use chrono::{Duration, Utc};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{at, new_york_noon_in_march, TestApp, ACCOUNT_SID};

fn messages_path() -> String {
    format!("/2010-04-01/Accounts/{}/Messages.json", ACCOUNT_SID)
}

#[tokio::test]
async fn only_verified_users_in_the_current_minute_get_a_promo() {
    let test_app = TestApp::spawn().await;
    let a = test_app.store.add_user("A", true, 5);
    let b = test_app.store.add_user("B", false, 5);
    let c = test_app.store.add_user("C", true, 6);

    Mock::given(path(messages_path()))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    assert_eq!(test_app.store.promo_codes_for(&a).len(), 1);
    assert!(test_app.store.promo_codes_for(&b).is_empty());
    assert!(test_app.store.promo_codes_for(&c).is_empty());
}

#[tokio::test]
async fn issued_promo_covers_the_current_day() {
    let test_app = TestApp::spawn().await;
    let user = test_app.store.add_user("Ilham", true, 5);
    let now = at(10, 5);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(now).await;

    let promo = test_app.store.promo_codes_for(&user).remove(0);
    assert_eq!(
        promo.end_date - promo.start_date,
        Duration::hours(24) - Duration::seconds(1)
    );
    let now = now.with_timezone(&Utc);
    assert!(promo.start_date <= now && now < promo.end_date);
    assert_eq!(promo.amount, 10000.0);
    assert_eq!(
        promo.code,
        generate_promo_code(&user.name, &promo.start_date, &user.id)
    );
}

#[tokio::test]
async fn notification_embeds_the_promo_code() {
    let test_app = TestApp::spawn().await;
    let user = test_app.store.add_user("Ilham", true, 5);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    let promo = test_app.store.promo_codes_for(&user).remove(0);
    let messages = test_app.delivered_messages().await;
    assert!(messages[0].contains(&promo.code), "{}", messages[0]);
    assert!(messages[0].contains("Gift+for+Ilham%27s+Birthday%21"), "{}", messages[0]);
}

#[tokio::test]
async fn ledger_failure_for_one_user_does_not_abort_the_batch() {
    let test_app = TestApp::spawn().await;
    let first = test_app.store.add_user("First", true, 5);
    let second = test_app.store.add_user("Second", true, 5);
    test_app.store.fail_writes_for(&first);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    assert!(test_app.store.promo_codes_for(&first).is_empty());
    let promo = test_app.store.promo_codes_for(&second).remove(0);
    let messages = test_app.delivered_messages().await;
    assert!(messages[0].contains(&promo.code));
}

#[tokio::test]
async fn promo_stays_persisted_when_the_notification_fails() {
    let test_app = TestApp::spawn().await;
    let first = test_app.store.add_user("First", true, 5);
    let second = test_app.store.add_user("Second", true, 5);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    assert_eq!(test_app.store.promo_codes_for(&first).len(), 1);
    assert_eq!(test_app.store.promo_codes_for(&second).len(), 1);
}

#[tokio::test]
async fn notification_failure_does_not_stop_the_next_tick() {
    let test_app = TestApp::spawn().await;
    let early = test_app.store.add_user("Early", true, 5);
    let late = test_app.store.add_user("Late", true, 6);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&test_app.provider_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;
    test_app.run_tick_at(at(10, 6)).await;

    assert_eq!(test_app.store.promo_codes_for(&early).len(), 1);
    assert_eq!(test_app.store.promo_codes_for(&late).len(), 1);
}

#[tokio::test]
async fn rerunning_a_tick_in_the_same_window_issues_nothing_new() {
    let test_app = TestApp::spawn().await;
    let user = test_app.store.add_user("Ilham", true, 5);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;
    test_app.run_tick_at(at(10, 5)).await;
    test_app.run_tick_at(at(11, 5)).await;

    assert_eq!(test_app.store.promo_codes_for(&user).len(), 1);
}

#[tokio::test]
async fn promo_is_issued_again_on_the_day_after_a_dst_switch() {
    let test_app = TestApp::spawn().await;
    let user = test_app.store.add_user("Ilham", true, 0);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(new_york_noon_in_march(9)).await;
    test_app.run_tick_at(new_york_noon_in_march(10)).await;
    test_app.run_tick_at(new_york_noon_in_march(11)).await;

    assert_eq!(test_app.store.promo_codes_for(&user).len(), 3);
}

#[tokio::test]
async fn failed_user_query_skips_the_tick() {
    let test_app = TestApp::spawn().await;
    test_app.store.add_user("Ilham", true, 5);
    test_app.store.take_directory_down();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    assert!(test_app.store.promo_codes().is_empty());
}

#[tokio::test]
async fn unsupported_channel_persists_the_promo_without_calling_the_provider() {
    let test_app = TestApp::spawn_with_channel(NotificationChannel::Sms).await;
    let user = test_app.store.add_user("Ilham", true, 5);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test_app.provider_server)
        .await;

    test_app.run_tick_at(at(10, 5)).await;

    assert_eq!(test_app.store.promo_codes_for(&user).len(), 1);
}
