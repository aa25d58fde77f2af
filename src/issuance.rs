use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use crate::domain::{NewPromoCode, NotificationChannel, PromoWindow, User};
use crate::eligibility::{EligibilityQuery, EligibilitySelector};
use crate::notification_client::{NotificationDispatcher, NotificationRequest};
use crate::promo_generator::generate_promo_code;
use crate::scheduler::ScheduledJob;
use crate::store::{PersistenceError, PromoLedger};

const BIRTHDAY_RUN: EligibilityQuery = EligibilityQuery {
    verified: true,
    check_window: true,
};

/// What is awarded and how the user hears about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromoPolicy {
    pub amount: f64,
    pub channel: NotificationChannel,
}

/// Runs one issuance pass: select eligible users, then for each of them
/// generate, persist and announce a promo code. A failure for one user never
/// stops the pass.
pub struct IssuanceOrchestrator {
    selector: EligibilitySelector,
    ledger: Arc<dyn PromoLedger>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    policy: PromoPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IssueOutcome {
    Notified,
    NotNotified,
    AlreadyIssued,
    Failed,
}

#[derive(Debug, Default)]
struct TickSummary {
    issued: usize,
    notified: usize,
    already_issued: usize,
    failed: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: IssueOutcome) {
        match outcome {
            IssueOutcome::Notified => {
                self.issued += 1;
                self.notified += 1;
            }
            IssueOutcome::NotNotified => self.issued += 1,
            IssueOutcome::AlreadyIssued => self.already_issued += 1,
            IssueOutcome::Failed => self.failed += 1,
        }
    }
}

impl IssuanceOrchestrator {
    pub fn new(
        selector: EligibilitySelector,
        ledger: Arc<dyn PromoLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        policy: PromoPolicy,
    ) -> Self {
        Self {
            selector,
            ledger,
            dispatcher,
            policy,
        }
    }

    pub async fn run_tick(&self) {
        self.run_tick_at(&Local::now()).await
    }

    #[tracing::instrument(name = "Running a promo issuance tick", skip(self, now), fields(tick_at = %now))]
    pub async fn run_tick_at<Tz>(&self, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let users = match self.selector.select(BIRTHDAY_RUN, now).await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!("Failed to select eligible users, skipping this tick: {:?}", err);
                return;
            }
        };

        let mut summary = TickSummary::default();
        for user in &users {
            summary.record(self.issue(user, now).await);
        }

        tracing::info!(
            selected = users.len(),
            issued = summary.issued,
            notified = summary.notified,
            already_issued = summary.already_issued,
            failed = summary.failed,
            "Promo issuance tick finished"
        );
    }

    #[tracing::instrument(
        name = "Issuing a birthday promo",
        skip(self, user, now),
        fields(user_id = %user.id)
    )]
    async fn issue<Tz: TimeZone>(&self, user: &User, now: &DateTime<Tz>) -> IssueOutcome {
        let window = match PromoWindow::for_day(now) {
            Some(window) => window,
            None => {
                tracing::error!("Local midnight does not exist today, cannot build a promo window");
                return IssueOutcome::Failed;
            }
        };
        let code = generate_promo_code(&user.name, &window.start(), &user.id);

        let promo = NewPromoCode {
            user_id: user.id,
            code,
            window,
            amount: self.policy.amount,
        };
        let promo = match self.ledger.create(promo).await {
            Ok(promo) => promo,
            Err(err @ PersistenceError::AlreadyIssued { .. }) => {
                tracing::info!("Skipping user: {}", err);
                return IssueOutcome::AlreadyIssued;
            }
            Err(err) => {
                tracing::error!("Failed to store promo code: {:?}", err);
                return IssueOutcome::Failed;
            }
        };

        let request = NotificationRequest {
            channel: self.policy.channel,
            subject: format!("Gift for {}'s Birthday!", user.name),
            body: format!("Here's your promo code to use till EoD: {}", promo.code),
            target: self.policy.channel.recipient(user),
        };
        if let Err(err) = self.dispatcher.dispatch(&request).await {
            // The code stays in the ledger and can be resent by hand.
            tracing::error!(
                promo_code_id = %promo.id,
                "Failed to notify user about promo code: {:?}",
                err
            );
            return IssueOutcome::NotNotified;
        }

        IssueOutcome::Notified
    }
}

#[async_trait]
impl ScheduledJob for IssuanceOrchestrator {
    async fn run(&self) {
        self.run_tick().await
    }
}
