//! Overdue loan scanner
//!
//! Reads overdue loans from the ledger and notifies each borrower. A scan
//! never writes loans, so an interrupted run is simply repeated on the next
//! tick.

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{error::AppResult, models::loan::Loan};

use super::{
    email::{Notification, Notifier},
    loans::LoansService,
};

pub const OVERDUE_SUBJECT: &str = "overdue loan";

/// Outcome of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub overdue: usize,
    pub notified: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct OverdueScanner {
    ledger: LoansService,
    notifier: Arc<dyn Notifier>,
    grace_days: i64,
}

impl OverdueScanner {
    pub fn new(ledger: LoansService, notifier: Arc<dyn Notifier>, grace_days: i64) -> Self {
        Self {
            ledger,
            notifier,
            grace_days,
        }
    }

    pub fn grace_days(&self) -> i64 {
        self.grace_days
    }

    /// Overdue loans as of `today`
    pub async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        self.ledger.list_overdue(today, self.grace_days).await
    }

    /// Send one notification per overdue loan. A failed notification is
    /// logged and counted; the remaining loans are still processed.
    pub async fn scan_and_notify(&self, today: NaiveDate) -> AppResult<ScanReport> {
        let overdue = self.overdue(today).await?;
        let mut report = ScanReport {
            overdue: overdue.len(),
            ..Default::default()
        };

        for loan in &overdue {
            let recipients = [loan.email.clone()];
            match self.notifier.send(&compose(loan), &recipients).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(loan_id = loan.id, email = %loan.email, error = %e, "Overdue notification failed");
                }
            }
        }

        tracing::info!(
            overdue = report.overdue,
            notified = report.notified,
            failed = report.failed,
            "Overdue scan finished"
        );
        Ok(report)
    }

    /// Run `scan_and_notify` every `every`, starting immediately
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.scan_and_notify(Utc::now().date_naive()).await {
                    tracing::error!(error = %e, "Overdue scan failed");
                }
            }
        })
    }
}

fn compose(loan: &Loan) -> Notification {
    Notification {
        subject: OVERDUE_SUBJECT.to_string(),
        body: format!(
            "Hello {customer},\n\n\
             The book \"{title}\" by {author} (ISBN {isbn}), loaned on {date}, is overdue.\n\
             Please return it as soon as possible.\n",
            customer = loan.customer,
            title = loan.book.title,
            author = loan.book.author,
            isbn = loan.book.isbn,
            date = loan.loan_date,
        ),
    }
}
