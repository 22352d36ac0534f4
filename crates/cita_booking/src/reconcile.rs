// --- File: crates/cita_booking/src/reconcile.rs ---
//! Out-of-band retry of calendar syncs that did not complete.
//!
//! Input is every confirmed booking without a provider event, plus every
//! cancelled booking whose event may still be in the calendar. A booking that
//! is still `pending`, or was just cancelled, is only picked up after a grace
//! period, so the sweep does not race the coordinator's own first attempt.
//! Failed bookings wait out a bounded exponential backoff between attempts and
//! are given up on after `max_attempts`.

use crate::error::BookingError;
use crate::sync::EventSync;
use chrono::{DateTime, Utc};
use cita_common::models::{Booking, SyncState};
use cita_config::SyncConfig;
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub pending_grace: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_backoff: Duration::from_secs(config.base_backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            pending_grace: Duration::from_secs(config.pending_grace_secs),
        }
    }

    /// Wait after the `failures`-th failed attempt: `min(base * 2^(n-1), max)`.
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn eligibility(&self, booking: &Booking, now: DateTime<Utc>) -> Eligibility {
        if booking.sync_attempts >= self.max_attempts {
            return Eligibility::Exhausted;
        }
        let elapsed_since = |instant: DateTime<Utc>| (now - instant).to_std().unwrap_or_default();

        match booking.sync_state {
            SyncState::Synced | SyncState::Released => Eligibility::Waiting,
            SyncState::Pending => {
                if elapsed_since(booking.created_at) >= self.pending_grace {
                    Eligibility::Due
                } else {
                    Eligibility::Waiting
                }
            }
            // Cancelled, first release attempt not recorded yet.
            SyncState::ReleasePending if booking.sync_attempts == 0 => {
                let cancelled_at = booking.last_sync_attempt_at.unwrap_or(booking.created_at);
                if elapsed_since(cancelled_at) >= self.pending_grace {
                    Eligibility::Due
                } else {
                    Eligibility::Waiting
                }
            }
            SyncState::SyncFailed | SyncState::ReleasePending => {
                let last = booking.last_sync_attempt_at.unwrap_or(booking.created_at);
                if elapsed_since(last) >= self.backoff(booking.sync_attempts) {
                    Eligibility::Due
                } else {
                    Eligibility::Waiting
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Due,
    Waiting,
    Exhausted,
}

/// What one pass of the sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweepReport {
    /// Unsynced confirmed bookings and unreleased cancelled ones found.
    pub examined: usize,
    pub synced: usize,
    /// Cancelled bookings whose calendar event is now gone.
    pub released: usize,
    pub failed: usize,
    /// Still backing off, inside the pending grace period, or out of attempts.
    pub skipped: usize,
}

pub struct ReconciliationSweep {
    sync: EventSync,
    policy: RetryPolicy,
}

impl ReconciliationSweep {
    pub fn new(sync: EventSync, policy: RetryPolicy) -> Self {
        Self { sync, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One pass over the unsynced bookings as of `now`.
    ///
    /// Idempotent: synced and released bookings are never listed, so a pass
    /// right after a successful one does nothing.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport, BookingError> {
        let unsynced = self.sync.store().list_unsynced().await?;
        let unreleased = self.sync.store().list_pending_release().await?;
        let mut report = SweepReport {
            examined: unsynced.len() + unreleased.len(),
            ..Default::default()
        };

        for booking in unsynced.into_iter().chain(unreleased) {
            match self.policy.eligibility(&booking, now) {
                Eligibility::Due if booking.is_confirmed() => {
                    debug!("Retrying calendar sync of booking {}", booking.id);
                    let updated = self.sync.reconcile(booking).await;
                    if updated.sync_state == SyncState::Synced {
                        report.synced += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Eligibility::Due => {
                    debug!("Retrying calendar release of booking {}", booking.id);
                    let updated = self.sync.release(booking).await;
                    if updated.sync_state == SyncState::Released {
                        report.released += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Eligibility::Waiting => report.skipped += 1,
                Eligibility::Exhausted => {
                    warn!(
                        "Booking {} gave up on calendar sync after {} attempts",
                        booking.id, booking.sync_attempts
                    );
                    report.skipped += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                "Reconciliation sweep: examined {}, synced {}, released {}, failed {}, skipped {}",
                report.examined, report.synced, report.released, report.failed, report.skipped
            );
        }
        Ok(report)
    }

    /// Runs a pass every `interval` until the task is dropped.
    pub async fn run_periodically(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                error!("Reconciliation sweep failed: {}", e);
            }
        }
    }
}
