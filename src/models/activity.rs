// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Imported activity model and its payout state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;
use crate::models::ProviderKind;

/// Reward-disbursement progress of an activity.
///
/// Moves forward only: `NotStarted -> Queued -> Processing -> Done | Failed`.
/// `Failed -> Queued` is allowed through [`Activity::retry_payout`], and any
/// state may go back to `NotStarted` through [`Activity::reset_payout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutState {
    #[default]
    NotStarted,
    Queued,
    Processing,
    Done,
    Failed,
}

impl PayoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutState::NotStarted => "not_started",
            PayoutState::Queued => "queued",
            PayoutState::Processing => "processing",
            PayoutState::Done => "done",
            PayoutState::Failed => "failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PayoutState::NotStarted => 0,
            PayoutState::Queued => 1,
            PayoutState::Processing => 2,
            PayoutState::Done | PayoutState::Failed => 3,
        }
    }

    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_advance_to(&self, next: PayoutState) -> bool {
        next.rank() == self.rank() + 1
    }
}

impl fmt::Display for PayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub provider: ProviderKind,
    /// Provider activity ID
    pub remote_id: String,
    /// Owning account (wallet address)
    pub account_address: String,
    /// Activity name/title
    pub name: String,
    /// Sport type (Ride, Run, Hike, etc.)
    pub sport_type: String,
    /// Start date/time (ISO 8601)
    pub start_date: String,
    /// Distance in meters
    pub distance_meters: f64,
    #[serde(default)]
    pub payout_state: PayoutState,
    /// Position in the payout queue, assigned when queued
    #[serde(default)]
    pub queue_position: Option<u64>,
    /// Last payout failure, if any
    #[serde(default)]
    pub payout_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Activity {
    pub fn doc_id(provider: ProviderKind, remote_id: &str) -> String {
        format!("{}_{}", provider, remote_id)
    }

    pub fn id(&self) -> String {
        Self::doc_id(self.provider, &self.remote_id)
    }

    /// Move the payout state forward by exactly one step.
    pub fn advance_payout(&mut self, next: PayoutState) -> Result<(), AppError> {
        if !self.payout_state.can_advance_to(next) {
            return Err(AppError::InvalidArgument(format!(
                "Illegal payout transition for activity {}: {} -> {}",
                self.id(),
                self.payout_state,
                next
            )));
        }
        self.payout_state = next;
        Ok(())
    }

    /// Put the activity on the queue at `position`.
    pub fn enqueue(&mut self, position: u64) -> Result<(), AppError> {
        self.advance_payout(PayoutState::Queued)?;
        self.queue_position = Some(position);
        Ok(())
    }

    /// Mark a failed payout as failed with the error recorded.
    pub fn fail_payout(&mut self, error: &str) -> Result<(), AppError> {
        self.advance_payout(PayoutState::Failed)?;
        self.payout_error = Some(error.to_string());
        Ok(())
    }

    /// Re-queue a failed payout at `position`.
    pub fn retry_payout(&mut self, position: u64) -> Result<(), AppError> {
        if self.payout_state != PayoutState::Failed {
            return Err(AppError::InvalidArgument(format!(
                "Only failed payouts can be retried (activity {} is {})",
                self.id(),
                self.payout_state
            )));
        }
        self.payout_state = PayoutState::Queued;
        self.queue_position = Some(position);
        self.payout_error = None;
        Ok(())
    }

    /// Return the activity to `NotStarted`, clearing queue bookkeeping.
    pub fn reset_payout(&mut self) {
        self.payout_state = PayoutState::NotStarted;
        self.queue_position = None;
        self.payout_error = None;
    }
}
