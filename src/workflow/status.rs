use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statig::prelude::*;

use crate::error::{RegistryError, Result};

/// Review status shared by organizations, services and their staged drafts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Pending,
        ReviewStatus::Approved,
        ReviewStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(RegistryError::InvalidStatus(value.to_string())),
        }
    }
}

/// Extra instruction carried by a pending organization status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    /// Flip the status column in place
    #[default]
    None,
    /// Promote the draft into the live tables
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub from: ReviewStatus,
    pub to: ReviewStatus,
}

impl StatusTransition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEvent {
    Review(ReviewStatus),
}

/// Review lifecycle. Every state accepts every target, there is no terminal state.
#[derive(Debug, Default)]
pub struct ReviewLifecycle {
    status: ReviewStatus,
    last_transition: Option<StatusTransition>,
}

#[state_machine(initial = "State::pending()")]
impl ReviewLifecycle {
    #[state]
    fn pending(&mut self, event: &ReviewEvent) -> Outcome<State> {
        self.review(ReviewStatus::Pending, event)
    }

    #[state]
    fn approved(&mut self, event: &ReviewEvent) -> Outcome<State> {
        self.review(ReviewStatus::Approved, event)
    }

    #[state]
    fn rejected(&mut self, event: &ReviewEvent) -> Outcome<State> {
        self.review(ReviewStatus::Rejected, event)
    }
}

impl ReviewLifecycle {
    fn review(&mut self, from: ReviewStatus, event: &ReviewEvent) -> Outcome<State> {
        let ReviewEvent::Review(to) = event;
        self.status = *to;
        self.last_transition = Some(StatusTransition { from, to: *to });
        tracing::debug!(from = %from, to = %to, "Review status transition");
        match to {
            ReviewStatus::Pending => Transition(State::pending()),
            ReviewStatus::Approved => Transition(State::approved()),
            ReviewStatus::Rejected => Transition(State::rejected()),
        }
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn last_transition(&self) -> Option<StatusTransition> {
        self.last_transition
    }
}

/// Validate a status change from the observed status to the requested one
///
/// The machine is hydrated in the observed state before the request is fed to it.
pub fn transition(observed: ReviewStatus, target: ReviewStatus) -> StatusTransition {
    let mut machine = ReviewLifecycle::default().state_machine();
    if observed != ReviewStatus::Pending {
        machine.handle(&ReviewEvent::Review(observed));
    }
    machine.handle(&ReviewEvent::Review(target));

    let lifecycle = machine.inner();
    lifecycle.last_transition().unwrap_or(StatusTransition {
        from: observed,
        to: lifecycle.status(),
    })
}
