//! Review workflow: statuses, who may touch what, and the staged-to-live moves.

pub mod guard;
pub mod promotion;
pub mod status;

pub use guard::{Actor, Role};
pub use status::{ReviewStatus, StatusAction, StatusTransition};
