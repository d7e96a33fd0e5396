//! Property tests for the review status machine

use org_registry::workflow::status::transition;
use org_registry::{ErrorKind, ReviewStatus};
use proptest::prelude::*;

fn any_status() -> impl Strategy<Value = ReviewStatus> {
    prop_oneof![
        Just(ReviewStatus::Pending),
        Just(ReviewStatus::Approved),
        Just(ReviewStatus::Rejected),
    ]
}

proptest! {
    #[test]
    fn every_transition_lands_on_its_target(from in any_status(), to in any_status()) {
        let change = transition(from, to);
        prop_assert_eq!(change.from, from);
        prop_assert_eq!(change.to, to);
        prop_assert_eq!(change.is_noop(), from == to);
    }

    #[test]
    fn only_known_statuses_parse(value in "[a-zA-Z]{0,12}") {
        let parsed = value.parse::<ReviewStatus>();
        match value.as_str() {
            "pending" | "approved" | "rejected" => prop_assert!(parsed.is_ok()),
            _ => prop_assert_eq!(parsed.unwrap_err().kind(), ErrorKind::InvalidStatus),
        }
    }

    #[test]
    fn status_survives_json(status in any_status()) {
        let json = serde_json::to_string(&status).unwrap();
        let back: ReviewStatus = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, status);
        prop_assert_eq!(json, format!("\"{}\"", status.as_str()));
    }
}
