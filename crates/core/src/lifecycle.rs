//! Status lifecycles and transition checking.
//!
//! Each status enum declares its transition graph through [`Lifecycle`].
//! Whether an off-graph transition is refused or merely reported depends on
//! the configured [`TransitionPolicy`]. Remaining in the same state is always
//! allowed.

use crate::types::{
    ListingStatus, PayoutStatus, ReturnStatus, ShipmentStatus, TaskStatus,
};
use crate::validation::FieldError;

/// A finite status enumeration with a transition graph.
///
/// `Default` is the status a new record starts in. Terminal states have no
/// successors.
pub trait Lifecycle: Copy + Eq + Default + std::fmt::Display + 'static {
    /// Record type name used in messages, e.g. `"task"`.
    const ENTITY: &'static str;

    /// States reachable in one step from `self` (excluding `self`).
    fn successors(self) -> &'static [Self];

    /// `next` is `self` or a direct successor.
    fn can_transition_to(self, next: Self) -> bool {
        self == next || self.successors().contains(&next)
    }
}

/// How off-graph transitions are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Accept and report.
    #[default]
    Advisory,
    /// Refuse.
    Strict,
}

impl TransitionPolicy {
    /// Policy for a boolean "enforce transitions" flag.
    #[must_use]
    pub const fn from_enforced(enforced: bool) -> Self {
        if enforced { Self::Strict } else { Self::Advisory }
    }

    /// `true` for [`TransitionPolicy::Strict`].
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status did not change.
    Unchanged,
    /// An edge of the graph.
    Allowed,
    /// Off-graph, accepted under the advisory policy.
    Tolerated,
}

impl Transition {
    /// The status actually changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Check a status change against the entity's graph and the policy.
///
/// # Errors
///
/// Under [`TransitionPolicy::Strict`], returns a [`FieldError`] on `field`
/// for an off-graph transition.
pub fn check_transition<S: Lifecycle>(
    policy: TransitionPolicy,
    field: &str,
    from: S,
    to: S,
) -> Result<Transition, FieldError> {
    if from == to {
        return Ok(Transition::Unchanged);
    }
    if from.can_transition_to(to) {
        return Ok(Transition::Allowed);
    }
    if policy.is_strict() {
        return Err(FieldError::new(
            field,
            format!("a {} cannot move from {from} to {to}", S::ENTITY),
        ));
    }
    Ok(Transition::Tolerated)
}

impl Lifecycle for ListingStatus {
    const ENTITY: &'static str = "inventory item";

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Listed, Self::Archived],
            Self::Listed => &[Self::Draft, Self::Sold, Self::Archived],
            Self::Sold => &[Self::Returned, Self::Archived],
            Self::Returned => &[Self::Listed, Self::Archived],
            Self::Archived => &[Self::Draft, Self::Listed],
        }
    }
}

impl Lifecycle for PayoutStatus {
    const ENTITY: &'static str = "payout";

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::OnHold],
            Self::Processing => &[Self::Paid, Self::OnHold],
            Self::OnHold => &[Self::Pending, Self::Processing],
            Self::Paid => &[],
        }
    }
}

impl Lifecycle for ShipmentStatus {
    const ENTITY: &'static str = "shipment";

    fn successors(self) -> &'static [Self] {
        match self {
            Self::PendingLabel => &[Self::LabelCreated, Self::Problem],
            Self::LabelCreated => &[Self::Shipped, Self::Problem],
            Self::Shipped => &[Self::InTransit, Self::Delivered, Self::Problem],
            Self::InTransit => &[Self::Delivered, Self::Problem],
            Self::Problem => &[
                Self::LabelCreated,
                Self::Shipped,
                Self::InTransit,
                Self::Delivered,
            ],
            Self::Delivered => &[],
        }
    }
}

impl Lifecycle for ReturnStatus {
    const ENTITY: &'static str = "return";

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Opened => &[Self::InProgress, Self::Resolved, Self::Rejected],
            Self::InProgress => &[Self::Resolved, Self::Rejected],
            Self::Resolved | Self::Rejected => &[],
        }
    }
}

impl Lifecycle for TaskStatus {
    const ENTITY: &'static str = "task";

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Todo => &[Self::InProgress, Self::Done, Self::Cancelled],
            Self::InProgress => &[Self::Todo, Self::Done, Self::Cancelled],
            Self::Cancelled => &[Self::Todo],
            Self::Done => &[],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_graph_is_closed<S: Lifecycle + std::fmt::Debug>(all: &[S]) {
        for state in all {
            assert!(
                !state.successors().contains(state),
                "{state:?} lists itself as a successor"
            );
            for next in state.successors() {
                assert!(all.contains(next));
            }
        }
        assert!(all.contains(&S::default()));
    }

    #[test]
    fn test_graphs_are_well_formed() {
        assert_graph_is_closed(ListingStatus::ALL);
        assert_graph_is_closed(PayoutStatus::ALL);
        assert_graph_is_closed(ShipmentStatus::ALL);
        assert_graph_is_closed(ReturnStatus::ALL);
        assert_graph_is_closed(TaskStatus::ALL);
    }

    #[test]
    fn test_new_records_start_in_initial_states() {
        assert_eq!(ListingStatus::default(), ListingStatus::Draft);
        assert_eq!(PayoutStatus::default(), PayoutStatus::Pending);
        assert_eq!(ShipmentStatus::default(), ShipmentStatus::PendingLabel);
        assert_eq!(ReturnStatus::default(), ReturnStatus::Opened);
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        assert!(TaskStatus::Done.successors().is_empty());
        assert!(ShipmentStatus::Delivered.successors().is_empty());
        assert!(ReturnStatus::Resolved.successors().is_empty());
        assert!(ReturnStatus::Rejected.successors().is_empty());
        assert!(PayoutStatus::Paid.successors().is_empty());
        assert!(!TaskStatus::Cancelled.successors().is_empty());
    }

    #[test]
    fn test_same_state_is_unchanged_under_strict() {
        let outcome =
            check_transition(TransitionPolicy::Strict, "status", TaskStatus::Done, TaskStatus::Done)
                .unwrap();
        assert_eq!(outcome, Transition::Unchanged);
        assert!(!outcome.changed());
    }

    #[test]
    fn test_strict_rejects_done_to_todo() {
        let err = check_transition(
            TransitionPolicy::Strict,
            "status",
            TaskStatus::Done,
            TaskStatus::Todo,
        )
        .unwrap_err();
        assert_eq!(err.field, "status");
        assert_eq!(err.message, "a task cannot move from Done to Todo");
    }

    #[test]
    fn test_advisory_tolerates_done_to_todo() {
        let outcome = check_transition(
            TransitionPolicy::Advisory,
            "status",
            TaskStatus::Done,
            TaskStatus::Todo,
        )
        .unwrap();
        assert_eq!(outcome, Transition::Tolerated);
        assert!(outcome.changed());
    }

    #[test]
    fn test_listed_to_sold_is_allowed() {
        let outcome = check_transition(
            TransitionPolicy::Strict,
            "listing_status",
            ListingStatus::Listed,
            ListingStatus::Sold,
        )
        .unwrap();
        assert_eq!(outcome, Transition::Allowed);
    }

    #[test]
    fn test_any_open_shipment_can_report_a_problem() {
        for status in ShipmentStatus::ALL {
            if *status != ShipmentStatus::Delivered && *status != ShipmentStatus::Problem {
                assert!(status.can_transition_to(ShipmentStatus::Problem));
            }
        }
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(TransitionPolicy::from_enforced(true), TransitionPolicy::Strict);
        assert_eq!(TransitionPolicy::from_enforced(false), TransitionPolicy::Advisory);
        assert_eq!(TransitionPolicy::default(), TransitionPolicy::Advisory);
    }
}
