use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the voting event lifecycle.
///
/// `Closing` is transient: it is taken via compare-and-swap at the start of
/// the close procedure so that concurrent close attempts for the same event
/// serialize against each other. `Closed` is terminal; an event is never
/// re-opened.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingEventState {
    /// Under construction, only visible to admins.
    Draft,
    /// Open for ballots within the event's time window.
    Active,
    /// Close-out in progress.
    Closing,
    /// Results decided. Terminal.
    Closed,
    /// Hidden by default, retained for the record.
    Archived,
}

impl From<VotingEventState> for Bson {
    fn from(state: VotingEventState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

/// States in the nomination period lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NominationStatus {
    /// Accepting candidate applications.
    Active,
    /// No longer accepting applications.
    Closed,
}

impl From<NominationStatus> for Bson {
    fn from(status: NominationStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// Review states of a candidate application. Only approved candidates
/// can receive votes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// States of a club membership. Payment verification (out of scope here)
/// flips `Pending` to `Active`; only active members may vote.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    Pending,
    Active,
}

impl From<MembershipStatus> for Bson {
    fn from(status: MembershipStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
