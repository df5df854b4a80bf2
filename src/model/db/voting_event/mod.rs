//! Voting events and the close-out workflow that turns ballots into
//! winner records and position assignments.

mod base;
mod closer;
mod resolve;
mod tally;

pub use base::{NewVotingEvent, VotingEvent, VotingEventCore};
pub use closer::{
    close_due_events, close_event, resolve_tie, CloseReport, ElectionCloserFairing,
    ElectionClosers, SweepOutcome, TieBreaks, TieNotice,
};
pub use resolve::{resolve_position, Resolution};
pub use tally::{tally_event, CandidateTally};
