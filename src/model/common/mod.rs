//! Types shared between the DB and API layers.

mod notifiable;
mod states;

pub use notifiable::Notifiable;
pub use states::{CandidateStatus, MembershipStatus, NominationStatus, VotingEventState};
