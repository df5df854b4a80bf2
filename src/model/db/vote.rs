use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core vote data: one member's ballot for one candidate in one voting
/// event. Votes are permanent; there is no update or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub event_id: Id,
    pub voter_id: Id,
    pub candidate_id: Id,
    /// Denormalized from the candidate at cast time, so the unique index on
    /// (event, voter, position) can enforce one ballot per office.
    pub position_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    /// A ballot cast right now.
    pub fn new(event_id: Id, voter_id: Id, candidate_id: Id, position_id: Id) -> Self {
        Self {
            event_id,
            voter_id,
            candidate_id,
            position_id,
            cast_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
