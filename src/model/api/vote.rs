use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{db::vote::Vote, mongodb::Id};

use super::id::ApiId;

/// A ballot, as submitted by a member: the candidate they back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSpec {
    pub candidate_id: Id,
}

/// A recorded vote, API-friendly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteDesc {
    pub id: ApiId,
    pub event_id: ApiId,
    pub candidate_id: ApiId,
    pub position_id: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteDesc {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            event_id: vote.vote.event_id.into(),
            candidate_id: vote.vote.candidate_id.into(),
            position_id: vote.vote.position_id.into(),
            cast_at: vote.vote.cast_at,
        }
    }
}
