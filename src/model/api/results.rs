use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::db::{voting_event::CandidateTally, winner::WinnerRecord};

use super::{
    event::{VotingEventDesc, WinnerRecordDesc},
    id::ApiId,
};

/// One candidate's tally within a position's race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTallyDesc {
    pub candidate_id: ApiId,
    pub member_id: ApiId,
    pub votes: u64,
}

impl From<&CandidateTally> for CandidateTallyDesc {
    fn from(tally: &CandidateTally) -> Self {
        Self {
            candidate_id: tally.candidate.id.into(),
            member_id: tally.candidate.member_id.into(),
            votes: tally.votes,
        }
    }
}

/// The full results of a voting event: per-position tallies plus any winner
/// records already written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResults {
    pub event: VotingEventDesc,
    /// Tallies keyed by position ID. Every active position of the club is
    /// present, even with no candidates.
    pub tallies: HashMap<ApiId, Vec<CandidateTallyDesc>>,
    pub winners: Vec<WinnerRecordDesc>,
}

impl WinnerRecordDesc {
    pub fn from_db(record: &WinnerRecord) -> Self {
        Self {
            position_id: record.record.position_id.into(),
            candidate_id: record.record.candidate_id.into(),
            member_id: record.record.member_id.into(),
            votes: record.record.votes,
            tied: record.record.tied,
            decided_at: record.record.decided_at,
        }
    }
}
