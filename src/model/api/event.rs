use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::VotingEventState,
    db::{
        voting_event::{CloseReport, NewVotingEvent, SweepOutcome, TieNotice, VotingEvent},
        winner::NewWinnerRecord,
    },
    mongodb::Id,
};

use super::id::ApiId;

/// A voting event specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEventSpec {
    pub club_id: Id,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<VotingEventSpec> for NewVotingEvent {
    fn from(spec: VotingEventSpec) -> Self {
        NewVotingEvent::new(spec.club_id, spec.title, spec.start_time, spec.end_time)
    }
}

/// An API-friendly voting event description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEventDesc {
    pub id: ApiId,
    pub club_id: ApiId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: VotingEventState,
}

impl From<VotingEvent> for VotingEventDesc {
    fn from(event: VotingEvent) -> Self {
        Self {
            id: event.id.into(),
            club_id: event.event.club_id.into(),
            title: event.event.title,
            start_time: event.event.start_time,
            end_time: event.event.end_time,
            state: event.event.state,
        }
    }
}

/// The body of a close request: optional manual tie-break choices,
/// position ID to chosen candidate ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseRequest {
    #[serde(default)]
    pub tie_breaks: HashMap<Id, Id>,
}

/// The body of a post-hoc tie resolution: the chosen candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieResolution {
    pub candidate_id: Id,
}

/// A winner record, API-friendly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerRecordDesc {
    pub position_id: ApiId,
    pub candidate_id: ApiId,
    pub member_id: ApiId,
    pub votes: u64,
    pub tied: bool,
    pub decided_at: DateTime<Utc>,
}

impl From<&NewWinnerRecord> for WinnerRecordDesc {
    fn from(record: &NewWinnerRecord) -> Self {
        Self {
            position_id: record.position_id.into(),
            candidate_id: record.candidate_id.into(),
            member_id: record.member_id.into(),
            votes: record.votes,
            tied: record.tied,
            decided_at: record.decided_at,
        }
    }
}

/// A position left undecided by a tie, API-friendly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieNoticeDesc {
    pub position_id: ApiId,
    pub candidate_ids: Vec<ApiId>,
    pub votes: u64,
}

impl From<&TieNotice> for TieNoticeDesc {
    fn from(tie: &TieNotice) -> Self {
        Self {
            position_id: tie.position_id.into(),
            candidate_ids: tie.candidate_ids.iter().copied().map(Into::into).collect(),
            votes: tie.votes,
        }
    }
}

/// The response to a close request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseResponse {
    pub event_id: ApiId,
    pub already_closed: bool,
    pub winners: Vec<WinnerRecordDesc>,
    pub ties: Vec<TieNoticeDesc>,
}

impl From<CloseReport> for CloseResponse {
    fn from(report: CloseReport) -> Self {
        Self {
            event_id: report.event_id.into(),
            already_closed: report.already_closed,
            winners: report.decided.iter().map(Into::into).collect(),
            ties: report.ties.iter().map(Into::into).collect(),
        }
    }
}

/// One event's outcome within a sweep. A failed close reports its error
/// message without aborting the rest of the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcomeDesc {
    pub event_id: ApiId,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SweepOutcome> for SweepOutcomeDesc {
    fn from(outcome: &SweepOutcome) -> Self {
        match &outcome.result {
            Ok(_) => Self {
                event_id: outcome.event_id.into(),
                closed: true,
                error: None,
            },
            Err(e) => Self {
                event_id: outcome.event_id.into(),
                closed: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// The response to a nomination sweep: how many nominations were expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NominationSweepResponse {
    pub expired: u64,
}
