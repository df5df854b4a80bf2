use std::collections::HashMap;

use mongodb::{bson::doc, error::Error as DbError, ClientSession};
use rocket::futures::TryStreamExt;

use crate::model::{
    common::CandidateStatus,
    db::{nomination::Candidate, position::ClubPosition, vote::Vote},
    mongodb::{Coll, Id},
};

use super::base::VotingEvent;

/// One candidate's standing in one position's race.
#[derive(Debug, Clone)]
pub struct CandidateTally {
    pub candidate: Candidate,
    pub votes: u64,
}

/// Per-position tallies for a voting event.
///
/// Every active position of the event's club gets an entry (possibly empty).
/// Each approved candidate contesting a position appears with their vote
/// count for this event; candidates with no votes are included at zero so
/// uncontested races are still visible. A candidate whose position is not in
/// the active set is skipped, not an error.
///
/// When a session is given, all reads go through it so the close procedure
/// sees a consistent snapshot; pass `None` for ad-hoc read-only views.
pub async fn tally_event(
    event: &VotingEvent,
    positions: &Coll<ClubPosition>,
    candidates: &Coll<Candidate>,
    votes: &Coll<Vote>,
    mut session: Option<&mut ClientSession>,
) -> Result<HashMap<Id, Vec<CandidateTally>>, DbError> {
    // Every active position of the club is represented, even with no candidates.
    let position_filter = doc! {
        "club_id": event.club_id,
        "active": true,
    };
    let position_list: Vec<ClubPosition> = match session.as_deref_mut() {
        Some(s) => {
            let mut cursor = positions
                .find_with_session(position_filter, None, s)
                .await?;
            cursor.stream(s).try_collect().await?
        }
        None => {
            positions
                .find(position_filter, None)
                .await?
                .try_collect()
                .await?
        }
    };
    let mut groups: HashMap<Id, Vec<CandidateTally>> = position_list
        .into_iter()
        .map(|position| (position.id, Vec::new()))
        .collect();

    // Approved candidates only; pending and rejected applications cannot
    // receive votes.
    let candidate_filter = doc! {
        "club_id": event.club_id,
        "status": CandidateStatus::Approved,
    };
    let candidate_list: Vec<Candidate> = match session.as_deref_mut() {
        Some(s) => {
            let mut cursor = candidates
                .find_with_session(candidate_filter, None, s)
                .await?;
            cursor.stream(s).try_collect().await?
        }
        None => {
            candidates
                .find(candidate_filter, None)
                .await?
                .try_collect()
                .await?
        }
    };

    for candidate in candidate_list {
        let position_id = candidate.position_id;
        let group = match groups.get_mut(&position_id) {
            Some(group) => group,
            None => {
                debug!(
                    "Skipping candidate {} contesting unknown or inactive position {}",
                    candidate.id, position_id
                );
                continue;
            }
        };

        let vote_filter = doc! {
            "event_id": event.id,
            "candidate_id": candidate.id,
        };
        let count = match session.as_deref_mut() {
            Some(s) => {
                votes
                    .count_documents_with_session(vote_filter, None, s)
                    .await?
            }
            None => votes.count_documents(vote_filter, None).await?,
        };

        group.push(CandidateTally {
            candidate,
            votes: count,
        });
    }

    Ok(groups)
}
