use mongodb::{bson::doc, Database};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            event::WinnerRecordDesc,
            results::{CandidateTallyDesc, EventResults},
        },
        auth::AuthToken,
        common::VotingEventState,
        db::{
            admin::Admin,
            nomination::Candidate,
            position::ClubPosition,
            vote::Vote,
            voting_event::{tally_event, VotingEvent},
            winner::WinnerRecord,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![results_admin, results_public]
}

/// Admins may inspect results in any state, including a live tally.
#[get("/events/<event_id>/results", rank = 1)]
async fn results_admin(
    _token: AuthToken<Admin>,
    event_id: Id,
    db: &State<Database>,
) -> Result<Json<EventResults>> {
    let event = lookup_event(db, event_id).await?;
    Ok(Json(results(db, event).await?))
}

/// Everyone else only sees the results of a finished event.
#[get("/events/<event_id>/results", rank = 2)]
async fn results_public(event_id: Id, db: &State<Database>) -> Result<Json<EventResults>> {
    let event = lookup_event(db, event_id).await?;
    if !matches!(
        event.state,
        VotingEventState::Closed | VotingEventState::Archived
    ) {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Voting event {event_id} has not finished; results are not public"),
        ));
    }
    Ok(Json(results(db, event).await?))
}

async fn lookup_event(db: &Database, event_id: Id) -> Result<VotingEvent> {
    Coll::<VotingEvent>::from_db(db)
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting event {event_id}")))
}

async fn results(db: &Database, event: VotingEvent) -> Result<EventResults> {
    let positions = Coll::<ClubPosition>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let votes = Coll::<Vote>::from_db(db);

    let tallies = tally_event(&event, &positions, &candidates, &votes, None).await?;
    let winners: Vec<WinnerRecord> = Coll::<WinnerRecord>::from_db(db)
        .find(doc! { "event_id": event.id }, None)
        .await?
        .try_collect()
        .await?;

    Ok(EventResults {
        event: event.into(),
        tallies: tallies
            .into_iter()
            .map(|(position_id, group)| {
                (
                    position_id.into(),
                    group.iter().map(Into::into).collect(),
                )
            })
            .collect(),
        winners: winners.iter().map(WinnerRecordDesc::from_db).collect(),
    })
}
