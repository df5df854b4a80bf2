use mongodb::{bson::doc, Client, Database};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::event::{
            CloseRequest, CloseResponse, NominationSweepResponse, SweepOutcomeDesc,
            TieResolution, VotingEventDesc, VotingEventSpec, WinnerRecordDesc,
        },
        auth::AuthToken,
        common::VotingEventState,
        db::{
            admin::Admin,
            nomination::Nomination,
            voting_event::{close_due_events, resolve_tie, NewVotingEvent, VotingEvent},
        },
        mongodb::{Coll, Id},
    },
    ElectionClosers,
};

pub fn routes() -> Vec<Route> {
    routes![
        create_event,
        open_event,
        close_event,
        resolve_position_tie,
        sweep_events,
        sweep_nominations,
    ]
}

#[post("/events", data = "<spec>", format = "json")]
async fn create_event(
    _token: AuthToken<Admin>,
    spec: Json<VotingEventSpec>,
    new_events: Coll<NewVotingEvent>,
    events: Coll<VotingEvent>,
) -> Result<Json<VotingEventDesc>> {
    if spec.end_time <= spec.start_time {
        return Err(Error::Status(
            Status::BadRequest,
            "Voting event must end after it starts".to_string(),
        ));
    }

    let event: NewVotingEvent = spec.0.into();
    let new_id: Id = new_events
        .insert_one(&event, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Safe because the ID comes directly from the database.
        .into();

    let event = events
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting event {new_id}")))?;
    Ok(Json(event.into()))
}

#[post("/events/<event_id>/open")]
async fn open_event(
    _token: AuthToken<Admin>,
    event_id: Id,
    events: Coll<VotingEvent>,
    db_client: &State<Client>,
    db: &State<Database>,
    closers: &State<ElectionClosers>,
) -> Result<()> {
    let filter = doc! {
        "_id": event_id,
        "state": VotingEventState::Draft,
    };
    let update = doc! {
        "$set": {
            "state": VotingEventState::Active,
        }
    };
    let result = events.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Voting event {event_id} doesn't exist or isn't a draft; cannot open"),
        ));
    }

    // Schedule the close task for the event's end time.
    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .unwrap(); // Presence already checked.
    closers
        .schedule_event(db_client.inner().clone(), db.inner().clone(), &event)
        .await;

    Ok(())
}

#[post("/events/<event_id>/close", data = "<request>", format = "json")]
async fn close_event(
    _token: AuthToken<Admin>,
    event_id: Id,
    request: Json<CloseRequest>,
    db_client: &State<Client>,
    db: &State<Database>,
    closers: &State<ElectionClosers>,
) -> Result<Json<CloseResponse>> {
    let report = closers
        .close_now(db_client, db, event_id, &request.tie_breaks)
        .await?;
    Ok(Json(report.into()))
}

#[post(
    "/events/<event_id>/positions/<position_id>/resolve",
    data = "<resolution>",
    format = "json"
)]
async fn resolve_position_tie(
    _token: AuthToken<Admin>,
    event_id: Id,
    position_id: Id,
    resolution: Json<TieResolution>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<WinnerRecordDesc>> {
    let record = resolve_tie(db_client, db, event_id, position_id, resolution.candidate_id).await?;
    Ok(Json((&record).into()))
}

#[post("/events/sweep")]
async fn sweep_events(
    _token: AuthToken<Admin>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<Vec<SweepOutcomeDesc>>> {
    let outcomes = close_due_events(db_client, db).await?;
    Ok(Json(outcomes.iter().map(Into::into).collect()))
}

#[post("/nominations/sweep")]
async fn sweep_nominations(
    _token: AuthToken<Admin>,
    nominations: Coll<Nomination>,
) -> Result<Json<NominationSweepResponse>> {
    let expired = Nomination::close_expired(&nominations).await?;
    Ok(Json(NominationSweepResponse { expired }))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mongodb::bson::DateTime as BsonDateTime;
    use rocket::{
        futures::TryStreamExt,
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{json, Value},
    };

    use crate::model::{
        common::{CandidateStatus, MembershipStatus, NominationStatus},
        db::{
            club::{Membership, NewClub},
            member::NewMember,
            nomination::{NewCandidate, NewNomination},
            notification::Notification,
            position::NewClubPosition,
            vote::NewVote,
            winner::{NewWinnerRecord, WinnerRecord},
        },
    };

    use super::*;

    /// A club election ready to close: one active position per entry in
    /// `candidate_votes`, each with candidates holding the given vote counts.
    struct Fixture {
        club_id: Id,
        event_id: Id,
        /// Position IDs in the order given.
        positions: Vec<Id>,
        /// Candidate IDs grouped per position, in the order given.
        candidates: Vec<Vec<Id>>,
        /// The members standing as candidates, parallel to `candidates`.
        members: Vec<Vec<Id>>,
    }

    async fn fixture(db: &Database, candidate_votes: &[&[u64]]) -> Fixture {
        // Usernames carry a fresh ID so two fixtures can share a database.
        let run = Id::new();
        let club_id = insert(
            &Coll::<NewClub>::from_db(db),
            &NewClub {
                name: "Rowing Club".into(),
            },
        )
        .await;
        let nomination_id = insert(
            &Coll::<NewNomination>::from_db(db),
            &NewNomination {
                club_id,
                title: "Committee nominations".into(),
                start_time: Utc::now() - Duration::days(7),
                end_time: Utc::now() - Duration::days(1),
                status: NominationStatus::Closed,
            },
        )
        .await;
        let event_id = insert(&Coll::<NewVotingEvent>::from_db(db), &{
            let mut event = NewVotingEvent::new(
                club_id,
                "Committee election".into(),
                Utc::now() - Duration::hours(2),
                Utc::now() - Duration::hours(1),
            );
            event.state = VotingEventState::Active;
            event
        })
        .await;

        let mut positions = Vec::new();
        let mut candidates = Vec::new();
        let mut members = Vec::new();
        for (i, votes_per_candidate) in candidate_votes.iter().enumerate() {
            let position_id = insert(
                &Coll::<NewClubPosition>::from_db(db),
                &NewClubPosition {
                    club_id,
                    name: format!("Officer {i}"),
                    active: true,
                },
            )
            .await;
            let mut position_candidates = Vec::new();
            let mut position_members = Vec::new();
            for (j, votes) in votes_per_candidate.iter().enumerate() {
                let member_id = insert(
                    &Coll::<NewMember>::from_db(db),
                    &NewMember {
                        username: format!("runner-{run}-{i}-{j}"),
                        password_hash: "not-a-real-hash".into(),
                        display_name: format!("Runner {i}-{j}"),
                    },
                )
                .await;
                let candidate_id = insert(
                    &Coll::<NewCandidate>::from_db(db),
                    &NewCandidate {
                        nomination_id,
                        club_id,
                        member_id,
                        position_id,
                        status: CandidateStatus::Approved,
                    },
                )
                .await;

                // One distinct voter per ballot.
                for v in 0..*votes {
                    let voter_id = insert(
                        &Coll::<NewMember>::from_db(db),
                        &NewMember {
                            username: format!("voter-{run}-{i}-{j}-{v}"),
                            password_hash: "not-a-real-hash".into(),
                            display_name: format!("Voter {i}-{j}-{v}"),
                        },
                    )
                    .await;
                    Coll::<NewVote>::from_db(db)
                        .insert_one(
                            &NewVote::new(event_id, voter_id, candidate_id, position_id),
                            None,
                        )
                        .await
                        .unwrap();
                }

                position_candidates.push(candidate_id);
                position_members.push(member_id);
            }
            positions.push(position_id);
            candidates.push(position_candidates);
            members.push(position_members);
        }

        Fixture {
            club_id,
            event_id,
            positions,
            candidates,
            members,
        }
    }

    async fn insert<T>(coll: &Coll<T>, value: &T) -> Id
    where
        T: serde::Serialize,
    {
        coll.insert_one(value, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn close(client: &Client, event_id: Id, body: Value) -> CloseResponse {
        let response = client
            .post(uri!(close_event(event_id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    async fn event_state(db: &Database, event_id: Id) -> VotingEventState {
        Coll::<VotingEvent>::from_db(db)
            .find_one(event_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap()
            .event
            .state
    }

    #[backend_test(admin)]
    async fn clean_win_closes_and_assigns(client: Client, db: Database) {
        // One position, a 3-to-1 race.
        let fix = fixture(&db, &[&[3, 1]]).await;

        let response = close(&client, fix.event_id, json!({})).await;
        assert!(!response.already_closed);
        assert_eq!(1, response.winners.len());
        assert!(response.ties.is_empty());
        assert_eq!(3, response.winners[0].votes);
        assert!(!response.winners[0].tied);

        assert_eq!(VotingEventState::Closed, event_state(&db, fix.event_id).await);

        // Exactly one winner record, for the leading candidate.
        let record = Coll::<WinnerRecord>::from_db(&db)
            .find_one(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fix.candidates[0][0], record.record.candidate_id);

        // The winner now holds the position.
        let membership = Coll::<Membership>::from_db(&db)
            .find_one(
                doc! { "club_id": fix.club_id, "member_id": fix.members[0][0] },
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some(fix.positions[0]), membership.membership.position_id);
        assert_eq!(MembershipStatus::Active, membership.membership.status);
    }

    #[backend_test(admin)]
    async fn reclose_is_a_noop(client: Client, db: Database) {
        let fix = fixture(&db, &[&[2, 1]]).await;

        let first = close(&client, fix.event_id, json!({})).await;
        assert_eq!(1, first.winners.len());

        // Closing again reports the no-op and writes nothing new.
        let second = close(&client, fix.event_id, json!({})).await;
        assert!(second.already_closed);
        assert!(second.winners.is_empty());

        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(1, records);
    }

    #[backend_test(admin)]
    async fn tie_is_reported_not_decided(client: Client, db: Database) {
        // Two candidates at 2 votes each.
        let fix = fixture(&db, &[&[2, 2]]).await;

        let response = close(&client, fix.event_id, json!({})).await;
        assert!(response.winners.is_empty());
        assert_eq!(1, response.ties.len());
        assert_eq!(2, response.ties[0].votes);
        assert_eq!(2, response.ties[0].candidate_ids.len());

        // The event still closes; the position stays undecided.
        assert_eq!(VotingEventState::Closed, event_state(&db, fix.event_id).await);
        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(0, records);
    }

    #[backend_test(admin)]
    async fn tie_break_at_close_decides(client: Client, db: Database) {
        let fix = fixture(&db, &[&[2, 2]]).await;

        let chosen = fix.candidates[0][1];
        let body = json!({
            "tie_breaks": { (fix.positions[0].to_string()): chosen.to_string() },
        });
        let response = close(&client, fix.event_id, body).await;
        assert_eq!(1, response.winners.len());
        assert!(response.winners[0].tied);
        assert!(response.ties.is_empty());

        let record = Coll::<WinnerRecord>::from_db(&db)
            .find_one(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chosen, record.record.candidate_id);
        assert!(record.record.tied);
    }

    #[backend_test(admin)]
    async fn tie_break_outside_tied_set_rejected(client: Client, db: Database) {
        // Position 0 is tied; the choice names position 1's clear winner.
        let fix = fixture(&db, &[&[2, 2], &[3]]).await;

        let body = json!({
            "tie_breaks": { (fix.positions[0].to_string()): fix.candidates[1][0].to_string() },
        });
        let response = client
            .post(uri!(close_event(fix.event_id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Nothing committed: the event is still open and no records exist.
        assert_eq!(VotingEventState::Active, event_state(&db, fix.event_id).await);
        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(0, records);
    }

    #[backend_test(admin)]
    async fn tie_break_for_untied_position_rejected(client: Client, db: Database) {
        // A clear 3-to-1 winner; the tie-break names that same position.
        let fix = fixture(&db, &[&[3, 1]]).await;

        let body = json!({
            "tie_breaks": { (fix.positions[0].to_string()): fix.candidates[0][0].to_string() },
        });
        let response = client
            .post(uri!(close_event(fix.event_id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // The mistyped tie-break must not be silently dropped; nothing
        // commits and the event stays open.
        assert_eq!(VotingEventState::Active, event_state(&db, fix.event_id).await);
        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(0, records);
    }

    #[backend_test(admin)]
    async fn position_without_candidates_closes_empty(client: Client, db: Database) {
        let no_candidates: &[u64] = &[];
        let fix = fixture(&db, &[no_candidates]).await;

        let response = close(&client, fix.event_id, json!({})).await;
        assert!(!response.already_closed);
        assert!(response.winners.is_empty());
        assert!(response.ties.is_empty());

        assert_eq!(VotingEventState::Closed, event_state(&db, fix.event_id).await);
        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(0, records);
    }

    #[backend_test(admin)]
    async fn unvoted_position_closes_vacant(client: Client, db: Database) {
        // Two candidates, nobody voted.
        let fix = fixture(&db, &[&[0, 0]]).await;

        let response = close(&client, fix.event_id, json!({})).await;
        assert!(response.winners.is_empty());
        assert!(response.ties.is_empty());

        // The position stays vacant but the event still closes.
        assert_eq!(VotingEventState::Closed, event_state(&db, fix.event_id).await);
        let records = Coll::<WinnerRecord>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(0, records);
    }

    #[backend_test(admin)]
    async fn post_hoc_tie_resolution(client: Client, db: Database) {
        let fix = fixture(&db, &[&[2, 2]]).await;
        close(&client, fix.event_id, json!({})).await;

        let chosen = fix.candidates[0][0];
        let response = client
            .post(uri!(resolve_position_tie(fix.event_id, fix.positions[0])))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": chosen.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let record: WinnerRecordDesc = response.into_json().await.unwrap();
        assert!(record.tied);
        assert_eq!(2, record.votes);

        // The winner now holds the position.
        let membership = Coll::<Membership>::from_db(&db)
            .find_one(
                doc! { "club_id": fix.club_id, "member_id": fix.members[0][0] },
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some(fix.positions[0]), membership.membership.position_id);

        // Resolving the same position again conflicts.
        let response = client
            .post(uri!(resolve_position_tie(fix.event_id, fix.positions[0])))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidates[0][1].to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test(admin)]
    async fn resolve_requires_a_real_tie(client: Client, db: Database) {
        let fix = fixture(&db, &[&[3, 1]]).await;
        close(&client, fix.event_id, json!({})).await;

        let response = client
            .post(uri!(resolve_position_tie(fix.event_id, fix.positions[0])))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidates[0][1].to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn sweep_closes_all_due_events(client: Client, db: Database) {
        let first = fixture(&db, &[&[2, 1]]).await;
        let second = fixture(&db, &[&[1]]).await;

        let response = client.post(uri!(sweep_events)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let outcomes: Vec<SweepOutcomeDesc> = response.into_json().await.unwrap();
        assert_eq!(2, outcomes.len());
        assert!(outcomes.iter().all(|outcome| outcome.closed));

        assert_eq!(VotingEventState::Closed, event_state(&db, first.event_id).await);
        assert_eq!(VotingEventState::Closed, event_state(&db, second.event_id).await);
    }

    #[backend_test(admin)]
    async fn sweep_isolates_a_failing_close(client: Client, db: Database) {
        let healthy = fixture(&db, &[&[2, 1]]).await;
        let wedged = fixture(&db, &[&[2, 1]]).await;

        // A pre-existing winner record makes the second event's close
        // conflict on the (event, position) unique index.
        Coll::<NewWinnerRecord>::from_db(&db)
            .insert_one(
                &NewWinnerRecord {
                    event_id: wedged.event_id,
                    position_id: wedged.positions[0],
                    candidate_id: wedged.candidates[0][0],
                    nomination_id: Id::new(),
                    member_id: wedged.members[0][0],
                    votes: 1,
                    tied: false,
                    decided_at: Utc::now(),
                },
                None,
            )
            .await
            .unwrap();

        let response = client.post(uri!(sweep_events)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let outcomes: Vec<SweepOutcomeDesc> = response.into_json().await.unwrap();
        assert_eq!(2, outcomes.len());

        let outcome_for = |id: Id| {
            outcomes
                .iter()
                .find(|outcome| outcome.event_id.to_string() == id.to_string())
                .unwrap()
        };
        assert!(outcome_for(healthy.event_id).closed);
        let failed = outcome_for(wedged.event_id);
        assert!(!failed.closed);
        assert!(failed.error.is_some());

        // One failure never blocks the rest of the sweep, and the failed
        // close releases its guard.
        assert_eq!(VotingEventState::Closed, event_state(&db, healthy.event_id).await);
        assert_eq!(VotingEventState::Active, event_state(&db, wedged.event_id).await);
    }

    #[backend_test(admin)]
    async fn startup_recovers_events_stuck_mid_close(client: Client, db: Database) {
        let fix = fixture(&db, &[&[1]]).await;

        // Simulate a crash mid-close: the event is wedged in `Closing`.
        // A future end time keeps the recovered close task from firing
        // during the test.
        Coll::<VotingEvent>::from_db(&db)
            .update_one(
                fix.event_id.as_doc(),
                doc! {
                    "$set": {
                        "state": VotingEventState::Closing,
                        "end_time": BsonDateTime::from_chrono(Utc::now() + Duration::days(1)),
                    },
                },
                None,
            )
            .await
            .unwrap();

        let db_client = client.rocket().state::<mongodb::Client>().unwrap();
        let closers = ElectionClosers::new();
        closers.schedule_all_active(db_client, &db).await.unwrap();

        assert_eq!(VotingEventState::Active, event_state(&db, fix.event_id).await);
        assert!(closers.has_task(fix.event_id).await);
    }

    #[backend_test(admin)]
    async fn tie_notification_names_tied_candidates(client: Client, db: Database) {
        let fix = fixture(&db, &[&[2, 2]]).await;
        close(&client, fix.event_id, json!({})).await;

        let notes: Vec<Notification> = Coll::<Notification>::from_db(&db)
            .find(doc! { "recipient.kind": "Admin" }, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(1, notes.len());
        assert!(notes[0].message.contains("Runner 0-0"));
        assert!(notes[0].message.contains("Runner 0-1"));
    }

    #[backend_test(admin)]
    async fn create_and_open_event(client: Client, db: Database) {
        let club_id = insert(
            &Coll::<NewClub>::from_db(&db),
            &NewClub {
                name: "Debate Society".into(),
            },
        )
        .await;

        let spec = json!({
            "club_id": club_id.to_string(),
            "title": "AGM election",
            "start_time": Utc::now().to_rfc3339(),
            "end_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
        });
        let response = client
            .post(uri!(create_event))
            .header(ContentType::JSON)
            .body(spec.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let desc: VotingEventDesc = response.into_json().await.unwrap();
        assert_eq!(VotingEventState::Draft, desc.state);

        let event_id: Id = desc.id.into();
        let response = client.post(uri!(open_event(event_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(VotingEventState::Active, event_state(&db, event_id).await);

        // Opening again is not a draft any more.
        let response = client.post(uri!(open_event(event_id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn nomination_sweep_expires_only_overdue(client: Client, db: Database) {
        let club_id = insert(
            &Coll::<NewClub>::from_db(&db),
            &NewClub {
                name: "Film Club".into(),
            },
        )
        .await;
        let overdue = insert(
            &Coll::<NewNomination>::from_db(&db),
            &NewNomination {
                club_id,
                title: "Overdue".into(),
                start_time: Utc::now() - Duration::days(7),
                end_time: Utc::now() - Duration::hours(1),
                status: NominationStatus::Active,
            },
        )
        .await;
        let running = insert(
            &Coll::<NewNomination>::from_db(&db),
            &NewNomination {
                club_id,
                title: "Running".into(),
                start_time: Utc::now() - Duration::days(1),
                end_time: Utc::now() + Duration::days(1),
                status: NominationStatus::Active,
            },
        )
        .await;

        let response = client.post(uri!(sweep_nominations)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let swept: NominationSweepResponse = response.into_json().await.unwrap();
        assert_eq!(1, swept.expired);

        let nominations = Coll::<Nomination>::from_db(&db);
        let overdue = nominations
            .find_one(overdue.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(NominationStatus::Closed, overdue.nomination.status);
        let running = nominations
            .find_one(running.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(NominationStatus::Active, running.nomination.status);

        // A second sweep finds nothing left to expire.
        let response = client.post(uri!(sweep_nominations)).dispatch().await;
        let swept: NominationSweepResponse = response.into_json().await.unwrap();
        assert_eq!(0, swept.expired);
    }

    #[backend_test(member)]
    async fn member_cannot_close(client: Client, db: Database) {
        let fix = fixture(&db, &[&[1]]).await;

        let response = client
            .post(uri!(close_event(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({}).to_string())
            .dispatch()
            .await;
        // The admin token guard forwards, so no route matches.
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(VotingEventState::Active, event_state(&db, fix.event_id).await);
    }
}
