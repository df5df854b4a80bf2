use chrono::Utc;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::vote::{VoteDesc, VoteSpec},
        auth::AuthToken,
        common::{CandidateStatus, MembershipStatus, Notifiable},
        db::{
            club::Membership,
            member::Member,
            nomination::Candidate,
            notification::{NewNotification, Notification},
            vote::{NewVote, Vote},
            voting_event::VotingEvent,
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, my_votes]
}

#[post("/events/<event_id>/votes", data = "<spec>", format = "json")]
async fn cast_vote(
    token: AuthToken<Member>,
    event_id: Id,
    spec: Json<VoteSpec>,
    events: Coll<VotingEvent>,
    candidates: Coll<Candidate>,
    memberships: Coll<Membership>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
    notifications: Coll<NewNotification>,
) -> Result<Json<VoteDesc>> {
    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting event {event_id}")))?;
    if !event.accepts_votes_at(Utc::now()) {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Voting event {event_id} is not accepting votes"),
        ));
    }

    let candidate = candidates
        .find_one(spec.candidate_id.as_doc(), None)
        .await?
        .filter(|candidate| {
            candidate.status == CandidateStatus::Approved && candidate.club_id == event.club_id
        })
        .ok_or_else(|| {
            Error::Status(
                Status::BadRequest,
                format!("Candidate {} is not standing in this event", spec.candidate_id),
            )
        })?;

    // The voter must be an active member of the event's club.
    let membership_filter = doc! {
        "club_id": event.club_id,
        "member_id": token.id(),
        "status": MembershipStatus::Active,
    };
    memberships
        .find_one(membership_filter, None)
        .await?
        .ok_or_else(|| {
            Error::Status(
                Status::BadRequest,
                "You are not an active member of this club".to_string(),
            )
        })?;

    // One ballot per office. The unique index on (event, voter, position)
    // catches the race this pre-check cannot.
    let already_voted = doc! {
        "event_id": event_id,
        "voter_id": token.id(),
        "position_id": candidate.position_id,
    };
    if votes.find_one(already_voted, None).await?.is_some() {
        return Err(Error::Status(
            Status::BadRequest,
            "You have already voted for this position".to_string(),
        ));
    }

    let vote = NewVote::new(event_id, token.id(), candidate.id, candidate.position_id);
    let new_id: Id = new_votes
        .insert_one(&vote, None)
        .await
        .map_err(|err| {
            if is_duplicate_key_error(&err) {
                Error::Status(
                    Status::BadRequest,
                    "You have already voted for this position".to_string(),
                )
            } else {
                err.into()
            }
        })?
        .inserted_id
        .as_object_id()
        .unwrap() // Safe because the ID comes directly from the database.
        .into();

    // Failure-tolerant; the vote stands either way.
    Notification::send(
        &notifications,
        Notifiable::Member(token.id()),
        format!("Voted in \"{}\"", event.title),
    )
    .await;

    let vote = votes
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote {new_id}")))?;
    Ok(Json(vote.into()))
}

#[get("/events/<event_id>/votes/mine")]
async fn my_votes(
    token: AuthToken<Member>,
    event_id: Id,
    votes: Coll<Vote>,
) -> Result<Json<Vec<VoteDesc>>> {
    let filter = doc! {
        "event_id": event_id,
        "voter_id": token.id(),
    };
    let mine: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
    Ok(Json(mine.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::serde_json::json};

    use crate::model::{
        common::NominationStatus,
        db::{
            club::{NewClub, NewMembership},
            member::NewMember,
            nomination::{NewCandidate, NewNomination},
            position::NewClubPosition,
            voting_event::{NewVotingEvent, VotingEvent},
        },
    };

    use super::*;

    /// A club with one active position, two approved candidates, and the
    /// logged-in member as an active club member.
    struct Fixture {
        event_id: Id,
        candidate_id: Id,
        rival_id: Id,
    }

    async fn fixture(db: &Database, event: NewVotingEvent) -> Fixture {
        let club_id = insert(&Coll::<NewClub>::from_db(db), &NewClub { name: "Chess Club".into() }).await;
        let position_id = insert(
            &Coll::<NewClubPosition>::from_db(db),
            &NewClubPosition {
                club_id,
                name: "President".into(),
                active: true,
            },
        )
        .await;
        let nomination_id = insert(
            &Coll::<NewNomination>::from_db(db),
            &NewNomination {
                club_id,
                title: "President nominations".into(),
                start_time: Utc::now() - chrono::Duration::days(7),
                end_time: Utc::now() - chrono::Duration::days(1),
                status: NominationStatus::Closed,
            },
        )
        .await;

        // Stand a second member as the candidate.
        let runner_id = insert(
            &Coll::<NewMember>::from_db(db),
            &crate::model::api::member::MemberCredentials::example2()
                .try_into()
                .unwrap(),
        )
        .await;
        let candidate_id = insert(
            &Coll::<NewCandidate>::from_db(db),
            &NewCandidate {
                nomination_id,
                club_id,
                member_id: runner_id,
                position_id,
                status: CandidateStatus::Approved,
            },
        )
        .await;

        // A second candidate contesting the same position.
        let rival_member_id = insert(
            &Coll::<NewMember>::from_db(db),
            &NewMember {
                username: "casey-keen".into(),
                password_hash: "not-a-real-hash".into(),
                display_name: "Casey".into(),
            },
        )
        .await;
        let rival_id = insert(
            &Coll::<NewCandidate>::from_db(db),
            &NewCandidate {
                nomination_id,
                club_id,
                member_id: rival_member_id,
                position_id,
                status: CandidateStatus::Approved,
            },
        )
        .await;

        // Make the logged-in member an active member of the club.
        let voter = logged_in_member(db).await;
        Coll::<NewMembership>::from_db(db)
            .insert_one(&NewMembership::new(club_id, voter.id), None)
            .await
            .unwrap();

        let event_id = insert(
            &Coll::<NewVotingEvent>::from_db(db),
            &NewVotingEvent { club_id, ..event },
        )
        .await;

        Fixture {
            event_id,
            candidate_id,
            rival_id,
        }
    }

    async fn insert<T>(coll: &Coll<T>, value: &T) -> Id
    where
        T: serde::Serialize + Send + Sync,
    {
        coll.insert_one(value, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    /// The member the `#[backend_test(member)]` harness logged in.
    async fn logged_in_member(db: &Database) -> Member {
        Coll::<Member>::from_db(db)
            .find_one(
                doc! { "username": crate::model::api::member::MemberCredentials::example1().username },
                None,
            )
            .await
            .unwrap()
            .unwrap()
    }

    fn active(mut event: NewVotingEvent) -> NewVotingEvent {
        event.state = crate::model::common::VotingEventState::Active;
        event
    }

    #[backend_test(member)]
    async fn cast_and_list_vote(client: Client, db: Database) {
        let fix = fixture(&db, active(NewVotingEvent::current_example(Id::new()))).await;

        let response = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client
            .get(uri!(my_votes(fix.event_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let mine: Vec<VoteDesc> = response.into_json().await.unwrap();
        assert_eq!(1, mine.len());
        assert_eq!(fix.candidate_id.to_string(), mine[0].candidate_id.to_string());
    }

    #[backend_test(member)]
    async fn double_vote_for_same_position_rejected(client: Client, db: Database) {
        let fix = fixture(&db, active(NewVotingEvent::current_example(Id::new()))).await;

        let first = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, first.status());

        // A second ballot for the same office must bounce, and only one
        // vote may remain recorded.
        let second = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, second.status());

        let count = Coll::<Vote>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(1, count);
    }

    #[backend_test(member)]
    async fn switching_candidate_in_same_position_rejected(client: Client, db: Database) {
        let fix = fixture(&db, active(NewVotingEvent::current_example(Id::new()))).await;

        let first = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, first.status());

        // Backing a different candidate is still a second ballot for the
        // same office.
        let second = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.rival_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, second.status());

        let count = Coll::<Vote>::from_db(&db)
            .count_documents(doc! { "event_id": fix.event_id }, None)
            .await
            .unwrap();
        assert_eq!(1, count);
    }

    #[backend_test(member)]
    async fn vote_after_window_rejected(client: Client, db: Database) {
        // Active state, but the window has already passed.
        let fix = fixture(&db, active(NewVotingEvent::past_example(Id::new()))).await;

        let response = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(member)]
    async fn vote_before_window_rejected(client: Client, db: Database) {
        let fix = fixture(&db, active(NewVotingEvent::future_example(Id::new()))).await;

        let response = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(member)]
    async fn non_member_cannot_vote(client: Client, db: Database) {
        let fix = fixture(&db, active(NewVotingEvent::current_example(Id::new()))).await;

        // Revoke the voter's membership.
        let voter = logged_in_member(&db).await;
        Coll::<Membership>::from_db(&db)
            .delete_one(doc! { "member_id": voter.id }, None)
            .await
            .unwrap();

        let response = client
            .post(uri!(cast_vote(fix.event_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": fix.candidate_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn unauthenticated_vote_rejected(client: Client) {
        // No auth cookie, so the token guard forwards and nothing matches.
        let response = client
            .post(uri!(cast_vote(Id::new())))
            .header(ContentType::JSON)
            .body(json!({ "candidate_id": Id::new().to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
