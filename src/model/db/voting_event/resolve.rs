use crate::model::db::nomination::Candidate;

use super::tally::CandidateTally;

/// The result of resolving one position's race.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Nobody voted for anyone; the position stays vacant.
    NoVotes,
    /// A single candidate holds the strictly highest non-zero count.
    Winner { candidate: Candidate, votes: u64 },
    /// Two or more candidates share the maximum non-zero count. The race
    /// cannot be decided without an explicit choice.
    Tie {
        candidates: Vec<Candidate>,
        votes: u64,
    },
}

/// Decide one position's race from its tallies.
///
/// A winner needs a strictly highest count that is greater than zero; a
/// position whose ballots all went uncast has no winner. Callers must treat
/// [`Resolution::Tie`] as undecided until an administrator picks among the
/// tied candidates.
pub fn resolve_position(tallies: &[CandidateTally]) -> Resolution {
    let top = tallies.iter().map(|t| t.votes).max().unwrap_or(0);
    if top == 0 {
        return Resolution::NoVotes;
    }

    let mut leaders: Vec<&CandidateTally> = tallies.iter().filter(|t| t.votes == top).collect();
    if leaders.len() == 1 {
        Resolution::Winner {
            candidate: leaders.remove(0).candidate.clone(),
            votes: top,
        }
    } else {
        Resolution::Tie {
            candidates: leaders.into_iter().map(|t| t.candidate.clone()).collect(),
            votes: top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        common::CandidateStatus,
        db::nomination::CandidateCore,
        mongodb::Id,
    };

    fn tally(candidate_id: Id, position_id: Id, votes: u64) -> CandidateTally {
        CandidateTally {
            candidate: Candidate {
                id: candidate_id,
                candidate: CandidateCore {
                    nomination_id: Id::new(),
                    club_id: Id::new(),
                    member_id: Id::new(),
                    position_id,
                    status: CandidateStatus::Approved,
                },
            },
            votes,
        }
    }

    #[test]
    fn strict_maximum_wins() {
        let position = Id::new();
        let alice = Id::new();
        let bob = Id::new();
        let tallies = vec![tally(alice, position, 7), tally(bob, position, 3)];

        match resolve_position(&tallies) {
            Resolution::Winner { candidate, votes } => {
                assert_eq!(candidate.id, alice);
                assert_eq!(votes, 7);
            }
            other => panic!("Expected a winner, got {other:?}"),
        }
    }

    #[test]
    fn shared_maximum_is_a_tie() {
        let position = Id::new();
        let carol = Id::new();
        let dave = Id::new();
        let erin = Id::new();
        let tallies = vec![
            tally(carol, position, 5),
            tally(dave, position, 5),
            tally(erin, position, 2),
        ];

        match resolve_position(&tallies) {
            Resolution::Tie { candidates, votes } => {
                assert_eq!(votes, 5);
                let mut tied: Vec<Id> = candidates.iter().map(|c| c.id).collect();
                tied.sort();
                let mut expected = vec![carol, dave];
                expected.sort();
                assert_eq!(tied, expected);
            }
            other => panic!("Expected a tie, got {other:?}"),
        }
    }

    #[test]
    fn zero_votes_means_no_winner() {
        let position = Id::new();
        let tallies = vec![
            tally(Id::new(), position, 0),
            tally(Id::new(), position, 0),
        ];
        assert!(matches!(resolve_position(&tallies), Resolution::NoVotes));
    }

    #[test]
    fn lone_candidate_with_zero_votes_does_not_win() {
        let position = Id::new();
        let tallies = vec![tally(Id::new(), position, 0)];
        assert!(matches!(resolve_position(&tallies), Resolution::NoVotes));
    }

    #[test]
    fn no_candidates_means_no_winner() {
        assert!(matches!(resolve_position(&[]), Resolution::NoVotes));
    }

    #[test]
    fn single_vote_decides_a_two_way_race() {
        let position = Id::new();
        let alice = Id::new();
        let tallies = vec![tally(alice, position, 1), tally(Id::new(), position, 0)];

        match resolve_position(&tallies) {
            Resolution::Winner { candidate, votes } => {
                assert_eq!(candidate.id, alice);
                assert_eq!(votes, 1);
            }
            other => panic!("Expected a winner, got {other:?}"),
        }
    }
}
