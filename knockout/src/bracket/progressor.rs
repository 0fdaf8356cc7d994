//! Round-by-round bracket progression.
//!
//! Given the matches of one round, either produces the next round's pairings
//! or recognizes that the tournament is finished. Evaluation order for a
//! complete round:
//!
//! 1. A third-place match in the round ends the tournament.
//! 2. A single winner ends the tournament.
//! 3. Two winners produce the final, plus a third-place match for the two
//!    contested losers.
//! 4. More winners are shuffled and paired; an odd one out gets a bye.

use super::{
    errors::{BracketError, BracketResult},
    models::{Advancement, Match, MatchType, NewMatch, Participant, RoundState, Standings},
    shuffler::Shuffler,
};

/// Whether every match of `round` has a winner
pub fn round_state(round: u32, matches: &[Match]) -> RoundState {
    let pending = matches.iter().filter(|m| !m.is_decided()).count();
    if pending > 0 {
        RoundState::InProgress { round, pending }
    } else {
        RoundState::Complete { round }
    }
}

/// Evaluate round `round` and produce what follows it.
///
/// # Errors
///
/// * `BracketError::NotReady` - a match in the round has no winner
/// * `BracketError::InconsistentBracket` - the matches contradict the bracket
///   structure (empty round, foreign round numbers, impossible winners)
pub fn advance(
    round: u32,
    matches: &[Match],
    shuffler: &mut dyn Shuffler,
) -> BracketResult<Advancement> {
    if let Some(standings) = terminal_standings(round, matches)? {
        return Ok(Advancement::Complete(standings));
    }

    let mut winners = round_winners(matches);
    let next_round = round + 1;

    if winners.len() == 2 {
        let mut next = vec![NewMatch::normal(winners[0].id, winners[1].id)];

        let losers: Vec<&Participant> = matches
            .iter()
            .filter(|m| m.match_type == MatchType::Normal)
            .filter_map(Match::loser)
            .collect();
        if let [first, second] = losers.as_slice() {
            next.push(NewMatch::third_place(first.id, second.id));
        } else {
            log::debug!(
                "round {round} had {} contested semifinal(s), skipping third-place match",
                losers.len()
            );
        }

        return Ok(Advancement::NextRound {
            round: next_round,
            matches: next,
        });
    }

    shuffler.shuffle(&mut winners);
    let pairs = winners.chunks_exact(2);
    let lone = pairs.remainder().first().map(|p| NewMatch::bye(p.id));
    let next = pairs
        .map(|pair| NewMatch::normal(pair[0].id, pair[1].id))
        .chain(lone)
        .collect();

    Ok(Advancement::NextRound {
        round: next_round,
        matches: next,
    })
}

/// Standings if round `round` is the last one, `None` if play continues.
///
/// # Errors
///
/// Same as [`advance`].
pub fn terminal_standings(round: u32, matches: &[Match]) -> BracketResult<Option<Standings>> {
    validate_round(round, matches)?;

    if let RoundState::InProgress { round, pending } = round_state(round, matches) {
        return Err(BracketError::NotReady { round, pending });
    }

    let third_place: Vec<&Match> = matches
        .iter()
        .filter(|m| m.match_type == MatchType::ThirdPlace)
        .collect();
    let finals: Vec<&Match> = matches
        .iter()
        .filter(|m| m.match_type == MatchType::Normal)
        .collect();

    match third_place.as_slice() {
        [] => {}
        [third_place] => {
            let [final_match] = finals.as_slice() else {
                return Err(BracketError::InconsistentBracket(format!(
                    "round {round} has a third-place match but {} final(s)",
                    finals.len()
                )));
            };
            return Ok(Some(Standings {
                champion: decided_winner(final_match)?,
                runner_up: final_match.loser().cloned(),
                third: Some(decided_winner(third_place)?),
            }));
        }
        _ => {
            return Err(BracketError::InconsistentBracket(format!(
                "round {round} has {} third-place matches",
                third_place.len()
            )));
        }
    }

    let winners = round_winners(matches);
    if let [champion] = winners.as_slice() {
        let runner_up = match finals.as_slice() {
            [final_match] => final_match.loser().cloned(),
            _ => None,
        };
        return Ok(Some(Standings {
            champion: champion.clone(),
            runner_up,
            third: None,
        }));
    }

    Ok(None)
}

/// Winners of the normal and bye matches, in match order
fn round_winners(matches: &[Match]) -> Vec<Participant> {
    matches
        .iter()
        .filter(|m| m.match_type != MatchType::ThirdPlace)
        .filter_map(|m| m.winner.clone())
        .collect()
}

fn decided_winner(m: &Match) -> BracketResult<Participant> {
    m.winner.clone().ok_or(BracketError::NotReady {
        round: m.round,
        pending: 1,
    })
}

fn validate_round(round: u32, matches: &[Match]) -> BracketResult<()> {
    if matches.is_empty() {
        return Err(BracketError::InconsistentBracket(format!(
            "round {round} has no matches"
        )));
    }

    for m in matches {
        if m.round != round {
            return Err(BracketError::InconsistentBracket(format!(
                "match {} belongs to round {}, not {round}",
                m.id, m.round
            )));
        }
        if let Some(winner) = &m.winner
            && !m.involves(winner.id)
        {
            return Err(BracketError::InconsistentBracket(format!(
                "match {} has winner {} who did not play",
                m.id, winner.id
            )));
        }
        if m.match_type == MatchType::Bye
            && (m.player1 != m.player2 || m.winner.as_ref() != Some(&m.player1))
        {
            return Err(BracketError::InconsistentBracket(format!(
                "bye {} is not resolved for its sole occupant",
                m.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::shuffler::{KeepOrder, RandomShuffler};
    use chrono::Utc;
    use uuid::Uuid;

    fn players(names: &[&str]) -> Vec<Participant> {
        names.iter().map(|n| Participant::new(*n)).collect()
    }

    fn played(round: u32, a: &Participant, b: &Participant, winner: Option<&Participant>) -> Match {
        Match {
            id: Uuid::new_v4(),
            tournament_id: Uuid::nil(),
            round,
            match_type: MatchType::Normal,
            player1: a.clone(),
            player2: b.clone(),
            winner: winner.cloned(),
            created_at: Utc::now(),
        }
    }

    fn bye(round: u32, p: &Participant) -> Match {
        Match {
            match_type: MatchType::Bye,
            ..played(round, p, p, Some(p))
        }
    }

    fn third_place(round: u32, a: &Participant, b: &Participant, winner: Option<&Participant>) -> Match {
        Match {
            match_type: MatchType::ThirdPlace,
            ..played(round, a, b, winner)
        }
    }

    #[test]
    fn test_unresolved_round_is_not_ready() {
        let p = players(&["A", "B", "C", "D"]);
        let round = vec![played(1, &p[0], &p[1], Some(&p[0])), played(1, &p[2], &p[3], None)];

        assert_eq!(
            round_state(1, &round),
            RoundState::InProgress { round: 1, pending: 1 }
        );
        assert!(matches!(
            advance(1, &round, &mut KeepOrder),
            Err(BracketError::NotReady { round: 1, pending: 1 })
        ));
    }

    #[test]
    fn test_semifinal_generates_final_and_third_place() {
        let p = players(&["A", "B", "C", "D"]);
        let round = vec![
            played(1, &p[0], &p[1], Some(&p[0])),
            played(1, &p[2], &p[3], Some(&p[2])),
        ];

        let Advancement::NextRound { round, matches } = advance(1, &round, &mut KeepOrder).unwrap()
        else {
            panic!("expected a next round");
        };

        assert_eq!(round, 2);
        assert_eq!(
            matches,
            vec![
                NewMatch::normal(p[0].id, p[2].id),
                NewMatch::third_place(p[1].id, p[3].id),
            ]
        );
    }

    #[test]
    fn test_final_round_with_third_place_completes() {
        let p = players(&["A", "B", "C", "D"]);
        let round = vec![
            played(2, &p[0], &p[2], Some(&p[0])),
            third_place(2, &p[1], &p[3], Some(&p[3])),
        ];

        let result = advance(2, &round, &mut KeepOrder).unwrap();
        assert_eq!(
            result,
            Advancement::Complete(Standings {
                champion: p[0].clone(),
                runner_up: Some(p[2].clone()),
                third: Some(p[3].clone()),
            })
        );
    }

    #[test]
    fn test_pending_third_place_blocks_completion() {
        let p = players(&["A", "B", "C", "D"]);
        let round = vec![
            played(2, &p[0], &p[2], Some(&p[0])),
            third_place(2, &p[1], &p[3], None),
        ];
        assert!(matches!(
            terminal_standings(2, &round),
            Err(BracketError::NotReady { round: 2, pending: 1 })
        ));
    }

    #[test]
    fn test_two_player_final_completes_without_third() {
        let p = players(&["A", "B"]);
        let round = vec![played(1, &p[0], &p[1], Some(&p[1]))];

        let result = advance(1, &round, &mut KeepOrder).unwrap();
        assert_eq!(
            result,
            Advancement::Complete(Standings {
                champion: p[1].clone(),
                runner_up: Some(p[0].clone()),
                third: None,
            })
        );
    }

    #[test]
    fn test_semifinal_with_bye_skips_third_place() {
        // Three entrants: one contested semifinal and one bye
        let p = players(&["A", "B", "C"]);
        let round = vec![played(1, &p[0], &p[1], Some(&p[0])), bye(1, &p[2])];

        let Advancement::NextRound { matches, .. } = advance(1, &round, &mut KeepOrder).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(matches, vec![NewMatch::normal(p[0].id, p[2].id)]);
    }

    #[test]
    fn test_bye_winners_pair_like_contested_winners() {
        let p = players(&["A", "B", "C", "D", "E"]);
        // Distributed layout for five: byes at slots 0, 1 and 3
        let round = vec![
            bye(1, &p[0]),
            bye(1, &p[1]),
            played(1, &p[2], &p[3], Some(&p[3])),
            bye(1, &p[4]),
        ];

        let Advancement::NextRound { round, matches } = advance(1, &round, &mut KeepOrder).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(round, 2);
        assert_eq!(
            matches,
            vec![
                NewMatch::normal(p[0].id, p[1].id),
                NewMatch::normal(p[3].id, p[4].id),
            ]
        );
    }

    #[test]
    fn test_odd_winner_count_gets_bye() {
        let p = players(&["A", "B", "C", "D", "E", "F"]);
        let round = vec![
            played(3, &p[0], &p[1], Some(&p[0])),
            played(3, &p[2], &p[3], Some(&p[2])),
            bye(3, &p[4]),
        ];

        let Advancement::NextRound { round, matches } = advance(3, &round, &mut KeepOrder).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(round, 4);
        assert_eq!(
            matches.iter().filter(|m| m.match_type == MatchType::Normal).count(),
            1
        );
        let byes: Vec<_> = matches
            .iter()
            .filter(|m| m.match_type == MatchType::Bye)
            .collect();
        assert_eq!(byes.len(), 1);
        assert_eq!(byes[0].winner, Some(p[4].id));
        assert_eq!(byes[0].player2, None);
        assert_eq!(matches.last().map(|m| m.match_type), Some(MatchType::Bye));
    }

    #[test]
    fn test_regeneration_keeps_shape() {
        let p: Vec<Participant> = (0..12).map(|i| Participant::new(format!("P{i}"))).collect();
        let round: Vec<Match> = p
            .chunks(2)
            .map(|pair| played(1, &pair[0], &pair[1], Some(&pair[0])))
            .collect();

        let shape = |seed| match advance(1, &round, &mut RandomShuffler::seeded(seed)).unwrap() {
            Advancement::NextRound { matches, .. } => (
                matches.len(),
                matches.iter().filter(|m| m.match_type == MatchType::Bye).count(),
            ),
            Advancement::Complete(_) => panic!("six winners cannot finish"),
        };

        assert_eq!(shape(1), (3, 0));
        assert_eq!(shape(1), shape(99));
    }

    #[test]
    fn test_empty_round_is_inconsistent() {
        assert!(matches!(
            advance(1, &[], &mut KeepOrder),
            Err(BracketError::InconsistentBracket(_))
        ));
    }

    #[test]
    fn test_foreign_round_is_inconsistent() {
        let p = players(&["A", "B"]);
        let round = vec![played(2, &p[0], &p[1], Some(&p[0]))];
        assert!(matches!(
            advance(1, &round, &mut KeepOrder),
            Err(BracketError::InconsistentBracket(_))
        ));
    }

    #[test]
    fn test_third_place_without_single_final_is_inconsistent() {
        let p = players(&["A", "B", "C", "D"]);
        let round = vec![third_place(2, &p[1], &p[3], Some(&p[1]))];
        assert!(matches!(
            advance(2, &round, &mut KeepOrder),
            Err(BracketError::InconsistentBracket(_))
        ));
    }

    #[test]
    fn test_foreign_winner_is_inconsistent() {
        let p = players(&["A", "B", "C"]);
        let round = vec![played(1, &p[0], &p[1], Some(&p[2]))];
        assert!(matches!(
            terminal_standings(1, &round),
            Err(BracketError::InconsistentBracket(_))
        ));
    }
}
