//! Pure scoring: completed round in, score changes out.

use std::collections::BTreeMap;

use crate::state::{
    model::{Guess, Target, code_matches, scale_score},
    room::{CodeGame, Contributor, Round, RoundOutcome, Team},
};

/// Successful codes a team needs to win the code game.
pub const CODES_TO_WIN: u32 = 8;
/// Interceptions that make a team lose the code game.
pub const INTERCEPTIONS_TO_LOSE: u32 = 2;

/// Compute the outcome of a completed round.
///
/// Scale game: every guesser earns `score(target, guess)`, the clue-giver the
/// average of those. Code game: the opposing team intercepts on an exact match
/// of the target; the active team communicates when its own recorded guess
/// matches the target, or when it recorded none.
pub fn score_round(round: &Round) -> RoundOutcome {
    match &round.target {
        Target::Scale(target) => {
            let deltas = round
                .guesses
                .iter()
                .filter_map(|(contributor, guess)| match (contributor, guess) {
                    (Contributor::Participant(name), Guess::Scale(value))
                        if *name != round.clue_giver =>
                    {
                        Some((name.clone(), scale_score(target.point, *value)))
                    }
                    _ => None,
                })
                .collect::<BTreeMap<_, _>>();

            let clue_giver_bonus = if deltas.is_empty() {
                0.0
            } else {
                deltas.values().sum::<f64>() / deltas.len() as f64
            };

            RoundOutcome::Scale {
                deltas,
                clue_giver_bonus,
            }
        }
        Target::Code(code) => {
            let team_guess = |team: Option<Team>| {
                team.and_then(|team| round.guesses.get(&Contributor::Team(team)))
                    .and_then(|guess| match guess {
                        Guess::Code(guess) => Some(*guess),
                        Guess::Scale(_) => None,
                    })
            };

            let intercepted = team_guess(round.active_team.map(Team::opponent))
                .is_some_and(|guess| code_matches(code, &guess));
            let communicated =
                team_guess(round.active_team).is_none_or(|guess| code_matches(code, &guess));

            RoundOutcome::Code {
                communicated,
                intercepted,
            }
        }
    }
}

/// Winner of the code game given the current team counters, if any.
///
/// A team that reached [`INTERCEPTIONS_TO_LOSE`] loses regardless of its
/// successful codes; otherwise a team reaching [`CODES_TO_WIN`] wins.
pub fn code_winner(game: &CodeGame) -> Option<Team> {
    if let Some(loser) = Team::ALL
        .into_iter()
        .find(|team| game.team(*team).interceptions >= INTERCEPTIONS_TO_LOSE)
    {
        return Some(loser.opponent());
    }

    Team::ALL
        .into_iter()
        .find(|team| game.team(*team).successful_codes >= CODES_TO_WIN)
}

/// Winner when the round cap is hit: best `successful - interceptions`, `None` on a tie.
pub fn code_leader(game: &CodeGame) -> Option<Team> {
    let balance = |team: Team| {
        let state = game.team(team);
        i64::from(state.successful_codes) - i64::from(state.interceptions)
    };
    let (red, blue) = (balance(Team::Red), balance(Team::Blue));
    match red.cmp(&blue) {
        std::cmp::Ordering::Greater => Some(Team::Red),
        std::cmp::Ordering::Less => Some(Team::Blue),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::state::model::{Code, ScalePair, ScaleTarget};

    fn scale_round(point: f64, guesses: &[(&str, f64)]) -> Round {
        Round {
            index: 0,
            turn: 1,
            clue_giver: "ann".into(),
            active_team: None,
            target: Target::Scale(ScaleTarget {
                scale: ScalePair::new("Cold", "Hot"),
                point,
            }),
            clues: vec!["lukewarm".into()],
            guesses: guesses
                .iter()
                .map(|(name, value)| (Contributor::Participant(name.to_string()), Guess::Scale(*value)))
                .collect(),
            submitted: BTreeSet::new(),
            reasons: BTreeMap::new(),
            completed: false,
        }
    }

    fn code_round(target: [u8; 3], guesses: &[(Team, [u8; 3])]) -> Round {
        Round {
            index: 0,
            turn: 1,
            clue_giver: "ann".into(),
            active_team: Some(Team::Red),
            target: Target::Code(Code::new(target).unwrap()),
            clues: vec!["a".into(), "b".into(), "c".into()],
            guesses: guesses
                .iter()
                .map(|(team, digits)| (Contributor::Team(*team), Guess::Code(Code::new(*digits).unwrap())))
                .collect(),
            submitted: BTreeSet::new(),
            reasons: BTreeMap::new(),
            completed: false,
        }
    }

    #[test]
    fn scale_clue_giver_earns_average() {
        let outcome = score_round(&scale_round(0.5, &[("bob", 0.5), ("cat", 0.0)]));
        let RoundOutcome::Scale {
            deltas,
            clue_giver_bonus,
        } = outcome
        else {
            panic!("expected scale outcome");
        };
        assert_eq!(deltas["bob"], 100.0);
        assert_eq!(deltas["cat"], 50.0);
        assert_eq!(clue_giver_bonus, 75.0);
        assert!(!deltas.contains_key("ann"));
    }

    #[test]
    fn code_interception_requires_exact_match() {
        let outcome = score_round(&code_round([1, 2, 3], &[(Team::Blue, [1, 2, 4])]));
        assert_eq!(
            outcome,
            RoundOutcome::Code {
                communicated: true,
                intercepted: false
            }
        );

        let outcome = score_round(&code_round([1, 2, 3], &[(Team::Blue, [1, 2, 3])]));
        assert_eq!(
            outcome,
            RoundOutcome::Code {
                communicated: true,
                intercepted: true
            }
        );
    }

    #[test]
    fn wrong_own_team_guess_is_a_miscommunication() {
        let outcome = score_round(&code_round(
            [4, 4, 1],
            &[(Team::Red, [4, 1, 4]), (Team::Blue, [2, 2, 2])],
        ));
        assert_eq!(
            outcome,
            RoundOutcome::Code {
                communicated: false,
                intercepted: false
            }
        );
    }

    #[test]
    fn loss_takes_precedence_over_win() {
        let mut game = CodeGame::default();
        game.team_mut(Team::Red).successful_codes = CODES_TO_WIN;
        game.team_mut(Team::Red).interceptions = INTERCEPTIONS_TO_LOSE;
        assert_eq!(code_winner(&game), Some(Team::Blue));
    }

    #[test]
    fn win_ignores_single_opposing_interception() {
        let mut game = CodeGame::default();
        game.team_mut(Team::Red).successful_codes = CODES_TO_WIN;
        game.team_mut(Team::Blue).interceptions = 1;
        assert_eq!(code_winner(&game), Some(Team::Red));
    }

    #[test]
    fn leader_breaks_on_balance() {
        let mut game = CodeGame::default();
        assert_eq!(code_leader(&game), None);
        game.team_mut(Team::Blue).successful_codes = 3;
        game.team_mut(Team::Red).successful_codes = 3;
        game.team_mut(Team::Red).interceptions = 1;
        assert_eq!(code_leader(&game), Some(Team::Blue));
    }
}
