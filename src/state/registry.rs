//! Read-only views over a room answering "who must act now" and "is everyone done".

use crate::state::{
    model::CODE_LENGTH,
    room::{Contributor, GameRules, Room},
    state_machine::RoundPhase,
};

/// Contributors who must act during `phase` for the room's open round.
///
/// Clue giving: every participant in the scale game (each writes clues for
/// their own slots), the active clue-giver in the code game. Guessing: every
/// participant except the clue-giver in the scale game, the opposing team in
/// the code game. Other phases require nobody.
pub fn required_contributors(room: &Room, phase: RoundPhase) -> Vec<Contributor> {
    let clue_giver = room.clue_giver();
    match (phase, &room.rules) {
        (RoundPhase::ClueGiving, GameRules::Scale(_)) => room
            .participants
            .keys()
            .cloned()
            .map(Contributor::Participant)
            .collect(),
        (RoundPhase::ClueGiving, GameRules::Code(_)) => clue_giver
            .map(|name| vec![Contributor::Participant(name.to_string())])
            .unwrap_or_default(),
        (RoundPhase::Guessing, GameRules::Scale(_)) => room
            .participants
            .keys()
            .filter(|name| Some(name.as_str()) != clue_giver)
            .cloned()
            .map(Contributor::Participant)
            .collect(),
        (RoundPhase::Guessing, GameRules::Code(game)) => {
            vec![Contributor::Team(game.active_team.opponent())]
        }
        _ => Vec::new(),
    }
}

/// Whether `contributor` has already made its contribution for the current phase.
pub fn has_contributed(room: &Room, contributor: &Contributor) -> bool {
    match (room.phase(), &room.rules, contributor) {
        (RoundPhase::ClueGiving, GameRules::Scale(game), Contributor::Participant(name)) => {
            game.clue_writers.contains(name)
        }
        (RoundPhase::ClueGiving, GameRules::Code(_), Contributor::Participant(name)) => room
            .open_round
            .as_ref()
            .is_some_and(|round| &round.clue_giver == name && round.clues.len() == CODE_LENGTH),
        (RoundPhase::Guessing, _, contributor) => room
            .open_round
            .as_ref()
            .is_some_and(|round| round.submitted.contains(contributor)),
        _ => false,
    }
}

/// True once every required contributor of the current phase has contributed.
///
/// Backed by sets of contributor ids, so repeated or late submissions from the
/// same contributor never change the answer.
pub fn is_complete(room: &Room) -> bool {
    let required = required_contributors(room, room.phase());
    !required.is_empty()
        && required
            .iter()
            .all(|contributor| has_contributed(room, contributor))
}

/// Required contributors that have not contributed yet.
pub fn pending_contributors(room: &Room) -> Vec<Contributor> {
    required_contributors(room, room.phase())
        .into_iter()
        .filter(|contributor| !has_contributed(room, contributor))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::WordBank,
        state::{
            coordinator::StartSettings,
            room::{GameVariant, Participant, Team},
        },
    };

    fn scale_room(names: &[&str]) -> Room {
        let mut room = Room::new("ABC123", GameVariant::Scale);
        for name in names {
            room.join(Participant::human(*name, None)).unwrap();
        }
        room
    }

    #[test]
    fn setup_requires_nobody() {
        let room = scale_room(&["ann", "bob"]);
        assert!(required_contributors(&room, RoundPhase::Setup).is_empty());
        assert!(!is_complete(&room));
    }

    #[test]
    fn scale_clue_giving_requires_everyone_and_guessing_excludes_clue_giver() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = scale_room(&["cat", "ann", "bob"]);
        room.start(StartSettings::default(), &WordBank::default(), &mut rng)
            .unwrap();

        let clue_givers = required_contributors(&room, RoundPhase::ClueGiving);
        assert_eq!(clue_givers.len(), 3);

        let guessers = required_contributors(&room, RoundPhase::Guessing);
        assert_eq!(
            guessers,
            vec![
                Contributor::Participant("bob".into()),
                Contributor::Participant("cat".into())
            ]
        );
    }

    #[test]
    fn code_guessing_requires_only_opposing_team() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut room = Room::new("XYZ789", GameVariant::Code);
        room.join(Participant::human("ann", Some(Team::Red))).unwrap();
        room.join(Participant::human("bob", Some(Team::Blue))).unwrap();
        room.start(StartSettings::default(), &WordBank::default(), &mut rng)
            .unwrap();

        assert_eq!(
            required_contributors(&room, RoundPhase::ClueGiving),
            vec![Contributor::Participant("ann".into())]
        );
        assert_eq!(
            required_contributors(&room, RoundPhase::Guessing),
            vec![Contributor::Team(Team::Blue)]
        );

        room.submit_clues("ann", room.turn, vec!["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(room.phase(), RoundPhase::Guessing);
        assert_eq!(pending_contributors(&room), vec![Contributor::Team(Team::Blue)]);
        assert!(!is_complete(&room));
        assert!(!has_contributed(&room, &Contributor::Team(Team::Red)));
    }
}
