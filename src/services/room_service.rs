use std::collections::BTreeMap;

use rand::Rng;
use tracing::info;

use crate::{
    config::{AI_NAME_PREFIX, WordBank},
    dto::{
        room::{
            AddAiRequest, CreateRoomRequest, NameResponse, RoomSnapshot, StartRoomRequest,
        },
        validation::{ROOM_CODE_LEN, validate_room_code},
    },
    error::ServiceError,
    state::{
        GameError, SharedState,
        coordinator::StartSettings,
        model::{Guess, GuessAnswer},
        room::{GameVariant, Participant, Room, Team},
        transitions::run_room_action_with_broadcast,
    },
};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 16;

/// Open a new room, seating AI participants when requested.
///
/// Scale rooms get the configured number of AI players unless the request
/// says otherwise; code rooms seat requested AI players alternately on the
/// red and blue teams.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<RoomSnapshot, ServiceError> {
    let variant = GameVariant::from(request.variant);
    let ai_players = match variant {
        GameVariant::Scale => request
            .ai_players
            .unwrap_or(state.config().rooms().default_scale_ai_players),
        GameVariant::Code => request.ai_players.unwrap_or(0),
    };

    let mut rng = rand::rng();
    let mut room = Room::new(String::new(), variant);
    for seat in 0..ai_players {
        let team = match variant {
            GameVariant::Scale => None,
            GameVariant::Code if seat % 2 == 0 => Some(Team::Red),
            GameVariant::Code => Some(Team::Blue),
        };
        seat_ai(&mut room, state.config().words(), team, None, &mut rng)?;
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        room.code = generate_room_code(&mut rng);
        let snapshot = RoomSnapshot::for_viewer(&room, None);
        if state.insert_room(room.clone()).is_some() {
            info!(room = %snapshot.code, variant = ?variant, ai_players, "room created");
            return Ok(snapshot);
        }
    }
    Err(ServiceError::InvalidInput(
        "could not allocate a free room code".into(),
    ))
}

/// Return the room as seen by `viewer`.
pub async fn get_room(
    state: &SharedState,
    code: &str,
    viewer: Option<&str>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let entry = state
        .room(&code)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` does not exist")))?;
    let room = entry.room().lock().await;
    Ok(RoomSnapshot::for_viewer(&room, viewer))
}

/// Seat a human participant. The code game requires a team.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    name: &str,
    team: Option<Team>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let name = name.trim();
    let ((), snapshot) = run_room_action_with_broadcast(state, &code, Some(name), |room| {
        room.join(Participant::human(name, team))?;
        info!(room = %room.code, participant = name, "participant joined");
        Ok(())
    })
    .await?;
    Ok(snapshot)
}

/// Seat an AI participant, drawing a personality when none is given.
pub async fn add_ai(
    state: &SharedState,
    code: &str,
    request: AddAiRequest,
    viewer: Option<&str>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let bank = state.config().words();
    let (name, snapshot) = run_room_action_with_broadcast(state, &code, viewer, |room| {
        let name = seat_ai(
            room,
            bank,
            request.team.map(Into::into),
            request.personality,
            &mut rand::rng(),
        )?;
        Ok(name)
    })
    .await?;
    info!(room = %code, participant = %name, "AI participant added");
    Ok(snapshot)
}

/// Set a team's code words, drawing four from the word bank when `words` is `None`.
pub async fn set_code_words(
    state: &SharedState,
    code: &str,
    team: Team,
    words: Option<Vec<String>>,
    viewer: Option<&str>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let bank = state.config().words();
    let ((), snapshot) = run_room_action_with_broadcast(state, &code, viewer, |room| {
        let words = match words {
            Some(words) => words,
            None => {
                let taken = room
                    .code_game()
                    .map(|game| game.team(team.opponent()).code_words.clone())
                    .unwrap_or_default();
                bank.draw_code_words(&mut rand::rng(), &taken)
            }
        };
        room.set_code_words(team, words)?;
        Ok(())
    })
    .await?;
    info!(room = %code, team = team.as_str(), "code words set");
    Ok(snapshot)
}

/// Apply start options and open the first round.
pub async fn start_room(
    state: &SharedState,
    code: &str,
    request: StartRoomRequest,
    viewer: Option<&str>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let bank = state.config().words();
    let settings = start_settings(request);
    let (tasks, snapshot) = run_room_action_with_broadcast(state, &code, viewer, |room| {
        Ok(room.start(settings, bank, &mut rand::rng())?)
    })
    .await?;
    state.ai().schedule(tasks);
    Ok(snapshot)
}

/// Record clues written by `name` for turn `turn`.
pub async fn submit_clues(
    state: &SharedState,
    code: &str,
    name: &str,
    turn: u64,
    clues: Vec<String>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let (tasks, snapshot) = run_room_action_with_broadcast(state, &code, Some(name), |room| {
        Ok(room.submit_clues(name, turn, clues)?)
    })
    .await?;
    state.ai().schedule(tasks);
    Ok(snapshot)
}

/// Move `name`'s pending scale guess.
pub async fn update_guess(
    state: &SharedState,
    code: &str,
    name: &str,
    turn: u64,
    guess: Guess,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let ((), snapshot) = run_room_action_with_broadcast(state, &code, Some(name), |room| {
        Ok(room.update_guess(name, turn, guess)?)
    })
    .await?;
    Ok(snapshot)
}

/// Submit `name`'s final guess for turn `turn`; scores the turn once everyone is in.
pub async fn submit_guess(
    state: &SharedState,
    code: &str,
    name: &str,
    turn: u64,
    answer: impl Into<GuessAnswer>,
) -> Result<RoomSnapshot, ServiceError> {
    let code = normalize_room_code(code)?;
    let answer = answer.into();
    let (tasks, snapshot) = run_room_action_with_broadcast(state, &code, Some(name), |room| {
        Ok(room.submit_guess(name, turn, answer, &mut rand::rng())?)
    })
    .await?;
    state.ai().schedule(tasks);
    Ok(snapshot)
}

/// Suggest a random display name.
pub fn random_player_name(state: &SharedState) -> NameResponse {
    NameResponse {
        name: state.config().words().random_player_name(&mut rand::rng()),
    }
}

/// Upper-case and check a room code; malformed codes cannot name a room.
fn normalize_room_code(code: &str) -> Result<String, ServiceError> {
    let code = code.trim().to_ascii_uppercase();
    validate_room_code(&code)
        .map(|()| code.clone())
        .map_err(|_| ServiceError::NotFound(format!("room `{code}` does not exist")))
}

fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect()
}

fn start_settings(request: StartRoomRequest) -> StartSettings {
    let mut code_words = BTreeMap::new();
    if let Some(words) = request.red_words {
        code_words.insert(Team::Red, words);
    }
    if let Some(words) = request.blue_words {
        code_words.insert(Team::Blue, words);
    }
    StartSettings {
        code_words,
        max_rounds: request.max_rounds,
        first_team: request.first_team.map(Into::into).unwrap_or(Team::Red),
    }
}

/// Join an AI participant named after its personality, returning the name used.
fn seat_ai<R: Rng + ?Sized>(
    room: &mut Room,
    bank: &WordBank,
    team: Option<Team>,
    personality: Option<String>,
    rng: &mut R,
) -> Result<String, GameError> {
    let personality = personality
        .map(|personality| personality.trim().to_string())
        .filter(|personality| !personality.is_empty())
        .unwrap_or_else(|| bank.random_ai_personality(rng));
    let base = format!("{AI_NAME_PREFIX}{personality}");
    let name = if room.participants.contains_key(&base) {
        (2..)
            .map(|suffix| format!("{base} {suffix}"))
            .find(|candidate| !room.participants.contains_key(candidate))
            .unwrap_or(base)
    } else {
        base
    };
    room.join(Participant::ai(name.clone(), personality, team))?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = generate_room_code(&mut rng);
            assert!(validate_room_code(&code).is_ok(), "{code}");
        }
    }

    #[test]
    fn codes_are_normalized_before_lookup() {
        assert_eq!(normalize_room_code(" ab12cd ").unwrap(), "AB12CD");
        assert!(matches!(
            normalize_room_code("nope"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn ai_names_are_made_unique() {
        let mut rng = StdRng::seed_from_u64(3);
        let bank = WordBank::default();
        let mut room = Room::new("AIAIAI", GameVariant::Scale);
        for _ in 0..3 {
            seat_ai(&mut room, &bank, None, Some("Calm Chef".into()), &mut rng).unwrap();
        }
        let names = room.participants.keys().cloned().collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["[AI] Calm Chef", "[AI] Calm Chef 2", "[AI] Calm Chef 3"]
        );
        assert!(room.participants.values().all(Participant::is_ai));
    }

    #[test]
    fn start_settings_follow_the_request() {
        let settings = start_settings(StartRoomRequest {
            blue_words: Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            max_rounds: Some(4),
            first_team: Some(crate::dto::room::TeamDto::Blue),
            ..StartRoomRequest::default()
        });
        assert_eq!(settings.first_team, Team::Blue);
        assert_eq!(settings.max_rounds, Some(4));
        assert!(settings.code_words.contains_key(&Team::Blue));
        assert!(!settings.code_words.contains_key(&Team::Red));
    }
}
