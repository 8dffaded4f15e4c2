//! DTO definitions used by the room REST API, the SSE stream and the
//! documentation layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_player_name},
    state::{
        GameError,
        model::{Code, Guess, Target},
        registry,
        room::{
            Contributor, GameVariant, Participant, Room, Round, RoundOutcome, RoundRecord, Team,
        },
        state_machine::{FinishReason, RoundPhase},
    },
};

/// Game variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VariantDto {
    /// Continuous-scale guessing game.
    Scale,
    /// Two-team code game.
    Code,
}

impl From<VariantDto> for GameVariant {
    fn from(value: VariantDto) -> Self {
        match value {
            VariantDto::Scale => GameVariant::Scale,
            VariantDto::Code => GameVariant::Code,
        }
    }
}

impl From<GameVariant> for VariantDto {
    fn from(value: GameVariant) -> Self {
        match value {
            GameVariant::Scale => VariantDto::Scale,
            GameVariant::Code => VariantDto::Code,
        }
    }
}

/// Team colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeamDto {
    Red,
    Blue,
}

impl From<TeamDto> for Team {
    fn from(value: TeamDto) -> Self {
        match value {
            TeamDto::Red => Team::Red,
            TeamDto::Blue => Team::Blue,
        }
    }
}

impl From<Team> for TeamDto {
    fn from(value: Team) -> Self {
        match value {
            Team::Red => TeamDto::Red,
            Team::Blue => TeamDto::Blue,
        }
    }
}

/// Phase exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    Setup,
    ClueGiving,
    Guessing,
    Scoring,
    Finished,
}

impl From<RoundPhase> for VisiblePhase {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::Setup => VisiblePhase::Setup,
            RoundPhase::ClueGiving => VisiblePhase::ClueGiving,
            RoundPhase::Guessing => VisiblePhase::Guessing,
            RoundPhase::Scoring => VisiblePhase::Scoring,
            RoundPhase::Finished => VisiblePhase::Finished,
        }
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinishReasonDto {
    /// Every round was played.
    RoundsCompleted,
    /// `team` communicated enough codes.
    CodesCommunicated { team: TeamDto },
    /// `team` was intercepted too often.
    Intercepted { team: TeamDto },
}

impl From<FinishReason> for FinishReasonDto {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::RoundsCompleted => FinishReasonDto::RoundsCompleted,
            FinishReason::CodesCommunicated(team) => FinishReasonDto::CodesCommunicated {
                team: team.into(),
            },
            FinishReason::Intercepted(team) => FinishReasonDto::Intercepted { team: team.into() },
        }
    }
}

/// A scale point (`0.72`) or code digits (`[3, 1, 4]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum GuessValue {
    /// Position on the scale, within `[0, 1]`.
    Point(f64),
    /// Three digits, each within `[1, 4]`.
    Code(Vec<u8>),
}

impl GuessValue {
    /// Convert into a domain guess, checking the code shape.
    pub fn into_guess(self) -> Result<Guess, GameError> {
        match self {
            GuessValue::Point(value) => Ok(Guess::Scale(value)),
            GuessValue::Code(digits) => Code::from_slice(&digits).map(Guess::Code),
        }
    }
}

impl From<&Guess> for GuessValue {
    fn from(value: &Guess) -> Self {
        match value {
            Guess::Scale(point) => GuessValue::Point(*point),
            Guess::Code(code) => GuessValue::Code(code.digits().to_vec()),
        }
    }
}

impl From<&Target> for GuessValue {
    fn from(value: &Target) -> Self {
        match value {
            Target::Scale(target) => GuessValue::Point(target.point),
            Target::Code(code) => GuessValue::Code(code.digits().to_vec()),
        }
    }
}

/// Payload used to open a new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    pub variant: VariantDto,
    /// AI participants to seat right away (scale game). Defaults to the configured amount.
    #[serde(default)]
    #[validate(range(max = 8))]
    pub ai_players: Option<usize>,
}

/// Payload used to join a room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Required in the code game, ignored in the scale game.
    #[serde(default)]
    pub team: Option<TeamDto>,
}

/// Payload used to seat an AI participant.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct AddAiRequest {
    /// Required in the code game, ignored in the scale game.
    #[serde(default)]
    pub team: Option<TeamDto>,
    /// Personality; a random one is drawn when omitted.
    #[serde(default)]
    #[validate(length(min = 1, max = 32))]
    pub personality: Option<String>,
}

/// A team's four secret words.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CodeWordsRequest {
    /// Words to use; four are drawn from the word bank when omitted.
    #[serde(default)]
    #[validate(length(equal = 4))]
    pub words: Option<Vec<String>>,
}

/// Options applied when the game starts. Every field is optional.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartRoomRequest {
    /// Red team's code words (code game).
    #[serde(default)]
    #[validate(length(equal = 4))]
    pub red_words: Option<Vec<String>>,
    /// Blue team's code words (code game).
    #[serde(default)]
    #[validate(length(equal = 4))]
    pub blue_words: Option<Vec<String>>,
    /// Stop the code game after this many rounds.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_rounds: Option<u32>,
    /// Team giving the first clue (code game). Defaults to red.
    #[serde(default)]
    pub first_team: Option<TeamDto>,
}

/// Clues written by a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitCluesRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Turn the clues are written for, as shown in the room snapshot.
    pub turn: u64,
    /// Scale game: one clue per round. Code game: three clues.
    #[validate(length(min = 1))]
    pub clues: Vec<String>,
}

/// A pending or final guess.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitGuessRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Turn the guess is meant for; guesses for any other turn are refused.
    pub turn: u64,
    pub guess: GuessValue,
}

/// Whose eyes a room snapshot is rendered for.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewerQuery {
    /// Participant name; hidden information stays hidden when omitted.
    pub viewer: Option<String>,
}

/// Random display name suggestion.
#[derive(Debug, Serialize, ToSchema)]
pub struct NameResponse {
    pub name: String,
}

/// Player info as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSnapshot {
    pub name: String,
    pub is_ai: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamDto>,
    pub score: f64,
    /// Points earned in the most recently scored round.
    pub last_score: f64,
}

impl From<&Participant> for ParticipantSnapshot {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            is_ai: participant.is_ai(),
            personality: participant.personality().map(str::to_string),
            team: participant.team.map(Into::into),
            score: participant.score,
            last_score: participant.last_score,
        }
    }
}

/// Two ends of a scale.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScalePairDto {
    pub left: String,
    pub right: String,
}

/// A round as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    pub index: u32,
    pub turn: u64,
    pub clue_giver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_team: Option<TeamDto>,
    /// Scale game only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScalePairDto>,
    /// Hidden target; present once scored, or for the clue-giver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<GuessValue>,
    pub clues: Vec<String>,
    /// Guesses keyed by participant name (scale) or team (code).
    pub guesses: BTreeMap<String, GuessValue>,
    /// Contributors whose guess is final.
    pub submitted: Vec<String>,
    /// Explanations given with final guesses, keyed like `guesses`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub reasons: BTreeMap<String, String>,
}

impl RoundSnapshot {
    fn build(round: &Round, reveal_target: bool, show_guesses: bool) -> Self {
        Self {
            index: round.index,
            turn: round.turn,
            clue_giver: round.clue_giver.clone(),
            active_team: round.active_team.map(Into::into),
            scale: match &round.target {
                Target::Scale(target) => Some(ScalePairDto {
                    left: target.scale.left.clone(),
                    right: target.scale.right.clone(),
                }),
                Target::Code(_) => None,
            },
            target: reveal_target.then(|| GuessValue::from(&round.target)),
            clues: round.clues.clone(),
            guesses: if show_guesses {
                round
                    .guesses
                    .iter()
                    .map(|(contributor, guess)| (contributor.label(), guess.into()))
                    .collect()
            } else {
                BTreeMap::new()
            },
            submitted: round.submitted.iter().map(Contributor::label).collect(),
            reasons: if show_guesses {
                round
                    .reasons
                    .iter()
                    .map(|(contributor, reason)| (contributor.label(), reason.clone()))
                    .collect()
            } else {
                BTreeMap::new()
            },
        }
    }
}

/// Score changes of a scored round.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeDto {
    Scale {
        deltas: BTreeMap<String, f64>,
        clue_giver_bonus: f64,
    },
    Code {
        communicated: bool,
        intercepted: bool,
    },
}

impl From<&RoundOutcome> for OutcomeDto {
    fn from(value: &RoundOutcome) -> Self {
        match value {
            RoundOutcome::Scale {
                deltas,
                clue_giver_bonus,
            } => OutcomeDto::Scale {
                deltas: deltas.clone(),
                clue_giver_bonus: *clue_giver_bonus,
            },
            RoundOutcome::Code {
                communicated,
                intercepted,
            } => OutcomeDto::Code {
                communicated: *communicated,
                intercepted: *intercepted,
            },
        }
    }
}

/// Archived round with its outcome; targets are always revealed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundRecordSnapshot {
    pub round: RoundSnapshot,
    pub outcome: OutcomeDto,
}

impl From<&RoundRecord> for RoundRecordSnapshot {
    fn from(record: &RoundRecord) -> Self {
        Self {
            round: RoundSnapshot::build(&record.round, true, true),
            outcome: (&record.outcome).into(),
        }
    }
}

/// One of the viewer's own scale slots.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotSnapshot {
    pub round: u32,
    pub left: String,
    pub right: String,
    pub point: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clue: Option<String>,
}

/// Scale game bookkeeping.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScaleSnapshot {
    pub total_rounds: u32,
    /// Sum of every clue-giver bonus so far.
    pub room_score: f64,
    /// Participants who wrote all their clues.
    pub clue_writers: Vec<String>,
    /// The viewer's own slots; empty for spectators.
    pub slots: Vec<SlotSnapshot>,
}

/// One code-game team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSnapshot {
    pub team: TeamDto,
    pub members: Vec<String>,
    pub successful_codes: u32,
    pub interceptions: u32,
    /// Visible to the team's own members, and to everyone once the game is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_words: Option<Vec<String>>,
}

/// Code game bookkeeping.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CodeSnapshot {
    pub active_team: TeamDto,
    pub first_team: TeamDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamDto>,
    pub teams: Vec<TeamSnapshot>,
}

/// A room as seen by one viewer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    pub code: String,
    pub variant: VariantDto,
    pub phase: VisiblePhase,
    /// Number of phase transitions so far.
    pub version: usize,
    pub turn: u64,
    pub round_index: u32,
    pub participants: Vec<ParticipantSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundSnapshot>,
    /// Contributors the current phase still waits for.
    pub pending: Vec<String>,
    pub history: Vec<RoundRecordSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_game: Option<CodeSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReasonDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl RoomSnapshot {
    /// Render `room` for `viewer`; unknown viewers are treated as spectators.
    pub fn for_viewer(room: &Room, viewer: Option<&str>) -> Self {
        let viewer = viewer.and_then(|name| room.participants.get(name.trim()));
        let finished = room.phase() == RoundPhase::Finished;

        let current_round = room.open_round.as_ref().map(|round| {
            let is_clue_giver = viewer.is_some_and(|viewer| viewer.name == round.clue_giver);
            RoundSnapshot::build(round, is_clue_giver, room.variant() == GameVariant::Scale)
        });

        let scale = room.scale().map(|game| {
            let position = viewer.and_then(|viewer| game.rotation_index(&viewer.name));
            ScaleSnapshot {
                total_rounds: game.total_rounds,
                room_score: game.room_score,
                clue_writers: game.clue_writers.iter().cloned().collect(),
                slots: position
                    .map(|position| {
                        game.slots
                            .iter()
                            .enumerate()
                            .filter_map(|(round, slots)| {
                                let slot = slots.get(position)?;
                                Some(SlotSnapshot {
                                    round: round as u32,
                                    left: slot.target.scale.left.clone(),
                                    right: slot.target.scale.right.clone(),
                                    point: slot.target.point,
                                    clue: slot.clue.clone(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        });

        let code_game = room.code_game().map(|game| CodeSnapshot {
            active_team: game.active_team.into(),
            first_team: game.first_team.into(),
            max_rounds: game.max_rounds,
            winner: game.winner.map(Into::into),
            teams: Team::ALL
                .into_iter()
                .map(|team| {
                    let state = game.team(team);
                    let can_see = finished || viewer.is_some_and(|viewer| viewer.team == Some(team));
                    TeamSnapshot {
                        team: team.into(),
                        members: room
                            .team_members(team)
                            .map(|member| member.name.clone())
                            .collect(),
                        successful_codes: state.successful_codes,
                        interceptions: state.interceptions,
                        code_words: can_see.then(|| state.code_words.clone()),
                    }
                })
                .collect(),
        });

        Self {
            code: room.code.clone(),
            variant: room.variant().into(),
            phase: room.phase().into(),
            version: room.version(),
            turn: room.turn,
            round_index: room.round_index,
            participants: room.participants.values().map(Into::into).collect(),
            current_round,
            pending: registry::pending_contributors(room)
                .iter()
                .map(Contributor::label)
                .collect(),
            history: room.history.iter().map(Into::into).collect(),
            scale,
            code_game,
            finish_reason: room.state_machine().finish_reason().map(Into::into),
            created_at: format_system_time(room.created_at),
            updated_at: format_system_time(room.updated_at),
        }
    }
}
