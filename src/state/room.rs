use std::{
    collections::{BTreeMap, BTreeSet},
    time::{Instant, SystemTime},
};

use crate::state::{
    model::{Code, Guess, ScaleTarget, Target},
    state_machine::{RoundPhase, RoomStateMachine},
};

/// The two game variants a room can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameVariant {
    /// Continuous-scale guessing game.
    Scale,
    /// Two-team three-digit code game.
    Code,
}

/// Team colour in the code game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Team {
    /// Red team.
    Red,
    /// Blue team.
    Blue,
}

impl Team {
    /// Both teams, in their default play order.
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    /// The other team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Lowercase label used in logs and identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

/// Whether a participant is a person or an AI-driven player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantKind {
    /// Contributions arrive through requests.
    Human,
    /// Contributions are produced by the AI worker.
    Ai {
        /// Personality label handed to the contribution provider.
        personality: String,
    },
}

/// Player info tracked for the lifetime of a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Display name, unique within the room; doubles as the identifier.
    pub name: String,
    /// Human or AI.
    pub kind: ParticipantKind,
    /// Team affiliation (code game only).
    pub team: Option<Team>,
    /// Cumulative score (scale game).
    pub score: f64,
    /// Delta earned in the most recently scored round; overwritten each round.
    pub last_score: f64,
}

impl Participant {
    /// Build a human participant.
    pub fn human(name: impl Into<String>, team: Option<Team>) -> Self {
        Self {
            name: name.into(),
            kind: ParticipantKind::Human,
            team,
            score: 0.0,
            last_score: 0.0,
        }
    }

    /// Build an AI participant with the given personality.
    pub fn ai(name: impl Into<String>, personality: impl Into<String>, team: Option<Team>) -> Self {
        Self {
            name: name.into(),
            kind: ParticipantKind::Ai {
                personality: personality.into(),
            },
            team,
            score: 0.0,
            last_score: 0.0,
        }
    }

    /// True for AI-driven participants.
    pub fn is_ai(&self) -> bool {
        matches!(self.kind, ParticipantKind::Ai { .. })
    }

    /// Personality label for AI participants.
    pub fn personality(&self) -> Option<&str> {
        match &self.kind {
            ParticipantKind::Ai { personality } => Some(personality),
            ParticipantKind::Human => None,
        }
    }
}

/// Identity under which a contribution is recorded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Contributor {
    /// A single participant (scale game).
    Participant(String),
    /// A whole team (code game).
    Team(Team),
}

impl Contributor {
    /// Human-readable label used as a map key in snapshots.
    pub fn label(&self) -> String {
        match self {
            Contributor::Participant(name) => name.clone(),
            Contributor::Team(team) => team.as_str().to_string(),
        }
    }
}

/// One clue-giver's clue → guess → score cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Round index the turn belongs to.
    pub index: u32,
    /// Room-wide turn number, strictly increasing.
    pub turn: u64,
    /// Participant producing the clue(s).
    pub clue_giver: String,
    /// Team producing the clue(s) (code game only).
    pub active_team: Option<Team>,
    /// Hidden target, immutable once the round exists.
    pub target: Target,
    /// Clue(s) for the target.
    pub clues: Vec<String>,
    /// Guesses keyed by contributor, including pending (not yet submitted) ones.
    pub guesses: BTreeMap<Contributor, Guess>,
    /// Contributors whose guess is final.
    pub submitted: BTreeSet<Contributor>,
    /// Explanations given with final guesses.
    pub reasons: BTreeMap<Contributor, String>,
    /// Set once the round has been scored.
    pub completed: bool,
}

/// Score changes produced by scoring a round.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Scale game deltas.
    Scale {
        /// Points per guesser.
        deltas: BTreeMap<String, f64>,
        /// Average of the guessers' points, credited to the clue-giver.
        clue_giver_bonus: f64,
    },
    /// Code game result.
    Code {
        /// The active team's code came across.
        communicated: bool,
        /// The opposing team cracked the code.
        intercepted: bool,
    },
}

/// Archived, scored round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    /// The round as it stood when scored.
    pub round: Round,
    /// What scoring produced.
    pub outcome: RoundOutcome,
}

/// A pre-allocated scale target and the clue its owner wrote for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSlot {
    /// Hidden scale point.
    pub target: ScaleTarget,
    /// Clue, once written.
    pub clue: Option<String>,
}

/// Scale game bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleGame {
    /// Number of rounds computed at start from the participant count.
    pub total_rounds: u32,
    /// Participants in clue-giving order (sorted by name), fixed at start.
    pub rotation: Vec<String>,
    /// Slots indexed by `[round][rotation position]`.
    pub slots: Vec<Vec<ScaleSlot>>,
    /// Participants who have written all their clues.
    pub clue_writers: BTreeSet<String>,
    /// Position of the current clue-giver in [`Self::rotation`].
    pub clue_giver_index: usize,
    /// Cooperative total: sum of every clue-giver bonus.
    pub room_score: f64,
}

impl ScaleGame {
    /// Position of `name` in the rotation.
    pub fn rotation_index(&self, name: &str) -> Option<usize> {
        self.rotation.iter().position(|member| member == name)
    }

    /// Slots owned by the participant at `position`, one per round.
    pub fn slots_for(&self, position: usize) -> impl Iterator<Item = &ScaleSlot> {
        self.slots.iter().filter_map(move |round| round.get(position))
    }
}

/// Per-team state in the code game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamState {
    /// The team's four secret words.
    pub code_words: Vec<String>,
    /// Codes the team got across.
    pub successful_codes: u32,
    /// Times the team's code was intercepted.
    pub interceptions: u32,
    /// Number of turns the team has had, used to rotate its clue-giver.
    pub turns_taken: usize,
}

/// Code game bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeGame {
    /// State of both teams.
    pub teams: BTreeMap<Team, TeamState>,
    /// Team whose turn it is.
    pub active_team: Team,
    /// Team that opened the game; a round ends when the other team finishes.
    pub first_team: Team,
    /// Optional cap on the number of rounds.
    pub max_rounds: Option<u32>,
    /// Winning team once decided.
    pub winner: Option<Team>,
}

impl Default for CodeGame {
    fn default() -> Self {
        Self {
            teams: Team::ALL
                .into_iter()
                .map(|team| (team, TeamState::default()))
                .collect(),
            active_team: Team::Red,
            first_team: Team::Red,
            max_rounds: None,
            winner: None,
        }
    }
}

impl CodeGame {
    /// Borrow a team's state.
    pub fn team(&self, team: Team) -> &TeamState {
        // both teams are inserted on construction
        &self.teams[&team]
    }

    /// Mutably borrow a team's state.
    pub fn team_mut(&mut self, team: Team) -> &mut TeamState {
        self.teams.entry(team).or_default()
    }
}

/// Variant-specific room state.
#[derive(Debug, Clone, PartialEq)]
pub enum GameRules {
    /// Scale game state.
    Scale(ScaleGame),
    /// Code game state.
    Code(CodeGame),
}

/// One independent game instance.
#[derive(Debug, Clone)]
pub struct Room {
    /// Six-character room code.
    pub code: String,
    pub(crate) machine: RoomStateMachine,
    /// Participants keyed by name; iteration order is the rotation order.
    pub participants: BTreeMap<String, Participant>,
    /// Current round index.
    pub round_index: u32,
    /// Number of turns opened so far.
    pub turn: u64,
    /// The round currently being played, if any.
    pub open_round: Option<Round>,
    /// Every scored round, oldest first. Never truncated.
    pub history: Vec<RoundRecord>,
    /// Variant-specific state.
    pub rules: GameRules,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the room changed.
    pub updated_at: SystemTime,
    pub(crate) last_activity: Instant,
}

impl Room {
    /// Build an empty room in the setup phase.
    pub fn new(code: impl Into<String>, variant: GameVariant) -> Self {
        let rules = match variant {
            GameVariant::Scale => GameRules::Scale(ScaleGame::default()),
            GameVariant::Code => GameRules::Code(CodeGame::default()),
        };
        let now = SystemTime::now();
        Self {
            code: code.into(),
            machine: RoomStateMachine::new(),
            participants: BTreeMap::new(),
            round_index: 0,
            turn: 0,
            open_round: None,
            history: Vec::new(),
            rules,
            created_at: now,
            updated_at: now,
            last_activity: Instant::now(),
        }
    }

    /// Game variant hosted by the room.
    pub fn variant(&self) -> GameVariant {
        match self.rules {
            GameRules::Scale(_) => GameVariant::Scale,
            GameRules::Code(_) => GameVariant::Code,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.machine.phase()
    }

    /// Number of phase transitions applied so far.
    pub fn version(&self) -> usize {
        self.machine.version()
    }

    /// Borrow the state machine read-only.
    pub fn state_machine(&self) -> &RoomStateMachine {
        &self.machine
    }

    /// Scale game state, when the room hosts one.
    pub fn scale(&self) -> Option<&ScaleGame> {
        match &self.rules {
            GameRules::Scale(game) => Some(game),
            GameRules::Code(_) => None,
        }
    }

    /// Code game state, when the room hosts one.
    pub fn code_game(&self) -> Option<&CodeGame> {
        match &self.rules {
            GameRules::Code(game) => Some(game),
            GameRules::Scale(_) => None,
        }
    }

    /// Current clue-giver, if a round is open.
    pub fn clue_giver(&self) -> Option<&str> {
        self.open_round
            .as_ref()
            .map(|round| round.clue_giver.as_str())
    }

    /// Members of `team`, in name order.
    pub fn team_members(&self, team: Team) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(move |participant| participant.team == Some(team))
    }

    /// Mark the room as active right now.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
        self.last_activity = Instant::now();
    }

    /// Time elapsed since the room was last touched.
    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_activity)
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&mut self, at: Instant) {
        self.last_activity = at;
    }
}

/// Pick the code for the open round (code game), if any.
pub fn open_code(room: &Room) -> Option<Code> {
    match room.open_round.as_ref().map(|round| &round.target) {
        Some(Target::Code(code)) => Some(*code),
        _ => None,
    }
}
