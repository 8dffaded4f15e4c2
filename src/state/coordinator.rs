//! Turn coordination: accepts clues and guesses, drives the room state machine
//! and opens the next round once a quorum has been scored.
//!
//! Every action validates first and mutates second, so a rejected action
//! leaves the room exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::WordBank,
    state::{
        errors::GameError,
        model::{
            CODE_LENGTH, Code, Guess, GuessAnswer, NEUTRAL_GUESS, ScalePair, ScaleTarget, Target,
            validate_clues, validate_code_words, validate_scale_guess,
        },
        registry,
        room::{
            Contributor, GameRules, GameVariant, Participant, Room, Round, RoundOutcome,
            RoundRecord, ScaleGame, ScaleSlot, Team,
        },
        scoring::{self, INTERCEPTIONS_TO_LOSE},
        state_machine::{FinishReason, RoundEvent, RoundPhase},
    },
};

/// Options applied when a room leaves setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSettings {
    /// Code words per team; teams without an entry keep theirs or get a random draw.
    pub code_words: BTreeMap<Team, Vec<String>>,
    /// Optional cap on the number of code-game rounds.
    pub max_rounds: Option<u32>,
    /// Team that gives the first clue in the code game.
    pub first_team: Team,
}

impl Default for StartSettings {
    fn default() -> Self {
        Self {
            code_words: BTreeMap::new(),
            max_rounds: None,
            first_team: Team::Red,
        }
    }
}

/// Contribution an AI participant has to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum AiJob {
    /// One clue per owned scale slot, in round order.
    ScaleClues {
        /// Personality handed to the provider.
        personality: String,
        /// Targets of the participant's slots.
        targets: Vec<ScaleTarget>,
    },
    /// Three clues hinting at the digits of `code`.
    CodeClues {
        /// Personality handed to the provider.
        personality: String,
        /// The clue-giver's team words; digit `n` refers to `code_words[n - 1]`.
        code_words: Vec<String>,
        /// Code to encode.
        code: Code,
    },
    /// A point on `scale` matching `clue`.
    ScaleGuess {
        /// Personality handed to the provider.
        personality: String,
        /// Scale the hidden point lives on.
        scale: ScalePair,
        /// Clue written by the clue-giver.
        clue: String,
    },
    /// The opposing team's code, from its clues and earlier turns.
    CodeGuess {
        /// Personality handed to the provider.
        personality: String,
        /// Team the guess is recorded for.
        guessing_team: Team,
        /// Clues of the open round.
        clues: Vec<String>,
        /// Earlier clues of the same team with the codes they encoded.
        history: Vec<(Vec<String>, Code)>,
    },
}

/// Which half of a turn an AI job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiStage {
    /// Clue writing.
    Clues,
    /// Guessing.
    Guess,
}

impl AiJob {
    /// Stage the job contributes to.
    pub fn stage(&self) -> AiStage {
        match self {
            AiJob::ScaleClues { .. } | AiJob::CodeClues { .. } => AiStage::Clues,
            AiJob::ScaleGuess { .. } | AiJob::CodeGuess { .. } => AiStage::Guess,
        }
    }
}

/// Work item handed to the AI supervisor once the room lock is released.
#[derive(Debug, Clone, PartialEq)]
pub struct AiTask {
    /// Unique task identifier, used in logs.
    pub id: Uuid,
    /// Room code.
    pub room: String,
    /// Turn the task was created for.
    pub turn: u64,
    /// AI participant producing the contribution.
    pub participant: String,
    /// What to produce.
    pub job: AiJob,
}

/// Number of scale-game rounds for `participants` players: 3, 2 from four
/// players, 1 from six.
pub fn scale_round_count(participants: usize) -> u32 {
    3 - u32::from(participants >= 4) - u32::from(participants >= 6)
}

impl Room {
    /// Add a participant. Only allowed during setup; names are unique per room.
    pub fn join(&mut self, mut participant: Participant) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Setup, "participants can only join during setup")?;

        participant.name = participant.name.trim().to_string();
        if participant.name.is_empty() {
            return Err(GameError::InvalidInput("name must not be empty".into()));
        }
        if self.participants.contains_key(&participant.name) {
            return Err(GameError::InvalidInput(format!(
                "name `{}` is already taken",
                participant.name
            )));
        }

        match self.variant() {
            GameVariant::Code if participant.team.is_none() => {
                return Err(GameError::InvalidInput(
                    "code game participants must pick a team".into(),
                ));
            }
            GameVariant::Code => {}
            GameVariant::Scale => participant.team = None,
        }

        debug!(room = %self.code, participant = %participant.name, ai = participant.is_ai(), "participant joined");
        self.participants
            .insert(participant.name.clone(), participant);
        Ok(())
    }

    /// Replace a team's four code words before the game starts.
    pub fn set_code_words(&mut self, team: Team, words: Vec<String>) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Setup, "code words are fixed once the game started")?;
        let words = validate_code_words(words)?;
        let GameRules::Code(game) = &mut self.rules else {
            return Err(GameError::InvalidInput(
                "code words only exist in the code game".into(),
            ));
        };
        game.team_mut(team).code_words = words;
        Ok(())
    }

    /// Leave setup and open the first round, returning the AI work it creates.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        settings: StartSettings,
        bank: &WordBank,
        rng: &mut R,
    ) -> Result<Vec<AiTask>, GameError> {
        self.machine.check(RoundEvent::Start)?;
        match self.variant() {
            GameVariant::Scale => self.start_scale(bank, rng),
            GameVariant::Code => self.start_code(settings, bank, rng),
        }
    }

    /// Record clues from `name` for the open round, numbered `turn`.
    ///
    /// Scale game: every participant writes one clue per round for their own
    /// slots, all at once. Code game: the clue-giver writes exactly three.
    pub fn submit_clues(
        &mut self,
        name: &str,
        turn: u64,
        clues: Vec<String>,
    ) -> Result<Vec<AiTask>, GameError> {
        self.ensure_participant(name)?;
        self.ensure_phase(RoundPhase::ClueGiving, "clues are accepted during clue giving")?;
        self.ensure_turn(turn)?;

        match &mut self.rules {
            GameRules::Scale(game) => {
                if game.clue_writers.contains(name) {
                    return Err(GameError::InvalidPhase(format!(
                        "`{name}` already wrote their clues"
                    )));
                }
                let position = game.rotation_index(name).ok_or_else(|| {
                    GameError::NotAllowed(format!("`{name}` joined after the game started"))
                })?;
                let clues = validate_clues(clues, game.total_rounds as usize)?;

                for (round, clue) in game.slots.iter_mut().zip(clues) {
                    if let Some(slot) = round.get_mut(position) {
                        slot.clue = Some(clue);
                    }
                }
                game.clue_writers.insert(name.to_string());
                info!(room = %self.code, participant = name, "clues written");
            }
            GameRules::Code(_) => {
                let round = self
                    .open_round
                    .as_mut()
                    .ok_or_else(|| GameError::InvalidPhase("no round is open".into()))?;
                if round.clue_giver != name {
                    return Err(GameError::NotAllowed(format!(
                        "only `{}` gives clues this turn",
                        round.clue_giver
                    )));
                }
                round.clues = validate_clues(clues, CODE_LENGTH)?;
                info!(room = %self.code, turn = round.turn, participant = name, "clues given");
            }
        }

        if registry::is_complete(self) {
            self.enter_guessing()
        } else {
            Ok(Vec::new())
        }
    }

    /// Move a pending scale guess without submitting it.
    pub fn update_guess(
        &mut self,
        name: &str,
        turn: u64,
        guess: Guess,
    ) -> Result<(), GameError> {
        self.ensure_participant(name)?;
        self.ensure_phase(RoundPhase::Guessing, "guesses are accepted while guessing")?;
        self.ensure_turn(turn)?;
        if self.variant() != GameVariant::Scale {
            return Err(GameError::InvalidGuess(
                "live guess updates exist only in the scale game".into(),
            ));
        }
        let Guess::Scale(value) = guess else {
            return Err(GameError::InvalidGuess(
                "only scale guesses can be updated".into(),
            ));
        };
        let value = validate_scale_guess(value)?;

        let round = self
            .open_round
            .as_mut()
            .ok_or_else(|| GameError::InvalidPhase("no round is open".into()))?;
        if round.clue_giver == name {
            return Err(GameError::NotAllowed(
                "the clue-giver does not guess".into(),
            ));
        }
        let contributor = Contributor::Participant(name.to_string());
        if round.submitted.contains(&contributor) {
            return Err(GameError::InvalidPhase(format!(
                "`{name}` already submitted a guess this turn"
            )));
        }

        round.guesses.insert(contributor, Guess::Scale(value));
        Ok(())
    }

    /// Submit a final guess for turn `turn`. Scores the turn once every
    /// required contributor is in.
    ///
    /// In the code game the guess is recorded for the submitter's team: the
    /// opposing team's guess is the one the turn waits for, while a member of
    /// the active team may record the optional own-team guess.
    pub fn submit_guess<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        turn: u64,
        answer: impl Into<GuessAnswer>,
        rng: &mut R,
    ) -> Result<Vec<AiTask>, GameError> {
        let team = self.ensure_participant(name)?.team;
        self.ensure_phase(RoundPhase::Guessing, "guesses are accepted while guessing")?;
        self.ensure_turn(turn)?;

        let answer = answer.into();
        let reason = answer.normalized_reason();
        let guess = match (self.variant(), answer.guess) {
            (GameVariant::Scale, Guess::Scale(value)) => Guess::Scale(validate_scale_guess(value)?),
            (GameVariant::Code, Guess::Code(code)) => Guess::Code(code),
            _ => {
                return Err(GameError::InvalidGuess(
                    "guess does not match the game variant".into(),
                ));
            }
        };

        let contributor = match self.variant() {
            GameVariant::Scale => Contributor::Participant(name.to_string()),
            GameVariant::Code => Contributor::Team(team.ok_or_else(|| {
                GameError::NotAllowed(format!("`{name}` is not on a team"))
            })?),
        };

        let round = self
            .open_round
            .as_mut()
            .ok_or_else(|| GameError::InvalidPhase("no round is open".into()))?;
        if round.clue_giver == name {
            return Err(GameError::NotAllowed(
                "the clue-giver does not guess".into(),
            ));
        }
        if round.submitted.contains(&contributor) {
            return Err(GameError::InvalidPhase(format!(
                "{} already submitted a guess this turn",
                contributor.label()
            )));
        }

        info!(room = %self.code, turn = round.turn, contributor = %contributor.label(), "guess submitted");
        round.guesses.insert(contributor.clone(), guess);
        if let Some(reason) = reason {
            round.reasons.insert(contributor.clone(), reason);
        }
        round.submitted.insert(contributor);

        if registry::is_complete(self) {
            self.finish_turn(rng)
        } else {
            Ok(Vec::new())
        }
    }

    fn ensure_phase(&self, expected: RoundPhase, message: &str) -> Result<(), GameError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(GameError::InvalidPhase(format!(
                "{message}, room is in {phase:?}"
            )))
        }
    }

    /// Contributions must name the open turn.
    fn ensure_turn(&self, turn: u64) -> Result<(), GameError> {
        match &self.open_round {
            Some(round) if round.turn == turn => Ok(()),
            Some(round) => Err(GameError::InvalidPhase(format!(
                "submission is for turn {turn}, but turn {} is open",
                round.turn
            ))),
            None => Err(GameError::InvalidPhase("no round is open".into())),
        }
    }

    fn ensure_participant(&self, name: &str) -> Result<&Participant, GameError> {
        self.participants.get(name).ok_or_else(|| {
            GameError::NotAllowed(format!("`{name}` is not part of room {}", self.code))
        })
    }

    fn start_scale<R: Rng + ?Sized>(
        &mut self,
        bank: &WordBank,
        rng: &mut R,
    ) -> Result<Vec<AiTask>, GameError> {
        if self.participants.len() < 2 {
            return Err(GameError::NotReady(
                "the scale game needs at least 2 participants".into(),
            ));
        }

        let total_rounds = scale_round_count(self.participants.len());
        let rotation = self.participants.keys().cloned().collect::<Vec<_>>();
        let slots: Vec<Vec<ScaleSlot>> = (0..total_rounds)
            .map(|_| {
                rotation
                    .iter()
                    .map(|_| ScaleSlot {
                        target: ScaleTarget::random(rng, &bank.scales),
                        clue: None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        self.machine.apply(RoundEvent::Start)?;
        let game = ScaleGame {
            total_rounds,
            rotation,
            slots,
            ..ScaleGame::default()
        };

        let jobs = self
            .participants
            .values()
            .filter_map(|participant| {
                let personality = participant.personality()?;
                let position = game.rotation_index(&participant.name)?;
                Some((
                    participant.name.clone(),
                    AiJob::ScaleClues {
                        personality: personality.to_string(),
                        targets: game
                            .slots_for(position)
                            .map(|slot| slot.target.clone())
                            .collect(),
                    },
                ))
            })
            .collect::<Vec<_>>();

        self.rules = GameRules::Scale(game);
        self.round_index = 0;
        self.open_round = self.build_scale_round();
        info!(room = %self.code, total_rounds, participants = self.participants.len(), "scale game started");

        Ok(jobs
            .into_iter()
            .map(|(participant, job)| self.ai_task(participant, job))
            .collect())
    }

    fn start_code<R: Rng + ?Sized>(
        &mut self,
        settings: StartSettings,
        bank: &WordBank,
        rng: &mut R,
    ) -> Result<Vec<AiTask>, GameError> {
        if let Some(team) = Team::ALL
            .into_iter()
            .find(|team| self.team_members(*team).next().is_none())
        {
            return Err(GameError::NotReady(format!(
                "team {} has no members",
                team.as_str()
            )));
        }
        if settings.max_rounds == Some(0) {
            return Err(GameError::InvalidInput(
                "max_rounds must be at least 1".into(),
            ));
        }
        let GameRules::Code(current) = &self.rules else {
            return Err(GameError::InvalidInput("room does not host the code game".into()));
        };

        let mut words = BTreeMap::new();
        for team in Team::ALL {
            if let Some(provided) = settings.code_words.get(&team) {
                words.insert(team, validate_code_words(provided.clone())?);
            } else if !current.team(team).code_words.is_empty() {
                words.insert(team, current.team(team).code_words.clone());
            }
        }
        for team in Team::ALL {
            if !words.contains_key(&team) {
                let taken = words.values().flatten().cloned().collect::<Vec<_>>();
                words.insert(team, bank.draw_code_words(rng, &taken));
            }
        }

        self.machine.apply(RoundEvent::Start)?;
        if let GameRules::Code(game) = &mut self.rules {
            for (team, team_words) in words {
                game.team_mut(team).code_words = team_words;
            }
            game.first_team = settings.first_team;
            game.active_team = settings.first_team;
            game.max_rounds = settings.max_rounds;
        }
        self.round_index = 0;
        info!(room = %self.code, first_team = settings.first_team.as_str(), max_rounds = ?settings.max_rounds, "code game started");

        Ok(self.open_code_round(rng))
    }

    fn build_scale_round(&mut self) -> Option<Round> {
        let GameRules::Scale(game) = &self.rules else {
            return None;
        };
        let position = game.clue_giver_index;
        let clue_giver = game.rotation.get(position)?.clone();
        let slot = game.slots.get(self.round_index as usize)?.get(position)?;
        let target = Target::Scale(slot.target.clone());

        self.turn += 1;
        Some(Round {
            index: self.round_index,
            turn: self.turn,
            clue_giver,
            active_team: None,
            target,
            clues: Vec::new(),
            guesses: BTreeMap::new(),
            submitted: BTreeSet::new(),
            reasons: BTreeMap::new(),
            completed: false,
        })
    }

    fn open_code_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<AiTask> {
        let GameRules::Code(game) = &self.rules else {
            return Vec::new();
        };
        let team = game.active_team;
        let team_state = game.team(team);
        let members = self.team_members(team).collect::<Vec<_>>();
        if members.is_empty() {
            return Vec::new();
        }

        let clue_giver = members[team_state.turns_taken % members.len()];
        let code = Code::random(rng);
        let job = clue_giver.personality().map(|personality| AiJob::CodeClues {
            personality: personality.to_string(),
            code_words: team_state.code_words.clone(),
            code,
        });
        let clue_giver = clue_giver.name.clone();

        self.turn += 1;
        debug!(room = %self.code, turn = self.turn, team = team.as_str(), clue_giver = %clue_giver, "code round opened");
        self.open_round = Some(Round {
            index: self.round_index,
            turn: self.turn,
            clue_giver: clue_giver.clone(),
            active_team: Some(team),
            target: Target::Code(code),
            clues: Vec::new(),
            guesses: BTreeMap::new(),
            submitted: BTreeSet::new(),
            reasons: BTreeMap::new(),
            completed: false,
        });

        job.map(|job| self.ai_task(clue_giver, job))
            .into_iter()
            .collect()
    }

    fn enter_guessing(&mut self) -> Result<Vec<AiTask>, GameError> {
        self.machine.apply(RoundEvent::CluesComplete)?;
        Ok(match self.variant() {
            GameVariant::Scale => self.prepare_scale_guessing(),
            GameVariant::Code => self.prepare_code_guessing(),
        })
    }

    /// Copy the slot clue into the round and seed every guesser at the neutral point.
    fn prepare_scale_guessing(&mut self) -> Vec<AiTask> {
        let Some(round) = self.open_round.as_ref() else {
            return Vec::new();
        };
        let Target::Scale(target) = &round.target else {
            return Vec::new();
        };
        let clue = match &self.rules {
            GameRules::Scale(game) => game
                .slots
                .get(round.index as usize)
                .and_then(|slots| slots.get(game.clue_giver_index))
                .and_then(|slot| slot.clue.clone()),
            GameRules::Code(_) => None,
        };

        let guessers = self
            .participants
            .values()
            .filter(|participant| participant.name != round.clue_giver)
            .collect::<Vec<_>>();
        let seeded = guessers
            .iter()
            .map(|participant| {
                (
                    Contributor::Participant(participant.name.clone()),
                    Guess::Scale(NEUTRAL_GUESS),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let jobs = guessers
            .iter()
            .filter_map(|participant| {
                participant.personality().map(|personality| {
                    (
                        participant.name.clone(),
                        AiJob::ScaleGuess {
                            personality: personality.to_string(),
                            scale: target.scale.clone(),
                            clue: clue.clone().unwrap_or_default(),
                        },
                    )
                })
            })
            .collect::<Vec<_>>();

        if let Some(round) = self.open_round.as_mut() {
            round.clues = clue.into_iter().collect();
            round.guesses = seeded;
        }

        jobs.into_iter()
            .map(|(participant, job)| self.ai_task(participant, job))
            .collect()
    }

    /// AI members guess for their team only when the team has no human to do it.
    fn prepare_code_guessing(&mut self) -> Vec<AiTask> {
        let (Some(round), GameRules::Code(game)) = (self.open_round.as_ref(), &self.rules) else {
            return Vec::new();
        };
        let active_team = game.active_team;
        let guessing_team = active_team.opponent();
        if self
            .team_members(guessing_team)
            .any(|participant| !participant.is_ai())
        {
            return Vec::new();
        }
        let Some(guesser) = self.team_members(guessing_team).next() else {
            return Vec::new();
        };
        let Some(personality) = guesser.personality() else {
            return Vec::new();
        };

        let history = self
            .history
            .iter()
            .filter(|record| record.round.active_team == Some(active_team))
            .filter_map(|record| match &record.round.target {
                Target::Code(code) => Some((record.round.clues.clone(), *code)),
                Target::Scale(_) => None,
            })
            .collect();
        let job = AiJob::CodeGuess {
            personality: personality.to_string(),
            guessing_team,
            clues: round.clues.clone(),
            history,
        };
        let guesser = guesser.name.clone();

        vec![self.ai_task(guesser, job)]
    }

    fn finish_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<AiTask>, GameError> {
        self.machine.apply(RoundEvent::QuorumReached)?;
        let mut round = self
            .open_round
            .take()
            .ok_or_else(|| GameError::InvalidPhase("no round is open".into()))?;
        round.completed = true;

        let outcome = scoring::score_round(&round);
        self.apply_outcome(&round, &outcome);
        info!(room = %self.code, turn = round.turn, round = round.index, outcome = ?outcome, "turn scored");
        self.history.push(RoundRecord { round, outcome });

        match self.advance() {
            Some(reason) => {
                self.machine.apply(RoundEvent::Finish(reason))?;
                info!(room = %self.code, reason = ?reason, "game finished");
                Ok(Vec::new())
            }
            None => {
                self.machine.apply(RoundEvent::NextTurn)?;
                match self.variant() {
                    GameVariant::Scale => {
                        // clues were written up front, so guessing starts right away
                        self.open_round = self.build_scale_round();
                        self.enter_guessing()
                    }
                    GameVariant::Code => Ok(self.open_code_round(rng)),
                }
            }
        }
    }

    fn apply_outcome(&mut self, round: &Round, outcome: &RoundOutcome) {
        match (outcome, &mut self.rules) {
            (
                RoundOutcome::Scale {
                    deltas,
                    clue_giver_bonus,
                },
                GameRules::Scale(game),
            ) => {
                for participant in self.participants.values_mut() {
                    let delta = if participant.name == round.clue_giver {
                        *clue_giver_bonus
                    } else {
                        deltas.get(&participant.name).copied().unwrap_or(0.0)
                    };
                    participant.score += delta;
                    participant.last_score = delta;
                }
                game.room_score += clue_giver_bonus;
            }
            (
                RoundOutcome::Code {
                    communicated,
                    intercepted,
                },
                GameRules::Code(game),
            ) => {
                if let Some(team) = round.active_team {
                    let state = game.team_mut(team);
                    if *communicated {
                        state.successful_codes += 1;
                    }
                    if *intercepted {
                        state.interceptions += 1;
                    }
                }
            }
            _ => {}
        }
    }

    /// Move to the next clue-giver, returning why the game ends if it does.
    fn advance(&mut self) -> Option<FinishReason> {
        match &mut self.rules {
            GameRules::Scale(game) => {
                game.clue_giver_index += 1;
                if game.clue_giver_index >= game.rotation.len() {
                    game.clue_giver_index = 0;
                    self.round_index += 1;
                }
                (self.round_index >= game.total_rounds).then_some(FinishReason::RoundsCompleted)
            }
            GameRules::Code(game) => {
                if let Some(winner) = scoring::code_winner(game) {
                    game.winner = Some(winner);
                    let loser = winner.opponent();
                    return Some(if game.team(loser).interceptions >= INTERCEPTIONS_TO_LOSE {
                        FinishReason::Intercepted(loser)
                    } else {
                        FinishReason::CodesCommunicated(winner)
                    });
                }

                let team = game.active_team;
                game.team_mut(team).turns_taken += 1;
                if team != game.first_team {
                    self.round_index += 1;
                }
                game.active_team = team.opponent();

                if game.max_rounds.is_some_and(|max| self.round_index >= max) {
                    game.winner = scoring::code_leader(game);
                    return Some(FinishReason::RoundsCompleted);
                }
                None
            }
        }
    }

    fn ai_task(&self, participant: String, job: AiJob) -> AiTask {
        AiTask {
            id: Uuid::new_v4(),
            room: self.code.clone(),
            turn: self.turn,
            participant,
            job,
        }
    }
}
