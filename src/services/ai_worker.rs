//! Drives AI participants: every [`AiTask`] is run on its own Tokio task,
//! retried against the provider and fed back through the same room service
//! humans use.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AiPolicy,
    services::{
        ai_provider::{
            ClueRequest, ContributionProvider, GuessRequest, ProviderError, ProviderResult,
            fallback_clues, fallback_guess,
        },
        room_service,
    },
    state::{
        AppState, SharedState,
        coordinator::{AiJob, AiStage, AiTask},
        model::{Guess, GuessAnswer, validate_clues, validate_scale_guess},
        registry,
        room::{Contributor, GameVariant, Room},
        state_machine::RoundPhase,
    },
};

/// Identity of a contribution; at most one task per key runs at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TaskKey {
    room: String,
    turn: u64,
    participant: String,
    stage: AiStage,
}

impl From<&AiTask> for TaskKey {
    fn from(task: &AiTask) -> Self {
        Self {
            room: task.room.clone(),
            turn: task.turn,
            participant: task.participant.clone(),
            stage: task.job.stage(),
        }
    }
}

/// Queue and bookkeeping for AI work, owned by [`AppState`].
pub struct AiSupervisor {
    provider: Arc<dyn ContributionProvider>,
    policy: AiPolicy,
    queue: mpsc::UnboundedSender<AiTask>,
    in_flight: DashMap<TaskKey, Uuid>,
}

impl fmt::Debug for AiSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSupervisor")
            .field("policy", &self.policy)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl AiSupervisor {
    /// Build the supervisor and the receiving end the dispatcher drains.
    pub fn new(
        provider: Arc<dyn ContributionProvider>,
        policy: AiPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<AiTask>) {
        let (queue, receiver) = mpsc::unbounded_channel();
        (
            Self {
                provider,
                policy,
                queue,
                in_flight: DashMap::new(),
            },
            receiver,
        )
    }

    /// Queue tasks, skipping any whose contribution is already being produced.
    pub fn schedule(&self, tasks: Vec<AiTask>) {
        for task in tasks {
            match self.in_flight.entry(TaskKey::from(&task)) {
                Entry::Occupied(existing) => {
                    debug!(task = %task.id, running = %existing.get(), participant = %task.participant, "AI contribution already in flight");
                }
                Entry::Vacant(slot) => {
                    let key = slot.key().clone();
                    slot.insert(task.id);
                    if self.queue.send(task).is_err() {
                        // dispatcher gone, nothing will ever run it
                        self.in_flight.remove(&key);
                    }
                }
            }
        }
    }

    /// Number of AI contributions currently being produced.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn complete(&self, key: &TaskKey) {
        self.in_flight.remove(key);
    }
}

/// Spawn one worker per queued task until the application state is dropped.
pub async fn run_dispatcher(state: Weak<AppState>, mut receiver: mpsc::UnboundedReceiver<AiTask>) {
    while let Some(task) = receiver.recv().await {
        let Some(state) = state.upgrade() else {
            break;
        };
        tokio::spawn(run_task(state, task));
    }
    debug!("AI dispatcher stopped");
}

/// Produce one contribution and submit it, falling back once attempts run out.
async fn run_task(state: SharedState, task: AiTask) {
    let key = TaskKey::from(&task);
    debug!(task = %task.id, room = %task.room, turn = task.turn, participant = %task.participant, stage = ?key.stage, "AI task started");

    let result = match request_for(&task.job) {
        Request::Clues(request) => {
            let provider = state.ai().provider.clone();
            let expected = request.expected_clues();
            let produced = with_retries(
                &state,
                &task,
                || provider.produce_clues(request.clone()),
                |clues| validate_clues(clues, expected).map_err(|err| err.to_string()),
            )
            .await;
            match produced {
                Some(clues) => {
                    let clues = clues.unwrap_or_else(|| fallback_clues(&request));
                    room_service::submit_clues(
                        &state,
                        &task.room,
                        &task.participant,
                        task.turn,
                        clues,
                    )
                    .await
                    .map(drop)
                }
                None => Ok(()),
            }
        }
        Request::Guess(request) => {
            let provider = state.ai().provider.clone();
            let produced = with_retries(
                &state,
                &task,
                || provider.produce_guess(request.clone()),
                |answer| check_guess(&request, answer),
            )
            .await;
            match produced {
                Some(answer) => {
                    let answer = answer.unwrap_or_else(|| fallback_guess(&request).into());
                    room_service::submit_guess(
                        &state,
                        &task.room,
                        &task.participant,
                        task.turn,
                        answer,
                    )
                    .await
                    .map(drop)
                }
                None => Ok(()),
            }
        }
    };

    if let Err(err) = result {
        // the turn moved on while the provider was thinking
        debug!(task = %task.id, participant = %task.participant, error = %err, "discarding AI contribution");
    }
    state.ai().complete(&key);
}

enum Request {
    Clues(ClueRequest),
    Guess(GuessRequest),
}

fn request_for(job: &AiJob) -> Request {
    match job.clone() {
        AiJob::ScaleClues {
            personality,
            targets,
        } => Request::Clues(ClueRequest::Scale {
            personality,
            targets,
        }),
        AiJob::CodeClues {
            personality,
            code_words,
            code,
        } => Request::Clues(ClueRequest::Code {
            personality,
            code_words,
            code,
        }),
        AiJob::ScaleGuess {
            personality,
            scale,
            clue,
        } => Request::Guess(GuessRequest::Scale {
            personality,
            scale,
            clue,
        }),
        AiJob::CodeGuess {
            personality,
            clues,
            history,
            ..
        } => Request::Guess(GuessRequest::Code {
            personality,
            clues,
            history,
        }),
    }
}

/// Call the provider up to `max_attempts` times.
///
/// Returns `None` when the contribution is no longer wanted, `Some(None)` when
/// every attempt failed, and `Some(Some(value))` on success.
async fn with_retries<T, C, V>(
    state: &SharedState,
    task: &AiTask,
    mut call: C,
    validate: V,
) -> Option<Option<T>>
where
    C: FnMut() -> BoxFuture<'static, ProviderResult<T>>,
    V: Fn(T) -> Result<T, String>,
{
    let policy = state.ai().policy;

    for attempt in 1..=policy.max_attempts {
        if !still_wanted(state, task).await {
            debug!(task = %task.id, participant = %task.participant, "AI contribution no longer needed");
            return None;
        }

        let error = match timeout(policy.attempt_timeout, call()).await {
            Ok(Ok(value)) => match validate(value) {
                Ok(value) => {
                    info!(task = %task.id, room = %task.room, participant = %task.participant, attempt, "AI contribution produced");
                    return Some(Some(value));
                }
                Err(message) => ProviderError::Malformed(message),
            },
            Ok(Err(err)) => err,
            Err(_) => ProviderError::Timeout,
        };
        warn!(task = %task.id, room = %task.room, participant = %task.participant, attempt, max_attempts = policy.max_attempts, error = %error, "AI attempt failed");

        if attempt < policy.max_attempts {
            sleep(policy.backoff).await;
        }
    }

    if !still_wanted(state, task).await {
        return None;
    }
    warn!(task = %task.id, room = %task.room, participant = %task.participant, "AI attempts exhausted; using fallback");
    Some(None)
}

fn check_guess(request: &GuessRequest, answer: GuessAnswer) -> Result<GuessAnswer, String> {
    let guess = match (request, answer.guess) {
        (GuessRequest::Scale { .. }, Guess::Scale(value)) => validate_scale_guess(value)
            .map(Guess::Scale)
            .map_err(|err| err.to_string())?,
        (GuessRequest::Code { .. }, Guess::Code(code)) => Guess::Code(code),
        _ => return Err("guess does not match the requested game".into()),
    };
    Ok(GuessAnswer { guess, ..answer })
}

/// Whether the room still waits for this task's contribution.
async fn still_wanted(state: &SharedState, task: &AiTask) -> bool {
    let Some(entry) = state.room(&task.room) else {
        return false;
    };
    let room = entry.room().lock().await;
    is_pending(&room, task)
}

fn is_pending(room: &Room, task: &AiTask) -> bool {
    let phase = match task.job.stage() {
        AiStage::Clues => RoundPhase::ClueGiving,
        AiStage::Guess => RoundPhase::Guessing,
    };
    if room.phase() != phase || room.turn != task.turn {
        return false;
    }

    let contributor = match (room.variant(), &task.job) {
        (GameVariant::Code, AiJob::CodeGuess { guessing_team, .. }) => {
            Contributor::Team(*guessing_team)
        }
        _ => Contributor::Participant(task.participant.clone()),
    };
    !registry::has_contributed(room, &contributor)
}
