//! Application-level configuration loading: word bank, AI retry policy and room lifecycle.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::{Rng, seq::IndexedRandom};
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::model::{CODE_WORDS_PER_TEAM, ScalePair};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WAIVELENGTH_BACK_CONFIG_PATH";
/// Prefix marking AI participants in player lists.
pub const AI_NAME_PREFIX: &str = "[AI] ";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    words: WordBank,
    ai: AiPolicy,
    rooms: RoomPolicy,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        scales = app_config.words.scales.len(),
                        code_words = app_config.words.code_words.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Replace the AI policy, mostly useful for tests that need short backoffs.
    pub fn with_ai_policy(mut self, ai: AiPolicy) -> Self {
        self.ai = ai;
        self
    }

    /// Replace the room policy.
    pub fn with_room_policy(mut self, rooms: RoomPolicy) -> Self {
        self.rooms = rooms;
        self
    }

    /// Static word and scale lists.
    pub fn words(&self) -> &WordBank {
        &self.words
    }

    /// Retry contract enforced on AI contributions.
    pub fn ai(&self) -> &AiPolicy {
        &self.ai
    }

    /// Room lifecycle settings.
    pub fn rooms(&self) -> &RoomPolicy {
        &self.rooms
    }
}

/// Read-only word lists shared by every room.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBank {
    /// Nouns for random player names.
    pub nouns: Vec<String>,
    /// Adjectives for random player and AI names.
    pub adjectives: Vec<String>,
    /// Personas AI participants are modelled after.
    pub ai_personas: Vec<String>,
    /// Pool code-game words are drawn from.
    pub code_words: Vec<String>,
    /// Scales scale-game targets are drawn from.
    pub scales: Vec<ScalePair>,
}

impl Default for WordBank {
    fn default() -> Self {
        Self {
            nouns: to_strings(DEFAULT_NOUNS),
            adjectives: to_strings(DEFAULT_ADJECTIVES),
            ai_personas: to_strings(DEFAULT_AI_PERSONAS),
            code_words: to_strings(DEFAULT_CODE_WORDS),
            scales: DEFAULT_SCALES
                .iter()
                .map(|(left, right)| ScalePair::new(*left, *right))
                .collect(),
        }
    }
}

impl WordBank {
    /// Random `"<adjective> <noun>"` display name.
    pub fn random_player_name<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!(
            "{} {}",
            pick(&self.adjectives, rng, "Mystery"),
            pick(&self.nouns, rng, "Guest")
        )
    }

    /// Random AI personality, `"<adjective> <persona>"`.
    pub fn random_ai_personality<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!(
            "{} {}",
            pick(&self.adjectives, rng, "Curious"),
            pick(&self.ai_personas, rng, "Robot")
        )
    }

    /// Draw four distinct code words, avoiding any word listed in `taken`.
    pub fn draw_code_words<R: Rng + ?Sized>(&self, rng: &mut R, taken: &[String]) -> Vec<String> {
        let available = self
            .code_words
            .iter()
            .filter(|word| !taken.iter().any(|used| used.eq_ignore_ascii_case(word)))
            .collect::<Vec<_>>();

        let mut words = available
            .choose_multiple(rng, CODE_WORDS_PER_TEAM)
            .map(|word| (*word).clone())
            .collect::<Vec<_>>();

        // tiny custom pools: pad with numbered words so a team always gets four
        let mut filler = 1;
        while words.len() < CODE_WORDS_PER_TEAM {
            let candidate = format!("word{filler}");
            filler += 1;
            if !words.contains(&candidate) && !taken.contains(&candidate) {
                words.push(candidate);
            }
        }
        words
    }
}

/// Retry contract enforced on AI contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiPolicy {
    /// Provider attempts before falling back.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
    /// Upper bound on a single provider call.
    pub attempt_timeout: Duration,
}

impl Default for AiPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(20),
        }
    }
}

/// Room lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPolicy {
    /// Rooms untouched for longer than this are evicted.
    pub idle_ttl: Duration,
    /// Interval between eviction sweeps.
    pub sweep_interval: Duration,
    /// AI participants added to a new scale room when the request does not say.
    pub default_scale_ai_players: usize,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(2 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
            default_scale_ai_players: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    words: RawWords,
    ai: RawAi,
    rooms: RawRooms,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWords {
    nouns: Vec<String>,
    adjectives: Vec<String>,
    ai_personas: Vec<String>,
    code_words: Vec<String>,
    scales: Vec<(String, String)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAi {
    max_attempts: Option<u32>,
    backoff_ms: Option<u64>,
    attempt_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRooms {
    idle_ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    default_scale_ai_players: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            words: value.words.into(),
            ai: value.ai.into(),
            rooms: value.rooms.into(),
        }
    }
}

impl From<RawWords> for WordBank {
    fn from(value: RawWords) -> Self {
        let defaults = WordBank::default();
        let or_default = |list: Vec<String>, fallback: Vec<String>| {
            let list = list
                .into_iter()
                .map(|word| word.trim().to_string())
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>();
            if list.is_empty() { fallback } else { list }
        };

        let scales = value
            .scales
            .into_iter()
            .filter(|(left, right)| !left.trim().is_empty() && !right.trim().is_empty())
            .map(|(left, right)| ScalePair::new(left.trim(), right.trim()))
            .collect::<Vec<_>>();

        Self {
            nouns: or_default(value.nouns, defaults.nouns),
            adjectives: or_default(value.adjectives, defaults.adjectives),
            ai_personas: or_default(value.ai_personas, defaults.ai_personas),
            code_words: or_default(value.code_words, defaults.code_words),
            scales: if scales.is_empty() {
                defaults.scales
            } else {
                scales
            },
        }
    }
}

impl From<RawAi> for AiPolicy {
    fn from(value: RawAi) -> Self {
        let defaults = AiPolicy::default();
        Self {
            max_attempts: value.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            backoff: value
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
            attempt_timeout: value
                .attempt_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.attempt_timeout),
        }
    }
}

impl From<RawRooms> for RoomPolicy {
    fn from(value: RawRooms) -> Self {
        let defaults = RoomPolicy::default();
        Self {
            idle_ttl: value
                .idle_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_ttl),
            sweep_interval: value
                .sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval)
                .max(Duration::from_secs(1)),
            default_scale_ai_players: value
                .default_scale_ai_players
                .unwrap_or(defaults.default_scale_ai_players),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn pick<'a, R: Rng + ?Sized>(list: &'a [String], rng: &mut R, fallback: &'a str) -> &'a str {
    list.choose(rng).map(String::as_str).unwrap_or(fallback)
}

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|word| word.to_string()).collect()
}

const DEFAULT_NOUNS: &[&str] = &[
    "Otter", "Falcon", "Teapot", "Comet", "Lantern", "Walrus", "Cactus", "Nebula", "Pretzel",
    "Harbor", "Meadow", "Glacier", "Piano", "Badger", "Compass", "Volcano", "Pebble", "Kettle",
    "Orchid", "Rocket",
];

const DEFAULT_ADJECTIVES: &[&str] = &[
    "Brave", "Sleepy", "Witty", "Curious", "Grumpy", "Jolly", "Mighty", "Quiet", "Sneaky",
    "Dapper", "Fuzzy", "Lucky", "Nimble", "Sunny", "Zesty", "Bold", "Gentle", "Clever", "Wild",
    "Calm",
];

const DEFAULT_AI_PERSONAS: &[&str] = &[
    "Pirate",
    "Poet",
    "Detective",
    "Astronaut",
    "Chef",
    "Philosopher",
    "Wizard",
    "Sports Commentator",
    "Librarian",
    "Cowboy",
];

const DEFAULT_CODE_WORDS: &[&str] = &[
    "Apple", "Bridge", "Castle", "Dragon", "Engine", "Forest", "Guitar", "Honey", "Island",
    "Jungle", "Kitten", "Ladder", "Mirror", "Needle", "Ocean", "Parrot", "Queen", "River",
    "Shadow", "Tiger", "Umbrella", "Violin", "Window", "Yacht", "Zebra", "Anchor", "Button",
    "Candle", "Desert", "Feather", "Garden", "Hammer", "Igloo", "Jacket", "Kingdom", "Lemon",
    "Magnet", "Night", "Orbit", "Pillow",
];

const DEFAULT_SCALES: &[(&str, &str)] = &[
    ("Cold", "Hot"),
    ("Useless", "Useful"),
    ("Boring", "Exciting"),
    ("Cheap", "Expensive"),
    ("Quiet", "Loud"),
    ("Tiny", "Huge"),
    ("Overrated", "Underrated"),
    ("Scary", "Comforting"),
    ("Old fashioned", "Futuristic"),
    ("Healthy", "Unhealthy"),
    ("Easy to spell", "Hard to spell"),
    ("Soft", "Hard"),
    ("Villain", "Hero"),
    ("Smells bad", "Smells good"),
    ("Forgettable", "Memorable"),
    ("Rural", "Urban"),
    ("Casual", "Formal"),
    ("Slow", "Fast"),
    ("Normal pet", "Exotic pet"),
    ("Sad song", "Happy song"),
];
