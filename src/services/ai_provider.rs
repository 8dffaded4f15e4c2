//! Abstraction over whatever produces AI clues and guesses, plus the built-in
//! heuristic implementation and the deterministic fallbacks used once every
//! attempt has failed.

use futures::future::BoxFuture;
use rand::Rng;
use thiserror::Error;

use crate::state::model::{
    CODE_DIGIT_MAX, CODE_DIGIT_MIN, CODE_LENGTH, Code, Guess, GuessAnswer, NEUTRAL_GUESS,
    ScalePair, ScaleTarget,
};

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error raised by a contribution provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The call did not complete within the attempt timeout.
    #[error("provider timed out")]
    Timeout,
    /// The provider could not be reached or refused the request.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered with something unusable.
    #[error("malformed provider output: {0}")]
    Malformed(String),
}

/// Input for a clue request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClueRequest {
    /// One clue per scale target.
    Scale {
        /// Personality the clue should sound like.
        personality: String,
        /// Targets to describe, in round order.
        targets: Vec<ScaleTarget>,
    },
    /// Three clues, one per digit of `code`.
    Code {
        /// Personality the clues should sound like.
        personality: String,
        /// Team words; digit `n` refers to `code_words[n - 1]`.
        code_words: Vec<String>,
        /// Code to encode.
        code: Code,
    },
}

impl ClueRequest {
    /// Number of clues a valid answer carries.
    pub fn expected_clues(&self) -> usize {
        match self {
            ClueRequest::Scale { targets, .. } => targets.len(),
            ClueRequest::Code { .. } => CODE_LENGTH,
        }
    }
}

/// Input for a guess request.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessRequest {
    /// A point on a scale.
    Scale {
        /// Personality of the guesser.
        personality: String,
        /// Scale to guess on.
        scale: ScalePair,
        /// Clue to interpret.
        clue: String,
    },
    /// The opposing team's code.
    Code {
        /// Personality of the guesser.
        personality: String,
        /// Clues of the open round.
        clues: Vec<String>,
        /// Earlier clues of the same team with the codes they encoded.
        history: Vec<(Vec<String>, Code)>,
    },
}

/// Source of AI contributions.
///
/// Implementations may be slow or fail; the AI supervisor bounds every call
/// with a timeout and retries according to the configured policy.
pub trait ContributionProvider: Send + Sync {
    /// Produce the clues described by `request`.
    fn produce_clues(&self, request: ClueRequest) -> BoxFuture<'static, ProviderResult<Vec<String>>>;
    /// Produce the guess described by `request`, optionally explaining it.
    fn produce_guess(&self, request: GuessRequest)
    -> BoxFuture<'static, ProviderResult<GuessAnswer>>;
}

/// Offline provider producing plausible contributions from simple word rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicProvider;

impl ContributionProvider for HeuristicProvider {
    fn produce_clues(&self, request: ClueRequest) -> BoxFuture<'static, ProviderResult<Vec<String>>> {
        Box::pin(async move {
            match request {
                ClueRequest::Scale { targets, .. } => Ok(targets.iter().map(describe_point).collect()),
                ClueRequest::Code {
                    code_words, code, ..
                } => code
                    .digits()
                    .iter()
                    .map(|digit| {
                        code_word(&code_words, *digit)
                            .map(describe_word)
                            .ok_or_else(|| {
                                ProviderError::Malformed(format!("no code word for digit {digit}"))
                            })
                    })
                    .collect(),
            }
        })
    }

    fn produce_guess(
        &self,
        request: GuessRequest,
    ) -> BoxFuture<'static, ProviderResult<GuessAnswer>> {
        // thread rng is not Send, so draw before building the future
        let answer = match request {
            GuessRequest::Scale { scale, clue, .. } => {
                let point = interpret_clue(&scale, &clue);
                Ok(GuessAnswer::with_reason(
                    Guess::Scale(point),
                    explain_point(&scale, &clue, point),
                ))
            }
            GuessRequest::Code { clues, history, .. } => {
                let (digits, recognised) = decode_clues(&clues, &history, &mut rand::rng());
                Code::new(digits).map(|code| {
                    GuessAnswer::with_reason(
                        Guess::Code(code),
                        format!("recognised {recognised} of {CODE_LENGTH} clues from earlier turns"),
                    )
                })
            }
        };
        Box::pin(async move { answer.map_err(|err| ProviderError::Malformed(err.to_string())) })
    }
}

/// Clues used when the provider never produced usable ones: the first three
/// letters of the nearer scale end, or of the encoded code word.
pub fn fallback_clues(request: &ClueRequest) -> Vec<String> {
    match request {
        ClueRequest::Scale { targets, .. } => targets
            .iter()
            .map(|target| {
                let end = if target.point < NEUTRAL_GUESS {
                    &target.scale.left
                } else {
                    &target.scale.right
                };
                abbreviate(end)
            })
            .collect(),
        ClueRequest::Code {
            code_words, code, ..
        } => code
            .digits()
            .iter()
            .enumerate()
            .map(|(position, digit)| {
                code_word(code_words, *digit)
                    .map(abbreviate)
                    .unwrap_or_else(|| format!("clue {}", position + 1))
            })
            .collect(),
    }
}

/// Guess used when the provider never produced a usable one.
pub fn fallback_guess(request: &GuessRequest) -> Guess {
    match request {
        GuessRequest::Scale { .. } => Guess::Scale(NEUTRAL_GUESS),
        GuessRequest::Code { .. } => Guess::Code(FALLBACK_CODE),
    }
}

const FALLBACK_CODE: Code = Code::ordered();

const INTENSITIES: [(&str, f64); 4] = [
    ("extremely", 0.45),
    ("very", 0.3),
    ("fairly", 0.15),
    ("slightly", 0.07),
];
const BALANCED: &str = "perfectly balanced";

fn describe_point(target: &ScaleTarget) -> String {
    let offset = target.point - NEUTRAL_GUESS;
    if offset.abs() < 0.05 {
        return BALANCED.to_string();
    }
    let end = if offset < 0.0 {
        &target.scale.left
    } else {
        &target.scale.right
    };
    let distance = offset.abs();
    let adverb = INTENSITIES
        .iter()
        .find(|(_, level)| distance >= level - 0.05)
        .map(|(adverb, _)| *adverb)
        .unwrap_or("slightly");
    format!("{adverb} {}", end.to_lowercase())
}

fn interpret_clue(scale: &ScalePair, clue: &str) -> f64 {
    let clue = clue.to_lowercase();
    if clue.contains(BALANCED) {
        return NEUTRAL_GUESS;
    }
    let intensity = INTENSITIES
        .iter()
        .find(|(adverb, _)| clue.split_whitespace().any(|word| word == *adverb))
        .map(|(_, level)| *level)
        .unwrap_or(0.2);

    let mentions = |end: &str| !end.is_empty() && clue.contains(&end.to_lowercase());
    match (mentions(&scale.left), mentions(&scale.right)) {
        (true, false) => NEUTRAL_GUESS - intensity,
        (false, true) => NEUTRAL_GUESS + intensity,
        _ => NEUTRAL_GUESS,
    }
}

fn explain_point(scale: &ScalePair, clue: &str, point: f64) -> String {
    if point < NEUTRAL_GUESS {
        format!("\"{clue}\" leans towards {}", scale.left.to_lowercase())
    } else if point > NEUTRAL_GUESS {
        format!("\"{clue}\" leans towards {}", scale.right.to_lowercase())
    } else {
        format!("\"{clue}\" points at neither end")
    }
}

fn describe_word(word: &str) -> String {
    let letters = word.chars().count();
    match word.chars().last() {
        Some(last) => format!(
            "{letters}-letter word ending in '{}'",
            last.to_lowercase()
        ),
        None => "a word".to_string(),
    }
}

/// Reuse digits of earlier turns whose clue matches; draw the rest.
/// Also returns how many digits came from history.
fn decode_clues<R: Rng + ?Sized>(
    clues: &[String],
    history: &[(Vec<String>, Code)],
    rng: &mut R,
) -> ([u8; CODE_LENGTH], usize) {
    let mut recognised = 0;
    let digits = std::array::from_fn(|position| {
        let clue = clues.get(position).map(|clue| clue.to_lowercase());
        let known = clue.and_then(|clue| {
            history.iter().find_map(|(past_clues, code)| {
                past_clues
                    .iter()
                    .position(|past| past.to_lowercase() == clue)
                    .map(|index| code.digits()[index])
            })
        });
        match known {
            Some(digit) => {
                recognised += 1;
                digit
            }
            None => rng.random_range(CODE_DIGIT_MIN..=CODE_DIGIT_MAX),
        }
    });
    (digits, recognised)
}

fn code_word(code_words: &[String], digit: u8) -> Option<&str> {
    code_words
        .get(usize::from(digit).checked_sub(1)?)
        .map(String::as_str)
}

fn abbreviate(word: &str) -> String {
    let short = word.trim().chars().take(3).collect::<String>();
    if short.is_empty() {
        "???".to_string()
    } else {
        short
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn target(point: f64) -> ScaleTarget {
        ScaleTarget {
            scale: ScalePair::new("Cold", "Hot"),
            point,
        }
    }

    #[tokio::test]
    async fn heuristic_scale_round_trip_lands_on_the_right_side() {
        let provider = HeuristicProvider;
        let clues = provider
            .produce_clues(ClueRequest::Scale {
                personality: "Calm Poet".into(),
                targets: vec![target(0.05), target(0.5), target(0.8)],
            })
            .await
            .unwrap();
        assert_eq!(clues, vec!["extremely cold", BALANCED, "very hot"]);

        let answer = provider
            .produce_guess(GuessRequest::Scale {
                personality: "Calm Poet".into(),
                scale: ScalePair::new("Cold", "Hot"),
                clue: clues[0].clone(),
            })
            .await
            .unwrap();
        let Guess::Scale(value) = answer.guess else {
            panic!("expected scale guess");
        };
        assert!(value < 0.1);
        assert_eq!(
            answer.reason.as_deref(),
            Some("\"extremely cold\" leans towards cold")
        );
    }

    #[tokio::test]
    async fn heuristic_code_clues_describe_each_word() {
        let clues = HeuristicProvider
            .produce_clues(ClueRequest::Code {
                personality: "Wild Pirate".into(),
                code_words: vec!["Apple".into(), "Bridge".into(), "Cat".into(), "Door".into()],
                code: Code::new([3, 1, 3]).unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(
            clues,
            vec![
                "3-letter word ending in 't'",
                "5-letter word ending in 'e'",
                "3-letter word ending in 't'"
            ]
        );
    }

    #[test]
    fn decoding_reuses_history() {
        let history = vec![(
            vec!["furry".to_string(), "wet".to_string(), "tall".to_string()],
            Code::new([2, 4, 1]).unwrap(),
        )];
        let mut rng = StdRng::seed_from_u64(1);
        let (digits, recognised) = decode_clues(
            &["Tall".to_string(), "Furry".to_string(), "Wet".to_string()],
            &history,
            &mut rng,
        );
        assert_eq!(digits, [1, 2, 4]);
        assert_eq!(recognised, 3);

        let (_, recognised) = decode_clues(
            &["Tall".to_string(), "Loud".to_string(), "Wet".to_string()],
            &history,
            &mut rng,
        );
        assert_eq!(recognised, 2);
    }

    #[test]
    fn fallbacks_are_deterministic() {
        let clues = fallback_clues(&ClueRequest::Scale {
            personality: String::new(),
            targets: vec![target(0.1), target(0.9)],
        });
        assert_eq!(clues, vec!["Col", "Hot"]);

        let clues = fallback_clues(&ClueRequest::Code {
            personality: String::new(),
            code_words: vec!["Apple".into(), "Bridge".into(), "Cat".into(), "Door".into()],
            code: Code::new([4, 2, 1]).unwrap(),
        });
        assert_eq!(clues, vec!["Doo", "Bri", "App"]);

        assert_eq!(
            fallback_guess(&GuessRequest::Code {
                personality: String::new(),
                clues: Vec::new(),
                history: Vec::new(),
            }),
            Guess::Code(Code::new([1, 2, 3]).unwrap())
        );
    }
}
