//! Value types for round targets and the clue/guess artifacts exchanged about them.

use std::{collections::HashSet, fmt};

use rand::{Rng, seq::IndexedRandom};

use crate::state::errors::GameError;

/// Number of digits in a code-game code.
pub const CODE_LENGTH: usize = 3;
/// Smallest digit a code may contain.
pub const CODE_DIGIT_MIN: u8 = 1;
/// Largest digit a code may contain (one per code word).
pub const CODE_DIGIT_MAX: u8 = 4;
/// Number of secret code words each team owns.
pub const CODE_WORDS_PER_TEAM: usize = 4;
/// Guess every scale-game guesser starts from.
pub const NEUTRAL_GUESS: f64 = 0.5;
/// Upper bound on the length of a single clue.
pub const MAX_CLUE_CHARS: usize = 80;
/// Points awarded for a perfect scale guess.
pub const MAX_SCALE_POINTS: f64 = 100.0;
/// Longest explanation kept alongside a guess.
pub const MAX_REASON_CHARS: usize = 200;

/// Two-ended scale a scale-game target sits on, e.g. "Cold" to "Hot".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalePair {
    /// Label of the `0.0` end.
    pub left: String,
    /// Label of the `1.0` end.
    pub right: String,
}

impl ScalePair {
    /// Build a scale from its two end labels.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Hidden point on a scale the clue-giver must hint at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTarget {
    /// Scale the point lives on.
    pub scale: ScalePair,
    /// Position on the scale, within `[0, 1]`.
    pub point: f64,
}

impl ScaleTarget {
    /// Draw a random scale from `scales` and a uniform point on it.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, scales: &[ScalePair]) -> Self {
        let scale = scales
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| ScalePair::new("Left", "Right"));
        Self {
            scale,
            point: rng.random_range(0.0..=1.0),
        }
    }
}

/// Three-digit code referencing a team's code-word slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code([u8; CODE_LENGTH]);

impl Code {
    /// Build a code, rejecting digits outside `[1, 4]`.
    pub fn new(digits: [u8; CODE_LENGTH]) -> Result<Self, GameError> {
        if let Some(bad) = digits
            .iter()
            .find(|digit| !(CODE_DIGIT_MIN..=CODE_DIGIT_MAX).contains(*digit))
        {
            return Err(GameError::InvalidGuess(format!(
                "code digit {bad} is outside {CODE_DIGIT_MIN}..={CODE_DIGIT_MAX}"
            )));
        }
        Ok(Self(digits))
    }

    /// Build a code from an arbitrary slice, which must hold exactly three digits.
    pub fn from_slice(digits: &[u8]) -> Result<Self, GameError> {
        let digits: [u8; CODE_LENGTH] = digits.try_into().map_err(|_| {
            GameError::InvalidGuess(format!(
                "a code has exactly {CODE_LENGTH} digits, got {}",
                digits.len()
            ))
        })?;
        Self::new(digits)
    }

    /// The `1-2-3` code.
    pub const fn ordered() -> Self {
        Self([1, 2, 3])
    }

    /// Draw three independent digits; duplicates are allowed.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(std::array::from_fn(|_| {
            rng.random_range(CODE_DIGIT_MIN..=CODE_DIGIT_MAX)
        }))
    }

    /// Digits of the code, in order.
    pub fn digits(&self) -> [u8; CODE_LENGTH] {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}-{b}-{c}")
    }
}

/// Hidden ground truth of a round.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Point on a scale.
    Scale(ScaleTarget),
    /// Three-digit code.
    Code(Code),
}

/// A contributed guess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guess {
    /// Position on the scale.
    Scale(f64),
    /// Full three-digit code.
    Code(Code),
}

/// A final guess, with the guesser's explanation when it gave one.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessAnswer {
    /// The guess itself.
    pub guess: Guess,
    /// Free-form explanation, shown next to the guess.
    pub reason: Option<String>,
}

impl GuessAnswer {
    /// Attach `reason` to `guess`.
    pub fn with_reason(guess: Guess, reason: impl Into<String>) -> Self {
        Self {
            guess,
            reason: Some(reason.into()),
        }
    }

    /// The explanation trimmed and cut to [`MAX_REASON_CHARS`]; blank ones are dropped.
    pub fn normalized_reason(&self) -> Option<String> {
        let reason = self.reason.as_deref()?.trim();
        (!reason.is_empty()).then(|| reason.chars().take(MAX_REASON_CHARS).collect())
    }
}

impl From<Guess> for GuessAnswer {
    fn from(guess: Guess) -> Self {
        Self {
            guess,
            reason: None,
        }
    }
}

/// Check that a scale guess is a finite value inside `[0, 1]`.
pub fn validate_scale_guess(value: f64) -> Result<f64, GameError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(GameError::InvalidGuess(format!(
            "scale guesses must lie within [0, 1], got {value}"
        )))
    }
}

/// Points earned by a scale guess: `100 * (1 - |target - guess|)`, clamped to `[0, 100]`.
pub fn scale_score(target: f64, guess: f64) -> f64 {
    (MAX_SCALE_POINTS * (1.0 - (target - guess).abs())).clamp(0.0, MAX_SCALE_POINTS)
}

/// Binary code-game outcome: all three positions must match.
pub fn code_matches(target: &Code, guess: &Code) -> bool {
    target == guess
}

/// Trim and check a batch of clues, which must contain exactly `expected` entries.
pub fn validate_clues(clues: Vec<String>, expected: usize) -> Result<Vec<String>, GameError> {
    if clues.len() != expected {
        return Err(GameError::InvalidClue(format!(
            "expected {expected} clue(s), got {}",
            clues.len()
        )));
    }

    clues
        .into_iter()
        .map(|clue| {
            let clue = clue.trim().to_string();
            if clue.is_empty() {
                return Err(GameError::InvalidClue("clues must not be empty".into()));
            }
            if clue.chars().count() > MAX_CLUE_CHARS {
                return Err(GameError::InvalidClue(format!(
                    "clues are limited to {MAX_CLUE_CHARS} characters"
                )));
            }
            Ok(clue)
        })
        .collect()
}

/// Trim and check a team's code words: four distinct, non-empty words.
pub fn validate_code_words(words: Vec<String>) -> Result<Vec<String>, GameError> {
    if words.len() != CODE_WORDS_PER_TEAM {
        return Err(GameError::InvalidInput(format!(
            "a team needs exactly {CODE_WORDS_PER_TEAM} code words, got {}",
            words.len()
        )));
    }

    let mut seen = HashSet::new();
    words
        .into_iter()
        .map(|word| {
            let word = word.trim().to_string();
            if word.is_empty() {
                return Err(GameError::InvalidInput("code words must not be empty".into()));
            }
            if !seen.insert(word.to_lowercase()) {
                return Err(GameError::InvalidInput(format!(
                    "duplicate code word `{word}`"
                )));
            }
            Ok(word)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn scale_score_matches_formula() {
        assert_eq!(scale_score(0.3, 0.3), 100.0);
        assert_eq!(scale_score(0.0, 1.0), 0.0);
        assert_eq!(scale_score(1.0, 0.0), 0.0);
        assert!((scale_score(0.25, 0.5) - 75.0).abs() < 1e-9);
        assert!((scale_score(0.9, 0.8) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn scale_score_decreases_with_distance() {
        let target = 0.4;
        let mut previous = f64::INFINITY;
        for step in 0..=60 {
            let guess = target + f64::from(step) / 100.0;
            let score = scale_score(target, guess);
            assert!(score <= previous);
            assert!((0.0..=100.0).contains(&score));
            previous = score;
        }
    }

    #[test]
    fn scale_guess_domain_is_enforced() {
        assert!(validate_scale_guess(0.0).is_ok());
        assert!(validate_scale_guess(1.0).is_ok());
        assert!(validate_scale_guess(-0.01).is_err());
        assert!(validate_scale_guess(1.5).is_err());
        assert!(validate_scale_guess(f64::NAN).is_err());
    }

    #[test]
    fn code_digits_are_bounded() {
        assert!(Code::new([1, 4, 4]).is_ok());
        assert!(matches!(
            Code::new([0, 2, 3]),
            Err(GameError::InvalidGuess(_))
        ));
        assert!(Code::new([1, 2, 5]).is_err());
        assert!(Code::from_slice(&[1, 2]).is_err());
        assert!(Code::from_slice(&[1, 2, 3, 4]).is_err());
        assert_eq!(Code::from_slice(&[3, 1, 2]).unwrap().to_string(), "3-1-2");
    }

    #[test]
    fn code_match_is_all_or_nothing() {
        let target = Code::new([2, 3, 1]).unwrap();
        assert!(code_matches(&target, &Code::new([2, 3, 1]).unwrap()));
        assert!(!code_matches(&target, &Code::new([2, 3, 2]).unwrap()));
        assert!(!code_matches(&target, &Code::new([1, 2, 3]).unwrap()));
        assert!(!code_matches(&target, &Code::new([3, 2, 1]).unwrap()));
    }

    #[test]
    fn random_targets_stay_in_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        let scales = vec![ScalePair::new("Cold", "Hot")];
        for _ in 0..200 {
            let code = Code::random(&mut rng);
            assert!(Code::new(code.digits()).is_ok());
            let target = ScaleTarget::random(&mut rng, &scales);
            assert!((0.0..=1.0).contains(&target.point));
            assert_eq!(target.scale.left, "Cold");
        }
    }

    #[test]
    fn clues_are_trimmed_and_counted() {
        let clues = validate_clues(vec!["  ocean ".into(), "tide".into()], 2).unwrap();
        assert_eq!(clues, vec!["ocean".to_string(), "tide".to_string()]);
        assert!(validate_clues(vec!["ocean".into()], 3).is_err());
        assert!(matches!(
            validate_clues(vec!["   ".into()], 1),
            Err(GameError::InvalidClue(_))
        ));
        assert!(validate_clues(vec!["x".repeat(MAX_CLUE_CHARS + 1)], 1).is_err());
    }

    #[test]
    fn code_words_must_be_four_distinct_words() {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        assert!(validate_code_words(words(&["sun", "moon", "star", "comet"])).is_ok());
        assert!(validate_code_words(words(&["sun", "moon", "star"])).is_err());
        assert!(validate_code_words(words(&["sun", "Sun", "star", "comet"])).is_err());
        assert!(validate_code_words(words(&["sun", " ", "star", "comet"])).is_err());
    }

    #[test]
    fn guess_reasons_are_trimmed_and_capped() {
        let answer = GuessAnswer::with_reason(Guess::Scale(0.3), "  leans cold  ");
        assert_eq!(answer.normalized_reason().as_deref(), Some("leans cold"));

        let blank = GuessAnswer::with_reason(Guess::Scale(0.3), "   ");
        assert_eq!(blank.normalized_reason(), None);
        assert_eq!(GuessAnswer::from(Guess::Scale(0.3)).normalized_reason(), None);

        let long = GuessAnswer::with_reason(Guess::Scale(0.3), "x".repeat(MAX_REASON_CHARS + 9));
        assert_eq!(
            long.normalized_reason().map(|reason| reason.chars().count()),
            Some(MAX_REASON_CHARS)
        );
    }
}
