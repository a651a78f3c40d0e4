// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::time::Duration;

/// The decision recorded by a judge when comparing two candidates.
///
/// The historical exports use two encodings for the same decision. Both are
/// accepted by [`Outcome::parse`] and nothing past this point needs to know
/// which one was used.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Outcome {
    /// The first candidate (`candidate_a`) was judged better.
    ABetter,
    /// The second candidate (`candidate_b`) was judged better.
    BBetter,
    /// Both candidates were judged of equal quality.
    Tie,
}

impl Outcome {
    /// Reads an outcome token.
    ///
    /// Accepted tokens:
    /// * symbolic: `<` (A better), `>` (B better), `=` (tie)
    /// * legacy numeric: `1` (A better), `2` (B better), `11` (tie)
    ///
    /// ```
    /// use mfas_ranking::Outcome;
    /// assert_eq!(Outcome::parse("<"), Ok(Outcome::ABetter));
    /// assert_eq!(Outcome::parse(" 11 "), Ok(Outcome::Tie));
    /// assert!(Outcome::parse("3").is_err());
    /// ```
    pub fn parse(token: &str) -> Result<Outcome, RankingErrors> {
        match token.trim() {
            "<" | "1" => Ok(Outcome::ABetter),
            ">" | "2" => Ok(Outcome::BBetter),
            "=" | "11" => Ok(Outcome::Tie),
            x => Err(RankingErrors::InvalidJudgment {
                token: x.to_string(),
            }),
        }
    }
}

/// One pairwise decision of one judge about one item.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Judgment {
    pub item_id: u64,
    pub judge_id: String,
    pub candidate_a: String,
    pub candidate_b: String,
    pub outcome: Outcome,
}

impl Judgment {
    /// The (winner, loser) pair, or None for a tie.
    pub fn winner_loser(&self) -> Option<(&str, &str)> {
        match self.outcome {
            Outcome::ABetter => Some((&self.candidate_a, &self.candidate_b)),
            Outcome::BBetter => Some((&self.candidate_b, &self.candidate_a)),
            Outcome::Tie => None,
        }
    }
}

// ******** Output data structures *********

/// A candidate and its rank for one item.
///
/// Ranks start at 1. Candidates that are tied share the rank of the first
/// candidate of the tie, and the next rank skips accordingly (1, 2, 2, 4).
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RankedRow {
    pub item_id: u64,
    pub candidate: String,
    pub rank: u32,
}

/// Errors that prevent the ranking of an item from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RankingErrors {
    /// An outcome token outside of the accepted encodings.
    InvalidJudgment { token: String },
    /// The judgments given for a single tournament refer to more than one item.
    MixedItems { expected: u64, found: u64 },
    /// No candidate to rank. Callers should treat this as an empty ranking.
    EmptyTournament,
    /// The item has more candidates than the search is allowed to handle.
    TooManyCandidates { count: usize, max: usize },
    /// The search ran out of its time budget.
    Timeout { expanded: usize },
    /// The search finished without reaching the final state. This is a bug.
    InternalInvariantViolation { message: String },
}

impl Error for RankingErrors {}

impl Display for RankingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingErrors::InvalidJudgment { token } => {
                write!(f, "invalid judgment outcome {:?}", token)
            }
            RankingErrors::MixedItems { expected, found } => write!(
                f,
                "judgments of item {} mixed with judgments of item {}",
                expected, found
            ),
            RankingErrors::EmptyTournament => write!(f, "empty tournament"),
            RankingErrors::TooManyCandidates { count, max } => write!(
                f,
                "too many candidates to rank: {} (maximum allowed: {})",
                count, max
            ),
            RankingErrors::Timeout { expanded } => {
                write!(f, "ranking timed out after expanding {} states", expanded)
            }
            RankingErrors::InternalInvariantViolation { message } => {
                write!(f, "internal invariant violation: {}", message)
            }
        }
    }
}

// ********* Configuration **********

/// How to order the candidates among rankings that explain the judgments equally well.
///
/// The solver returns the smallest optimal order with respect to the
/// candidate order defined here.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Candidates are ordered by their identifier.
    UseCandidateOrder,
    /// Candidates are ordered by a cryptographic hash of the seed and their identifier.
    /// The order is reproducible for a given seed but hard to guess in advance.
    Random(u32),
}

/// The largest number of candidates that fits in a search state.
pub const MAX_SUPPORTED_CANDIDATES: usize = 63;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankingRules {
    pub tiebreak_mode: TieBreakMode,
    /// Items with more candidates are rejected. The search is exponential in this number.
    pub max_candidates: usize,
    /// Wall-clock budget for ranking a single item.
    pub time_limit: Option<Duration>,
}

impl RankingRules {
    pub const DEFAULT_RULES: RankingRules = RankingRules {
        tiebreak_mode: TieBreakMode::UseCandidateOrder,
        max_candidates: 20,
        time_limit: None,
    };
}

impl Default for RankingRules {
    fn default() -> Self {
        RankingRules::DEFAULT_RULES
    }
}
