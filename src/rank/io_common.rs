use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

use mfas_ranking::Judgment;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The supported layouts of judgment files.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputFormat {
    /// segmentId,judgeId,system1,system2,cmp
    Wmt,
    /// srclang,trglang,srcIndex,documentId,segmentId,judgeId,system1Number,system1Id,system2Number,system2Id,rank
    Ans2Csv,
}

/// The names of the columns to read for each format.
pub struct Columns {
    pub item: &'static str,
    pub judge: &'static str,
    pub judge_required: bool,
    pub candidate_a: &'static str,
    pub candidate_b: &'static str,
    pub outcome: &'static str,
    pub languages: Option<(&'static str, &'static str)>,
}

impl InputFormat {
    pub fn columns(&self) -> Columns {
        match self {
            InputFormat::Wmt => Columns {
                item: "segmentId",
                judge: "judgeId",
                judge_required: false,
                candidate_a: "system1",
                candidate_b: "system2",
                outcome: "cmp",
                languages: None,
            },
            InputFormat::Ans2Csv => Columns {
                item: "srcIndex",
                judge: "judgeId",
                judge_required: true,
                candidate_a: "system1Id",
                candidate_b: "system2Id",
                outcome: "rank",
                languages: Some(("srclang", "trglang")),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::Wmt => "wmt",
            InputFormat::Ans2Csv => "ans2csv",
        }
    }
}

/// Restricts the judgments to a language pair. `None` accepts any language.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct LanguageFilter {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl LanguageFilter {
    pub fn is_active(&self) -> bool {
        self.source.is_some() || self.target.is_some()
    }

    pub fn accepts(&self, source: &str, target: &str) -> bool {
        self.source.as_deref().map_or(true, |s| s == source)
            && self.target.as_deref().map_or(true, |t| t == target)
    }
}

/// Why a row of the input was not turned into a judgment.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum SkipReason {
    UnreadableLine,
    MissingField(String),
    InvalidItemId,
    InvalidOutcome,
    EmptyCandidate,
    SelfComparison,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnreadableLine => write!(f, "unreadable line"),
            SkipReason::MissingField(column) => write!(f, "missing field {}", column),
            SkipReason::InvalidItemId => write!(f, "invalid item id"),
            SkipReason::InvalidOutcome => write!(f, "invalid outcome"),
            SkipReason::EmptyCandidate => write!(f, "empty candidate"),
            SkipReason::SelfComparison => write!(f, "self comparison"),
        }
    }
}

/// Everything read from one judgment file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct IngestReport {
    pub judgments_by_item: BTreeMap<u64, Vec<Judgment>>,
    /// All the data rows, including the filtered and skipped ones.
    pub rows_read: u64,
    /// Rows left out by the language filter.
    pub rows_filtered: u64,
    pub skipped: BTreeMap<SkipReason, u64>,
}

impl IngestReport {
    pub fn num_judgments(&self) -> usize {
        self.judgments_by_item.values().map(|js| js.len()).sum()
    }

    pub fn rows_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn add_judgment(&mut self, judgment: Judgment) {
        self.judgments_by_item
            .entry(judgment.item_id)
            .or_default()
            .push(judgment);
    }

    pub fn add_skipped(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}
