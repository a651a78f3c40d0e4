use std::collections::BTreeMap;

pub use crate::config::*;

/// A builder for adding judgments and ranking all the items at once.
///
/// Judgments can be added in any order and for any number of items. The
/// items are ranked one after the other, in increasing item id.
///
/// ```
/// pub use mfas_ranking::builder::Builder;
/// pub use mfas_ranking::RankingRules;
/// # use mfas_ranking::RankingErrors;
///
/// let mut builder = Builder::new(&RankingRules::DEFAULT_RULES)?;
///
/// builder.add_judgment_simple(7, "sysX", "sysY", "<")?;
/// builder.add_judgment_simple(7, "sysY", "sysZ", "1")?;
///
/// let rows = builder.rank()?;
/// assert_eq!(rows.len(), 3);
/// assert_eq!(rows[0].candidate, "sysX");
///
/// # Ok::<(), RankingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: RankingRules,
    pub(crate) _judgments: BTreeMap<u64, Vec<Judgment>>,
}

impl Builder {
    pub fn new(rules: &RankingRules) -> Result<Builder, RankingErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _judgments: BTreeMap::new(),
        })
    }

    /// Adds a judgment from an anonymous judge.
    ///
    /// The outcome uses either the symbolic (`<`, `>`, `=`) or the numeric (`1`, `2`, `11`)
    /// encoding.
    pub fn add_judgment_simple(
        &mut self,
        item_id: u64,
        candidate_a: &str,
        candidate_b: &str,
        outcome: &str,
    ) -> Result<(), RankingErrors> {
        let outcome = Outcome::parse(outcome)?;
        self.add_judgment(&Judgment {
            item_id,
            judge_id: String::new(),
            candidate_a: candidate_a.to_string(),
            candidate_b: candidate_b.to_string(),
            outcome,
        })
    }

    pub fn add_judgment(&mut self, judgment: &Judgment) -> Result<(), RankingErrors> {
        self._judgments
            .entry(judgment.item_id)
            .or_default()
            .push(judgment.clone());
        Ok(())
    }

    pub fn num_items(&self) -> usize {
        self._judgments.len()
    }

    /// Ranks all the items. The first failing item stops the ranking.
    pub fn rank(&self) -> Result<Vec<RankedRow>, RankingErrors> {
        let mut rows: Vec<RankedRow> = Vec::new();
        for (item_id, judgments) in self._judgments.iter() {
            rows.extend(crate::rank_item(*item_id, judgments, &self._rules)?);
        }
        Ok(rows)
    }
}
