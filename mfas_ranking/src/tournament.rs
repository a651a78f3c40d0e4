use log::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;

/// Index of a candidate inside a tournament.
///
/// Indices follow the tie-break order of the candidates: index 0 is the
/// candidate preferred when several rankings are equally good.
pub type VertexId = usize;

/// A directed edge from the winner to the loser of a pair of candidates.
///
/// The weight is the net number of victories of the winner over the loser,
/// and is always strictly positive.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct TournamentEdge {
    pub winner: VertexId,
    pub loser: VertexId,
    pub weight: u64,
}

/// The comparison graph of one item.
///
/// There is at most one directed edge between two candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tournament {
    item_id: u64,
    vertices: Vec<String>,
    // Dense n x n matrix, weights[winner * n + loser]. 0 means no edge.
    weights: Vec<u64>,
}

// Counts for the unordered pair (low, high), low < high.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
struct PairTally {
    low_wins: u64,
    high_wins: u64,
    ties: u64,
}

impl PairTally {
    fn total(&self) -> u64 {
        self.low_wins + self.high_wins + self.ties
    }

    // Equality is asserted when at least half of the judgments are ties.
    fn is_majority_tie(&self) -> bool {
        2 * self.ties >= self.total()
    }
}

impl Tournament {
    /// Builds the tournament of a single item from all its judgments.
    ///
    /// For every pair of candidates, the directional judgments are netted out: if A beat B
    /// 5 times and B beat A twice, the tournament contains an edge A -> B of weight 3.
    /// If ties represent at least half of the judgments of a pair, no edge is added for
    /// this pair, whatever the directional judgments say.
    ///
    /// An empty list of judgments gives an empty tournament.
    pub fn build(
        item_id: u64,
        judgments: &[Judgment],
        tiebreak: TieBreakMode,
    ) -> Result<Tournament, RankingErrors> {
        Tournament::build_with_limit(item_id, judgments, tiebreak, MAX_SUPPORTED_CANDIDATES)
    }

    /// Like [Tournament::build], but fails with [RankingErrors::TooManyCandidates] as
    /// soon as the item has more than `max_candidates` distinct candidates. Nothing
    /// proportional to the square of the number of candidates is allocated before
    /// this check.
    pub fn build_with_limit(
        item_id: u64,
        judgments: &[Judgment],
        tiebreak: TieBreakMode,
        max_candidates: usize,
    ) -> Result<Tournament, RankingErrors> {
        let max = max_candidates.min(MAX_SUPPORTED_CANDIDATES);
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for j in judgments.iter() {
            if j.item_id != item_id {
                return Err(RankingErrors::MixedItems {
                    expected: item_id,
                    found: j.item_id,
                });
            }
            names.insert(j.candidate_a.as_str());
            names.insert(j.candidate_b.as_str());
        }
        if names.len() > max {
            return Err(RankingErrors::TooManyCandidates {
                count: names.len(),
                max,
            });
        }

        let vertices = candidate_order(&names, tiebreak);
        let index: BTreeMap<&str, VertexId> = vertices
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut tallies: BTreeMap<(VertexId, VertexId), PairTally> = BTreeMap::new();
        for j in judgments.iter() {
            let a = index[j.candidate_a.as_str()];
            let b = index[j.candidate_b.as_str()];
            if a == b {
                debug!(
                    "Tournament::build: item {}: ignoring self comparison of {:?}",
                    item_id, j.candidate_a
                );
                continue;
            }
            let tally = tallies.entry((a.min(b), a.max(b))).or_default();
            match j.winner_loser() {
                None => tally.ties += 1,
                Some((winner, loser)) if index[winner] < index[loser] => tally.low_wins += 1,
                Some(_) => tally.high_wins += 1,
            }
        }

        let n = vertices.len();
        let mut weights = vec![0u64; n * n];
        for ((low, high), tally) in tallies.iter() {
            if tally.is_majority_tie() {
                debug!(
                    "Tournament::build: item {}: {:?} and {:?} are equal by majority {:?}",
                    item_id, vertices[*low], vertices[*high], tally
                );
                continue;
            }
            if tally.low_wins > tally.high_wins {
                weights[low * n + high] = tally.low_wins - tally.high_wins;
            } else if tally.high_wins > tally.low_wins {
                weights[high * n + low] = tally.high_wins - tally.low_wins;
            }
        }

        let t = Tournament {
            item_id,
            vertices,
            weights,
        };
        debug!(
            "Tournament::build: item {}: vertices: {:?} edges: {:?}",
            item_id,
            t.vertices,
            t.edges()
        );
        Ok(t)
    }

    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The candidates, in tie-break order.
    pub fn vertices(&self) -> &[String] {
        &self.vertices
    }

    pub fn vertex_name(&self, v: VertexId) -> &str {
        &self.vertices[v]
    }

    /// The weight of the edge winner -> loser, or 0 if there is none.
    pub fn weight(&self, winner: VertexId, loser: VertexId) -> u64 {
        self.weights[winner * self.vertices.len() + loser]
    }

    pub fn edge(&self, winner: VertexId, loser: VertexId) -> Option<u64> {
        match self.weight(winner, loser) {
            0 => None,
            w => Some(w),
        }
    }

    /// True if the judgments distinguish u and v in one direction or the other.
    pub fn has_edge_between(&self, u: VertexId, v: VertexId) -> bool {
        self.edge(u, v).is_some() || self.edge(v, u).is_some()
    }

    /// All the edges, sorted by winner and then loser.
    pub fn edges(&self) -> Vec<TournamentEdge> {
        let n = self.vertices.len();
        let mut res: Vec<TournamentEdge> = Vec::new();
        for winner in 0..n {
            for loser in 0..n {
                if let Some(weight) = self.edge(winner, loser) {
                    res.push(TournamentEdge {
                        winner,
                        loser,
                        weight,
                    });
                }
            }
        }
        res
    }

    /// The total weight of the upsets of an order: the edges that point from a
    /// candidate to another candidate placed before it.
    pub fn backward_cost(&self, order: &[VertexId]) -> u64 {
        let mut cost = 0;
        for (pos, before) in order.iter().enumerate() {
            for after in order[pos + 1..].iter() {
                cost += self.weight(*after, *before);
            }
        }
        cost
    }
}

/// Orders the candidates of an item according to the tie-break mode.
fn candidate_order(names: &BTreeSet<&str>, tiebreak: TieBreakMode) -> Vec<String> {
    match tiebreak {
        // BTreeSet is already sorted by identifier.
        TieBreakMode::UseCandidateOrder => names.iter().map(|s| s.to_string()).collect(),
        TieBreakMode::Random(seed) => {
            let mut data: Vec<(String, String)> = names
                .iter()
                .map(|name| {
                    (
                        sha256::digest(format!("{:08}{}", seed, name)),
                        name.to_string(),
                    )
                })
                .collect();
            data.sort();
            data.into_iter().map(|p| p.1).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn j(a: &str, b: &str, outcome: Outcome) -> Judgment {
        Judgment {
            item_id: 1,
            judge_id: "judge".to_string(),
            candidate_a: a.to_string(),
            candidate_b: b.to_string(),
            outcome,
        }
    }

    fn build(judgments: &[Judgment]) -> Tournament {
        Tournament::build(1, judgments, TieBreakMode::UseCandidateOrder).unwrap()
    }

    fn index_of(t: &Tournament, name: &str) -> VertexId {
        t.vertices().iter().position(|v| v == name).unwrap()
    }

    #[test]
    fn net_margin() {
        let mut js = vec![j("A", "B", Outcome::ABetter); 5];
        js.push(j("A", "B", Outcome::BBetter));
        js.push(j("B", "A", Outcome::ABetter));
        let t = build(&js);
        let a = index_of(&t, "A");
        let b = index_of(&t, "B");
        assert_eq!(t.edge(a, b), Some(3));
        assert_eq!(t.edge(b, a), None);
        assert_eq!(
            t.edges(),
            vec![TournamentEdge {
                winner: a,
                loser: b,
                weight: 3
            }]
        );
    }

    #[test]
    fn equality_majority() {
        let mut js = vec![j("A", "B", Outcome::Tie); 3];
        js.push(j("A", "B", Outcome::ABetter));
        js.push(j("A", "B", Outcome::ABetter));
        let t = build(&js);
        assert_eq!(t.len(), 2);
        assert!(t.edges().is_empty());
    }

    #[test]
    fn equality_exactly_half() {
        let js = vec![
            j("A", "B", Outcome::Tie),
            j("A", "B", Outcome::Tie),
            j("A", "B", Outcome::ABetter),
            j("B", "A", Outcome::BBetter),
        ];
        assert!(build(&js).edges().is_empty());
    }

    #[test]
    fn equality_minority() {
        let js = vec![
            j("A", "B", Outcome::Tie),
            j("A", "B", Outcome::BBetter),
            j("A", "B", Outcome::BBetter),
        ];
        let t = build(&js);
        let a = index_of(&t, "A");
        let b = index_of(&t, "B");
        assert_eq!(t.edge(b, a), Some(2));
    }

    #[test]
    fn balanced_pair_has_no_edge() {
        let js = vec![
            j("A", "B", Outcome::ABetter),
            j("A", "B", Outcome::BBetter),
            j("B", "C", Outcome::ABetter),
        ];
        let t = build(&js);
        assert_eq!(t.vertices(), &["A", "B", "C"]);
        assert!(!t.has_edge_between(0, 1));
        assert!(t.has_edge_between(1, 2));
        assert!(t.has_edge_between(2, 1));
    }

    #[test]
    fn empty_judgments() {
        let t = build(&[]);
        assert!(t.is_empty());
        assert!(t.edges().is_empty());
    }

    #[test]
    fn mixed_items() {
        let mut other = j("A", "B", Outcome::ABetter);
        other.item_id = 2;
        let res = Tournament::build(1, &[j("A", "B", Outcome::Tie), other], TieBreakMode::UseCandidateOrder);
        assert_eq!(
            res,
            Err(RankingErrors::MixedItems {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn vertex_set_is_union_of_candidates() {
        let js = vec![
            j("sysZ", "sysX", Outcome::Tie),
            j("sysY", "sysW", Outcome::ABetter),
        ];
        let t = build(&js);
        assert_eq!(t.vertices(), &["sysW", "sysX", "sysY", "sysZ"]);
    }

    #[test]
    fn too_many_candidates_before_allocation() {
        let js: Vec<Judgment> = (0..50_000)
            .map(|i| j(&format!("a{}", i), &format!("b{}", i), Outcome::ABetter))
            .collect();
        assert_eq!(
            Tournament::build(1, &js, TieBreakMode::UseCandidateOrder),
            Err(RankingErrors::TooManyCandidates {
                count: 100_000,
                max: MAX_SUPPORTED_CANDIDATES
            })
        );
        assert_eq!(
            Tournament::build_with_limit(1, &js[..3], TieBreakMode::UseCandidateOrder, 5),
            Err(RankingErrors::TooManyCandidates { count: 6, max: 5 })
        );
        assert!(
            Tournament::build_with_limit(1, &js[..2], TieBreakMode::UseCandidateOrder, 5).is_ok()
        );
    }

    #[test]
    fn random_order_is_reproducible() {
        let js = vec![
            j("alpha", "beta", Outcome::Tie),
            j("gamma", "delta", Outcome::Tie),
            j("epsilon", "alpha", Outcome::Tie),
        ];
        let t1 = Tournament::build(1, &js, TieBreakMode::Random(42)).unwrap();
        let t2 = Tournament::build(1, &js, TieBreakMode::Random(42)).unwrap();
        assert_eq!(t1.vertices(), t2.vertices());
        let mut sorted = t1.vertices().to_vec();
        sorted.sort();
        assert_eq!(sorted, vec!["alpha", "beta", "delta", "epsilon", "gamma"]);
    }

    #[test]
    fn backward_cost_counts_upsets() {
        let js = vec![
            j("A", "B", Outcome::ABetter),
            j("A", "B", Outcome::ABetter),
            j("B", "C", Outcome::ABetter),
        ];
        let t = build(&js);
        assert_eq!(t.backward_cost(&[0, 1, 2]), 0);
        assert_eq!(t.backward_cost(&[1, 0, 2]), 2);
        assert_eq!(t.backward_cost(&[2, 1, 0]), 3);
    }
}
