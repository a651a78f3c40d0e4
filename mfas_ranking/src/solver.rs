use log::{debug, trace};

use std::{
    cmp::{Ordering, Reverse},
    collections::{hash_map::Entry, BinaryHeap, HashMap},
    time::Instant,
};

use crate::config::*;
use crate::tournament::{Tournament, VertexId};

// The set of placed vertices, one bit per vertex index.
type StateMask = u64;

type HypothesisId = usize;

// How often (in popped states) the time budget is checked.
const TIME_CHECK_PERIOD: usize = 256;

/// A node of the search: the cheapest known way to place the vertices of `state`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Hypothesis {
    cost: u64,
    state: StateMask,
    predecessor: Option<HypothesisId>,
    // None only for the start hypothesis.
    last_placed: Option<VertexId>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct StateEntry {
    best: HypothesisId,
    finalized: bool,
}

/// The result of a search.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Solution {
    /// All the vertices of the tournament, best first.
    pub order: Vec<VertexId>,
    /// The total weight of the edges pointing backward in `order`.
    pub cost: u64,
    /// The number of states expanded by the search.
    pub expanded: usize,
}

/// Iterates over the set bits of a mask, lowest first.
struct Bits(u64);

impl Iterator for Bits {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        if self.0 == 0 {
            None
        } else {
            let v = self.0.trailing_zeros() as VertexId;
            self.0 &= self.0 - 1;
            Some(v)
        }
    }
}

/// Finds the order of the vertices that minimizes the total weight of the
/// backward edges (the minimum feedback arc set of the tournament).
///
/// This is a uniform-cost search over the subsets of placed vertices: the start
/// state has nothing placed, the goal state has everything placed, and a transition
/// places one more vertex. Placing `u` costs the weight of all the edges `v -> u` coming
/// from vertices `v` that are still unplaced, since these are going to be placed after
/// `u` although they beat it. Edge weights are non-negative, so the first time the goal
/// state is popped from the frontier its cost is optimal.
///
/// When several orders have the same optimal cost, the order that is the smallest
/// in lexicographic order of the vertex indices is returned.
pub fn solve(tournament: &Tournament, rules: &RankingRules) -> Result<Solution, RankingErrors> {
    let n = tournament.len();
    if n == 0 {
        return Err(RankingErrors::EmptyTournament);
    }
    let max = rules.max_candidates.min(MAX_SUPPORTED_CANDIDATES);
    if n > max {
        return Err(RankingErrors::TooManyCandidates { count: n, max });
    }

    let start_time = Instant::now();
    let goal: StateMask = (1u64 << n) - 1;

    // All the hypotheses created by this search. They are never removed, so that
    // predecessor links stay valid.
    let mut arena: Vec<Hypothesis> = vec![Hypothesis {
        cost: 0,
        state: 0,
        predecessor: None,
        last_placed: None,
    }];
    let mut states: HashMap<StateMask, StateEntry> = HashMap::new();
    states.insert(
        0,
        StateEntry {
            best: 0,
            finalized: false,
        },
    );
    // Ordered by cost, then by number of placed vertices. The second key ensures that
    // all the predecessors of a state are finalized before the state itself.
    let mut frontier: BinaryHeap<Reverse<(u64, u32, StateMask)>> = BinaryHeap::new();
    frontier.push(Reverse((0, 0, 0)));

    let mut expanded: usize = 0;
    while let Some(Reverse((cost, _, state))) = frontier.pop() {
        let entry = match states.get_mut(&state) {
            Some(e) => e,
            None => {
                return Err(RankingErrors::InternalInvariantViolation {
                    message: format!("state {:#b} in frontier but not tracked", state),
                })
            }
        };
        if entry.finalized || arena[entry.best].cost < cost {
            // Stale frontier entry.
            continue;
        }
        entry.finalized = true;
        let current_id = entry.best;

        if expanded % TIME_CHECK_PERIOD == 0 {
            if let Some(limit) = rules.time_limit {
                if start_time.elapsed() >= limit {
                    debug!(
                        "solve: item {}: time limit {:?} reached after {} expansions",
                        tournament.item_id(),
                        limit,
                        expanded
                    );
                    return Err(RankingErrors::Timeout { expanded });
                }
            }
        }

        if state == goal {
            let order = reconstruct(&arena, current_id);
            debug!(
                "solve: item {}: cost {} after {} expansions, order {:?}",
                tournament.item_id(),
                cost,
                expanded,
                order
            );
            return Ok(Solution {
                order,
                cost,
                expanded,
            });
        }
        expanded += 1;
        trace!("solve: expanding state {:#b} cost {}", state, cost);

        let unplaced = goal & !state;
        for u in Bits(unplaced) {
            let next_state = state | (1u64 << u);
            let remaining = unplaced & !(1u64 << u);
            let step: u64 = Bits(remaining).map(|v| tournament.weight(v, u)).sum();
            let next_cost = cost + step;
            let candidate = Hypothesis {
                cost: next_cost,
                state: next_state,
                predecessor: Some(current_id),
                last_placed: Some(u),
            };

            match states.entry(next_state) {
                Entry::Vacant(e) => {
                    arena.push(candidate);
                    e.insert(StateEntry {
                        best: arena.len() - 1,
                        finalized: false,
                    });
                    frontier.push(Reverse((next_cost, next_state.count_ones(), next_state)));
                }
                Entry::Occupied(mut e) => {
                    let known = e.get();
                    if known.finalized {
                        continue;
                    }
                    let known_hyp = arena[known.best];
                    let better = match next_cost.cmp(&known_hyp.cost) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => {
                            compare_paths(&arena, current_id, u, known.best) == Ordering::Less
                        }
                    };
                    if better {
                        arena.push(candidate);
                        e.get_mut().best = arena.len() - 1;
                        // With an equal cost, the entry already in the frontier is enough.
                        if next_cost < known_hyp.cost {
                            frontier.push(Reverse((
                                next_cost,
                                next_state.count_ones(),
                                next_state,
                            )));
                        }
                    }
                }
            }
        }
    }

    Err(RankingErrors::InternalInvariantViolation {
        message: format!(
            "item {}: frontier exhausted before placing all {} candidates",
            tournament.item_id(),
            n
        ),
    })
}

// The vertices placed along the predecessor links, in placement order.
fn reconstruct(arena: &[Hypothesis], last: HypothesisId) -> Vec<VertexId> {
    let mut order: Vec<VertexId> = Vec::new();
    let mut cur = Some(last);
    while let Some(id) = cur {
        let h = &arena[id];
        if let Some(v) = h.last_placed {
            order.push(v);
        }
        cur = h.predecessor;
    }
    debug_assert_eq!(arena[last].state.count_ones() as usize, order.len());
    order.reverse();
    order
}

// Compares the path (predecessor, then u) with the path ending at `other`.
// Both paths place the same set of vertices.
//
// Every ancestor of a hypothesis is the finalized best of its state, so two paths
// that reach the same state share the same hypothesis from there back to the start.
// Walking both paths back in lockstep until they meet finds the first position
// where they differ.
fn compare_paths(
    arena: &[Hypothesis],
    predecessor: HypothesisId,
    u: VertexId,
    other: HypothesisId,
) -> Ordering {
    let mut first_diff = (Some(u), arena[other].last_placed);
    let mut a = Some(predecessor);
    let mut b = arena[other].predecessor;
    while let (Some(x), Some(y)) = (a, b) {
        if x == y {
            break;
        }
        first_diff = (arena[x].last_placed, arena[y].last_placed);
        a = arena[x].predecessor;
        b = arena[y].predecessor;
    }
    first_diff.0.cmp(&first_diff.1)
}
