mod config;
mod emitter;
mod solver;
mod tournament;

pub mod builder;
pub mod manual;

use log::{debug, info};

pub use crate::config::*;
pub use crate::emitter::make_rows;
pub use crate::solver::{solve, Solution};
pub use crate::tournament::{Tournament, TournamentEdge, VertexId};

/// Ranks the candidates of one item from all the judgments made on this item.
///
/// Arguments:
/// * `item_id` the item that is ranked. All the judgments must refer to it.
/// * `judgments` the pairwise judgments on this item, in any order
/// * `rules` the rules that govern the ranking
///
/// The rows are returned best candidate first. An item without any judgment gives an
/// empty ranking.
///
/// This function does not share any state between calls, so items can be ranked in parallel.
pub fn rank_item(
    item_id: u64,
    judgments: &[Judgment],
    rules: &RankingRules,
) -> Result<Vec<RankedRow>, RankingErrors> {
    debug!(
        "rank_item: item {}: {} judgments, rules: {:?}",
        item_id,
        judgments.len(),
        rules
    );
    let tournament = Tournament::build_with_limit(
        item_id,
        judgments,
        rules.tiebreak_mode,
        rules.max_candidates,
    )?;
    let solution = match solve(&tournament, rules) {
        Ok(s) => s,
        Err(RankingErrors::EmptyTournament) => {
            info!("rank_item: item {}: no candidate to rank", item_id);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    // The order must be a permutation of the candidates. Anything else is a bug in the solver.
    let mut seen = vec![false; tournament.len()];
    for v in solution.order.iter() {
        if *v >= seen.len() || seen[*v] {
            return Err(RankingErrors::InternalInvariantViolation {
                message: format!(
                    "item {}: order {:?} is not a permutation of {} candidates",
                    item_id,
                    solution.order,
                    tournament.len()
                ),
            });
        }
        seen[*v] = true;
    }
    if solution.order.len() != tournament.len() {
        return Err(RankingErrors::InternalInvariantViolation {
            message: format!(
                "item {}: order {:?} misses candidates out of {}",
                item_id,
                solution.order,
                tournament.len()
            ),
        });
    }

    let rows = make_rows(&tournament, &solution.order);
    debug!(
        "rank_item: item {}: cost {} rows {:?}",
        item_id, solution.cost, rows
    );
    Ok(rows)
}
