use crate::config::RankedRow;
use crate::tournament::{Tournament, VertexId};

/// Marks the candidates that are tied with the one placed just before them.
///
/// Two neighbours are tied when the tournament has no edge between them. This only
/// looks at adjacent candidates: with A = B and B = C, A and C are not checked
/// against each other.
fn mark_ties(tournament: &Tournament, order: &[VertexId]) -> Vec<bool> {
    let mut tie_with_prev = vec![false; order.len()];
    for i in 1..order.len() {
        tie_with_prev[i] = !tournament.has_edge_between(order[i - 1], order[i]);
    }
    tie_with_prev
}

/// Converts an order of the candidates (best first) into ranked rows.
///
/// Ranks are 1-indexed. A tied candidate repeats the rank of the previous row.
pub fn make_rows(tournament: &Tournament, order: &[VertexId]) -> Vec<RankedRow> {
    let tie_with_prev = mark_ties(tournament, order);
    let mut rows: Vec<RankedRow> = Vec::with_capacity(order.len());
    let mut last_rank: u32 = 0;
    for (i, v) in order.iter().enumerate() {
        let rank = if tie_with_prev[i] {
            last_rank
        } else {
            i as u32 + 1
        };
        rows.push(RankedRow {
            item_id: tournament.item_id(),
            candidate: tournament.vertex_name(*v).to_string(),
            rank,
        });
        last_rank = rank;
    }
    rows
}
