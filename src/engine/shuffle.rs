//! Queue shuffling.

use std::sync::Arc;

use rand::Rng;

use crate::track::Track;

/// In-place Fisher-Yates: walk `i` from the end down to 1 and swap with a
/// uniform pick from `0..=i`.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// `anchor` followed by a shuffle of every other track in `pool`.
pub fn shuffled_with_anchor<R: Rng + ?Sized>(
    anchor: &Arc<Track>,
    pool: &[Arc<Track>],
    rng: &mut R,
) -> Vec<Arc<Track>> {
    let mut others: Vec<Arc<Track>> = pool
        .iter()
        .filter(|t| t.id != anchor.id)
        .cloned()
        .collect();
    fisher_yates(&mut others, rng);

    let mut queue = Vec::with_capacity(others.len() + 1);
    queue.push(Arc::clone(anchor));
    queue.extend(others);
    queue
}
