//! The local sort kernel: bitonic comparator networks over one in-memory
//! chunk.
//!
//! Both entry points are pure, deterministic, comparison-only transforms —
//! no I/O, no communication — over a chunk whose length is a power of two.
//! The direction is bound once into a [`Comparator`] function value and
//! passed down, so the inner loops never re-test a flag.
//!
//! Complexity: [`bitonic_sort`] runs the full network, O(n·log²n)
//! comparisons; [`bitonic_merge`] runs only the terminal stage over an
//! already-bitonic chunk, O(n·log n).

use crate::Direction;

/// Comparison bound from a [`Direction`].
///
/// `cmp(a, b)` answers "are `a`, `b` out of the requested order?" for a
/// pair at increasing indices. The inequality is strict: equal elements
/// are never swapped, but the network as a whole still gives no stability
/// guarantee.
pub type Comparator<T> = fn(&T, &T) -> bool;

/// Bind the out-of-order test for `direction`.
pub fn out_of_order<T: Ord>(direction: Direction) -> Comparator<T> {
    match direction {
        Direction::Ascending => |a, b| a > b,
        Direction::Descending => |a, b| a < b,
    }
}

/// One outer stage of the comparator network.
///
/// For block size `k`, compare every index `i` with its partner `i ^ j`
/// for distances `j = k/2 … 1`. Elements whose block bit `(i & k)` is set
/// belong to the mirrored half and compare against the requested order.
fn stage<T: Copy>(chunk: &mut [T], k: usize, cmp: Comparator<T>) {
    let n = chunk.len();
    let mut j = k / 2;
    while j > 0 {
        for i in 0..n {
            let partner = i ^ j;
            if partner > i {
                let mirrored = (i & k) != 0;
                let swap = if mirrored {
                    cmp(&chunk[partner], &chunk[i])
                } else {
                    cmp(&chunk[i], &chunk[partner])
                };
                if swap {
                    chunk.swap(i, partner);
                }
            }
        }
        j /= 2;
    }
}

/// Sort `chunk` in place with the full bitonic network.
///
/// `chunk.len()` must be a power of two (or zero). Stages of doubling
/// block size build ever longer bitonic runs until the final stage leaves
/// the whole chunk ordered by `cmp`.
pub fn bitonic_sort<T: Copy>(chunk: &mut [T], cmp: Comparator<T>) {
    let n = chunk.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "chunk length {n} is not a power of two");

    let mut k = 2;
    while k <= n {
        stage(chunk, k, cmp);
        k *= 2;
    }
}

/// Merge an already-bitonic `chunk` into full order, in place.
///
/// The chunk must be a bitonic sequence — in this engine it always is,
/// because scatter reassembles two oppositely-ordered sorted halves from
/// the previous round. Only the terminal stage (`k = n`) runs, which is
/// strictly fewer stages than [`bitonic_sort`] for any `n > 2`.
pub fn bitonic_merge<T: Copy>(chunk: &mut [T], cmp: Comparator<T>) {
    let n = chunk.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "chunk length {n} is not a power of two");

    stage(chunk, n, cmp);
}

/// Check for adjacent inversions under `direction`.
///
/// Post-hoc verifier only; plays no role in the engine's correctness.
pub fn is_ordered<T: Ord>(data: &[T], direction: Direction) -> bool {
    let cmp = out_of_order::<T>(direction);
    data.windows(2).all(|w| !cmp(&w[0], &w[1]))
}
