//! Sequence Diff Engine
//!
//! Computes a minimal edit script between two ordered sequences, used by
//! [`ObservableArray`](super::ObservableArray) to turn an arbitrary mutation
//! into an ordered stream of `add`/`remove` events.
//!
//! # Algorithm
//!
//! Classic Levenshtein-style dynamic programming without substitution:
//! matching elements cost 0, inserts and deletes cost 1. The edit script is
//! recovered by walking the distance matrix backwards from
//! `(old_len, new_len)` to the origin and reversing, so the returned
//! operations read in forward (old-to-new) order. When an insert and a
//! delete both reach the same minimal cost, the insert is taken.
//!
//! O(n·m) time and space. Fine for presentation-bound sequences, which are
//! small; callers with very large sequences should treat this as a known
//! limitation rather than reorder the visible op stream.
//!
//! # Index semantics
//!
//! `Add` operations carry the element's index in the *new* sequence.
//! `Remove` operations also carry the new-sequence column position of the
//! step at which the removal occurs, **not** the element's old-sequence row
//! index. Downstream removal targeting depends on these exact stamps, and
//! the tests below pin them; do not "correct" them.

use serde::Serialize;

/// Kind of a single structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Add,
    Remove,
}

/// One structural change: add `value` at `index`, or remove `value` with
/// the column stamp described in the module docs. Serializable so edit
/// scripts can be handed to an out-of-process renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffOp<T> {
    pub status: DiffStatus,
    pub value: T,
    pub index: usize,
}

/// Compute the edit script transforming `old` into `new`, with element
/// identity decided by `same`.
pub fn sequence_diff<T, F>(old: &[T], new: &[T], same: F) -> Vec<DiffOp<T>>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let old_len = old.len();
    let new_len = new.len();

    // Distance matrix: distance[i][j] is the edit cost between the first i
    // elements of old and the first j elements of new.
    let mut distance = vec![vec![0usize; new_len + 1]; old_len + 1];
    for (i, row) in distance.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 1..=new_len {
        distance[0][j] = j;
    }
    for j in 1..=new_len {
        for i in 1..=old_len {
            distance[i][j] = if same(&old[i - 1], &new[j - 1]) {
                distance[i - 1][j - 1]
            } else {
                1 + distance[i - 1][j].min(distance[i][j - 1])
            };
        }
    }

    // Walk back from (old_len, new_len), collecting ops in reverse.
    let mut ops = Vec::new();
    let mut i = old_len;
    let mut j = new_len;
    while i > 0 || j > 0 {
        let cost = distance[i][j];
        if j > 0 && distance[i][j - 1] + 1 == cost {
            // horizontal step: insert, preferred on ties
            ops.push(DiffOp {
                status: DiffStatus::Add,
                value: new[j - 1].clone(),
                index: j - 1,
            });
            j -= 1;
        } else if i > 0 && distance[i - 1][j] + 1 == cost {
            // vertical step: removal stamped with the column position
            ops.push(DiffOp {
                status: DiffStatus::Remove,
                value: old[i - 1].clone(),
                index: j,
            });
            i -= 1;
        } else {
            // diagonal step: elements match
            i -= 1;
            j -= 1;
        }
    }

    ops.reverse();
    ops
}
