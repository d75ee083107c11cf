//! Index expansion
//!
//! Turns an `indices` declaration into the ordered list of index tuples it ranges over:
//! the Cartesian product of the referenced sets, first index outermost, each set in its
//! declared member order.

use itertools::Itertools;

use crate::schema::{IndexDecl, IndexTuple, SetTable};

/// Expand `indices` against `sets`.
///
/// An empty declaration yields exactly one tuple, the empty one, standing for a scalar
/// entity. A declaration over an empty set yields no tuples. Returns `None` when a
/// referenced set is not declared.
pub fn expand(indices: &[IndexDecl], sets: &SetTable) -> Option<Vec<IndexTuple>> {
    if indices.is_empty() {
        return Some(vec![Vec::new()]);
    }

    let members = indices
        .iter()
        .map(|index| sets.members(&index.set))
        .collect::<Option<Vec<_>>>()?;

    Some(
        members
            .into_iter()
            .map(|m| m.iter().cloned())
            .multi_cartesian_product()
            .collect(),
    )
}

/// Pair each declared index symbol with its member in `tuple`.
pub fn bindings<'a>(
    indices: &'a [IndexDecl],
    tuple: &'a [crate::Symbol],
) -> impl Iterator<Item = (&'a crate::Symbol, &'a crate::Symbol)> {
    indices.iter().map(|index| &index.symbol).zip(tuple.iter())
}
