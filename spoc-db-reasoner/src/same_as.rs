//! owl:sameAs equivalence closure
//!
//! `sames(x)` is every term reachable from `x` over owl:sameAs statements in
//! either direction, excluding `x` itself. The closure is computed with an
//! explicit worklist and a visited set:
//! - a term is marked visited before it is queued, so each term is expanded
//!   at most once and the walk terminates on cycles
//! - stack depth does not depend on the size of the equivalence class
//!
//! Results are memoised per `SameAsClosure` instance. One instance lives as
//! long as one query-time chainer, so the memo never outlives the store
//! snapshot it was read from.

use crate::error::Result;
use hashbrown::{HashMap, HashSet};
use spoc_db_core::{drain, KeyOrder, SpoField, SpoPattern, StatementIndex, TermId};
use std::sync::Arc;

type CoreResult<T> = spoc_db_core::Result<T>;

/// Memoising sameAs closure over a statement index
pub struct SameAsClosure {
    store: Arc<dyn StatementIndex>,
    same_as: TermId,
    /// term -> its whole equivalence class, ascending
    memo: HashMap<TermId, Arc<[TermId]>>,
    /// Number of index probes issued, for diagnostics
    probes: usize,
}

impl SameAsClosure {
    pub fn new(store: Arc<dyn StatementIndex>, same_as: TermId) -> Result<Self> {
        if same_as.is_null() {
            return Err(crate::ReasonerError::invalid_argument(
                "owl:sameAs term id is required",
            ));
        }
        Ok(Self {
            store,
            same_as,
            memo: HashMap::new(),
            probes: 0,
        })
    }

    pub fn same_as(&self) -> TermId {
        self.same_as
    }

    /// Index probes issued so far
    pub fn probes(&self) -> usize {
        self.probes
    }

    /// Terms sameAs-equivalent to `x`, ascending, excluding `x`.
    pub fn sames(&mut self, x: TermId) -> CoreResult<Vec<TermId>> {
        let class = self.with_self(x)?;
        Ok(class.iter().copied().filter(|t| *t != x).collect())
    }

    /// `x` together with its sames, ascending.
    pub fn with_self(&mut self, x: TermId) -> CoreResult<Arc<[TermId]>> {
        if let Some(hit) = self.memo.get(&x) {
            return Ok(Arc::clone(hit));
        }
        let class: Arc<[TermId]> = self.expand(x)?.into();
        // every member shares the class
        for member in class.iter() {
            self.memo.insert(*member, Arc::clone(&class));
        }
        Ok(class)
    }

    /// Worklist walk from `x`; returns the whole class including `x`.
    fn expand(&mut self, x: TermId) -> CoreResult<Vec<TermId>> {
        let mut visited: HashSet<TermId> = HashSet::new();
        visited.insert(x);
        let mut worklist = vec![x];
        while let Some(cur) = worklist.pop() {
            for next in self.neighbours(cur)? {
                // visited-check before enqueue
                if visited.insert(next) {
                    worklist.push(next);
                }
            }
        }
        let mut class: Vec<TermId> = visited.into_iter().collect();
        class.sort_unstable();
        tracing::trace!(term = %x, class_size = class.len(), "sameAs closure");
        Ok(class)
    }

    /// Direct sameAs neighbours in both directions
    fn neighbours(&mut self, x: TermId) -> CoreResult<Vec<TermId>> {
        let quads = self.store.quads();
        let mut out = Vec::new();

        let forward = SpoPattern::any().with_s(x).with_p(self.same_as);
        let mut it = self
            .store
            .scan(KeyOrder::for_pattern(&forward, quads), &forward)?;
        out.extend(drain(&mut it)?.iter().map(|spo| spo.get(SpoField::O)));

        let backward = SpoPattern::any().with_p(self.same_as).with_o(x);
        let mut it = self
            .store
            .scan(KeyOrder::for_pattern(&backward, quads), &backward)?;
        out.extend(drain(&mut it)?.iter().map(|spo| spo.get(SpoField::S)));

        self.probes += 2;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoc_db_core::{MemoryStore, Spo, StatementType};

    const SAME_AS: TermId = TermId(100);

    fn make_store(pairs: &[(u64, u64)]) -> Arc<dyn StatementIndex> {
        let store = MemoryStore::new();
        for (a, b) in pairs {
            store.insert(Spo::triple(TermId(*a), SAME_AS, TermId(*b), StatementType::Explicit));
        }
        Arc::new(store)
    }

    fn ids(v: &[TermId]) -> Vec<u64> {
        v.iter().map(|t| t.0).collect()
    }

    #[test]
    fn closure_follows_both_directions() {
        // 1 = 2, 3 = 2, 3 = 4
        let mut closure =
            SameAsClosure::new(make_store(&[(1, 2), (3, 2), (3, 4)]), SAME_AS).unwrap();
        assert_eq!(ids(&closure.sames(TermId(1)).unwrap()), vec![2, 3, 4]);
        assert_eq!(ids(&closure.sames(TermId(4)).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn closure_excludes_self_even_with_cycles() {
        let mut closure =
            SameAsClosure::new(make_store(&[(1, 2), (2, 3), (3, 1), (1, 1)]), SAME_AS).unwrap();
        let sames = closure.sames(TermId(1)).unwrap();
        assert_eq!(ids(&sames), vec![2, 3]);
        assert!(!sames.contains(&TermId(1)));
    }

    #[test]
    fn unrelated_term_has_no_sames() {
        let mut closure = SameAsClosure::new(make_store(&[(1, 2)]), SAME_AS).unwrap();
        assert!(closure.sames(TermId(9)).unwrap().is_empty());
        assert_eq!(ids(&closure.with_self(TermId(9)).unwrap()), vec![9]);
    }

    #[test]
    fn memo_serves_whole_class() {
        let mut closure = SameAsClosure::new(make_store(&[(1, 2), (2, 3)]), SAME_AS).unwrap();
        closure.sames(TermId(1)).unwrap();
        let probes = closure.probes();
        assert_eq!(ids(&closure.sames(TermId(3)).unwrap()), vec![1, 2]);
        assert_eq!(closure.probes(), probes);
        assert_eq!(ids(&closure.with_self(TermId(2)).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let pairs: Vec<(u64, u64)> = (1..5_000u64).map(|i| (i, i + 1)).collect();
        let mut closure = SameAsClosure::new(make_store(&pairs), SAME_AS).unwrap();
        assert_eq!(closure.sames(TermId(1)).unwrap().len(), 4_999);
    }

    #[test]
    fn null_same_as_rejected() {
        assert!(SameAsClosure::new(make_store(&[]), TermId::NULL).is_err());
    }
}
