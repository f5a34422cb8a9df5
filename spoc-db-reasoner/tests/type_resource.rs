//! `(x rdf:type rdfs:Resource)` backward chaining and the access path factory.

use spoc_db_core::{
    drain, BufferConfig, ChunkedOrderedIterator, KeyOrder, MemoryStore, Spo, SpoPattern,
    StatementIndex, StatementType, TermId,
};
use spoc_db_reasoner::{
    BackchainAccessPath, InferenceOptions, ReasonerError, TypeResourceIterator, Vocabulary,
};
use std::sync::Arc;

const TYPE: TermId = TermId(101);
const RESOURCE: TermId = TermId(102);
const SAME: TermId = TermId(103);
const KNOWS: TermId = TermId(20);
const CLASS: TermId = TermId(30);
const LITERAL: TermId = TermId(5);

fn vocab() -> Vocabulary {
    Vocabulary::new(TYPE, RESOURCE, SAME)
}

/// `(1 knows 4)`, `(2 knows "5")`, `(4 type Resource)`, `(2 type 30)`
fn make_store() -> Arc<dyn StatementIndex> {
    let store = MemoryStore::new();
    store.insert(Spo::triple(TermId(1), KNOWS, TermId(4), StatementType::Explicit));
    store.insert(Spo::triple(TermId(2), KNOWS, LITERAL, StatementType::Explicit));
    store.insert(Spo::triple(TermId(4), TYPE, RESOURCE, StatementType::Explicit));
    store.insert(Spo::triple(TermId(2), TYPE, CLASS, StatementType::Explicit));
    store.mark_literal(LITERAL);
    Arc::new(store)
}

fn make_path(store: &Arc<dyn StatementIndex>, pattern: SpoPattern) -> BackchainAccessPath {
    BackchainAccessPath::new(
        Arc::clone(store),
        pattern,
        vocab(),
        InferenceOptions::default(),
    )
}

fn read(store: &Arc<dyn StatementIndex>, pattern: SpoPattern) -> Vec<Spo> {
    let mut it = make_path(store, pattern).iterator().unwrap();
    drain(&mut it).unwrap()
}

fn type_resource_subjects(tuples: &[Spo]) -> Vec<(u64, bool)> {
    tuples
        .iter()
        .filter(|t| t.p == TYPE && t.o == RESOURCE)
        .map(|t| (t.s.0, t.is_explicit()))
        .collect()
}

#[test]
fn every_resource_once() {
    let store = make_store();
    let got = read(&store, SpoPattern::any().with_p(TYPE).with_o(RESOURCE));
    assert_eq!(got.len(), 5);
    // 5 is a literal; 30 and Resource itself occur as objects
    assert_eq!(
        type_resource_subjects(&got),
        vec![(1, false), (2, false), (4, true), (30, false), (102, false)]
    );
}

#[test]
fn scan_tuples_come_first() {
    let store = make_store();
    let got = read(&store, SpoPattern::any().with_p(TYPE));
    assert_eq!(got.len(), 6);
    assert_eq!((got[0].s, got[0].o), (TermId(2), CLASS));
    assert_eq!(type_resource_subjects(&got).len(), 5);
}

#[test]
fn bound_subject_appends_one() {
    let store = make_store();
    let got = read(&store, SpoPattern::any().with_s(TermId(1)));
    assert_eq!(got.len(), 2);
    assert_eq!((got[0].p, got[0].o), (KNOWS, TermId(4)));
    assert_eq!(type_resource_subjects(&got), vec![(1, false)]);

    let got = read(&store, SpoPattern::any().with_s(TermId(4)));
    assert_eq!(type_resource_subjects(&got), vec![(4, true)]);
    assert_eq!(got.len(), 1);
}

#[test]
fn fast_path_leaves_scan_alone() {
    let store = make_store();
    assert_eq!(read(&store, SpoPattern::any().with_p(KNOWS)).len(), 2);
    assert_eq!(read(&store, SpoPattern::any().with_o(TermId(4))).len(), 1);
    assert!(!TypeResourceIterator::applies(
        &SpoPattern::any().with_c(TermId(9)),
        &vocab()
    ));
    assert!(TypeResourceIterator::applies(&SpoPattern::any(), &vocab()));
}

#[test]
fn disabled_when_closure_stores_it() {
    let store = make_store();
    let options = InferenceOptions {
        forward_chain_rdf_type_rdfs_resource: true,
        ..InferenceOptions::default()
    };
    let path = BackchainAccessPath::new(
        Arc::clone(&store),
        SpoPattern::any().with_p(TYPE),
        vocab(),
        options,
    );
    assert_eq!(path.range_count(true).unwrap(), 2);
}

#[test]
fn range_count_fast_and_exact() {
    let store = make_store();
    let path = make_path(&store, SpoPattern::any().with_p(TYPE).with_o(RESOURCE));
    assert_eq!(path.key_order(), KeyOrder::Pos);
    assert_eq!(path.range_count(false).unwrap(), 1);
    assert_eq!(path.range_count(true).unwrap(), 5);
}

#[test]
fn missing_vocabulary_rejected() {
    let store = make_store();
    let path = BackchainAccessPath::new(
        Arc::clone(&store),
        SpoPattern::any(),
        Vocabulary::new(TermId::NULL, RESOURCE, SAME),
        InferenceOptions::default(),
    );
    assert!(matches!(
        path.iterator(),
        Err(ReasonerError::InvalidArgument(_))
    ));
}

#[test]
fn chunks_never_mix_phases() {
    let store = MemoryStore::new().with_chunk_size(64);
    for i in 1..=250u64 {
        store.insert(Spo::triple(
            TermId(1000 + i),
            KNOWS,
            TermId(5000 + i),
            StatementType::Explicit,
        ));
    }
    let store: Arc<dyn StatementIndex> = Arc::new(store);
    let src = store.scan(KeyOrder::Spo, &SpoPattern::any()).unwrap();
    let mut it =
        TypeResourceIterator::new(src, &SpoPattern::any(), Arc::clone(&store), vocab(), 100)
            .unwrap();
    assert_eq!(it.key_order(), Some(KeyOrder::Spo));

    let mut synthesizing = false;
    let mut total = 0;
    loop {
        let chunk = it.next_chunk().unwrap();
        if chunk.is_empty() {
            break;
        }
        let synthesized = chunk.iter().filter(|t| t.p == TYPE).count();
        if synthesized == 0 {
            assert!(!synthesizing, "scan chunk after synthesized chunk");
        } else {
            assert_eq!(synthesized, chunk.len(), "mixed chunk");
            assert!(chunk.len() <= 100);
            synthesizing = true;
        }
        assert!(KeyOrder::Spo.is_sorted(&chunk));
        total += chunk.len();
    }
    assert_eq!(total, 250 + 500);
    assert_eq!(it.inferred_count(), 500);
    it.close();
    it.close();
    assert!(!it.has_next().unwrap());
}

#[test]
fn chunks_resort_on_request() {
    let store = make_store();
    let src = store.scan(KeyOrder::Spo, &SpoPattern::any()).unwrap();
    let mut it =
        TypeResourceIterator::new(src, &SpoPattern::any(), Arc::clone(&store), vocab(), 2).unwrap();
    loop {
        let chunk = it.next_chunk_in(KeyOrder::Osp).unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(KeyOrder::Osp.is_sorted(&chunk));
    }
}

#[test]
fn buffered_path_matches_direct_path() {
    let store = MemoryStore::new();
    for i in 1..=600u64 {
        store.insert(Spo::triple(TermId(i), KNOWS, TermId(i + 1), StatementType::Explicit));
    }
    let store: Arc<dyn StatementIndex> = Arc::new(store);
    let pattern = SpoPattern::any().with_p(KNOWS);

    let direct = read(&store, pattern);
    let buffered = {
        let path = make_path(&store, pattern).with_buffer(BufferConfig {
            capacity: 128,
            async_enabled: true,
        });
        let mut it = path.iterator().unwrap();
        drain(&mut it).unwrap()
    };
    assert_eq!(direct.len(), 600);
    assert_eq!(buffered, direct);
}

#[test]
fn stored_statements_keep_their_type() {
    let store = MemoryStore::new();
    store.insert(Spo::triple(TermId(7), TYPE, RESOURCE, StatementType::Axiom));
    store.insert(Spo::triple(TermId(8), TYPE, RESOURCE, StatementType::Inferred));
    let store: Arc<dyn StatementIndex> = Arc::new(store);

    let got = read(&store, SpoPattern::any().with_p(TYPE).with_o(RESOURCE));
    let tags: Vec<(u64, StatementType)> = got
        .iter()
        .filter(|t| t.s == TermId(7) || t.s == TermId(8))
        .map(|t| (t.s.0, t.stmt_type))
        .collect();
    assert_eq!(tags, vec![(7, StatementType::Axiom), (8, StatementType::Inferred)]);
    // Resource itself is the only synthesized tuple
    assert_eq!(got.len(), 3);
}

#[test]
fn bound_subject_seen_in_any_context() {
    let store = MemoryStore::new_quads();
    store.insert(Spo::quad(TermId(7), TYPE, RESOURCE, TermId(50), StatementType::Explicit));
    let store: Arc<dyn StatementIndex> = Arc::new(store);

    let got = read(&store, SpoPattern::any().with_s(TermId(7)));
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].c, TermId(50));
    assert!(got[0].is_explicit());
}

#[test]
fn stored_contexts_survive_the_merge() {
    let store = MemoryStore::new_quads();
    store.insert(Spo::quad(TermId(7), TYPE, RESOURCE, TermId(50), StatementType::Explicit));
    store.insert(Spo::quad(TermId(7), TYPE, RESOURCE, TermId(60), StatementType::Axiom));
    store.insert(Spo::quad(TermId(7), KNOWS, TermId(9), TermId(50), StatementType::Explicit));
    let store: Arc<dyn StatementIndex> = Arc::new(store);

    let mut got: Vec<(u64, u64, StatementType)> = read(&store, SpoPattern::any().with_p(TYPE))
        .iter()
        .map(|t| (t.s.0, t.c.0, t.stmt_type))
        .collect();
    got.sort_unstable_by_key(|&(s, c, _)| (s, c));
    assert_eq!(
        got,
        vec![
            (7, 50, StatementType::Explicit),
            (7, 60, StatementType::Axiom),
            (9, 0, StatementType::Inferred),
            (102, 0, StatementType::Inferred),
        ]
    );
}
