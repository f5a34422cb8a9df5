//! Statement index key orders
//!
//! Each physical statement index is sorted by one permutation of the tuple
//! fields. Triple mode uses three permutations, quad mode six:
//!
//! | Index | Order | Use Case |
//! |------:|-------|----------|
//! | 0 | SPO  | triple: subject lookups, full scans |
//! | 1 | OSP  | triple: object lookups, subject+object |
//! | 2 | POS  | triple: predicate and predicate+object lookups |
//! | 3 | SPOC | quad: subject lookups, full scans |
//! | 4 | POCS | quad: predicate / predicate+object |
//! | 5 | OCSP | quad: object / object+context |
//! | 6 | CSPO | quad: context / context+subject |
//! | 7 | PCSO | quad: predicate+context |
//! | 8 | SOPC | quad: subject+object |
//!
//! The index numbers are persisted and must never change.
//!
//! ## Key encoding
//!
//! A key is the tuple's fields in permutation order, each written as an 8-byte
//! big-endian `u64`, so unsigned lexicographic byte order equals the field
//! order the permutation names. Decoding always restores canonical
//! (s, p, o, c) layout; the context of a triple key decodes as `TermId::NULL`.

use crate::error::{Error, Result};
use crate::ids::TermId;
use crate::spo::{Spo, SpoField, SpoPattern, StatementType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Width of one encoded field
pub const FIELD_BYTES: usize = 8;

/// Number of registered key orders
pub const MAX_INDEX_COUNT: usize = 9;

/// Statement index permutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyOrder {
    Spo = 0,
    Osp = 1,
    Pos = 2,
    Spoc = 3,
    Pocs = 4,
    Ocsp = 5,
    Cspo = 6,
    Pcso = 7,
    Sopc = 8,
}

use SpoField::{C, O, P, S};

impl KeyOrder {
    /// All key orders, by index
    pub fn all() -> &'static [KeyOrder] {
        &[
            KeyOrder::Spo,
            KeyOrder::Osp,
            KeyOrder::Pos,
            KeyOrder::Spoc,
            KeyOrder::Pocs,
            KeyOrder::Ocsp,
            KeyOrder::Cspo,
            KeyOrder::Pcso,
            KeyOrder::Sopc,
        ]
    }

    /// The three triple-mode orders
    pub fn triple_orders() -> &'static [KeyOrder] {
        &Self::all()[0..3]
    }

    /// The six quad-mode orders
    pub fn quad_orders() -> &'static [KeyOrder] {
        &Self::all()[3..]
    }

    /// Look up a key order by its persisted index
    pub fn value_of(index: usize) -> Result<KeyOrder> {
        Self::all().get(index).copied().ok_or_else(|| {
            Error::invalid_key_order(format!(
                "index {} out of range [0, {})",
                index, MAX_INDEX_COUNT
            ))
        })
    }

    /// Persisted index
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Fields in key order
    pub fn fields(self) -> &'static [SpoField] {
        match self {
            KeyOrder::Spo => &[S, P, O],
            KeyOrder::Osp => &[O, S, P],
            KeyOrder::Pos => &[P, O, S],
            KeyOrder::Spoc => &[S, P, O, C],
            KeyOrder::Pocs => &[P, O, C, S],
            KeyOrder::Ocsp => &[O, C, S, P],
            KeyOrder::Cspo => &[C, S, P, O],
            KeyOrder::Pcso => &[P, C, S, O],
            KeyOrder::Sopc => &[S, O, P, C],
        }
    }

    /// 3 for triple orders, 4 for quad orders
    #[inline]
    pub fn arity(self) -> usize {
        self.fields().len()
    }

    #[inline]
    pub fn is_quad(self) -> bool {
        self.arity() == 4
    }

    /// The order that holds the authoritative statement values
    pub fn is_primary(self) -> bool {
        matches!(self, KeyOrder::Spo | KeyOrder::Spoc)
    }

    /// Primary order for the given mode
    pub fn primary(quads: bool) -> KeyOrder {
        if quads {
            KeyOrder::Spoc
        } else {
            KeyOrder::Spo
        }
    }

    /// Position of `field` within the key, or `None` if the order does not
    /// carry that field (context in a triple order).
    pub fn position_in_key(self, field: SpoField) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }

    /// Position of a field given by name (`"s"`, `"p"`, `"o"`, `"c"`)
    pub fn index_of(self, field_name: &str) -> Result<Option<usize>> {
        let field = match field_name {
            "s" | "S" => S,
            "p" | "P" => P,
            "o" | "O" => O,
            "c" | "C" => C,
            other => {
                return Err(Error::invalid_argument(format!(
                    "unknown field name: {}",
                    other
                )))
            }
        };
        Ok(self.position_in_key(field))
    }

    /// Key length in bytes
    #[inline]
    pub fn key_len(self) -> usize {
        self.arity() * FIELD_BYTES
    }

    /// Encode the tuple's fields in this order
    pub fn encode_key(self, spo: &Spo) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.key_len());
        for field in self.fields() {
            key.extend_from_slice(&spo.get(*field).0.to_be_bytes());
        }
        key
    }

    /// Decode a key back into canonical (s, p, o, c) layout.
    ///
    /// The returned tuple is tagged `Explicit`; provenance lives in the value,
    /// not the key.
    pub fn decode_key(self, key: &[u8]) -> Result<Spo> {
        if key.len() != self.key_len() {
            return Err(Error::invalid_argument(format!(
                "{} key must be {} bytes, got {}",
                self,
                self.key_len(),
                key.len()
            )));
        }
        let mut ids = [TermId::NULL; 4];
        for (i, field) in self.fields().iter().enumerate() {
            let mut buf = [0u8; FIELD_BYTES];
            buf.copy_from_slice(&key[i * FIELD_BYTES..(i + 1) * FIELD_BYTES]);
            ids[field.ordinal()] = TermId(u64::from_be_bytes(buf));
        }
        Ok(Spo::quad(ids[0], ids[1], ids[2], ids[3], StatementType::Explicit))
    }

    /// Comparator function for this order
    pub fn comparator(self) -> fn(&Spo, &Spo) -> Ordering {
        match self {
            KeyOrder::Spo => cmp_spo,
            KeyOrder::Osp => cmp_osp,
            KeyOrder::Pos => cmp_pos,
            KeyOrder::Spoc => cmp_spoc,
            KeyOrder::Pocs => cmp_pocs,
            KeyOrder::Ocsp => cmp_ocsp,
            KeyOrder::Cspo => cmp_cspo,
            KeyOrder::Pcso => cmp_pcso,
            KeyOrder::Sopc => cmp_sopc,
        }
    }

    /// Compare two tuples under this order
    #[inline]
    pub fn compare(self, a: &Spo, b: &Spo) -> Ordering {
        self.comparator()(a, b)
    }

    /// Sort a chunk in place under this order
    pub fn sort(self, chunk: &mut [Spo]) {
        chunk.sort_unstable_by(self.comparator());
    }

    /// True if `chunk` is non-decreasing under this order
    pub fn is_sorted(self, chunk: &[Spo]) -> bool {
        let cmp = self.comparator();
        chunk.windows(2).all(|w| cmp(&w[0], &w[1]) != Ordering::Greater)
    }

    /// Select the order whose leading fields cover the bound fields of
    /// `pattern`.
    ///
    /// Triple mode:
    /// - SPO: s, sp, spo, or nothing bound
    /// - OSP: o, so
    /// - POS: p, po
    ///
    /// Quad mode:
    /// - POCS: p, po, poc
    /// - OCSP: o, oc, soc
    /// - CSPO: c, sc, spc
    /// - PCSO: pc
    /// - SOPC: so
    /// - SPOC: everything else (s, sp, spo, spoc, nothing)
    pub fn for_pattern(pattern: &SpoPattern, quads: bool) -> KeyOrder {
        let s = pattern.is_bound(S);
        let p = pattern.is_bound(P);
        let o = pattern.is_bound(O);
        if !quads {
            return match (s, p, o) {
                (_, false, true) => KeyOrder::Osp,
                (false, true, _) => KeyOrder::Pos,
                _ => KeyOrder::Spo,
            };
        }
        let c = pattern.is_bound(C);
        match (s, p, o, c) {
            (false, true, false, false)
            | (false, true, true, false)
            | (false, true, true, true) => KeyOrder::Pocs,
            (false, false, true, false)
            | (false, false, true, true)
            | (true, false, true, true) => KeyOrder::Ocsp,
            (false, false, false, true)
            | (true, false, false, true)
            | (true, true, false, true) => KeyOrder::Cspo,
            (false, true, false, true) => KeyOrder::Pcso,
            (true, false, true, false) => KeyOrder::Sopc,
            _ => KeyOrder::Spoc,
        }
    }

    /// Number of leading key fields bound by `pattern`
    pub fn prefix_len(self, pattern: &SpoPattern) -> usize {
        self.fields()
            .iter()
            .take_while(|f| pattern.is_bound(**f))
            .count()
    }

    /// Inclusive lower bound of the key range for `pattern`: the encoded
    /// leading run of bound fields.
    pub fn from_key(self, pattern: &SpoPattern) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.key_len());
        for field in self.fields() {
            match pattern.get(*field) {
                Some(id) => key.extend_from_slice(&id.0.to_be_bytes()),
                None => break,
            }
        }
        key
    }

    /// Exclusive upper bound of the key range for `pattern`: the successor
    /// of the bound prefix. `None` when the range is unbounded above.
    pub fn to_key(self, pattern: &SpoPattern) -> Option<Vec<u8>> {
        successor(self.from_key(pattern))
    }

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            KeyOrder::Spo => "spo",
            KeyOrder::Osp => "osp",
            KeyOrder::Pos => "pos",
            KeyOrder::Spoc => "spoc",
            KeyOrder::Pocs => "pocs",
            KeyOrder::Ocsp => "ocsp",
            KeyOrder::Cspo => "cspo",
            KeyOrder::Pcso => "pcso",
            KeyOrder::Sopc => "sopc",
        }
    }
}

/// Smallest byte string greater than every string prefixed by `prefix`.
fn successor(mut prefix: Vec<u8>) -> Option<Vec<u8>> {
    while let Some(last) = prefix.pop() {
        if last != u8::MAX {
            prefix.push(last + 1);
            return Some(prefix);
        }
    }
    None
}

impl fmt::Display for KeyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

impl std::str::FromStr for KeyOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        KeyOrder::all()
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or_else(|| Error::invalid_key_order(format!("unknown key order: {}", s)))
    }
}

// === Order-specific comparators ===

macro_rules! key_cmp {
    ($(#[$doc:meta])* $name:ident: $first:ident $(, $rest:ident)*) => {
        $(#[$doc])*
        pub fn $name(a: &Spo, b: &Spo) -> Ordering {
            a.$first.cmp(&b.$first)
                $(.then_with(|| a.$rest.cmp(&b.$rest)))*
        }
    };
}

key_cmp!(
    /// Subject, Predicate, Object
    cmp_spo: s, p, o
);
key_cmp!(
    /// Object, Subject, Predicate
    cmp_osp: o, s, p
);
key_cmp!(
    /// Predicate, Object, Subject
    cmp_pos: p, o, s
);
key_cmp!(
    /// Subject, Predicate, Object, Context
    cmp_spoc: s, p, o, c
);
key_cmp!(
    /// Predicate, Object, Context, Subject
    cmp_pocs: p, o, c, s
);
key_cmp!(
    /// Object, Context, Subject, Predicate
    cmp_ocsp: o, c, s, p
);
key_cmp!(
    /// Context, Subject, Predicate, Object
    cmp_cspo: c, s, p, o
);
key_cmp!(
    /// Predicate, Context, Subject, Object
    cmp_pcso: p, c, s, o
);
key_cmp!(
    /// Subject, Object, Predicate, Context
    cmp_sopc: s, o, p, c
);
