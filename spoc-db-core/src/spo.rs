//! Statement tuples and access patterns
//!
//! An [`Spo`] is an (s, p, o, c) tuple of [`TermId`]s plus a provenance tag
//! ([`StatementType`]). The context slot is [`TermId::NULL`] in triple mode.
//!
//! ## Identity
//!
//! Equality, hashing and the natural ordering consider only the four
//! fields. Two tuples that differ only in provenance are the same logical
//! statement; use [`StatementType::max`] to decide which tag survives.
//!
//! The natural `Ord` is canonical SPOC order. Index-specific orderings live on
//! [`KeyOrder`](crate::key_order::KeyOrder).

use crate::ids::TermId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Provenance of a statement
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementType {
    /// Asserted by a user
    Explicit,
    /// Built into the vocabulary
    Axiom,
    /// Derived by a rule
    Inferred,
}

impl StatementType {
    /// Precedence rank; higher wins.
    fn rank(self) -> u8 {
        match self {
            StatementType::Explicit => 2,
            StatementType::Axiom => 1,
            StatementType::Inferred => 0,
        }
    }

    /// Pick the tag that survives when the same statement arrives twice.
    ///
    /// `Explicit > Axiom > Inferred`
    pub fn max(self, other: StatementType) -> StatementType {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn is_explicit(self) -> bool {
        self == StatementType::Explicit
    }

    pub fn is_inferred(self) -> bool {
        self == StatementType::Inferred
    }

    /// Single-byte code used for value encodings
    pub fn code(self) -> u8 {
        match self {
            StatementType::Explicit => 0,
            StatementType::Axiom => 1,
            StatementType::Inferred => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StatementType::Explicit),
            1 => Some(StatementType::Axiom),
            2 => Some(StatementType::Inferred),
            _ => None,
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatementType::Explicit => "Explicit",
            StatementType::Axiom => "Axiom",
            StatementType::Inferred => "Inferred",
        };
        f.write_str(s)
    }
}

/// Position of a field within a statement
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpoField {
    S,
    P,
    O,
    C,
}

impl SpoField {
    /// Canonical (s, p, o, c) slot
    pub fn ordinal(self) -> usize {
        match self {
            SpoField::S => 0,
            SpoField::P => 1,
            SpoField::O => 2,
            SpoField::C => 3,
        }
    }

    pub fn all() -> &'static [SpoField] {
        &[SpoField::S, SpoField::P, SpoField::O, SpoField::C]
    }
}

impl fmt::Display for SpoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpoField::S => "s",
            SpoField::P => "p",
            SpoField::O => "o",
            SpoField::C => "c",
        };
        f.write_str(s)
    }
}

/// A statement tuple
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Spo {
    pub s: TermId,
    pub p: TermId,
    pub o: TermId,
    /// `TermId::NULL` in triple mode
    pub c: TermId,
    pub stmt_type: StatementType,
}

impl Spo {
    /// Triple-mode statement (context is NULL)
    pub fn triple(s: TermId, p: TermId, o: TermId, stmt_type: StatementType) -> Self {
        Self {
            s,
            p,
            o,
            c: TermId::NULL,
            stmt_type,
        }
    }

    /// Quad-mode statement
    pub fn quad(s: TermId, p: TermId, o: TermId, c: TermId, stmt_type: StatementType) -> Self {
        Self {
            s,
            p,
            o,
            c,
            stmt_type,
        }
    }

    #[inline]
    pub fn get(&self, field: SpoField) -> TermId {
        match field {
            SpoField::S => self.s,
            SpoField::P => self.p,
            SpoField::O => self.o,
            SpoField::C => self.c,
        }
    }

    /// Same fields, different provenance
    pub fn with_type(mut self, stmt_type: StatementType) -> Self {
        self.stmt_type = stmt_type;
        self
    }

    pub fn is_explicit(&self) -> bool {
        self.stmt_type.is_explicit()
    }

    pub fn is_inferred(&self) -> bool {
        self.stmt_type.is_inferred()
    }

    /// Field-wise equality that also compares provenance
    pub fn same_with_type(&self, other: &Spo) -> bool {
        self == other && self.stmt_type == other.stmt_type
    }

    #[inline]
    fn fields(&self) -> [TermId; 4] {
        [self.s, self.p, self.o, self.c]
    }
}

impl PartialEq for Spo {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl Eq for Spo {}

impl Hash for Spo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields().hash(state);
    }
}

impl PartialOrd for Spo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Spo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields().cmp(&other.fields())
    }
}

impl fmt::Display for Spo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.c.is_null() {
            write!(f, "({} {} {}) {}", self.s.0, self.p.0, self.o.0, self.stmt_type)
        } else {
            write!(
                f,
                "({} {} {} {}) {}",
                self.s.0, self.p.0, self.o.0, self.c.0, self.stmt_type
            )
        }
    }
}

/// Access pattern: each field is either bound to an id or a wildcard
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpoPattern {
    pub s: Option<TermId>,
    pub p: Option<TermId>,
    pub o: Option<TermId>,
    pub c: Option<TermId>,
}

impl SpoPattern {
    /// Fully unbound pattern
    pub fn any() -> Self {
        Self::default()
    }

    /// Triple pattern; NULL ids are treated as unbound
    pub fn new(s: TermId, p: TermId, o: TermId) -> Self {
        Self {
            s: s.non_null(),
            p: p.non_null(),
            o: o.non_null(),
            c: None,
        }
    }

    pub fn with_s(mut self, s: TermId) -> Self {
        self.s = s.non_null();
        self
    }

    pub fn with_p(mut self, p: TermId) -> Self {
        self.p = p.non_null();
        self
    }

    pub fn with_o(mut self, o: TermId) -> Self {
        self.o = o.non_null();
        self
    }

    pub fn with_c(mut self, c: TermId) -> Self {
        self.c = c.non_null();
        self
    }

    #[inline]
    pub fn get(&self, field: SpoField) -> Option<TermId> {
        match field {
            SpoField::S => self.s,
            SpoField::P => self.p,
            SpoField::O => self.o,
            SpoField::C => self.c,
        }
    }

    #[inline]
    pub fn is_bound(&self, field: SpoField) -> bool {
        self.get(field).is_some()
    }

    /// Number of bound fields
    pub fn bound_count(&self) -> usize {
        SpoField::all().iter().filter(|f| self.is_bound(**f)).count()
    }

    /// True if `spo` agrees with every bound field
    pub fn matches(&self, spo: &Spo) -> bool {
        SpoField::all()
            .iter()
            .all(|f| self.get(*f).map_or(true, |id| spo.get(*f) == id))
    }
}

impl fmt::Display for SpoPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<TermId>| match v {
            Some(id) => id.0.to_string(),
            None => "?".to_string(),
        };
        write!(
            f,
            "({} {} {} {})",
            show(self.s),
            show(self.p),
            show(self.o),
            show(self.c)
        )
    }
}
