//! Formula: optional response plus an ordered, duplicate-free predictor set.

use std::{
    fmt::{Display, Formatter, Result},
    str::FromStr,
};

use modelframe_core::Schema;

use crate::{
    bind::{self, BoundFormula},
    error::FormulaError,
    parser::parse_formula,
    term::{Term, interaction},
};

/// `response ~ predictors`, or a one-sided `~ predictors`.
///
/// Every operation returns a new `Formula`. Predictors keep insertion order and
/// never contain two structurally equal terms; crossings are expanded when they
/// are added or removed.
///
/// Removing the response term from the predictors marks it as released: a
/// later `+` of that term is kept as an ordinary predictor instead of being
/// rejected at bind time (`y ~ a + y - y + y`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formula {
    response: Option<Term>,
    predictors: Vec<Term>,
    response_removed: bool,
}

impl Formula {
    /// Empty formula with the given response.
    pub fn new(response: Option<Term>) -> Self {
        Self {
            response,
            predictors: Vec::new(),
            response_removed: false,
        }
    }

    /// `name ~ .`
    pub fn lhs(name: impl Into<String>) -> Self {
        Self::new(Some(Term::Variable(name.into()))).add(Term::Dot)
    }

    /// One-sided formula over `terms`, added in order.
    pub fn rhs(terms: impl IntoIterator<Item = Term>) -> Self {
        terms.into_iter().fold(Self::new(None), |f, t| f.add(t))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, FormulaError> {
        parse_formula(text)
    }

    pub fn response(&self) -> Option<&Term> {
        self.response.as_ref()
    }

    pub fn predictors(&self) -> &[Term] {
        &self.predictors
    }

    /// Whether `-` has removed the response term from the predictors.
    pub fn response_removed(&self) -> bool {
        self.response_removed
    }

    pub fn has_intercept(&self) -> bool {
        self.predictors.contains(&Term::Intercept)
    }

    /// Same predictors, new response. A different response starts unreleased.
    pub fn with_response(&self, response: Option<Term>) -> Self {
        Self {
            response_removed: self.response_removed && response == self.response,
            response,
            predictors: self.predictors.clone(),
        }
    }

    /// Union `term` into the predictors. Adding a present term is a no-op.
    pub fn add(&self, term: Term) -> Self {
        let mut next = self.clone();
        for t in expand(term) {
            if !next.predictors.contains(&t) {
                next.predictors.push(t);
            }
        }
        next
    }

    /// Remove `term` by structural match. Removing an absent term is a no-op.
    pub fn remove(&self, term: &Term) -> Self {
        let mut next = self.clone();
        for t in expand(term.clone()) {
            let Some(pos) = next.predictors.iter().position(|p| *p == t) else {
                continue;
            };
            next.predictors.remove(pos);
            if next.response.as_ref() == Some(&t) {
                next.response_removed = true;
            }
        }
        next
    }

    /// Resolves `.` against `schema` and validates every term, returning the
    /// formula with its final predictor list.
    pub fn expand(&self, schema: &Schema) -> std::result::Result<Self, FormulaError> {
        bind::resolve(self, schema)
    }

    pub fn bind(&self, schema: &Schema) -> std::result::Result<BoundFormula, FormulaError> {
        bind::bind(self, schema)
    }

    /// Same response and release state, new predictor list.
    pub(crate) fn with_predictors(&self, predictors: Vec<Term>) -> Self {
        Self {
            response: self.response.clone(),
            predictors,
            response_removed: self.response_removed,
        }
    }
}

/// Terms a single add/remove operand stands for.
fn expand(term: Term) -> Vec<Term> {
    match term {
        Term::Crossing(operands) => expand_crossing(&operands),
        other => vec![other],
    }
}

/// Every non-empty subset of `operands`: by size, then lexicographic by
/// operand position. Size-1 subsets are the operands themselves.
pub(crate) fn expand_crossing(operands: &[Term]) -> Vec<Term> {
    let mut out = Vec::new();
    for size in 1..=operands.len() {
        for combo in combinations(operands.len(), size) {
            let term = interaction(combo.into_iter().map(|i| operands[i].clone()));
            if !out.contains(&term) {
                out.push(term);
            }
        }
    }
    out
}

fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // Advance the rightmost index that still has room.
        let Some(pos) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return out;
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Renders the textual grammar; `parse(render(f)) == f` for every formula the
/// parser can produce.
///
/// An empty predictor set is written as `0`. A released response is written
/// as `y - y + y` where it was re-added, or as a trailing `+ y - y`.
///
/// Builder-made shapes outside the grammar render but do not parse back:
/// `.`, `1` or a crossing nested inside a function or interaction, or used as
/// the response; function names that are not plain identifiers; and the
/// empty variable name.
impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.response {
            Some(response) => write!(f, "{response} ~ ")?,
            None => f.write_str("~ ")?,
        }
        let released = self.response.as_ref().filter(|_| self.response_removed);
        if self.predictors.is_empty() {
            f.write_str("0")?;
        }
        for (i, term) in self.predictors.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            match released {
                Some(response) if response == term => write!(f, "{term} - {term} + {term}")?,
                _ => write!(f, "{term}")?,
            }
        }
        if let Some(response) = released.filter(|r| !self.predictors.contains(r)) {
            write!(f, " + {response} - {response}")?;
        }
        Ok(())
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_formula(s)
    }
}
