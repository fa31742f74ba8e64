//! Term algebra: the tagged AST shared by the parser, the builder and the binder.

use std::fmt::{Display, Formatter, Result};

/// Smallest algebraic unit of a formula.
///
/// Terms compare structurally: same variant and recursively equal operands in
/// order. `Crossing` exists only before a term is added to a
/// [`Formula`](crate::Formula); `Dot` exists only until binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Reference to a column by name.
    Variable(String),
    /// Named elementwise function applied to an inner term.
    Function(String, Box<Term>),
    /// Single term over two or more operands (no implied main effects).
    Interaction(Vec<Term>),
    /// All main effects and interactions among the operands.
    Crossing(Vec<Term>),
    /// Every schema column not otherwise referenced.
    Dot,
    Intercept,
}

pub fn variable(name: impl Into<String>) -> Term {
    Term::Variable(name.into())
}

pub fn function(name: impl Into<String>, inner: Term) -> Term {
    Term::Function(name.into(), Box::new(inner))
}

/// Builds an interaction, flattening nested interactions into one operand list.
///
/// A single operand is returned as-is.
pub fn interaction(operands: impl IntoIterator<Item = Term>) -> Term {
    let mut flat = Vec::new();
    for operand in operands {
        match operand {
            Term::Interaction(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        return flat.remove(0);
    }
    Term::Interaction(flat)
}

/// Builds a crossing; repeated operands are dropped, keeping the first.
///
/// A single operand is returned as-is.
pub fn crossing(operands: impl IntoIterator<Item = Term>) -> Term {
    let mut unique: Vec<Term> = Vec::new();
    for operand in operands {
        if !unique.contains(&operand) {
            unique.push(operand);
        }
    }
    if unique.len() == 1 {
        return unique.remove(0);
    }
    Term::Crossing(unique)
}

pub fn dot() -> Term {
    Term::Dot
}

pub fn intercept() -> Term {
    Term::Intercept
}

impl Term {
    /// Column names referenced anywhere in the term, in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Term::Variable(name) => out.push(name),
            Term::Function(_, inner) => inner.collect_variables(out),
            Term::Interaction(operands) | Term::Crossing(operands) => {
                for operand in operands {
                    operand.collect_variables(out);
                }
            }
            Term::Dot | Term::Intercept => {}
        }
    }

    /// `true` if a `Dot` or `Crossing` occurs strictly below this term.
    pub(crate) fn has_nested_placeholder(&self) -> bool {
        match self {
            Term::Function(_, inner) => inner.is_placeholder() || inner.has_nested_placeholder(),
            Term::Interaction(operands) | Term::Crossing(operands) => operands
                .iter()
                .any(|operand| operand.is_placeholder() || operand.has_nested_placeholder()),
            Term::Variable(_) | Term::Dot | Term::Intercept => false,
        }
    }

    fn is_placeholder(&self) -> bool {
        matches!(self, Term::Dot | Term::Crossing(_))
    }

    /// Name used for output fields: the textual form without identifier quoting.
    pub fn canonical_name(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, false);
        out
    }

    fn render(&self, out: &mut String, quote: bool) {
        match self {
            Term::Variable(name) if quote => push_identifier(out, name),
            Term::Variable(name) => out.push_str(name),
            Term::Function(name, inner) => {
                out.push_str(name);
                out.push('(');
                inner.render(out, quote);
                out.push(')');
            }
            Term::Interaction(operands) => render_joined(out, operands, "::", quote),
            Term::Crossing(operands) => render_joined(out, operands, " && ", quote),
            Term::Dot => out.push('.'),
            Term::Intercept => out.push('1'),
        }
    }
}

fn render_joined(out: &mut String, operands: &[Term], sep: &str, quote: bool) {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        operand.render(out, quote);
    }
}

pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn push_identifier(out: &mut String, name: &str) {
    if is_plain_identifier(name) {
        out.push_str(name);
    } else {
        out.push('`');
        out.push_str(name);
        out.push('`');
    }
}

/// Renders the textual grammar form, quoting column names with backticks
/// where they are not plain identifiers. Function names are written as given,
/// and nested `.`, `1` or crossings are written in place, so such builder-made
/// terms do not parse back.
impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut out = String::new();
        self.render(&mut out, true);
        f.write_str(&out)
    }
}
