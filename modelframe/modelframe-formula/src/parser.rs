//! Formula parser built from nom parser combinators.
//!
//! # Grammar
//!
//! ```text
//! formula  := [termExpr] '~' rhs
//! rhs      := [sign] item (sign item)*
//! sign     := '+' | '-'
//! item     := '0' | '1' | termExpr
//! termExpr := '.'
//!           | factor ('::' factor)*
//!           | factor ('&&' factor)*
//! factor   := name | name '(' termExpr ')'
//! name     := [A-Za-z_][A-Za-z0-9_.]* | '`' [^`]+ '`'
//! ```
//!
//! `1` adds the intercept and `0` removes it; under `-` the meaning flips.
//! A wildcard or crossing may not appear as the response or inside a function.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, char, multispace0, satisfy},
    combinator::{eof, map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::{
    error::FormulaError,
    formula::Formula,
    term::{Term, crossing, interaction},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Term(Term),
    NoIntercept,
}

/// Parse formula text into a [`Formula`].
pub fn parse_formula(text: &str) -> Result<Formula, FormulaError> {
    let (_, (response, items)) = formula(text).map_err(|e| to_parse_error(text, e))?;

    let mut f = Formula::new(response);
    for (sign, item) in items {
        f = match (sign, item) {
            (Sign::Plus, Item::Term(t)) => f.add(t),
            (Sign::Minus, Item::Term(t)) => f.remove(&t),
            (Sign::Plus, Item::NoIntercept) => f.remove(&Term::Intercept),
            (Sign::Minus, Item::NoIntercept) => f.add(Term::Intercept),
        };
    }
    log::debug!("parsed formula '{text}' as '{f}'");
    Ok(f)
}

fn to_parse_error(text: &str, err: nom::Err<Error<&str>>) -> FormulaError {
    let (rest, kind) = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => (e.input, e.code),
        nom::Err::Incomplete(_) => ("", ErrorKind::Complete),
    };
    let position = text.len() - rest.len();
    let message = match kind {
        ErrorKind::Verify => {
            "a wildcard or crossing cannot be a response or a function argument".to_string()
        }
        _ if rest.trim().is_empty() => "unexpected end of formula".to_string(),
        ErrorKind::Eof => format!("unexpected input '{}'", rest.trim_end()),
        _ => format!("expected a term near '{}'", rest.trim_end()),
    };
    FormulaError::Parse { position, message }
}

fn formula(input: &str) -> IResult<&str, (Option<Term>, Vec<(Sign, Item)>)> {
    map(
        tuple((
            ws,
            opt(terminated(nested_term_expr, ws)),
            char('~'),
            ws,
            rhs,
            ws,
            eof,
        )),
        |(_, response, _, _, items, _, _)| (response, items),
    )(input)
}

fn rhs(input: &str) -> IResult<&str, Vec<(Sign, Item)>> {
    let (input, first_sign) = opt(terminated(sign, ws))(input)?;
    let (input, first) = item(input)?;
    let (input, rest) = many0(pair(preceded(ws, sign), preceded(ws, item)))(input)?;

    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push((first_sign.unwrap_or(Sign::Plus), first));
    items.extend(rest);
    Ok((input, items))
}

fn sign(input: &str) -> IResult<&str, Sign> {
    alt((value(Sign::Plus, char('+')), value(Sign::Minus, char('-'))))(input)
}

fn item(input: &str) -> IResult<&str, Item> {
    alt((
        value(Item::NoIntercept, terminated(char('0'), not(ident_char))),
        value(
            Item::Term(Term::Intercept),
            terminated(char('1'), not(ident_char)),
        ),
        map(term_expr, Item::Term),
    ))(input)
}

fn term_expr(input: &str) -> IResult<&str, Term> {
    alt((
        value(Term::Dot, terminated(char('.'), not(ident_char))),
        map(
            pair(factor, many1(preceded(delimited(ws, tag("::"), ws), factor))),
            |(first, rest)| interaction(std::iter::once(first).chain(rest)),
        ),
        map(
            pair(factor, many1(preceded(delimited(ws, tag("&&"), ws), factor))),
            |(first, rest)| crossing(std::iter::once(first).chain(rest)),
        ),
        factor,
    ))(input)
}

/// A term expression that must not be a wildcard or a crossing.
fn nested_term_expr(input: &str) -> IResult<&str, Term> {
    let (rest, term) = term_expr(input)?;
    if matches!(term, Term::Dot | Term::Crossing(_)) {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    Ok((rest, term))
}

fn factor(input: &str) -> IResult<&str, Term> {
    let (input, name) = name(input)?;
    let (input, inner) = opt(delimited(
        pair(ws, char('(')),
        delimited(ws, nested_term_expr, ws),
        char(')'),
    ))(input)?;
    let term = match inner {
        Some(inner) => Term::Function(name, Box::new(inner)),
        None => Term::Variable(name),
    };
    Ok((input, term))
}

fn name(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('`'), take_while1(|c: char| c != '`'), char('`')),
            String::from,
        ),
        map(identifier, String::from),
    ))(input)
}

/// Identifier: starts with a letter or `_`, continues with letters, digits, `_` or `.`.
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"), tag(".")))),
    ))(input)
}

fn ident_char(input: &str) -> IResult<&str, char> {
    satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

fn ws(input: &str) -> IResult<&str, ()> {
    value((), multispace0)(input)
}
