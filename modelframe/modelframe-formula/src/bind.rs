//! Binding: resolve a [`Formula`] against a [`Schema`] into an evaluation plan.
//!
//! Steps:
//! 1. Replace `.` with the schema fields not referenced elsewhere.
//! 2. Check that every referenced column exists and that the response is not
//!    also a predictor, unless it was removed with `-` and added back.
//! 3. Plan each term in final order: its output field(s) and the columns it reads.
//! 4. Assemble the output schema: response first, then predictor outputs in
//!    term order. A re-added response is listed once.

use std::collections::HashSet;

use modelframe_core::{DataTypeDef, FieldDef, Schema};

use crate::{error::FormulaError, formula::Formula, function::MathFunction, term::Term};

/// Numeric expression over bind-time schema columns.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanExpr {
    /// Value of the numeric column at this index of the bind-time schema.
    Column(usize),
    Apply(MathFunction, Box<PlanExpr>),
    Product(Vec<PlanExpr>),
}

impl PlanExpr {
    /// Evaluates the expression, reading columns through `value`.
    ///
    /// Missing inputs should be reported as NaN; NaN propagates through every
    /// function and product.
    pub fn eval(&self, value: &impl Fn(usize) -> f64) -> f64 {
        match self {
            PlanExpr::Column(index) => value(*index),
            PlanExpr::Apply(f, inner) => f.apply(inner.eval(value)),
            PlanExpr::Product(factors) => factors.iter().map(|e| e.eval(value)).product(),
        }
    }

    fn collect_columns(&self, out: &mut Vec<usize>) {
        match self {
            PlanExpr::Column(index) => out.push(*index),
            PlanExpr::Apply(_, inner) => inner.collect_columns(out),
            PlanExpr::Product(factors) => {
                for factor in factors {
                    factor.collect_columns(out);
                }
            }
        }
    }
}

/// Operand of an interaction that involves at least one categorical column.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Numeric(PlanExpr),
    Factor { column: usize, levels: Vec<String> },
}

/// How a term turns input columns into its output field(s).
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    /// One numeric output: a numeric column, a function, or an all-numeric
    /// interaction.
    Numeric(PlanExpr),
    /// One categorical output carrying the column's declared levels.
    Categorical { column: usize, levels: Vec<String> },
    /// One `f64` output per level combination. `combinations[i][j]` is the level
    /// index of the `j`-th `Factor` operand for output `i`.
    FactorInteraction {
        operands: Vec<Operand>,
        combinations: Vec<Vec<usize>>,
    },
}

/// Plan for one finalized term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermPlan {
    term: Term,
    kind: PlanKind,
    outputs: Vec<FieldDef>,
    sources: Vec<usize>,
}

impl TermPlan {
    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn kind(&self) -> &PlanKind {
        &self.kind
    }

    /// Output fields produced by this term, in output-schema order.
    pub fn outputs(&self) -> &[FieldDef] {
        &self.outputs
    }

    /// Indices into the bind-time schema of the columns this term reads.
    pub fn source_indices(&self) -> &[usize] {
        &self.sources
    }
}

/// A formula resolved against a schema. Immutable; safe to share across threads
/// and to evaluate against any table compatible with [`input_schema`](Self::input_schema).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFormula {
    formula: Formula,
    input: Schema,
    output: Schema,
    response: Option<TermPlan>,
    predictors: Vec<TermPlan>,
}

impl BoundFormula {
    /// The formula with `.` resolved.
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Schema the formula was bound against.
    pub fn input_schema(&self) -> &Schema {
        &self.input
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output
    }

    pub fn response(&self) -> Option<&TermPlan> {
        self.response.as_ref()
    }

    /// Plans for every predictor except the intercept.
    pub fn predictors(&self) -> &[TermPlan] {
        &self.predictors
    }

    pub fn has_intercept(&self) -> bool {
        self.formula.has_intercept()
    }

    /// Fields of the input schema read by any plan, in schema order.
    pub fn source_fields(&self) -> Vec<&FieldDef> {
        let used: HashSet<usize> = self
            .response
            .iter()
            .chain(&self.predictors)
            .flat_map(|p| p.sources.iter().copied())
            .collect();
        self.input
            .iter()
            .enumerate()
            .filter(|(i, _)| used.contains(i))
            .map(|(_, f)| f)
            .collect()
    }
}

/// Bind `formula` to `schema`. Pure: identical inputs give identical plans.
pub fn bind(formula: &Formula, schema: &Schema) -> Result<BoundFormula, FormulaError> {
    let resolved = resolve(formula, schema)?;

    let response = resolved
        .response()
        .map(|term| plan_response(term, schema))
        .transpose()?;

    let mut predictors = Vec::with_capacity(resolved.predictors().len());
    for term in resolved.predictors() {
        if *term == Term::Intercept {
            continue;
        }
        let plan = plan_term(term, schema)?;
        log::trace!("planned '{}' -> {} output(s)", term, plan.outputs.len());
        predictors.push(plan);
    }

    // A re-added response shares the response's output field.
    let outputs: Vec<FieldDef> = response
        .iter()
        .chain(
            predictors
                .iter()
                .filter(|p| Some(&p.term) != resolved.response()),
        )
        .flat_map(|p| p.outputs.iter().cloned())
        .collect();
    let output = Schema::new(outputs)?;

    log::debug!(
        "bound '{}' against {} column(s): {} term(s), {} output field(s)",
        resolved,
        schema.len(),
        predictors.len(),
        output.len()
    );

    Ok(BoundFormula {
        formula: resolved,
        input: schema.clone(),
        output,
        response,
        predictors,
    })
}

/// Dot resolution plus validation; returns the formula with its final term list.
pub(crate) fn resolve(formula: &Formula, schema: &Schema) -> Result<Formula, FormulaError> {
    let mut excluded: HashSet<&str> = HashSet::new();
    if let Some(response) = formula.response() {
        excluded.extend(response.variables());
    }
    for term in formula.predictors() {
        excluded.extend(term.variables());
    }

    let mut predictors: Vec<Term> = Vec::with_capacity(formula.predictors().len());
    let mut dot_seen = false;
    for term in formula.predictors() {
        if *term != Term::Dot {
            if !predictors.contains(term) {
                predictors.push(term.clone());
            }
            continue;
        }
        if dot_seen {
            continue;
        }
        dot_seen = true;
        for name in schema.names().filter(|name| !excluded.contains(name)) {
            let expanded = Term::Variable(name.to_string());
            if !predictors.contains(&expanded) {
                predictors.push(expanded);
            }
        }
    }

    let resolved = formula.with_predictors(predictors);
    validate(&resolved, schema)?;
    Ok(resolved)
}

fn validate(formula: &Formula, schema: &Schema) -> Result<(), FormulaError> {
    let terms = formula.response().into_iter().chain(formula.predictors());
    for term in terms.clone() {
        if let Some(missing) = term
            .variables()
            .into_iter()
            .find(|name| schema.field(name).is_none())
        {
            return Err(FormulaError::UnresolvedColumn(missing.to_string()));
        }
    }
    for term in terms {
        if term.has_nested_placeholder() {
            return Err(FormulaError::invalid_term(
                term,
                "a wildcard or crossing cannot be nested inside another term",
            ));
        }
    }
    if let Some(response) = formula.response() {
        if !formula.response_removed() && formula.predictors().contains(response) {
            return Err(FormulaError::DuplicateResponseInPredictors(
                response.to_string(),
            ));
        }
    }
    Ok(())
}

fn plan_response(term: &Term, schema: &Schema) -> Result<TermPlan, FormulaError> {
    match term {
        Term::Variable(_) | Term::Function(_, _) => plan_term(term, schema),
        _ => Err(FormulaError::invalid_term(
            term,
            "the response must be a variable or a function of one",
        )),
    }
}

fn plan_term(term: &Term, schema: &Schema) -> Result<TermPlan, FormulaError> {
    let name = term.canonical_name();
    let (kind, outputs) = match term {
        Term::Variable(column) => {
            let (index, field) = lookup(schema, column)?;
            match &field.data_type {
                DataTypeDef::Categorical(levels) => (
                    PlanKind::Categorical {
                        column: index,
                        levels: levels.clone(),
                    },
                    vec![field.clone()],
                ),
                _ => (
                    PlanKind::Numeric(PlanExpr::Column(index)),
                    vec![field.clone()],
                ),
            }
        }
        Term::Function(_, _) => (
            PlanKind::Numeric(numeric_expr(term, schema)?),
            vec![FieldDef::new(name, DataTypeDef::F64)],
        ),
        Term::Interaction(operands) => plan_interaction(term, operands, schema)?,
        Term::Crossing(_) | Term::Dot | Term::Intercept => {
            return Err(FormulaError::invalid_term(
                term,
                "must be expanded before planning",
            ));
        }
    };

    let mut sources = Vec::new();
    match &kind {
        PlanKind::Numeric(expr) => expr.collect_columns(&mut sources),
        PlanKind::Categorical { column, .. } => sources.push(*column),
        PlanKind::FactorInteraction { operands, .. } => {
            for operand in operands {
                match operand {
                    Operand::Numeric(expr) => expr.collect_columns(&mut sources),
                    Operand::Factor { column, .. } => sources.push(*column),
                }
            }
        }
    }
    sources.sort_unstable();
    sources.dedup();

    Ok(TermPlan {
        term: term.clone(),
        kind,
        outputs,
        sources,
    })
}

fn plan_interaction(
    term: &Term,
    operands: &[Term],
    schema: &Schema,
) -> Result<(PlanKind, Vec<FieldDef>), FormulaError> {
    if operands.len() < 2 {
        return Err(FormulaError::invalid_term(
            term,
            "an interaction needs at least two operands",
        ));
    }

    let mut planned = Vec::with_capacity(operands.len());
    for operand in operands {
        let categorical = match operand {
            Term::Variable(column) => {
                let (index, field) = lookup(schema, column)?;
                field.data_type.levels().map(|levels| Operand::Factor {
                    column: index,
                    levels: levels.to_vec(),
                })
            }
            _ => None,
        };
        planned.push(match categorical {
            Some(factor) => factor,
            None => Operand::Numeric(numeric_expr(operand, schema)?),
        });
    }

    let level_counts: Vec<usize> = planned
        .iter()
        .filter_map(|op| match op {
            Operand::Factor { levels, .. } => Some(levels.len()),
            Operand::Numeric(_) => None,
        })
        .collect();

    if level_counts.is_empty() {
        let exprs = planned
            .into_iter()
            .filter_map(|op| match op {
                Operand::Numeric(expr) => Some(expr),
                Operand::Factor { .. } => None,
            })
            .collect();
        return Ok((
            PlanKind::Numeric(PlanExpr::Product(exprs)),
            vec![FieldDef::new(term.canonical_name(), DataTypeDef::F64)],
        ));
    }

    let combinations = level_combinations(&level_counts);
    let outputs = combinations
        .iter()
        .map(|combo| {
            FieldDef::new(
                interaction_output_name(operands, &planned, combo),
                DataTypeDef::F64,
            )
        })
        .collect();

    Ok((
        PlanKind::FactorInteraction {
            operands: planned,
            combinations,
        },
        outputs,
    ))
}

/// Cartesian product of level indices, last factor varying fastest.
fn level_combinations(level_counts: &[usize]) -> Vec<Vec<usize>> {
    level_counts.iter().fold(vec![Vec::new()], |acc, &count| {
        acc.into_iter()
            .flat_map(|prefix| {
                (0..count).map(move |level| {
                    let mut next = prefix.clone();
                    next.push(level);
                    next
                })
            })
            .collect()
    })
}

fn interaction_output_name(operands: &[Term], planned: &[Operand], combo: &[usize]) -> String {
    let mut factor_pos = 0;
    let parts: Vec<String> = operands
        .iter()
        .zip(planned)
        .map(|(term, op)| match op {
            Operand::Numeric(_) => term.canonical_name(),
            Operand::Factor { levels, .. } => {
                let level = &levels[combo[factor_pos]];
                factor_pos += 1;
                format!("{}_{}", term.canonical_name(), level)
            }
        })
        .collect();
    parts.join("::")
}

/// Numeric expression for a term used inside a function or an all-numeric
/// interaction.
fn numeric_expr(term: &Term, schema: &Schema) -> Result<PlanExpr, FormulaError> {
    match term {
        Term::Variable(column) => {
            let (index, field) = lookup(schema, column)?;
            if field.data_type.is_categorical() {
                return Err(FormulaError::invalid_term(
                    term,
                    format!("categorical column '{column}' cannot be used as a number here"),
                ));
            }
            Ok(PlanExpr::Column(index))
        }
        Term::Function(name, inner) => {
            let f = MathFunction::from_name(name)
                .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
            Ok(PlanExpr::Apply(f, Box::new(numeric_expr(inner, schema)?)))
        }
        Term::Interaction(operands) if operands.len() >= 2 => Ok(PlanExpr::Product(
            operands
                .iter()
                .map(|op| numeric_expr(op, schema))
                .collect::<Result<_, _>>()?,
        )),
        _ => Err(FormulaError::invalid_term(
            term,
            "not a numeric expression",
        )),
    }
}

/// Looks up a column that may be consumed by a term.
fn lookup<'a>(schema: &'a Schema, column: &str) -> Result<(usize, &'a FieldDef), FormulaError> {
    let index = schema
        .index_of(column)
        .ok_or_else(|| FormulaError::UnresolvedColumn(column.to_string()))?;
    let field = &schema[index];
    if field.data_type == DataTypeDef::String {
        return Err(FormulaError::UnsupportedColumnType {
            name: field.name.clone(),
            data_type: field.data_type.to_string(),
        });
    }
    Ok((index, field))
}
