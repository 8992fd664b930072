//! Engine-agnostic constraint model.
//!
//! A `CpModel` is a flat list of bounded integer variables (booleans are
//! integers in `[0, 1]`), constraints over them, and an optional linear
//! objective. It carries exactly the vocabulary a generic constraint
//! optimization engine is expected to accept:
//!
//! - boolean and bounded integer variables
//! - linear `<=`, `>=`, `==`, `!=` constraints, optionally enforced by a
//!   conjunction of literals ("only enforce if")
//! - boolean AND / OR (also enforceable) and implications
//! - max-equality (`target = max(operands)`)
//! - a linear objective to maximize or minimize
//! - solution hints that seed the search without constraining it
//!
//! Variables are identified by dense indices, never by name; labels exist
//! for diagnostics only.
//!
//! # Reference
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming", Ch. 12 (reification)

use std::ops::Not;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dense index of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    /// Position in the model's variable list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A bounded integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVar(VarId);

/// A boolean (0/1) variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(VarId);

/// A boolean variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    var: BoolVar,
    negated: bool,
}

impl IntVar {
    /// Underlying variable id.
    #[inline]
    pub fn id(self) -> VarId {
        self.0
    }
}

impl BoolVar {
    /// Underlying variable id.
    #[inline]
    pub fn id(self) -> VarId {
        self.0
    }
}

impl Literal {
    /// The boolean variable of this literal.
    pub fn var(self) -> BoolVar {
        self.var
    }

    /// Whether the literal is the negation of its variable.
    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// Truth value under an assignment.
    pub fn evaluate(self, values: &[i64]) -> bool {
        (values[self.var.id().index()] != 0) != self.negated
    }
}

impl From<IntVar> for VarId {
    fn from(v: IntVar) -> Self {
        v.0
    }
}

impl From<BoolVar> for VarId {
    fn from(v: BoolVar) -> Self {
        v.0
    }
}

impl From<BoolVar> for Literal {
    fn from(var: BoolVar) -> Self {
        Self {
            var,
            negated: false,
        }
    }
}

impl Not for BoolVar {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self,
            negated: true,
        }
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}

/// Variable declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDef {
    /// Diagnostic label.
    pub label: String,
    /// Lower bound (inclusive).
    pub lb: i64,
    /// Upper bound (inclusive).
    pub ub: i64,
    /// Whether the variable was declared boolean.
    pub is_bool: bool,
}

/// A linear expression `constant + Σ coeff · var`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: adds `coeff · var`.
    pub fn term(mut self, var: impl Into<VarId>, coeff: i64) -> Self {
        self.add_term(var, coeff);
        self
    }

    /// Builder: adds a constant.
    pub fn plus(mut self, constant: i64) -> Self {
        self.constant += constant;
        self
    }

    /// Adds `coeff · var` in place.
    pub fn add_term(&mut self, var: impl Into<VarId>, coeff: i64) {
        if coeff != 0 {
            self.terms.push((var.into(), coeff));
        }
    }

    /// Sum of variables with unit coefficients.
    pub fn sum<I, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VarId>,
    {
        Self::weighted_sum(vars.into_iter().map(|v| (v, 1)))
    }

    /// Weighted sum of variables.
    pub fn weighted_sum<I, V>(terms: I) -> Self
    where
        I: IntoIterator<Item = (V, i64)>,
        V: Into<VarId>,
    {
        let mut expr = Self::new();
        for (var, coeff) in terms {
            expr.add_term(var, coeff);
        }
        expr
    }

    /// Terms as `(variable, coefficient)` pairs.
    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    /// Constant offset.
    pub fn constant(&self) -> i64 {
        self.constant
    }

    /// Value under an assignment.
    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * values[v.index()])
                .sum::<i64>()
    }
}

impl From<IntVar> for LinearExpr {
    fn from(v: IntVar) -> Self {
        Self::new().term(v, 1)
    }
}

impl From<BoolVar> for LinearExpr {
    fn from(v: BoolVar) -> Self {
        Self::new().term(v, 1)
    }
}

/// Comparison of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// `expr <= rhs`
    Le,
    /// `expr >= rhs`
    Ge,
    /// `expr == rhs`
    Eq,
    /// `expr != rhs`
    Ne,
}

impl Relation {
    /// Whether `lhs relation rhs` holds.
    #[inline]
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// A model constraint.
///
/// `enforcement` literals make a constraint conditional: it must hold only
/// when all of them are true. An empty list means always enforced.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `expr relation rhs`.
    Linear {
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
        enforcement: Vec<Literal>,
    },
    /// All literals true.
    BoolAnd {
        literals: Vec<Literal>,
        enforcement: Vec<Literal>,
    },
    /// At least one literal true.
    BoolOr {
        literals: Vec<Literal>,
        enforcement: Vec<Literal>,
    },
    /// `antecedent ⇒ consequent`.
    Implication {
        antecedent: Literal,
        consequent: Literal,
    },
    /// `target == max(operands)`.
    MaxEquality { target: VarId, operands: Vec<VarId> },
}

impl Constraint {
    /// Whether the constraint holds under an assignment.
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let enforced = |lits: &Vec<Literal>| lits.iter().all(|l| l.evaluate(values));
        match self {
            Self::Linear {
                expr,
                relation,
                rhs,
                enforcement,
            } => !enforced(enforcement) || relation.holds(expr.evaluate(values), *rhs),
            Self::BoolAnd {
                literals,
                enforcement,
            } => !enforced(enforcement) || literals.iter().all(|l| l.evaluate(values)),
            Self::BoolOr {
                literals,
                enforcement,
            } => !enforced(enforcement) || literals.iter().any(|l| l.evaluate(values)),
            Self::Implication {
                antecedent,
                consequent,
            } => !antecedent.evaluate(values) || consequent.evaluate(values),
            Self::MaxEquality { target, operands } => operands
                .iter()
                .map(|v| values[v.index()])
                .max()
                .is_some_and(|m| m == values[target.index()]),
        }
    }

    /// Fills in one or more unknown values the constraint determines.
    ///
    /// Returns whether anything was assigned. Only forced values are
    /// derived: a violated row forces its single open enforcement literal
    /// false, an enforced equality with one open term solves for it.
    fn propagate(&self, partial: &mut [Option<i64>]) -> bool {
        match self {
            Self::Linear {
                expr,
                relation,
                rhs,
                enforcement,
            } => {
                let mut known = expr.constant();
                let mut open = Vec::new();
                for &(v, c) in expr.terms() {
                    match partial[v.index()] {
                        Some(value) => known += c * value,
                        None => open.push((v, c)),
                    }
                }
                match (guard(partial, enforcement), open.as_slice()) {
                    (Guard::Pending(lit), []) if !relation.holds(known, *rhs) => {
                        assign_literal(partial, lit, false)
                    }
                    (Guard::On, &[(v, c)])
                        if *relation == Relation::Eq && (*rhs - known) % c == 0 =>
                    {
                        partial[v.index()] = Some((*rhs - known) / c);
                        true
                    }
                    _ => false,
                }
            }
            Self::BoolAnd {
                literals,
                enforcement,
            } => match guard(partial, enforcement) {
                Guard::Pending(lit)
                    if literals
                        .iter()
                        .any(|&l| literal_value(partial, l) == Some(false)) =>
                {
                    assign_literal(partial, lit, false)
                }
                Guard::On => literals
                    .iter()
                    .fold(false, |changed, &l| assign_literal(partial, l, true) || changed),
                _ => false,
            },
            Self::BoolOr {
                literals,
                enforcement,
            } => {
                let mut open = Vec::new();
                for &l in literals {
                    match literal_value(partial, l) {
                        Some(true) => return false,
                        Some(false) => {}
                        None => open.push(l),
                    }
                }
                match (guard(partial, enforcement), open.as_slice()) {
                    (Guard::Pending(lit), []) => assign_literal(partial, lit, false),
                    (Guard::On, &[last]) => assign_literal(partial, last, true),
                    _ => false,
                }
            }
            Self::Implication {
                antecedent,
                consequent,
            } => match (
                literal_value(partial, *antecedent),
                literal_value(partial, *consequent),
            ) {
                (Some(true), None) => assign_literal(partial, *consequent, true),
                (None, Some(false)) => assign_literal(partial, *antecedent, false),
                _ => false,
            },
            Self::MaxEquality { target, operands } => {
                if partial[target.index()].is_some() {
                    return false;
                }
                let max = operands
                    .iter()
                    .map(|v| partial[v.index()])
                    .collect::<Option<Vec<_>>>()
                    .and_then(|known| known.into_iter().max());
                match max {
                    Some(m) => {
                        partial[target.index()] = Some(m);
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

/// State of an enforcement conjunction under a partial assignment.
enum Guard {
    /// Some literal is false.
    Off,
    /// Every literal is true.
    On,
    /// Exactly one literal is unknown, the rest are true.
    Pending(Literal),
    Undetermined,
}

fn guard(partial: &[Option<i64>], enforcement: &[Literal]) -> Guard {
    let mut open = Vec::new();
    for &lit in enforcement {
        match literal_value(partial, lit) {
            Some(false) => return Guard::Off,
            Some(true) => {}
            None => open.push(lit),
        }
    }
    match open.as_slice() {
        [] => Guard::On,
        &[lit] => Guard::Pending(lit),
        _ => Guard::Undetermined,
    }
}

fn literal_value(partial: &[Option<i64>], lit: Literal) -> Option<bool> {
    partial[lit.var().id().index()].map(|v| (v != 0) != lit.is_negated())
}

/// Makes `lit` evaluate to `value` if its variable is still unknown.
fn assign_literal(partial: &mut [Option<i64>], lit: Literal, value: bool) -> bool {
    let slot = &mut partial[lit.var().id().index()];
    if slot.is_some() {
        return false;
    }
    *slot = Some(i64::from(value != lit.is_negated()));
    true
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// Larger is better.
    Maximize,
    /// Smaller is better.
    Minimize,
}

/// Linear objective.
#[derive(Debug, Clone)]
pub struct Objective {
    /// Direction.
    pub sense: ObjectiveSense,
    /// Expression to optimize.
    pub expr: LinearExpr,
}

/// Why an assignment does not satisfy a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The assignment has the wrong number of values.
    #[error("assignment has {got} values, model has {expected} variables")]
    Arity { expected: usize, got: usize },
    /// A value lies outside its variable's domain.
    #[error("variable '{label}' = {value} is outside [{lb}, {ub}]")]
    OutOfDomain {
        label: String,
        value: i64,
        lb: i64,
        ub: i64,
    },
    /// A constraint does not hold.
    #[error("constraint #{0} is violated")]
    Violated(usize),
}

/// Handle returned by constraint-adding methods; attaches enforcement literals.
pub struct Enforce<'m> {
    enforcement: Option<&'m mut Vec<Literal>>,
}

impl Enforce<'_> {
    /// Enforces the constraint only when `literal` is true.
    ///
    /// Chaining adds further literals; the constraint is then enforced
    /// when all of them are true.
    pub fn only_enforce_if(self, literal: impl Into<Literal>) -> Self {
        let Self { enforcement } = self;
        if let Some(lits) = enforcement {
            lits.push(literal.into());
            Self {
                enforcement: Some(lits),
            }
        } else {
            Self { enforcement: None }
        }
    }
}

/// A constraint model.
///
/// # Example
/// ```
/// use u_admission::cp::{CpModel, Relation};
///
/// let mut model = CpModel::new("demo");
/// let x = model.new_int_var(0, 10, "x");
/// let b = model.new_bool_var("x_small");
/// // b ⇔ x <= 3
/// model.add_linear(x.into(), Relation::Le, 3).only_enforce_if(b);
/// model.add_linear(x.into(), Relation::Ge, 4).only_enforce_if(!b);
/// assert_eq!(model.variable_count(), 2);
/// assert_eq!(model.constraint_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    variables: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
    hints: Vec<(VarId, i64)>,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            hints: Vec::new(),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a boolean variable.
    pub fn new_bool_var(&mut self, label: impl Into<String>) -> BoolVar {
        BoolVar(self.push_var(label.into(), 0, 1, true))
    }

    /// Creates an integer variable with domain `[lb, ub]`.
    pub fn new_int_var(&mut self, lb: i64, ub: i64, label: impl Into<String>) -> IntVar {
        IntVar(self.push_var(label.into(), lb, ub, false))
    }

    fn push_var(&mut self, label: String, lb: i64, ub: i64, is_bool: bool) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VarDef {
            label,
            lb,
            ub,
            is_bool,
        });
        id
    }

    /// Adds `expr relation rhs`.
    pub fn add_linear(&mut self, expr: LinearExpr, relation: Relation, rhs: i64) -> Enforce<'_> {
        self.push_enforceable(Constraint::Linear {
            expr,
            relation,
            rhs,
            enforcement: Vec::new(),
        })
    }

    /// Adds "all literals true".
    pub fn add_bool_and(&mut self, literals: Vec<Literal>) -> Enforce<'_> {
        self.push_enforceable(Constraint::BoolAnd {
            literals,
            enforcement: Vec::new(),
        })
    }

    /// Adds "at least one literal true".
    pub fn add_bool_or(&mut self, literals: Vec<Literal>) -> Enforce<'_> {
        self.push_enforceable(Constraint::BoolOr {
            literals,
            enforcement: Vec::new(),
        })
    }

    /// Adds `antecedent ⇒ consequent`.
    pub fn add_implication(
        &mut self,
        antecedent: impl Into<Literal>,
        consequent: impl Into<Literal>,
    ) {
        self.constraints.push(Constraint::Implication {
            antecedent: antecedent.into(),
            consequent: consequent.into(),
        });
    }

    /// Adds `target == max(operands)`. `operands` must be non-empty.
    pub fn add_max_equality<V>(
        &mut self,
        target: impl Into<VarId>,
        operands: impl IntoIterator<Item = V>,
    ) where
        V: Into<VarId>,
    {
        self.constraints.push(Constraint::MaxEquality {
            target: target.into(),
            operands: operands.into_iter().map(Into::into).collect(),
        });
    }

    fn push_enforceable(&mut self, constraint: Constraint) -> Enforce<'_> {
        self.constraints.push(constraint);
        let enforcement = match self.constraints.last_mut() {
            Some(Constraint::Linear { enforcement, .. })
            | Some(Constraint::BoolAnd { enforcement, .. })
            | Some(Constraint::BoolOr { enforcement, .. }) => Some(enforcement),
            _ => None,
        };
        Enforce { enforcement }
    }

    /// Sets a maximization objective.
    pub fn maximize(&mut self, expr: LinearExpr) {
        self.objective = Some(Objective {
            sense: ObjectiveSense::Maximize,
            expr,
        });
    }

    /// Sets a minimization objective.
    pub fn minimize(&mut self, expr: LinearExpr) {
        self.objective = Some(Objective {
            sense: ObjectiveSense::Minimize,
            expr,
        });
    }

    /// Variable declarations, in id order.
    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    /// Declaration of one variable.
    pub fn var(&self, id: impl Into<VarId>) -> &VarDef {
        &self.variables[id.into().index()]
    }

    /// Constraints, in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective, if set.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of boolean variables.
    pub fn bool_var_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_bool).count()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Smallest and largest value an expression can take over the variable domains.
    pub fn expr_bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        expr.terms()
            .iter()
            .fold((expr.constant(), expr.constant()), |(lo, hi), &(v, c)| {
                let def = &self.variables[v.index()];
                if c >= 0 {
                    (lo + c * def.lb, hi + c * def.ub)
                } else {
                    (lo + c * def.ub, hi + c * def.lb)
                }
            })
    }

    /// Checks a full assignment against domains and constraints.
    pub fn check(&self, values: &[i64]) -> Result<(), CheckError> {
        if values.len() != self.variables.len() {
            return Err(CheckError::Arity {
                expected: self.variables.len(),
                got: values.len(),
            });
        }
        for (def, &value) in self.variables.iter().zip(values) {
            if value < def.lb || value > def.ub {
                return Err(CheckError::OutOfDomain {
                    label: def.label.clone(),
                    value,
                    lb: def.lb,
                    ub: def.ub,
                });
            }
        }
        match self.constraints.iter().position(|c| !c.is_satisfied(values)) {
            Some(index) => Err(CheckError::Violated(index)),
            None => Ok(()),
        }
    }

    /// Objective value under an assignment.
    pub fn objective_value(&self, values: &[i64]) -> Option<i64> {
        self.objective.as_ref().map(|o| o.expr.evaluate(values))
    }

    /// Suggests a value for a variable.
    ///
    /// Hints never constrain the model. Engines may use them to start the
    /// search from a known assignment.
    pub fn add_hint(&mut self, var: impl Into<VarId>, value: i64) {
        self.hints.push((var.into(), value));
    }

    /// Hints, in insertion order.
    pub fn hints(&self) -> &[(VarId, i64)] {
        &self.hints
    }

    /// Extends the hints to a full assignment that satisfies the model.
    ///
    /// Unhinted variables are derived through the constraints that define
    /// them. When nothing determines a variable it takes its lower bound,
    /// lowest index first, and derivation resumes. Returns `None` without
    /// hints or when the completed assignment violates the model.
    pub fn complete_hint(&self) -> Option<Vec<i64>> {
        if self.hints.is_empty() {
            return None;
        }
        let mut partial: Vec<Option<i64>> = vec![None; self.variables.len()];
        for &(var, value) in &self.hints {
            *partial.get_mut(var.index())? = Some(value);
        }

        let mut next = 0;
        loop {
            self.propagate_all(&mut partial);
            let Some(offset) = partial[next..].iter().position(Option::is_none) else {
                break;
            };
            next += offset;
            partial[next] = Some(self.variables[next].lb);
        }

        let values: Vec<i64> = partial.into_iter().collect::<Option<_>>()?;
        self.check(&values).ok()?;
        Some(values)
    }

    fn propagate_all(&self, partial: &mut [Option<i64>]) {
        loop {
            let mut changed = false;
            for constraint in &self.constraints {
                changed |= constraint.propagate(partial);
            }
            if !changed {
                break;
            }
        }
    }
}
