//! Serde model of policy documents

use crate::context::Binding;
use crate::profile::ActionMatch;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A policy document: named tests and ordered profiles
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Named tests, usable from any expression through `happens`
    #[serde(default)]
    pub tests: BTreeMap<String, Expr>,

    /// Profiles, registered in order
    #[serde(default)]
    pub profiles: Vec<ProfileSpec>,
}

/// A named profile
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSpec {
    pub name: String,

    /// Narrowing applied before the rules run
    #[serde(default)]
    pub context: Option<Expr>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// One rule of a profile or scope
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Allow(AllowSpec),
    Forbid(ForbidSpec),
    Continue(ContinueSpec),
    Expand(ExpandSpec),
    Scope(ScopeRuleSpec),
}

impl RuleSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Allow(_) => "allow",
            Self::Forbid(_) => "forbid",
            Self::Continue(_) => "continue",
            Self::Expand(_) => "expand",
            Self::Scope(_) => "scope",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowSpec {
    pub allow: Actions,
    #[serde(default, rename = "if")]
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForbidSpec {
    pub forbid: Actions,
    #[serde(default, rename = "if")]
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContinueSpec {
    #[serde(rename = "continue")]
    pub guard: Expr,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpandSpec {
    pub expand: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeRuleSpec {
    pub scope: ScopeSpec,
}

/// A nested rule group
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSpec {
    #[serde(default)]
    pub context: Option<Expr>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Action identifiers of an allow or forbid rule; `"*"` matches any action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Actions {
    One(String),
    Many(Vec<String>),
}

impl Actions {
    pub fn to_match(&self) -> ActionMatch {
        match self {
            Self::One(action) if action == "*" => ActionMatch::Any,
            Self::One(action) => ActionMatch::from(action.as_str()),
            Self::Many(actions) => ActionMatch::only(actions.iter().cloned()),
        }
    }
}

/// A predicate or chaining step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Not(Box<Expr>),
    Happens(String),
    AsksFor(Names),
    AsksWithSameId(Names),
    AsksWithSame(Names),
    Owns(RelationSpec),
    BelongsTo(RelationSpec),
    /// Association name, `~` for the default
    ThatBelongsToIt(Option<String>),
    ToWhichItBelongs(Option<String>),
    Is(String),
    EqualTo(OperandSpec),
    GreaterThan(OperandSpec),
    LessThan(OperandSpec),
    Where(Comparison),
    The(Step),
    Loaded(Step),
    Has(Step),
    AsksWith(Step),
    AsksWithId(Step),
    Plus(Step),
}

impl Expr {
    pub fn name(&self) -> &'static str {
        match self {
            Self::All(_) => "all",
            Self::Any(_) => "any",
            Self::Not(_) => "not",
            Self::Happens(_) => "happens",
            Self::AsksFor(_) => "asks_for",
            Self::AsksWithSameId(_) => "asks_with_same_id",
            Self::AsksWithSame(_) => "asks_with_same",
            Self::Owns(_) => "owns",
            Self::BelongsTo(_) => "belongs_to",
            Self::ThatBelongsToIt(_) => "that_belongs_to_it",
            Self::ToWhichItBelongs(_) => "to_which_it_belongs",
            Self::Is(_) => "is",
            Self::EqualTo(_) => "equal_to",
            Self::GreaterThan(_) => "greater_than",
            Self::LessThan(_) => "less_than",
            Self::Where(_) => "where",
            Self::The(_) => "the",
            Self::Loaded(_) => "loaded",
            Self::Has(_) => "has",
            Self::AsksWith(_) => "asks_with",
            Self::AsksWithId(_) => "asks_with_id",
            Self::Plus(_) => "plus",
        }
    }

    /// The chaining step this expression performs, if it is one
    pub fn as_step(&self) -> Option<(StepKind, &Step)> {
        match self {
            Self::The(step) => Some((StepKind::The, step)),
            Self::Loaded(step) => Some((StepKind::Loaded, step)),
            Self::Has(step) => Some((StepKind::Has, step)),
            Self::AsksWith(step) => Some((StepKind::AsksWith, step)),
            Self::AsksWithId(step) => Some((StepKind::AsksWithId, step)),
            Self::Plus(step) => Some((StepKind::Plus, step)),
            _ => None,
        }
    }
}

/// Chaining steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    The,
    Loaded,
    Has,
    AsksWith,
    AsksWithId,
    Plus,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::The => "the",
            Self::Loaded => "loaded",
            Self::Has => "has",
            Self::AsksWith => "asks_with",
            Self::AsksWithId => "asks_with_id",
            Self::Plus => "plus",
        }
    }
}

/// A step target: a bare name or a name with alias and continuation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Name(String),
    Full(StepSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub name: String,
    #[serde(default, rename = "as")]
    pub alias: Option<String>,
    /// Evaluated inside the narrowed view
    #[serde(default)]
    pub then: Option<Box<Expr>>,
}

impl Step {
    pub fn binding(&self) -> Binding {
        match self {
            Self::Name(name) => Binding::new(name.as_str()),
            Self::Full(spec) => match &spec.alias {
                Some(alias) => Binding::new(spec.name.as_str()).aliased(alias.as_str()),
                None => Binding::new(spec.name.as_str()),
            },
        }
    }

    pub fn then(&self) -> Option<&Expr> {
        match self {
            Self::Name(_) => None,
            Self::Full(spec) => spec.then.as_deref(),
        }
    }
}

/// One name or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

/// Target of `owns` / `belongs_to`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RelationSpec {
    Resource(String),
    Full {
        resource: String,
        #[serde(default, rename = "as")]
        association: Option<String>,
    },
}

impl RelationSpec {
    pub fn resource(&self) -> &str {
        match self {
            Self::Resource(resource) | Self::Full { resource, .. } => resource,
        }
    }

    pub fn association(&self) -> Option<&str> {
        match self {
            Self::Resource(_) => None,
            Self::Full { association, .. } => association.as_deref(),
        }
    }
}

/// Right-hand side of `equal_to` / `greater_than` / `less_than`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OperandSpec {
    /// Attribute of the nearest actor
    Own { own: String },
    Literal(serde_json::Value),
}

/// `left op right` over stack bindings, `right` may be a literal `value`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comparison {
    /// `binding` or `binding.attribute[.attribute...]`
    pub left: String,
    pub op: CompareOp,
    #[serde(default)]
    pub right: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}
