//! Runtime evaluation of document expressions

use super::schema::{CompareOp, Comparison, Expr, OperandSpec, Step, StepKind};
use crate::context::{AnyView, Operand, WhereScope};
use gatehouse_core::{Error, Result, Value};
use std::cmp::Ordering;

fn unavailable(matcher: &str, view: &AnyView<'_>) -> Error {
    Error::setup(format!(
        "'{}' is not available on a {} context",
        matcher,
        view.kind_name()
    ))
}

/// Evaluate a predicate expression inside `view`
pub(crate) fn evaluate(expr: &Expr, view: &AnyView<'_>) -> Result<bool> {
    if !view.is_loaded() {
        return Ok(false);
    }

    if let Some((kind, step)) = expr.as_step() {
        let next = apply(kind, step, view)?;
        return match step.then() {
            Some(then) if next.is_loaded() => evaluate(then, &next),
            Some(_) => Ok(false),
            None => Ok(next.is_loaded()),
        };
    }

    match expr {
        Expr::All(exprs) => {
            for expr in exprs {
                if !evaluate(expr, view)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Any(exprs) => {
            for expr in exprs {
                if evaluate(expr, view)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Not(expr) => Ok(!evaluate(expr, view)?),
        Expr::Happens(test) => view.happens(test),
        Expr::AsksFor(actions) => match view {
            AnyView::Default(v) => v.asks_for(actions.as_slice()),
            AnyView::Actor(v) => v.asks_for(actions.as_slice()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::AsksWithSameId(params) => match view {
            AnyView::Actor(v) => v.asks_with_same_id(params.as_slice()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::AsksWithSame(params) => match view {
            AnyView::Actor(v) => v.asks_with_same(params.as_slice()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::Owns(relation) => match view {
            AnyView::Actor(v) => v.owns(relation.resource(), relation.association()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::BelongsTo(relation) => match view {
            AnyView::Actor(v) => v.belongs_to(relation.resource(), relation.association()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::ThatBelongsToIt(association) => match view {
            AnyView::Resource(v) => v.that_belongs_to_it(association.as_deref()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::ToWhichItBelongs(association) => match view {
            AnyView::Resource(v) => v.to_which_it_belongs(association.as_deref()),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::Is(attribute) => match view {
            AnyView::Actor(v) => v.is(attribute),
            AnyView::Resource(v) => v.is(attribute),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::EqualTo(operand) => match view {
            AnyView::Value(v) => v.equal_to(operand_of(operand)),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::GreaterThan(operand) => match view {
            AnyView::Value(v) => v.greater_than(operand_of(operand)),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::LessThan(operand) => match view {
            AnyView::Value(v) => v.less_than(operand_of(operand)),
            other => Err(unavailable(expr.name(), other)),
        },
        Expr::Where(comparison) => {
            let holds = |scope: &WhereScope<'_>| compare(comparison, scope);
            match view {
                AnyView::Actor(v) => v.where_(holds),
                AnyView::Resource(v) => v.where_(holds),
                AnyView::Value(v) => v.where_(holds),
                AnyView::Multi(v) => v.where_(holds),
                other => Err(unavailable(expr.name(), other)),
            }
        }
        Expr::The(_)
        | Expr::Loaded(_)
        | Expr::Has(_)
        | Expr::AsksWith(_)
        | Expr::AsksWithId(_)
        | Expr::Plus(_) => Err(Error::setup(format!("unhandled step '{}'", expr.name()))),
    }
}

/// Apply a chaining step
pub(crate) fn apply<'a>(kind: StepKind, step: &Step, view: &AnyView<'a>) -> Result<AnyView<'a>> {
    let binding = step.binding();
    let next: AnyView<'a> = match (kind, view) {
        (StepKind::The, AnyView::Default(v)) => v.the(binding)?.into(),
        (StepKind::The, AnyView::Actor(v)) => v.the(binding)?.into(),
        (StepKind::Loaded, AnyView::Default(v)) => v.loaded(binding)?.into(),
        (StepKind::Loaded, AnyView::Actor(v)) => v.loaded(binding)?.into(),
        (StepKind::AsksWith, AnyView::Default(v)) => v.asks_with(binding)?.into(),
        (StepKind::AsksWith, AnyView::Actor(v)) => v.asks_with(binding)?.into(),
        (StepKind::AsksWithId, AnyView::Default(v)) => v.asks_with_id(binding)?.into(),
        (StepKind::AsksWithId, AnyView::Actor(v)) => v.asks_with_id(binding)?.into(),
        (StepKind::Has, AnyView::Actor(v)) => v.has(binding)?.into(),
        (StepKind::Has, AnyView::Resource(v)) => v.has(binding)?.into(),
        (StepKind::Plus, AnyView::Resource(v)) => v.plus(binding)?.into(),
        (StepKind::Plus, AnyView::Multi(v)) => v.plus(binding)?.into(),
        (kind, other) => return Err(unavailable(kind.name(), other)),
    };
    Ok(next)
}

/// Narrow `view` along a chain of steps
///
/// A predicate continuation filters: when it fails the result is not loaded.
pub(crate) fn narrow<'a>(expr: &Expr, view: &AnyView<'a>) -> Result<AnyView<'a>> {
    let (kind, step) = expr.as_step().ok_or_else(|| {
        Error::setup(format!(
            "'{}' cannot be used as a context, expected a chaining step",
            expr.name()
        ))
    })?;
    let next = apply(kind, step, view)?;
    match step.then() {
        Some(then) if next.is_loaded() => {
            if then.as_step().is_some() {
                narrow(then, &next)
            } else if evaluate(then, &next)? {
                Ok(next)
            } else {
                unloaded(&next)
            }
        }
        _ => Ok(next),
    }
}

fn unloaded<'a>(view: &AnyView<'a>) -> Result<AnyView<'a>> {
    Ok(AnyView::Default(view.widen().chain(|_| Ok(None))?))
}

fn operand_of(spec: &OperandSpec) -> Operand {
    match spec {
        OperandSpec::Own { own } => Operand::own(own.as_str()),
        OperandSpec::Literal(value) => Operand::Literal(Value::from(value.clone())),
    }
}

fn lookup(scope: &WhereScope<'_>, path: &str) -> Result<Value> {
    let mut segments = path.split('.');
    let name = segments.next().unwrap_or_default();
    let mut value = scope.get(name)?.clone();
    for key in segments {
        value = value.resolve(key)?;
    }
    Ok(value)
}

fn compare(comparison: &Comparison, scope: &WhereScope<'_>) -> Result<bool> {
    let left = lookup(scope, &comparison.left)?;
    let right = match (&comparison.right, &comparison.value) {
        (Some(path), None) => lookup(scope, path)?,
        (None, Some(value)) => Value::from(value.clone()),
        _ => {
            return Err(Error::setup(
                "'where' needs exactly one of 'right' or 'value'",
            ))
        }
    };
    Ok(match comparison.op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Gt => left.compare(&right) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(left.compare(&right), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Lt => left.compare(&right) == Some(Ordering::Less),
        CompareOp::Le => matches!(left.compare(&right), Some(Ordering::Less | Ordering::Equal)),
    })
}
