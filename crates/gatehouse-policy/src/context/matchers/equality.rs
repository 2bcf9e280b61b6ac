use crate::context::{Operand, ValueView};
use crate::stack::{Stack, Tag};
use gatehouse_core::{Error, Result, Value};
use std::cmp::Ordering;

impl<'a> ValueView<'a> {
    /// The current value equals `operand`
    pub fn equal_to(&self, operand: impl Into<Operand>) -> Result<bool> {
        self.compare_with(operand.into(), |current, other| current == other)
    }

    /// The current value orders after `operand`
    ///
    /// Values without a common ordering never compare.
    pub fn greater_than(&self, operand: impl Into<Operand>) -> Result<bool> {
        self.compare_with(operand.into(), |current, other| {
            current.compare(other) == Some(Ordering::Greater)
        })
    }

    /// The current value orders before `operand`
    pub fn less_than(&self, operand: impl Into<Operand>) -> Result<bool> {
        self.compare_with(operand.into(), |current, other| {
            current.compare(other) == Some(Ordering::Less)
        })
    }

    fn compare_with(
        &self,
        operand: Operand,
        compare: impl FnOnce(&Value, &Value) -> bool,
    ) -> Result<bool> {
        let Some(stack) = self.stack() else {
            return Ok(false);
        };
        let Some(current) = stack.top() else {
            return Ok(false);
        };
        let other = operand_value(stack, operand)?;
        Ok(compare(current, &other))
    }
}

fn operand_value(stack: &Stack, operand: Operand) -> Result<Value> {
    match operand {
        Operand::Literal(value) => Ok(value),
        Operand::Own(attribute) => {
            let actor = stack.top_tagged(Tag::Actor).ok_or_else(|| {
                Error::setup(format!(
                    "comparing with own '{}' requires an enclosing actor",
                    attribute
                ))
            })?;
            actor.resolve(&attribute)
        }
    }
}
