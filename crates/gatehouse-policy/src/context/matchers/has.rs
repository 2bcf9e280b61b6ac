use crate::context::kind::Attributes;
use crate::context::{Binding, ValueView, View};
use crate::stack::Tag;
use gatehouse_core::Result;

impl<'a, K: Attributes> View<'a, K> {
    /// Narrow on an attribute of the current actor or resource
    pub fn has(&self, attribute: impl Into<Binding>) -> Result<ValueView<'a>> {
        let binding = attribute.into();
        self.chain(|stack| {
            let Some(owner) = stack.top() else {
                return Ok(None);
            };
            let value = owner.resolve(binding.key())?;
            Ok(Some(stack.push(Tag::Value, binding.name(), value)))
        })
    }
}
