use crate::context::kind::Joins;
use crate::context::{Binding, MultiView, View};
use crate::stack::Tag;
use gatehouse_core::Result;

impl<'a, K: Joins> View<'a, K> {
    /// Add another loaded resource next to the current ones
    pub fn plus(&self, resource: impl Into<Binding>) -> Result<MultiView<'a>> {
        let binding = resource.into();
        let provider = self.provider();
        self.chain(|stack| {
            Ok(provider
                .resource(binding.key())
                .map(|resource| stack.push(Tag::Multi, binding.name(), resource)))
        })
    }
}
