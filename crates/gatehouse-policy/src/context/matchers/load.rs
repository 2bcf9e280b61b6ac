use crate::context::kind::LoadsResources;
use crate::context::{Binding, ResourceView, View};
use crate::stack::Tag;
use gatehouse_core::Result;

impl<'a, K: LoadsResources> View<'a, K> {
    /// Narrow on a resource the request has already loaded
    pub fn loaded(&self, resource: impl Into<Binding>) -> Result<ResourceView<'a>> {
        let binding = resource.into();
        let provider = self.provider();
        self.chain(|stack| {
            Ok(provider
                .resource(binding.key())
                .map(|resource| stack.push(Tag::Resource, binding.name(), resource)))
        })
    }
}
