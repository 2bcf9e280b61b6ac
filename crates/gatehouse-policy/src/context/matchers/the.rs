use crate::context::kind::NamesActors;
use crate::context::{ActorView, Binding, View};
use crate::stack::Tag;
use gatehouse_core::Result;

impl<'a, K: NamesActors> View<'a, K> {
    /// Narrow on a named actor
    ///
    /// The view is not loaded when the provider does not know the actor or
    /// the actor resolves to nothing (an anonymous visitor).
    pub fn the(&self, actor: impl Into<Binding>) -> Result<ActorView<'a>> {
        let binding = actor.into();
        let provider = self.provider();
        self.chain(|stack| {
            if !provider.has_actor(binding.key()) {
                return Ok(None);
            }
            Ok(provider
                .actor(binding.key())?
                .map(|actor| stack.push(Tag::Actor, binding.name(), actor)))
        })
    }
}
