use crate::context::kind::Attributes;
use crate::context::View;
use gatehouse_core::Result;

impl<'a, K: Attributes> View<'a, K> {
    /// The named attribute of the current actor or resource is truthy
    pub fn is(&self, attribute: &str) -> Result<bool> {
        match self.stack().and_then(|stack| stack.top()) {
            Some(owner) => Ok(owner.resolve(attribute)?.is_truthy()),
            None => Ok(false),
        }
    }
}
