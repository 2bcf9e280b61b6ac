use crate::context::kind::ReadsRequest;
use crate::context::View;
use gatehouse_core::Result;

impl<'a, K: ReadsRequest> View<'a, K> {
    /// The request's action is one of `actions`
    pub fn asks_for<I, S>(&self, actions: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_loaded() {
            return Ok(false);
        }
        let current = self.provider().action_name();
        Ok(actions.into_iter().any(|action| action.as_ref() == current))
    }
}
