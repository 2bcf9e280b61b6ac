use crate::context::kind::ReadsRequest;
use crate::context::{ActorView, Binding, Operand, ValueView, View};
use crate::stack::Tag;
use gatehouse_core::{Result, Value};

impl<'a, K: ReadsRequest> View<'a, K> {
    /// Narrow on a request parameter
    pub fn asks_with(&self, param: impl Into<Binding>) -> Result<ValueView<'a>> {
        self.push_param(param.into(), Some)
    }

    /// Narrow on a request parameter converted to an integer
    ///
    /// Parameters without an integer form leave the view not loaded.
    pub fn asks_with_id(&self, param: impl Into<Binding>) -> Result<ValueView<'a>> {
        self.push_param(param.into(), |value| value.to_integer().map(Value::from))
    }

    fn push_param(
        &self,
        binding: Binding,
        convert: impl FnOnce(Value) -> Option<Value>,
    ) -> Result<ValueView<'a>> {
        let provider = self.provider();
        self.chain(|stack| {
            Ok(provider
                .param(binding.key())
                .and_then(convert)
                .map(|value| stack.push(Tag::Value, binding.name(), value)))
        })
    }
}

impl<'a> ActorView<'a> {
    /// Every listed id parameter equals the actor's attribute of the same name
    pub fn asks_with_same_id<I, S>(&self, params: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.asks_with_same_by(params, |view, param| view.asks_with_id(param))
    }

    /// Every listed parameter equals the actor's attribute of the same name
    pub fn asks_with_same<I, S>(&self, params: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.asks_with_same_by(params, |view, param| view.asks_with(param))
    }

    fn asks_with_same_by<I, S>(
        &self,
        params: I,
        select: impl Fn(&Self, &str) -> Result<ValueView<'a>>,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_loaded() {
            return Ok(false);
        }
        for param in params {
            let param = param.as_ref();
            if !select(self, param)?.equal_to(Operand::own(param))? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
