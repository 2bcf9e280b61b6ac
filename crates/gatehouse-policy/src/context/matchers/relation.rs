use crate::context::{ActorView, Binding, ResourceView};
use crate::stack::Tag;
use gatehouse_core::{parameterize, Association, Error, Reflection, Result, Value};

impl<'a> ActorView<'a> {
    /// The named resource belongs to this actor
    pub fn owns(&self, resource: impl Into<Binding>, association: Option<&str>) -> Result<bool> {
        self.loaded(resource)?.that_belongs_to_it(association)
    }

    /// This actor belongs to the named resource
    pub fn belongs_to(
        &self,
        resource: impl Into<Binding>,
        association: Option<&str>,
    ) -> Result<bool> {
        self.loaded(resource)?.to_which_it_belongs(association)
    }
}

impl<'a> ResourceView<'a> {
    /// The current resource belongs to the nearest actor
    ///
    /// The association is looked up on the resource and defaults to the
    /// parameterized type name of the actor.
    pub fn that_belongs_to_it(&self, association: Option<&str>) -> Result<bool> {
        let Some((actor, resource)) = self.pair("that_belongs_to_it")? else {
            return Ok(false);
        };
        let name = association_name(association, actor);
        references(resource, &name, actor)
    }

    /// The nearest actor belongs to the current resource
    ///
    /// The association is looked up on the actor and defaults to the
    /// parameterized type name of the resource.
    pub fn to_which_it_belongs(&self, association: Option<&str>) -> Result<bool> {
        let Some((actor, resource)) = self.pair("to_which_it_belongs")? else {
            return Ok(false);
        };
        let name = association_name(association, resource);
        references(actor, &name, resource)
    }

    fn pair(&self, matcher: &str) -> Result<Option<(&Value, &Value)>> {
        let Some(stack) = self.stack() else {
            return Ok(None);
        };
        let actor = stack.top_tagged(Tag::Actor).ok_or_else(|| {
            Error::setup(format!("'{}' requires an enclosing actor context", matcher))
        })?;
        Ok(stack.top().map(|resource| (actor, resource)))
    }
}

fn association_name(association: Option<&str>, target: &Value) -> String {
    association
        .map(str::to_string)
        .unwrap_or_else(|| parameterize(target.type_name()))
}

/// `holder` points at `target` through its association `name`
fn references(holder: &Value, name: &str, target: &Value) -> Result<bool> {
    match holder.reflect_on_association(name) {
        Reflection::Missing => Err(Error::setup(format!(
            "'{}' declares no association named '{}'",
            holder.type_name(),
            name
        ))),
        Reflection::Declared(Association::Through { through }) => Err(Error::setup(format!(
            "association '{}' goes through '{}', which is not supported",
            name, through
        ))),
        Reflection::Declared(Association::Other { kind }) => Err(Error::setup(format!(
            "association '{}' is a '{}' association, only belongs_to is supported",
            name, kind
        ))),
        Reflection::Declared(Association::BelongsTo { foreign_key }) => {
            Ok(holder.resolve(&foreign_key)? == target.resolve("id")?)
        }
        Reflection::Conventional => {
            Ok(target.resolve("id")? == holder.resolve(&format!("{}_id", name))?)
        }
    }
}
