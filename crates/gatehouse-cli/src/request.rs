//! Request fixtures
//!
//! A fixture describes one request as the engine would see it:
//!
//! ```yaml
//! controller: apps
//! action: edit
//! params: { app_id: "12" }
//! actors:
//!   user: { type: User, attributes: { id: 7 } }
//!   guest: ~
//! resources:
//!   app: { type: App, attributes: { id: 12, owner_id: 7 } }
//! ```
//!
//! An actor given as `~` is known but absent for this request.

use gatehouse_core::{Data, Record, Result};
use gatehouse_policy::RequestProvider;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFixture {
    #[serde(default)]
    pub controller: String,

    pub action: String,

    #[serde(default)]
    pub params: BTreeMap<String, Data>,

    #[serde(default)]
    pub actors: BTreeMap<String, Option<Record>>,

    #[serde(default)]
    pub resources: BTreeMap<String, Record>,
}

impl RequestFixture {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Provider answering for this request
    pub fn provider(&self) -> RequestProvider {
        let mut provider = RequestProvider::new(self.action.as_str());
        for (key, value) in &self.params {
            provider.insert_param(key.as_str(), value.clone());
        }
        for (name, resource) in &self.resources {
            provider.insert_resource(name.as_str(), resource.clone());
        }
        for (name, actor) in &self.actors {
            provider = match actor {
                Some(actor) => provider.with_actor(name.as_str(), actor.clone()),
                None => provider.with_absent_actor(name.as_str()),
            };
        }
        provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::Value;
    use gatehouse_policy::Provider;

    #[test]
    fn test_fixture_provider() {
        let fixture = RequestFixture::from_yaml(
            r#"
controller: apps
action: show
params: { app_id: "3" }
actors:
  user: { type: User, attributes: { id: 1 } }
  guest: ~
resources:
  app: { type: App, attributes: { id: 3 } }
"#,
        )
        .unwrap();
        let provider = fixture.provider();

        assert_eq!(provider.action_name(), "show");
        assert_eq!(provider.param("app_id"), Some(Value::from("3")));
        assert!(provider.resource("app").is_some());
        assert!(provider.has_actor("guest"));
        assert!(provider.actor("guest").unwrap().is_none());
        assert!(provider.actor("user").unwrap().is_some());
        assert!(!provider.has_actor("admin"));
    }

    #[test]
    fn test_action_is_required() {
        assert!(RequestFixture::from_yaml("controller: apps\n").is_err());
    }
}
