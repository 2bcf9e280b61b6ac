//! Policy documents
//!
//! Policies authored as YAML instead of code. A document declares named tests
//! and an ordered list of profiles whose rules use a closed set of
//! expressions:
//!
//! ```yaml
//! tests:
//!   is_admin:
//!     the: { name: user, then: { is: admin } }
//!
//! profiles:
//!   - name: member
//!     context: { the: user }
//!     rules:
//!       - allow: apps#show
//!         if: { asks_with_same_id: app_id }
//!       - forbid: apps#destroy
//!         if: { not: { happens: is_admin } }
//!       - scope:
//!           context: { loaded: app }
//!           rules:
//!             - continue: { that_belongs_to_it: ~ }
//!             - allow: [apps#edit, apps#update]
//! ```
//!
//! Documents compile through the regular [`Definition`] registration API.
//! Rule expressions run against the view kind implied by the most recent stack
//! entry, and using a matcher where that view does not offer it is a setup
//! error. Named tests always run against a default view over the caller's
//! stack.

mod eval;
mod schema;

pub use schema::{
    Actions, AllowSpec, CompareOp, Comparison, ContinueSpec, ExpandSpec, Expr, ForbidSpec,
    Names, OperandSpec, PolicyDocument, ProfileSpec, RelationSpec, RuleSpec, ScopeRuleSpec,
    ScopeSpec, Step, StepKind, StepSpec,
};

use crate::context::kind::Base;
use crate::context::{AnyView, DefaultView, View};
use crate::definition::Definition;
use crate::dsl::Rules;
use gatehouse_core::{Error, Result};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::info;

impl PolicyDocument {
    /// Parse a document from YAML
    ///
    /// Expressions are written as single-key maps (`{ is: admin }`) rather
    /// than YAML tags.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(content);
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(
            deserializer,
        )?)
    }

    /// Read and parse a document file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Compile into a fresh definition
    pub fn compile(&self) -> Result<Definition> {
        let mut definition = Definition::new();
        self.register_into(&mut definition)?;
        Ok(definition)
    }

    /// Register this document's tests and profiles into `definition`
    ///
    /// Either everything registers or `definition` is left untouched.
    pub fn register_into(&self, definition: &mut Definition) -> Result<()> {
        self.check(definition)?;

        let mut staged = definition.clone();
        for (name, expr) in &self.tests {
            staged.register_test(name.as_str(), named_test(expr.clone()))?;
        }

        for profile in &self.profiles {
            let rules = &profile.rules;
            match &profile.context {
                Some(context) => staged.register_profile_upon::<Base, _, _>(
                    profile.name.as_str(),
                    narrowing(context.clone()),
                    |builder| build(builder, rules),
                )?,
                None => {
                    staged.register_profile(profile.name.as_str(), |builder| build(builder, rules))?
                }
            }
        }
        *definition = staged;

        info!(
            profiles = self.profiles.len(),
            tests = self.tests.len(),
            "policy document registered"
        );
        Ok(())
    }

    /// Static checks that do not need a request
    ///
    /// Every `happens` must name a known test, tests must not reference each
    /// other in a cycle, contexts must be chaining steps and every `where`
    /// needs exactly one right-hand side.
    pub fn check(&self, definition: &Definition) -> Result<()> {
        let mut known: HashSet<&str> = self.tests.keys().map(String::as_str).collect();
        known.extend(definition.test_names());

        for (name, expr) in &self.tests {
            check_expr(expr, &known).map_err(|e| within(e, &format!("test '{}'", name)))?;
        }
        for profile in &self.profiles {
            let site = format!("profile '{}'", profile.name);
            if let Some(context) = &profile.context {
                check_context(context, &known).map_err(|e| within(e, &site))?;
            }
            check_rules(&profile.rules, &known).map_err(|e| within(e, &site))?;
        }

        for name in self.tests.keys() {
            let mut path = Vec::new();
            self.check_cycle(name, &mut path)?;
        }
        Ok(())
    }

    fn check_cycle<'d>(&'d self, name: &'d str, path: &mut Vec<&'d str>) -> Result<()> {
        if path.contains(&name) {
            path.push(name);
            return Err(Error::setup(format!(
                "tests reference each other in a cycle: {}",
                path.join(" -> ")
            )));
        }
        let Some(expr) = self.tests.get(name) else {
            return Ok(());
        };
        path.push(name);
        let mut referenced = BTreeSet::new();
        happens_in(expr, &mut referenced);
        for next in referenced {
            self.check_cycle(next, path)?;
        }
        path.pop();
        Ok(())
    }

    /// Profile names in registration order
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

fn within(err: Error, site: &str) -> Error {
    match err {
        Error::Setup(msg) => Error::setup(format!("{}: {}", site, msg)),
        other => other,
    }
}

fn predicate(expr: Expr) -> impl Fn(&DefaultView<'_>) -> Result<bool> + Send + Sync + 'static {
    move |view| eval::evaluate(&expr, &view.reinterpret())
}

/// Named tests always start from a default view, whatever the caller narrowed to
fn named_test(expr: Expr) -> impl Fn(&DefaultView<'_>) -> Result<bool> + Send + Sync + 'static {
    move |view| eval::evaluate(&expr, &AnyView::Default(view.clone()))
}

fn narrowing(
    expr: Expr,
) -> impl for<'a> Fn(&View<'a, Base>) -> Result<View<'a, Base>> + Send + Sync + 'static {
    move |view| Ok(eval::narrow(&expr, &view.reinterpret())?.widen())
}

fn build(rules: &mut Rules<'_, Base>, specs: &[RuleSpec]) -> Result<()> {
    for spec in specs {
        match spec {
            RuleSpec::Allow(allow) => match &allow.condition {
                Some(condition) => {
                    rules.allow_if(allow.allow.to_match(), predicate(condition.clone()));
                }
                None => {
                    rules.allow(allow.allow.to_match());
                }
            },
            RuleSpec::Forbid(forbid) => match &forbid.condition {
                Some(condition) => {
                    rules.forbid_if(forbid.forbid.to_match(), predicate(condition.clone()));
                }
                None => {
                    rules.forbid(forbid.forbid.to_match());
                }
            },
            RuleSpec::Continue(guard) => {
                rules.continue_if(predicate(guard.guard.clone()));
            }
            RuleSpec::Expand(expand) => {
                rules.expand(&expand.expand)?;
            }
            RuleSpec::Scope(scope) => {
                let nested = &scope.scope.rules;
                match &scope.scope.context {
                    Some(context) => {
                        rules.scope_upon::<Base, _, _>(narrowing(context.clone()), |child| {
                            build(child, nested)
                        })?;
                    }
                    None => {
                        rules.scope(|child| build(child, nested))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_rules(rules: &[RuleSpec], known: &HashSet<&str>) -> Result<()> {
    for rule in rules {
        match rule {
            RuleSpec::Allow(AllowSpec {
                condition: Some(expr),
                ..
            })
            | RuleSpec::Forbid(ForbidSpec {
                condition: Some(expr),
                ..
            })
            | RuleSpec::Continue(ContinueSpec { guard: expr }) => check_expr(expr, known)?,
            RuleSpec::Scope(scope) => {
                if let Some(context) = &scope.scope.context {
                    check_context(context, known)?;
                }
                check_rules(&scope.scope.rules, known)?;
            }
            RuleSpec::Allow(_) | RuleSpec::Forbid(_) | RuleSpec::Expand(_) => {}
        }
    }
    Ok(())
}

fn check_context(expr: &Expr, known: &HashSet<&str>) -> Result<()> {
    if expr.as_step().is_none() {
        return Err(Error::setup(format!(
            "'{}' cannot be used as a context, expected a chaining step",
            expr.name()
        )));
    }
    check_expr(expr, known)
}

fn check_expr(expr: &Expr, known: &HashSet<&str>) -> Result<()> {
    match expr {
        Expr::All(exprs) | Expr::Any(exprs) => {
            for expr in exprs {
                check_expr(expr, known)?;
            }
            Ok(())
        }
        Expr::Not(expr) => check_expr(expr, known),
        Expr::Happens(test) if !known.contains(test.as_str()) => {
            Err(Error::setup(format!("invalid test name '{}'", test)))
        }
        Expr::Where(comparison) if comparison.right.is_some() == comparison.value.is_some() => {
            Err(Error::setup(format!(
                "'where' on '{}' needs exactly one of 'right' or 'value'",
                comparison.left
            )))
        }
        _ => match expr.as_step().and_then(|(_, step)| step.then()) {
            Some(then) => check_expr(then, known),
            None => Ok(()),
        },
    }
}

fn happens_in<'e>(expr: &'e Expr, found: &mut BTreeSet<&'e str>) {
    match expr {
        Expr::All(exprs) | Expr::Any(exprs) => {
            for expr in exprs {
                happens_in(expr, found);
            }
        }
        Expr::Not(expr) => happens_in(expr, found),
        Expr::Happens(test) => {
            found.insert(test.as_str());
        }
        _ => {
            if let Some(then) = expr.as_step().and_then(|(_, step)| step.then()) {
                happens_in(then, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Decision;
    use crate::provider::RequestProvider;
    use gatehouse_core::Record;

    #[test]
    fn test_parse_rule_shapes() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: member
    context: { the: user }
    rules:
      - allow: "*"
        if: { is: admin }
      - forbid: [apps#destroy, apps#update]
      - continue: { is: active }
      - scope:
          rules:
            - allow: apps#show
"#,
        )
        .unwrap();

        let profile = &document.profiles[0];
        assert_eq!(profile.context, Some(Expr::The(Step::Name("user".into()))));
        let kinds: Vec<_> = profile.rules.iter().map(RuleSpec::kind_name).collect();
        assert_eq!(kinds, vec!["allow", "forbid", "continue", "scope"]);
    }

    #[test]
    fn test_unknown_test_name_fails_at_load() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: member
    rules:
      - allow: show
        if: { happens: is_admin }
"#,
        )
        .unwrap();

        let err = document.compile().unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("is_admin"));
    }

    #[test]
    fn test_cyclic_tests_fail_at_load() {
        let document = PolicyDocument::from_yaml(
            r#"
tests:
  a: { happens: b }
  b: { not: { happens: a } }
"#,
        )
        .unwrap();

        assert!(document.compile().unwrap_err().is_setup());
    }

    #[test]
    fn test_context_must_be_a_step() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: member
    context: { is: admin }
"#,
        )
        .unwrap();

        assert!(document.compile().unwrap_err().is_setup());
    }

    #[test]
    fn test_context_filter_continuation() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: admins
    context: { the: { name: user, then: { is: admin } } }
    rules:
      - allow: "*"
"#,
        )
        .unwrap();
        let definition = document.compile().unwrap();

        let admin = RequestProvider::new("show")
            .with_actor("user", Record::new("User").with("admin", true));
        let member = RequestProvider::new("show")
            .with_actor("user", Record::new("User").with("admin", false));

        assert_eq!(
            definition.validate(&admin, "admins", "apps").unwrap(),
            Decision::Allowed
        );
        assert_eq!(
            definition.validate(&member, "admins", "apps").unwrap(),
            Decision::Default
        );
    }

    #[test]
    fn test_matcher_on_wrong_view_is_setup_error() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: member
    rules:
      - allow: show
        if: { is: admin }
"#,
        )
        .unwrap();
        let definition = document.compile().unwrap();
        let provider = RequestProvider::new("show");

        let err = definition.validate(&provider, "member", "show").unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("default context"));
    }

    #[test]
    fn test_joined_context_offers_only_where() {
        let document = PolicyDocument::from_yaml(
            r#"
profiles:
  - name: joined
    context: { loaded: { name: source, then: { plus: target } } }
    rules:
      - allow: sync
        if: { where: { left: source.org_id, op: eq, right: target.org_id } }
      - allow: show
        if: { is: public }
"#,
        )
        .unwrap();
        let definition = document.compile().unwrap();
        let provider = RequestProvider::new("sync")
            .with_resource("source", Record::new("Repo").with("org_id", 1).with("public", true))
            .with_resource("target", Record::new("Repo").with("org_id", 1).with("public", true));

        assert_eq!(
            definition.validate(&provider, "joined", "sync").unwrap(),
            Decision::Allowed
        );
        let err = definition.validate(&provider, "joined", "show").unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("multi context"));
    }

    #[test]
    fn test_named_test_starts_from_default_view() {
        let document = PolicyDocument::from_yaml(
            r#"
tests:
  is_admin:
    the: { name: user, then: { is: admin } }

profiles:
  - name: senior
    context: { the: user }
    rules:
      - allow: approve
        if: { has: { name: level, then: { happens: is_admin } } }
"#,
        )
        .unwrap();
        let definition = document.compile().unwrap();
        let admin = RequestProvider::new("approve")
            .with_actor("user", Record::new("User").with("admin", true).with("level", 3));
        let member = RequestProvider::new("approve")
            .with_actor("user", Record::new("User").with("admin", false).with("level", 3));

        assert_eq!(
            definition.validate(&admin, "senior", "approve").unwrap(),
            Decision::Allowed
        );
        assert_eq!(
            definition.validate(&member, "senior", "approve").unwrap(),
            Decision::Default
        );
    }

    #[test]
    fn test_failed_registration_leaves_definition_untouched() {
        let mut definition = Definition::new();
        definition
            .register_profile("taken", |rules| {
                rules.allow("show");
                Ok(())
            })
            .unwrap();
        let document = PolicyDocument::from_yaml(
            r#"
tests:
  fresh: { asks_for: show }
profiles:
  - name: added
    rules:
      - allow: show
  - name: taken
"#,
        )
        .unwrap();

        assert!(document.register_into(&mut definition).unwrap_err().is_setup());
        assert!(!definition.contains_test("fresh"));
        assert!(!definition.contains_profile("added"));
        assert!(definition.contains_profile("taken"));
    }
}
