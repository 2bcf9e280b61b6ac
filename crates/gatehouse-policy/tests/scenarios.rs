//! End-to-end evaluation scenarios over the registration API

use gatehouse_core::{Association, Error, Record};
use gatehouse_policy::context::kind::Actor;
use gatehouse_policy::prelude::*;

fn member_profile(definition: &mut Definition) {
    definition
        .register_profile_upon::<Actor, _, _>(
            "member",
            |view| view.the("user"),
            |rules| {
                rules.allow_if("show", |user| user.asks_with_same_id(["app_id"]));
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn test_same_id_parameter_allows() {
    let mut definition = Definition::new();
    member_profile(&mut definition);

    let provider = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("app_id", 10))
        .with_param("app_id", "10");

    assert_eq!(
        definition.validate(&provider, "member", "show").unwrap(),
        Decision::Allowed
    );
}

#[test]
fn test_other_id_parameter_is_default() {
    let mut definition = Definition::new();
    member_profile(&mut definition);

    let provider = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("app_id", 10))
        .with_param("app_id", "11");

    assert_eq!(
        definition.validate(&provider, "member", "show").unwrap(),
        Decision::Default
    );
}

#[test]
fn test_missing_actor_is_default() {
    let mut definition = Definition::new();
    member_profile(&mut definition);

    let provider = RequestProvider::new("show").with_param("app_id", "10");

    assert_eq!(
        definition.validate(&provider, "member", "show").unwrap(),
        Decision::Default
    );
}

#[test]
fn test_forbid_wins_over_later_allow() {
    let mut definition = Definition::new();
    definition
        .register_profile("careful", |rules| {
            rules.forbid_if("destroy", upon("user", |user| user.is("is_admin")));
            rules.allow("destroy");
            Ok(())
        })
        .unwrap();

    let admin = RequestProvider::new("destroy")
        .with_actor("user", Record::new("User").with("is_admin", true));
    let member = RequestProvider::new("destroy")
        .with_actor("user", Record::new("User").with("is_admin", false));

    assert_eq!(
        definition.validate(&admin, "careful", "destroy").unwrap(),
        Decision::Forbidden
    );
    assert_eq!(
        definition.validate(&member, "careful", "destroy").unwrap(),
        Decision::Allowed
    );
}

#[test]
fn test_resource_attribute_equal_to_own() {
    let mut definition = Definition::new();
    definition
        .register_profile_upon::<Actor, _, _>(
            "owner",
            |view| view.the("user"),
            |rules| {
                rules.allow_if("show", |user| {
                    user.loaded("account")?
                        .has("owner_id")?
                        .equal_to(Operand::own("id"))
                });
                Ok(())
            },
        )
        .unwrap();

    let owner = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("id", 7))
        .with_resource("account", Record::new("Account").with("owner_id", 7));
    let stranger = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("id", 8))
        .with_resource("account", Record::new("Account").with("owner_id", 7));

    assert_eq!(
        definition.validate(&owner, "owner", "show").unwrap(),
        Decision::Allowed
    );
    assert_eq!(
        definition.validate(&stranger, "owner", "show").unwrap(),
        Decision::Default
    );
}

#[test]
fn test_break_inside_scope_is_contained() {
    let mut definition = Definition::new();
    definition
        .register_profile("scoped", |rules| {
            rules.scope(|group| {
                group.continue_if(|_| Ok(false));
                group.allow("show");
                Ok(())
            })?;
            rules.allow("show");
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show");
    assert_eq!(
        definition.validate(&provider, "scoped", "show").unwrap(),
        Decision::Allowed
    );
}

#[test]
fn test_break_inside_expand_propagates() {
    let mut definition = Definition::new();
    definition
        .register_profile("guarded", |rules| {
            rules.continue_if(|_| Ok(false));
            rules.allow("show");
            Ok(())
        })
        .unwrap();
    definition
        .register_profile("expanded", |rules| {
            rules.expand("guarded")?;
            rules.allow("show");
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show");
    assert_eq!(
        definition.validate(&provider, "expanded", "show").unwrap(),
        Decision::Break
    );
}

#[test]
fn test_expand_of_default_continues() {
    let mut definition = Definition::new();
    definition.register_profile("empty", |_| Ok(())).unwrap();
    definition
        .register_profile("outer", |rules| {
            rules.expand("empty")?;
            rules.forbid("show");
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show");
    assert_eq!(
        definition.validate(&provider, "outer", "show").unwrap(),
        Decision::Forbidden
    );
}

#[test]
fn test_unrelated_rules_do_not_change_outcome() {
    let orders: [&[&str]; 3] = [
        &["edit", "allow", "index"],
        &["allow", "edit", "index"],
        &["index", "edit", "allow"],
    ];

    for order in orders {
        let mut definition = Definition::new();
        definition
            .register_profile("p", |rules| {
                for rule in order {
                    match *rule {
                        "allow" => rules.allow("show"),
                        other => rules.forbid(other),
                    };
                }
                Ok(())
            })
            .unwrap();

        let provider = RequestProvider::new("show");
        assert_eq!(
            definition.validate(&provider, "p", "show").unwrap(),
            Decision::Allowed,
            "order {:?}",
            order
        );
    }
}

#[test]
fn test_any_requested_action_matches() {
    let mut definition = Definition::new();
    definition
        .register_profile("p", |rules| {
            rules.allow("apps#show");
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show");
    assert_eq!(
        definition
            .validate(&provider, "p", ["apps", "apps#show"])
            .unwrap(),
        Decision::Allowed
    );
    assert_eq!(
        definition.validate(&provider, "p", "apps").unwrap(),
        Decision::Default
    );
}

#[test]
fn test_forbidding_profile_vetoes_allowing_one() {
    let mut definition = Definition::new();
    definition
        .register_profile("banned", |rules| {
            rules.forbid("apps#show");
            Ok(())
        })
        .unwrap();
    definition
        .register_profile("reader", |rules| {
            rules.allow("apps#show");
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show");
    let guard = Guard::new(&definition);

    assert!(matches!(
        guard.authorize(&provider, &["banned", "reader"], "apps", "show"),
        Err(Error::Forbidden)
    ));
    assert!(guard
        .authorize(&provider, &["reader"], "apps", "show")
        .is_ok());
}

#[test]
fn test_validate_is_repeatable() {
    let mut definition = Definition::new();
    member_profile(&mut definition);

    let provider = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("app_id", 10))
        .with_param("app_id", "10");

    let first = definition.validate(&provider, "member", "show").unwrap();
    let second = definition.validate(&provider, "member", "show").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_actor_loader_runs_once_per_request() {
    use std::cell::Cell;
    use std::rc::Rc;

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);

    let mut definition = Definition::new();
    definition
        .register_profile("p", |rules| {
            rules.continue_if(upon_actor("user"));
            rules.allow_if("show", upon("user", |user| user.is("active")));
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show").with_actor_loader("user", move || {
        counter.set(counter.get() + 1);
        Ok(Some(Record::new("User").with("active", true).into()))
    });

    assert_eq!(
        definition.validate(&provider, "p", "show").unwrap(),
        Decision::Allowed
    );
    assert_eq!(
        definition.validate(&provider, "p", "show").unwrap(),
        Decision::Allowed
    );
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_own_without_actor_is_setup_error() {
    let mut definition = Definition::new();
    definition
        .register_profile("p", |rules| {
            rules.allow_if("show", |view| {
                view.loaded("account")?
                    .has("owner_id")?
                    .equal_to(Operand::own("id"))
            });
            Ok(())
        })
        .unwrap();

    let provider = RequestProvider::new("show")
        .with_resource("account", Record::new("Account").with("owner_id", 7));

    assert!(definition
        .validate(&provider, "p", "show")
        .unwrap_err()
        .is_setup());
}

#[test]
fn test_relation_reflection() {
    let mut definition = Definition::new();
    definition
        .register_profile_upon::<Actor, _, _>(
            "owner",
            |view| view.the("user"),
            |rules| {
                rules.allow_if("show", |user| user.owns("post", Some("author")));
                Ok(())
            },
        )
        .unwrap();

    let user = Record::new("User").with("id", 3);
    let declared = Record::new("Post")
        .with("written_by", 3)
        .with_association("author", Association::belongs_to("written_by"));
    let through = Record::new("Post").with_association(
        "author",
        Association::Through {
            through: "blog".into(),
        },
    );
    let undeclared = Record::new("Post").with_association("blog", Association::belongs_to("blog_id"));

    let provider = |post: Record| {
        RequestProvider::new("show")
            .with_actor("user", user.clone())
            .with_resource("post", post)
    };

    assert_eq!(
        definition
            .validate(&provider(declared), "owner", "show")
            .unwrap(),
        Decision::Allowed
    );
    assert!(definition
        .validate(&provider(through), "owner", "show")
        .unwrap_err()
        .is_setup());
    assert!(definition
        .validate(&provider(undeclared), "owner", "show")
        .unwrap_err()
        .is_setup());
}

#[test]
fn test_conventional_relation_uses_id_attribute() {
    let mut definition = Definition::new();
    definition
        .register_profile_upon::<Actor, _, _>(
            "member",
            |view| view.the("user"),
            |rules| {
                rules.allow_if("show", |user| user.belongs_to("team", None));
                Ok(())
            },
        )
        .unwrap();

    let provider = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("team_id", 4))
        .with_resource("team", Record::new("Team").with("id", 4));

    assert_eq!(
        definition.validate(&provider, "member", "show").unwrap(),
        Decision::Allowed
    );
}

#[test]
fn test_where_resolves_stack_bindings() {
    let mut definition = Definition::new();
    definition
        .register_profile_upon::<Actor, _, _>(
            "member",
            |view| view.the("user"),
            |rules| {
                rules.allow_if("show", |user| {
                    user.loaded("app")?.where_(|scope| {
                        Ok(scope.attr("user", "team")? == scope.attr("app", "team")?)
                    })
                });
                Ok(())
            },
        )
        .unwrap();

    let provider = RequestProvider::new("show")
        .with_actor("user", Record::new("User").with("team", "core"))
        .with_resource("app", Record::new("App").with("team", "core"));

    assert_eq!(
        definition.validate(&provider, "member", "show").unwrap(),
        Decision::Allowed
    );
}
