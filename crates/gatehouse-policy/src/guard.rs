//! Authorization guard
//!
//! Turns profile decisions into an authorization outcome for one request.
//! Each profile is checked twice, once for the controller and once for the
//! `controller#action` pair. A forbid anywhere vetoes the request; otherwise at
//! least one profile must allow it.

use crate::definition::Definition;
use crate::profile::Decision;
use crate::provider::Provider;
use gatehouse_core::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Actions that skip authorization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Exemptions {
    /// Every action is restricted
    #[default]
    None,
    /// No action is restricted
    All,
    /// These actions are not restricted
    Actions(BTreeSet<String>),
}

/// Decisions taken for one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOutcome {
    pub profile: String,
    /// Decision for the controller scope
    pub controller: Decision,
    /// Decision for the `controller#action` scope, absent after a veto
    pub action: Option<Decision>,
}

impl ProfileOutcome {
    pub fn is_allowed(&self) -> bool {
        self.controller == Decision::Allowed || self.action == Some(Decision::Allowed)
    }

    pub fn is_forbidden(&self) -> bool {
        self.controller == Decision::Forbidden || self.action == Some(Decision::Forbidden)
    }
}

/// Overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The action is not restricted
    Exempt,
    /// At least one profile allowed the action
    Authorized,
    /// A profile forbade the action
    Forbidden,
    /// No profile allowed the action
    Denied,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exempt => "exempt",
            Self::Authorized => "authorized",
            Self::Forbidden => "forbidden",
            Self::Denied => "denied",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Exempt | Self::Authorized)
    }
}

/// Detailed evaluation of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub controller: String,
    pub action: String,
    pub verdict: Verdict,
    pub outcomes: Vec<ProfileOutcome>,
}

impl Report {
    /// Pretty-printed JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Request authorization over a definition
#[derive(Debug, Clone)]
pub struct Guard<'d> {
    definition: &'d Definition,
    exemptions: Exemptions,
}

impl<'d> Guard<'d> {
    pub fn new(definition: &'d Definition) -> Self {
        Self {
            definition,
            exemptions: Exemptions::None,
        }
    }

    /// Exempt the given actions from authorization
    pub fn unrestricted<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self.exemptions {
            Exemptions::All => {}
            Exemptions::Actions(exempt) => exempt.extend(actions.into_iter().map(Into::into)),
            Exemptions::None => {
                self.exemptions =
                    Exemptions::Actions(actions.into_iter().map(Into::into).collect())
            }
        }
        self
    }

    /// Exempt every action
    pub fn unrestricted_all(mut self) -> Self {
        self.exemptions = Exemptions::All;
        self
    }

    pub fn exemptions(&self) -> &Exemptions {
        &self.exemptions
    }

    pub fn is_restricted(&self, action: &str) -> bool {
        match &self.exemptions {
            Exemptions::None => true,
            Exemptions::All => false,
            Exemptions::Actions(exempt) => !exempt.contains(action),
        }
    }

    /// Evaluate every profile and report what each decided
    ///
    /// Stops at the first forbidding profile. Setup errors abort the
    /// evaluation.
    pub fn evaluate<S: AsRef<str>>(
        &self,
        provider: &dyn Provider,
        profiles: &[S],
        controller: &str,
        action: &str,
    ) -> Result<Report> {
        let mut report = Report {
            controller: controller.to_string(),
            action: action.to_string(),
            verdict: Verdict::Denied,
            outcomes: Vec::with_capacity(profiles.len()),
        };

        if !self.is_restricted(action) {
            debug!(controller, action, "action is unrestricted");
            report.verdict = Verdict::Exempt;
            return Ok(report);
        }

        let scoped = format!("{}#{}", controller, action);
        for profile in profiles {
            let profile = profile.as_ref();

            let on_controller = self.decide(provider, profile, "controller", controller)?;
            let mut outcome = ProfileOutcome {
                profile: profile.to_string(),
                controller: on_controller,
                action: None,
            };
            if on_controller != Decision::Forbidden {
                outcome.action = Some(self.decide(provider, profile, "action", &scoped)?);
            }

            let forbidden = outcome.is_forbidden();
            report.outcomes.push(outcome);
            if forbidden {
                warn!(profile, controller, action, "access vetoed by forbid rule");
                report.verdict = Verdict::Forbidden;
                return Ok(report);
            }
        }

        if report.outcomes.iter().any(ProfileOutcome::is_allowed) {
            report.verdict = Verdict::Authorized;
        }
        Ok(report)
    }

    fn decide(
        &self,
        provider: &dyn Provider,
        profile: &str,
        scope: &'static str,
        action: &str,
    ) -> Result<Decision> {
        let decision = self.definition.validate(provider, profile, action)?;
        metrics::counter!(
            "gatehouse_decisions_total",
            "profile" => profile.to_string(),
            "scope" => scope,
            "decision" => decision.as_str()
        )
        .increment(1);
        Ok(decision)
    }

    /// Authorize one request
    ///
    /// Forbidden and denied requests come back as [`Error::Forbidden`] and
    /// [`Error::Denied`].
    pub fn authorize<S: AsRef<str>>(
        &self,
        provider: &dyn Provider,
        profiles: &[S],
        controller: &str,
        action: &str,
    ) -> Result<()> {
        if self.is_restricted(action) && profiles.is_empty() {
            record(Verdict::Denied);
            return Err(Error::denied("no profiles available"));
        }

        let report = self.evaluate(provider, profiles, controller, action)?;
        record(report.verdict);
        match report.verdict {
            Verdict::Exempt | Verdict::Authorized => Ok(()),
            Verdict::Forbidden => Err(Error::Forbidden),
            Verdict::Denied => Err(Error::denied(format!(
                "no profile allowed '{}#{}'",
                controller, action
            ))),
        }
    }
}

fn record(verdict: Verdict) {
    metrics::counter!("gatehouse_authorizations_total", "outcome" => verdict.as_str())
        .increment(1);
}
