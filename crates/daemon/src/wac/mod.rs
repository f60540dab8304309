//! Web Access Control engine
//!
//! For a required mode and target URI, walk upward from the target toward
//! the storage root looking for the first ancestor with a non-empty ACL
//! graph. The target itself is matched through `acl:accessTo`; ancestors
//! through `acl:defaultForNew`. The first non-empty ACL is authoritative:
//! the walk stops there, and a miss inside it means denial (or a fresh
//! WWW-Authenticate challenge for anonymous callers). No ACL anywhere means
//! the resource is open.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::ns::{acl, foaf};
use common::prelude::*;
use oxrdf::vocab::rdf;
use oxrdf::{NamedNode, NamedNodeRef, Subject, Term};

use crate::profiles::ProfileSource;
use crate::resource::{resolve, MediaTypes, PathError};
use crate::service_config::Config;
use crate::service_state::State;

/// Access modes of the WAC vocabulary.
///
/// `Control` subsumes everything; `Write` also satisfies an `Append`
/// requirement. The router additionally retries Append-gated verbs with
/// `Write`, evaluated before any challenge is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Append,
    Control,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Read => "Read",
            Mode::Write => "Write",
            Mode::Append => "Append",
            Mode::Control => "Control",
        }
    }

    /// Mode terms whose grant satisfies this requirement.
    fn satisfied_by(&self) -> &'static [NamedNodeRef<'static>] {
        match self {
            Mode::Read => &[acl::READ],
            Mode::Write => &[acl::WRITE],
            Mode::Append => &[acl::APPEND, acl::WRITE],
            Mode::Control => &[acl::CONTROL],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum AccessDecision {
    Allow,
    /// 401: anonymous caller, challenge carries a fresh nonce token
    AuthRequired { challenge: String, message: String },
    /// 403: authenticated caller without a matching rule
    Denied { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WacError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to mint challenge token: {0}")]
    Token(#[from] EnvelopeError),
}

/// One request's access-control view: the effective user (after
/// delegation), the request origin, and the collaborators needed to walk
/// ACLs and dereference groups.
pub struct AccessControl {
    config: Arc<Config>,
    media: Arc<MediaTypes>,
    profiles: Arc<dyn ProfileSource>,
    keyring: Keyring,
    nonce_age: Duration,
    user: String,
    user_node: Option<NamedNode>,
    origin: String,
}

impl AccessControl {
    /// Build the per-request engine. An `On-Behalf-Of` delegator replaces
    /// the authenticated user iff the delegator's profile asserts
    /// `acl:delegates <user>`.
    pub async fn new(
        state: &State,
        user: String,
        origin: String,
        on_behalf_of: Option<&str>,
    ) -> Self {
        let mut user = user;
        if let Some(delegator) = on_behalf_of {
            let delegator = debrack(delegator);
            if !user.is_empty() && verify_delegator(state.profiles().as_ref(), delegator, &user).await
            {
                tracing::debug!(delegator, delegatee = %user, "delegation accepted");
                user = delegator.to_string();
            }
        }
        let user_node = NamedNode::new(&user).ok();
        Self {
            config: state.config().clone(),
            media: state.media().clone(),
            profiles: state.profiles().clone(),
            keyring: state.keyring().clone(),
            nonce_age: state.config().nonce_age,
            user,
            user_node,
            origin,
        }
    }

    /// The WebID authorization is evaluated for (delegator when delegated).
    pub fn user(&self) -> &str {
        &self.user
    }

    pub async fn allow_read(&self, uri: &str) -> Result<AccessDecision, WacError> {
        self.allow(Mode::Read, uri).await
    }

    pub async fn allow_write(&self, uri: &str) -> Result<AccessDecision, WacError> {
        self.allow(Mode::Write, uri).await
    }

    pub async fn allow_append(&self, uri: &str) -> Result<AccessDecision, WacError> {
        self.allow(Mode::Append, uri).await
    }

    pub async fn allow_control(&self, uri: &str) -> Result<AccessDecision, WacError> {
        self.allow(Mode::Control, uri).await
    }

    /// Walk ancestor ACLs and decide access for `mode` on `uri`.
    pub async fn allow(&self, mode: Mode, uri: &str) -> Result<AccessDecision, WacError> {
        let mut target = uri.to_string();
        let mut access = acl::ACCESS_TO;

        loop {
            let p = resolve(&self.config, &self.media, &target)?;
            if p.exists {
                let mut policies = Graph::new(p.acl_uri.clone());
                policies.read_file(&p.acl_file);
                if !policies.is_empty() {
                    tracing::debug!(
                        mode = %mode,
                        target = %p.uri,
                        user = %self.user,
                        acl = %p.acl_uri,
                        "found policies"
                    );
                    return self.evaluate(&policies, &p.uri, access, mode).await;
                }
            }

            // nothing authoritative at this level; inherited rules apply
            // from here up
            access = acl::DEFAULT_FOR_NEW;
            match p.parent() {
                Some(parent) => target = parent,
                None => break,
            }
        }

        tracing::debug!(uri, "no ACL policies present - access allowed");
        Ok(AccessDecision::Allow)
    }

    /// Decide against one authoritative ACL graph.
    async fn evaluate(
        &self,
        policies: &Graph,
        target_uri: &str,
        access: NamedNodeRef<'_>,
        mode: Mode,
    ) -> Result<AccessDecision, WacError> {
        if let Ok(resource) = NamedNode::new(target_uri) {
            // Control grants everything, with no origin restriction
            for rule in policies.all(None, Some(acl::MODE), Some(acl::CONTROL.into())) {
                if policies
                    .one(
                        Some(rule.subject.as_ref()),
                        Some(access),
                        Some(resource.as_ref().into()),
                    )
                    .is_none()
                {
                    continue;
                }
                if self.matches_agent(policies, &rule.subject).await {
                    tracing::debug!(mode = %mode, user = %self.user, "access allowed (Control)");
                    return Ok(AccessDecision::Allow);
                }
            }

            for mode_term in mode.satisfied_by() {
                for rule in policies.all(None, Some(acl::MODE), Some((*mode_term).into())) {
                    if policies
                        .one(
                            Some(rule.subject.as_ref()),
                            Some(access),
                            Some(resource.as_ref().into()),
                        )
                        .is_none()
                    {
                        continue;
                    }
                    if !self.origin_admitted(policies, &rule.subject) {
                        continue;
                    }
                    if self.matches_agent(policies, &rule.subject).await {
                        tracing::debug!(mode = %mode, user = %self.user, "access allowed");
                        return Ok(AccessDecision::Allow);
                    }
                }
            }
        }

        if self.user.is_empty() {
            let mut values = BTreeMap::new();
            values.insert("secret".to_string(), hex::encode(self.keyring.salt()));
            let token = self
                .keyring
                .seal("WWW-Authenticate", &values, self.nonce_age)?;
            return Ok(AccessDecision::AuthRequired {
                challenge: format!("WebID-RSA nonce=\"{}\"", token),
                message: format!("Access to {} requires authentication", target_uri),
            });
        }
        tracing::debug!(mode = %mode, user = %self.user, "access denied");
        Ok(AccessDecision::Denied {
            message: format!("Access denied for: {}", self.user),
        })
    }

    /// Origin restriction: a rule carrying `acl:origin` only admits
    /// requests whose `Origin` header matches one of them. Requests without
    /// an `Origin` are not restricted.
    fn origin_admitted(&self, policies: &Graph, rule: &Subject) -> bool {
        if self.origin.is_empty() {
            return true;
        }
        let origins = policies.all(Some(rule.as_ref()), Some(acl::ORIGIN), None);
        if origins.is_empty() {
            return true;
        }
        origins.iter().any(|t| match &t.object {
            Term::NamedNode(origin) => origin.as_str() == self.origin,
            _ => false,
        })
    }

    /// Agent tests shared by both passes: owner, named agent, the public
    /// `foaf:Agent` class, or membership in a dereferenced `foaf:Group`
    /// (one level deep; groups are not expanded transitively).
    async fn matches_agent(&self, policies: &Graph, rule: &Subject) -> bool {
        if let Some(user) = &self.user_node {
            if policies
                .one(
                    Some(rule.as_ref()),
                    Some(acl::OWNER),
                    Some(user.as_ref().into()),
                )
                .is_some()
            {
                return true;
            }
            if policies
                .one(
                    Some(rule.as_ref()),
                    Some(acl::AGENT),
                    Some(user.as_ref().into()),
                )
                .is_some()
            {
                return true;
            }
        }

        for t in policies.all(Some(rule.as_ref()), Some(acl::AGENT_CLASS), None) {
            let Term::NamedNode(class) = &t.object else {
                continue;
            };
            if class.as_ref() == foaf::AGENT {
                return true;
            }
            let group = self.profiles.load(class.as_str()).await;
            if group.is_empty()
                || group
                    .one(
                        Some(class.as_ref().into()),
                        Some(rdf::TYPE),
                        Some(foaf::GROUP.into()),
                    )
                    .is_none()
            {
                continue;
            }
            if let Some(user) = &self.user_node {
                if group
                    .one(
                        Some(class.as_ref().into()),
                        Some(foaf::MEMBER),
                        Some(user.as_ref().into()),
                    )
                    .is_some()
                {
                    tracing::debug!(user = %self.user, group = %class, "group member");
                    return true;
                }
            }
        }
        false
    }
}

/// True iff `delegator`'s profile asserts `acl:delegates <delegatee>`.
pub async fn verify_delegator(
    profiles: &dyn ProfileSource,
    delegator: &str,
    delegatee: &str,
) -> bool {
    let profile = profiles.load(delegator).await;
    let Ok(node) = NamedNode::new(delegator) else {
        return false;
    };
    profile
        .all(Some(node.as_ref().into()), Some(acl::DELEGATES), None)
        .iter()
        .any(|t| match &t.object {
            Term::NamedNode(n) => n.as_str() == delegatee,
            _ => false,
        })
}

/// Strip one layer of angle brackets, as used by `On-Behalf-Of`.
pub fn debrack(value: &str) -> &str {
    value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value)
}
