//! Matches assertion offers against requests and mediates producing and
//! verifying them through pluggable capability objects.
//!
//! The broker never looks inside an assertion: proofs are opaque byte blobs
//! that only the registered [`AssertionGenerator`] and [`AssertionVerifier`]
//! for that [`AssertionDescription`] understand.
//!
//! 将断言的提供与请求进行匹配，并通过可插拔的能力对象生成和验证断言。
//!
//! 代理从不检查断言内容：证明是不透明的字节块，只有为该 [`AssertionDescription`]
//! 注册的 [`AssertionGenerator`] 和 [`AssertionVerifier`] 才能理解。

use crate::error::{HandshakeError, Result};
use crate::protocol::message::{Assertion, AssertionDescription};
use crate::protocol::state::Role;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an assertion generator or verifier.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AssertionError(pub String);

/// What an assertion is bound to.
///
/// `transcript_hash` is the hash of the handshake transcript just before the
/// producer's `Id` message, so a proof cannot be replayed into another session.
#[derive(Debug, Clone, Copy)]
pub struct AssertionContext<'a> {
    /// The role of the peer producing the assertion.
    pub role: Role,
    pub transcript_hash: &'a [u8],
}

/// Produces proofs for one assertion kind.
pub trait AssertionGenerator: Send + Sync {
    fn description(&self) -> AssertionDescription;

    fn generate(
        &self,
        context: &AssertionContext<'_>,
    ) -> std::result::Result<Vec<u8>, AssertionError>;
}

/// Checks proofs of one assertion kind. `Ok(false)` means the proof was rejected.
pub trait AssertionVerifier: Send + Sync {
    fn description(&self) -> AssertionDescription;

    fn verify(
        &self,
        assertion: &[u8],
        context: &AssertionContext<'_>,
    ) -> std::result::Result<bool, AssertionError>;
}

/// Generators and verifiers keyed by the assertion kind they handle.
///
/// Built once and shared read-only between sessions.
///
/// 按所处理的断言类型索引的生成器与验证器。
///
/// 构建一次后在各会话之间只读共享。
#[derive(Clone, Default)]
pub struct AssertionRegistry {
    generators: HashMap<AssertionDescription, Arc<dyn AssertionGenerator>>,
    verifiers: HashMap<AssertionDescription, Arc<dyn AssertionVerifier>>,
}

impl AssertionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator(mut self, generator: impl AssertionGenerator + 'static) -> Self {
        self.generators
            .insert(generator.description(), Arc::new(generator));
        self
    }

    pub fn with_verifier(mut self, verifier: impl AssertionVerifier + 'static) -> Self {
        self.verifiers.insert(verifier.description(), Arc::new(verifier));
        self
    }

    pub fn generator(&self, description: &AssertionDescription) -> Option<&dyn AssertionGenerator> {
        self.generators.get(description).map(|g| g.as_ref())
    }

    pub fn verifier(&self, description: &AssertionDescription) -> Option<&dyn AssertionVerifier> {
        self.verifiers.get(description).map(|v| v.as_ref())
    }
}

impl fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("verifiers", &self.verifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether this side owes the assertion or expects it from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationKind {
    /// This side produces the assertion.
    Offered,
    /// The peer produces the assertion and this side verifies it.
    Requested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationStatus {
    Unsatisfied,
    Satisfied,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionObligation {
    pub description: AssertionDescription,
    pub kind: ObligationKind,
    pub status: ObligationStatus,
}

/// Per-session assertion bookkeeping.
#[derive(Debug)]
pub struct AssertionBroker {
    registry: Arc<AssertionRegistry>,
    obligations: Vec<AssertionObligation>,
}

impl AssertionBroker {
    pub fn new(registry: Arc<AssertionRegistry>) -> Self {
        Self {
            registry,
            obligations: Vec::new(),
        }
    }

    pub fn obligations(&self) -> &[AssertionObligation] {
        &self.obligations
    }

    /// Server side of the agreement, run on `ClientPrecommit`.
    ///
    /// The server must be able to offer everything the client requested and the
    /// client must offer everything the server requests. Returns the
    /// `(server_offers, server_requests)` to send in `ServerPrecommit`.
    ///
    /// 服务器端的断言协商，在收到 `ClientPrecommit` 时执行。
    pub fn agree_as_server(
        &mut self,
        local_offers: &[AssertionDescription],
        local_requests: &[AssertionDescription],
        client_offers: &[AssertionDescription],
        client_requests: &[AssertionDescription],
    ) -> Result<(Vec<AssertionDescription>, Vec<AssertionDescription>)> {
        let server_offers = dedup(client_requests);
        let server_requests = dedup(local_requests);

        if let Some(missing) = server_offers.iter().find(|d| !local_offers.contains(d)) {
            return Err(HandshakeError::UnsupportedAssertionType(missing.clone()));
        }
        if let Some(missing) = server_requests.iter().find(|d| !client_offers.contains(d)) {
            return Err(HandshakeError::UnsupportedAssertionType(missing.clone()));
        }

        self.record(&server_offers, &server_requests);
        Ok((server_offers, server_requests))
    }

    /// Client side of the agreement, run on `ServerPrecommit`.
    ///
    /// The server's offers must be exactly the client's requests and the
    /// server's requests a subset of the client's offers.
    ///
    /// 客户端的断言协商，在收到 `ServerPrecommit` 时执行。
    pub fn agree_as_client(
        &mut self,
        local_offers: &[AssertionDescription],
        local_requests: &[AssertionDescription],
        server_offers: &[AssertionDescription],
        server_requests: &[AssertionDescription],
    ) -> Result<()> {
        let server_offers = dedup(server_offers);
        let server_requests = dedup(server_requests);

        if let Some(extra) = server_offers.iter().find(|d| !local_requests.contains(d)) {
            return Err(HandshakeError::UnsupportedAssertionType(extra.clone()));
        }
        if let Some(missing) = local_requests.iter().find(|d| !server_offers.contains(d)) {
            return Err(HandshakeError::UnsupportedAssertionType(missing.clone()));
        }
        if let Some(extra) = server_requests.iter().find(|d| !local_offers.contains(d)) {
            return Err(HandshakeError::UnsupportedAssertionType(extra.clone()));
        }

        self.record(&server_requests, &server_offers);
        Ok(())
    }

    /// Produces every assertion this side owes, bound to `context`.
    pub fn produce(&mut self, context: &AssertionContext<'_>) -> Result<Vec<Assertion>> {
        let mut assertions = Vec::new();
        for obligation in self
            .obligations
            .iter_mut()
            .filter(|o| o.kind == ObligationKind::Offered)
        {
            let generator = self
                .registry
                .generator(&obligation.description)
                .ok_or_else(|| {
                    HandshakeError::UnsupportedAssertionType(obligation.description.clone())
                })?;
            let proof = generator.generate(context).map_err(|e| {
                HandshakeError::Internal(format!(
                    "generating assertion {} failed: {e}",
                    obligation.description
                ))
            })?;
            obligation.status = ObligationStatus::Satisfied;
            assertions.push(Assertion {
                description: obligation.description.clone(),
                assertion: proof,
            });
        }
        Ok(assertions)
    }

    /// Verifies the peer's assertions against what this side requested.
    ///
    /// Each requested kind must appear exactly once and pass its verifier;
    /// anything unrequested is rejected.
    ///
    /// 根据本方的请求验证对端的断言。
    pub fn verify(
        &mut self,
        assertions: &[Assertion],
        context: &AssertionContext<'_>,
    ) -> Result<()> {
        for assertion in assertions {
            let obligation = self
                .obligations
                .iter_mut()
                .find(|o| {
                    o.kind == ObligationKind::Requested
                        && o.status == ObligationStatus::Unsatisfied
                        && o.description == assertion.description
                })
                .ok_or_else(|| {
                    HandshakeError::BadAssertion(
                        assertion.description.clone(),
                        "unexpected or duplicate assertion".into(),
                    )
                })?;

            let verifier = self
                .registry
                .verifier(&assertion.description)
                .ok_or_else(|| {
                    HandshakeError::UnsupportedAssertionType(assertion.description.clone())
                })?;

            match verifier.verify(&assertion.assertion, context) {
                Ok(true) => obligation.status = ObligationStatus::Satisfied,
                Ok(false) => {
                    obligation.status = ObligationStatus::Rejected;
                    return Err(HandshakeError::BadAssertion(
                        assertion.description.clone(),
                        "verification rejected the proof".into(),
                    ));
                }
                Err(e) => {
                    obligation.status = ObligationStatus::Rejected;
                    return Err(HandshakeError::BadAssertion(
                        assertion.description.clone(),
                        e.to_string(),
                    ));
                }
            }
        }

        if let Some(missing) = self.obligations.iter().find(|o| {
            o.kind == ObligationKind::Requested && o.status == ObligationStatus::Unsatisfied
        }) {
            return Err(HandshakeError::BadAssertion(
                missing.description.clone(),
                "requested assertion was not provided".into(),
            ));
        }
        Ok(())
    }

    fn record(&mut self, offered: &[AssertionDescription], requested: &[AssertionDescription]) {
        let offered = offered.iter().map(|d| (d, ObligationKind::Offered));
        let requested = requested.iter().map(|d| (d, ObligationKind::Requested));
        self.obligations = offered
            .chain(requested)
            .map(|(description, kind)| AssertionObligation {
                description: description.clone(),
                kind,
                status: ObligationStatus::Unsatisfied,
            })
            .collect();
    }
}

/// Drops repeated descriptions, keeping first-seen order.
fn dedup(descriptions: &[AssertionDescription]) -> Vec<AssertionDescription> {
    let mut seen = HashSet::with_capacity(descriptions.len());
    descriptions
        .iter()
        .filter(|d| seen.insert(*d))
        .cloned()
        .collect()
}
