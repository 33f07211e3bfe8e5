use super::HandshakeServer;
use crate::config::HandshakeConfig;
use crate::error::Result;
use crate::handshake::Missing;
use crate::handshake::session::SessionCore;
use crate::protocol::assertion::AssertionRegistry;
use crate::protocol::state::Role;
use std::sync::Arc;

/// A builder for creating a `HandshakeServer`.
///
/// A server typically builds one session per accepted connection from the
/// same configuration and a registry shared across all of them.
///
/// 用于创建 `HandshakeServer` 的构建器。
///
/// 服务器通常为每个接受的连接，使用相同的配置和共享的注册表构建一个会话。
#[derive(Debug)]
pub struct HandshakeServerBuilder<Config> {
    config: Config,
    registry: Option<Arc<AssertionRegistry>>,
}

impl HandshakeServerBuilder<Missing> {
    /// Creates a new `HandshakeServerBuilder`.
    pub fn new() -> Self {
        Self {
            config: Missing,
            registry: None,
        }
    }
}

impl Default for HandshakeServerBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Config> HandshakeServerBuilder<Config> {
    /// Sets the preference lists and assertion policy for the handshake.
    ///
    /// 设置握手所用的偏好列表与断言策略。
    pub fn config(self, config: HandshakeConfig) -> HandshakeServerBuilder<HandshakeConfig> {
        HandshakeServerBuilder {
            config,
            registry: self.registry,
        }
    }

    pub fn registry(mut self, registry: Arc<AssertionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl HandshakeServerBuilder<HandshakeConfig> {
    /// Builds the `HandshakeServer`, waiting for `ClientPrecommit`.
    ///
    /// 构建等待 `ClientPrecommit` 的 `HandshakeServer`。
    pub fn build(self) -> Result<HandshakeServer> {
        let registry = self.registry.unwrap_or_default();
        self.config.validate(&registry)?;
        Ok(HandshakeServer {
            core: SessionCore::new(Role::Server, self.config, registry),
        })
    }
}
