use super::HandshakeClient;
use crate::config::HandshakeConfig;
use crate::error::Result;
use crate::handshake::Missing;
use crate::handshake::session::SessionCore;
use crate::protocol::assertion::AssertionRegistry;
use crate::protocol::state::Role;
use std::sync::Arc;

/// A builder for creating a `HandshakeClient`.
///
/// The configuration is tracked in the type, so `build` only exists once it
/// has been provided. The assertion registry is optional and defaults to an
/// empty one.
///
/// 用于创建 `HandshakeClient` 的构建器。
///
/// 配置由类型跟踪，因此只有在提供配置之后才能调用 `build`。
/// 断言注册表是可选的，默认为空。
#[derive(Debug)]
pub struct HandshakeClientBuilder<Config> {
    config: Config,
    registry: Option<Arc<AssertionRegistry>>,
}

impl HandshakeClientBuilder<Missing> {
    /// Creates a new `HandshakeClientBuilder`.
    pub fn new() -> Self {
        Self {
            config: Missing,
            registry: None,
        }
    }
}

impl Default for HandshakeClientBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Config> HandshakeClientBuilder<Config> {
    /// Sets the preference lists and assertion policy for the handshake.
    ///
    /// 设置握手所用的偏好列表与断言策略。
    pub fn config(self, config: HandshakeConfig) -> HandshakeClientBuilder<HandshakeConfig> {
        HandshakeClientBuilder {
            config,
            registry: self.registry,
        }
    }

    /// Sets the shared registry of assertion generators and verifiers.
    ///
    /// 设置共享的断言生成器与验证器注册表。
    pub fn registry(mut self, registry: Arc<AssertionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl HandshakeClientBuilder<HandshakeConfig> {
    /// Builds the `HandshakeClient` in the `Start` state with a fresh challenge.
    ///
    /// Returns an error if the configuration is not usable with the registry.
    ///
    /// 构建处于 `Start` 状态并带有新挑战值的 `HandshakeClient`。
    ///
    /// 如果配置无法与注册表配合使用，则返回错误。
    pub fn build(self) -> Result<HandshakeClient> {
        let registry = self.registry.unwrap_or_default();
        self.config.validate(&registry)?;
        Ok(HandshakeClient {
            core: SessionCore::new(Role::Client, self.config, registry),
        })
    }
}
