//! Boundary traits through which the scheduler reaches configuration and
//! command handling without depending on their concrete modules directly
//! (spec.md §4.I). Command *handling* itself — parsing admin chat commands
//! into actions — is out of scope here; these traits only describe the
//! shape the scheduler needs at its edges.

use async_trait::async_trait;

use crate::config::store::ConfigError;
use crate::config::types::Config;

#[async_trait(?Send)]
pub trait ConfigGateway {
    async fn snapshot(&self) -> Config;
    async fn reload(&self, new_config: Config) -> Result<(), ConfigError>;
}

#[async_trait(?Send)]
impl ConfigGateway for crate::config::store::ConfigStore {
    async fn snapshot(&self) -> Config {
        self.snapshot().await
    }
    async fn reload(&self, new_config: Config) -> Result<(), ConfigError> {
        self.reload(new_config).await
    }
}

/// Outcome of dispatching one admin command, reported back to whichever
/// surface (chat, HTTP API) originated it.
pub enum CommandOutcome {
    Text(String),
    NoReply,
}

#[async_trait(?Send)]
pub trait CommandGateway {
    async fn dispatch(&self, command: crate::commands::Command, requester: &str) -> CommandOutcome;
}
