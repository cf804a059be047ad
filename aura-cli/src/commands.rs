//! Wiring config into the swarm and running one-shot commands.

use crate::cli::{Command, PermissionsCommand};
use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::Report;
use aura_agents::{analyze, AgentRegistry};
use aura_nlp::{suggest, HttpRemoteClassifier, IntentClassifier};
use aura_orchestrator::{Delimited, DispatchOutcome, HttpBackend, Orchestrator, SwarmStatus};
use aura_storage::{MemoryStore, RestStore, RestStoreConfig, SwarmStore};
use std::sync::Arc;

/// Everything a one-shot command needs.
pub struct App {
    orchestrator: Orchestrator,
    classifier: IntentClassifier,
}

impl App {
    /// Build the swarm from config and reload any stored state.
    pub async fn connect(config: &CliConfig) -> Result<Self, CliError> {
        let store: Arc<dyn SwarmStore> = match &config.store {
            Some(store) => Arc::new(RestStore::new(&RestStoreConfig {
                base_url: store.base_url.clone(),
                api_key: store.api_key.clone(),
                request_timeout_ms: config.request_timeout_ms,
            })?),
            None => Arc::new(MemoryStore::new()),
        };
        let registry = Arc::new(AgentRegistry::new(store));
        let backend = HttpBackend::new(&config.api_base_url, config.request_timeout())
            .map_err(CliError::aura)?;
        let orchestrator = Orchestrator::new(Arc::new(backend), registry)
            .with_task_timeout(config.task_timeout());
        if let Err(e) = orchestrator.rehydrate().await {
            tracing::warn!(error = %e, "Failed to rehydrate swarm state; starting empty");
        }

        let remote = HttpRemoteClassifier::new(&config.api_base_url, config.classifier_timeout())
            .map_err(CliError::aura)?;
        let classifier = IntentClassifier::new()
            .with_remote(Arc::new(remote))
            .with_threshold(config.confidence_threshold)
            .with_remote_timeout(config.classifier_timeout());

        Ok(Self::from_parts(orchestrator, classifier))
    }

    pub fn from_parts(orchestrator: Orchestrator, classifier: IntentClassifier) -> Self {
        Self {
            orchestrator,
            classifier,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run a non-interactive command. Agent writes still queued for the store
    /// are flushed before returning, whatever the outcome.
    pub async fn run(self, command: Command) -> Result<Report, CliError> {
        let registry = self.orchestrator.registry().clone();
        let result = self.dispatch(command).await;
        registry.flush_store().await;
        result
    }

    async fn dispatch(mut self, command: Command) -> Result<Report, CliError> {
        let registry = self.orchestrator.registry().clone();
        let report = match command {
            Command::Exec { words } => {
                let text = words.join(" ");
                let intent = self
                    .classifier
                    .classify(&text)
                    .await
                    .map_err(CliError::aura)?;
                tracing::info!(
                    action = %intent.action,
                    confidence = intent.confidence,
                    "Classified command"
                );
                Report::Dispatch(self.orchestrator.execute(&intent).await?)
            }
            Command::Deploy {
                file,
                backend,
                shots,
            } => {
                let response = self.orchestrator.deploy(&file, &backend, shots).await?;
                Report::Dispatch(DispatchOutcome::Deployed { response })
            }
            Command::Spawn {
                specialization,
                name,
                trust,
            } => Report::Agent(registry.spawn(name, &specialization, trust).await?),
            Command::Agents { all } => Report::Agents(registry.list(all).await),
            Command::Status => Report::Status(
                SwarmStatus::fetch(self.orchestrator.backend().as_ref(), &registry).await,
            ),
            Command::Suggest { partial } => Report::Suggestions(suggest(&partial.join(" "))),
            Command::Coordinate {
                goal,
                agents,
                split,
            } => {
                if split {
                    self.orchestrator = self.orchestrator.with_decomposer(Arc::new(Delimited));
                }
                Report::Coordination(self.orchestrator.coordinate_multi_agent(&goal, &agents).await?)
            }
            Command::Insights { agent } => {
                let entries = match agent {
                    Some(id) => registry.activity().for_agent(id).await,
                    None => registry.activity().entries().await,
                };
                Report::Insights(analyze(&entries))
            }
            Command::Permissions { command } => {
                let permissions = self.orchestrator.permissions();
                match command {
                    PermissionsCommand::List { pending } => Report::Permissions(if pending {
                        permissions.pending().await
                    } else {
                        permissions.list().await
                    }),
                    PermissionsCommand::Request {
                        agent,
                        action,
                        resource,
                        reason,
                    } => Report::Permission(
                        permissions.request(agent, &action, &resource, &reason).await?,
                    ),
                    PermissionsCommand::Decide { request, decision } => {
                        Report::Permission(permissions.decide(request, decision).await?)
                    }
                }
            }
            Command::Monitor => {
                return Err(CliError::Failed(
                    "monitor streams to the terminal and cannot run as a one-shot command".to_string(),
                ))
            }
        };
        Ok(report)
    }
}
