//! Command-line arguments.

use aura_core::{AgentId, Decision, PermissionRequestId, DEFAULT_TRUST};
use aura_orchestrator::{DEFAULT_BACKEND, DEFAULT_SHOTS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aura-swarm")]
#[command(version, about = "Natural-language control of the AURA agent swarm")]
pub struct Cli {
    /// Path to a TOML config file (falls back to AURA_SWARM_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a free-text command and dispatch it
    Exec {
        /// The command, e.g. `deploy organism.dna to ibm_fez with 4096 shots`
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Deploy an organism artifact
    Deploy {
        file: PathBuf,

        #[arg(short, long, default_value = DEFAULT_BACKEND)]
        backend: String,

        #[arg(short, long, default_value_t = DEFAULT_SHOTS)]
        shots: u64,
    },

    /// Spawn a new agent
    Spawn {
        /// quantum, code, optimization, security, ... (blank means general)
        #[arg(default_value = "")]
        specialization: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_TRUST)]
        trust: f64,
    },

    /// List agents (busy ones only unless --all)
    Agents {
        #[arg(short, long)]
        all: bool,
    },

    /// Show swarm status
    Status,

    /// Stream live metrics until q/Esc/Ctrl-C
    Monitor,

    /// Suggest example commands matching partial input
    Suggest {
        #[arg(num_args = 0..)]
        partial: Vec<String>,
    },

    /// Split a goal into subtasks and run them across agents
    Coordinate {
        goal: String,

        /// Agent to use (repeatable). Without any, a general agent is selected.
        #[arg(short, long = "agent")]
        agents: Vec<AgentId>,

        /// Split the goal on `;` and newlines instead of running it whole
        #[arg(long)]
        split: bool,
    },

    /// Summarize the activity log
    Insights {
        /// Restrict to one agent
        #[arg(short, long)]
        agent: Option<AgentId>,
    },

    /// Manage permission requests
    Permissions {
        #[command(subcommand)]
        command: PermissionsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum PermissionsCommand {
    /// List permission requests
    List {
        #[arg(short, long)]
        pending: bool,
    },

    /// Open a request on behalf of an agent
    Request {
        agent: AgentId,
        action: String,

        #[arg(short, long, default_value = "")]
        resource: String,

        #[arg(long, default_value = "Requested by operator")]
        reason: String,
    },

    /// Approve or deny a pending request
    Decide {
        request: PermissionRequestId,
        /// approve or deny
        decision: Decision,
    },
}
