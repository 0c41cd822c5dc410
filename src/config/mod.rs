//! Configuration management for the MCP bridge.
//!
//! Runtime settings come from CLI flags with env fallbacks; capability
//! registrations (prompts, static resources, server identity) come from an
//! optional YAML manifest, mirroring config-driven registration.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::{DEFAULT_CONNECTION_TTL_SECS, DEFAULT_HEARTBEAT_SECS};

/// Command-line arguments for the bridge server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Model Context Protocol server over HTTP/SSE")]
pub struct Args {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "MCP_BRIDGE_BIND")]
    pub bind: String,

    /// HTTP port
    #[arg(short, long, default_value = "3000", env = "MCP_BRIDGE_PORT")]
    pub port: u16,

    /// Seconds between heartbeat frames on idle streams
    #[arg(long, default_value = "30", env = "MCP_HEARTBEAT_INTERVAL")]
    pub heartbeat_interval: u64,

    /// Seconds of inactivity before a connection is reclaimed
    #[arg(long, default_value = "300", env = "MCP_CONNECTION_TTL")]
    pub connection_ttl: u64,

    /// Seconds between registry sweeps
    #[arg(long, default_value = "60", env = "MCP_SWEEP_INTERVAL")]
    pub sweep_interval: u64,

    /// Path to a YAML manifest with prompt/resource registrations
    #[arg(short, long, env = "MCP_BRIDGE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_BRIDGE_DEBUG")]
    pub debug: bool,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address
    pub bind: String,
    /// HTTP port
    pub port: u16,
    /// Heartbeat interval in seconds
    pub heartbeat_interval: u64,
    /// Connection idle TTL in seconds
    pub connection_ttl: u64,
    /// Sweep interval in seconds
    pub sweep_interval: u64,
    /// Manifest path
    pub manifest: Option<PathBuf>,
    /// Debug mode
    pub debug: bool,
}

impl Config {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.connection_ttl)
    }

    pub fn sweep(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind: args.bind,
            port: args.port,
            heartbeat_interval: args.heartbeat_interval,
            connection_ttl: args.connection_ttl,
            sweep_interval: args.sweep_interval,
            manifest: args.manifest,
            debug: args.debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            heartbeat_interval: DEFAULT_HEARTBEAT_SECS,
            connection_ttl: DEFAULT_CONNECTION_TTL_SECS,
            sweep_interval: 60,
            manifest: None,
            debug: false,
        }
    }
}

// ===== Registration Manifest =====

/// Server identity advertised by `server.info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerIdentity {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_server_version")]
    pub version: String,
}

fn default_server_name() -> String {
    "MCP Bridge Server".to_string()
}

fn default_server_version() -> String {
    crate::VERSION.to_string()
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

/// A prompt registration: inline text, a file reference, or a full entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptEntry {
    Inline(String),
    File {
        file: PathBuf,
        #[serde(default)]
        description: Option<String>,
    },
    Full {
        content: String,
        #[serde(default)]
        description: Option<String>,
    },
}

/// A static resource registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub data: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
}

/// Config-driven capability registrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub server: Option<ServerIdentity>,
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptEntry>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceEntry>,
}

impl Manifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn identity(&self) -> ServerIdentity {
        self.server.clone().unwrap_or_default()
    }
}
