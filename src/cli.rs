//! Command-line interface for opsroute
//!
//! Provides argument parsing and subcommand handling for the opsroute binary.

use clap::{Parser, Subcommand};

/// Provider health tracking and orchestration router for ITSM agents
#[derive(Parser)]
#[command(name = "opsroute")]
#[command(version)]
#[command(about = "Provider health tracking and orchestration router for ITSM agents")]
#[command(
    long_about = "opsroute keeps track of the health of local and cloud language-model \
    providers, routes agent decision requests to the best available one with a single \
    fallback attempt, and keeps an audit log of every decision."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# opsroute Configuration
# ======================
#
# Configures the HTTP server, health probing, orchestration limits, the
# decision log and the language-model providers agents can be routed to.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# HEALTH PROBING
# ─────────────────────────────────────────────────────────────────────────────
#
# Every provider is probed on its own schedule. A provider is:
#   - healthy:   last probe succeeded within slow_threshold_ms
#   - degraded:  last probe was slow, or it failed fewer than unhealthy_threshold times in a row
#   - unhealthy: unhealthy_threshold consecutive probe failures
#   - unknown:   not probed yet

[health]
interval_seconds = 30
# Must be less than interval_seconds
probe_timeout_seconds = 5
unhealthy_threshold = 3
slow_threshold_ms = 2000

# ─────────────────────────────────────────────────────────────────────────────
# ORCHESTRATION
# ─────────────────────────────────────────────────────────────────────────────

[orchestration]
# Upper bound for a single provider call; a timed-out call counts as a failure
# and triggers one attempt on the next best provider
timeout_seconds = 10

[decision_log]
# Decisions kept in memory; the oldest is evicted when full
capacity = 500

# ─────────────────────────────────────────────────────────────────────────────
# RECOMMENDED PAIRINGS (shown in the dashboard)
# ─────────────────────────────────────────────────────────────────────────────

[recommended.local]
provider = "ollama"
model = "llama2-7b"

[recommended.cloud]
provider = "openai"
model = "gpt-4o-mini"

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Declaration order is the final tiebreak when two providers are equally
# healthy and equally fast.
#
# Provider fields:
#   - name: unique identifier used in API calls
#   - kind: "ollama", "openai", "anthropic" or "mock"
#   - category: "local" or "cloud" (defaults by kind)
#   - base_url: API base URL without trailing slash (defaults by kind)
#   - models: supported model ids; default_model must be one of them
#   - api_key_env: environment variable holding the API key (cloud kinds)
#   - temperature: sampling temperature (0.0-2.0)
#   - max_tokens: generation limit

[[providers]]
name = "ollama"
kind = "ollama"
base_url = "http://localhost:11434"
models = ["llama2-7b", "mistral-7b"]
temperature = 0.7
max_tokens = 1024

[[providers]]
name = "openai"
kind = "openai"
models = ["gpt-4o-mini", "gpt-4o"]
api_key_env = "OPENAI_API_KEY"

[[providers]]
name = "anthropic"
kind = "anthropic"
models = ["claude-3-5-haiku-latest", "claude-3-5-sonnet-latest"]
api_key_env = "ANTHROPIC_API_KEY"

# Deterministic rule-based agent, always available
[[providers]]
name = "mock"
kind = "mock"
models = ["mock-agent"]

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
