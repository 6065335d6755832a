//! Damage analysis engine.
//!
//! Admission-control and dispatch service in front of an object-detection
//! runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 DAMAGE ENGINE                     │
//!   Gateway request    │  ┌────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│ security │──▶│    dispatch    │  │
//!                      │  │ server │   │auth + rl │   │ per-path loop  │  │
//!                      │  └────────┘   └──────────┘   └───────┬────────┘  │
//!                      │                                      │           │
//!                      │                      ┌───────────────┴───────┐   │
//!                      │                      ▼                       ▼   │
//!                      │              ┌──────────────┐       ┌──────────┐ │
//!                      │              │ model adapter│       │heuristic │ │
//!                      │              └──────┬───────┘       └──────────┘ │
//!                      └─────────────────────┼────────────────────────────┘
//!                                            ▼
//!                                   detection runtime
//! ```

use damage_engine::config;
use damage_engine::lifecycle;
use damage_engine::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging comes up first so configuration warnings are not lost.
    let level = std::env::var("ENGINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    logging::init_tracing(&level);

    let config = config::load_from_env()?;

    tracing::info!("damage-engine v{} starting", env!("CARGO_PKG_VERSION"));

    lifecycle::run(config).await?;
    Ok(())
}
