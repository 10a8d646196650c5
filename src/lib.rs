pub mod catalog;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod guardrails;
pub mod http;
pub mod params;
pub mod pipeline;
pub mod renderer;
pub mod scoring;
pub mod server;
pub mod suggestions;
pub mod telemetry;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
