//! A standalone Pairlink relay backed by the in-memory store.
//!
//! ```text
//! cargo run -p relay-server -- 0.0.0.0:8080
//! PAIRLINK_BIND=0.0.0.0:9000 RUST_LOG=pairlink=debug cargo run -p relay-server
//! ```
//!
//! Sessions live only as long as the process.

use std::sync::Arc;

use pairlink::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no address is given on the command line.
const BIND_ENV: &str = "PAIRLINK_BIND";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig {
        bind_addr: bind_addr(std::env::args().nth(1), std::env::var(BIND_ENV).ok()),
        ..ServerConfig::default()
    };
    tracing::info!(addr = %config.bind_addr, "starting relay");

    let server = RelayServer::builder()
        .config(config)
        .build(Arc::new(MemoryStore::new()))
        .await?;

    server.run().await?;
    Ok(())
}

/// Picks the bind address: command line first, then environment, then the
/// library default.
fn bind_addr(arg: Option<String>, env: Option<String>) -> String {
    let given = |addr: &String| !addr.trim().is_empty();
    arg.filter(given)
        .or_else(|| env.filter(given))
        .unwrap_or_else(|| ServerConfig::default().bind_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_prefers_argument() {
        let addr = bind_addr(Some("0.0.0.0:1".into()), Some("0.0.0.0:2".into()));
        assert_eq!(addr, "0.0.0.0:1");
    }

    #[test]
    fn test_bind_addr_falls_back_to_env() {
        assert_eq!(bind_addr(None, Some("0.0.0.0:2".into())), "0.0.0.0:2");
    }

    #[test]
    fn test_bind_addr_defaults_when_unset() {
        assert_eq!(bind_addr(None, None), "127.0.0.1:8080");
        assert_eq!(bind_addr(Some("  ".into()), None), "127.0.0.1:8080");
    }
}
