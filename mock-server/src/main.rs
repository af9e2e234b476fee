//! Serves a HAL rel chain for manual testing.
//!
//! `hal-mock-server one "cars[1]" "owners[name:kim]"` stubs `/`, `/1` and
//! `/2` so that following those rels from `/` lands on `/resource`.

use hal_mock_server::{MockState, Stub};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let state = MockState::default();
    let rels: Vec<String> = std::env::args().skip(1).collect();
    let paths = state.follow(&format!("http://{addr}"), rels.as_slice())?;
    state.stub("GET", "/resource", Stub::json(r#"{"name":"resource"}"#));

    tracing::info!(%addr, ?rels, ?paths, "listening");
    hal_mock_server::run(listener, state).await?;
    Ok(())
}
