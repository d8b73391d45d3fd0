//! Serves the mock endpoints for manual testing against a device or simulator.
//!
//! `MOCK_ADDR` overrides the bind address; the default stays on loopback.

use tokio::net::TcpListener;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let addr = std::env::var("MOCK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    println!("mock endpoints: http://{local}/json /text /empty /status/{{code}} /echo /upload /download/{{name}} /slow/{{millis}} /hits/{{key}}");
    mock_server::run(listener).await
}
