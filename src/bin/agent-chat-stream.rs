//! Streaming front end: prints answer fragments as they arrive

use agent_chat::{cli, RenderMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(RenderMode::Streaming).await
}
