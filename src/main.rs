//! Blocking front end: prints each full answer after `Assistant: `

use agent_chat::{cli, RenderMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(RenderMode::Blocking).await
}
