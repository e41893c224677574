//! Prompt/response loop over line-oriented input and output
//!
//! The loop has two states. It starts in `AwaitingInput`, prints the prompt
//! and reads one line. `exit` (any case) or end of input moves it to
//! `Terminated`; every other line, the empty line included, runs one turn and
//! comes back for the next line. A turn error stops the loop and is returned.

use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

use crate::app::App;
use crate::error::ChatError;
use crate::runner::{RunEvent, RunResult};

pub const PROMPT: &str = "Enter your question (or type 'exit' to quit):";
pub const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Terminated,
}

/// How answers are dispatched and printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Wait for the full answer, print it after `Assistant: `
    #[default]
    Blocking,
    /// Print text fragments as they arrive
    Streaming,
}

/// True when `line` ends the session
///
/// Only the exact word matches; surrounding whitespace makes it a question.
pub fn is_exit(line: &str) -> bool {
    line.to_lowercase() == EXIT_COMMAND
}

pub struct ChatLoop<R, W> {
    input: R,
    output: W,
    state: LoopState,
    turns: usize,
}

impl<R, W> ChatLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            state: LoopState::AwaitingInput,
            turns: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Prompt and read the next question
    ///
    /// Returns `None` (and terminates) on `exit` or end of input.
    pub async fn next_input(&mut self) -> Result<Option<String>, ChatError> {
        if self.state == LoopState::Terminated {
            return Ok(None);
        }

        self.output.write_all(PROMPT.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            debug!("Input closed");
            self.state = LoopState::Terminated;
            return Ok(None);
        }

        // Strip the line terminator only
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line.as_str());
        if is_exit(line) {
            self.state = LoopState::Terminated;
            return Ok(None);
        }
        Ok(Some(line.to_string()))
    }

    /// Run turns until `exit`, end of input, or the first error
    pub async fn run(&mut self, app: &App) -> Result<usize, ChatError> {
        while let Some(input) = self.next_input().await? {
            debug!("Turn {}: {} chars of input", self.turns + 1, input.len());
            if let Err(e) = app.run_turn(&input, &mut self.output).await {
                error!("Turn failed: {}", e);
                self.state = LoopState::Terminated;
                return Err(e);
            }
            self.turns += 1;
        }
        info!("Chat loop finished after {} turns", self.turns);
        Ok(self.turns)
    }
}

/// Print a blocking answer followed by a blank line
pub async fn render_answer<W>(output: &mut W, result: &RunResult) -> Result<(), ChatError>
where
    W: AsyncWrite + Unpin,
{
    output
        .write_all(format!("Assistant: {}\n\n", result.final_output).as_bytes())
        .await?;
    output.flush().await?;
    Ok(())
}

/// Write every text fragment as soon as it arrives
///
/// Non-text events are skipped. The stream is drained completely.
pub async fn render_stream<S, W>(output: &mut W, events: S) -> Result<(), ChatError>
where
    S: Stream<Item = Result<RunEvent, ChatError>>,
    W: AsyncWrite + Unpin,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(text) = event.text_delta() {
            output.write_all(text.as_bytes()).await?;
            output.flush().await?;
        }
    }
    Ok(())
}
