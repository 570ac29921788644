//! Operator input: the interactive prompt and a scripted stand-in.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::error::{ConsoleError, Result};
use crate::transport::{read_raw_line, trim_line_ending};

/// Source of operator command lines
#[async_trait]
pub trait Operator: Send {
    /// Show `prompt` and wait for one line; `None` once input is exhausted
    async fn next_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive operator reading from a terminal-like stream
pub struct PromptOperator<R, W> {
    input: BufReader<R>,
    output: W,
}

/// The operator at the process's own terminal
pub type StdinOperator = PromptOperator<Stdin, Stdout>;

impl StdinOperator {
    pub fn stdin() -> Self {
        PromptOperator::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> PromptOperator<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: BufReader::new(input),
            output,
        }
    }
}

#[async_trait]
impl<R, W> Operator for PromptOperator<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.output
            .write_all(prompt.as_bytes())
            .await
            .map_err(ConsoleError::OutputError)?;
        self.output.flush().await.map_err(ConsoleError::OutputError)?;

        let line = read_raw_line(&mut self.input)
            .await
            .map_err(ConsoleError::InputError)?;
        Ok(line.map(|l| trim_line_ending(&l).to_string()))
    }
}

/// Operator that replays a fixed list of lines without prompting
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    lines: VecDeque<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn next_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}
