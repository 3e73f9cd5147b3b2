use anyhow::{Context, Result};

use crate::commands::{self, Terminal};

const DRAIN_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// Read-eval-print loop understanding `mv`, `cp` and `exit`.
pub struct Shell<'a> {
    runtime: tokio::runtime::Runtime,
    terminal: Terminal<'a>,
    prompt: Option<&'static str>,
}

impl<'a> Shell<'a> {
    pub fn new(
        runtime: tokio::runtime::Runtime,
        input: &'a mut dyn std::io::BufRead,
        output: &'a mut dyn std::io::Write,
    ) -> Self {
        Self {
            runtime,
            terminal: Terminal { input, output },
            prompt: None,
        }
    }

    /// Prints `prompt` before reading each command.
    #[must_use]
    pub fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = Some(prompt);
        self
    }

    fn read_command(&mut self) -> Result<Option<String>> {
        if let Some(prompt) = self.prompt {
            write!(self.terminal.output, "{prompt}").context("failed writing prompt")?;
            self.terminal
                .output
                .flush()
                .context("failed writing prompt")?;
        }
        let mut line = String::new();
        let read = self
            .terminal
            .input
            .read_line(&mut line)
            .context("failed reading command")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Executes one command line, returns `false` once the shell should stop.
    pub fn eval(&mut self, line: &str) -> Result<bool> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(true);
        };
        tracing::debug!("command: {:?} {:?}", command, args);
        match command {
            "exit" => return Ok(false),
            "mv" => commands::run(
                &self.runtime,
                common::Operation::Move,
                args,
                &mut self.terminal,
            )?,
            "cp" => commands::run(
                &self.runtime,
                common::Operation::Copy,
                args,
                &mut self.terminal,
            )?,
            _ => writeln!(self.terminal.output, "Command not recognized: {command}")
                .context("failed writing to output")?,
        }
        Ok(true)
    }

    /// Runs until `exit` or end of input, then waits for background transfers.
    pub fn run(mut self) -> Result<()> {
        while let Some(line) = self.read_command()? {
            if !self.eval(&line)? {
                break;
            }
        }
        let pending = common::progress::detached_pending();
        if pending > 0 {
            tracing::info!("waiting for {} background transfers", pending);
            self.runtime
                .block_on(common::fanout::wait_detached(DRAIN_INTERVAL));
        }
        Ok(())
    }
}
