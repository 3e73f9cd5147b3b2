use anyhow::{Context, Result};

use common::{Operation, Parsed, TransferOptions, TransferRequest, TraversalMode};

struct Wording {
    noun: &'static str,
    past: &'static str,
    progressive: &'static str,
}

fn wording(operation: Operation) -> Wording {
    match operation {
        Operation::Move => Wording {
            noun: "Move",
            past: "moved",
            progressive: "moving",
        },
        Operation::Copy => Wording {
            noun: "Copy",
            past: "copied",
            progressive: "copying",
        },
    }
}

fn describe(error: &common::Error) -> String {
    match error.path() {
        Some(path) => format!("{}: {}", path.display(), error.reason()),
        None => error.reason(),
    }
}

/// Input and output of the shell, shared by every command.
pub struct Terminal<'a> {
    pub input: &'a mut dyn std::io::BufRead,
    pub output: &'a mut dyn std::io::Write,
}

impl Terminal<'_> {
    fn say(&mut self, line: impl std::fmt::Display) -> Result<()> {
        writeln!(self.output, "{line}").context("failed writing to output")
    }
}

const DRAIN_INTERVAL: std::time::Duration = std::time::Duration::from_millis(20);

async fn backup_destination(destination: &std::path::Path) -> Result<(), String> {
    match common::backup::backup(destination).await {
        Ok(report) => match report.failures.first() {
            None => Ok(()),
            Some(error) => Err(describe(error)),
        },
        Err(error) => Err(error.reason()),
    }
}

/// Runs `mv` or `cp` with the arguments following the command name.
///
/// Every transfer problem is printed, only failing to talk to the terminal is an error.
pub fn run(
    runtime: &tokio::runtime::Runtime,
    operation: Operation,
    args: &[&str],
    terminal: &mut Terminal<'_>,
) -> Result<()> {
    let words = wording(operation);
    let options = match TransferOptions::parse_args(operation, args) {
        Ok(Parsed::Options(options)) => options,
        Ok(Parsed::Help(help)) => {
            write!(terminal.output, "{help}").context("failed writing to output")?;
            return Ok(());
        }
        Err(error) => return terminal.say(error),
    };
    let request = match runtime.block_on(TransferRequest::new(operation, &options)) {
        Ok(request) => request,
        Err(error) => {
            tracing::error!("{}", &error);
            return terminal.say(error);
        }
    };
    // only tree walks are announced and timed
    let label = request.mode.label().filter(|_| request.is_recursive());
    if let Some(label) = label {
        terminal.say(label)?;
    }
    let report = runtime.block_on(common::execute(&request));
    tracing::info!("{} of {:?}: {}", operation, &request.source.path, &report);
    if label.is_some() {
        terminal.say(format!(
            "{} execution time: {} milliseconds",
            words.noun,
            report.total_elapsed.as_millis()
        ))?;
    }
    if !report.is_success() {
        for failure in &report.failures {
            terminal.say(format!("Error {} {}", words.progressive, describe(failure)))?;
        }
        terminal.say(format!(
            "{} finished with {} error(s)",
            words.noun,
            report.failures.len()
        ))?;
        return Ok(());
    }
    if request.interactive {
        let confirmed = common::gate::OverwriteGate::new(terminal.input, terminal.output)
            .confirm(&request.destination)?;
        if !confirmed {
            return terminal.say(format!("{} canceled.", words.noun));
        }
    }
    terminal.say(format!(
        "Successfully {} {} to {}",
        words.past,
        request.source.path.display(),
        request.destination.display()
    ))?;
    if request.mode == TraversalMode::Detached {
        let pending = common::progress::detached_pending();
        if pending > 0 {
            terminal.say(format!(
                "{pending} subdirectory transfer(s) still running in the background"
            ))?;
            if request.backup {
                // the backup must not snapshot a destination that is still being written
                runtime.block_on(common::fanout::wait_detached(DRAIN_INTERVAL));
            }
        }
    }
    if request.backup {
        let backup = common::backup::backup_path(&request.destination);
        match runtime.block_on(backup_destination(&request.destination)) {
            Ok(()) => terminal.say(format!(
                "Backup created for {} as {}",
                request.destination.display(),
                backup.display()
            ))?,
            Err(reason) => {
                terminal.say(format!("Error creating backup {}: {reason}", backup.display()))?;
            }
        }
    }
    Ok(())
}
