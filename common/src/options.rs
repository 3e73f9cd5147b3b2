use clap::Parser;

use crate::entry::Operation;
use crate::error::Error;

/// How a directory source is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// No recursion flag: `mv` renames the source as a whole, `cp` walks it sequentially.
    Native,
    /// Depth-first walk on the calling task.
    Sequential,
    /// Fire-and-forget fan-out, the caller does not wait for subdirectories.
    Detached,
    /// Single-dispatch fan-out, the caller waits for the whole tree.
    Blocking,
}

impl TraversalMode {
    /// Name printed before a recursive transfer starts.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        match self {
            TraversalMode::Native => None,
            TraversalMode::Sequential => Some("Sequential Recursion"),
            TraversalMode::Detached => Some("Normal Recursion"),
            TraversalMode::Blocking => Some("Threaded Recursion"),
        }
    }
}

/// Flags and positionals accepted by `mv` and `cp`.
///
/// `-rt` is the short flags `-r` and `-t` combined.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    disable_version_flag = true,
    after_help = "Without -r the source is renamed (mv) or copied sequentially (cp).
-r returns once the top-level directory is done, subdirectories keep going in the
background and their errors are only logged. Use -rt when you need a complete report."
)]
pub struct TransferOptions {
    /// Recurse into subdirectories concurrently without waiting for them
    #[arg(short = 'r')]
    pub recursive: bool,

    /// With -r: wait for every subdirectory and report all errors
    #[arg(short = 't', requires = "recursive")]
    pub threaded: bool,

    /// Recurse into subdirectories one at a time
    #[arg(short = 's', conflicts_with = "recursive")]
    pub sequential: bool,

    /// Ask for confirmation once the transfer is done
    #[arg(short = 'i')]
    pub interactive: bool,

    /// Copy the destination to <DESTINATION>.bak afterwards
    #[arg(short = 'b')]
    pub backup: bool,

    /// Source path
    pub source: Option<String>,

    /// Destination path, a trailing slash places the source inside it
    pub destination: Option<String>,
}

/// Outcome of parsing a command line.
#[derive(Debug)]
pub enum Parsed {
    Options(TransferOptions),
    /// Help was requested, the rendered text is ready to be printed.
    Help(String),
}

impl TransferOptions {
    /// Parses the arguments following the command name.
    pub fn parse_args<I, T>(operation: Operation, args: I) -> Result<Parsed, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let argv = std::iter::once(std::ffi::OsString::from(operation.command()))
            .chain(args.into_iter().map(Into::into));
        match TransferOptions::try_parse_from(argv) {
            Ok(options) => Ok(Parsed::Options(options)),
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayHelp => {
                Ok(Parsed::Help(error.render().to_string()))
            }
            Err(error) => Err(Error::InvalidArgument(
                error.render().to_string().trim_end().to_string(),
            )),
        }
    }

    #[must_use]
    pub fn mode(&self) -> TraversalMode {
        match (self.recursive, self.threaded, self.sequential) {
            (true, true, _) => TraversalMode::Blocking,
            (true, false, _) => TraversalMode::Detached,
            (false, _, true) => TraversalMode::Sequential,
            (false, _, false) => TraversalMode::Native,
        }
    }

    /// Source and destination, both are required.
    pub fn paths(&self, operation: Operation) -> Result<(&str, &str), Error> {
        match (&self.source, &self.destination) {
            (Some(source), Some(destination)) => Ok((source, destination)),
            _ => Err(Error::InvalidArgument(format!(
                "{} command requires source and destination paths.",
                operation.command()
            ))),
        }
    }
}
