use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tsh",
    version,
    about = "Interactive shell with parallel mv and cp for large directory trees",
    long_about = "`tsh` reads commands from standard input, one per line.

COMMANDS:
    mv [-r | -rt | -s] [-i] [-b] <source> <destination>
    cp [-r | -rt | -s] [-i] [-b] <source> <destination>
    exit

Run `mv --help` or `cp --help` inside the shell for details.

EXAMPLE:
    # Copy a tree with one task per subdirectory and a complete error report
    echo 'cp -rt /path/to/src /path/to/dst' | tsh"
)]
struct Args {
    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Performance & throttling
    /// Maximum number of open files, 0 means no limit, leaving unspecified means using 80% of max open files system limit
    #[arg(long, value_name = "N", help_heading = "Performance & throttling")]
    max_open_files: Option<usize>,

    /// Maximum number of directories processed concurrently by -r and -rt, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Performance & throttling"
    )]
    max_active_dirs: usize,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let throttle = common::ThrottleConfig {
        max_open_files: args.max_open_files,
        max_active_dirs: args.max_active_dirs,
    };
    common::init_tracing(&output)?;
    let runtime = common::build_runtime(&runtime)?;
    common::apply_throttle(&throttle)?;
    let interactive = std::io::stdin().is_terminal();
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout().lock();
    let shell = tsh::Shell::new(runtime, &mut input, &mut output);
    if interactive {
        shell.with_prompt("tsh> ").run()
    } else {
        shell.run()
    }
}
