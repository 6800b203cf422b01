//! ringshift - rotate a block-distributed array around a ring of ranks.
//!
//! Run with: RINGSHIFT_NP=4 ringshift <L> <SH>

mod console;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::Level;

use console::{ConsoleSource, Input};
use ringshift::{
    launch, render_rows, run_rank, shifted_title, Error, Exchange, Outcome, SequenceSource,
    ShiftConfig, Universe,
};

const ROOT: i32 = 0;

#[derive(Parser, Debug)]
#[command(name = "ringshift")]
#[command(author, version, about = "Rotate a block-distributed array around a ring of ranks", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Elements held by each rank
    block_len: usize,

    /// Shift factor; negative values shift toward lower indices
    shift: i64,

    /// Number of ranks (default: taken from the launch environment)
    #[arg(short = 'n', long = "np")]
    np: Option<i32>,

    /// Fill the array with 1, 2, 3, ... instead of prompting
    #[arg(short, long)]
    generate: bool,

    /// Do not wait for ENTER between the input and the result
    #[arg(long)]
    no_pause: bool,

    /// How neighbors pair their send and receive in each round
    #[arg(long, value_enum, default_value_t = ExchangeArg::Paired)]
    exchange: ExchangeArg,

    /// Reduce the shift modulo the global length before running rounds
    #[arg(long)]
    reduce_rounds: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExchangeArg {
    /// Nonblocking send posted before the receive
    Paired,
    /// Blocking exchange with one rank at the seam sending first
    SeamOrdered,
}

impl From<ExchangeArg> for Exchange {
    fn from(arg: ExchangeArg) -> Self {
        match arg {
            ExchangeArg::Paired => Exchange::Paired,
            ExchangeArg::SeamOrdered => Exchange::SeamOrdered,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_thread_names(true)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.code().clamp(1, 255) as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let size = cli.np.unwrap_or_else(launch::group_size_or_default);
    if cli.np.is_none() {
        if let Some(var) = launch::group_size_source() {
            tracing::debug!(size, var, "group size from launch environment");
        }
    }
    let universe = Universe::new(size)?;

    let config = ShiftConfig {
        exchange: cli.exchange.into(),
        reduce_rounds: cli.reduce_rounds,
        ..ShiftConfig::new(cli.block_len, cli.shift)
    };
    config.validate()?;

    let results = universe.run(|world| {
        let mut input = if world.rank() != ROOT {
            Input::Remote
        } else if cli.generate {
            Input::Sequence(SequenceSource::new())
        } else {
            Input::Console(ConsoleSource::new(io::stdin().lock(), io::stdout()))
        };
        run_rank(world, &config, ROOT, &mut input)
    });

    let outcome = first_failure(results)?;
    print_outcome(&outcome, cli.shift, !cli.no_pause)
        .map_err(|err| Error::Internal(format!("cannot write results: {err}")))
}

/// The root's outcome, or the error that brought the group down.
///
/// Ranks that only saw the abort echo it back; the rank that raised it is
/// reported instead.
fn first_failure(results: Vec<Result<Option<Outcome<i64>>, Error>>) -> Result<Outcome<i64>, Error> {
    let mut abort = None;
    let mut root = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Err(err) if err.is_abort() => {
                abort.get_or_insert(err);
            }
            Err(err) => return Err(err),
            Ok(outcome) if rank as i32 == ROOT => root = outcome,
            Ok(_) => {}
        }
    }
    if let Some(err) = abort {
        return Err(err);
    }
    root.ok_or_else(|| Error::Internal("root produced no outcome".into()))
}

fn print_outcome(outcome: &Outcome<i64>, shift: i64, pause: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "\n\n ******** RESULTS *********")?;
    writeln!(out, "Input array:")?;
    write!(out, "{}", render_rows(&outcome.input))?;

    if pause {
        write!(out, "\n\nPress ENTER for shift results:")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }

    writeln!(out, "\n\n{}", shifted_title(shift))?;
    write!(out, "{}", render_rows(&outcome.shifted))?;
    writeln!(out)?;
    out.flush()
}
