//! Console runner: reads one command per line and prints each result.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use schemadb::Database;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read commands from this file instead of standard input
    script: Option<PathBuf>,

    /// Do not print the `> ` prompt
    #[arg(long)]
    no_prompt: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let (input, prompt): (Box<dyn BufRead>, bool) = match &args.script {
        Some(path) => {
            info!(path = %path.display(), "reading commands from file");
            (Box::new(BufReader::new(File::open(path)?)), false)
        }
        None => (Box::new(io::stdin().lock()), !args.no_prompt),
    };

    run(input, prompt)?;
    Ok(())
}

fn init_tracing(level: &str) -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Runs commands until `exit` or end of input. A failing command is reported
/// and the session goes on.
fn run(input: impl BufRead, prompt: bool) -> io::Result<()> {
    let mut db = Database::new();
    let mut stdout = io::stdout().lock();
    let mut lines = input.lines();

    loop {
        if prompt {
            write!(stdout, "> ")?;
            stdout.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let command = line.trim();

        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case("exit") {
            break;
        }

        match db.execute(command) {
            Ok(output) => writeln!(stdout, "{output}")?,
            Err(e) => {
                warn!(kind = ?e.kind(), "command rejected: {e}");
                eprintln!("Error: {e}");
            }
        }
    }

    Ok(())
}
