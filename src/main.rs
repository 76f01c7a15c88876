use std::{io::Read, path::PathBuf, process::ExitCode};

use dfa_workbench::{
    batch::{process_batch, BatchError},
    prelude::*,
    server,
    settings::{Settings, SettingsError},
};
use owo_colors::OwoColorize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{filter, prelude::*};

use clap::{Arg, ArgMatches, Command};

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not read from stdin: {0}")]
    Stdin(std::io::Error),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("could not write report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

fn file_arg() -> Arg {
    Arg::new("file")
        .value_parser(clap::value_parser!(PathBuf))
        .help("JSON file with a list of automata (or a single one), stdin if omitted")
}

fn cli() -> clap::Command {
    let cmd = Command::new("dfa-workbench")
        .about("Validate, run and draw deterministic finite automata")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .global(true)
                .num_args(0..=1)
                .require_equals(true)
                .value_parser(["info", "debug", "trace"])
                .default_missing_value("info"),
        )
        .args(Settings::args())
        .subcommand(
            Command::new("check")
                .about("validates the automata, runs their test strings and prints the report as JSON")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("table")
                .about("prints the transition table and the verdicts of every valid automaton")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("serve")
                .about("serves POST /process-automata over HTTP")
                .arg(Settings::bind_arg()),
        );

    #[cfg(feature = "random")]
    let cmd = cmd.subcommand(
        Command::new("sample")
            .about("runs random words through every valid automaton")
            .arg(file_arg().required(true))
            .arg(
                Arg::new("count")
                    .short('n')
                    .long("count")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("10"),
            )
            .arg(
                Arg::new("max-len")
                    .short('l')
                    .long("max-len")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("8"),
            )
            .arg(
                Arg::new("seed")
                    .long("seed")
                    .value_parser(clap::value_parser!(u64)),
            ),
    );

    cmd
}

fn setup_logging(matches: &ArgMatches) {
    let level = match matches
        .try_get_one::<String>("verbosity")
        .ok()
        .flatten()
        .map(|m| m.as_str())
    {
        Some("trace") => filter::LevelFilter::TRACE,
        Some("debug") => filter::LevelFilter::DEBUG,
        Some("info") => filter::LevelFilter::INFO,
        _ => filter::LevelFilter::WARN,
    };

    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log.with_filter(level))
        .init();

    trace!("setup {level} logging");
}

/// Reads a list of automata from the file given in `matches` or from stdin. A single
/// automaton is treated as a list with one element.
fn read_items(matches: &ArgMatches) -> Result<Vec<Value>, CliError> {
    let bytes = match matches.get_one::<PathBuf>("file") {
        Some(path) => {
            debug!("reading automata from {}", path.display());
            std::fs::read(path).map_err(|source| CliError::Read {
                path: path.display().to_string(),
                source,
            })?
        }
        None => {
            debug!("reading automata from stdin");
            let mut buf = vec![];
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .map_err(CliError::Stdin)?;
            buf
        }
    };

    match serde_json::from_slice::<Value>(&bytes).map_err(BatchError::NotJson)? {
        Value::Array(items) => Ok(items),
        item @ Value::Object(_) => Ok(vec![item]),
        _ => Err(BatchError::NotAList.into()),
    }
}

fn check(settings: &Settings, matches: &ArgMatches) -> Result<bool, CliError> {
    let items = read_items(matches)?;
    let reports = process_batch(&items, settings.renderer().as_ref());
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(reports.iter().all(|r| r.success))
}

fn verdict_table<'a>(verdicts: impl IntoIterator<Item = (&'a str, bool)>) -> String {
    let mut builder = tabled::builder::Builder::default();
    builder.push_record(["input", "accepted"]);
    for (input, accepted) in verdicts {
        let shown = if accepted {
            accepted.show().green().to_string()
        } else {
            accepted.show().red().to_string()
        };
        builder.push_record([[input].show(), shown]);
    }
    builder
        .build()
        .with(tabled::settings::Style::rounded())
        .to_string()
}

fn print_header(dfa: &Dfa) {
    let config = dfa.config();
    println!(
        "{} {} ({} states, {} symbols)",
        config.id().bold(),
        config.name().blue(),
        dfa.size(),
        config.alphabet().len()
    );
}

/// Validates every item, skipping the invalid ones with a warning.
fn valid_automata(items: &[Value]) -> Vec<Dfa> {
    items
        .iter()
        .filter_map(|item| match Validator.validate_value(item) {
            Ok(config) => Some(Dfa::new(config)),
            Err(e) => {
                let id = item.get("id").and_then(Value::as_str).unwrap_or("?");
                warn!("skipping {id}: {e}");
                println!("{} {}: {}", id.bold(), "invalid".red(), e);
                None
            }
        })
        .collect()
}

fn table(matches: &ArgMatches) -> Result<(), CliError> {
    let items = read_items(matches)?;
    for dfa in valid_automata(&items) {
        print_header(&dfa);
        println!("{}", dfa.transition_table());
        let verdicts = dfa
            .config()
            .test_strings()
            .iter()
            .map(|input| (input.as_str(), dfa.accepts_str(input)));
        println!("{}", verdict_table(verdicts));
    }
    Ok(())
}

#[cfg(feature = "random")]
fn sample(matches: &ArgMatches) -> Result<(), CliError> {
    use dfa_workbench::random::sample_verdicts;

    if let Some(seed) = matches.get_one::<u64>("seed") {
        fastrand::seed(*seed);
    }
    let count = matches.get_one::<usize>("count").copied().unwrap_or(10);
    let max_len = matches.get_one::<usize>("max-len").copied().unwrap_or(8);

    let items = read_items(matches)?;
    for dfa in valid_automata(&items) {
        print_header(&dfa);
        let verdicts = sample_verdicts(&dfa, count, max_len);
        println!(
            "{}",
            verdict_table(verdicts.iter().map(|v| (v.input.as_str(), v.accepted)))
        );
    }
    Ok(())
}

fn serve(settings: &Settings) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Serve)?;
    runtime
        .block_on(server::serve(settings))
        .map_err(CliError::Serve)
}

fn run(matches: &ArgMatches) -> Result<ExitCode, CliError> {
    let Some((name, sub_matches)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };
    let settings = Settings::from_matches(sub_matches);
    settings.install_thread_pool()?;

    match name {
        "check" => {
            let start = std::time::Instant::now();
            let all_succeeded = check(&settings, sub_matches)?;
            info!("checking took {}µs", start.elapsed().as_micros());
            Ok(if all_succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        "table" => table(sub_matches).map(|_| ExitCode::SUCCESS),
        "serve" => serve(&settings).map(|_| ExitCode::SUCCESS),
        #[cfg(feature = "random")]
        "sample" => sample(sub_matches).map(|_| ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}

pub fn main() -> ExitCode {
    let matches = cli().get_matches();

    setup_logging(&matches);

    match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
