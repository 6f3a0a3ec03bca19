use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clubgate::telemetry::{self, LOG_LEVELS, LogFormat};
use clubgate::{
    Dispatcher, EventFormat, Roster, RunReport, StdoutSink, Venue, VenueConfig, VenueError,
};

const USAGE: &str = "\
Usage: clubgate <roster> [options]

Arguments:
  <roster>               Patron file: 'id tag delay residency' records (tag F/P or M/C)

Options:
  --ratio <n>            Constrained patrons licensed per Primary patron [default: 3]
  --tick-ms <ms>         Length of one delay/residency tick [default: 1000]
  --snapshots            Emit occupancy snapshots with the event stream
  --format <fmt>         Event stream format: text or json [default: text]
  --log-level <level>    trace, debug, info, warn, error or off [default: info]
  --log-format <fmt>     Diagnostic log format: text or json [default: text]";

#[derive(Debug)]
struct Options {
    roster: PathBuf,
    config: VenueConfig,
    format: EventFormat,
    log_level: String,
    log_format: LogFormat,
}

#[derive(Debug)]
enum Command {
    Run(Options),
    Help,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let options = match parse_args(&args) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("{USAGE}");
            process::exit(e.exit_code());
        }
    };

    telemetry::init_tracing(&options.log_level, options.log_format);
    tracing::info!("clubgate {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(options).await {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }
}

fn parse_args(args: &[String]) -> Result<Command, VenueError> {
    let mut roster: Option<PathBuf> = None;
    let mut config = VenueConfig::new();
    let mut format = EventFormat::Text;
    let mut log_level = "info".to_string();
    let mut log_format = LogFormat::Text;

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        match args[i].as_str() {
            "--ratio" => {
                i += 1;
                config.ratio = parse_number(args.get(i), "--ratio")?;
            }
            "--tick-ms" => {
                i += 1;
                config.tick = Duration::from_millis(parse_number(args.get(i), "--tick-ms")?);
            }
            "--snapshots" => config.snapshots = true,
            "--format" => {
                i += 1;
                format = match value(args.get(i), "--format")? {
                    "text" => EventFormat::Text,
                    "json" => EventFormat::Json,
                    other => return Err(invalid("--format", other)),
                };
            }
            "--log-level" => {
                i += 1;
                let level = value(args.get(i), "--log-level")?;
                if !LOG_LEVELS.contains(&level) {
                    return Err(invalid("--log-level", level));
                }
                log_level = level.to_string();
            }
            "--log-format" => {
                i += 1;
                log_format = match value(args.get(i), "--log-format")? {
                    "text" => LogFormat::Text,
                    "json" => LogFormat::Json,
                    other => return Err(invalid("--log-format", other)),
                };
            }
            "--help" | "-h" => return Ok(Command::Help),
            arg if arg.starts_with("--") => {
                return Err(VenueError::Config(format!("unknown flag: {arg}")));
            }
            arg => {
                if roster.is_some() {
                    return Err(VenueError::Config(format!("unexpected argument: {arg}")));
                }
                roster = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    let roster = roster.ok_or_else(|| {
        VenueError::Config("missing required argument: <roster>".to_string())
    })?;
    config.validate()?;

    Ok(Command::Run(Options {
        roster,
        config,
        format,
        log_level,
        log_format,
    }))
}

fn value<'a>(arg: Option<&'a String>, flag: &str) -> Result<&'a str, VenueError> {
    arg.map(String::as_str)
        .ok_or_else(|| VenueError::Config(format!("{flag} requires a value")))
}

fn parse_number<T: std::str::FromStr>(arg: Option<&String>, flag: &str) -> Result<T, VenueError> {
    let raw = value(arg, flag)?;
    raw.parse().map_err(|_| invalid(flag, raw))
}

fn invalid(flag: &str, value: &str) -> VenueError {
    VenueError::Config(format!("invalid value for {flag}: '{value}'"))
}

async fn run(options: Options) -> Result<RunReport, VenueError> {
    let roster = Roster::load(&options.roster, options.config.max_patrons)?;
    roster.log();

    let venue = Venue::provision(&options.config)?;
    let sink = Arc::new(StdoutSink::new(options.format));
    let dispatcher = Dispatcher::new(venue, sink, options.config);

    let report = dispatcher.run(roster.patrons()).await;
    match serde_json::to_string(&report) {
        Ok(json) => tracing::info!(report = %json, "Run complete"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize run report"),
    }
    Ok(report)
}
