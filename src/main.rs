//! vocabdeck: command-line entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init the stderr logger (--log-level, then RUST_LOG, then config)
//!   4. Open the store and probe the remote index
//!   5. Run one command, or serve JSON requests on stdio

use std::path::{Path, PathBuf};
use std::process;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use vocabdeck::config;
use vocabdeck::envelope::Envelope;
use vocabdeck::error::AppError;
use vocabdeck::logger;
use vocabdeck::service::{Request, VocabService};
use vocabdeck::store::{ImportFormat, ListQuery};

#[tokio::main]
async fn main() {
    let args = parse_args();
    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

// ── CLI arg parsing ────────────────────────────────────────────────────────

struct Args {
    config: Option<PathBuf>,
    log_level: Option<String>,
    command: Option<String>,
    rest: Vec<String>,
}

fn parse_args() -> Args {
    let mut config = None;
    let mut log_level = None;
    let mut command = None;
    let mut rest = Vec::new();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = iter.next().map(PathBuf::from);
            }
            "--log-level" | "-l" => {
                log_level = iter.next();
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--" => {
                rest.extend(iter);
                break;
            }
            _ if command.is_none() => command = Some(arg),
            _ => rest.push(arg),
        }
    }

    Args { config, log_level, command, rest }
}

fn print_help() {
    eprintln!("usage: vocabdeck [--config <path>] [--log-level <level>] <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  status              store and remote index health");
    eprintln!("  list [category]     list vocabulary (remote index first, local fallback)");
    eprintln!("  search <text>       search the local store");
    eprintln!("  stats               overall learning progress");
    eprintln!("  import <file>       import vocabulary (.json or .csv)");
    eprintln!("  export <file>       export vocabulary (.json or .csv)");
    eprintln!("  backup <dest>       copy the store document to <dest>");
    eprintln!("  restore <src>       replace the store document with <src>");
    eprintln!("  serve               answer JSON requests on stdin, one per line");
    eprintln!();
    eprintln!("flags:");
    eprintln!("  --config, -c <path>   config file (default: {})", config::DEFAULT_CONFIG_PATH);
    eprintln!("  --log-level, -l <lvl> log level for this run (wins over RUST_LOG)");
    eprintln!("  --help,   -h          print this help");
    eprintln!();
    eprintln!("environment:");
    eprintln!("  VOCABDECK_DATA_DIR, VOCABDECK_LOG_LEVEL, VOCABDECK_REMOTE_URL, RUST_LOG");
}

fn required<'a>(rest: &'a [String], usage: &str) -> Result<&'a str, AppError> {
    rest.first()
        .map(String::as_str)
        .ok_or_else(|| AppError::Config(format!("usage: vocabdeck {usage}")))
}

// ── Commands ───────────────────────────────────────────────────────────────

/// Returns whether the command succeeded.
async fn run(args: Args) -> Result<bool, AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load(args.config.as_deref())?;
    let filter_origin = logger::init_stderr(&config, args.log_level.as_deref())?;
    info!(
        app = %config.app_name,
        log_filter = ?filter_origin,
        data_dir = %config.data_dir.display(),
        store = %config.store.kind,
        remote = config.remote.enabled,
        "config loaded"
    );

    let Some(command) = args.command else {
        print_help();
        return Ok(false);
    };

    let mut service = VocabService::open(&config).await?;

    let request = match command.as_str() {
        "serve" => {
            serve(&mut service).await?;
            service.close();
            return Ok(true);
        }
        "status" => Request::Health,
        "info" => Request::StoreInfo,
        "list" => Request::GetAllVocabulary(ListQuery {
            category: args.rest.first().cloned(),
            ..Default::default()
        }),
        "search" => Request::SearchVocabulary {
            query: required(&args.rest, "search <text>")?.to_string(),
        },
        "stats" => Request::GetOverallProgress,
        "import" => {
            let path = Path::new(required(&args.rest, "import <file>")?);
            let payload = std::fs::read_to_string(path)?;
            Request::ImportVocabulary { payload, format: ImportFormat::from_path(path) }
        }
        "export" => {
            let path = PathBuf::from(required(&args.rest, "export <file>")?);
            return export(&mut service, &path).await;
        }
        "backup" => Request::Backup {
            destination: PathBuf::from(required(&args.rest, "backup <dest>")?),
        },
        "restore" => Request::Restore {
            source: PathBuf::from(required(&args.rest, "restore <src>")?),
        },
        other => {
            return Err(AppError::Config(format!(
                "unknown command: {other}\n  run 'vocabdeck --help' for usage"
            )));
        }
    };

    let envelope = service.handle(request).await?;
    print_envelope(&envelope);
    service.close();
    Ok(envelope.success)
}

async fn export(service: &mut VocabService, path: &Path) -> Result<bool, AppError> {
    let format = ImportFormat::from_path(path);
    let envelope = service
        .handle(Request::ExportVocabulary { format, query: ListQuery::default() })
        .await?;
    let ok = match &envelope.data {
        Some(Value::String(text)) if envelope.success => {
            std::fs::write(path, text)?;
            println!("exported to {}", path.display());
            true
        }
        _ => {
            print_envelope(&envelope);
            false
        }
    };
    service.close();
    Ok(ok)
}

fn print_envelope(envelope: &Envelope<Value>) {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: cannot encode result: {e}"),
    }
}

// ── stdio serve loop ───────────────────────────────────────────────────────

/// One JSON request per stdin line, one JSON envelope per stdout line.
/// Ends at EOF.
async fn serve(service: &mut VocabService) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("serving requests on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let envelope = match line.parse::<Request>() {
            Ok(request) => match service.handle(request).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "request rejected");
                    Envelope::failed(e.to_string())
                }
            },
            Err(e) => {
                debug!(error = %e, "unparsable request line");
                Envelope::failed(format!("parse error: {e}"))
            }
        };
        let mut json = match serde_json::to_string(&envelope) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "response serialise error");
                continue;
            }
        };
        json.push('\n');
        stdout.write_all(json.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed; stopping");
    Ok(())
}
