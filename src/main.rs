use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use quorum_runtime::{
    CannedProvider, HumanAction, NewSessionRequest, RuntimeConfig, SessionId, SessionService,
    SqliteStateStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let matches = Command::new("quorum")
        .version(VERSION)
        .about("Quorum - deliberation workflow runtime")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .global(true)
                .help("SQLite database path (defaults to the platform data dir)"),
        )
        .subcommand(
            Command::new("new")
                .about("Create a new deliberation session")
                .arg(
                    Arg::new("request")
                        .value_name("REQUEST")
                        .required(true)
                        .help("The design request to deliberate"),
                )
                .arg(Arg::new("name").long("name").value_name("NAME"))
                .arg(
                    Arg::new("description")
                        .long("description")
                        .value_name("TEXT"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run a session's workflow until it pauses or completes")
                .arg(Arg::new("session").value_name("SESSION_ID").required(true)),
        )
        .subcommand(
            Command::new("step")
                .about("Resume a session paused at the human gate")
                .arg(Arg::new("session").value_name("SESSION_ID").required(true))
                .arg(
                    Arg::new("action")
                        .long("action")
                        .value_name("ACTION")
                        .required(true)
                        .help("approve or revise"),
                )
                .arg(
                    Arg::new("comment")
                        .long("comment")
                        .value_name("TEXT")
                        .help("Optional feedback to record"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show a session's workflow status")
                .arg(Arg::new("session").value_name("SESSION_ID").required(true)),
        )
        .subcommand(
            Command::new("sessions")
                .about("List sessions")
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_name("N")
                        .default_value("20"),
                )
                .arg(
                    Arg::new("offset")
                        .long("offset")
                        .value_name("N")
                        .default_value("0"),
                ),
        )
        .subcommand(
            Command::new("deliverables")
                .about("Print a completed session's deliverables")
                .arg(Arg::new("session").value_name("SESSION_ID").required(true))
                .arg(
                    Arg::new("markdown")
                        .long("markdown")
                        .action(ArgAction::SetTrue)
                        .help("Print the Markdown report instead of JSON"),
                ),
        )
        .get_matches();

    let config = match load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let service = match build_service(&config, matches.get_one::<String>("db")) {
        Ok(service) => service,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let result = match matches.subcommand() {
        Some(("new", sub)) => cmd_new(&service, sub).await,
        Some(("run", sub)) => cmd_run(&service, sub).await,
        Some(("step", sub)) => cmd_step(&service, sub).await,
        Some(("status", sub)) => cmd_status(&service, sub).await,
        Some(("sessions", sub)) => cmd_sessions(&service, sub).await,
        Some(("deliverables", sub)) => cmd_deliverables(&service, sub).await,
        _ => {
            eprintln!("error: no subcommand given (try --help)");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&String>) -> Result<RuntimeConfig, String> {
    match path {
        Some(path) => RuntimeConfig::from_file(&PathBuf::from(path)).map_err(|e| e.to_string()),
        None => RuntimeConfig::from_env().map_err(|e| e.to_string()),
    }
}

fn build_service(config: &RuntimeConfig, db: Option<&String>) -> Result<SessionService, String> {
    let store = match db.map(String::as_str) {
        Some(":memory:") => SqliteStateStore::open_in_memory(),
        Some(path) => SqliteStateStore::open(&PathBuf::from(path)),
        None => match &config.store.path {
            Some(path) => SqliteStateStore::open(path),
            None => SqliteStateStore::open(&SqliteStateStore::default_path()),
        },
    }
    .map_err(|e| e.to_string())?;

    // The CLI ships with the deterministic provider; a live deployment
    // injects a vendor-backed provider here instead.
    Ok(SessionService::new(
        config.clone(),
        Arc::new(store),
        Arc::new(CannedProvider::new()),
    ))
}

fn parse_session(sub: &clap::ArgMatches) -> Result<SessionId, String> {
    let raw = sub
        .get_one::<String>("session")
        .ok_or("missing session id")?;
    SessionId::parse(raw).map_err(|e| format!("invalid session id '{raw}': {e}"))
}

async fn cmd_new(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let request = NewSessionRequest {
        user_request: sub
            .get_one::<String>("request")
            .cloned()
            .unwrap_or_default(),
        name: sub.get_one::<String>("name").cloned(),
        description: sub.get_one::<String>("description").cloned(),
        user_context: Default::default(),
    };
    let state = service
        .create_session(request)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", state.session_id);
    Ok(())
}

async fn cmd_run(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let session_id = parse_session(sub)?;
    let snapshot = service
        .start_workflow(session_id)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&snapshot)
}

async fn cmd_step(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let session_id = parse_session(sub)?;
    let raw_action = sub.get_one::<String>("action").ok_or("missing action")?;
    let action = HumanAction::parse(raw_action)
        .ok_or_else(|| format!("invalid action '{raw_action}' (expected approve or revise)"))?;
    let comment = sub.get_one::<String>("comment").cloned();

    let snapshot = service
        .step_workflow(session_id, action, comment)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&snapshot)
}

async fn cmd_status(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let session_id = parse_session(sub)?;
    let snapshot = service
        .get_status(session_id)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&snapshot)
}

async fn cmd_sessions(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let limit = parse_number(sub, "limit")?;
    let offset = parse_number(sub, "offset")?;
    let page = service
        .list_sessions(limit, offset)
        .await
        .map_err(|e| e.to_string())?;

    println!(
        "{} session(s), showing {} from offset {}",
        page.total,
        page.sessions.len(),
        page.offset
    );
    for session in &page.sessions {
        println!(
            "{}  {:<14}  {}  {}",
            session.session_id,
            session.status,
            session.updated_at.format("%Y-%m-%d %H:%M:%S"),
            session.name.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_deliverables(service: &SessionService, sub: &clap::ArgMatches) -> Result<(), String> {
    let session_id = parse_session(sub)?;
    let bundle = service
        .get_deliverables(session_id)
        .await
        .map_err(|e| e.to_string())?;

    if sub.get_flag("markdown") {
        println!("{}", bundle.markdown_report);
        Ok(())
    } else {
        print_json(&bundle)
    }
}

fn parse_number(sub: &clap::ArgMatches, name: &str) -> Result<u64, String> {
    sub.get_one::<String>(name)
        .ok_or_else(|| format!("missing {name}"))?
        .parse()
        .map_err(|e| format!("invalid {name}: {e}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
