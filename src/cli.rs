use clap::{Args, Parser, Subcommand};
use courtcall::config::{self, AppConfig, FileConfig, Sport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig, SocketAddr),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let mut cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command.take() {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let file = match cli.config.as_deref() {
        Some(path) => match FileConfig::load(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => FileConfig::default(),
    };

    match resolve_config(cli, file) {
        Ok((config, addr)) => RunOutcome::Serve(config, addr),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "courtcall",
    version,
    about = "Web Push match notifications for tournaments"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// TOML settings file; flags and environment take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "COURTCALL_BIND")]
    bind: Option<String>,
    #[arg(long, env = "COURTCALL_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "COURTCALL_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "COURTCALL_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "COURTCALL_SPORT", value_enum)]
    sport: Option<Sport>,
    /// Seconds the push service keeps an undelivered message.
    #[arg(long, env = "COURTCALL_PUSH_TTL")]
    push_ttl: Option<u32>,
    /// Per-request timeout in seconds.
    #[arg(long, env = "COURTCALL_PUSH_TIMEOUT")]
    push_timeout: Option<u64>,
    #[arg(long, env = "COURTCALL_PARTICIPANT_DELIMITER")]
    participant_delimiter: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match courtcall::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("COURTCALL_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("COURTCALL_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("COURTCALL_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace COURTCALL_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn resolve_config(cli: Cli, file: FileConfig) -> Result<(AppConfig, SocketAddr), String> {
    let bind = cli
        .bind
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let addr: SocketAddr = bind
        .trim()
        .parse()
        .map_err(|_| format!("invalid bind address '{bind}'"))?;

    let push_timeout = match cli.push_timeout.or(file.push_timeout_secs) {
        Some(0) => return Err("push timeout must be greater than 0".to_string()),
        Some(secs) => Duration::from_secs(secs),
        None => config::DEFAULT_PUSH_TIMEOUT,
    };

    let participant_delimiter = cli
        .participant_delimiter
        .or(file.participant_delimiter)
        .unwrap_or_else(|| config::DEFAULT_PARTICIPANT_DELIMITER.to_string());
    if participant_delimiter.is_empty() {
        return Err("participant delimiter cannot be empty".to_string());
    }

    let config = AppConfig {
        vapid_private_key: cli.vapid_private_key.or(file.vapid.private_key),
        vapid_public_key: cli.vapid_public_key.or(file.vapid.public_key),
        vapid_subject: cli.vapid_subject.or(file.vapid.subject),
        sport: cli.sport.or(file.sport).unwrap_or_default(),
        push_ttl: cli
            .push_ttl
            .or(file.push_ttl)
            .unwrap_or(config::DEFAULT_PUSH_TTL),
        push_timeout,
        participant_delimiter,
    };
    Ok((config, addr))
}
