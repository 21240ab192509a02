use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use keysafe::{BackendError, Config, ItemStore, Payload, SecureStore, UpdateStrategy};
use rpassword::read_password;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// age-encrypted file under --dir
    Age,
    /// freedesktop Secret Service (GNOME Keyring, KWallet)
    SecretService,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "secret-service-backend") {
            Self::SecretService
        } else {
            Self::Age
        }
    }
}

/// Store structured secrets per account in the platform secret store.
#[derive(Debug, Parser)]
#[command(name = "keysafe", version)]
struct Cli {
    #[arg(long, value_enum, env = "KEYSAFE_BACKEND", default_value_t = BackendKind::default())]
    backend: BackendKind,

    /// Directory of the age store [default: ~/.config/keysafe]
    #[arg(long, env = "KEYSAFE_DIR")]
    dir: Option<PathBuf>,

    /// age or SSH identity file; generated in --dir when omitted
    #[arg(long, env = "KEYSAFE_AGE_IDENTITY")]
    age_identity: Option<PathBuf>,

    /// Service namespace [default: derived from KEYSAFE_DEFAULT_SERVICE or the executable]
    #[arg(long, env = "KEYSAFE_SERVICE")]
    service: Option<String>,

    #[arg(long, value_enum, default_value_t = UpdateStrategy::Replace)]
    update_strategy: UpdateStrategy,

    /// More logging; repeat for more detail. KEYSAFE_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store entries for an account; fails if it already has some
    Save(Entries),
    /// Store entries for an account, replacing what is there
    Update(Entries),
    /// Print the entries stored for an account
    Load {
        account: String,
        /// Print the stored object as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an account's entries
    Delete { account: String },
    /// Remove every item this tool can reach
    Clear,
    /// Print a shell completion script
    Completions { shell: Shell },
}

#[derive(Debug, clap::Args)]
struct Entries {
    account: String,
    /// KEY=VALUE, or a bare KEY to be prompted for its value
    #[arg(required = true)]
    entries: Vec<String>,
    /// Do not echo prompted values
    #[arg(short, long)]
    noecho: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] keysafe::Error),
    #[error("I/O on {what} failed: {source}")]
    Input {
        what: String,
        #[source]
        source: io::Error,
    },
    #[error("no entries stored for `{0}`")]
    NotFound(String),
    #[error("{0}")]
    Unsupported(&'static str),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("KEYSAFE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_backend(cli: &Cli) -> Result<Box<dyn ItemStore>, CliError> {
    debug!(backend = ?cli.backend, "opening backend");
    match cli.backend {
        #[cfg(feature = "age-backend")]
        BackendKind::Age => Ok(Box::new(keysafe::backend::age::AgeBackend::open(
            cli.dir.clone(),
            cli.age_identity.clone(),
        )?)),
        #[cfg(feature = "secret-service-backend")]
        BackendKind::SecretService => Ok(Box::new(
            keysafe::backend::secret_service::SecretServiceBackend::new()?,
        )),
        #[allow(unreachable_patterns)]
        _ => Err(CliError::Unsupported(
            "this backend was not compiled into keysafe",
        )),
    }
}

fn prompt(label: &str, noecho: bool) -> Result<Zeroizing<String>, CliError> {
    let input_error = |source| CliError::Input {
        what: label.to_string(),
        source,
    };
    if noecho {
        eprint!("{label} (noecho):");
        return read_password().map(Zeroizing::new).map_err(input_error);
    }
    eprint!("{label}: ");
    io::stderr().flush().map_err(input_error)?;
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line).map_err(input_error)?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Build the payload from `KEY=VALUE` entries, prompting for bare keys.
fn collect_entries(entries: &Entries) -> Result<Payload, CliError> {
    let mut payload = Payload::new();
    for entry in &entries.entries {
        let (key, value) = match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), Zeroizing::new(value.to_string())),
            None => (
                entry.clone(),
                prompt(&format!("{}.{entry}", entries.account), entries.noecho)?,
            ),
        };
        payload.insert(key, Value::String(value.to_string()));
    }
    Ok(payload)
}

fn print_payload(payload: &Payload, json: bool) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    let write_error = |source| CliError::Input {
        what: "stdout".to_string(),
        source,
    };
    if json {
        let text = serde_json::to_string_pretty(payload).map_err(|e| {
            tracing::warn!(error = %e, "failed to render payload as JSON");
            keysafe::Error::InvalidParameter
        })?;
        writeln!(out, "{text}").map_err(write_error)?;
        return Ok(());
    }
    for (key, value) in payload {
        let written = match value {
            Value::String(s) => writeln!(out, "{key}={s}"),
            other => writeln!(out, "{key}={other}"),
        };
        written.map_err(write_error)?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "keysafe", &mut io::stdout());
        return Ok(());
    }

    let config = Config::detect().with_update_strategy(cli.update_strategy);
    let mut store = SecureStore::new(open_backend(&cli)?, config);
    let service = cli.service.as_deref();

    match &cli.command {
        Command::Save(entries) => {
            let payload = collect_entries(entries)?;
            store.save_data(payload, &entries.account, service)?;
        }
        Command::Update(entries) => {
            let payload = collect_entries(entries)?;
            store.update_data(payload, &entries.account, service)?;
        }
        Command::Load { account, json } => {
            let payload = store
                .try_load_data(account, service)?
                .ok_or_else(|| CliError::NotFound(account.clone()))?;
            print_payload(&payload, *json)?;
        }
        Command::Delete { account } => store.delete_data(account, service)?,
        Command::Clear => store.clear()?,
        Command::Completions { .. } => {}
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("keysafe: {e}");
            ExitCode::FAILURE
        }
    }
}
