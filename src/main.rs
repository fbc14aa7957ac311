//! poetri -- command-line client for the poetri platform.
//!
//! Loads configuration, initializes logging and dispatches one command
//! against the platform API on a single-threaded runtime.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use poetri::auth::{AuthManager, TokenProvider};
use poetri::config::Config;
use poetri::resources::{FunctionApi, NewFunction, NewProject, ProjectApi};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

enum Command {
    Register {
        username: String,
        email: Option<String>,
        name: Option<String>,
    },
    Login {
        username: String,
    },
    Logout,
    Whoami,
    Refresh,
    Status,
    ProjectInsert(NewProject),
    FunctionInsert {
        project: String,
        function: NewFunction,
    },
}

struct CliArgs {
    config_path: PathBuf,
    command: Command,
}

/// Flags and positionals left after the global options are consumed.
struct Rest {
    positionals: Vec<String>,
    flags: Vec<(String, String)>,
}

impl Rest {
    fn flag(&self, long: &str) -> Option<String> {
        self.flags
            .iter()
            .rev()
            .find(|(key, _)| key == long)
            .map(|(_, value)| value.clone())
    }
}

fn short_to_long(flag: &str) -> &str {
    match flag {
        "-u" => "--username",
        "-e" => "--email",
        "-n" => "--name",
        "-d" => "--description",
        "-l" => "--language",
        "-v" => "--version",
        "-p" => "--project",
        other => other,
    }
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("poetri.toml");
    let mut rest = Rest {
        positionals: Vec::new(),
        flags: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    fail("--config requires a path argument");
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" if rest.positionals.is_empty() => {
                println!("poetri {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => {
                let long = short_to_long(flag).to_string();
                match args.next() {
                    Some(value) => rest.flags.push((long, value)),
                    None => fail(&format!("{flag} requires a value")),
                }
            }
            _ => rest.positionals.push(arg),
        }
    }

    let command = match parse_command(&rest) {
        Ok(command) => command,
        Err(message) => fail(&message),
    };

    CliArgs {
        config_path,
        command,
    }
}

fn parse_command(rest: &Rest) -> Result<Command, String> {
    let words: Vec<&str> = rest.positionals.iter().map(String::as_str).collect();
    let required = |long: &str| {
        rest.flag(long)
            .ok_or_else(|| format!("{long} is required"))
    };

    let command = match words.as_slice() {
        ["register"] => Command::Register {
            username: required("--username")?,
            email: rest.flag("--email"),
            name: rest.flag("--name"),
        },
        ["login"] => Command::Login {
            username: required("--username")?,
        },
        ["login", username] => Command::Login {
            username: username.to_string(),
        },
        ["logout"] => Command::Logout,
        ["whoami"] => Command::Whoami,
        ["refresh"] => Command::Refresh,
        ["status"] => Command::Status,
        ["project", "insert", slug] => {
            let name = rest.flag("--name").unwrap_or_else(|| slug.to_string());
            let mut project = NewProject::new(*slug, name);
            if let Some(description) = rest.flag("--description") {
                project = project.with_description(description);
            }
            Command::ProjectInsert(project)
        }
        ["function", "insert", slug] => {
            let name = rest.flag("--name").unwrap_or_else(|| slug.to_string());
            let mut function = NewFunction::new(*slug, name, required("--language")?);
            if let Some(version) = rest.flag("--version") {
                function = function.with_version(version);
            }
            if let Some(description) = rest.flag("--description") {
                function = function.with_description(description);
            }
            Command::FunctionInsert {
                project: required("--project")?,
                function,
            }
        }
        [] => return Err("No command given".to_string()),
        other => return Err(format!("Unknown command: {}", other.join(" "))),
    };
    Ok(command)
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    eprintln!("Run with --help for usage information.");
    std::process::exit(1);
}

fn print_usage() {
    println!(
        "\
poetri {version} -- poetri platform client

USAGE:
    poetri [OPTIONS] <COMMAND>

COMMANDS:
    register -u <USERNAME> [-e <EMAIL>] [-n <NAME>]
                                   Create an account
    login [USERNAME] | -u <USERNAME>
                                   Log in and store credentials
    logout                         Forget stored credentials
    whoami                         Verify the session and print its claims
    refresh                        Renew the stored credentials
    status                         Show the local login state
    project insert <SLUG> [-n <NAME>] [-d <DESCRIPTION>]
                                   Register a project
    function insert <SLUG> -p <PROJECT> -l <LANGUAGE> [-n <NAME>] [-v <VERSION>] [-d <DESCRIPTION>]
                                   Register a function under a project id or slug

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: poetri.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    POETRI_CONFIG          Alternative to --config flag
    POETRI_PASSWORD        Password for login and register (prompted otherwise)
    POETRI_ENDPOINT        API endpoint
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let cli = parse_args();

    let config_path = std::env::var("POETRI_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);
    let config = Config::load(&config_path)?;

    init_tracing(&config);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        endpoint = %config.auth_api.endpoint,
        "Starting poetri"
    );

    let manager = Arc::new(AuthManager::from_config(&config)?);
    run(cli.command, manager).await
}

async fn run(command: Command, manager: Arc<AuthManager>) -> anyhow::Result<()> {
    match command {
        Command::Register {
            username,
            email,
            name,
        } => {
            let password = read_password()?;
            let mut user = Map::new();
            user.insert("username".into(), Value::String(username));
            user.insert("password".into(), Value::String(password));
            if let Some(email) = email {
                user.insert("email".into(), Value::String(email));
            }
            if let Some(name) = name {
                user.insert("name".into(), Value::String(name));
            }
            let created = manager.register(Value::Object(user)).await?;
            print_json(&created)?;
        }
        Command::Login { username } => {
            let password = read_password()?;
            manager.login(&username, &password).await?;
            println!("Logged in as {username}");
        }
        Command::Logout => {
            manager.logout()?;
            println!("Logged out");
        }
        Command::Whoami => {
            let claims = manager.me().await?;
            print_json(&serde_json::to_value(&claims)?)?;
        }
        Command::Refresh => {
            manager.refresh().await?;
            println!("Credentials renewed");
        }
        Command::Status => {
            let status = manager.status()?;
            print_json(&serde_json::to_value(&status)?)?;
        }
        Command::ProjectInsert(project) => {
            let tokens: Arc<dyn TokenProvider> = manager.clone();
            let api = ProjectApi::new(manager.client(), tokens);
            let outcome = api.insert(&project).await?;
            if !outcome.is_success() {
                bail!(
                    "There was an error trying to register project '{}' in the platform",
                    project.slug
                );
            }
            let id = outcome.item.and_then(|p| p.id);
            print_json(&json!({ "slug": project.slug, "id": id }))?;
        }
        Command::FunctionInsert { project, function } => {
            let tokens: Arc<dyn TokenProvider> = manager.clone();
            let api = FunctionApi::new(manager.client(), tokens);
            let outcome = api.insert(&project, &function).await?;
            if !outcome.is_success() {
                bail!(
                    "There was an error trying to register function '{}' in the platform",
                    function.slug
                );
            }
            println!("Function {} registered under {project}", function.slug);
        }
    }
    Ok(())
}

/// Password from `POETRI_PASSWORD`, else prompted without echo.
fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var("POETRI_PASSWORD") {
        return Ok(password);
    }
    let term = console::Term::stderr();
    term.write_str("Password: ")?;
    let password = term.read_secure_line().context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("poetri={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
