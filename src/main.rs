use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use golinks::config::Config;
use golinks::core::ApplicationContext;
use golinks::migration::{new_revision, Migrator};
use golinks::router::ConfigKey;
use golinks::server::Server;
use golinks::store::SqliteStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MAX_STEPS: i64 = 100;

#[derive(Parser, Debug)]
#[command(name = "golinks", version = golinks::VERSION, about = "Short-link redirect service")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "settings/development.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve HTTP on `hostname` (host:port), overriding server.listenAddr
    Run { hostname: Option<String> },
    /// Manage schema migrations: gen <name> | up | down | version | <steps>
    Migrate {
        #[arg(allow_hyphen_values = true)]
        command: String,
        /// Revision name for `gen`
        name: Option<String>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum MigrateAction {
    Gen(String),
    Up,
    Down,
    Version,
    Steps(i64),
}

impl MigrateAction {
    fn parse(command: &str, name: Option<String>) -> Result<Self, BoxError> {
        match command {
            "gen" => match name.filter(|n| !n.is_empty()) {
                Some(name) => Ok(Self::Gen(name)),
                None => Err("requires revision name".into()),
            },
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "version" => Ok(Self::Version),
            raw => {
                let steps: i64 = raw
                    .parse()
                    .map_err(|_| format!("Invalid migration command: {}", raw))?;
                if !(-MAX_STEPS..=MAX_STEPS).contains(&steps) {
                    return Err(format!("requires -{0} <= steps <= {0}", MAX_STEPS).into());
                }
                Ok(Self::Steps(steps))
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = golinks::logging::init(&config.logging, &config.env) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("golinks {}", golinks::VERSION);
    config.log_summary();

    let result = match cli.command {
        Command::Run { hostname } => run(config, hostname),
        Command::Migrate { command, name } => {
            MigrateAction::parse(&command, name).and_then(|action| migrate(&config, action))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

fn run(mut config: Config, hostname: Option<String>) -> Result<(), BoxError> {
    if let Some(hostname) = hostname {
        config.server.listen_addr = hostname;
    }

    let conn = golinks::database::open(&config.database)?;
    let store = Arc::new(SqliteStore::new(conn));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let server_config = config.server.clone();
        let context = ApplicationContext::new().with_value::<ConfigKey>(config);
        let router = golinks::routes::build_router(context.clone(), store)?;
        info!(routes = ?router.paths(), "Router ready");

        let server = Server::bind(&server_config, router, context).await?;
        server.run().await?;
        Ok::<(), BoxError>(())
    })
}

fn migrate(config: &Config, action: MigrateAction) -> Result<(), BoxError> {
    let dir = &config.application.migration_dir;

    if let MigrateAction::Gen(name) = &action {
        let (up, down) = new_revision(dir, name)?;
        println!("Generated [{} {}]", up, down);
        return Ok(());
    }

    let conn = golinks::database::open(&config.database)?;
    let mut migrator = Migrator::new(dir, conn)?;

    match action {
        MigrateAction::Up => {
            let applied = migrator.up()?;
            info!(applied, "migrated up");
            println!("Migrated: head");
        }
        MigrateAction::Down => {
            let reverted = migrator.down()?;
            info!(reverted, "migrated down");
            println!("Migrated: base");
        }
        MigrateAction::Version => match migrator.version()? {
            Some(version) => println!("Version: {}", version),
            None => println!("Version: none"),
        },
        MigrateAction::Steps(n) => {
            migrator.steps(n)?;
            println!("Migrated: {} steps", n);
        }
        MigrateAction::Gen(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_action_parse() {
        assert_eq!(MigrateAction::parse("up", None).unwrap(), MigrateAction::Up);
        assert_eq!(MigrateAction::parse("down", None).unwrap(), MigrateAction::Down);
        assert_eq!(
            MigrateAction::parse("version", None).unwrap(),
            MigrateAction::Version
        );
        assert_eq!(
            MigrateAction::parse("gen", Some("add_index".into())).unwrap(),
            MigrateAction::Gen("add_index".into())
        );
        assert!(MigrateAction::parse("gen", None).is_err());
        assert!(MigrateAction::parse("gen", Some(String::new())).is_err());
    }

    #[test]
    fn test_migrate_steps_range() {
        assert_eq!(MigrateAction::parse("3", None).unwrap(), MigrateAction::Steps(3));
        assert_eq!(
            MigrateAction::parse("-100", None).unwrap(),
            MigrateAction::Steps(-100)
        );
        assert!(MigrateAction::parse("101", None).is_err());
        assert!(MigrateAction::parse("-101", None).is_err());
        assert!(MigrateAction::parse("sideways", None).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["golinks", "-c", "x.yml", "run", "0.0.0.0:9000"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("x.yml"));
        assert!(
            matches!(cli.command, Command::Run { hostname: Some(ref h) } if h == "0.0.0.0:9000")
        );

        let cli = Cli::try_parse_from(["golinks", "migrate", "gen", "add_index"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Migrate { ref command, name: Some(ref name) }
                if command == "gen" && name == "add_index"
        ));

        let cli = Cli::try_parse_from(["golinks", "migrate", "-2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Migrate { ref command, name: None } if command == "-2"
        ));
    }
}
