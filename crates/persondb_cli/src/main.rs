//! Command line front end for the person repository.
//!
//! # Responsibility
//! - Resolve configuration from `.env`, the environment and flags.
//! - Run repository operations against a SQLite file and print JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use persondb_core::db::{open_db, open_db_in_memory};
use persondb_core::repo::person_repo::{
    FOOD_TO_SEARCH, NAME_TO_REMOVE, SAMPLE_FAVORITE_FOODS, SAMPLE_NAME,
};
use persondb_core::{
    init_logging, NewPerson, PersonCollection, PersonRepository, SqlitePersonCollection,
    StoreConfig,
};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Person document store demo over SQLite
#[derive(Parser)]
#[command(name = "persondb", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// SQLite database file (in-memory when omitted)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (written only with --log-dir)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every repository operation in order and print each result
    Walkthrough,

    /// Insert people from a JSON array file
    CreateMany {
        #[arg(long)]
        file: PathBuf,
    },

    /// List people with an exact name
    FindByName { name: String },

    /// Show one person by id
    FindById { id: Uuid },

    /// Remove one person by id
    DeleteById { id: Uuid },

    /// People who like a food, sorted by name, at most two, without age
    QueryChain {
        #[arg(long, default_value = FOOD_TO_SEARCH)]
        food: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let env = StoreConfig::from_env().context("failed to read PERSONDB_* environment")?;
    let config = resolve_config(env, cli.global)?;

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }

    let conn = open_connection(&config)?;
    let collection = SqlitePersonCollection::try_new(&conn)?;
    let repo = PersonRepository::new(collection);

    match cli.command {
        Command::Walkthrough => walkthrough(&repo),
        Command::CreateMany { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let people: Vec<NewPerson> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid people file {}", file.display()))?;
            print_json(&repo.create_many(&people)?)
        }
        Command::FindByName { name } => print_json(&repo.find_by_name(&name)?),
        Command::FindById { id } => print_json(&repo.find_by_id(id)?),
        Command::DeleteById { id } => print_json(&repo.delete_by_id(id)?),
        Command::QueryChain { food } => {
            print_json(&repo.query_favorite_food_sorted_limited(&food)?)
        }
    }
}

fn resolve_config(mut config: StoreConfig, args: GlobalArgs) -> Result<StoreConfig> {
    if let Some(db) = args.db {
        config.database_path = Some(db);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = Some(log_dir);
    }
    config.validate().context("invalid log level")?;
    Ok(config)
}

fn open_connection(config: &StoreConfig) -> Result<Connection> {
    let conn = match &config.database_path {
        Some(path) => {
            open_db(path).with_context(|| format!("failed to open {}", path.display()))?
        }
        None => open_db_in_memory().context("failed to open in-memory database")?,
    };
    Ok(conn)
}

fn walkthrough<C: PersonCollection>(repo: &PersonRepository<C>) -> Result<()> {
    let created = repo.create_one()?;
    print_step("create_one", &created)?;

    let crowd = vec![
        NewPerson::new(NAME_TO_REMOVE)
            .with_age(28)
            .with_favorite_foods(["burrito", "pizza"]),
        NewPerson::new(NAME_TO_REMOVE).with_favorite_foods(["sushi"]),
        NewPerson::new("Luigi")
            .with_age(41)
            .with_favorite_foods(["burrito"]),
        NewPerson::new("Anna")
            .with_age(19)
            .with_favorite_foods(["lasagna", "burrito"]),
    ];
    print_step("create_many", &repo.create_many(&crowd)?)?;
    print_step("find_by_name", &repo.find_by_name(SAMPLE_NAME)?)?;
    print_step(
        "find_one_by_favorite_food",
        &repo.find_one_by_favorite_food(SAMPLE_FAVORITE_FOODS[0])?,
    )?;
    print_step("find_by_id", &repo.find_by_id(created.id)?)?;
    print_step(
        "append_food_and_save",
        &repo.append_food_and_save(created.id)?,
    )?;
    print_step("update_age_by_name", &repo.update_age_by_name(SAMPLE_NAME)?)?;
    print_step("delete_by_id", &repo.delete_by_id(created.id)?)?;
    print_step(
        "delete_many_by_name",
        &repo.delete_many_by_name(NAME_TO_REMOVE)?,
    )?;
    print_step(
        "query_favorite_food_sorted_limited",
        &repo.query_favorite_food_sorted_limited(FOOD_TO_SEARCH)?,
    )?;

    info!("event=walkthrough module=cli status=ok steps=10");
    Ok(())
}

fn print_step<T: Serialize>(step: &str, result: &T) -> Result<()> {
    let line = serde_json::json!({ "step": step, "result": result });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve_config, Cli, Command, GlobalArgs};
    use clap::{CommandFactory, Parser};
    use persondb_core::StoreConfig;
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_chain_defaults_to_burrito() {
        let cli = Cli::try_parse_from(["persondb", "query-chain"]).unwrap();
        match cli.command {
            Command::QueryChain { food } => assert_eq!(food, "burrito"),
            _ => panic!("expected query-chain"),
        }
    }

    #[test]
    fn flags_override_environment_values() {
        let env = StoreConfig {
            database_path: Some(PathBuf::from("/env/people.db")),
            log_level: "info".to_string(),
            log_dir: None,
        };
        let args = GlobalArgs {
            db: Some(PathBuf::from("/flag/people.db")),
            log_level: None,
            log_dir: Some(PathBuf::from("/flag/logs")),
        };

        let config = resolve_config(env, args).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/flag/people.db")));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_dir, Some(PathBuf::from("/flag/logs")));
    }

    #[test]
    fn invalid_log_level_is_rejected_without_log_dir() {
        let args = GlobalArgs {
            db: None,
            log_level: Some("loud".to_string()),
            log_dir: None,
        };
        assert!(resolve_config(StoreConfig::default(), args).is_err());

        let cli = Cli::try_parse_from(["persondb", "--log-level", "warn", "walkthrough"]).unwrap();
        let config = resolve_config(StoreConfig::default(), cli.global).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }
}
