//! links CLI - basic operations on a clink Links Theory database.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use links_client::{AuthStorageService, Link, LinkDbService, LinksConfig, Links, MenuItem, MenuStorageService};
use log::info;
use std::fs;
use std::path::Path;

mod cli;

use cli::{AuthCommand, Cli, Command, MenuCommand};

fn build_config(cli: &Cli) -> LinksConfig {
    let env = LinksConfig::from_env();
    let mut config = match &cli.data_dir {
        Some(data_dir) => LinksConfig::new(data_dir)
            .with_program(env.program.clone())
            .with_search_dirs(env.search_dirs.clone()),
        None => env,
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(program) = &cli.clink {
        config.program = program.clone();
    }
    config
}

/// Route `log` output to the data dir's log file; `RUST_LOG` sets the filter.
fn setup_logging(log_file: &Path) -> Result<()> {
    if let Some(dir) = log_file.parent() {
        fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
    }
    let sink = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .wrap_err_with(|| format!("Failed to open log file {}", log_file.display()))?;

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(sink)))
        .init();

    info!("links {} logging to {}", env!("CARGO_PKG_VERSION"), log_file.display());
    Ok(())
}

fn print_link(link: &Link) {
    println!("  {}", link.to_string().cyan());
}

fn load_menu(path: &Path) -> Result<Vec<MenuItem>> {
    let contents = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&contents).wrap_err_with(|| format!("Failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&contents).wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }
}

fn run_menu(config: &LinksConfig, command: MenuCommand) -> Result<()> {
    let menu = MenuStorageService::new(config).context("Failed to open menu storage")?;

    match command {
        MenuCommand::Store { file, parent } => {
            let items = load_menu(&file)?;
            let ids = menu
                .store_menu_structure(&items, parent)
                .context("Failed to store menu structure")?;
            println!("{} Stored {} top-level item(s): {:?}", "✓".green(), ids.len(), ids);
        }

        MenuCommand::Show { parent } => {
            let items = menu.get_menu_structure(parent).context("Failed to read menu structure")?;
            if items.is_empty() {
                println!("{}", "No menu items found".dimmed());
            } else {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        }

        MenuCommand::Stats => {
            let stats = menu.get_statistics().context("Failed to get menu statistics")?;
            println!("{}: {}", "Total links".bold(), stats.total_links);
            println!("{}: {}", "Total files".bold(), stats.total_files);
            println!("{}: {}", "Root items".bold(), stats.root_items);
        }

        MenuCommand::Clear => {
            menu.clear_all_menus().context("Failed to clear menus")?;
            println!("{} Menu data cleared", "✓".green());
        }
    }
    Ok(())
}

fn run_auth(config: &LinksConfig, command: AuthCommand) -> Result<()> {
    let auth = AuthStorageService::new(config).context("Failed to open auth storage")?;

    match command {
        AuthCommand::Stats => {
            let stats = auth.get_statistics().context("Failed to get auth statistics")?;
            println!("{}: {}", "Total links".bold(), stats.total_links);
            for (name, entity) in [
                ("Users", stats.users),
                ("Tokens", stats.tokens),
                ("Passwords", stats.passwords),
            ] {
                println!("{}: {} link(s), {} file(s)", name.bold(), entity.links, entity.files);
            }
        }

        AuthCommand::Users => {
            let users = auth.get_all_users().context("Failed to list users")?;
            if users.is_empty() {
                println!("{}", "No users found".dimmed());
            }
            for user in users {
                println!(
                    "  {} {} {}",
                    user.user_id.cyan(),
                    user.username.unwrap_or_default(),
                    user.email.unwrap_or_default().dimmed()
                );
            }
        }
    }
    Ok(())
}

fn run(cli: Cli, config: &LinksConfig) -> Result<()> {
    match cli.command {
        Command::Health => {
            let capability = LinkDbService::from_config(config).health_check();
            if capability.available {
                println!(
                    "{} {} is available{}",
                    "✓".green(),
                    capability.program,
                    capability.version.map(|v| format!(" ({})", v)).unwrap_or_default()
                );
            } else {
                println!(
                    "{} {} is not available: {}",
                    "✗".red(),
                    capability.program,
                    capability.error.unwrap_or_default()
                );
                println!("  Install with: dotnet tool install --global clink");
                std::process::exit(1);
            }
        }

        Command::Create { source, target } => {
            let db = LinkDbService::from_config(config);
            let link = db.create_link(source, target).context("Failed to create link")?;
            println!("{} Created: {}", "✓".green(), link.to_string().cyan());
        }

        Command::List => {
            let db = LinkDbService::from_config(config);
            let links = db.read_all_links().context("Failed to read links")?;
            if links.is_empty() {
                println!("{}", "No links found".dimmed());
            } else {
                println!("{} {} link(s):", "→".blue(), links.len());
                for link in &links {
                    print_link(link);
                }
            }
        }

        Command::Get { id } => {
            let db = LinkDbService::from_config(config);
            match db.read_link(id).context("Failed to read link")? {
                Some(link) => print_link(&link),
                None => {
                    eprintln!("{} Link not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Update { id, source, target } => {
            let db = LinkDbService::from_config(config);
            let link = db.update_link(id, source, target).context("Failed to update link")?;
            println!("{} Updated: {}", "✓".green(), link.to_string().cyan());
        }

        Command::Delete { id } => {
            let db = LinkDbService::from_config(config);
            db.delete_link(id).context("Failed to delete link")?;
            println!("{} Deleted: {}", "✓".green(), id.to_string().cyan());
        }

        Command::Count { id, source, target } => {
            let links = Links::from_config(config);
            let count = links
                .count(Some(&[id, source, target][..]))
                .context("Failed to count links")?;
            println!("{}", count);
        }

        Command::Clear => {
            let db = LinkDbService::from_config(config);
            let removed = db.clear_database().context("Failed to clear database")?;
            println!("{} Removed {} link(s)", "✓".green(), removed);
        }

        Command::Menu { command } => run_menu(config, command)?,

        Command::Auth { command } => run_auth(config, command)?,
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    setup_logging(&config.log_file()).context("Failed to setup logging")?;
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli, &config) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
