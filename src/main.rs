//! Binary entrypoint for the dadmin CLI.
//!
//! Commands:
//! - `console` - interactive admin console against the configured server
//! - `exec <command…>` - dispatch one raw command and print the response
//! - `search <kind> <query…>` - offline fuzzy search over the catalog
//! - `players` - connect, poll once, print who is online
//! - `init` - create a starter `dadmin.toml`
//!
//! See the library crate docs for module-level details: `dadmin::`.
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use dadmin::admin::{spawn, ExecuteOutcome, Session, SessionHandle};
use dadmin::catalog::{Catalog, CatalogKind};
use dadmin::command::{DestinationRef, Intent, XpUnit};
use dadmin::config::Config;
use dadmin::logutil::strip_color_codes;
use dadmin::rcon::RconClient;

#[derive(Parser)]
#[command(name = "dadmin")]
#[command(about = "Remote console administration for Minecraft servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "dadmin.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive admin console
    Console,
    /// Dispatch one raw command and print the response
    Exec {
        /// The command, given as one or more words
        #[arg(required = true)]
        command: Vec<String>,
    },
    /// Fuzzy-search the catalog without connecting
    Search {
        /// item, effect, or enchantment
        kind: String,
        /// Free-text query; empty lists everything
        query: Vec<String>,
    },
    /// Print the players currently online
    Players,
    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote starter configuration to {}", cli.config);
            println!("Edit the [server] section, then run: dadmin console");
            Ok(())
        }
        Commands::Search { kind, query } => {
            let config = require_config(pre_config, &cli.config)?;
            let kind: CatalogKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let catalog = Catalog::load(&config.catalog.data_dir)?;
            let session = Session::new(RconClient::new(), Arc::new(catalog), Vec::new());
            let hits = session.search(&query.join(" "), kind);
            if hits.is_empty() {
                println!("no {} matches", kind);
            }
            for hit in hits {
                println!("{:30} {}", hit.display_name, hit.id);
            }
            Ok(())
        }
        Commands::Exec { command } => {
            let config = require_config(pre_config, &cli.config)?;
            let password = resolve_password(&config)?;
            let mut client = RconClient::new();
            client.connect(&config.server.host, config.server.port).await?;
            client.authenticate(&password).await?;
            let result = client.execute(&command.join(" ")).await?;
            client.close();
            println!("{}", strip_color_codes(&result.raw_response));
            if !result.success {
                bail!("server rejected the command");
            }
            Ok(())
        }
        Commands::Players => {
            let config = require_config(pre_config, &cli.config)?;
            let password = resolve_password(&config)?;
            let catalog = Arc::new(Catalog::load(&config.catalog.data_dir)?);
            let mut session = Session::new(RconClient::new(), catalog, Vec::new());
            session.connect(&config.server.host, config.server.port).await?;
            session.authenticate(&password).await?;
            session.refresh_players().await?;
            let names = session.player_names();
            session.close();
            if names.is_empty() {
                println!("nobody online");
            } else {
                println!("{}", names.join(", "));
            }
            Ok(())
        }
        Commands::Console => {
            let config = require_config(pre_config, &cli.config)?;
            let password = resolve_password(&config)?;
            run_console(config, password).await
        }
    }
}

fn require_config(config: Option<Config>, path: &str) -> Result<Config> {
    config.ok_or_else(|| {
        anyhow!(
            "no configuration at {} (run `dadmin init` to create one)",
            path
        )
    })
}

/// Prompt for the password when the config leaves it empty.
fn resolve_password(config: &Config) -> Result<String> {
    if config.server.password.is_empty() {
        Ok(rpassword::prompt_password("RCON password: ")?)
    } else {
        Ok(config.server.password.clone())
    }
}

async fn run_console(config: Config, password: String) -> Result<()> {
    use std::io::Write;

    let catalog = Arc::new(Catalog::load(&config.catalog.data_dir)?);
    info!("catalog: {} entries", catalog.len());
    let locations = config.parse_locations()?;

    let session = Session::new(RconClient::new(), catalog, locations);
    let (handle, task) = spawn(session, Duration::from_secs(config.refresh.interval_secs));

    handle.connect(&config.server.host, config.server.port).await?;
    handle.authenticate(&password).await?;
    println!(
        "connected to {}:{} - type 'help' for commands",
        config.server.host, config.server.port
    );
    handle.refresh_players().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("dadmin> ");
    std::io::stdout().flush().ok();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            if line == "quit" || line == "exit" {
                break;
            }
            if let Err(e) = dispatch_line(&handle, line).await {
                warn!("command failed: {}", e);
                println!("error: {}", e);
            }
        }
        print!("dadmin> ");
        std::io::stdout().flush().ok();
    }

    handle.close().await.ok();
    task.await.ok();
    Ok(())
}

/// Map one console line onto the session surface.
async fn dispatch_line(handle: &SessionHandle, line: &str) -> Result<()> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or("");
    let rest: Vec<&str> = words.collect();

    match verb {
        "help" => {
            println!("give <player> <item> [count] [ench:level …]");
            println!("effect <player> <effect> [seconds] [amplifier]");
            println!("tp <player> <player|@location>");
            println!("xp <player> <amount> [levels|points]");
            println!("search <kind> [query]   players   refresh   quit");
            Ok(())
        }
        "players" => {
            let names = handle.players().await?;
            if names.is_empty() {
                println!("nobody online");
            } else {
                println!("{}", names.join(", "));
            }
            Ok(())
        }
        "refresh" => {
            handle.refresh_players().await?;
            println!("refreshed");
            Ok(())
        }
        "search" => {
            let kind: CatalogKind = rest
                .first()
                .ok_or_else(|| anyhow!("usage: search <kind> [query]"))?
                .parse()
                .map_err(|e: String| anyhow!(e))?;
            let hits = handle.search(&rest[1..].join(" "), kind).await?;
            for hit in hits.iter().take(10) {
                println!("{:30} {}", hit.display_name, hit.id);
            }
            if hits.is_empty() {
                println!("no {} matches", kind);
            }
            Ok(())
        }
        "give" => {
            let (target, rest) = split_target(&rest, "give <player> <item> …")?;
            let item = rest
                .first()
                .ok_or_else(|| anyhow!("usage: give <player> <item> …"))?
                .to_string();
            let mut count = 1;
            let mut enchantments = Vec::new();
            for extra in &rest[1..] {
                if let Ok(n) = extra.parse::<i64>() {
                    count = n;
                } else if let Some((name, level)) = extra.rsplit_once(':') {
                    let level: i64 = level
                        .parse()
                        .map_err(|_| anyhow!("bad enchantment level in {:?}", extra))?;
                    enchantments.push((name.to_string(), level));
                } else {
                    bail!("unrecognized argument {:?}", extra);
                }
            }
            report(
                handle
                    .execute(Intent::GiveItem {
                        target,
                        item,
                        count,
                        enchantments,
                    })
                    .await?,
            );
            Ok(())
        }
        "effect" => {
            let (target, rest) = split_target(&rest, "effect <player> <effect> …")?;
            let effect = rest
                .first()
                .ok_or_else(|| anyhow!("usage: effect <player> <effect> …"))?
                .to_string();
            let duration = parse_or(rest.get(1), 30)?;
            let amplifier = parse_or(rest.get(2), 0)?;
            report(
                handle
                    .execute(Intent::ApplyEffect {
                        target,
                        effect,
                        duration,
                        amplifier,
                    })
                    .await?,
            );
            Ok(())
        }
        "tp" => {
            let (target, rest) = split_target(&rest, "tp <player> <player|@location>")?;
            let dest = rest
                .join(" ");
            if dest.is_empty() {
                bail!("usage: tp <player> <player|@location>");
            }
            let destination = match dest.strip_prefix('@') {
                Some(label) => DestinationRef::Location(label.to_string()),
                None => DestinationRef::Player(dest),
            };
            report(
                handle
                    .execute(Intent::Teleport {
                        target,
                        destination,
                    })
                    .await?,
            );
            Ok(())
        }
        "xp" => {
            let (target, rest) = split_target(&rest, "xp <player> <amount> [levels|points]")?;
            let amount = parse_or(rest.first(), 1)?;
            let unit = match rest.get(1).map(String::as_str) {
                None | Some("levels") | Some("l") => XpUnit::Level,
                Some("points") | Some("p") => XpUnit::Point,
                Some(other) => bail!("unknown xp unit {:?}", other),
            };
            report(
                handle
                    .execute(Intent::GiveXp {
                        target,
                        amount,
                        unit,
                    })
                    .await?,
            );
            Ok(())
        }
        other => bail!("unknown command {:?} (try 'help')", other),
    }
}

fn split_target(rest: &[&str], usage: &str) -> Result<(String, Vec<String>)> {
    match rest.split_first() {
        Some((target, tail)) => Ok((
            target.to_string(),
            tail.iter().map(|s| s.to_string()).collect(),
        )),
        None => bail!("usage: {}", usage),
    }
}

fn parse_or<S: AsRef<str>>(token: Option<&S>, default: i64) -> Result<i64> {
    match token {
        None => Ok(default),
        Some(t) => t
            .as_ref()
            .parse()
            .map_err(|_| anyhow!("expected a number, got {:?}", t.as_ref())),
    }
}

fn report(outcome: ExecuteOutcome) {
    match outcome {
        ExecuteOutcome::Done(result) => {
            let text = strip_color_codes(&result.raw_response);
            if text.is_empty() {
                println!("ok");
            } else {
                println!("{}", text);
            }
        }
        ExecuteOutcome::Ambiguous {
            what,
            query,
            candidates,
        } => {
            println!("{} {:?} is ambiguous:", what, query);
            for (i, c) in candidates.iter().take(8).enumerate() {
                println!("  {}) {}", i + 1, c);
            }
            println!("be more specific");
        }
        ExecuteOutcome::NotFound { what, query } => {
            println!("no {} matches {:?}", what, query);
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity, else from config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                let write_mutex = mutex.clone();

                // Mirror to the console only when stdout is a TTY
                let is_tty = atty::is(atty::Stream::Stdout);

                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());

                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }
                    if is_tty {
                        writeln!(fmt, "{}", line)?;
                    }
                    Ok(())
                });
            }
        }
    }
    let _ = builder.try_init();
}
