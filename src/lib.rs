//! # Dadmin - Remote Console Administration for Minecraft Servers
//!
//! Dadmin is an administration toolkit that talks to a running Minecraft
//! server over its remote console (RCON) protocol. It resolves fuzzy
//! operator input against the game's item/effect/enchantment catalogs and
//! the live player list, deterministically builds well-formed server
//! commands, and dispatches them over an authenticated binary connection.
//!
//! ## Features
//!
//! - **RCON Protocol Client**: Authenticated TCP connection with correct
//!   packet framing, fragmented-response reassembly, and stale-response
//!   discard.
//! - **Catalog Search**: Load-once JSON game-data catalogs with ranked,
//!   deterministic fuzzy matching over display names.
//! - **Command Construction**: Total, validated rendering of give/effect/
//!   teleport/xp intents, including enchantment level bounds and
//!   player-name quoting rules.
//! - **Serialized Sessions**: One in-flight request per connection,
//!   enforced by an actor loop that also drives the periodic player-list
//!   refresh.
//! - **Async Design**: Built with Tokio; suspension points are exactly the
//!   socket connect, socket reads, and the refresh timer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dadmin::admin::{spawn, Session};
//! use dadmin::catalog::Catalog;
//! use dadmin::config::Config;
//! use dadmin::rcon::RconClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("dadmin.toml").await?;
//!     let catalog = Arc::new(Catalog::load(&config.catalog.data_dir)?);
//!     let locations = config.parse_locations()?;
//!
//!     let session = Session::new(RconClient::new(), catalog, locations);
//!     let (handle, _task) = spawn(session, Duration::from_secs(config.refresh.interval_secs));
//!
//!     handle.connect(&config.server.host, config.server.port).await?;
//!     handle.authenticate(&config.server.password).await?;
//!     handle.refresh_players().await?;
//!     println!("online: {:?}", handle.players().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`admin`] - Session orchestration, live player set, serialized actor loop
//! - [`rcon`] - RCON protocol client, packet codec, response reassembly
//! - [`catalog`] - Static item/effect/enchantment reference data
//! - [`matcher`] - Deterministic fuzzy matching over named entities
//! - [`command`] - Intent values and command-string construction
//! - [`config`] - Configuration management and saved locations
//! - [`errors`] - The error taxonomy shared by every layer
//! - [`logutil`] - Log sanitization for raw server output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Session      │ ← resolution, dispatch, player refresh
//! └─────────────────┘
//!     │         │
//! ┌────────┐ ┌──────────────┐
//! │ Matcher│ │CommandBuilder│ ← local, validated, no I/O
//! └────────┘ └──────────────┘
//!     │         │
//! ┌─────────────────┐
//! │   RCON Client   │ ← socket, handshake, framing
//! └─────────────────┘
//! ```

pub mod admin;
pub mod catalog;
pub mod command;
pub mod config;
pub mod errors;
pub mod logutil;
pub mod matcher;
pub mod rcon;
