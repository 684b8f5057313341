//! The session: resolution, dispatch, and the serialized request loop.
//!
//! [`Session`] methods take `&mut self`, so a session used directly is
//! already serialized. [`spawn`] lifts one onto a background task with
//! an mpsc request channel for callers that need to share it (a UI
//! thread plus the refresh timer): requests are processed strictly one
//! at a time, so no two commands ever have overlapping in-flight
//! windows against the protocol client, and the player-list refresh
//! competes for the same queue instead of racing it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::{Catalog, CatalogEntry, CatalogKind};
use crate::command::{
    CommandBuilder, DestinationRef, Intent, ResolvedDestination, ResolvedIntent,
};
use crate::config::Location;
use crate::errors::AdminError;
use crate::matcher::{self, MatchKind, ResolveResult};
use crate::rcon::{CommandResult, RconClient};

use super::Player;

/// Outcome of dispatching one intent. Zero and ambiguous matches are
/// ordinary results the caller presents to the user, not failures; the
/// session never auto-picks among multiple matches.
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Done(CommandResult),
    /// A free-text reference matched several entities. `what` names the
    /// field ("player", "item", …); `candidates` are ranked best-first.
    Ambiguous {
        what: String,
        query: String,
        candidates: Vec<String>,
    },
    /// A free-text reference matched nothing.
    NotFound { what: String, query: String },
}

/// One ranked catalog hit, owned so it can cross the request channel.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub display_name: String,
    pub score: Option<MatchKind>,
}

/// Orchestrates the protocol client, the catalog, and the live
/// player/location sets behind a single entry point.
pub struct Session {
    client: RconClient,
    catalog: Arc<Catalog>,
    builder: CommandBuilder,
    players: Vec<Player>,
    locations: Vec<Location>,
}

impl Session {
    pub fn new(client: RconClient, catalog: Arc<Catalog>, locations: Vec<Location>) -> Self {
        Session {
            client,
            catalog,
            builder: CommandBuilder::new(),
            players: Vec::new(),
            locations,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    /// Names of players currently confirmed online, sorted.
    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), AdminError> {
        self.client.connect(host, port).await
    }

    pub async fn authenticate(&mut self, password: &str) -> Result<(), AdminError> {
        self.client.authenticate(password).await
    }

    pub fn close(&mut self) {
        self.client.close();
    }

    /// Rank catalog entries of `kind` against `query`.
    pub fn search(&self, query: &str, kind: CatalogKind) -> Vec<SearchHit> {
        matcher::search(query, self.catalog.all_of_kind(kind))
            .into_iter()
            .map(|m| SearchHit {
                id: m.item.id.clone(),
                display_name: m.item.display_name.clone(),
                score: m.score,
            })
            .collect()
    }

    /// Single entry point: resolve the intent's free text, render the
    /// command, dispatch it, and surface the server's response.
    pub async fn execute(&mut self, intent: &Intent) -> Result<ExecuteOutcome, AdminError> {
        let command = match self.render_intent(intent) {
            Ok(command) => command,
            Err(RenderStop::Unresolved(outcome)) => return Ok(outcome),
            Err(RenderStop::Invalid(e)) => return Err(e),
        };
        let result = self.client.execute(&command).await?;
        if !result.success {
            warn!(
                "server rejected command: {}",
                crate::logutil::escape_log(&result.raw_response)
            );
        }
        Ok(ExecuteOutcome::Done(result))
    }

    /// Poll the server for the player list and update the live set.
    /// Players confirmed now reset their miss count; players absent
    /// from two consecutive successful refreshes are dropped.
    pub async fn refresh_players(&mut self) -> Result<(), AdminError> {
        let command = self.builder.list_players();
        let result = self.client.execute(command).await?;
        let names = parse_player_list(&result.raw_response);
        self.apply_refresh(&names);
        debug!("refresh: {} players online", self.players.len());
        Ok(())
    }

    fn apply_refresh(&mut self, names: &[String]) {
        let now = Utc::now();
        for player in &mut self.players {
            if names.iter().any(|n| n == &player.name) {
                player.last_seen = now;
                player.misses = 0;
            } else {
                player.misses += 1;
            }
        }
        self.players.retain(|p| p.misses < 2);
        for name in names {
            if !self.players.iter().any(|p| &p.name == name) {
                info!("player joined: {}", name);
                self.players.push(Player::new(name));
            }
        }
        self.players.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn render_intent(&self, intent: &Intent) -> Result<String, RenderStop> {
        let resolved = self.resolve_intent(intent)?;
        self.builder.render(&resolved).map_err(RenderStop::Invalid)
    }

    fn resolve_intent<'a>(&'a self, intent: &'a Intent) -> Result<ResolvedIntent<'a>, RenderStop> {
        match intent {
            Intent::GiveItem {
                target,
                item,
                count,
                enchantments,
            } => {
                let target = self.resolve_player(target)?;
                let item = self.resolve_entry(CatalogKind::Item, item)?;
                let mut resolved_ench = Vec::with_capacity(enchantments.len());
                for (ench, level) in enchantments {
                    resolved_ench.push((self.resolve_entry(CatalogKind::Enchantment, ench)?, *level));
                }
                Ok(ResolvedIntent::GiveItem {
                    target,
                    item,
                    count: *count,
                    enchantments: resolved_ench,
                })
            }
            Intent::ApplyEffect {
                target,
                effect,
                duration,
                amplifier,
            } => Ok(ResolvedIntent::ApplyEffect {
                target: self.resolve_player(target)?,
                effect: self.resolve_entry(CatalogKind::Effect, effect)?,
                duration: *duration,
                amplifier: *amplifier,
            }),
            Intent::Teleport {
                target,
                destination,
            } => {
                let target = self.resolve_player(target)?;
                let destination = match destination {
                    DestinationRef::Player(name) => {
                        ResolvedDestination::Player(self.resolve_player(name)?)
                    }
                    DestinationRef::Location(label) => {
                        ResolvedDestination::Location(self.resolve_location(label)?)
                    }
                };
                Ok(ResolvedIntent::Teleport {
                    target,
                    destination,
                })
            }
            Intent::GiveXp {
                target,
                amount,
                unit,
            } => Ok(ResolvedIntent::GiveXp {
                target: self.resolve_player(target)?,
                amount: *amount,
                unit: *unit,
            }),
        }
    }

    /// A target must exist in the current live player set.
    fn resolve_player<'a>(&'a self, query: &str) -> Result<&'a str, RenderStop> {
        match matcher::resolve(query, &self.players) {
            ResolveResult::Found(p) => Ok(p.name.as_str()),
            ResolveResult::Ambiguous(players) => Err(RenderStop::ambiguous(
                "player",
                query,
                players.iter().map(|p| p.name.clone()).collect(),
            )),
            ResolveResult::NotFound => Err(RenderStop::not_found("player", query)),
        }
    }

    fn resolve_location<'a>(&'a self, query: &str) -> Result<&'a Location, RenderStop> {
        match matcher::resolve(query, &self.locations) {
            ResolveResult::Found(loc) => Ok(loc),
            ResolveResult::Ambiguous(locations) => Err(RenderStop::ambiguous(
                "location",
                query,
                locations.iter().map(|l| l.label.clone()).collect(),
            )),
            ResolveResult::NotFound => Err(RenderStop::not_found("location", query)),
        }
    }

    /// Catalog references accept either an exact (optionally
    /// un-namespaced) id or fuzzy display-name text.
    fn resolve_entry<'a>(
        &'a self,
        kind: CatalogKind,
        query: &str,
    ) -> Result<&'a CatalogEntry, RenderStop> {
        let qualified = if query.contains(':') {
            query.to_lowercase()
        } else {
            format!("minecraft:{}", query.to_lowercase())
        };
        if let Some(entry) = self.catalog.get(kind, &qualified) {
            return Ok(entry);
        }
        match matcher::resolve(query, self.catalog.all_of_kind(kind)) {
            ResolveResult::Found(entry) => Ok(entry),
            ResolveResult::Ambiguous(entries) => Err(RenderStop::ambiguous(
                &kind.to_string(),
                query,
                entries.iter().map(|e| e.display_name.clone()).collect(),
            )),
            ResolveResult::NotFound => Err(RenderStop::not_found(&kind.to_string(), query)),
        }
    }
}

/// Why rendering stopped before the network: an unresolved reference
/// (an ordinary outcome) or a validation failure (an error).
enum RenderStop {
    Unresolved(ExecuteOutcome),
    Invalid(AdminError),
}

impl RenderStop {
    fn ambiguous(what: &str, query: &str, candidates: Vec<String>) -> Self {
        RenderStop::Unresolved(ExecuteOutcome::Ambiguous {
            what: what.to_string(),
            query: query.to_string(),
            candidates,
        })
    }

    fn not_found(what: &str, query: &str) -> Self {
        RenderStop::Unresolved(ExecuteOutcome::NotFound {
            what: what.to_string(),
            query: query.to_string(),
        })
    }
}

/// Extract player names from a `list` response:
/// `There are 2 of a max of 20 players online: Steve, Alex`.
/// Everything after the last colon, split on commas.
pub fn parse_player_list(raw: &str) -> Vec<String> {
    match raw.rsplit_once(':') {
        Some((_, tail)) => tail
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Requests accepted by the session actor. This is the entire surface
/// the surrounding interface may call.
pub enum SessionRequest {
    Connect {
        host: String,
        port: u16,
        reply: oneshot::Sender<Result<(), AdminError>>,
    },
    Authenticate {
        password: String,
        reply: oneshot::Sender<Result<(), AdminError>>,
    },
    Execute {
        intent: Intent,
        reply: oneshot::Sender<Result<ExecuteOutcome, AdminError>>,
    },
    Search {
        query: String,
        kind: CatalogKind,
        reply: oneshot::Sender<Vec<SearchHit>>,
    },
    Players {
        reply: oneshot::Sender<Vec<String>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<(), AdminError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle onto a spawned session actor.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Connect {
            host: host.to_string(),
            port,
            reply,
        })
        .await?;
        Self::recv(rx).await?
    }

    pub async fn authenticate(&self, password: &str) -> Result<(), AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Authenticate {
            password: password.to_string(),
            reply,
        })
        .await?;
        Self::recv(rx).await?
    }

    pub async fn execute(&self, intent: Intent) -> Result<ExecuteOutcome, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Execute { intent, reply }).await?;
        Self::recv(rx).await?
    }

    pub async fn search(&self, query: &str, kind: CatalogKind) -> Result<Vec<SearchHit>, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Search {
            query: query.to_string(),
            kind,
            reply,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn players(&self) -> Result<Vec<String>, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Players { reply }).await?;
        Self::recv(rx).await
    }

    pub async fn refresh_players(&self) -> Result<(), AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Refresh { reply }).await?;
        Self::recv(rx).await?
    }

    /// Shut the actor down, closing the connection. An in-flight
    /// command finishes first; its outcome on the server is unknown.
    pub async fn close(&self) -> Result<(), AdminError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Close { reply }).await?;
        Self::recv(rx).await
    }

    async fn send(&self, req: SessionRequest) -> Result<(), AdminError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| AdminError::Connection("session is shut down".to_string()))
    }

    async fn recv<T>(rx: oneshot::Receiver<T>) -> Result<T, AdminError> {
        rx.await
            .map_err(|_| AdminError::Connection("session is shut down".to_string()))
    }
}

/// Spawn the session actor. Requests from every handle clone and the
/// periodic refresh tick drain through one loop, one at a time.
pub fn spawn(session: Session, refresh_interval: Duration) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let task = tokio::spawn(run(session, rx, refresh_interval));
    (SessionHandle { tx }, task)
}

async fn run(
    mut session: Session,
    mut rx: mpsc::Receiver<SessionRequest>,
    refresh_interval: Duration,
) {
    let mut ticker = tokio::time::interval(refresh_interval);
    // A burst of missed ticks (e.g. behind a slow command) must not
    // cause a refresh storm afterwards.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            request = rx.recv() => {
                match request {
                    Some(SessionRequest::Close { reply }) => {
                        session.close();
                        let _ = reply.send(());
                        break;
                    }
                    Some(request) => handle_request(&mut session, request).await,
                    // All handles dropped: tear down.
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if session.is_ready() {
                    if let Err(e) = session.refresh_players().await {
                        warn!("player refresh failed: {}", e);
                    }
                }
            }
        }
    }
    session.close();
    debug!("session actor stopped");
}

async fn handle_request(session: &mut Session, request: SessionRequest) {
    match request {
        SessionRequest::Connect { host, port, reply } => {
            let _ = reply.send(session.connect(&host, port).await);
        }
        SessionRequest::Authenticate { password, reply } => {
            let _ = reply.send(session.authenticate(&password).await);
        }
        SessionRequest::Execute { intent, reply } => {
            let _ = reply.send(session.execute(&intent).await);
        }
        SessionRequest::Search { query, kind, reply } => {
            let _ = reply.send(session.search(&query, kind));
        }
        SessionRequest::Players { reply } => {
            let _ = reply.send(session.player_names());
        }
        SessionRequest::Refresh { reply } => {
            let _ = reply.send(session.refresh_players().await);
        }
        SessionRequest::Close { .. } => unreachable!("close is handled in the run loop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::rcon::RconClient;

    fn offline_session() -> Session {
        let catalog = Arc::new(Catalog::from_entries(Vec::new()).unwrap());
        Session::new(RconClient::new(), catalog, Vec::new())
    }

    #[test]
    fn test_parse_player_list() {
        let raw = "There are 2 of a max of 20 players online: Steve, Alex";
        assert_eq!(parse_player_list(raw), vec!["Steve", "Alex"]);
    }

    #[test]
    fn test_parse_player_list_empty() {
        let raw = "There are 0 of a max of 20 players online:";
        assert!(parse_player_list(raw).is_empty());
        assert!(parse_player_list("garbage with no colon").is_empty());
    }

    #[test]
    fn test_apply_refresh_two_miss_expiry() {
        let mut session = offline_session();
        session.apply_refresh(&["Steve".to_string(), "Alex".to_string()]);
        assert_eq!(session.player_names(), vec!["Alex", "Steve"]);

        // Alex misses one refresh: still live.
        session.apply_refresh(&["Steve".to_string()]);
        assert_eq!(session.player_names(), vec!["Alex", "Steve"]);

        // Second consecutive miss: dropped.
        session.apply_refresh(&["Steve".to_string()]);
        assert_eq!(session.player_names(), vec!["Steve"]);
    }

    #[test]
    fn test_apply_refresh_reconfirmation_resets_misses() {
        let mut session = offline_session();
        session.apply_refresh(&["Alex".to_string()]);
        session.apply_refresh(&[]);
        // Reappears before the second miss: counter resets.
        session.apply_refresh(&["Alex".to_string()]);
        session.apply_refresh(&[]);
        assert_eq!(session.player_names(), vec!["Alex"]);
    }

    #[tokio::test]
    async fn test_execute_unknown_player_is_not_found_outcome() {
        let mut session = offline_session();
        let intent = Intent::GiveXp {
            target: "Steve".to_string(),
            amount: 5,
            unit: crate::command::XpUnit::Level,
        };
        // Resolution fails before the client is ever touched, so the
        // disconnected state is irrelevant.
        match session.execute(&intent).await.unwrap() {
            ExecuteOutcome::NotFound { what, query } => {
                assert_eq!(what, "player");
                assert_eq!(query, "Steve");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_validation_precedes_network() {
        let mut session = offline_session();
        session.apply_refresh(&["Steve".to_string()]);
        let intent = Intent::GiveXp {
            target: "Steve".to_string(),
            amount: 0,
            unit: crate::command::XpUnit::Level,
        };
        // Amount 0 fails validation locally; a disconnected client
        // would raise Connection if anything reached it.
        let err = session.execute(&intent).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }
}
