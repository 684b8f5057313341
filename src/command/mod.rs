//! Command Construction
//!
//! Turns a resolved admin intent into a syntactically correct server
//! command string. This layer is purely local: every constraint it
//! enforces (counts, levels, durations, token legality) is checked
//! before anything touches the network, and a [`crate::errors::AdminError::Validation`]
//! from here guarantees nothing was sent.
//!
//! Rendering rules:
//! - player names containing whitespace are double-quoted; names
//!   containing quotes, backslashes, or control characters are rejected
//! - coordinates render as three independent tokens, `~` for a
//!   pass-through axis, and never with a trailing `.0`
//! - enchantments are encoded in the order supplied:
//!   `give Steve minecraft:diamond_sword{Enchantments:[{id:"minecraft:sharpness",lvl:5}]} 1`
//! - commands carry no leading slash; RCON does not require one

use crate::catalog::CatalogEntry;
use crate::config::Location;
use crate::errors::AdminError;

/// Whether an experience amount is in levels or raw points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpUnit {
    Level,
    Point,
}

impl XpUnit {
    fn token(&self) -> &'static str {
        match self {
            XpUnit::Level => "levels",
            XpUnit::Point => "points",
        }
    }
}

/// Free-text destination reference carried by an unresolved intent.
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationRef {
    Player(String),
    Location(String),
}

/// One requested admin action as constructed by the caller. Free-text
/// fields (`target`, `item`, …) are resolved against the live player set
/// and the catalog by the session before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    GiveItem {
        target: String,
        item: String,
        count: i64,
        enchantments: Vec<(String, i64)>,
    },
    ApplyEffect {
        target: String,
        effect: String,
        duration: i64,
        amplifier: i64,
    },
    Teleport {
        target: String,
        destination: DestinationRef,
    },
    GiveXp {
        target: String,
        amount: i64,
        unit: XpUnit,
    },
}

/// A teleport destination after resolution.
#[derive(Debug, Clone)]
pub enum ResolvedDestination<'a> {
    Player(&'a str),
    Location(&'a Location),
}

/// An intent whose free-text references have been resolved to live
/// entities. This is what the builder renders.
#[derive(Debug, Clone)]
pub enum ResolvedIntent<'a> {
    GiveItem {
        target: &'a str,
        item: &'a CatalogEntry,
        count: i64,
        enchantments: Vec<(&'a CatalogEntry, i64)>,
    },
    ApplyEffect {
        target: &'a str,
        effect: &'a CatalogEntry,
        duration: i64,
        amplifier: i64,
    },
    Teleport {
        target: &'a str,
        destination: ResolvedDestination<'a>,
    },
    GiveXp {
        target: &'a str,
        amount: i64,
        unit: XpUnit,
    },
}

/// Renders resolved intents into server command strings.
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder
    }

    /// Render any resolved intent. Total over every variant.
    pub fn render(&self, intent: &ResolvedIntent<'_>) -> Result<String, AdminError> {
        match intent {
            ResolvedIntent::GiveItem {
                target,
                item,
                count,
                enchantments,
            } => self.give_item(target, item, *count, enchantments),
            ResolvedIntent::ApplyEffect {
                target,
                effect,
                duration,
                amplifier,
            } => self.apply_effect(target, effect, *duration, *amplifier),
            ResolvedIntent::Teleport {
                target,
                destination,
            } => self.teleport(target, destination),
            ResolvedIntent::GiveXp {
                target,
                amount,
                unit,
            } => self.give_xp(target, *amount, *unit),
        }
    }

    /// `give <target> <item-id>[{Enchantments:[…]}] <count>`
    ///
    /// The count is clamped to at least 1; the server enforces its own
    /// upper limits and reports violations in the response. Enchantment
    /// levels must be within `1..=max_level`.
    pub fn give_item(
        &self,
        target: &str,
        item: &CatalogEntry,
        count: i64,
        enchantments: &[(&CatalogEntry, i64)],
    ) -> Result<String, AdminError> {
        let target = quote_token(target)?;
        let count = count.max(1);

        let mut item_token = item.id.clone();
        if !enchantments.is_empty() {
            let mut encoded = Vec::with_capacity(enchantments.len());
            for (ench, level) in enchantments {
                check_enchantment_level(ench, *level)?;
                encoded.push(format!("{{id:\"{}\",lvl:{}}}", ench.id, level));
            }
            item_token.push_str(&format!("{{Enchantments:[{}]}}", encoded.join(",")));
        }

        Ok(format!("give {} {} {}", target, item_token, count))
    }

    /// `effect give <target> <effect-id> <seconds> <amplifier> true`
    ///
    /// The trailing `true` hides particles. Duration and amplifier must
    /// be non-negative.
    pub fn apply_effect(
        &self,
        target: &str,
        effect: &CatalogEntry,
        duration: i64,
        amplifier: i64,
    ) -> Result<String, AdminError> {
        let target = quote_token(target)?;
        if duration < 0 {
            return Err(AdminError::Validation(format!(
                "effect duration must be >= 0 seconds, got {}",
                duration
            )));
        }
        if amplifier < 0 {
            return Err(AdminError::Validation(format!(
                "effect amplifier must be >= 0, got {}",
                amplifier
            )));
        }
        Ok(format!(
            "effect give {} {} {} {} true",
            target, effect.id, duration, amplifier
        ))
    }

    /// `tp <target> <player>` or `tp <target> <x> <y> <z>`
    ///
    /// Location axes marked pass-through render as `~` (keep the
    /// player's current value on that axis).
    pub fn teleport(
        &self,
        target: &str,
        destination: &ResolvedDestination<'_>,
    ) -> Result<String, AdminError> {
        let target = quote_token(target)?;
        match destination {
            ResolvedDestination::Player(name) => {
                let dest = quote_token(name)?;
                Ok(format!("tp {} {}", target, dest))
            }
            ResolvedDestination::Location(loc) => Ok(format!(
                "tp {} {} {} {}",
                target,
                loc.x.render(),
                loc.y.render(),
                loc.z.render()
            )),
        }
    }

    /// `xp add <target> <amount> levels|points`
    pub fn give_xp(&self, target: &str, amount: i64, unit: XpUnit) -> Result<String, AdminError> {
        let target = quote_token(target)?;
        if amount <= 0 {
            return Err(AdminError::Validation(format!(
                "xp amount must be positive, got {}",
                amount
            )));
        }
        Ok(format!("xp add {} {} {}", target, amount, unit.token()))
    }

    /// The player-list poll issued by the periodic refresh task.
    pub fn list_players(&self) -> &'static str {
        "list"
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        CommandBuilder::new()
    }
}

fn check_enchantment_level(ench: &CatalogEntry, level: i64) -> Result<(), AdminError> {
    if level <= 0 {
        return Err(AdminError::Validation(format!(
            "enchantment level for {} must be positive, got {}",
            ench.display_name, level
        )));
    }
    if let Some(max) = ench.max_level {
        if level > i64::from(max) {
            return Err(AdminError::Validation(format!(
                "level {} exceeds {} for {}",
                level, max, ench.display_name
            )));
        }
    }
    Ok(())
}

/// Quote a player-name token for the command grammar. Names with
/// embedded whitespace are double-quoted; quotes, backslashes, and
/// control characters cannot be represented and are rejected.
fn quote_token(name: &str) -> Result<String, AdminError> {
    if name.is_empty() {
        return Err(AdminError::Validation("empty player name".to_string()));
    }
    if name
        .chars()
        .any(|c| c == '"' || c == '\\' || c.is_control())
    {
        return Err(AdminError::Validation(format!(
            "player name contains characters illegal in the command grammar: {:?}",
            name
        )));
    }
    if name.chars().any(char::is_whitespace) {
        Ok(format!("\"{}\"", name))
    } else {
        Ok(name.to_string())
    }
}
