use chrono::{DateTime, Utc};
use std::fmt;

// ── Constants ──────────────────────────────────────────────────────────

pub const PLUGIN_NAME: &str = "League Overseer";
pub const DEFAULT_ROLL_CALL_SECS: f64 = 90.0;
pub const ROLL_CALL_RETRY_SECS: f64 = 60.0;
pub const ROLL_CALL_MARGIN_SECS: f64 = 30.0;
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;
pub const MIN_COUNTDOWN_SECS: u32 = 5;
pub const MAX_COUNTDOWN_SECS: u32 = 120;
pub const MIN_OFFICIAL_TEAM_SIZE: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const MAX_DEBUG_LEVEL: i32 = 4;
pub const DEFAULT_TEAM_ONE_NAME: &str = "Team-A";
pub const DEFAULT_TEAM_TWO_NAME: &str = "Team-B";
pub const SPAWN_PERMISSION: &str = "spawn";
pub const BAN_PERMISSION: &str = "ban";
pub const ALL_PLAYERS_LEFT_REASON: &str =
    "Official match automatically canceled due to all players leaving the match.";
pub const MISSING_PARTICIPANTS_MESSAGE: &str =
    "Official match could not be reported due to not having a list of valid match participants.";

// ── Teams ──────────────────────────────────────────────────────────────

/// Team colors in the host's enumeration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeamColor {
    Rogue,
    Red,
    Green,
    Blue,
    Purple,
    Observer,
    Rabbit,
    Hunter,
}

impl TeamColor {
    /// Colors that can field competing players, scanned in this order.
    pub const COMPETING: [TeamColor; 4] = [
        TeamColor::Red,
        TeamColor::Green,
        TeamColor::Blue,
        TeamColor::Purple,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TeamColor::Rogue => "Rogue",
            TeamColor::Red => "Red",
            TeamColor::Green => "Green",
            TeamColor::Blue => "Blue",
            TeamColor::Purple => "Purple",
            TeamColor::Observer => "Observer",
            TeamColor::Rabbit => "Rabbit",
            TeamColor::Hunter => "Hunter",
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// The two colors the current map plays with. Fixed for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeamAssignment {
    pub team_one: TeamColor,
    pub team_two: TeamColor,
}

impl TeamAssignment {
    /// Picks the first two competing colors with a nonzero player limit.
    pub fn from_limits<F>(limit: F) -> Option<Self>
    where
        F: Fn(TeamColor) -> u32,
    {
        let mut found = TeamColor::COMPETING
            .iter()
            .copied()
            .filter(|color| limit(*color) > 0);
        let team_one = found.next()?;
        let team_two = found.next()?;
        Some(TeamAssignment { team_one, team_two })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamNames {
    pub team_one: String,
    pub team_two: String,
}

impl Default for TeamNames {
    fn default() -> Self {
        TeamNames {
            team_one: DEFAULT_TEAM_ONE_NAME.to_string(),
            team_two: DEFAULT_TEAM_TWO_NAME.to_string(),
        }
    }
}

// ── Players ────────────────────────────────────────────────────────────

/// A connected player as the host reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRecord {
    pub slot: u32,
    /// Stable league identity; empty when the player is not verified.
    pub identity: String,
    pub callsign: String,
    pub ip_address: String,
    pub team: TeamColor,
    pub verified: bool,
}

impl PlayerRecord {
    pub fn is_observer(&self) -> bool {
        self.team == TeamColor::Observer
    }
}

/// Who took part in an official match, captured once at roll call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
    pub callsign: String,
    pub ip_address: String,
    pub team_name: String,
    pub team_color: TeamColor,
}

// ── Match results ──────────────────────────────────────────────────────

/// Everything the report pipeline needs, frozen at game end.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSnapshot {
    pub teams: TeamAssignment,
    pub team_names: TeamNames,
    pub team_one_points: u32,
    pub team_two_points: u32,
    pub duration_secs: f64,
    pub ended_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
}

impl MatchSnapshot {
    pub fn participants_on(&self, color: TeamColor) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |participant| participant.team_color == color)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome {
    FunMatchCompleted,
    OfficialCanceled { reason: String, team_names: TeamNames },
    OfficialMissingParticipants { team_names: TeamNames },
    OfficialCompleted(MatchSnapshot),
}

// ── Host messaging ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    All,
    Admins,
    Player(u32),
}
