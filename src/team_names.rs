use crate::error::ResponseError;
use crate::host::Host;
use crate::league::{classify_response, value_to_string, JobKind, JobTransport, LeagueResponse};
use crate::logging::debug_message;
use crate::types::TeamColor;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// League team label per stable identity. Lives for the whole process.
#[derive(Debug, Default)]
pub struct TeamNameCache {
    labels: HashMap<String, String>,
}

impl TeamNameCache {
    pub fn lookup(&self, identity: &str) -> String {
        self.labels.get(identity).cloned().unwrap_or_default()
    }

    pub fn update(&mut self, identity: &str, label: &str) {
        self.labels.insert(identity.to_string(), label.trim().to_string());
    }

}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamNamesResponse {
    team_names: Vec<TeamNameEntry>,
}

#[derive(Debug, Deserialize)]
struct TeamNameEntry {
    #[serde(alias = "identity", deserialize_with = "identity_from_value")]
    bzid: String,
    #[serde(default)]
    team: Option<String>,
}

// The league sends identities as strings or bare numbers.
fn identity_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("identity must be a string or number, got {value}")))
}

/// Asks the league which team each player belongs to and caches the answers.
#[derive(Debug)]
pub struct TeamNameResolver {
    cache: TeamNameCache,
    debug_level: u8,
}

impl TeamNameResolver {
    pub fn new(debug_level: u8) -> Self {
        TeamNameResolver {
            cache: TeamNameCache::default(),
            debug_level,
        }
    }

    pub fn cache(&self) -> &TeamNameCache {
        &self.cache
    }

    pub fn lookup(&self, identity: &str) -> String {
        self.cache.lookup(identity)
    }

    /// Queues a league query for one player. Unverified players are skipped.
    pub fn request_refresh(&self, transport: &mut dyn JobTransport, callsign: &str, identity: &str) -> bool {
        if identity.trim().is_empty() {
            return false;
        }
        debug_message(self.debug_level, format_args!("Getting team name for {callsign}..."));
        let body = team_name_query_body(&[identity]);
        transport.dispatch(
            JobKind::TeamNameQuery {
                identities: vec![identity.to_string()],
            },
            body,
        );
        true
    }

    /// Queues a query for every connected member of `color`.
    pub fn request_refresh_for_team(
        &self,
        host: &dyn Host,
        transport: &mut dyn JobTransport,
        color: TeamColor,
    ) -> usize {
        let mut sent = 0;
        for player in host.list_players().iter().filter(|player| player.team == color) {
            if self.request_refresh(transport, &player.callsign, &player.identity) {
                sent += 1;
            }
        }
        sent
    }

    /// Applies a league answer to a team name query. Returns how many labels
    /// were written. JSON answers must be `{"teamNames":[...]}`; plain text is
    /// only accepted as the label of a single queried identity.
    pub fn apply_response(&mut self, identities: &[String], body: &str) -> Result<usize, ResponseError> {
        let value = match classify_response(body)? {
            LeagueResponse::Structured(value) => value,
            LeagueResponse::Text(text) => {
                return match identities {
                    [identity] if !text.contains('\n') => {
                        self.cache.update(identity, &text);
                        Ok(1)
                    }
                    _ => Err(ResponseError::Unexpected(text.chars().take(80).collect())),
                };
            }
        };
        if !value.get("teamNames").is_some_and(Value::is_array) {
            return Err(ResponseError::Unexpected(value.to_string().chars().take(80).collect()));
        }
        let parsed: TeamNamesResponse = serde_json::from_value(value)?;
        let mut updated = 0;
        for entry in parsed.team_names {
            if !identities.iter().any(|id| *id == entry.bzid) {
                continue;
            }
            self.cache.update(&entry.bzid, entry.team.as_deref().unwrap_or(""));
            updated += 1;
        }
        Ok(updated)
    }
}

pub fn team_name_query_body(identities: &[&str]) -> String {
    let players = identities
        .iter()
        .map(|id| urlencoding::encode(id).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    format!("query=teamNameQuery&teamPlayers={players}")
}
