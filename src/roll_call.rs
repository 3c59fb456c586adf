//! Roll call: the one-time sampling of who is actually playing an official
//! match, taken a fixed delay after the game starts.
//!
//! Each designated color adopts the first non-empty team label seen in
//! enumeration order. A second, different label on the same color (or a
//! player without a stable identity) invalidates the sample. An invalid
//! sample is thrown away and retried a minute later while the match still
//! has room for it; otherwise it is committed as is.

use crate::host::Host;
use crate::match_state::MatchState;
use crate::team_names::TeamNameCache;
use crate::types::*;

/// One pass over the field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RollCallSample {
    pub participants: Vec<Participant>,
    pub team_one_label: String,
    pub team_two_label: String,
    pub team_one_inconsistent: bool,
    pub team_two_inconsistent: bool,
    pub missing_identity: bool,
}

impl RollCallSample {
    pub fn is_valid(&self) -> bool {
        !(self.team_one_inconsistent || self.team_two_inconsistent || self.missing_identity)
    }

    pub fn inconsistent_teams(&self, teams: &TeamAssignment) -> Vec<TeamColor> {
        let mut out = Vec::new();
        if self.team_one_inconsistent {
            out.push(teams.team_one);
        }
        if self.team_two_inconsistent {
            out.push(teams.team_two);
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RollCallDecision {
    /// Not an official match, not started, not yet due, or already recorded.
    NotDue,
    Committed { consistent: bool, participants: usize },
    /// Sample discarded; labels for `refresh` should be re-queried.
    Deferred { next_attempt_after: f64, refresh: Vec<TeamColor> },
}

/// Checks `label` against the canonical label adopted so far for a color.
fn check_label(canonical: &mut String, inconsistent: &mut bool, label: &str) {
    if canonical.is_empty() {
        *canonical = label.to_string();
    } else if !label.is_empty() && canonical != label {
        *inconsistent = true;
    }
}

pub fn sample(players: &[PlayerRecord], teams: &TeamAssignment, labels: &TeamNameCache) -> RollCallSample {
    let mut out = RollCallSample::default();
    for player in players.iter().filter(|player| !player.is_observer()) {
        let label = labels.lookup(&player.identity);
        if player.team == teams.team_one {
            check_label(&mut out.team_one_label, &mut out.team_one_inconsistent, &label);
        } else if player.team == teams.team_two {
            check_label(&mut out.team_two_label, &mut out.team_two_inconsistent, &label);
        }
        if player.identity.trim().is_empty() {
            out.missing_identity = true;
        }
        out.participants.push(Participant {
            identity: player.identity.clone(),
            callsign: player.callsign.clone(),
            ip_address: player.ip_address.clone(),
            team_name: label,
            team_color: player.team,
        });
    }
    out
}

/// Runs a roll call for `state` if one is due at the host's current time.
pub fn attempt(
    state: &mut MatchState,
    host: &dyn Host,
    teams: &TeamAssignment,
    labels: &TeamNameCache,
) -> RollCallDecision {
    if state.participants_recorded {
        return RollCallDecision::NotDue;
    }
    let Some(elapsed) = state.elapsed(host.current_time()) else {
        return RollCallDecision::NotDue;
    };
    if elapsed < state.roll_call_delay {
        return RollCallDecision::NotDue;
    }

    let taken = sample(&host.list_players(), teams, labels);
    if !taken.is_valid() && state.roll_call_delay + ROLL_CALL_MARGIN_SECS < state.planned_duration {
        state.roll_call_delay += ROLL_CALL_RETRY_SECS;
        return RollCallDecision::Deferred {
            next_attempt_after: state.roll_call_delay,
            refresh: taken.inconsistent_teams(teams),
        };
    }

    let consistent = taken.is_valid();
    if !taken.team_one_label.is_empty() {
        state.team_names.team_one = taken.team_one_label;
    }
    if !taken.team_two_label.is_empty() {
        state.team_names.team_two = taken.team_two_label;
    }
    state.participants = taken.participants;
    state.participants_recorded = true;
    RollCallDecision::Committed {
        consistent,
        participants: state.participants.len(),
    }
}
