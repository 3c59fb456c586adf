use crate::types::{PlayerRecord, Recipient, TeamColor};
use chrono::{DateTime, Utc};

/// What the plugin needs from the game server it is embedded in.
///
/// "Countdown in progress" is the pre-game count; "countdown active" means the
/// timed game itself is running.
pub trait Host {
    /// Every connected player, observers included, in slot order.
    fn list_players(&self) -> Vec<PlayerRecord>;

    fn lookup_by_slot(&self, slot: u32) -> Option<PlayerRecord> {
        self.list_players().into_iter().find(|player| player.slot == slot)
    }

    fn lookup_by_identity(&self, identity: &str) -> Option<PlayerRecord> {
        if identity.is_empty() {
            return None;
        }
        self.list_players()
            .into_iter()
            .find(|player| player.identity == identity)
    }

    fn lookup_by_callsign(&self, callsign: &str) -> Option<PlayerRecord> {
        self.list_players()
            .into_iter()
            .find(|player| player.callsign == callsign)
    }

    fn team_count(&self, team: TeamColor) -> u32 {
        self.list_players()
            .iter()
            .filter(|player| player.team == team)
            .count() as u32
    }

    fn team_player_limit(&self, team: TeamColor) -> u32;

    fn has_permission(&self, slot: u32, permission: &str) -> bool;
    fn grant_permission(&mut self, slot: u32, permission: &str);

    /// Server clock in seconds.
    fn current_time(&self) -> f64;
    /// Configured game length in seconds.
    fn time_limit(&self) -> f64;
    fn utc_now(&self) -> DateTime<Utc>;
    fn public_address(&self) -> String;
    fn public_port(&self) -> u16;

    fn is_countdown_in_progress(&self) -> bool;
    fn is_countdown_active(&self) -> bool;
    fn is_countdown_paused(&self) -> bool;
    fn start_countdown(&mut self, delay_secs: u32, time_limit: f64, initiator: &str);
    fn pause_countdown(&mut self, initiator: &str);
    fn resume_countdown(&mut self, initiator: &str);
    /// Ends the running game (or countdown) immediately.
    fn end_game(&mut self);

    fn send_message(&mut self, to: Recipient, message: &str);

    /// Starts buffering a demo recording; false when the host cannot record.
    fn start_recording(&mut self) -> bool;
    fn save_recording(&mut self, file_name: &str) -> bool;
    fn stop_recording(&mut self);
}

/// Players on competing colors, across every color the host supports.
pub fn competitor_count(host: &dyn Host) -> u32 {
    TeamColor::COMPETING
        .iter()
        .map(|color| host.team_count(*color))
        .sum()
}

pub fn broadcast(host: &mut dyn Host, message: &str) {
    host.send_message(Recipient::All, message);
}

pub fn tell(host: &mut dyn Host, slot: u32, message: &str) {
    host.send_message(Recipient::Player(slot), message);
}
