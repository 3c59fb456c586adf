use crate::host::Host;
use crate::league::{JobCompletion, JobId, JobKind, JobTransport, LeagueJob};
use crate::types::{PlayerRecord, Recipient, TeamColor};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Countdown {
    Idle,
    Counting,
    Running,
}

/// Scripted game server used by the unit tests.
pub struct FakeHost {
    pub players: Vec<PlayerRecord>,
    pub limits: HashMap<TeamColor, u32>,
    pub permissions: HashMap<u32, HashSet<String>>,
    pub now: f64,
    pub time_limit: f64,
    pub utc: DateTime<Utc>,
    pub countdown: Countdown,
    pub paused: bool,
    pub countdowns_started: Vec<u32>,
    pub games_ended: usize,
    pub messages: Vec<(Recipient, String)>,
    pub can_record: bool,
    pub recording: bool,
    pub saved_recordings: Vec<String>,
}

impl FakeHost {
    /// Red vs Blue map with a 15 minute time limit.
    pub fn new() -> Self {
        let mut limits = HashMap::new();
        limits.insert(TeamColor::Red, 8);
        limits.insert(TeamColor::Blue, 8);
        FakeHost {
            players: Vec::new(),
            limits,
            permissions: HashMap::new(),
            now: 1000.0,
            time_limit: 900.0,
            utc: Utc.with_ymd_and_hms(2015, 3, 14, 21, 5, 9).unwrap(),
            countdown: Countdown::Idle,
            paused: false,
            countdowns_started: Vec::new(),
            games_ended: 0,
            messages: Vec::new(),
            can_record: true,
            recording: false,
            saved_recordings: Vec::new(),
        }
    }

    pub fn add_player(&mut self, slot: u32, identity: &str, callsign: &str, team: TeamColor) -> PlayerRecord {
        let player = PlayerRecord {
            slot,
            identity: identity.to_string(),
            callsign: callsign.to_string(),
            ip_address: format!("10.0.0.{slot}"),
            team,
            verified: !identity.is_empty(),
        };
        self.players.push(player.clone());
        self.grant_permission(slot, "spawn");
        player
    }

    /// Two verified players on each of Red and Blue, slots 1-4.
    pub fn with_two_on_two() -> Self {
        let mut host = FakeHost::new();
        host.add_player(1, "101", "alpha", TeamColor::Red);
        host.add_player(2, "102", "bravo", TeamColor::Red);
        host.add_player(3, "201", "charlie", TeamColor::Blue);
        host.add_player(4, "202", "delta", TeamColor::Blue);
        host
    }

    pub fn player(&self, slot: u32) -> PlayerRecord {
        self.lookup_by_slot(slot).unwrap()
    }

    pub fn remove_competitors(&mut self) {
        self.players.retain(|player| player.team == TeamColor::Observer);
    }

    pub fn messages_to(&self, to: Recipient) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(recipient, _)| *recipient == to)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn last_message_to(&self, to: Recipient) -> Option<String> {
        self.messages_to(to).pop()
    }

    /// Countdown elapsed: the game is now running.
    pub fn finish_countdown(&mut self) {
        self.countdown = Countdown::Running;
    }
}

impl Host for FakeHost {
    fn list_players(&self) -> Vec<PlayerRecord> {
        self.players.clone()
    }

    fn team_player_limit(&self, team: TeamColor) -> u32 {
        self.limits.get(&team).copied().unwrap_or(0)
    }

    fn has_permission(&self, slot: u32, permission: &str) -> bool {
        self.permissions
            .get(&slot)
            .map(|perms| perms.contains(permission))
            .unwrap_or(false)
    }

    fn grant_permission(&mut self, slot: u32, permission: &str) {
        self.permissions
            .entry(slot)
            .or_default()
            .insert(permission.to_string());
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    fn time_limit(&self) -> f64 {
        self.time_limit
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.utc
    }

    fn public_address(&self) -> String {
        "league.example.net".to_string()
    }

    fn public_port(&self) -> u16 {
        5154
    }

    fn is_countdown_in_progress(&self) -> bool {
        self.countdown == Countdown::Counting
    }

    fn is_countdown_active(&self) -> bool {
        self.countdown == Countdown::Running
    }

    fn is_countdown_paused(&self) -> bool {
        self.paused
    }

    fn start_countdown(&mut self, delay_secs: u32, _time_limit: f64, _initiator: &str) {
        self.countdowns_started.push(delay_secs);
        self.countdown = Countdown::Counting;
    }

    fn pause_countdown(&mut self, _initiator: &str) {
        self.paused = true;
    }

    fn resume_countdown(&mut self, _initiator: &str) {
        self.paused = false;
    }

    fn end_game(&mut self) {
        self.games_ended += 1;
        self.countdown = Countdown::Idle;
    }

    fn send_message(&mut self, to: Recipient, message: &str) {
        self.messages.push((to, message.to_string()));
    }

    fn start_recording(&mut self) -> bool {
        self.recording = self.can_record;
        self.recording
    }

    fn save_recording(&mut self, file_name: &str) -> bool {
        self.saved_recordings.push(file_name.to_string());
        true
    }

    fn stop_recording(&mut self) {
        self.recording = false;
    }
}

/// Keeps every dispatched job; completions are queued by the test.
#[derive(Default)]
pub struct RecordingTransport {
    pub jobs: Vec<LeagueJob>,
    pub pending_completions: Vec<JobCompletion>,
}

impl RecordingTransport {
    pub fn bodies(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.body.as_str()).collect()
    }
}

impl JobTransport for RecordingTransport {
    fn dispatch(&mut self, kind: JobKind, body: String) -> JobId {
        let id = self.jobs.len() as JobId + 1;
        self.jobs.push(LeagueJob { id, kind, body });
        id
    }

    fn poll_completions(&mut self) -> Vec<JobCompletion> {
        std::mem::take(&mut self.pending_completions)
    }
}
