pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod host;
pub mod league;
pub mod team_names;
pub mod roll_call;
pub mod match_state;
pub mod report;
pub mod recording;
pub mod commands;
#[cfg(test)]
mod test_support;

use types::*;
use config::{load_config, load_env_file, read_map_name, OverseerConfig};
use error::ConfigError;
use host::{broadcast, tell, Host};
use league::{HttpTransport, JobCompletion, JobKind, JobOutcome, JobTransport};
use logging::debug_message;
use match_state::{Match, MatchController};
use roll_call::RollCallDecision;
use team_names::TeamNameResolver;

use std::{path::Path, time::Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

// ── Events ─────────────────────────────────────────────────────────────

/// Everything the host delivers, one at a time.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Capture { team: TeamColor },
    GameStart,
    GameEnd,
    PlayerJoin(PlayerRecord),
    /// Any slash command typed by a player, before the host runs it.
    RawCommand { from: u32, message: String },
    /// One of the commands this plugin registered.
    SlashCommand { from: u32, name: String, params: Vec<String> },
    MottoQuery { identity: String },
    Tick,
    JobCompleted(JobCompletion),
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventReply {
    None,
    /// Whether the command was consumed by the plugin.
    Command(bool),
    Motto(String),
    MatchEnded(MatchOutcome),
}

// ── Plugin context ─────────────────────────────────────────────────────

pub struct LeagueOverseer<H: Host, T: JobTransport> {
    host: H,
    transport: T,
    config: OverseerConfig,
    map_name: Option<String>,
    matches: MatchController,
    team_names: TeamNameResolver,
    recording: bool,
}

impl<H: Host, T: JobTransport> LeagueOverseer<H, T> {
    pub fn new(host: H, transport: T, config: OverseerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let teams = TeamAssignment::from_limits(|color| host.team_player_limit(color))
            .ok_or(ConfigError::MissingTeamColors)?;
        let verbosity = config.verbosity();
        let map_name = if config.rotational_league {
            let name = read_map_name(Path::new(config.mapchange_path.trim()))?;
            debug_message(verbosity, format_args!("Current map being played: {name}"));
            Some(name)
        } else {
            None
        };
        info!(
            team_one = %teams.team_one,
            team_two = %teams.team_two,
            rotational = config.rotational_league,
            "{PLUGIN_NAME} loaded"
        );
        Ok(LeagueOverseer {
            host,
            transport,
            matches: MatchController::new(teams, config.roll_call_delay_secs, verbosity),
            team_names: TeamNameResolver::new(verbosity),
            config,
            map_name,
            recording: false,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &OverseerConfig {
        &self.config
    }

    pub fn current_match(&self) -> &Match {
        self.matches.current()
    }

    pub fn teams(&self) -> TeamAssignment {
        self.matches.teams()
    }

    pub fn team_label(&self, identity: &str) -> String {
        self.team_names.lookup(identity)
    }

    fn verbosity(&self) -> u8 {
        self.config.verbosity()
    }

    pub fn handle_event(&mut self, event: HostEvent) -> EventReply {
        match event {
            HostEvent::Capture { team } => {
                self.matches.on_capture(team);
                EventReply::None
            }
            HostEvent::GameStart => {
                self.on_game_start();
                EventReply::None
            }
            HostEvent::GameEnd => EventReply::MatchEnded(self.on_game_end()),
            HostEvent::PlayerJoin(player) => {
                self.on_player_join(&player);
                EventReply::None
            }
            HostEvent::RawCommand { from, message } => EventReply::Command(self.on_raw_command(from, &message)),
            HostEvent::SlashCommand { from, name, params } => EventReply::Command(commands::handle_command(
                &mut self.matches,
                &mut self.host,
                from,
                &name,
                &params,
                self.config.verbosity(),
            )),
            HostEvent::MottoQuery { identity } => EventReply::Motto(self.team_names.lookup(&identity)),
            HostEvent::Tick => {
                self.on_tick();
                EventReply::None
            }
            HostEvent::JobCompleted(completion) => {
                self.on_job_completed(completion);
                EventReply::None
            }
        }
    }

    fn on_game_start(&mut self) {
        self.recording = self.host.start_recording();
        self.matches.on_game_start(&self.host);
    }

    fn on_game_end(&mut self) -> MatchOutcome {
        let ended_at = self.host.utc_now();
        let outcome = self.matches.on_game_end(ended_at);
        let verbosity = self.verbosity();

        match &outcome {
            MatchOutcome::FunMatchCompleted => {
                debug_message(verbosity, format_args!("Fun match has completed."));
            }
            MatchOutcome::OfficialCanceled { reason, .. } => {
                broadcast(&mut self.host, reason);
                debug_message(verbosity, format_args!("{reason}"));
            }
            MatchOutcome::OfficialMissingParticipants { .. } => {
                broadcast(&mut self.host, MISSING_PARTICIPANTS_MESSAGE);
                warn!("{MISSING_PARTICIPANTS_MESSAGE}");
            }
            MatchOutcome::OfficialCompleted(snapshot) => {
                let map_played = self.map_name.as_deref();
                report::submit_report(&mut self.host, &mut self.transport, snapshot, map_played, verbosity);
            }
        }

        if self.recording {
            let file_name = recording::recording_file_name(&outcome, ended_at);
            if !self.host.save_recording(&file_name) {
                warn!(file = %file_name, "host failed to save the match recording");
            }
            self.host.stop_recording();
            self.recording = false;
            broadcast(&mut self.host, &format!("Match saved as: {file_name}"));
        }
        outcome
    }

    fn on_player_join(&mut self, player: &PlayerRecord) {
        let game_running = self.host.is_countdown_active() || self.host.is_countdown_in_progress();
        if game_running && player.is_observer() {
            let kind = if self.matches.current().is_official() {
                "an official"
            } else {
                "a fun"
            };
            tell(
                &mut self.host,
                player.slot,
                &format!("*** There is currently {kind} match in progress, please be respectful. ***"),
            );
        }
        if player.verified {
            self.team_names
                .request_refresh(&mut self.transport, &player.callsign, &player.identity);
        }
    }

    fn on_raw_command(&mut self, from: u32, message: &str) -> bool {
        match commands::disabled_host_command_notice(message) {
            Some(notice) => {
                tell(&mut self.host, from, notice);
                true
            }
            None => false,
        }
    }

    fn on_tick(&mut self) {
        for completion in self.transport.poll_completions() {
            self.on_job_completed(completion);
        }
        self.matches.on_all_players_left(&mut self.host);
        self.run_roll_call();
    }

    fn run_roll_call(&mut self) {
        let teams = self.matches.teams();
        let verbosity = self.verbosity();
        let Some(state) = self.matches.official_mut() else {
            return;
        };
        let due_at = state.roll_call_delay;
        match roll_call::attempt(state, &self.host, &teams, self.team_names.cache()) {
            RollCallDecision::NotDue => {}
            RollCallDecision::Committed { consistent, participants } => {
                debug_message(
                    verbosity,
                    format_args!("Roll call recorded {participants} participants (consistent: {consistent})."),
                );
            }
            RollCallDecision::Deferred { next_attempt_after, refresh } => {
                let at = due_at as u64;
                debug_message(
                    verbosity,
                    format_args!("Invalid player found on field at {}:{:02}.", at / 60, at % 60),
                );
                debug_message(
                    verbosity,
                    format_args!("Next roll call {next_attempt_after}s after the match start."),
                );
                for color in refresh {
                    self.team_names
                        .request_refresh_for_team(&self.host, &mut self.transport, color);
                }
            }
        }
    }

    fn on_job_completed(&mut self, completion: JobCompletion) {
        let verbosity = self.verbosity();
        match completion.kind {
            JobKind::ReportMatch => report::handle_report_completion(&mut self.host, &completion.outcome, verbosity),
            JobKind::TeamNameQuery { identities } => match completion.outcome {
                JobOutcome::Done(body) => match self.team_names.apply_response(&identities, &body) {
                    Ok(updated) => debug_message(
                        verbosity,
                        format_args!("Updated {updated} team name(s) for {}.", identities.join(",")),
                    ),
                    Err(err) => warn!(job = completion.id, error = %err, "unusable team name response"),
                },
                JobOutcome::Timeout => warn!(job = completion.id, "team name query timed out"),
                JobOutcome::Error { code, message } => {
                    warn!(job = completion.id, code, "team name query failed: {message}")
                }
            },
        }
    }

    /// Stops recording and tears down the transport. Queued league jobs are
    /// still delivered by `HttpTransport` before its worker exits.
    pub fn shutdown(mut self) {
        if self.recording {
            self.host.stop_recording();
        }
        info!("{PLUGIN_NAME} unloading");
    }
}

// ── Entry point ────────────────────────────────────────────────────────

/// Loads the configuration, installs logging and starts the league worker.
/// Any error here must keep the plugin from activating.
pub fn start<H: Host>(
    host: H,
    config_path: Option<&Path>,
) -> Result<(LeagueOverseer<H, HttpTransport>, Option<WorkerGuard>), ConfigError> {
    load_env_file(Path::new(".env"));
    let config = load_config(config_path)?;
    let guard = logging::init_tracing(config.log_dir().as_deref());
    let transport = HttpTransport::spawn(
        &config.league_url,
        Duration::from_secs(config.request_timeout_secs),
        config.log_dir(),
    )?;
    let overseer = LeagueOverseer::new(host, transport, config)?;
    Ok((overseer, guard))
}
