use crate::error::CommandError;
use crate::host::{broadcast, competitor_count, Host};
use crate::logging::debug_message;
use crate::types::*;
use chrono::{DateTime, Utc};

/// Live state of a Fun or Official match.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchState {
    /// Server time of the game-start event; `None` during the countdown.
    pub start_time: Option<f64>,
    pub planned_duration: f64,
    pub team_one_points: u32,
    pub team_two_points: u32,
    pub canceled: bool,
    pub cancel_reason: String,
    pub participants_recorded: bool,
    pub participants: Vec<Participant>,
    pub team_names: TeamNames,
    /// Seconds after start when the next roll call is due.
    pub roll_call_delay: f64,
}

impl MatchState {
    pub fn new(roll_call_delay: f64) -> Self {
        MatchState {
            start_time: None,
            planned_duration: 0.0,
            team_one_points: 0,
            team_two_points: 0,
            canceled: false,
            cancel_reason: String::new(),
            participants_recorded: false,
            participants: Vec::new(),
            team_names: TeamNames::default(),
            roll_call_delay,
        }
    }

    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.start_time.map(|start| now - start)
    }

    pub fn mark_canceled(&mut self, reason: &str) {
        self.canceled = true;
        self.cancel_reason = reason.to_string();
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Match {
    #[default]
    Inactive,
    Fun(MatchState),
    Official(MatchState),
}

impl Match {
    pub fn state(&self) -> Option<&MatchState> {
        match self {
            Match::Inactive => None,
            Match::Fun(state) | Match::Official(state) => Some(state),
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut MatchState> {
        match self {
            Match::Inactive => None,
            Match::Fun(state) | Match::Official(state) => Some(state),
        }
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self, Match::Inactive)
    }

    pub fn is_official(&self) -> bool {
        matches!(self, Match::Official(_))
    }
}

/// Owns the single live match and every transition it goes through.
#[derive(Debug)]
pub struct MatchController {
    current: Match,
    teams: TeamAssignment,
    roll_call_delay: f64,
    debug_level: u8,
}

impl MatchController {
    pub fn new(teams: TeamAssignment, roll_call_delay: f64, debug_level: u8) -> Self {
        MatchController {
            current: Match::Inactive,
            teams,
            roll_call_delay,
            debug_level,
        }
    }

    pub fn current(&self) -> &Match {
        &self.current
    }

    pub fn teams(&self) -> TeamAssignment {
        self.teams
    }

    pub fn official_mut(&mut self) -> Option<&mut MatchState> {
        match &mut self.current {
            Match::Official(state) => Some(state),
            _ => None,
        }
    }

    fn ensure_idle(&self, host: &dyn Host) -> Result<(), CommandError> {
        if !self.current.is_inactive() || host.is_countdown_active() || host.is_countdown_in_progress() {
            return Err(CommandError::state(
                "There is already a game in progress; you cannot start another.",
            ));
        }
        Ok(())
    }

    pub fn start_fun(
        &mut self,
        host: &mut dyn Host,
        initiator: &PlayerRecord,
        countdown_secs: u32,
    ) -> Result<(), CommandError> {
        if initiator.is_observer() {
            return Err(CommandError::denied("Observers are not allowed to start matches."));
        }
        self.ensure_idle(host)?;

        self.current = Match::Fun(MatchState::new(self.roll_call_delay));
        debug_message(
            self.debug_level,
            format_args!("Fun match started by {} ({}).", initiator.callsign, initiator.ip_address),
        );
        broadcast(host, &format!("Fun match started by {}.", initiator.callsign));
        let time_limit = host.time_limit();
        host.start_countdown(countdown_secs, time_limit, "Server");
        Ok(())
    }

    pub fn start_official(
        &mut self,
        host: &mut dyn Host,
        initiator: &PlayerRecord,
        countdown_secs: u32,
    ) -> Result<(), CommandError> {
        if initiator.is_observer() {
            return Err(CommandError::denied("Observers are not allowed to start matches."));
        }
        if host.team_count(self.teams.team_one) < MIN_OFFICIAL_TEAM_SIZE
            || host.team_count(self.teams.team_two) < MIN_OFFICIAL_TEAM_SIZE
        {
            return Err(CommandError::state(
                "You may not have an official match with less than 2 players per team.",
            ));
        }
        self.ensure_idle(host)?;

        self.current = Match::Official(MatchState::new(self.roll_call_delay));
        debug_message(
            self.debug_level,
            format_args!("Official match started by {} ({}).", initiator.callsign, initiator.ip_address),
        );
        broadcast(host, &format!("Official match started by {}.", initiator.callsign));
        let time_limit = host.time_limit();
        host.start_countdown(countdown_secs, time_limit, "Server");
        Ok(())
    }

    pub fn cancel(&mut self, host: &mut dyn Host, initiator: &PlayerRecord, reason: &str) -> Result<(), CommandError> {
        if initiator.is_observer() {
            return Err(CommandError::denied("Observers are not allowed to cancel matches."));
        }
        if host.is_countdown_in_progress() {
            return Err(CommandError::state("You may only cancel a match after it has started."));
        }
        if !host.is_countdown_active() {
            return Err(CommandError::state("There is no match in progress to cancel."));
        }

        match &mut self.current {
            Match::Official(state) => state.mark_canceled(reason),
            _ => broadcast(host, &format!("Fun match ended by {}", initiator.callsign)),
        }
        debug_message(
            self.debug_level,
            format_args!("Match ended by {} ({}).", initiator.callsign, initiator.ip_address),
        );
        host.end_game();
        Ok(())
    }

    pub fn finish_early(&mut self, host: &mut dyn Host, initiator: &PlayerRecord) -> Result<(), CommandError> {
        if initiator.is_observer() {
            return Err(CommandError::denied("Observers are not allowed to end matches."));
        }
        if host.is_countdown_in_progress() {
            return Err(CommandError::state("You may only end a match after it has started."));
        }
        if !host.is_countdown_active() {
            return Err(CommandError::state("There is no match in progress to end."));
        }
        let Match::Official(state) = &self.current else {
            return Err(CommandError::state("You cannot /finish a fun match. Use /cancel instead."));
        };

        let half_played = state
            .elapsed(host.current_time())
            .map(|elapsed| elapsed >= state.planned_duration / 2.0)
            .unwrap_or(false);
        if !half_played {
            return Err(CommandError::state(
                "Sorry, I cannot automatically report a match less than half way through.\n\
                 Please use the /cancel command and message a referee for review of this match.",
            ));
        }

        debug_message(
            self.debug_level,
            format_args!("Official match ended early by {} ({})", initiator.callsign, initiator.ip_address),
        );
        broadcast(host, &format!("Official match ended early by {}", initiator.callsign));
        host.end_game();
        Ok(())
    }

    pub fn on_capture(&mut self, capping: TeamColor) {
        let teams = self.teams;
        let Some(state) = self.current.state_mut() else {
            return;
        };
        if capping == teams.team_one {
            state.team_one_points += 1;
        } else if capping == teams.team_two {
            state.team_two_points += 1;
        }
    }

    /// Countdown elapsed. Captures made during the countdown are discarded.
    pub fn on_game_start(&mut self, host: &dyn Host) {
        let Some(state) = self.current.state_mut() else {
            return;
        };
        state.team_one_points = 0;
        state.team_two_points = 0;
        state.start_time = Some(host.current_time());
        state.planned_duration = host.time_limit();
    }

    /// Auto-cancels an official match once no competitor is left and ends any
    /// running game. Returns whether anything was done.
    pub fn on_all_players_left(&mut self, host: &mut dyn Host) -> bool {
        if competitor_count(host) > 0 {
            return false;
        }
        let mut acted = false;
        if let Match::Official(state) = &mut self.current {
            if !state.canceled {
                state.mark_canceled(ALL_PLAYERS_LEFT_REASON);
                acted = true;
            }
        }
        if host.is_countdown_active() {
            host.end_game();
            acted = true;
        }
        acted
    }

    /// Classifies the finished game and resets to Inactive.
    pub fn on_game_end(&mut self, ended_at: DateTime<Utc>) -> MatchOutcome {
        let finished = std::mem::take(&mut self.current);
        match finished {
            Match::Inactive | Match::Fun(_) => MatchOutcome::FunMatchCompleted,
            Match::Official(state) if state.canceled => MatchOutcome::OfficialCanceled {
                reason: state.cancel_reason,
                team_names: state.team_names,
            },
            Match::Official(state) if state.participants.is_empty() => {
                MatchOutcome::OfficialMissingParticipants {
                    team_names: state.team_names,
                }
            }
            Match::Official(state) => MatchOutcome::OfficialCompleted(MatchSnapshot {
                teams: self.teams,
                team_names: state.team_names,
                team_one_points: state.team_one_points,
                team_two_points: state.team_two_points,
                duration_secs: state.planned_duration,
                ended_at,
                participants: state.participants,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    fn controller() -> MatchController {
        MatchController::new(
            TeamAssignment {
                team_one: TeamColor::Red,
                team_two: TeamColor::Blue,
            },
            DEFAULT_ROLL_CALL_SECS,
            0,
        )
    }

    fn participant(identity: &str, color: TeamColor) -> Participant {
        Participant {
            identity: identity.to_string(),
            callsign: format!("player-{identity}"),
            ip_address: "10.0.0.1".to_string(),
            team_name: String::new(),
            team_color: color,
        }
    }

    /// Official match whose game has been running for `elapsed` seconds.
    fn running_official(host: &mut FakeHost, elapsed: f64) -> MatchController {
        let mut matches = controller();
        let caller = host.player(1);
        matches.start_official(host, &caller, 10).unwrap();
        host.finish_countdown();
        matches.on_game_start(host);
        host.now += elapsed;
        matches
    }

    #[test]
    fn test_official_needs_two_per_team() {
        let mut host = FakeHost::new();
        host.add_player(1, "101", "alpha", TeamColor::Red);
        host.add_player(2, "102", "bravo", TeamColor::Red);
        host.add_player(3, "201", "charlie", TeamColor::Blue);
        let caller = host.player(1);
        let mut matches = controller();

        let err = matches.start_official(&mut host, &caller, 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You may not have an official match with less than 2 players per team."
        );
        assert!(matches.current().is_inactive());
        assert!(host.countdowns_started.is_empty());

        host.add_player(4, "202", "delta", TeamColor::Blue);
        matches.start_official(&mut host, &caller, 10).unwrap();
        assert!(matches.current().is_official());
        assert_eq!(host.countdowns_started, vec![10]);
        assert_eq!(
            host.last_message_to(Recipient::All).as_deref(),
            Some("Official match started by alpha.")
        );
    }

    #[test]
    fn test_observers_cannot_start_matches() {
        let mut host = FakeHost::with_two_on_two();
        let observer = host.add_player(9, "909", "watcher", TeamColor::Observer);
        let mut matches = controller();
        assert!(matches!(
            matches.start_fun(&mut host, &observer, 10),
            Err(CommandError::PermissionDenied(_))
        ));
        assert!(matches!(
            matches.start_official(&mut host, &observer, 10),
            Err(CommandError::PermissionDenied(_))
        ));
        assert!(matches.current().is_inactive());
    }

    #[test]
    fn test_only_one_match_at_a_time() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let mut matches = controller();
        matches.start_fun(&mut host, &caller, 10).unwrap();
        let err = matches.start_official(&mut host, &caller, 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "There is already a game in progress; you cannot start another."
        );
        assert!(matches!(matches.current(), Match::Fun(_)));
        assert_eq!(host.countdowns_started.len(), 1);
    }

    #[test]
    fn test_cannot_start_over_host_countdown() {
        let mut host = FakeHost::with_two_on_two();
        host.finish_countdown();
        let caller = host.player(1);
        let mut matches = controller();
        assert!(matches.start_fun(&mut host, &caller, 10).is_err());
        assert!(matches.current().is_inactive());
    }

    #[test]
    fn test_game_start_discards_countdown_captures() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let mut matches = controller();
        matches.start_official(&mut host, &caller, 10).unwrap();
        matches.on_capture(TeamColor::Red);
        matches.on_capture(TeamColor::Blue);
        matches.on_capture(TeamColor::Red);

        host.finish_countdown();
        matches.on_game_start(&host);
        let state = matches.current().state().unwrap();
        assert_eq!((state.team_one_points, state.team_two_points), (0, 0));
        assert_eq!(state.start_time, Some(host.now));
        assert_eq!(state.planned_duration, 900.0);
    }

    #[test]
    fn test_captures_ignored_without_match() {
        let mut matches = controller();
        matches.on_capture(TeamColor::Red);
        assert!(matches.current().is_inactive());
    }

    #[test]
    fn test_captures_count_for_fun_matches() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(3);
        let mut matches = controller();
        matches.start_fun(&mut host, &caller, 5).unwrap();
        host.finish_countdown();
        matches.on_game_start(&host);
        matches.on_capture(TeamColor::Blue);
        matches.on_capture(TeamColor::Green);
        let state = matches.current().state().unwrap();
        assert_eq!((state.team_one_points, state.team_two_points), (0, 1));
    }

    #[test]
    fn test_cancel_rejected_during_countdown() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let mut matches = controller();
        matches.start_official(&mut host, &caller, 10).unwrap();
        let err = matches.cancel(&mut host, &caller, "requested").unwrap_err();
        assert_eq!(err.to_string(), "You may only cancel a match after it has started.");
        assert_eq!(host.games_ended, 0);
    }

    #[test]
    fn test_cancel_marks_official_and_ends_game() {
        let mut host = FakeHost::with_two_on_two();
        let mut matches = running_official(&mut host, 60.0);
        let caller = host.player(2);
        matches
            .cancel(&mut host, &caller, "Official match cancellation requested by bravo")
            .unwrap();
        assert_eq!(host.games_ended, 1);
        let outcome = matches.on_game_end(host.utc);
        assert_eq!(
            outcome,
            MatchOutcome::OfficialCanceled {
                reason: "Official match cancellation requested by bravo".to_string(),
                team_names: TeamNames::default(),
            }
        );
        assert!(matches.current().is_inactive());
    }

    #[test]
    fn test_cancel_fun_match_announces() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let mut matches = controller();
        matches.start_fun(&mut host, &caller, 10).unwrap();
        host.finish_countdown();
        matches.on_game_start(&host);
        matches.cancel(&mut host, &caller, "ignored").unwrap();
        assert_eq!(
            host.last_message_to(Recipient::All).as_deref(),
            Some("Fun match ended by alpha")
        );
        assert_eq!(matches.on_game_end(host.utc), MatchOutcome::FunMatchCompleted);
    }

    #[test]
    fn test_cancel_without_game() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let err = controller().cancel(&mut host, &caller, "x").unwrap_err();
        assert_eq!(err.to_string(), "There is no match in progress to cancel.");
    }

    #[test]
    fn test_finish_before_half_is_rejected() {
        let mut host = FakeHost::with_two_on_two();
        let mut matches = running_official(&mut host, 300.0);
        let caller = host.player(1);
        let err = matches.finish_early(&mut host, &caller).unwrap_err();
        let lines: Vec<String> = err.to_string().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("/cancel"));
        assert_eq!(host.games_ended, 0);
        assert!(matches.current().is_official());
    }

    #[test]
    fn test_finish_at_half_completes() {
        let mut host = FakeHost::with_two_on_two();
        let mut matches = running_official(&mut host, 450.0);
        matches.official_mut().unwrap().participants = vec![
            participant("101", TeamColor::Red),
            participant("201", TeamColor::Blue),
        ];
        matches.on_capture(TeamColor::Red);
        let caller = host.player(1);
        matches.finish_early(&mut host, &caller).unwrap();
        assert_eq!(host.games_ended, 1);

        match matches.on_game_end(host.utc) {
            MatchOutcome::OfficialCompleted(snapshot) => {
                assert_eq!(snapshot.team_one_points, 1);
                assert_eq!(snapshot.team_two_points, 0);
                assert_eq!(snapshot.duration_secs, 900.0);
                assert_eq!(snapshot.participants.len(), 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_finish_rejects_fun_matches() {
        let mut host = FakeHost::with_two_on_two();
        let caller = host.player(1);
        let mut matches = controller();
        matches.start_fun(&mut host, &caller, 10).unwrap();
        host.finish_countdown();
        matches.on_game_start(&host);
        let err = matches.finish_early(&mut host, &caller).unwrap_err();
        assert_eq!(err.to_string(), "You cannot /finish a fun match. Use /cancel instead.");
    }

    #[test]
    fn test_all_players_leaving_cancels_official() {
        let mut host = FakeHost::with_two_on_two();
        let mut matches = running_official(&mut host, 120.0);
        assert!(!matches.on_all_players_left(&mut host));

        host.remove_competitors();
        assert!(matches.on_all_players_left(&mut host));
        assert_eq!(host.games_ended, 1);
        assert_eq!(
            matches.on_game_end(host.utc),
            MatchOutcome::OfficialCanceled {
                reason: ALL_PLAYERS_LEFT_REASON.to_string(),
                team_names: TeamNames::default(),
            }
        );
    }

    #[test]
    fn test_missing_participants_outcome() {
        let mut host = FakeHost::with_two_on_two();
        let mut matches = running_official(&mut host, 900.0);
        assert_eq!(
            matches.on_game_end(host.utc),
            MatchOutcome::OfficialMissingParticipants {
                team_names: TeamNames::default(),
            }
        );
        assert!(matches.current().is_inactive());
    }

    #[test]
    fn test_game_end_without_match_is_fun() {
        let mut matches = controller();
        assert_eq!(
            matches.on_game_end(FakeHost::new().utc),
            MatchOutcome::FunMatchCompleted
        );
    }
}
