use crate::host::{broadcast, Host};
use crate::league::{classify_response, JobId, JobKind, JobOutcome, JobTransport, LeagueResponse};
use crate::logging::debug_message;
use crate::types::*;
use tracing::{error, info, warn};

pub const MATCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the report is played from, as the league sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOrigin {
    pub server: String,
    pub port: u16,
    /// Only set for rotational leagues.
    pub map_played: Option<String>,
}

impl ReportOrigin {
    pub fn from_host(host: &dyn Host, map_played: Option<&str>) -> Self {
        ReportOrigin {
            server: host.public_address(),
            port: host.public_port(),
            map_played: map_played.map(str::to_string),
        }
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Whole minutes of the planned time limit.
pub fn duration_minutes(snapshot: &MatchSnapshot) -> u64 {
    (snapshot.duration_secs.max(0.0) / 60.0) as u64
}

/// Escaped identities of everyone who played for `color`, comma separated.
pub fn identity_list(snapshot: &MatchSnapshot, color: TeamColor) -> String {
    snapshot
        .participants_on(color)
        .map(|participant| encode(&participant.identity))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn build_report_payload(snapshot: &MatchSnapshot, origin: &ReportOrigin) -> String {
    let match_time = snapshot.ended_at.format(MATCH_TIME_FORMAT).to_string();
    let mut body = String::from("query=reportMatch");
    body.push_str(&format!("&teamOneWins={}", snapshot.team_one_points));
    body.push_str(&format!("&teamTwoWins={}", snapshot.team_two_points));
    body.push_str(&format!("&duration={}", duration_minutes(snapshot)));
    body.push_str(&format!("&matchTime={}", encode(&match_time)));
    body.push_str(&format!("&server={}", encode(&origin.server)));
    body.push_str(&format!("&port={}", origin.port));
    if let Some(map) = &origin.map_played {
        body.push_str(&format!("&mapPlayed={}", encode(map)));
    }
    body.push_str(&format!(
        "&teamOnePlayers={}",
        identity_list(snapshot, snapshot.teams.team_one)
    ));
    body.push_str(&format!(
        "&teamTwoPlayers={}",
        identity_list(snapshot, snapshot.teams.team_two)
    ));
    body
}

/// Writes the match report block to the server log.
pub fn log_match_report(snapshot: &MatchSnapshot) {
    let teams = snapshot.teams;
    info!("Match Data :: {PLUGIN_NAME} Match Report");
    info!("Match Data :: -----------------------------");
    info!(
        "Match Data :: Match Time      : {}",
        snapshot.ended_at.format(MATCH_TIME_FORMAT)
    );
    info!("Match Data :: Duration        : {}", duration_minutes(snapshot));
    info!("Match Data :: {:<7} Score  : {}", teams.team_one, snapshot.team_one_points);
    info!("Match Data :: {:<7} Score  : {}", teams.team_two, snapshot.team_two_points);
    for color in [teams.team_one, teams.team_two] {
        info!("Match Data :: {color} Team Players");
        for participant in snapshot.participants_on(color) {
            info!(
                "Match Data ::  {} [{}] ({})",
                participant.callsign, participant.identity, participant.ip_address
            );
        }
    }
    info!("Match Data :: -----------------------------");
    info!("Match Data :: End of Match Report");
}

/// Logs the report, tells the players and queues the submission. Never waits
/// on the league.
pub fn submit_report(
    host: &mut dyn Host,
    transport: &mut dyn JobTransport,
    snapshot: &MatchSnapshot,
    map_played: Option<&str>,
    debug_level: u8,
) -> JobId {
    let origin = ReportOrigin::from_host(host, map_played);
    log_match_report(snapshot);
    debug_message(debug_level, format_args!("Reporting match data..."));
    broadcast(host, "Reporting match...");

    transport.dispatch(JobKind::ReportMatch, build_report_payload(snapshot, &origin))
}

/// Handles the league's answer to a match report. Nothing is retried.
pub fn handle_report_completion(host: &mut dyn Host, outcome: &JobOutcome, debug_level: u8) {
    match outcome {
        JobOutcome::Done(body) => {
            debug_message(
                debug_level,
                format_args!("URL Job Successful! Data returned: {body}"),
            );
            match classify_response(body) {
                Ok(LeagueResponse::Text(text)) => {
                    for line in text.lines().filter(|line| !line.trim().is_empty()) {
                        broadcast(host, line);
                    }
                    debug_message(debug_level, format_args!("{text}"));
                }
                Ok(LeagueResponse::Structured(json)) => {
                    debug_message(debug_level, format_args!("structured league response: {json}"));
                }
                Err(err) => warn!(error = %err, "unusable match report response"),
            }
        }
        JobOutcome::Timeout => {
            warn!("The request to the league site has timed out.");
        }
        JobOutcome::Error { code, message } => {
            error!(code = *code, "Match report failed with the following error: {message}");
        }
    }
}
