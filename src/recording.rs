use crate::types::MatchOutcome;
use chrono::{DateTime, Utc};

/// File name for the demo of a match that just ended.
pub fn recording_file_name(outcome: &MatchOutcome, ended_at: DateTime<Utc>) -> String {
    let (names, canceled) = match outcome {
        MatchOutcome::FunMatchCompleted => {
            return format!("Fun_Match-{}.rec", ended_at.format("%Y%m%d-%H%M"));
        }
        MatchOutcome::OfficialCanceled { team_names, .. } => (team_names, true),
        MatchOutcome::OfficialMissingParticipants { team_names } => (team_names, false),
        MatchOutcome::OfficialCompleted(snapshot) => (&snapshot.team_names, false),
    };
    format!(
        "Official-{}-{}-vs-{}-{}{}.rec",
        ended_at.format("%Y%m%d"),
        file_safe(&names.team_one),
        file_safe(&names.team_two),
        ended_at.format("%H%M"),
        if canceled { "-Canceled" } else { "" }
    )
}

// Team labels come from the league and must not escape the recordings directory.
fn file_safe(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamNames;
    use chrono::TimeZone;

    fn ended_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 4, 9, 5, 0).unwrap()
    }

    #[test]
    fn test_fun_match_name() {
        assert_eq!(
            recording_file_name(&MatchOutcome::FunMatchCompleted, ended_at()),
            "Fun_Match-20150304-0905.rec"
        );
    }

    #[test]
    fn test_canceled_official_name() {
        let outcome = MatchOutcome::OfficialCanceled {
            reason: "requested".to_string(),
            team_names: TeamNames {
                team_one: "Lords of Chaos".to_string(),
                team_two: "Dragon Riders".to_string(),
            },
        };
        assert_eq!(
            recording_file_name(&outcome, ended_at()),
            "Official-20150304-Lords of Chaos-vs-Dragon Riders-0905-Canceled.rec"
        );
    }

    #[test]
    fn test_unnamed_official_uses_defaults() {
        let outcome = MatchOutcome::OfficialMissingParticipants {
            team_names: TeamNames::default(),
        };
        assert_eq!(
            recording_file_name(&outcome, ended_at()),
            "Official-20150304-Team-A-vs-Team-B-0905.rec"
        );
    }

    #[test]
    fn test_separators_are_replaced() {
        let outcome = MatchOutcome::OfficialMissingParticipants {
            team_names: TeamNames {
                team_one: "../etc".to_string(),
                team_two: "a\\b".to_string(),
            },
        };
        assert_eq!(
            recording_file_name(&outcome, ended_at()),
            "Official-20150304-.._etc-vs-a_b-0905.rec"
        );
    }
}
