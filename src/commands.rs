use crate::error::CommandError;
use crate::host::{tell, Host};
use crate::logging::debug_message;
use crate::match_state::MatchController;
use crate::types::*;

/// Slash commands the plugin registers with the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    Official,
    Fun,
    Cancel,
    Finish,
    Pause,
    Resume,
    Spawn,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 7] = [
        SlashCommand::Official,
        SlashCommand::Fun,
        SlashCommand::Cancel,
        SlashCommand::Finish,
        SlashCommand::Pause,
        SlashCommand::Resume,
        SlashCommand::Spawn,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim_start_matches('/');
        SlashCommand::ALL
            .iter()
            .copied()
            .find(|command| command.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            SlashCommand::Official => "official",
            SlashCommand::Fun => "fm",
            SlashCommand::Cancel => "cancel",
            SlashCommand::Finish => "finish",
            SlashCommand::Pause => "pause",
            SlashCommand::Resume => "resume",
            SlashCommand::Spawn => "spawn",
        }
    }
}

/// Guidance for built-in host commands that would bypass match officiating.
pub fn disabled_host_command_notice(message: &str) -> Option<&'static str> {
    let message = message.trim();
    if message.starts_with("/gameover") {
        return Some("** '/gameover' is disabled, please use /finish or /cancel instead **");
    }
    let rest = message.strip_prefix("/countdown")?.trim_start();
    if rest.starts_with("pause") {
        Some("** '/countdown pause' is disabled, please use /pause instead **")
    } else if rest.starts_with("resume") {
        Some("** '/countdown resume' is disabled, please use /resume instead **")
    } else if rest.starts_with(|c: char| c.is_ascii_digit()) {
        Some("** '/countdown TIME' is disabled, please use /official or /fm instead **")
    } else {
        None
    }
}

/// `[secs]` argument of `/official` and `/fm`; anything but a single value in
/// range falls back to the default.
pub fn countdown_secs(params: &[String]) -> u32 {
    match params {
        [only] => only
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|secs| (MIN_COUNTDOWN_SECS..=MAX_COUNTDOWN_SECS).contains(secs))
            .unwrap_or(DEFAULT_COUNTDOWN_SECS),
        _ => DEFAULT_COUNTDOWN_SECS,
    }
}

/// Handles a slash command from `caller_slot`. Returns false only for names
/// this plugin does not own; refusals are messaged to the caller.
pub fn handle_command(
    matches: &mut MatchController,
    host: &mut dyn Host,
    caller_slot: u32,
    name: &str,
    params: &[String],
    debug_level: u8,
) -> bool {
    let Some(command) = SlashCommand::parse(name) else {
        return false;
    };
    if let Err(err) = run_command(matches, host, caller_slot, command, params, debug_level) {
        debug_message(
            debug_level,
            format_args!("/{} refused for slot {caller_slot}: {err}", command.name()),
        );
        for line in err.to_string().lines() {
            tell(host, caller_slot, line);
        }
    }
    true
}

fn run_command(
    matches: &mut MatchController,
    host: &mut dyn Host,
    caller_slot: u32,
    command: SlashCommand,
    params: &[String],
    debug_level: u8,
) -> Result<(), CommandError> {
    let caller = host
        .lookup_by_slot(caller_slot)
        .filter(|caller| caller.verified && host.has_permission(caller_slot, SPAWN_PERMISSION))
        .ok_or_else(|| {
            CommandError::denied(format!(
                "You do not have permission to run the /{} command.",
                command.name()
            ))
        })?;

    match command {
        SlashCommand::Official => matches.start_official(host, &caller, countdown_secs(params)),
        SlashCommand::Fun => matches.start_fun(host, &caller, countdown_secs(params)),
        SlashCommand::Cancel => {
            let reason = format!("Official match cancellation requested by {}", caller.callsign);
            matches.cancel(host, &caller, &reason)
        }
        SlashCommand::Finish => matches.finish_early(host, &caller),
        SlashCommand::Pause => pause(host, &caller),
        SlashCommand::Resume => resume(host, &caller),
        SlashCommand::Spawn => grant_spawn(host, &caller, params, debug_level),
    }
}

fn pause(host: &mut dyn Host, caller: &PlayerRecord) -> Result<(), CommandError> {
    if host.is_countdown_paused() {
        return Err(CommandError::state("The match is already paused!"));
    }
    if !host.is_countdown_active() {
        return Err(CommandError::state("There is no active match to pause right now."));
    }
    host.pause_countdown(&caller.callsign);
    Ok(())
}

fn resume(host: &mut dyn Host, caller: &PlayerRecord) -> Result<(), CommandError> {
    if !host.is_countdown_paused() {
        return Err(CommandError::state("The match is not paused!"));
    }
    if !host.is_countdown_active() {
        return Err(CommandError::state("There is no active match to resume right now."));
    }
    host.resume_countdown(&caller.callsign);
    Ok(())
}

/// `/spawn #<slot>` or `/spawn <callsign with spaces>`.
fn grant_spawn(
    host: &mut dyn Host,
    caller: &PlayerRecord,
    params: &[String],
    debug_level: u8,
) -> Result<(), CommandError> {
    if !host.has_permission(caller.slot, BAN_PERMISSION) {
        return Err(CommandError::denied("You do not have permission to use the /spawn command."));
    }
    let Some(first) = params.first() else {
        return Err(CommandError::InvalidArgument("/spawn <player id or callsign>".to_string()));
    };

    let by_slot = first
        .strip_prefix('#')
        .and_then(|slot| slot.trim().parse::<u32>().ok())
        .and_then(|slot| host.lookup_by_slot(slot));
    let victim = by_slot
        .or_else(|| host.lookup_by_callsign(&params.join(" ")))
        .ok_or_else(|| CommandError::InvalidArgument(format!("player {first} not found")))?;

    host.grant_permission(victim.slot, SPAWN_PERMISSION);
    debug_message(
        debug_level,
        format_args!("{} granted spawn to {} [{}]", caller.callsign, victim.callsign, victim.identity),
    );
    host.send_message(
        Recipient::Admins,
        &format!("{} granted {} the ability to spawn.", caller.callsign, victim.callsign),
    );
    Ok(())
}
