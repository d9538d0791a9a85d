use std::io::{self, Write};

use itertools::Itertools;
use regex::Regex;
use types::{game_state::PublicInfo, Player, PlayerId, Stage, Strategy};

/// Asks a human on stdin. Accepts `target <id>` or `abstain`.
#[derive(Debug, Default)]
pub struct InputStrategy {}

impl Strategy for InputStrategy {
    fn select_target(&mut self, me: &Player, public_info: &PublicInfo) -> Option<PlayerId> {
        print_public_info(public_info);
        println!(
            "You are {me}, {}",
            me.role
                .map(|r| r.to_string())
                .unwrap_or("without a role".to_string())
        );

        let mut buf = String::new();
        loop {
            match select_target_from_stdin(&mut buf, public_info) {
                Ok(target) => return target,
                Err(err) => {
                    buf.clear();
                    log::error!("Error parsing message from stdin: {err}")
                }
            }
        }
    }

    fn observe_investigation(&mut self, target: PlayerId, is_mafia: bool) {
        if is_mafia {
            println!("#{target} is mafia!");
        } else {
            println!("#{target} is not mafia.");
        }
    }
}

fn print_public_info(info: &PublicInfo) {
    println!("Game {} turn {}: {}", info.game_id, info.turn_count, info.stage);
    println!("Alive: [ {} ]", info.living.iter().join(", "));
    if !info.dead.is_empty() {
        println!("Dead: [ {} ]", info.dead.iter().join(", "));
    }
    if info.stage == Stage::Day {
        for vote in info.day_votes.iter() {
            println!("  {vote}");
        }
    }
}

fn select_target_from_stdin(
    buf: &mut String,
    info: &PublicInfo,
) -> Result<Option<PlayerId>, String> {
    print!("Your move? >> ");
    let _ = io::stdout().flush();
    match io::stdin().read_line(buf) {
        Ok(_) => target_from_str(buf, info),
        Err(err) => {
            buf.clear();
            Err(format!("Error reading line from stdin: {err}"))
        }
    }
}

fn target_from_str(input: &str, info: &PublicInfo) -> Result<Option<PlayerId>, String> {
    let input = input.trim().to_lowercase();

    let abstain = Regex::new(r"^(abstain|none|pass)$").expect("Valid abstain regex");
    if abstain.is_match(&input) {
        return Ok(None);
    }

    let target = Regex::new(r"^(?:target\s+)?#?(?<id>\d+)$").expect("Valid target regex");
    let captures = target
        .captures(&input)
        .ok_or(format!("Could not understand {input:?}"))?;
    let id: PlayerId = captures["id"]
        .parse()
        .map_err(|err| format!("Bad player id: {err}"))?;
    if info.living.contains(&id) || info.dead.contains(&id) {
        Ok(Some(id))
    } else {
        Err(format!("No player #{id} in this game"))
    }
}
