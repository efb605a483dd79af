//! Random Battle Example
//!
//! Plays one gen9randombattle to the end, one invocation per decision, the
//! way an external driver would: every step opens its own connection and
//! picks up where the state file left off.

use anyhow::Result;
use rand::seq::SliceRandom;
use rqlink_client::{
    BattleOptions, ChooseResult, ClientConfig, Credentials, RoomSession, StateStore,
};

fn pick_choice(options: &BattleOptions) -> Option<String> {
    let mut rng = rand::thread_rng();

    if options.team_preview {
        return Some("default".to_string());
    }

    let mut choices: Vec<String> = Vec::new();
    if !options.force_switch {
        choices.extend(options.moves.iter().map(|m| format!("move {}", m.slot)));
    }
    if options.force_switch || (choices.is_empty() && !options.trapped) {
        choices.extend(options.switches.iter().map(|s| format!("switch {}", s.slot)));
    }

    choices.choose(&mut rng).cloned()
}

#[tokio::main]
async fn main() -> Result<()> {
    let username = std::env::var("PS_USERNAME").expect("Set PS_USERNAME environment variable");
    let password = std::env::var("PS_PASSWORD").ok();

    let config = ClientConfig::default();
    let state = StateStore::new(config.state_path.clone()).load();
    let credentials = Credentials::resolve(
        Some(username),
        password,
        None,
        &config,
        state.as_ref(),
    )?;
    let timeouts = config.timeouts;

    println!("Searching for a random battle...");
    let started = RoomSession::connect(config.clone(), credentials.clone())
        .await?
        .start(
            "gen9randombattle",
            None,
            timeouts.search(),
            timeouts.first_request(),
        )
        .await?;
    println!("Joined battle: {}", started.battle_id);

    let mut options = started.options;
    if started.rqid.is_none() {
        let polled = RoomSession::connect(config.clone(), credentials.clone())
            .await?
            .poll(None, timeouts.poll())
            .await?;
        options = polled.options;
    }

    loop {
        if options.wait {
            println!("Waiting for opponent...");
            let polled = RoomSession::connect(config.clone(), credentials.clone())
                .await?
                .poll(None, timeouts.poll())
                .await?;
            options = polled.options;
            continue;
        }

        let Some(choice) = pick_choice(&options) else {
            println!("Nothing to choose");
            return Ok(());
        };
        println!("Choosing: {}", choice);

        let chosen = RoomSession::connect(config.clone(), credentials.clone())
            .await?
            .choose(None, &choice, None, true, timeouts.choose())
            .await?;
        if let Some(turn) = chosen.turn {
            println!("=== Turn {} ===", turn);
        }

        match chosen.result {
            ChooseResult::Request {
                options: next, ..
            } => options = next,
            ChooseResult::Finished { winner, tie } => {
                match (winner, tie) {
                    (_, true) => println!("Tie"),
                    (Some(winner), _) => println!("Winner: {}", winner),
                    (None, _) => println!("Battle over"),
                }
                return Ok(());
            }
        }
    }
}
