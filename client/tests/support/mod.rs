//! A scripted stand-in for the Showdown server.
//!
//! `SimServer` holds the battle shared by every connection; each
//! `SimServer::connect` returns a fresh transport with its own outbox, the
//! way each invocation opens its own socket.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rqlink_client::{
    AssertionProvider, ClientConfig, ClientError, Credentials, Result, RoomSession, Timeouts,
    Transport,
};

pub const BATTLE_ID: &str = "battle-gen9randombattle-1";

/// What happens when a choice with the current rqid arrives
#[derive(Debug, Clone)]
pub enum Step {
    /// Play out a turn and send the next request
    Continue,
    Win(String),
    Tie,
    /// Accept the choice and never answer
    Stall,
}

#[derive(Debug)]
pub struct Battle {
    pub id: String,
    pub rqid: u64,
    pub turn: u32,
    pub script: VecDeque<Step>,
}

impl Battle {
    pub fn new(id: &str, rqid: u64) -> Self {
        Self {
            id: id.to_string(),
            rqid,
            turn: 1,
            script: VecDeque::new(),
        }
    }
}

/// What `recv` does once nothing is queued
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Idle {
    /// Stay silent
    #[default]
    Hang,
    /// The server closes the socket
    Close,
    /// The socket breaks
    Fail,
}

#[derive(Debug, Default)]
pub struct World {
    /// Every line sent by any connection, in order
    pub sent: Vec<String>,
    pub battle: Option<Battle>,
    /// /search produces a battle
    pub matchmaking: bool,
    /// The first request follows the battle's init frame
    pub first_request_on_start: bool,
    /// /join replays the room but never shows a request
    pub withhold_requests: bool,
    pub send_challstr: bool,
    pub reject_login: bool,
    /// Replay a battle room right after the challstr, as the server does for
    /// rooms the user is already in
    pub replay_on_login: bool,
    /// /join sends the request at the top of the replay frame
    pub request_in_replay: bool,
    pub idle: Idle,
    pub connections: usize,
    pub closed: usize,
}

#[derive(Clone)]
pub struct SimServer {
    world: Arc<Mutex<World>>,
}

impl SimServer {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                matchmaking: true,
                first_request_on_start: true,
                send_challstr: true,
                ..Default::default()
            })),
        }
    }

    /// A server already hosting `BATTLE_ID` at the given rqid
    pub fn with_battle(rqid: u64) -> Self {
        let server = Self::new();
        server.world().battle = Some(Battle::new(BATTLE_ID, rqid));
        server
    }

    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        let mut world = self.world();
        let battle = world.battle.as_mut().expect("no battle to script");
        battle.script.extend(steps);
    }

    pub fn sent(&self) -> Vec<String> {
        self.world().sent.clone()
    }

    pub fn connect(&self) -> SimTransport {
        let mut world = self.world();
        world.connections += 1;

        let mut outbox = VecDeque::new();
        outbox.push_back("|updateuser| Guest 4242|0|1|{}".to_string());
        if world.send_challstr {
            outbox.push_back("|challstr|4|deadbeef".to_string());
        }
        if world.replay_on_login
            && let Some(battle) = &world.battle
        {
            outbox.push_back(init_frame(battle));
        }

        SimTransport {
            world: self.world.clone(),
            outbox,
        }
    }
}

pub struct SimTransport {
    world: Arc<Mutex<World>>,
    outbox: VecDeque<String>,
}

impl Transport for SimTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        world.sent.push(text.to_string());

        let (room, command) = text.split_once('|').unwrap_or(("", text));

        if let Some(login) = command.strip_prefix("/trn ") {
            let name = login.split(',').next().unwrap_or_default();
            if world.reject_login {
                self.outbox
                    .push_back(format!("|nametaken|{}|Your assertion was invalid.", name));
            } else {
                self.outbox.push_back(format!("|updateuser| {}|1|1|{{}}", name));
            }
        } else if let Some(format) = command.strip_prefix("/search ") {
            if world.matchmaking {
                let battle = Battle::new(&format!("battle-{}-1", format), 1);
                self.outbox.push_back(init_frame(&battle));
                if world.first_request_on_start {
                    self.outbox.push_back(request_frame(&battle));
                }
                world.battle = Some(battle);
            }
        } else if let Some(target) = command.strip_prefix("/join ") {
            match &world.battle {
                Some(battle) if battle.id == target && world.request_in_replay => {
                    let replay = init_frame(battle);
                    let (header, log) = replay.split_once('\n').unwrap_or((replay.as_str(), ""));
                    self.outbox.push_back(format!(
                        "{}\n|request|{}\n{}",
                        header,
                        request_json(battle.rqid),
                        log
                    ));
                }
                Some(battle) if battle.id == target => {
                    self.outbox.push_back(init_frame(battle));
                    if !world.withhold_requests {
                        self.outbox.push_back(request_frame(battle));
                    }
                }
                _ => self.outbox.push_back(format!(
                    ">{}\n|noinit|nonexistent|The room \"{}\" does not exist.",
                    target, target
                )),
            }
        } else if let Some(choice) = command.strip_prefix("/choose ") {
            let (_, rqid) = choice.rsplit_once('|').unwrap_or((choice, ""));
            let battle = world.battle.as_mut().expect("choice without a battle");
            assert_eq!(battle.id, room);

            if rqid.parse::<u64>().ok() != Some(battle.rqid) {
                self.outbox.push_back(format!(
                    ">{}\n|error|[Invalid choice] Sorry, too late to make a different move; the next turn has already started",
                    room
                ));
                return Ok(());
            }

            match battle.script.pop_front().unwrap_or(Step::Continue) {
                Step::Continue => {
                    battle.turn += 1;
                    battle.rqid += 1;
                    self.outbox.push_back(format!(
                        ">{}\n|\n|move|p1a: Pikachu|Thunderbolt|p2a: Gyarados\n|-supereffective|p2a: Gyarados\n|-damage|p2a: Gyarados|12/100\n|upkeep\n|turn|{}",
                        room, battle.turn
                    ));
                    let next = request_frame(battle);
                    self.outbox.push_back(next);
                }
                Step::Win(winner) => {
                    self.outbox.push_back(format!(
                        ">{}\n|\n|move|p1a: Pikachu|Thunderbolt|p2a: Gyarados\n|-damage|p2a: Gyarados|0 fnt\n|faint|p2a: Gyarados",
                        room
                    ));
                    self.outbox.push_back(format!(">{}\n|\n|win|{}", room, winner));
                }
                Step::Tie => {
                    self.outbox.push_back(format!(">{}\n|\n|tie", room));
                }
                Step::Stall => {}
            }
        }

        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        if let Some(frame) = self.outbox.pop_front() {
            return Ok(Some(frame));
        }
        let idle = self.world.lock().unwrap().idle;
        match idle {
            Idle::Hang => std::future::pending().await,
            Idle::Close => Ok(None),
            Idle::Fail => Err(ClientError::Connection("connection reset by peer".to_string())),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.world.lock().unwrap().closed += 1;
        Ok(())
    }
}

pub fn init_frame(battle: &Battle) -> String {
    format!(
        ">{}\n|init|battle\n|title|Ash vs. Gary\n|j|☆Ash\n|j|☆Gary\n|player|p1|Ash|1|\n|player|p2|Gary|2|\n|start\n|switch|p1a: Pikachu|Pikachu, L88, M|100/100\n|switch|p2a: Gyarados|Gyarados, L80, F|100/100\n|turn|{}",
        battle.id, battle.turn
    )
}

pub fn request_json(rqid: u64) -> String {
    format!(
        r#"{{"active":[{{"moves":[{{"move":"Thunderbolt","id":"thunderbolt","pp":24,"maxpp":24,"target":"normal","disabled":false}},{{"move":"Quick Attack","id":"quickattack","pp":48,"maxpp":48,"target":"normal","disabled":false}}],"canTerastallize":"Electric"}}],"side":{{"name":"Ash","id":"p1","pokemon":[{{"ident":"p1: Pikachu","details":"Pikachu, L88, M","condition":"211/211","active":true}},{{"ident":"p1: Squirtle","details":"Squirtle, L95, F","condition":"250/250","active":false}}]}},"rqid":{}}}"#,
        rqid
    )
}

pub fn request_frame(battle: &Battle) -> String {
    format!(">{}\n|request|{}", battle.id, request_json(battle.rqid))
}

/// Hands out a fixed assertion, or rejects every login
pub struct FixedAssertion(pub Option<&'static str>);

impl AssertionProvider for FixedAssertion {
    async fn assertion(
        &self,
        _username: &str,
        _password: Option<&str>,
        challstr: &str,
    ) -> Result<String> {
        assert_eq!(challstr, "4|deadbeef");
        self.0
            .map(str::to_string)
            .ok_or_else(|| ClientError::AuthRejected("Wrong password.".to_string()))
    }
}

pub fn config(state_dir: &Path) -> ClientConfig {
    ClientConfig {
        state_path: state_dir.join("state.json"),
        timeouts: Timeouts {
            auth_secs: 2,
            refresh_secs: 1,
            ..Timeouts::default()
        },
        ..ClientConfig::default()
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "Ash".to_string(),
        password: Some("pikachu".to_string()),
        server_url: "ws://sim.test/showdown/websocket".to_string(),
    }
}

pub fn session(server: &SimServer, state_dir: &Path) -> RoomSession<SimTransport, FixedAssertion> {
    RoomSession::new(
        config(state_dir),
        credentials(),
        server.connect(),
        FixedAssertion(Some("signed-assertion")),
    )
}

pub const SHORT: Duration = Duration::from_millis(300);
pub const LONG: Duration = Duration::from_secs(2);
