// Wire protocol DTOs and conversions for the public game socket.
// Every message is `{"type": <camelCase tag>, "data": <payload>}`; ids travel as strings.

use crate::domain::{AvatarSnapshot, CombatEvent, ProjectileSnapshot, Vec2};
use crate::use_cases::{GameNotice, InitialState, Outbound, WorldConfig, WorldUpdate};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Sent once after Join is accepted; everything the client needs to start rendering.
    Init(InitDto),
    // Full snapshot of the world for a given tick.
    GameState(WorldUpdateDto),
    PlayerJoined(PlayerStateDto),
    PlayerLeft(PlayerLeftDto),
    PlayerHit(PlayerHitDto),
    PlayerKilled(PlayerKilledDto),
    PlayerRespawned(PlayerRespawnedDto),
    Chat(ChatDto),
}

/// Messages the client sends to the server over the WebSocket.
///
/// Same `{"type", "data"}` envelope as `ServerMessage`, except that `move` and `shoot`
/// may omit `data` (or send `null`) to mean "no payload".
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawClientMessage")]
pub enum ClientMessage {
    // Initial handshake; must be the first gameplay message.
    Join(JoinPayload),
    Input(InputPayload),
    // Angle-only control scheme (joysticks): move and face along `direction`.
    Move(MovePayload),
    Shoot(ShootPayload),
    Chat(ChatPayload),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ClientMessageKind {
    Join,
    Input,
    Move,
    Shoot,
    Chat,
}

#[derive(Debug, Deserialize)]
struct RawClientMessage {
    #[serde(rename = "type")]
    kind: ClientMessageKind,
    #[serde(default)]
    data: Option<Value>,
}

impl TryFrom<RawClientMessage> for ClientMessage {
    type Error = serde_json::Error;

    fn try_from(raw: RawClientMessage) -> Result<Self, Self::Error> {
        fn required<T: DeserializeOwned>(data: Option<Value>) -> Result<T, serde_json::Error> {
            let data =
                data.ok_or_else(|| <serde_json::Error as de::Error>::missing_field("data"))?;
            serde_json::from_value(data)
        }
        fn optional<T: DeserializeOwned + Default>(
            data: Option<Value>,
        ) -> Result<T, serde_json::Error> {
            Ok(data
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default())
        }

        Ok(match raw.kind {
            ClientMessageKind::Join => ClientMessage::Join(required(raw.data)?),
            ClientMessageKind::Input => ClientMessage::Input(required(raw.data)?),
            ClientMessageKind::Move => ClientMessage::Move(optional(raw.data)?),
            ClientMessageKind::Shoot => ClientMessage::Shoot(optional(raw.data)?),
            ClientMessageKind::Chat => ClientMessage::Chat(required(raw.data)?),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub name: String,
}

/// WASD flags as sent by keyboard clients.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct KeysDto {
    #[serde(default)]
    pub w: bool,
    #[serde(default)]
    pub a: bool,
    #[serde(default)]
    pub s: bool,
    #[serde(default)]
    pub d: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointDto {
    pub x: f32,
    pub y: f32,
}

impl From<PointDto> for Vec2 {
    fn from(p: PointDto) -> Self {
        Vec2::new(p.x, p.y)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputPayload {
    #[serde(default)]
    pub keys: Option<KeysDto>,
    // Analog movement; takes precedence over `keys` when both are present.
    #[serde(default)]
    pub vector: Option<PointDto>,
    #[serde(default)]
    pub angle: Option<f32>,
}

impl InputPayload {
    pub fn movement(&self) -> Option<Vec2> {
        if let Some(vector) = self.vector {
            return Some(vector.into());
        }
        self.keys.map(|k| {
            let axis = |neg: bool, pos: bool| f32::from(u8::from(pos)) - f32::from(u8::from(neg));
            // Screen coordinates: W is up (-Y), D is right (+X).
            Vec2::new(axis(k.a, k.d), axis(k.w, k.s))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovePayload {
    // `null` or missing stops the avatar.
    #[serde(default)]
    pub direction: Option<f32>,
}

impl MovePayload {
    pub fn movement(&self) -> Vec2 {
        self.direction.map(Vec2::from_angle).unwrap_or(Vec2::ZERO)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShootPayload {
    // Missing target fires along the current aim.
    #[serde(default)]
    pub target: Option<PointDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub text: String,
}

/// Flattened avatar state for wire transmission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateDto {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub radius: f32,
    pub health: i32,
    pub max_health: i32,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub alive: bool,
}

impl From<&AvatarSnapshot> for PlayerStateDto {
    fn from(a: &AvatarSnapshot) -> Self {
        Self {
            id: a.id.to_string(),
            name: a.name.clone(),
            x: a.x,
            y: a.y,
            angle: a.angle,
            radius: a.radius,
            health: a.health,
            max_health: a.max_health,
            score: a.score,
            kills: a.kills,
            deaths: a.deaths,
            alive: a.alive,
        }
    }
}

/// Flattened projectile state for wire transmission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileStateDto {
    pub id: String,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub radius: f32,
}

impl From<&ProjectileSnapshot> for ProjectileStateDto {
    fn from(p: &ProjectileSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            owner_id: p.owner_id.to_string(),
            x: p.x,
            y: p.y,
            angle: p.angle,
            radius: p.radius,
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub players: Vec<PlayerStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            players: update.avatars.iter().map(PlayerStateDto::from).collect(),
            projectiles: update
                .projectiles
                .iter()
                .map(ProjectileStateDto::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldConfigDto {
    pub world_size: f32,
    pub player_radius: f32,
    pub player_speed: f32,
    pub max_health: i32,
    pub bullet_radius: f32,
    pub bullet_speed: f32,
    pub bullet_damage: i32,
    pub bullet_max_distance: f32,
    pub fire_cooldown_ms: u64,
    pub respawn_delay_ms: u64,
    pub tick_rate: u32,
}

impl From<WorldConfig> for WorldConfigDto {
    fn from(c: WorldConfig) -> Self {
        Self {
            world_size: c.world_size,
            player_radius: c.avatar_radius,
            player_speed: c.avatar_speed,
            max_health: c.max_health,
            bullet_radius: c.projectile_radius,
            bullet_speed: c.projectile_speed,
            bullet_damage: c.projectile_damage,
            bullet_max_distance: c.projectile_max_distance,
            fire_cooldown_ms: c.fire_cooldown_ms,
            respawn_delay_ms: c.respawn_delay_ms,
            tick_rate: c.tick_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDto {
    pub player_id: String,
    pub tick: u64,
    pub config: WorldConfigDto,
    pub players: Vec<PlayerStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
}

impl From<InitialState> for InitDto {
    fn from(init: InitialState) -> Self {
        Self {
            player_id: init.player_id.to_string(),
            tick: init.tick,
            config: init.config.into(),
            players: init.avatars.iter().map(PlayerStateDto::from).collect(),
            projectiles: init
                .projectiles
                .iter()
                .map(ProjectileStateDto::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftDto {
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHitDto {
    pub player_id: String,
    pub attacker_id: String,
    pub health: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VictimStatsDto {
    pub score: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct KillerStatsDto {
    pub score: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKilledDto {
    pub victim_id: String,
    // Null when the shooter left before the projectile landed.
    pub killer_id: Option<String>,
    pub victim: VictimStatsDto,
    pub killer: Option<KillerStatsDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRespawnedDto {
    pub player_id: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub player_id: String,
    pub name: String,
    pub text: String,
}

impl From<CombatEvent> for ServerMessage {
    fn from(event: CombatEvent) -> Self {
        match event {
            CombatEvent::Hit {
                victim_id,
                attacker_id,
                health,
                ..
            } => ServerMessage::PlayerHit(PlayerHitDto {
                player_id: victim_id.to_string(),
                attacker_id: attacker_id.to_string(),
                health,
            }),
            CombatEvent::Killed {
                victim_id,
                killer,
                victim_score,
                victim_deaths,
            } => ServerMessage::PlayerKilled(PlayerKilledDto {
                victim_id: victim_id.to_string(),
                killer_id: killer.as_ref().map(|k| k.id.to_string()),
                victim: VictimStatsDto {
                    score: victim_score,
                    deaths: victim_deaths,
                },
                killer: killer.map(|k| KillerStatsDto {
                    score: k.score,
                    kills: k.kills,
                }),
            }),
            CombatEvent::Respawned {
                avatar_id,
                x,
                y,
                health,
            } => ServerMessage::PlayerRespawned(PlayerRespawnedDto {
                player_id: avatar_id.to_string(),
                x,
                y,
                health,
            }),
        }
    }
}

impl From<GameNotice> for ServerMessage {
    fn from(notice: GameNotice) -> Self {
        match notice {
            GameNotice::PlayerJoined(avatar) => {
                ServerMessage::PlayerJoined(PlayerStateDto::from(&avatar))
            }
            GameNotice::PlayerLeft { player_id } => ServerMessage::PlayerLeft(PlayerLeftDto {
                player_id: player_id.to_string(),
            }),
            GameNotice::Combat(event) => event.into(),
            GameNotice::Chat {
                player_id,
                name,
                text,
            } => ServerMessage::Chat(ChatDto {
                player_id: player_id.to_string(),
                name,
                text,
            }),
        }
    }
}

impl From<Outbound> for ServerMessage {
    fn from(outbound: Outbound) -> Self {
        match outbound {
            Outbound::World(update) => ServerMessage::GameState(update.into()),
            Outbound::Notice(notice) => notice.into(),
        }
    }
}
