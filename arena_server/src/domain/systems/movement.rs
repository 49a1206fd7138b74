use crate::domain::state::Avatar;

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    pub world_size: f32,
}

pub fn tick_avatar(a: &mut Avatar, dt: f32, cfg: MovementConfig) {
    // facing follows the last aim the client sent
    a.angle = a.intent.aim;

    // Diagonal input is normalized so it is not faster than straight movement.
    if let Some(dir) = a.intent.movement.normalized() {
        a.x += dir.x * a.speed * dt;
        a.y += dir.y * a.speed * dt;
    }

    clamp_avatar(a, cfg);
}

// Keep the whole circle inside the world.
fn clamp_avatar(a: &mut Avatar, cfg: MovementConfig) {
    let max = (cfg.world_size - a.radius).max(a.radius);
    a.x = a.x.clamp(a.radius, max);
    a.y = a.y.clamp(a.radius, max);
}
