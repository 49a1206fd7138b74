// Network adapter modules split by the game socket vs plain HTTP routes.

pub mod client;
pub mod status;

pub use client::{spawn_world_serializer, ws_handler};
pub use status::status_handler;
