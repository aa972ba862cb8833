//! Game simulation modules

pub mod chat;
pub mod combat;
pub mod flags;
pub mod hub;
pub mod intent;
pub mod physics;
pub mod registry;
pub mod rules;
pub mod snapshot;
pub mod step;
pub mod world;

pub use hub::{GameHub, HubEvent, HubHandle};
pub use intent::Intent;
pub use registry::{Frame, SessionId};
pub use world::{PlayerId, Team};
