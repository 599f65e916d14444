/// Tile-based action adventure core: grid collision, A* pursuit, combat
/// and actor state machines over a fixed-timestep world.
///
/// `sim::step::tick` advances a `sim::world::World` by one frame and
/// returns what happened as `GameEvent`s. Presentation and input live in
/// `ui` behind the `terminal` feature.

pub mod config;
pub mod domain;
pub mod logging;
pub mod sim;
#[cfg(feature = "terminal")]
pub mod ui;
