pub mod ai;
pub mod collision;
pub mod entity;
pub mod geometry;
pub mod item;
pub mod pathfind;
pub mod rules;
pub mod spawn;
pub mod tile;
