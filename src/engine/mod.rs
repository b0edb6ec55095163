// Engine module - entity table, motion and geometry for the traffic view

pub mod camera;
pub mod components;
pub mod debug_overlay;
pub mod interpolate;
pub mod mesh;
pub mod pose;
pub mod primitives;
pub mod reconcile;
pub mod scene;
pub mod snapshot;
pub mod systems;

pub use scene::{Scene, SceneSettings};
