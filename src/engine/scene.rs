// Frame-loop state: the entity arena, shared geometry and per-frame clocks.
//
// Feed events are applied between frames; `tick` then advances the clocks and
// runs the systems in a fixed order. No GPU objects live here.

use std::sync::Arc;

use bevy_ecs::prelude::*;

use super::debug_overlay::HudStats;
use super::interpolate::{BlendClock, FrameTime};
use super::mesh::{RenderMesh, SceneBatch};
use super::pose::spin_degrees;
use super::primitives::{floor_mesh, obstacle_mesh, signal_mesh, CarModel};
use super::reconcile::{place_obstacles, reconcile_agents, reconcile_signals, EntityTable, ReconcileReport};
use super::systems::{collect_scene, interpolation_system, reveal_system, visible_agents};
use crate::net::{Feed, FeedEvent};

/// Tunables taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    /// Seconds between agent snapshots; the length of one blend.
    pub poll_interval: f32,
    pub reveal_delay: f32,
    pub ride_height: f32,
    /// Wheel spin in degrees per second.
    pub spin_rate: f32,
    pub grid_width: u32,
    pub grid_height: u32,
}

/// Dropped fetch cycles, per feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedFailures {
    pub agents: u64,
    pub signals: u64,
    pub obstacles: u64,
}

impl FeedFailures {
    pub fn record(&mut self, feed: Feed) {
        match feed {
            Feed::Agents => self.agents += 1,
            Feed::Signals => self.signals += 1,
            Feed::Obstacles => self.obstacles += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.agents + self.signals + self.obstacles
    }
}

/// Feed counters shown in the HUD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStats {
    pub agent_snapshots: u64,
    pub signal_snapshots: u64,
    pub failures: FeedFailures,
    /// Most recent failure, prefixed with its feed.
    pub last_error: Option<String>,
}

pub struct Scene {
    world: World,
    table: EntityTable,
    car_model: CarModel,
    signal_mesh: Arc<RenderMesh>,
    obstacle_mesh: Arc<RenderMesh>,
    floor: RenderMesh,
    blend: BlendClock,
    time: FrameTime,
    settings: SceneSettings,
    stats: FeedStats,
    batch: SceneBatch,
}

impl Scene {
    pub fn new(settings: SceneSettings) -> Self {
        Self {
            world: World::new(),
            table: EntityTable::default(),
            car_model: CarModel::new(),
            signal_mesh: signal_mesh(),
            obstacle_mesh: obstacle_mesh(),
            floor: floor_mesh(settings.grid_width, settings.grid_height),
            blend: BlendClock::new(settings.poll_interval),
            time: FrameTime::default(),
            settings,
            stats: FeedStats::default(),
            batch: SceneBatch::default(),
        }
    }

    /// Apply one event from the fetch thread.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Agents(snapshot) => {
                let report = reconcile_agents(
                    &mut self.world,
                    &mut self.table,
                    &snapshot,
                    &self.car_model,
                    self.settings.reveal_delay,
                );
                self.blend.restart();
                self.stats.agent_snapshots += 1;
                log_report(Feed::Agents, &report);
            }
            FeedEvent::Signals(snapshot) => {
                let report = reconcile_signals(&mut self.world, &mut self.table, &snapshot, &self.signal_mesh);
                self.stats.signal_snapshots += 1;
                log_report(Feed::Signals, &report);
            }
            FeedEvent::Obstacles(snapshot) => {
                let report = place_obstacles(&mut self.world, &mut self.table, &snapshot, &self.obstacle_mesh);
                log::info!("Placed {} obstacles", report.created.len());
            }
            FeedEvent::Failed { feed, error } => {
                self.stats.failures.record(feed);
                self.stats.last_error = Some(format!("{feed}: {error}"));
            }
        }
    }

    /// Advance by one frame of `delta` seconds and re-pose every car.
    pub fn tick(&mut self, delta: f32) {
        self.time.advance(delta);
        let revealed = reveal_system(&mut self.world, delta);
        if revealed > 0 {
            log::debug!("Revealed {} cars", revealed);
        }

        self.blend.advance(delta);
        let spin = spin_degrees(self.time.elapsed, self.settings.spin_rate);
        interpolation_system(&mut self.world, self.blend.factor(), self.settings.ride_height, spin);
    }

    /// Batch every visible mesh for upload.
    pub fn collect(&mut self) -> &SceneBatch {
        collect_scene(&mut self.world, &self.floor, &mut self.batch);
        &self.batch
    }

    /// Entity and feed figures for the HUD. Timing and server fields are left
    /// for the caller.
    pub fn hud_stats(&mut self) -> HudStats {
        HudStats {
            agents: self.table.agent_count(),
            visible_agents: visible_agents(&mut self.world),
            signals: self.table.signal_count(),
            obstacles: self.table.obstacle_count(),
            blend: self.blend.factor(),
            agent_snapshots: self.stats.agent_snapshots,
            signal_snapshots: self.stats.signal_snapshots,
            failures: self.stats.failures,
            last_error: self.stats.last_error.clone(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn blend_factor(&self) -> f32 {
        self.blend.factor()
    }
}

fn log_report(feed: Feed, report: &ReconcileReport) {
    if report.is_quiet() {
        return;
    }
    log::debug!(
        "{}: +{} ~{} departed {} removed {}",
        feed,
        report.created.len(),
        report.updated,
        report.departed.len(),
        report.removed.len()
    );
}
