//! Sub-stepping front integrator
//!
//! Each sub-step runs in phases:
//! 1. **Read** (parallel): every live node evaluates the rate-of-spread model against
//!    the committed positions of the previous sub-step and proposes a velocity.
//! 2. **Step size**: the sub-step length keeps every node within
//!    [`PropagationConfig::max_displacement`], lands exactly on the target time and
//!    never jumps over the activation time of a dormant front.
//! 3. **Commit** (sequential): positions, velocities and depths are written back.
//! 4. **Stamp** (parallel): the area swept by every edge is written into the burn map
//!    through its atomic `min` reduction.
//! 5. **Resolution and topology** (sequential): node density control, then splits
//!    and merges.
//!
//! Per-node and per-front failures never abort the integration; they are counted
//! in the returned [`AdvanceReport`].

use super::config::PropagationConfig;
use super::rasterize::{stamp_polygon, stamp_swept_edge, SweptEdge};
use super::resolution::refine_front;
use super::topology::{resolve_topology, TopologyEvent, TopologyKind};
use crate::core_types::{Vec2, Vec3};
use crate::error::{FireError, Result};
use crate::front::geometry::{curvature, outward_normal};
use crate::front::{FrontArena, FrontId, NodeId, NodeState};
use crate::grid::{ArrivalTimeMap, Domain, LayerStore, BURN_MAP};
use crate::params::SimulationParameters;
use crate::physics::{NodeContext, ResolvedModel};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Summary of one `advance_to` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvanceReport {
    /// Clock value reached (the target unless interrupted)
    pub achieved_time: f64,
    pub substeps: usize,
    /// Live nodes currently held in place after repeated invalid rates
    pub frozen_nodes: usize,
    /// Fronts dropped on topology errors or extinction
    pub terminated_fronts: usize,
    /// Rates that hit `minSpeed` or `maxSpeed`
    pub clamped_rates: usize,
    /// NaN or infinite model outputs
    pub invalid_rates: usize,
    /// Nodes whose fuel index or layer sample could not be resolved
    pub lookup_failures: usize,
    pub splits: usize,
    pub merges: usize,
    pub interrupted: bool,
}

/// Proposed update of one node, computed in the read phase
#[derive(Debug, Clone, Copy)]
struct NodeUpdate {
    id: NodeId,
    vel: Vec3,
    speed: f64,
    streak: u32,
    frozen: bool,
    clamped: bool,
    invalid: bool,
    lookup_failed: bool,
}

/// Read-only view of everything the integrator needs besides the fronts
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    pub config: &'a PropagationConfig,
    pub model: &'a ResolvedModel,
    pub layers: &'a LayerStore,
    pub params: &'a SimulationParameters,
    pub domain: &'a Domain,
    pub burn_map: &'a ArrivalTimeMap,
}

impl Propagator<'_> {
    /// Integrate every active front from `now` to `target`
    ///
    /// `cancel` is polled between sub-steps; when it is set the run stops at the last
    /// completed sub-step and the flag is cleared. Topology events are appended to
    /// `events`.
    pub fn advance(
        &self,
        arena: &mut FrontArena,
        now: f64,
        target: f64,
        cancel: &AtomicBool,
        events: &mut Vec<TopologyEvent>,
    ) -> Result<AdvanceReport> {
        if !target.is_finite() || target < now {
            return Err(FireError::config(format!(
                "cannot advance from t={now} back to t={target}"
            )));
        }

        let mut report = AdvanceReport {
            achieved_time: now,
            ..AdvanceReport::default()
        };
        let mut time = now;
        self.ignite_due(arena, time);

        while time < target {
            if cancel.swap(false, Ordering::SeqCst) {
                report.interrupted = true;
                info!("Propagation interrupted at t={:.3}", time);
                break;
            }
            time = self.substep(arena, time, target, &mut report, events);
            report.substeps += 1;
            self.ignite_due(arena, time);
        }

        report.achieved_time = time;
        report.frozen_nodes = arena
            .live_nodes(time)
            .into_iter()
            .filter(|&id| arena.node(id).frozen)
            .count();
        if report.frozen_nodes > 0 {
            warn!("{} nodes frozen after repeated invalid rates", report.frozen_nodes);
        }
        info!(
            "Advanced to t={:.3} in {} sub-steps ({} nodes, {} splits, {} merges, {} terminated)",
            time,
            report.substeps,
            arena.node_count(),
            report.splits,
            report.merges,
            report.terminated_fronts
        );
        Ok(report)
    }

    /// Run one sub-step starting at `time`, returning the new time
    fn substep(
        &self,
        arena: &mut FrontArena,
        time: f64,
        target: f64,
        report: &mut AdvanceReport,
        events: &mut Vec<TopologyEvent>,
    ) -> f64 {
        let live = arena.live_nodes(time);

        // Read phase
        let updates: Vec<NodeUpdate> = {
            let view: &FrontArena = arena;
            live.par_iter()
                .map(|&id| self.evaluate(view, id, time))
                .collect()
        };

        // Step size
        let fastest = updates
            .iter()
            .map(|u| u.vel.xy().norm())
            .fold(0.0_f64, f64::max);
        let mut dt = target - time;
        if fastest > 0.0 {
            dt = dt.min(self.config.max_displacement() / fastest);
        }
        if let Some(activation) = next_activation(arena, time) {
            dt = dt.min(activation - time);
        }
        let next = if dt >= target - time { target } else { time + dt };
        if next <= time {
            warn!("Sub-step underflow at t={}, jumping to t={}", time, target);
            return target;
        }
        let dt = next - time;

        // Commit phase
        let old: FxHashMap<NodeId, Vec2> = live
            .iter()
            .map(|&id| (id, arena.node(id).position()))
            .collect();
        for update in &updates {
            report.clamped_rates += usize::from(update.clamped);
            report.invalid_rates += usize::from(update.invalid);
            report.lookup_failures += usize::from(update.lookup_failed);
            self.commit(arena, update, dt);
        }

        // Stamp phase
        let edges: Vec<SweptEdge> = live
            .iter()
            .map(|&id| {
                let node_old = old.get(&id).copied().unwrap_or_else(Vec2::zeros);
                let node_new = arena.node(id).position();
                let (prev_old, prev_new) = match arena.node(id).prev() {
                    Some(prev) => (
                        old.get(&prev).copied().unwrap_or(node_old),
                        arena.node(prev).position(),
                    ),
                    None => (node_old, node_new),
                };
                SweptEdge {
                    prev_old,
                    node_old,
                    node_new,
                    prev_new,
                }
            })
            .collect();
        edges
            .par_iter()
            .for_each(|edge| stamp_swept_edge(self.burn_map, edge, time, next));

        // Resolution control
        let fronts: Vec<FrontId> = arena
            .active_fronts()
            .filter(|f| !f.is_dormant(next))
            .map(|f| f.id())
            .collect();
        for front in fronts {
            match refine_front(arena, front, self.config, next) {
                Ok(stats) if stats.extinguished => {
                    debug!("Front {} extinguished at t={:.3}", front, next);
                    if arena.terminate_front(front).is_ok() {
                        report.terminated_fronts += 1;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Terminating front {}: {}", front, err);
                    if arena.terminate_front(front).is_ok() {
                        report.terminated_fronts += 1;
                    }
                }
            }
        }

        // Topology
        let outcome = resolve_topology(arena, self.burn_map, self.config, next);
        report.terminated_fronts += outcome.terminated;
        for event in outcome.events {
            match event.kind {
                TopologyKind::Split => report.splits += 1,
                TopologyKind::Merge => report.merges += 1,
                TopologyKind::Trim => {}
            }
            events.push(event);
        }
        next
    }

    /// Evaluate the model at one node against the committed state
    fn evaluate(&self, arena: &FrontArena, id: NodeId, time: f64) -> NodeUpdate {
        let node = arena.node(id);
        let mut update = NodeUpdate {
            id,
            vel: Vec3::zeros(),
            speed: 0.0,
            streak: node.invalid_streak,
            frozen: node.frozen,
            clamped: false,
            invalid: false,
            lookup_failed: false,
        };
        if node.frozen {
            return update;
        }

        let here = node.position();
        let (prev, next) = arena.neighbors(id);
        let p_prev = prev.map_or(here, |p| arena.node(p).position());
        let p_next = next.map_or(here, |n| arena.node(n).position());
        let normal = outward_normal(&p_prev, &p_next);
        let kappa = match (prev, next) {
            (Some(_), Some(_)) => curvature(&p_prev, &here, &p_next),
            _ => 0.0,
        };

        let fuel_index = if self.layers.contains("fuel") {
            self.layers.sample_index("fuel", &here, time)
        } else {
            Ok(self.config.default_fuel)
        };
        let sampled = self.wind_at(&here, time).and_then(|wind| {
            let index = fuel_index?;
            Ok((wind, index, self.model.fuel_record(index)?))
        });
        let rate = match sampled {
            Ok((wind, fuel_index, fuel)) => {
                let ctx = NodeContext {
                    position: here,
                    normal,
                    curvature: kappa,
                    depth: node.depth,
                    wind,
                    normal_wind: wind.dot(&normal),
                    slope: self.slope_at(&here, &normal, time),
                    time,
                    fuel_index,
                    fuel,
                };
                self.model.rate(&ctx) * self.config.speed_adjustment
            }
            Err(_) => {
                update.lookup_failed = true;
                self.config.min_speed
            }
        };

        let rate = if rate.is_finite() {
            update.streak = 0;
            update.clamped = self.config.clamp_speed(rate).1;
            rate.max(0.0)
        } else {
            update.invalid = true;
            update.streak = node.invalid_streak.saturating_add(1);
            if update.streak >= self.config.max_invalid_streak {
                update.frozen = true;
                debug!(
                    "{}",
                    FireError::InvalidRate {
                        rate,
                        x: here.x,
                        y: here.y
                    }
                );
                return update;
            }
            self.config.min_speed
        };

        // Relax first, then bound the speed that is actually integrated
        let normal = Vec3::new(normal.x, normal.y, 0.0);
        let relax = self.config.relax;
        let smoothed = normal * rate * relax + node.vel * (1.0 - relax);
        let norm = smoothed.norm();
        let (speed, bounded) = self.config.clamp_speed(norm);
        update.clamped |= bounded;
        update.vel = match (bounded, norm > 0.0) {
            (false, _) => smoothed,
            (true, true) => smoothed * (speed / norm),
            // At rest: leave along the outward normal
            (true, false) => normal * speed,
        };
        update.speed = speed;
        update
    }

    fn commit(&self, arena: &mut FrontArena, update: &NodeUpdate, dt: f64) {
        let altitude = self.layers.contains("altitude");
        if arena.node(update.id).state == NodeState::Init {
            arena.set_state(update.id, NodeState::Moving);
        }
        let node = arena.node_mut(update.id);
        node.invalid_streak = update.streak;
        node.frozen = update.frozen;
        node.vel = update.vel;
        if update.frozen {
            node.vel = Vec3::zeros();
            return;
        }
        let moved = self.domain.clamp(&(node.position() + update.vel.xy() * dt));
        node.loc.x = moved.x;
        node.loc.y = moved.y;
        if self.config.depth_computation {
            let steady = self.config.steady_depth(update.speed);
            let weight = (dt / self.config.burning_duration).min(1.0);
            let depth = node.depth + (steady - node.depth) * weight;
            let ceiling = self.config.max_front_depth.unwrap_or(f64::INFINITY);
            node.depth = depth.clamp(0.0, ceiling);
        }
        if altitude {
            if let Ok(z) = self.layers.sample("altitude", &moved, self.params) {
                arena.node_mut(update.id).loc.z = z;
            }
        }
    }

    /// Wind at `p`: registered `windU`/`windV` layers, falling back to parameters
    /// only when no layer of that name exists
    fn wind_at(&self, p: &Vec2, time: f64) -> Result<Vec2> {
        let component = |name: &str| match self.layers.sample_at(name, p, time, self.params) {
            Err(FireError::UnknownLayer(_)) => Ok(self.params.get_f64_or(name, 0.0)),
            sampled => sampled,
        };
        Ok(Vec2::new(component("windU")?, component("windV")?))
    }

    /// Rise over run of the `altitude` layer along `normal`
    fn slope_at(&self, p: &Vec2, normal: &Vec2, time: f64) -> f64 {
        if !self.layers.contains("altitude") || *normal == Vec2::zeros() {
            return 0.0;
        }
        let h = self.config.spatial_increment;
        let ahead = self
            .layers
            .sample_at("altitude", &(p + normal * h), time, self.params);
        let behind = self
            .layers
            .sample_at("altitude", &(p - normal * h), time, self.params);
        match (ahead, behind) {
            (Ok(ahead), Ok(behind)) => (ahead - behind) / (2.0 * h),
            _ => 0.0,
        }
    }

    /// Write the interior of every front whose creation time has been reached
    fn ignite_due(&self, arena: &mut FrontArena, time: f64) {
        let due: Vec<(FrontId, f64)> = arena
            .active_fronts()
            .filter(|f| !f.is_ignited() && !f.is_dormant(time))
            .map(|f| (f.id(), f.time()))
            .collect();
        for (front, created) in due {
            if let Ok(polygon) = arena.front_positions(front) {
                let cells = if arena.front(front).is_ok_and(|f| f.is_closed()) {
                    stamp_polygon(self.burn_map, &polygon, created)
                } else {
                    0
                };
                for p in &polygon {
                    if let Err(err) = self.layers.write(BURN_MAP, p, created) {
                        debug!("Ignition point of front {} not stamped: {}", front, err);
                    }
                }
                debug!("Front {} ignited at t={:.3} ({} cells)", front, created, cells);
            }
            if let Err(err) = arena.mark_ignited(front) {
                warn!("Front {} could not be marked ignited: {}", front, err);
            }
        }
    }
}

/// Earliest creation time of a dormant front after `time`
fn next_activation(arena: &FrontArena, time: f64) -> Option<f64> {
    arena
        .active_fronts()
        .filter(|f| f.is_dormant(time))
        .map(|f| f.time())
        .min_by(f64::total_cmp)
}
