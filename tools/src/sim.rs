//! Deterministic lossy-transport simulation.
//!
//! One host registry streams to a number of observers over a fake transport
//! that loses, delays, reorders and duplicates packets. Every tick the host
//! moves ships, applies zone effects and respawns the occasional ship; each
//! observer's view drifts so objects enter and leave scope. After the last
//! tick the transport is drained reliably and every observer's shadows are
//! compared against host state.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use codec::ObjectId;
use level::LoadedLevel;
use model::{
    evaluate, EffectDecision, GameContext, GateOutcome, NetworkObject, ObjectState, ObjectTypeId,
    Point, ScalarValue, Team,
};
use replica::{ApplyReport, ConnectionId, Registry, ReplicationConfig, ScopeQuery, ShadowStore};
use serde::{Deserialize, Serialize};

/// Side of the square world generated scenarios live in.
const WORLD_SIZE: f32 = 1000.0;

/// Upper bound on reliable rounds after the last tick.
const DRAIN_ROUNDS: usize = 10_000;

const MOVE_CHANCE: f64 = 0.5;
const HEALTH_CHANCE: f64 = 0.05;
const TEAM_CHANCE: f64 = 0.01;
const RESPAWN_CHANCE: f64 = 0.02;

/// Simulation settings. Loadable from JSON; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub replication: ReplicationConfig,
    pub clients: usize,
    pub ticks: u32,
    /// Probability a packet is lost.
    pub loss: f64,
    /// Probability a packet is delayed by up to `max_delay` ticks.
    pub reorder: f64,
    /// Probability a delivered packet arrives twice.
    pub duplicate: f64,
    pub max_delay: u32,
    pub seed: u64,
    /// Ships generated when no level is given.
    pub ships: usize,
    /// Observers see objects whose location is within this distance.
    pub view_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            replication: ReplicationConfig::default(),
            clients: 2,
            ticks: 300,
            loss: 0.1,
            reorder: 0.1,
            duplicate: 0.02,
            max_delay: 4,
            seed: 1,
            ships: 16,
            view_radius: 400.0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("loss", self.loss),
            ("reorder", self.reorder),
            ("duplicate", self.duplicate),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{name} probability {p} is outside [0, 1]");
            }
        }
        if self.loss >= 1.0 && self.ticks > 0 && self.clients > 0 {
            log::warn!("every packet is lost until the drain phase");
        }
        if !self.view_radius.is_finite() || self.view_radius < 0.0 {
            bail!("view radius {} is invalid", self.view_radius);
        }
        Ok(())
    }
}

/// Per-observer totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObserverReport {
    pub connection: u32,
    pub shadows: usize,
    pub packets_applied: u64,
    pub packets_ignored: u64,
    pub fields_applied: u64,
    pub fields_stale: u64,
    pub stale_creates: u64,
    pub unknown_updates: u64,
}

impl ObserverReport {
    fn absorb(&mut self, applied: &ApplyReport) {
        self.packets_applied += 1;
        self.packets_ignored += u64::from(applied.ignored);
        self.fields_applied += applied.fields_applied as u64;
        self.fields_stale += applied.fields_stale as u64;
        self.stale_creates += applied.stale_creates as u64;
        self.unknown_updates += applied.unknown_updates as u64;
    }
}

/// Outcome of a run, printed as JSON by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub clients: usize,
    pub ticks: u32,
    pub objects: usize,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub avg_packet_bytes: u64,
    pub max_packet_bytes: usize,
    pub delivered: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub reordered: u64,
    pub mutations: u64,
    pub zone_effects: u64,
    pub respawns: u64,
    pub drain_rounds: usize,
    pub observers: Vec<ObserverReport>,
    pub divergences: Vec<String>,
    pub converged: bool,
}

impl SimReport {
    fn record_packet(&mut self, len: usize) {
        self.packets_sent += 1;
        self.bytes_sent += len as u64;
        self.max_packet_bytes = self.max_packet_bytes.max(len);
    }
}

/// Seeded linear congruential generator; same seed, same run.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform in `[0, 1]`.
    pub fn unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / f64::from(u32::MAX)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        p >= 1.0 || (p > 0.0 && self.unit() < p)
    }

    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        (self.unit() as f32).mul_add(max - min, min)
    }

    /// Uniform in `0..len`; zero when `len` is zero.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.next_u32() as usize % len
        }
    }
}

/// Objects within `radius` of the connection's view point.
struct ViewScope<'a> {
    views: &'a BTreeMap<ConnectionId, Point>,
    radius: f32,
}

impl ScopeQuery for ViewScope<'_> {
    fn in_scope(&self, connection: ConnectionId, _: ObjectId, object: &NetworkObject) -> bool {
        self.views.get(&connection).is_some_and(|view| {
            let loc = object.location();
            let (dx, dy) = (loc.x - view.x, loc.y - view.y);
            dx.mul_add(dx, dy * dy) <= self.radius * self.radius
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Deliver,
    Lose,
    /// Extra copy of a delivered packet; the host is not told about it.
    Echo,
}

#[derive(Debug, Clone)]
struct Transit {
    sequence: u32,
    bytes: Vec<u8>,
    arrive_at: u32,
    fate: Fate,
}

struct Observer {
    conn: ConnectionId,
    store: ShadowStore,
    view: Point,
    queue: Vec<Transit>,
    stats: ObserverReport,
}

impl Observer {
    fn receive(
        &mut self,
        registry: &mut Registry,
        transit: Transit,
        report: &mut SimReport,
    ) -> Result<()> {
        match transit.fate {
            Fate::Lose => {
                registry.on_packet_dropped(self.conn, transit.sequence)?;
                report.dropped += 1;
            }
            Fate::Deliver | Fate::Echo => {
                let applied = self.store.unpack_update(&transit.bytes).with_context(|| {
                    format!("{} rejected packet {}", self.conn, transit.sequence)
                })?;
                self.stats.absorb(&applied);
                if transit.fate == Fate::Deliver {
                    registry.on_packet_delivered(self.conn, transit.sequence)?;
                    report.delivered += 1;
                }
            }
        }
        Ok(())
    }
}

/// A host, its observers and the transport between them.
pub struct Simulation {
    config: SimConfig,
    ctx: GameContext,
    registry: Registry,
    observers: Vec<Observer>,
    rng: Rng,
    report: SimReport,
    tick: u32,
    team_count: u8,
    health: usize,
}

impl Simulation {
    /// Builds the world from `level`, or generates one.
    pub fn new(config: SimConfig, level: Option<&LoadedLevel>) -> Result<Self> {
        config.validate()?;
        let team_count = level.map_or(2, |level| level.team_count.max(1));
        let ctx = GameContext::host(team_count, config.replication.precision_bits)
            .context("create host context")?;
        let replication = config
            .replication
            .clone()
            .with_team_count(ctx.team_count());
        let registry = Registry::new(replication).context("create registry")?;
        let health = ObjectTypeId::Ship
            .info()
            .scalar_index("health")
            .context("ship type has no health field")?;

        let mut sim = Self {
            rng: Rng::new(config.seed),
            report: SimReport {
                seed: config.seed,
                clients: config.clients,
                ticks: config.ticks,
                ..SimReport::default()
            },
            config,
            ctx,
            registry,
            observers: Vec::new(),
            tick: 0,
            team_count,
            health,
        };

        match level {
            Some(level) => {
                for object in &level.objects {
                    sim.registry
                        .register(object.clone())
                        .context("register level object")?;
                }
            }
            None => sim.populate()?,
        }

        for _ in 0..sim.config.clients {
            let conn = sim.registry.add_connection();
            let view = sim.random_point();
            sim.observers.push(Observer {
                conn,
                store: ShadowStore::new(&sim.config.replication)?,
                view,
                queue: Vec::new(),
                stats: ObserverReport {
                    connection: conn.0,
                    ..ObserverReport::default()
                },
            });
        }
        log::debug!(
            "simulating {} objects for {} observers",
            sim.registry.len(),
            sim.observers.len()
        );
        Ok(sim)
    }

    /// Runs every tick, drains the transport and checks convergence.
    pub fn run(mut self) -> Result<SimReport> {
        for _ in 0..self.config.ticks {
            self.step()?;
        }
        let rounds = self.drain()?;
        Ok(self.finish(rounds))
    }

    /// Advances one tick: mutate, deliver what is due, send.
    pub fn step(&mut self) -> Result<()> {
        self.tick += 1;
        self.mutate()?;
        self.deliver_due()?;
        self.send()
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    fn populate(&mut self) -> Result<()> {
        for _ in 0..3 {
            let center = self.random_point();
            let mut zone =
                NetworkObject::new(ObjectTypeId::SlipZone, Team::NEUTRAL, square(center, 60.0))?;
            let amount = self.rng.range_f32(0.05, 0.9);
            zone.set_scalar(0, ScalarValue::Float(amount))?;
            self.register_zone(zone)?;
        }
        for team in 0..self.team_count.min(2) {
            let team = Team::new(team as i8);
            let center = self.random_point();
            let loadout = NetworkObject::new(ObjectTypeId::LoadoutZone, team, square(center, 40.0))?;
            self.register_zone(loadout)?;
            let center = self.random_point();
            let goal = NetworkObject::new(ObjectTypeId::GoalZone, team, square(center, 40.0))?;
            self.register_zone(goal)?;
        }
        for _ in 0..self.config.ships {
            self.spawn_ship()?;
        }
        Ok(())
    }

    /// Zones are visible to everyone.
    fn register_zone(&mut self, zone: NetworkObject) -> Result<()> {
        let id = self.registry.register(zone)?;
        self.registry.set_scope_always(id, true)?;
        Ok(())
    }

    fn spawn_ship(&mut self) -> Result<ObjectId> {
        let team = Team::new(self.rng.index(usize::from(self.team_count)) as i8);
        let at = self.random_point();
        let ship = NetworkObject::new(ObjectTypeId::Ship, team, vec![at])?;
        Ok(self.registry.register(ship)?)
    }

    fn random_point(&mut self) -> Point {
        Point::new(
            self.rng.range_f32(0.0, WORLD_SIZE),
            self.rng.range_f32(0.0, WORLD_SIZE),
        )
    }

    fn mutate(&mut self) -> Result<()> {
        for id in self.registry.find_by_type(ObjectTypeId::Ship) {
            if self.rng.chance(MOVE_CHANCE) {
                let Some(ship) = self.registry.get(id) else {
                    continue;
                };
                let at = ship.location();
                let next = Point::new(
                    (at.x + self.rng.range_f32(-8.0, 8.0)).clamp(0.0, WORLD_SIZE),
                    (at.y + self.rng.range_f32(-8.0, 8.0)).clamp(0.0, WORLD_SIZE),
                );
                self.registry.set_geometry(id, vec![next])?;
                self.report.mutations += 1;
            }
            if self.rng.chance(HEALTH_CHANCE) {
                let health = ScalarValue::Float(self.rng.range_f32(0.0, 1.0));
                self.registry.set_scalar(id, self.health, health)?;
                self.report.mutations += 1;
            }
            if self.rng.chance(TEAM_CHANCE) {
                let team = Team::new(self.rng.index(usize::from(self.team_count)) as i8);
                self.registry.set_team(id, team)?;
                self.report.mutations += 1;
            }
        }

        if self.rng.chance(RESPAWN_CHANCE) {
            let ships = self.registry.find_by_type(ObjectTypeId::Ship);
            if !ships.is_empty() {
                let victim = ships[self.rng.index(ships.len())];
                self.registry.unregister(victim)?;
                self.spawn_ship()?;
                self.report.respawns += 1;
            }
        }

        self.apply_zone_effects()?;

        for observer in &mut self.observers {
            observer.view = Point::new(
                (observer.view.x + self.rng.range_f32(-20.0, 20.0)).clamp(0.0, WORLD_SIZE),
                (observer.view.y + self.rng.range_f32(-20.0, 20.0)).clamp(0.0, WORLD_SIZE),
            );
        }
        Ok(())
    }

    fn apply_zone_effects(&mut self) -> Result<()> {
        let mut hits = Vec::new();
        let zones = self
            .registry
            .iter()
            .filter(|(_, object)| object.info().capabilities.is_zone());
        for (zone_id, zone) in zones {
            let ships = self
                .registry
                .iter()
                .filter(|(_, object)| object.info().capabilities.is_ship());
            for (ship_id, ship) in ships {
                if !contains(zone.geometry(), ship.location()) {
                    continue;
                }
                if let GateOutcome::Authoritative {
                    decision: EffectDecision::ApplyZoneEffect,
                    authority,
                } = evaluate(&self.ctx, zone, ship)
                {
                    hits.push((authority, zone_id, ship_id));
                }
            }
        }
        for (authority, zone, ship) in hits {
            if self
                .registry
                .apply_zone_effect(&authority, zone, ship)?
                .is_some()
            {
                self.report.zone_effects += 1;
            }
        }
        Ok(())
    }

    fn deliver_due(&mut self) -> Result<()> {
        let tick = self.tick;
        for observer in &mut self.observers {
            let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut observer.queue)
                .into_iter()
                .partition(|transit| transit.arrive_at <= tick);
            observer.queue = later;
            due.sort_by_key(|transit| transit.arrive_at);
            for transit in due {
                observer.receive(&mut self.registry, transit, &mut self.report)?;
            }
        }
        Ok(())
    }

    fn send(&mut self) -> Result<()> {
        let views = self.views();
        let scope = ViewScope {
            views: &views,
            radius: self.config.view_radius,
        };
        let max_delay = self.config.max_delay.max(1) as usize;
        for observer in &mut self.observers {
            let Some(packet) = self.registry.pack_update(observer.conn, &scope)? else {
                continue;
            };
            self.report.record_packet(packet.bytes.len());

            let fate = if self.rng.chance(self.config.loss) {
                Fate::Lose
            } else {
                Fate::Deliver
            };
            let mut delay = 1;
            if self.rng.chance(self.config.reorder) {
                delay += self.rng.index(max_delay) as u32;
                self.report.reordered += 1;
            }
            if fate == Fate::Deliver && self.rng.chance(self.config.duplicate) {
                observer.queue.push(Transit {
                    sequence: packet.sequence,
                    bytes: packet.bytes.clone(),
                    arrive_at: self.tick + 1 + self.rng.index(max_delay) as u32,
                    fate: Fate::Echo,
                });
                self.report.duplicated += 1;
            }
            observer.queue.push(Transit {
                sequence: packet.sequence,
                bytes: packet.bytes,
                arrive_at: self.tick + delay,
                fate,
            });
        }
        Ok(())
    }

    /// Flushes everything in flight, then packs and delivers reliably until
    /// no connection has anything left to send. Returns the rounds taken.
    pub fn drain(&mut self) -> Result<usize> {
        let views = self.views();
        let scope = ViewScope {
            views: &views,
            radius: self.config.view_radius,
        };
        for round in 1..=DRAIN_ROUNDS {
            let mut idle = true;
            for observer in &mut self.observers {
                let mut queue = std::mem::take(&mut observer.queue);
                queue.sort_by_key(|transit| transit.arrive_at);
                idle &= queue.is_empty();
                for transit in queue {
                    observer.receive(&mut self.registry, transit, &mut self.report)?;
                }
            }
            for observer in &mut self.observers {
                let Some(packet) = self.registry.pack_update(observer.conn, &scope)? else {
                    continue;
                };
                idle = false;
                self.report.record_packet(packet.bytes.len());
                let transit = Transit {
                    sequence: packet.sequence,
                    bytes: packet.bytes,
                    arrive_at: self.tick,
                    fate: Fate::Deliver,
                };
                observer.receive(&mut self.registry, transit, &mut self.report)?;
            }
            if idle {
                return Ok(round);
            }
        }
        bail!("transport did not drain after {DRAIN_ROUNDS} rounds")
    }

    /// Differences between each observer's shadows and the host state it
    /// should see. Empty once converged.
    #[must_use]
    pub fn divergences(&self) -> Vec<String> {
        let views = self.views();
        let scope = ViewScope {
            views: &views,
            radius: self.config.view_radius,
        };
        let mut out = Vec::new();
        for observer in &self.observers {
            let expected: BTreeMap<ObjectId, ObjectState> = self
                .registry
                .iter()
                .filter(|(id, object)| {
                    object.ghost_flags().is_scope_always()
                        || scope.in_scope(observer.conn, *id, object)
                })
                .map(|(id, object)| (id, object.state()))
                .collect();
            for (id, state) in &expected {
                match observer.store.get(*id) {
                    None => out.push(format!("{}: missing {id}", observer.conn)),
                    Some(shadow) if shadow != state => {
                        out.push(format!("{}: {id} differs from host", observer.conn));
                    }
                    Some(_) => {}
                }
            }
            for (id, _) in observer.store.iter() {
                if !expected.contains_key(&id) {
                    out.push(format!("{}: stale shadow {id}", observer.conn));
                }
            }
        }
        out
    }

    fn finish(mut self, drain_rounds: usize) -> SimReport {
        let divergences = self.divergences();
        let mut report = std::mem::take(&mut self.report);
        report.objects = self.registry.len();
        report.drain_rounds = drain_rounds;
        if report.packets_sent > 0 {
            report.avg_packet_bytes = report.bytes_sent / report.packets_sent;
        }
        report.observers = self
            .observers
            .into_iter()
            .map(|observer| ObserverReport {
                shadows: observer.store.len(),
                ..observer.stats
            })
            .collect();
        report.converged = divergences.is_empty();
        report.divergences = divergences;
        report
    }

    fn views(&self) -> BTreeMap<ConnectionId, Point> {
        self.observers
            .iter()
            .map(|observer| (observer.conn, observer.view))
            .collect()
    }
}

/// Runs a whole simulation.
pub fn simulate(config: SimConfig, level: Option<&LoadedLevel>) -> Result<SimReport> {
    Simulation::new(config, level)?.run()
}

fn square(center: Point, half: f32) -> Vec<Point> {
    vec![
        Point::new(center.x - half, center.y - half),
        Point::new(center.x + half, center.y - half),
        Point::new(center.x + half, center.y + half),
        Point::new(center.x - half, center.y + half),
    ]
}

/// Even-odd point-in-polygon test.
fn contains(polygon: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for (i, a) in polygon.iter().enumerate() {
        let Some(b) = polygon.get(j) else {
            break;
        };
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use level::{load_level, LevelContext, VecSink};

    fn short(seed: u64) -> SimConfig {
        SimConfig {
            ticks: 80,
            seed,
            ..SimConfig::default()
        }
    }

    #[test]
    fn converges_under_default_loss() {
        let report = simulate(short(7), None).unwrap();
        assert!(report.converged, "{:?}", report.divergences);
        assert!(report.packets_sent > 0);
        assert!(report.dropped > 0);
        assert_eq!(report.observers.len(), 2);
    }

    #[test]
    fn same_seed_same_report() {
        let a = simulate(short(3), None).unwrap();
        let b = simulate(short(3), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn converges_with_heavy_loss_and_tiny_packets() {
        let config = SimConfig {
            replication: ReplicationConfig::for_testing(),
            loss: 0.5,
            reorder: 0.4,
            duplicate: 0.2,
            clients: 3,
            ..short(11)
        };
        let report = simulate(config, None).unwrap();
        assert!(report.converged, "{:?}", report.divergences);
        assert!(report.max_packet_bytes <= ReplicationConfig::for_testing().wire_limits.max_packet_bytes);
    }

    #[test]
    fn level_objects_are_replicated() {
        let text = "Team A 1 0 0\nTeam B 0 0 1\nSlipZone 0 0 2 0 2 2\nShip 1 1 1\n";
        let level = load_level(text, &LevelContext::default(), &mut VecSink::new());
        let config = SimConfig {
            view_radius: WORLD_SIZE * 4.0,
            ..short(5)
        };
        let report = simulate(config, Some(&level)).unwrap();
        assert!(report.converged, "{:?}", report.divergences);
        assert!(report.objects >= 2);
        assert!(report.observers.iter().all(|o| o.shadows == report.objects));
    }

    #[test]
    fn partial_json_config_uses_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"clients": 4, "replication": {"precision_bits": 3}}"#)
                .unwrap();
        assert_eq!(config.clients, 4);
        assert_eq!(config.ticks, 300);
        assert_eq!(config.replication.precision_bits, 3);
        assert_eq!(config.replication.max_objects, 4096);
    }

    #[test]
    fn invalid_probabilities_are_rejected() {
        let config = SimConfig {
            loss: 1.5,
            ..SimConfig::default()
        };
        assert!(Simulation::new(config, None).is_err());
    }

    #[test]
    fn point_in_polygon() {
        let zone = square(Point::new(10.0, 10.0), 5.0);
        assert!(contains(&zone, Point::new(10.0, 10.0)));
        assert!(contains(&zone, Point::new(6.0, 14.0)));
        assert!(!contains(&zone, Point::new(16.0, 10.0)));
        assert!(!contains(&[], Point::ZERO));
    }

    #[test]
    fn rng_is_deterministic_and_bounded() {
        let mut a = Rng::new(9);
        let mut b = Rng::new(9);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
            let v = a.range_f32(-2.0, 3.0);
            assert!((-2.0..=3.0).contains(&v));
            assert!(a.index(7) < 7);
            b.range_f32(-2.0, 3.0);
            b.index(7);
        }
        assert!(!a.chance(0.0));
        assert!(a.chance(1.0));
    }
}
