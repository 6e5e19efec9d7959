use crate::{
    dispatch::DispatchScheduler,
    mask::MaskSet,
    point2::Point2,
    rect::Rect,
    settings::{Settings, SpawnMode},
    trail::TrailField,
};
use log::{info, trace, warn};
use num::{Float, NumCast};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use std::f32::consts::{PI, TAU};
use typed_builder::TypedBuilder;

/// Sensor readings to the left of, ahead of, and to the right of an agent's
/// heading.
pub type SensorReading = (f32, f32, f32);

// Spreads the per-agent RNG streams across the seed space so neighboring
// agents never share a stream.
const SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// A point particle that senses the trail field ahead of itself, turns
/// toward the strongest signal, advances, and marks the cell it left behind.
#[derive(TypedBuilder)]
pub struct Agent {
    position: Point2,
    // The heading an agent is facing. (In radians)
    #[builder(default)]
    rotation: f32,
    rng: SmallRng,
}

impl Agent {
    pub fn position(&self) -> Point2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// One sense-steer-move pass. Returns the cell the agent occupied when
    /// the sub-step began; the pool merges all deposits after every agent
    /// has finished sensing, so no agent ever observes a deposit from its
    /// own sub-step.
    pub fn step(
        &mut self,
        trail: &TrailField,
        masks: &MaskSet<'_>,
        settings: &Settings,
        bounds: &Rect<u32>,
    ) -> (u32, u32) {
        let deposit_cell = (
            self.position.x.round() as u32,
            self.position.y.round() as u32,
        );

        let reading = self.sense(trail, masks, settings);
        let turn = self.steer(reading, settings);
        self.rotation = wrap_angle(self.rotation + turn);
        self.advance(masks, settings, bounds);

        deposit_cell
    }

    pub fn sense(
        &self,
        trail: &TrailField,
        masks: &MaskSet<'_>,
        settings: &Settings,
    ) -> SensorReading {
        let offset = settings.sensor_angle_offset.to_radians();
        let left = self.probe(self.rotation + offset, trail, masks, settings);
        let forward = self.probe(self.rotation, trail, masks, settings);
        let right = self.probe(self.rotation - offset, trail, masks, settings);

        (left, forward, right)
    }

    fn probe(
        &self,
        direction: f32,
        trail: &TrailField,
        masks: &MaskSet<'_>,
        settings: &Settings,
    ) -> f32 {
        let x = self.position.x + settings.sensor_offset_distance * direction.cos();
        let y = self.position.y + settings.sensor_offset_distance * direction.sin();

        // Impassable cells carry no signal at all.
        if masks.obstacle_blocked(x, y, &settings.obstacle_color) {
            return 0.0;
        }

        trail.sense_average(x, y, settings.sensor_size)
            + settings.attractant_strength
                * masks.attractant.weight(x, y, &settings.attractant_color)
            - settings.repellent_strength
                * masks.repellent.weight(x, y, &settings.repellent_color)
    }

    /// Turn angle for a set of sensor readings. Equality of all three
    /// readings is the only case that may randomize; a two-way tie between
    /// the side sensors steers left so runs stay reproducible.
    pub fn steer(&mut self, (left, forward, right): SensorReading, settings: &Settings) -> f32 {
        let turn = settings.rotation_angle.to_radians();

        if forward > left && forward > right {
            trace!("forward reading is greatest, continuing straight");
            0.0
        } else if left == forward && forward == right {
            if settings.allow_random {
                trace!("no gradient, rotating randomly");
                self.rng.gen_range(-turn..=turn)
            } else {
                trace!("no gradient, continuing straight");
                0.0
            }
        } else if left == right {
            trace!("side readings tie, preferring left");
            turn
        } else if left > right {
            trace!("rotating left");
            turn
        } else {
            trace!("rotating right");
            -turn
        }
    }

    fn advance(&mut self, masks: &MaskSet<'_>, settings: &Settings, bounds: &Rect<u32>) {
        let mut next = Point2::new(
            self.position.x + settings.step_size * self.rotation.cos(),
            self.position.y + settings.step_size * self.rotation.sin(),
        );

        if !next.is_finite() {
            debug_assert!(false, "agent position became non-finite");
            warn!("agent position became non-finite, keeping {}", self.position);
            return;
        }

        // Obstacles are impassable: stay put and turn around.
        if masks.obstacle_blocked(next.x, next.y, &settings.obstacle_color) {
            trace!("destination {} is inside an obstacle", next);
            self.rotation = wrap_angle(self.rotation + PI);
            return;
        }

        if settings.bounce_off_edge {
            let min_x = bounds.x_min() as f32;
            let max_x = bounds.x_max() as f32 - 1.0;
            let min_y = bounds.y_min() as f32;
            let max_y = bounds.y_max() as f32 - 1.0;

            // Mirror reflection about the violated boundary; an x violation
            // flips the heading's horizontal component, a y violation its
            // vertical component.
            if next.x < min_x {
                next.x = min_x + (min_x - next.x);
                self.rotation = wrap_angle(PI - self.rotation);
            } else if next.x > max_x {
                next.x = max_x - (next.x - max_x);
                self.rotation = wrap_angle(PI - self.rotation);
            }

            if next.y < min_y {
                next.y = min_y + (min_y - next.y);
                self.rotation = wrap_angle(-self.rotation);
            } else if next.y > max_y {
                next.y = max_y - (next.y - max_y);
                self.rotation = wrap_angle(-self.rotation);
            }
        }

        // Reflections can still overshoot on tiny grids.
        bounds.clamp(&mut next);
        self.position = next;
    }
}

/// The agent population. One writer per agent, no cross-agent reads; the
/// only shared state is the trail field, which agents read and the pool
/// deposits into after the parallel pass.
pub struct AgentPool {
    agents: Vec<Agent>,
    bounds: Rect<u32>,
}

impl AgentPool {
    /// Place the population according to the spawn mode, deriving one RNG
    /// stream per agent from the base seed.
    pub fn spawn(settings: &Settings, seed: u64) -> Self {
        let bounds = Rect::new(0, 0, settings.width, settings.height);
        let center = Point2::new(settings.width as f32 / 2.0, settings.height as f32 / 2.0);
        let mut rng = SmallRng::seed_from_u64(seed);

        info!(
            "spawning {} agents in {:?} mode on a {}x{} grid",
            settings.num_agents, settings.spawn_mode, settings.width, settings.height
        );

        let agents = (0..settings.num_agents)
            .map(|index| {
                let random_angle = rng.gen_range(0.0..TAU);
                let (mut position, rotation) = match settings.spawn_mode {
                    SpawnMode::Point => (center, random_angle),
                    SpawnMode::Random => (
                        Point2::new(
                            rng.gen_range(0.0..settings.width as f32),
                            rng.gen_range(0.0..settings.height as f32),
                        ),
                        random_angle,
                    ),
                    SpawnMode::InwardCircle => in_circle_facing_center(center, 0.5, settings, &mut rng),
                    SpawnMode::SmallCircle => in_circle_facing_center(center, 0.1, settings, &mut rng),
                    SpawnMode::TinyCircle => in_circle_facing_center(center, 0.05, settings, &mut rng),
                    SpawnMode::RandomCircle => {
                        let (dx, dy) = in_unit_circle(&mut rng);
                        let radius = settings.height as f32 * 0.49;
                        (
                            Point2::new(center.x + dx * radius, center.y + dy * radius),
                            random_angle,
                        )
                    }
                };
                bounds.clamp(&mut position);

                let stream = seed.wrapping_add((index as u64 + 1).wrapping_mul(SEED_STRIDE));
                Agent::builder()
                    .position(position)
                    .rotation(rotation)
                    .rng(SmallRng::seed_from_u64(stream))
                    .build()
            })
            .collect();

        Self { agents, bounds }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn bounds(&self) -> Rect<u32> {
        self.bounds
    }

    /// Advance every agent one sub-step, in parallel over scheduler groups,
    /// and collect the cells to deposit into. Every agent reads the field
    /// as it stood at the start of the sub-step.
    pub fn update(
        &mut self,
        trail: &TrailField,
        masks: &MaskSet<'_>,
        settings: &Settings,
        scheduler: &DispatchScheduler,
    ) -> Vec<(u32, u32)> {
        let bounds = self.bounds;
        let group_width = scheduler.group_size().x.max(1) as usize;

        self.agents
            .par_chunks_mut(group_width)
            .flat_map_iter(|group| {
                group
                    .iter_mut()
                    .map(move |agent| agent.step(trail, masks, settings, &bounds))
            })
            .collect()
    }
}

/// Normalize an angle into `[0, 2π)`.
fn wrap_angle<T: Float>(angle: T) -> T {
    let full_turn: T = NumCast::from(std::f64::consts::TAU).unwrap();
    let zero = T::zero();
    let mut wrapped = angle;

    loop {
        if wrapped >= full_turn {
            wrapped = wrapped - full_turn;
        } else if wrapped < zero {
            wrapped = wrapped + full_turn;
        } else {
            break;
        }
    }

    wrapped
}

/// A uniformly random point in the unit disk.
fn in_unit_circle(rng: &mut SmallRng) -> (f32, f32) {
    let theta = rng.gen_range(0.0..TAU);
    let radius = rng.gen::<f32>().sqrt();
    (radius * theta.cos(), radius * theta.sin())
}

/// A random position inside a circle around the grid center, heading toward
/// the center. Radius is a fraction of the grid height, as in the reference
/// parameter sets.
fn in_circle_facing_center(
    center: Point2,
    radius_fraction: f32,
    settings: &Settings,
    rng: &mut SmallRng,
) -> (Point2, f32) {
    let (dx, dy) = in_unit_circle(rng);
    let radius = settings.height as f32 * radius_fraction;
    let position = Point2::new(center.x + dx * radius, center.y + dy * radius);
    let rotation = (center.y - position.y).atan2(center.x - position.x);

    (position, wrap_angle(rotation))
}
