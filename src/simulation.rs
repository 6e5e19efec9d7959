//! Frame orchestration: apply the active configuration, run the sub-steps,
//! and expose the resulting field to the render collaborator.

use crate::{
    agent::{Agent, AgentPool},
    dispatch::DispatchScheduler,
    errors::SimError,
    mask::{MaskImages, MaskSet},
    settings::{Settings, SettingsStore},
    trail::TrailField,
    util::map_range,
};
use log::info;

/// One running simulation.
///
/// Owns the agent population and the trail field for its whole lifetime; the
/// mask pixels are borrowed from the host. The host drives the simulation by
/// calling [`step`](Simulation::step) at its own cadence and reads the field
/// back out through [`trail`](Simulation::trail) or the render helpers.
/// State is only ever consistent at sub-step boundaries, which is exactly
/// where `step` returns.
pub struct Simulation<'m> {
    settings: Settings,
    agents: AgentPool,
    trail: TrailField,
    masks: MaskSet<'m>,
    scheduler: DispatchScheduler,
    gradient: colorgrad::Gradient,
    ticks: u64,
}

impl<'m> Simulation<'m> {
    /// Validate the store's active configuration, allocate the trail
    /// buffers, and place the population. An empty store and an
    /// unallocatable grid both fail here, before the simulation can start;
    /// nothing is ever partially initialized.
    pub fn new(store: &SettingsStore, images: MaskImages<'m>) -> Result<Self, SimError> {
        let settings = store
            .active()
            .cloned()
            .ok_or_else(|| SimError::Config("the settings list is empty".into()))?
            .validated();

        let trail = TrailField::new(settings.width, settings.height)?;
        let masks = MaskSet::new(images, settings.width, settings.height);
        let seed = settings.seed.unwrap_or_else(rand::random);
        let agents = AgentPool::spawn(&settings, seed);

        info!(
            "initialized a {}x{} simulation with {} agents",
            settings.width,
            settings.height,
            agents.len()
        );

        Ok(Self {
            settings,
            agents,
            trail,
            masks,
            scheduler: DispatchScheduler::default(),
            gradient: colorgrad::turbo(),
            ticks: 0,
        })
    }

    /// Advance one frame: `steps_per_frame` sub-steps, each one an agent
    /// pass, a deposit merge, and a diffusion pass ending in the buffer
    /// swap. Deposits land after every agent has sensed, so agents only
    /// ever observe the field as it stood when the sub-step began.
    pub fn step(&mut self, dt: f32) {
        for _ in 0..self.settings.steps_per_frame {
            let deposits =
                self.agents
                    .update(&self.trail, &self.masks, &self.settings, &self.scheduler);
            self.trail.deposit(&deposits, self.settings.trail_weight);
            self.trail.diffuse_and_decay(
                &self.settings,
                &self.masks.attractant,
                dt,
                &self.scheduler,
            );
        }

        self.ticks += 1;
    }

    /// Adopt the store's active configuration on a live simulation. Tunable
    /// parameters apply immediately; grid or population changes cannot be
    /// applied to live buffers and are rejected, tear down and re-init
    /// instead.
    pub fn apply_settings(&mut self, store: &SettingsStore) -> Result<(), SimError> {
        let fresh = store
            .active()
            .cloned()
            .ok_or_else(|| SimError::Config("the settings list is empty".into()))?
            .validated();

        if self.settings.requires_reinit(&fresh) {
            return Err(SimError::Config(
                "grid dimensions or agent count changed; tear down and re-init".into(),
            ));
        }

        self.settings = fresh;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Frames stepped so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read-only handle to the trail field for presentation.
    pub fn trail(&self) -> &TrailField {
        &self.trail
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Render the simulation to RGBA8 pixels: the trail field under the
    /// display tint, or the population as points when `show_agents_only` is
    /// set.
    pub fn render(&self) -> Vec<u8> {
        let width = self.trail.width();
        let height = self.trail.height();
        let tint = self.settings.color;
        let mut frame = vec![0u8; width * height * 4];

        if self.settings.show_agents_only {
            for pixel in frame.chunks_exact_mut(4) {
                pixel[3] = 0xff;
            }

            for agent in self.agents.iter() {
                let x = agent.position().x.round() as usize;
                let y = agent.position().y.round() as usize;
                let offset = (y * width + x) * 4;
                frame[offset] = map_range(tint.r, 0.0f32, 1.0f32, 0u8, 255u8);
                frame[offset + 1] = map_range(tint.g, 0.0f32, 1.0f32, 0u8, 255u8);
                frame[offset + 2] = map_range(tint.b, 0.0f32, 1.0f32, 0u8, 255u8);
            }
        } else {
            for (pixel, value) in frame.chunks_exact_mut(4).zip(self.trail.iter()) {
                // clamp to renderable range, then tint
                let value = value.clamp(0.0, 1.0);
                pixel[0] = map_range(value * tint.r, 0.0f32, 1.0f32, 0u8, 255u8);
                pixel[1] = map_range(value * tint.g, 0.0f32, 1.0f32, 0u8, 255u8);
                pixel[2] = map_range(value * tint.b, 0.0f32, 1.0f32, 0u8, 255u8);
                pixel[3] = 0xff;
            }
        }

        frame
    }

    /// Render the trail field through the color gradient instead of the
    /// flat tint.
    pub fn render_colormapped(&self) -> Vec<u8> {
        let mut frame = vec![0u8; self.trail.width() * self.trail.height() * 4];

        for (pixel, value) in frame.chunks_exact_mut(4).zip(self.trail.iter()) {
            let value = value.clamp(0.0, 1.0);
            let (r, g, b, a) = self.gradient.at(value as f64).rgba_u8();
            pixel.copy_from_slice(&[r, g, b, a]);
        }

        frame
    }
}
