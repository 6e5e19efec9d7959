use crate::errors::SimError;
use log::info;
use serde::Deserialize;

// Defaults match the reference parameter set this simulation was tuned with.
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_AGENT_COUNT: u32 = 100;
pub const DEFAULT_SENSOR_ANGLE_OFFSET: f32 = 22.5;
pub const DEFAULT_SENSOR_OFFSET_DISTANCE: f32 = 9.0;
pub const DEFAULT_ROTATION_ANGLE: f32 = 45.0;
pub const DEFAULT_STEP_SIZE: f32 = 9.0;

/// How the agent population is placed when the simulation initializes.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum SpawnMode {
    Random,
    Point,
    InwardCircle,
    SmallCircle,
    TinyCircle,
    RandomCircle,
}

/// An RGBA color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Collapse a sampled color to a scalar by weighing its channels against
    /// a reference color. A black sample (or a black reference) weighs zero.
    pub fn weigh_against(&self, reference: &Color) -> f32 {
        (self.r * reference.r + self.g * reference.g + self.b * reference.b) / 3.0
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub steps_per_frame: u32,
    pub width: u32,
    pub height: u32,
    pub bounce_off_edge: bool,
    pub allow_random: bool,
    pub num_agents: u32,
    pub spawn_mode: SpawnMode,
    /// Seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Mask image paths, resolved and loaded by the host. The core only ever
    /// sees the decoded pixels.
    pub attractant_mask: Option<String>,
    pub attractant_color: Color,
    pub attractant_strength: f32,
    pub repellent_mask: Option<String>,
    pub repellent_color: Color,
    pub repellent_strength: f32,
    pub obstacle_mask: Option<String>,
    pub obstacle_color: Color,

    /// Angle between the forward sensor and each side sensor. (In degrees)
    pub sensor_angle_offset: f32,
    /// How far out a sensor is from the agent.
    pub sensor_offset_distance: f32,
    /// Radius of the square neighborhood each sensor averages over.
    pub sensor_size: u32,
    /// How far an agent can turn in a single sub-step. (In degrees)
    pub rotation_angle: f32,
    /// Distance an agent advances per sub-step.
    pub step_size: f32,
    /// Display tint. Only the render pass reads this.
    pub color: Color,
    /// Render agents as points instead of the trail field.
    pub show_agents_only: bool,

    pub trail_weight: f32,
    pub decay_rate: f32,
    pub diffuse_rate: f32,
    pub trail_attractive_strength: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steps_per_frame: 1,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            bounce_off_edge: false,
            allow_random: false,
            num_agents: DEFAULT_AGENT_COUNT,
            spawn_mode: SpawnMode::Random,
            seed: None,
            attractant_mask: None,
            attractant_color: Color::BLACK,
            attractant_strength: 0.0,
            repellent_mask: None,
            repellent_color: Color::BLACK,
            repellent_strength: 0.0,
            obstacle_mask: None,
            obstacle_color: Color::BLACK,
            sensor_angle_offset: DEFAULT_SENSOR_ANGLE_OFFSET,
            sensor_offset_distance: DEFAULT_SENSOR_OFFSET_DISTANCE,
            sensor_size: 1,
            rotation_angle: DEFAULT_ROTATION_ANGLE,
            step_size: DEFAULT_STEP_SIZE,
            color: Color::WHITE,
            show_agents_only: false,
            trail_weight: 1.0,
            decay_rate: 1.0,
            diffuse_rate: 1.0,
            trail_attractive_strength: 1.0,
        }
    }
}

impl Settings {
    /// Clamp every field into its documented range. Validation never fails;
    /// the nearest usable configuration is returned instead. The simulation
    /// must always have a usable settings value to run with.
    pub fn validated(mut self) -> Self {
        self.steps_per_frame = self.steps_per_frame.max(1);
        self.width = self.width.max(1);
        self.height = self.height.max(1);
        self.num_agents = self.num_agents.max(1);
        self.sensor_size = self.sensor_size.max(1);
        self.sensor_offset_distance = self.sensor_offset_distance.max(0.0);
        self.step_size = self.step_size.max(0.0);
        self.trail_weight = self.trail_weight.max(0.0);
        self.decay_rate = self.decay_rate.max(0.0);
        self.diffuse_rate = self.diffuse_rate.clamp(0.0, 1.0);
        self.trail_attractive_strength = self.trail_attractive_strength.max(0.0);
        self.attractant_strength = self.attractant_strength.max(0.0);
        self.repellent_strength = self.repellent_strength.max(0.0);
        self
    }

    /// Grid dimensions and population size cannot change on a live
    /// simulation; buffers are sized once at init.
    pub fn requires_reinit(&self, other: &Settings) -> bool {
        self.width != other.width
            || self.height != other.height
            || self.num_agents != other.num_agents
    }
}

/// A list of configurations with one active entry, selected by index. An out
/// of range index clamps to the last entry rather than raising.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsStore {
    #[serde(default)]
    active_index: usize,
    settings: Vec<Settings>,
}

impl SettingsStore {
    pub fn new(settings: Vec<Settings>) -> Self {
        Self {
            active_index: 0,
            settings,
        }
    }

    pub fn load_from_file(settings_file_name: &str) -> Result<Self, SimError> {
        let mut raw = config::Config::default();
        raw.merge(config::File::with_name(settings_file_name))?;
        let store: SettingsStore = raw.try_into()?;

        info!(
            "successfully loaded {} configuration(s) from '{}'",
            store.len(),
            settings_file_name
        );

        Ok(store.validated())
    }

    pub fn validated(mut self) -> Self {
        self.settings = self
            .settings
            .into_iter()
            .map(Settings::validated)
            .collect();
        self
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn select(&mut self, index: usize) {
        self.active_index = index;
    }

    /// The active index, clamped into `[0, len - 1]`.
    pub fn active_index(&self) -> usize {
        self.active_index.min(self.settings.len().saturating_sub(1))
    }

    /// The active configuration, or `None` when the list is empty. The empty
    /// list is the one case clamping cannot repair; callers reject it at
    /// init time.
    pub fn active(&self) -> Option<&Settings> {
        self.settings.get(self.active_index())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn out_of_range_active_index_clamps_to_last_entry() {
        let tiny = Settings {
            width: 32,
            ..Settings::default()
        };
        let mut store = SettingsStore::new(vec![Settings::default(), tiny.clone()]);
        store.select(99);

        assert_eq!(store.active_index(), 1);
        assert_eq!(store.active(), Some(&tiny));
    }

    #[test]
    fn empty_store_has_no_active_configuration() {
        let store = SettingsStore::new(vec![]);
        assert_eq!(store.active(), None);
    }

    #[test]
    fn validation_clamps_degenerate_grid_and_counts_to_one() {
        let settings = Settings {
            width: 0,
            height: 0,
            num_agents: 0,
            sensor_size: 0,
            steps_per_frame: 0,
            ..Settings::default()
        }
        .validated();

        assert_eq!(settings.width, 1);
        assert_eq!(settings.height, 1);
        assert_eq!(settings.num_agents, 1);
        assert_eq!(settings.sensor_size, 1);
        assert_eq!(settings.steps_per_frame, 1);
    }

    #[test]
    fn validation_clamps_rates_into_documented_ranges() {
        let settings = Settings {
            decay_rate: -0.5,
            diffuse_rate: 2.5,
            trail_weight: -1.0,
            attractant_strength: -3.0,
            repellent_strength: -3.0,
            ..Settings::default()
        }
        .validated();

        assert_eq!(settings.decay_rate, 0.0);
        assert_eq!(settings.diffuse_rate, 1.0);
        assert_eq!(settings.trail_weight, 0.0);
        assert_eq!(settings.attractant_strength, 0.0);
        assert_eq!(settings.repellent_strength, 0.0);
    }

    #[test]
    fn grid_changes_require_reinit_but_tunables_do_not() {
        let base = Settings::default();

        let resized = Settings {
            width: base.width * 2,
            ..base.clone()
        };
        assert!(base.requires_reinit(&resized));

        let retuned = Settings {
            rotation_angle: 10.0,
            decay_rate: 0.2,
            ..base.clone()
        };
        assert!(!base.requires_reinit(&retuned));
    }

    #[test]
    fn black_samples_weigh_zero() {
        let sample = Color::BLACK;
        assert_eq!(sample.weigh_against(&Color::WHITE), 0.0);

        let white = Color::WHITE;
        assert_eq!(white.weigh_against(&Color::WHITE), 1.0);
    }
}
