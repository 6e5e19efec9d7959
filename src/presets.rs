//! Built-in parameter presets for the simulation.

use crate::settings::{Settings, SettingsStore, SpawnMode};

pub struct Preset {
    pub name: &'static str,
    pub settings: Settings,
}

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset {
            name: "Default",
            settings: Settings::default(),
        },
        Preset {
            name: "Fine Webs",
            settings: Settings {
                num_agents: 4000,
                spawn_mode: SpawnMode::InwardCircle,
                allow_random: true,
                step_size: 1.0,
                sensor_offset_distance: 9.0,
                decay_rate: 0.25,
                diffuse_rate: 0.2,
                ..Settings::default()
            },
        },
        Preset {
            name: "Pulsing Rings",
            settings: Settings {
                num_agents: 2500,
                spawn_mode: SpawnMode::Point,
                bounce_off_edge: true,
                step_size: 2.0,
                sensor_angle_offset: 45.0,
                rotation_angle: 22.5,
                sensor_offset_distance: 16.0,
                decay_rate: 0.6,
                diffuse_rate: 0.5,
                ..Settings::default()
            },
        },
        Preset {
            name: "Coral",
            settings: Settings {
                num_agents: 6000,
                spawn_mode: SpawnMode::RandomCircle,
                step_size: 0.8,
                sensor_angle_offset: 35.0,
                rotation_angle: 60.0,
                sensor_offset_distance: 4.0,
                trail_weight: 0.6,
                decay_rate: 0.15,
                diffuse_rate: 0.1,
                ..Settings::default()
            },
        },
    ]
}

/// The built-in presets assembled into a store; entry 0 is active.
pub fn builtin_store() -> SettingsStore {
    SettingsStore::new(
        builtin_presets()
            .into_iter()
            .map(|preset| preset.settings)
            .collect(),
    )
    .validated()
}
