pub mod agent;
pub mod dispatch;
pub mod errors;
pub mod mask;
pub mod point2;
pub mod presets;
pub mod rect;
pub mod settings;
pub mod simulation;
pub mod swapper;
pub mod trail;
pub mod util;

pub use agent::{Agent, AgentPool};
pub use dispatch::{groups_needed, DispatchScheduler, GroupCount, GroupSize};
pub use errors::SimError;
pub use mask::{MaskImages, MaskSampler, MaskSet};
pub use point2::Point2;
pub use rect::Rect;
pub use settings::{Color, Settings, SettingsStore, SpawnMode};
pub use simulation::Simulation;
pub use swapper::Swapper;
pub use trail::TrailField;
