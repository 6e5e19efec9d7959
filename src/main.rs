use image::RgbaImage;
use log::{error, info};
use physarum::{MaskImages, SettingsStore, SimError, Simulation, presets};
use std::{env, process};

const FIXED_DT: f32 = 1.0 / 60.0;
const DEFAULT_FRAME_COUNT: u64 = 600;
const DEFAULT_OUTPUT: &str = "trail.png";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

/// Headless host: load a settings store (a file given on the command line,
/// or the built-in presets), simulate the requested number of frames at a
/// fixed timestep, and write the rendered field to a PNG.
///
/// Usage: physarum [SETTINGS_FILE] [FRAMES] [OUTPUT]
fn run() -> Result<(), SimError> {
    let mut args = env::args().skip(1);
    let settings_file = args.next();
    let frames = args
        .next()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_FRAME_COUNT);
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let store = match settings_file {
        Some(path) => SettingsStore::load_from_file(&path)?,
        None => presets::builtin_store(),
    };
    let active = store
        .active()
        .ok_or_else(|| SimError::Config("the settings list is empty".into()))?;

    let attractant = load_mask(&active.attractant_mask)?;
    let repellent = load_mask(&active.repellent_mask)?;
    let obstacle = load_mask(&active.obstacle_mask)?;
    let images = MaskImages {
        attractant: attractant.as_ref(),
        repellent: repellent.as_ref(),
        obstacle: obstacle.as_ref(),
    };

    let mut simulation = Simulation::new(&store, images)?;

    info!("running {} frames", frames);
    for frame in 0..frames {
        simulation.step(FIXED_DT);
        if (frame + 1) % 120 == 0 {
            info!("frame {}/{}", frame + 1, frames);
        }
    }

    let pixels = simulation.render();
    image::save_buffer(
        &output,
        &pixels,
        simulation.trail().width() as u32,
        simulation.trail().height() as u32,
        image::ColorType::Rgba8,
    )?;
    info!("wrote '{}'", output);

    Ok(())
}

fn load_mask(path: &Option<String>) -> Result<Option<RgbaImage>, SimError> {
    match path {
        Some(path) => {
            info!("loading mask image '{}'", path);
            Ok(Some(image::open(path)?.to_rgba8()))
        }
        None => Ok(None),
    }
}
