use crate::settings::Color;
use image::RgbaImage;

/// The mask images a host may supply at init. The core borrows the decoded
/// pixels for the simulation's lifetime; it never copies or owns them.
#[derive(Clone, Copy, Default)]
pub struct MaskImages<'a> {
    pub attractant: Option<&'a RgbaImage>,
    pub repellent: Option<&'a RgbaImage>,
    pub obstacle: Option<&'a RgbaImage>,
}

/// Samples an optional color field at continuous grid coordinates.
///
/// A missing image samples as constant black, so the steering math downstream
/// never has to branch on mask presence. Coordinates are scaled from grid
/// space into image space and clamped to the image bounds; there is no
/// wraparound.
#[derive(Clone, Copy)]
pub struct MaskSampler<'a> {
    image: Option<&'a RgbaImage>,
    scale_x: f32,
    scale_y: f32,
}

impl<'a> MaskSampler<'a> {
    pub fn new(image: Option<&'a RgbaImage>, grid_width: u32, grid_height: u32) -> Self {
        let (scale_x, scale_y) = match image {
            Some(image) => (
                image.width() as f32 / grid_width.max(1) as f32,
                image.height() as f32 / grid_height.max(1) as f32,
            ),
            None => (1.0, 1.0),
        };

        Self {
            image,
            scale_x,
            scale_y,
        }
    }

    pub fn is_present(&self) -> bool {
        self.image.is_some()
    }

    /// Nearest-pixel sample at grid coordinate `(x, y)`, clamped to the
    /// image bounds. Pure and safe to call from every agent concurrently.
    pub fn sample(&self, x: f32, y: f32) -> Color {
        let image = match self.image {
            Some(image) => image,
            None => return Color::BLACK,
        };

        let px = ((x * self.scale_x).round()).clamp(0.0, image.width() as f32 - 1.0) as u32;
        let py = ((y * self.scale_y).round()).clamp(0.0, image.height() as f32 - 1.0) as u32;
        let pixel = image.get_pixel(px, py);

        Color::new(
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
            pixel[3] as f32 / 255.0,
        )
    }

    /// Scalar mask weight at `(x, y)`: the sample weighed against the
    /// configured mask color. Zero when the mask is absent.
    pub fn weight(&self, x: f32, y: f32, reference: &Color) -> f32 {
        if self.image.is_none() {
            return 0.0;
        }

        self.sample(x, y).weigh_against(reference)
    }
}

/// The three environment masks an agent senses against.
#[derive(Clone, Copy)]
pub struct MaskSet<'a> {
    pub attractant: MaskSampler<'a>,
    pub repellent: MaskSampler<'a>,
    pub obstacle: MaskSampler<'a>,
}

impl<'a> MaskSet<'a> {
    pub fn new(images: MaskImages<'a>, grid_width: u32, grid_height: u32) -> Self {
        Self {
            attractant: MaskSampler::new(images.attractant, grid_width, grid_height),
            repellent: MaskSampler::new(images.repellent, grid_width, grid_height),
            obstacle: MaskSampler::new(images.obstacle, grid_width, grid_height),
        }
    }

    /// Whether the obstacle mask marks `(x, y)` as impassable.
    pub fn obstacle_blocked(&self, x: f32, y: f32, obstacle_color: &Color) -> bool {
        self.obstacle.weight(x, y, obstacle_color) > 0.0
    }
}
