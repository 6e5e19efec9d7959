use crate::{
    dispatch::DispatchScheduler,
    errors::SimError,
    mask::MaskSampler,
    settings::Settings,
    swapper::Swapper,
    util::lerp,
};
use grid::Grid;
use log::debug;
use rayon::prelude::*;

/// The scalar trail signal agents deposit into and steer by.
///
/// The field is double-buffered: diffusion is a neighborhood function of the
/// previous generation, so each pass reads the current buffer, writes the
/// scratch buffer, and swaps. Cell values are never negative.
pub struct TrailField {
    buffers: Swapper<Grid<f32>>,
    width: usize,
    height: usize,
}

impl TrailField {
    pub fn new(width: u32, height: u32) -> Result<Self, SimError> {
        let cell_count = (width as usize)
            .checked_mul(height as usize)
            .ok_or(SimError::Resource { width, height })?;

        let mut cells: Vec<f32> = Vec::new();
        cells
            .try_reserve_exact(cell_count)
            .map_err(|_| SimError::Resource { width, height })?;
        cells.resize(cell_count, 0.0);

        let grid = Grid::from_vec(cells, width as usize);
        debug!(
            "allocated trail buffers with {} rows and {} columns",
            grid.rows(),
            grid.cols()
        );

        Ok(Self {
            buffers: Swapper::new(grid.clone(), grid),
            width: width as usize,
            height: height as usize,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value of a single cell; zero outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.buffers
            .current()
            .get(y, x)
            .copied()
            .unwrap_or(0.0)
    }

    /// Average trail signal in the square neighborhood of the given radius
    /// around `(x, y)`, with indices clamped at the grid edge. A probe whose
    /// center falls outside the grid reads zero.
    pub fn sense_average(&self, x: f32, y: f32, radius: u32) -> f32 {
        let cx = x.round();
        let cy = y.round();
        if cx < 0.0 || cx >= self.width as f32 || cy < 0.0 || cy >= self.height as f32 {
            return 0.0;
        }

        let (cx, cy) = (cx as usize, cy as usize);
        let radius = radius as i32;
        let grid = self.buffers.current();
        let mut sum = 0.0;
        let mut count = 0u32;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let nx = offset_clamped(cx, dx, self.width);
                let ny = offset_clamped(cy, dy, self.height);
                sum += *grid.get(ny, nx).expect("clamped index is in range");
                count += 1;
            }
        }

        sum / count as f32
    }

    /// Add `amount` into each listed cell. Addition commutes, so deposits
    /// from the whole population merge order-independently; a cell listed
    /// twice receives twice the amount, never an overwrite.
    pub fn deposit(&mut self, cells: &[(u32, u32)], amount: f32) {
        let grid = self.buffers.current_mut();
        for &(x, y) in cells {
            match grid.get_mut(y as usize, x as usize) {
                Some(cell) => *cell += amount,
                None => debug!("deposit at ({}, {}) fell outside the trail grid", x, y),
            }
        }
    }

    /// One decay-and-diffusion pass: blend every cell toward its 3x3
    /// neighborhood average (optionally weighted toward attractant-masked
    /// cells), then decay it, reading only the pre-pass buffer. Finishes by
    /// swapping the buffers; the swap is the sub-step barrier.
    pub fn diffuse_and_decay(
        &mut self,
        settings: &Settings,
        attractant: &MaskSampler<'_>,
        dt: f32,
        scheduler: &DispatchScheduler,
    ) {
        let width = self.width;
        let height = self.height;
        let diffuse_rate = settings.diffuse_rate;
        let bias = settings.trail_attractive_strength;
        let attractant_color = settings.attractant_color;
        let attractant = *attractant;
        let keep = (1.0 - settings.decay_rate * dt).max(0.0);

        let (current, scratch) = self.buffers.read_current_write_scratch();

        let fresh: Vec<f32> = scheduler
            .row_groups(height)
            .into_par_iter()
            .flat_map_iter(move |band| {
                band.flat_map(move |y| {
                    (0..width).map(move |x| {
                        let mut sum = 0.0f32;
                        let mut weight_sum = 0.0f32;

                        for dy in -1i32..=1 {
                            for dx in -1i32..=1 {
                                let nx = offset_clamped(x, dx, width);
                                let ny = offset_clamped(y, dy, height);
                                let neighbor =
                                    *current.get(ny, nx).expect("clamped index is in range");
                                let weight = 1.0
                                    + bias
                                        * attractant.weight(
                                            nx as f32,
                                            ny as f32,
                                            &attractant_color,
                                        );
                                sum += neighbor * weight;
                                weight_sum += weight;
                            }
                        }

                        let original = *current.get(y, x).expect("cell index is in range");
                        let average = sum / weight_sum;
                        let diffused = lerp(original, average, diffuse_rate);
                        let next = (diffused * keep).max(0.0);
                        debug_assert!(next.is_finite(), "trail cell became non-finite");
                        next
                    })
                })
            })
            .collect();

        for (cell, value) in scratch.iter_mut().zip(fresh) {
            *cell = value;
        }

        self.buffers.swap();
    }

    pub fn total(&self) -> f32 {
        self.buffers.current().iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.buffers.current().iter()
    }
}

fn offset_clamped(base: usize, delta: i32, len: usize) -> usize {
    (base as i64 + delta as i64).clamp(0, len as i64 - 1) as usize
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::settings::Color;
    use image::{Rgba, RgbaImage};

    fn no_mask() -> MaskSampler<'static> {
        MaskSampler::new(None, 1, 1)
    }

    fn fill(trail: &mut TrailField, value: f32) {
        let cells: Vec<(u32, u32)> = (0..trail.height() as u32)
            .flat_map(|y| (0..trail.width() as u32).map(move |x| (x, y)))
            .collect();
        trail.deposit(&cells, value);
    }

    #[test]
    fn oversized_grid_is_rejected_at_init() {
        match TrailField::new(u32::MAX, u32::MAX) {
            Err(SimError::Resource { .. }) => {}
            other => panic!("expected a resource error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn deposits_accumulate_additively() {
        let mut trail = TrailField::new(3, 3).unwrap();

        trail.deposit(&[(1, 1), (1, 1), (0, 2)], 2.5);

        assert_eq!(trail.get(1, 1), 5.0);
        assert_eq!(trail.get(0, 2), 2.5);
        assert_eq!(trail.total(), 7.5);
    }

    #[test]
    fn deposits_outside_the_grid_are_ignored() {
        let mut trail = TrailField::new(3, 3).unwrap();

        trail.deposit(&[(3, 0), (0, 3), (100, 100)], 1.0);

        assert_eq!(trail.total(), 0.0);
    }

    #[test]
    fn empty_field_stays_empty_through_diffusion() {
        let mut trail = TrailField::new(3, 3).unwrap();
        let settings = Settings::default();
        let scheduler = DispatchScheduler::default();

        trail.diffuse_and_decay(&settings, &no_mask(), 0.016, &scheduler);

        assert!(trail.iter().all(|&cell| cell == 0.0));
    }

    #[test]
    fn uniform_field_is_unchanged_by_diffusion_without_decay() {
        let mut trail = TrailField::new(4, 3).unwrap();
        fill(&mut trail, 1.0);
        let settings = Settings {
            diffuse_rate: 1.0,
            decay_rate: 0.0,
            ..Settings::default()
        };
        let scheduler = DispatchScheduler::default();

        trail.diffuse_and_decay(&settings, &no_mask(), 0.016, &scheduler);

        // Edge sampling clamps instead of wrapping, so a uniform field has a
        // uniform neighborhood average everywhere, corners included.
        assert!(trail.iter().all(|&cell| (cell - 1.0).abs() < 1e-6));
    }

    #[test]
    fn diffusion_spreads_a_deposit_into_its_neighborhood() {
        let mut trail = TrailField::new(3, 3).unwrap();
        trail.deposit(&[(1, 1)], 9.0);
        let settings = Settings {
            diffuse_rate: 1.0,
            decay_rate: 0.0,
            ..Settings::default()
        };
        let scheduler = DispatchScheduler::default();

        trail.diffuse_and_decay(&settings, &no_mask(), 0.016, &scheduler);

        assert!(trail.get(1, 1) < 9.0, "center should shed signal");
        assert!(trail.get(0, 0) > 0.0, "corner should gain signal");
        assert!((trail.total() - 9.0).abs() < 1e-4, "diffusion conserves signal");
    }

    #[test]
    fn decay_strictly_shrinks_the_field_until_it_reaches_zero() {
        let mut trail = TrailField::new(4, 4).unwrap();
        trail.deposit(&[(0, 0), (1, 2), (3, 3)], 2.0);
        let settings = Settings {
            diffuse_rate: 0.25,
            decay_rate: 1.0,
            ..Settings::default()
        };
        let scheduler = DispatchScheduler::default();

        // decay_rate * dt = 0.5 exactly, so every positive cell halves each
        // pass and even subnormal remnants round down to zero.
        let mut previous_total = trail.total();
        for _ in 0..2000 {
            trail.diffuse_and_decay(&settings, &no_mask(), 0.5, &scheduler);
            let total = trail.total();
            if previous_total > 0.0 {
                assert!(
                    total < previous_total,
                    "total should strictly decrease: {} -> {}",
                    previous_total,
                    total
                );
            }
            previous_total = total;
        }

        assert_eq!(previous_total, 0.0);
    }

    #[test]
    fn values_never_go_negative_even_under_extreme_decay() {
        let mut trail = TrailField::new(4, 4).unwrap();
        fill(&mut trail, 3.0);
        let settings = Settings {
            decay_rate: 10.0,
            ..Settings::default()
        };
        let scheduler = DispatchScheduler::default();

        trail.diffuse_and_decay(&settings, &no_mask(), 1.0, &scheduler);

        assert!(trail.iter().all(|&cell| cell >= 0.0));
        assert_eq!(trail.total(), 0.0);
    }

    #[test]
    fn attractant_weighting_pulls_diffusion_toward_masked_cells() {
        let center_only = RgbaImage::from_fn(3, 3, |x, y| {
            if x == 1 && y == 1 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let settings = Settings {
            diffuse_rate: 1.0,
            decay_rate: 0.0,
            trail_attractive_strength: 3.0,
            attractant_color: Color::WHITE,
            ..Settings::default()
        };
        let scheduler = DispatchScheduler::default();

        let mut unbiased = TrailField::new(3, 3).unwrap();
        unbiased.deposit(&[(1, 1)], 9.0);
        unbiased.diffuse_and_decay(&settings, &no_mask(), 0.016, &scheduler);

        let mut biased = TrailField::new(3, 3).unwrap();
        biased.deposit(&[(1, 1)], 9.0);
        let sampler = MaskSampler::new(Some(&center_only), 3, 3);
        biased.diffuse_and_decay(&settings, &sampler, 0.016, &scheduler);

        // The deposit sits on the attractant-marked cell, so its signal
        // weighs more in every neighbor's average.
        assert!(biased.get(0, 0) > unbiased.get(0, 0));
    }
}
