use crate::config::{BackgroundConfig, check_num};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rmp_serde::encode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

/// Most wave grid dots drawn in one frame.
pub const MAX_WAVE_DOTS: usize = 100_000;

/// Drifting particle drawn over the wave grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub speed_x: f64,
    pub speed_y: f64,
    pub opacity: f64,
}

/// Dot of the flowing background grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveDot {
    pub x: f64,
    pub y: f64,
    pub alpha: f64,
}

/// Everything drawn in one frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub dots: Vec<WaveDot>,
    pub particles: Vec<Particle>,
}

/// Window resize applied before a given frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resize {
    pub frame: usize,
    pub width: f64,
    pub height: f64,
}

impl FromStr for Resize {
    type Err = String;

    /// Parse `FRAME:WIDTHxHEIGHT`, e.g. `60:800x600`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (frame, size) = s
            .split_once(':')
            .ok_or_else(|| format!("expected FRAME:WIDTHxHEIGHT, got {s:?}"))?;
        let (width, height) = size
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {size:?}"))?;
        Ok(Self {
            frame: frame.parse().map_err(|e| format!("invalid frame {frame:?}: {e}"))?,
            width: width.parse().map_err(|e| format!("invalid width {width:?}: {e}"))?,
            height: height.parse().map_err(|e| format!("invalid height {height:?}: {e}"))?,
        })
    }
}

/// Decorative background animation.
///
/// Holds the configuration, the canvas size, the animation time and the particles.
pub struct Field {
    cfg: BackgroundConfig,
    width: f64,
    height: f64,
    time: f64,
    particles: Vec<Particle>,
}

impl Field {
    /// Create a field of randomly placed particles on a `width x height` canvas.
    ///
    /// Uses the configured seed, or OS entropy when there is none.
    pub fn new(cfg: BackgroundConfig, width: f64, height: f64) -> Result<Self> {
        check_canvas(&cfg, width, height)?;

        let mut rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let x_dist = Uniform::new(0.0, width)?;
        let y_dist = Uniform::new(0.0, height)?;
        let size_dist = Uniform::new(cfg.min_size, cfg.max_size)?;
        let speed_dist = Uniform::new(-cfg.max_speed, cfg.max_speed)?;
        let opacity_dist = Uniform::new(cfg.min_opacity, cfg.max_opacity)?;

        let mut particles = Vec::with_capacity(cfg.n_particles);
        for _ in 0..cfg.n_particles {
            particles.push(Particle {
                x: x_dist.sample(&mut rng),
                y: y_dist.sample(&mut rng),
                size: size_dist.sample(&mut rng),
                speed_x: speed_dist.sample(&mut rng),
                speed_y: speed_dist.sample(&mut rng),
                opacity: opacity_dist.sample(&mut rng),
            });
        }

        Ok(Self {
            cfg,
            width,
            height,
            time: 0.0,
            particles,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Follow a window resize. Particles keep their positions and wrap on the next step.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        check_canvas(&self.cfg, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Advance one frame and return what it draws.
    pub fn step(&mut self) -> Frame {
        self.time += self.cfg.time_step;

        for p in &mut self.particles {
            p.x += p.speed_x;
            p.y += p.speed_y;

            // Wrap around edges.
            if p.x < 0.0 {
                p.x = self.width;
            }
            if p.x > self.width {
                p.x = 0.0;
            }
            if p.y < 0.0 {
                p.y = self.height;
            }
            if p.y > self.height {
                p.y = 0.0;
            }
        }

        Frame {
            time: self.time,
            dots: self.wave_grid(),
            particles: self.particles.clone(),
        }
    }

    fn wave_grid(&self) -> Vec<WaveDot> {
        let spacing = self.cfg.grid_spacing;
        let amp = self.cfg.wave_amplitude;
        let (n_cols, n_rows) = grid_shape(spacing, self.width, self.height);

        let mut dots = Vec::with_capacity(n_cols * n_rows);
        for i_col in 0..n_cols {
            let x = i_col as f64 * spacing;
            for i_row in 0..n_rows {
                let y = i_row as f64 * spacing;
                let wave = (x * 0.01 + y * 0.01 + self.time).sin() * amp;
                let alpha = 0.1 + (wave + amp) / (2.0 * amp) * (0.3 - 0.1);
                dots.push(WaveDot {
                    x,
                    y: y + wave,
                    alpha,
                });
            }
        }
        dots
    }

    /// Run `n_frames` frames and save them MessagePack-encoded, one after another.
    ///
    /// Each resize takes effect right before its frame is drawn.
    pub fn render_frames<P: AsRef<Path>>(
        &mut self,
        n_frames: usize,
        resizes: &[Resize],
        file: P,
    ) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        for i_frame in 0..n_frames {
            for resize in resizes.iter().filter(|r| r.frame == i_frame) {
                self.resize(resize.width, resize.height)
                    .with_context(|| format!("failed to resize at frame {i_frame}"))?;
                log::info!("resized to {}x{} at frame {i_frame}", resize.width, resize.height);
            }
            let frame = self.step();
            encode::write(&mut writer, &frame).context("failed to serialize frame")?;

            if (i_frame + 1) % 60 == 0 || i_frame + 1 == n_frames {
                let progress = 100.0 * (i_frame + 1) as f64 / n_frames as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }
}

fn grid_shape(spacing: f64, width: f64, height: f64) -> (usize, usize) {
    let n_cols = (width / spacing).ceil() as usize;
    let n_rows = (height / spacing).ceil() as usize;
    (n_cols, n_rows)
}

fn check_canvas(cfg: &BackgroundConfig, width: f64, height: f64) -> Result<()> {
    check_num(width, 1.0..=16_384.0).context("invalid canvas width")?;
    check_num(height, 1.0..=16_384.0).context("invalid canvas height")?;
    let (n_cols, n_rows) = grid_shape(cfg.grid_spacing, width, height);
    check_num(n_cols.saturating_mul(n_rows), 0..=MAX_WAVE_DOTS)
        .with_context(|| format!("wave grid too dense for a {width}x{height} canvas"))?;
    Ok(())
}
