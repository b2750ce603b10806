use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Where the ordered list of gallery images comes from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CatalogSource {
    /// A local directory treated as the image bucket (scanned recursively).
    Directory { path: PathBuf },
    /// A listing endpoint returning `{ images: [...], total }`.
    Http { url: String },
}

impl Default for CatalogSource {
    fn default() -> Self {
        Self::Directory {
            path: PathBuf::from("photos"),
        }
    }
}

/// A `[start, end]` window expressed as a fraction of the depth range.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CurveWindow {
    pub start: f32,
    pub end: f32,
}

impl CurveWindow {
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    fn validate(&self, name: &str) -> Result<()> {
        ensure!(
            self.start.is_finite() && self.end.is_finite(),
            "{name} must be finite"
        );
        ensure!(
            (0.0..=1.0).contains(&self.start) && (0.0..=1.0).contains(&self.end),
            "{name} must lie within [0, 1]"
        );
        ensure!(self.start < self.end, "{name}.start must be below {name}.end");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FadeSettings {
    pub fade_in: CurveWindow,
    pub fade_out: CurveWindow,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            fade_in: CurveWindow::new(0.05, 0.25),
            fade_out: CurveWindow::new(0.4, 0.43),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlurSettings {
    pub blur_in: CurveWindow,
    pub blur_out: CurveWindow,
    pub max_blur: f32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            blur_in: CurveWindow::new(0.0, 0.1),
            blur_out: CurveWindow::new(0.4, 0.43),
            max_blur: 8.0,
        }
    }
}

/// Tuning for the scroll gallery simulation and its presentation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GalleryOptions {
    /// Number of image planes in the depth pool, independent of catalog size.
    pub visible_count: usize,
    /// Length of the looping z axis.
    pub depth_range: f32,
    /// Multiplier applied to every input impulse.
    pub speed: f32,
    /// Converts velocity * seconds into depth units.
    pub depth_scale: f32,
    /// Per-frame velocity multiplier.
    pub damping: f32,
    /// Wheel delta (pixels) to velocity factor.
    pub wheel_factor: f32,
    /// Velocity added per arrow key press.
    pub key_impulse: f32,
    /// Forward drift added per second while auto-play is active.
    pub auto_play_acceleration: f32,
    /// Time without input before auto-play resumes.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// How often the idle check runs.
    #[serde(with = "humantime_serde")]
    pub idle_check_interval: Duration,
    /// Duration of the global opacity ramp once preloading settles.
    #[serde(with = "humantime_serde")]
    pub intro_fade: Duration,
    pub fade: FadeSettings,
    pub blur: BlurSettings,
    pub max_horizontal_offset: f32,
    pub max_vertical_offset: f32,
    /// Short edge of every plane, in world units.
    pub plane_size: f32,
    pub field_of_view_deg: f32,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            visible_count: 12,
            depth_range: 50.0,
            speed: 1.2,
            depth_scale: 10.0,
            damping: 0.95,
            wheel_factor: 0.01,
            key_impulse: 2.0,
            auto_play_acceleration: 0.48,
            idle_timeout: Duration::from_secs(3),
            idle_check_interval: Duration::from_secs(1),
            intro_fade: Duration::from_secs(4),
            fade: FadeSettings::default(),
            blur: BlurSettings::default(),
            max_horizontal_offset: 8.0,
            max_vertical_offset: 8.0,
            plane_size: 2.0,
            field_of_view_deg: 55.0,
        }
    }
}

impl GalleryOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.visible_count > 0,
            "gallery.visible-count must be greater than zero"
        );
        ensure!(
            self.depth_range.is_finite() && self.depth_range > 0.0,
            "gallery.depth-range must be positive"
        );
        ensure!(
            self.speed.is_finite() && self.speed > 0.0,
            "gallery.speed must be positive"
        );
        ensure!(
            self.depth_scale.is_finite() && self.depth_scale > 0.0,
            "gallery.depth-scale must be positive"
        );
        ensure!(
            self.damping > 0.0 && self.damping < 1.0,
            "gallery.damping must be within (0, 1)"
        );
        ensure!(
            self.auto_play_acceleration >= 0.0,
            "gallery.auto-play-acceleration must not be negative"
        );
        ensure!(
            self.idle_check_interval > Duration::ZERO,
            "gallery.idle-check-interval must be positive"
        );
        ensure!(
            self.plane_size > 0.0,
            "gallery.plane-size must be positive"
        );
        ensure!(
            self.field_of_view_deg > 1.0 && self.field_of_view_deg < 179.0,
            "gallery.field-of-view-deg must be within (1, 179)"
        );

        self.fade.fade_in.validate("gallery.fade.fade-in")?;
        self.fade.fade_out.validate("gallery.fade.fade-out")?;
        ensure!(
            self.fade.fade_in.end <= self.fade.fade_out.start,
            "gallery.fade.fade-in must end before gallery.fade.fade-out starts"
        );
        self.blur.blur_in.validate("gallery.blur.blur-in")?;
        self.blur.blur_out.validate("gallery.blur.blur-out")?;
        ensure!(
            self.blur.blur_in.end <= self.blur.blur_out.start,
            "gallery.blur.blur-in must end before gallery.blur.blur-out starts"
        );
        ensure!(
            self.blur.max_blur.is_finite() && self.blur.max_blur >= 0.0,
            "gallery.blur.max-blur must not be negative"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WindowOptions {
    pub title: String,
    pub fullscreen: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Infinite Gallery".to_string(),
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Image catalog provider.
    pub catalog: CatalogSource,
    /// Scroll gallery tuning.
    pub gallery: GalleryOptions,
    /// Maximum number of concurrent image fetches in the loader.
    pub loader_max_concurrent_fetches: usize,
    /// Longest texture edge; larger images are downscaled before upload.
    pub max_texture_dim: u32,
    pub window: WindowOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.loader_max_concurrent_fetches > 0,
            "loader-max-concurrent-fetches must be greater than zero"
        );
        ensure!(
            self.max_texture_dim > 0,
            "max-texture-dim must be greater than zero"
        );
        if let CatalogSource::Http { url } = &self.catalog {
            ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "catalog.url must be an http(s) URL"
            );
        }
        self.gallery
            .validate()
            .context("invalid gallery configuration")?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            catalog: CatalogSource::default(),
            gallery: GalleryOptions::default(),
            loader_max_concurrent_fetches: 4,
            max_texture_dim: 2048,
            window: WindowOptions::default(),
        }
    }
}
