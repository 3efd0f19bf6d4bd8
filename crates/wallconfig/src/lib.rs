use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Asset shipped with the wallpaper and loaded when nothing else is requested.
pub const DEFAULT_ASSET: &str = "milk_mocha_dance.gif";
pub const DEFAULT_FPS: f32 = 60.0;
pub const DEFAULT_BACKGROUND: Rgba = Rgba([0x80, 0x80, 0x80, 0xff]);
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (1080, 1920);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 0xff {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Where the "is audio playing" signal comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Always report audio as playing; the animation never freezes.
    Active,
    /// Never report audio; the wallpaper stays on a still frame.
    Inactive,
    /// Poll a flag file each frame. Present and not `0` means playing.
    FlagFile(PathBuf),
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WallpaperConfig {
    pub version: u32,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_color_opt")]
    pub background: Option<Rgba>,
    #[serde(default, deserialize_with = "deserialize_audio_opt")]
    pub audio: Option<AudioSource>,
    #[serde(default, deserialize_with = "deserialize_size_opt")]
    pub surface: Option<(u32, u32)>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub run_for: Option<Duration>,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            version: 1,
            asset: None,
            fps: None,
            background: None,
            audio: None,
            surface: None,
            run_for: None,
        }
    }
}

impl WallpaperConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: WallpaperConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(asset) = &self.asset {
            if asset.trim().is_empty() {
                return Err(ConfigError::Invalid("asset name must not be empty".into()));
            }
        }

        if let Some(fps) = self.fps {
            if !(fps > 0.0) || !fps.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "fps must be a positive number, got {fps}"
                )));
            }
        }

        if let Some(run_for) = self.run_for {
            if run_for.is_zero() {
                return Err(ConfigError::Invalid(
                    "run_for must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn asset(&self) -> &str {
        self.asset.as_deref().unwrap_or(DEFAULT_ASSET)
    }

    pub fn fps(&self) -> f32 {
        self.fps.unwrap_or(DEFAULT_FPS)
    }

    pub fn background(&self) -> Rgba {
        self.background.unwrap_or(DEFAULT_BACKGROUND)
    }

    pub fn audio(&self) -> AudioSource {
        self.audio.clone().unwrap_or_default()
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface.unwrap_or(DEFAULT_SURFACE_SIZE)
    }

    pub fn frame_interval(&self) -> Duration {
        frame_interval_for_fps(self.fps())
    }
}

/// Delay between ticks for `fps`, truncated to whole milliseconds.
pub fn frame_interval_for_fps(fps: f32) -> Duration {
    let fps = if fps > 0.0 && fps.is_finite() {
        fps
    } else {
        DEFAULT_FPS
    };
    Duration::from_millis((1000.0 / fps) as u64)
}

pub fn parse_color(raw: &str) -> Result<Rgba, String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| format!("invalid colour '{trimmed}'; expected #RRGGBB or #RRGGBBAA"))?;
    if !matches!(hex.len(), 6 | 8) || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!(
            "invalid colour '{trimmed}'; expected #RRGGBB or #RRGGBBAA"
        ));
    }
    let channel = |index: usize| u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16);
    let mut rgba = [0xff; 4];
    for (index, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *slot = channel(index).map_err(|err| format!("invalid colour '{trimmed}': {err}"))?;
    }
    Ok(Rgba(rgba))
}

pub fn parse_audio_source(raw: &str) -> Result<AudioSource, String> {
    let trimmed = raw.trim();
    if let Some(path) = trimmed.strip_prefix("file:") {
        if path.trim().is_empty() {
            return Err("audio flag file path must not be empty".into());
        }
        return Ok(AudioSource::FlagFile(PathBuf::from(path.trim())));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "active" | "on" | "playing" | "always" => Ok(AudioSource::Active),
        "inactive" | "off" | "silent" | "never" => Ok(AudioSource::Inactive),
        other => Err(format!(
            "invalid audio source '{other}'; expected active, inactive, or file:PATH"
        )),
    }
}

pub fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{raw}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height in '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

fn deserialize_color_opt<'de, D>(deserializer: D) -> Result<Option<Rgba>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_color(&value).map_err(de::Error::custom))
        .transpose()
}

fn deserialize_audio_opt<'de, D>(deserializer: D) -> Result<Option<AudioSource>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Bool(bool),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Bool(true)) => Some(AudioSource::Active),
        Some(Helper::Bool(false)) => Some(AudioSource::Inactive),
        Some(Helper::Str(raw)) => Some(parse_audio_source(&raw).map_err(de::Error::custom)?),
    };
    Ok(result)
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<(u32, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_size(&value).map_err(de::Error::custom))
        .transpose()
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}
