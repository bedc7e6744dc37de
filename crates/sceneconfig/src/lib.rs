use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level contents of `seascape.toml`. Every section is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub assets: AssetSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AssetSettings {
    /// Directory or `http(s)://` base URL the three scene images live under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RenderSettings {
    #[serde(
        default,
        deserialize_with = "deserialize_antialias_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub antialias: Option<AntialiasSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendSetting>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub mobile_breakpoint: f32,
    pub desktop_max_width: f32,
    pub mobile_width_factor: f32,
    pub foreground_vertical_divisor: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768.0,
            desktop_max_width: 820.0,
            mobile_width_factor: 1.1,
            foreground_vertical_divisor: 1.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSettings {
    pub displacement_sprite_scale: f32,
    pub background_scale: f32,
    pub foreground_scale: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            displacement_sprite_scale: 4.0,
            background_scale: 20.0,
            foreground_scale: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub alpha: f32,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self { alpha: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Horizontal displacement advance per frame; the vertical advance is half of it.
    pub velocity: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { velocity: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OverlaySettings {
    #[serde(
        default = "default_grace",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub grace: Duration,
    #[serde(
        default = "default_fade",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub fade: Duration,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            grace: default_grace(),
            fade: default_fade(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSetting {
    Auto,
    Primary,
    Gl,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            assets: AssetSettings::default(),
            render: RenderSettings::default(),
            layout: LayoutSettings::default(),
            filters: FilterSettings::default(),
            background: BackgroundSettings::default(),
            animation: AnimationSettings::default(),
            overlay: OverlaySettings::default(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_grace() -> Duration {
    Duration::from_millis(100)
}

fn default_fade() -> Duration {
    Duration::from_millis(1500)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            let raw = value.to_string();
            Some(parse_antialias(&raw).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(AntialiasSetting::Off),
        "2" | "samples2" => Ok(AntialiasSetting::Samples2),
        "4" | "samples4" => Ok(AntialiasSetting::Samples4),
        "8" | "samples8" => Ok(AntialiasSetting::Samples8),
        "16" | "samples16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Renders the effective configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(root) = &self.assets.root {
            if root.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "assets.root may not be empty".into(),
                ));
            }
        }

        let layout = &self.layout;
        for (name, value) in [
            ("layout.mobile_breakpoint", layout.mobile_breakpoint),
            ("layout.desktop_max_width", layout.desktop_max_width),
            ("layout.mobile_width_factor", layout.mobile_width_factor),
            (
                "layout.foreground_vertical_divisor",
                layout.foreground_vertical_divisor,
            ),
            (
                "filters.displacement_sprite_scale",
                self.filters.displacement_sprite_scale,
            ),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number (got {value})"
                )));
            }
        }

        for (name, value) in [
            ("filters.background_scale", self.filters.background_scale),
            ("filters.foreground_scale", self.filters.foreground_scale),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be >= 0")));
            }
        }

        let alpha = self.background.alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::Invalid(format!(
                "background.alpha must be within 0..=1 (got {alpha})"
            )));
        }

        if !self.animation.velocity.is_finite() {
            return Err(ConfigError::Invalid(
                "animation.velocity must be finite".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[assets]
root = "https://example.org/static"

[render]
antialias = 4
backend = "gl"

[layout]
mobile_breakpoint = 600
desktop_max_width = 900.0

[filters]
foreground_scale = 55

[background]
alpha = 0.5

[animation]
velocity = 3.5

[overlay]
grace = "250ms"
fade = 2
"#;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SceneConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.layout.mobile_breakpoint, 768.0);
        assert_eq!(config.layout.desktop_max_width, 820.0);
        assert_eq!(config.filters.background_scale, 20.0);
        assert_eq!(config.filters.foreground_scale, 40.0);
        assert_eq!(config.filters.displacement_sprite_scale, 4.0);
        assert_eq!(config.background.alpha, 0.7);
        assert_eq!(config.animation.velocity, 2.0);
        assert_eq!(config.overlay.grace, Duration::from_millis(100));
        assert_eq!(config.overlay.fade, Duration::from_millis(1500));
        assert!(config.assets.root.is_none());
    }

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(
            config.assets.root.as_deref(),
            Some("https://example.org/static")
        );
        assert_eq!(config.render.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.render.backend, Some(BackendSetting::Gl));
        assert_eq!(config.layout.mobile_breakpoint, 600.0);
        assert_eq!(config.layout.desktop_max_width, 900.0);
        assert_eq!(config.layout.mobile_width_factor, 1.1);
        assert_eq!(config.filters.foreground_scale, 55.0);
        assert_eq!(config.filters.background_scale, 20.0);
        assert_eq!(config.background.alpha, 0.5);
        assert_eq!(config.animation.velocity, 3.5);
        assert_eq!(config.overlay.grace, Duration::from_millis(250));
        assert_eq!(config.overlay.fade, Duration::from_secs(2));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = SceneConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        let err = SceneConfig::from_toml_str("[background]\nalpha = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_breakpoint() {
        let err = SceneConfig::from_toml_str("[layout]\nmobile_breakpoint = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_filter_scale() {
        let err = SceneConfig::from_toml_str("[filters]\nbackground_scale = -1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unrepresentable_durations() {
        for input in ["[overlay]\nfade = inf", "[overlay]\ngrace = 1e20", "[overlay]\nfade = nan"] {
            let err = SceneConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{input}: {err:?}");
        }
    }

    #[test]
    fn rejects_unknown_antialias() {
        let err = SceneConfig::from_toml_str("[render]\nantialias = \"3\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn renders_back_to_parseable_toml() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("grace = \"250ms\""));
        let reparsed = SceneConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
