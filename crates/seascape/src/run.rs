use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use renderer::{
    Antialiasing, AssetRoot, BackendPreference, FilterTuning, LayoutRules, OverlayTiming,
    Renderer, RendererConfig, SceneTuning, WindowMode,
};
use sceneconfig::{AntialiasSetting, BackendSetting, SceneConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Asset root used when neither the CLI, the environment nor the config file name one.
pub const DEFAULT_ASSET_ROOT: &str = "public";

const DEFAULT_WINDOWED_SIZE: (u32, u32) = (1280, 720);

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (config_path, config) = effective_config(&paths, &args)?;
    tracing::debug!(config = %config_path.display(), "resolved configuration");

    let renderer_config = renderer_config(&config, &args)?;
    let renderer = Renderer::new(renderer_config)?;

    if let Some(delay) = args.exit_after {
        let teardown = renderer.teardown_handle();
        thread::Builder::new()
            .name("exit-after".into())
            .spawn(move || {
                thread::sleep(delay);
                tracing::info!(after = ?delay, "exit timer elapsed");
                teardown.request();
            })
            .map_err(|err| anyhow!("failed to spawn exit timer: {err}"))?;
    }

    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the config file (if any) and folds in the CLI and environment overrides.
pub fn effective_config(paths: &AppPaths, args: &RunArgs) -> Result<(PathBuf, SceneConfig)> {
    let path = paths.resolve_config_file(args.config.as_deref());
    let mut config = load_config(&path, args.config.is_some())?;
    apply_overrides(&mut config, args);
    config
        .validate()
        .context("configuration is invalid after applying command-line overrides")?;
    Ok((path, config))
}

fn load_config(path: &Path, required: bool) -> Result<SceneConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file {} does not exist", path.display());
        }
        tracing::debug!(path = %path.display(), "no config file; using built-in defaults");
        return Ok(SceneConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    SceneConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config file {}", path.display()))
}

fn apply_overrides(config: &mut SceneConfig, args: &RunArgs) {
    if let Some(root) = &args.assets {
        config.assets.root = Some(root.clone());
    }
    if let Some(antialias) = args.antialias {
        config.render.antialias = Some(antialias_setting(antialias));
    }
    if let Some(backend) = args.backend {
        config.render.backend = Some(backend_setting(backend));
    }
}

pub fn renderer_config(config: &SceneConfig, args: &RunArgs) -> Result<RendererConfig> {
    let root = config
        .assets
        .root
        .as_deref()
        .unwrap_or(DEFAULT_ASSET_ROOT);
    let asset_root =
        AssetRoot::parse(root).with_context(|| format!("invalid asset root '{root}'"))?;

    let window_mode = if args.windowed {
        let (width, height) = args.size.unwrap_or(DEFAULT_WINDOWED_SIZE);
        WindowMode::Windowed { width, height }
    } else {
        if args.size.is_some() {
            tracing::warn!("--size only applies with --windowed; ignoring");
        }
        WindowMode::Fullscreen
    };

    let mut renderer_config = RendererConfig::new(asset_root);
    renderer_config.window_mode = window_mode;
    renderer_config.antialiasing = config
        .render
        .antialias
        .map(antialiasing_from_setting)
        .unwrap_or_default();
    renderer_config.backend = config
        .render
        .backend
        .map(backend_from_setting)
        .unwrap_or_default();
    renderer_config.tuning = scene_tuning(config);
    Ok(renderer_config)
}

fn scene_tuning(config: &SceneConfig) -> SceneTuning {
    SceneTuning {
        layout: LayoutRules {
            mobile_breakpoint: config.layout.mobile_breakpoint,
            desktop_max_width: config.layout.desktop_max_width,
            mobile_width_factor: config.layout.mobile_width_factor,
            foreground_vertical_divisor: config.layout.foreground_vertical_divisor,
        },
        filters: FilterTuning {
            displacement_sprite_scale: config.filters.displacement_sprite_scale,
            background_scale: config.filters.background_scale,
            foreground_scale: config.filters.foreground_scale,
        },
        background_alpha: config.background.alpha,
        velocity: config.animation.velocity,
        overlay: OverlayTiming {
            grace: config.overlay.grace,
            fade: config.overlay.fade,
        },
    }
}

fn antialias_setting(value: Antialiasing) -> AntialiasSetting {
    match value {
        Antialiasing::Auto => AntialiasSetting::Auto,
        Antialiasing::Off => AntialiasSetting::Off,
        Antialiasing::Samples(samples) => {
            AntialiasSetting::from_samples(samples).unwrap_or(AntialiasSetting::Auto)
        }
    }
}

fn antialiasing_from_setting(value: AntialiasSetting) -> Antialiasing {
    match value {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples2 => Antialiasing::Samples(2),
        AntialiasSetting::Samples4 => Antialiasing::Samples(4),
        AntialiasSetting::Samples8 => Antialiasing::Samples(8),
        AntialiasSetting::Samples16 => Antialiasing::Samples(16),
    }
}

fn backend_setting(value: BackendPreference) -> BackendSetting {
    match value {
        BackendPreference::Auto => BackendSetting::Auto,
        BackendPreference::Primary => BackendSetting::Primary,
        BackendPreference::Gl => BackendSetting::Gl,
    }
}

fn backend_from_setting(value: BackendSetting) -> BackendPreference {
    match value {
        BackendSetting::Auto => BackendPreference::Auto,
        BackendSetting::Primary => BackendPreference::Primary,
        BackendSetting::Gl => BackendPreference::Gl,
    }
}
