use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use renderer::{Antialiasing, BackendPreference};

#[derive(Parser, Debug)]
#[command(
    name = "seascape",
    author,
    version,
    about = "Full-screen displacement-map seascape",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Directory or http(s) base URL holding `dmaps/clouds.jpg`, `turska-sardiini.png` and `meri2.jpg`.
    #[arg(long, value_name = "DIR|URL", env = "SEASCAPE_ASSETS")]
    pub assets: Option<String>,

    /// Read settings from this file instead of the default config location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Open a regular window instead of going full-screen.
    #[arg(long)]
    pub windowed: bool,

    /// Window size for `--windowed` (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Graphics backend family: `auto`, `primary`, or `gl`.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<BackendPreference>,

    /// Close the window after this long (e.g. `30s`, `5m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub exit_after: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the resolved config file path.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 0 || samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_backend(value: &str) -> Result<BackendPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(BackendPreference::Auto),
        "primary" | "vulkan" | "metal" | "dx12" => Ok(BackendPreference::Primary),
        "gl" | "opengl" | "gles" => Ok(BackendPreference::Gl),
        "" => Err("backend must not be empty".to_string()),
        other => Err(format!(
            "unknown backend '{other}'; expected auto, primary, or gl"
        )),
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value.trim()).map_err(|err| format!("invalid duration: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias("OFF").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!(parse_backend("gl").unwrap(), BackendPreference::Gl);
        assert_eq!(parse_backend("Vulkan").unwrap(), BackendPreference::Primary);
        assert!(parse_backend("software").is_err());
    }

    #[test]
    fn parses_window_size() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 800 X 600 ").unwrap(), (800, 600));
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("wide").is_err());
    }

    #[test]
    fn parses_exit_after() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn flags_and_subcommand_parse_together() {
        let cli = Cli::try_parse_from([
            "seascape",
            "--assets",
            "https://example.org/static",
            "--backend",
            "gl",
            "config",
            "show",
        ])
        .unwrap();
        assert_eq!(cli.run.assets.as_deref(), Some("https://example.org/static"));
        assert_eq!(cli.run.backend, Some(BackendPreference::Gl));
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show
            }))
        ));
    }
}
