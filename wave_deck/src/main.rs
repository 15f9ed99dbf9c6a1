//! wave_deck — interactive entry point.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use wave_deck::app::{run, AppConfig};
use wave_gesture::GestureMode;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           Wave Deck — gesture playback controller            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Hand tracking: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Hand tracking: keyboard simulation  (use --features leap for hardware)");
    println!();

    let cfg = parse_args(std::env::args().skip(1))?;
    println!("  Preferences: {}", cfg.prefs_path.display());
    println!("  Opening window…");
    println!();

    run(cfg)
}

/// `--config <path>` picks the preference file, `--mode <none|shake|hand>`
/// overrides the stored gesture mode for this session.
fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<AppConfig> {
    let mut cfg = AppConfig::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                cfg.prefs_path = PathBuf::from(path);
            }
            "--mode" => {
                let value = args.next().context("--mode needs a value")?;
                let mode: GestureMode = value
                    .parse()
                    .with_context(|| format!("bad --mode {:?}", value))?;
                cfg.mode_override = Some(mode);
            }
            other => bail!("unknown argument {:?}", other),
        }
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn defaults_without_arguments() {
        let cfg = parse_args(args(&[])).unwrap();
        assert_eq!(cfg.prefs_path, PathBuf::from("wave_deck.json"));
        assert_eq!(cfg.mode_override, None);
    }

    #[test]
    fn config_and_mode() {
        let cfg = parse_args(args(&["--config", "/tmp/p.json", "--mode", "hand"])).unwrap();
        assert_eq!(cfg.prefs_path, PathBuf::from("/tmp/p.json"));
        assert_eq!(cfg.mode_override, Some(GestureMode::Hand));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args(&["--mode", "telepathy"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--fast"])).is_err());
    }
}
