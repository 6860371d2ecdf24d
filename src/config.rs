use std::path::PathBuf;

use crate::host::MenuOverlay;
use crate::scenes::SceneKind;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub hero: SceneKind,
    pub asset_dir: PathBuf,
    pub menu_delay_ms: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            hero: SceneKind::ParticleCloud,
            asset_dir: PathBuf::from("assets"),
            menu_delay_ms: MenuOverlay::DEFAULT_OPEN_DELAY_MS,
        }
    }
}

impl ViewerConfig {
    pub const HERO_VAR: &'static str = "SHOWREEL_HERO";
    pub const ASSETS_VAR: &'static str = "SHOWREEL_ASSETS";
    pub const MENU_DELAY_VAR: &'static str = "SHOWREEL_MENU_DELAY_MS";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unknown or malformed values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(hero) = lookup(Self::HERO_VAR) {
            match parse_hero(&hero) {
                Some(kind) => config.hero = kind,
                None => log::warn!(
                    "{}={:?} is not one of particles, blob; using {}",
                    Self::HERO_VAR,
                    hero,
                    config.hero.name()
                ),
            }
        }

        if let Some(dir) = lookup(Self::ASSETS_VAR).filter(|dir| !dir.trim().is_empty()) {
            config.asset_dir = PathBuf::from(dir);
        }

        if let Some(delay) = lookup(Self::MENU_DELAY_VAR) {
            match delay.trim().parse::<f64>() {
                Ok(delay) if delay.is_finite() && delay >= 0.0 => config.menu_delay_ms = delay,
                _ => log::warn!(
                    "{}={:?} is not a delay in milliseconds; using {}",
                    Self::MENU_DELAY_VAR,
                    delay,
                    config.menu_delay_ms
                ),
            }
        }

        config
    }
}

fn parse_hero(value: &str) -> Option<SceneKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "particles" | "particle" => Some(SceneKind::ParticleCloud),
        "blob" | "mesh" => Some(SceneKind::DeformableMesh),
        _ => None,
    }
}
