//! Per-wallet behavioral profiles: how often a wallet sits out a whole
//! session and how much its pacing stretches or compresses.

use crate::error::ConsoleError;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named behavioral profile assigned to a wallet. Immutable once
/// assigned; swapped wholesale when the persona mode changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    /// Cosmetic identity string carried into log exports
    pub user_agent: String,
    /// Probability (0..1) that a session is fully idle
    pub idle_chance: f64,
    /// Multiplier applied to every generated delay for this wallet
    pub delay_factor: f64,
}

/// Persona selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaMode {
    /// Uniform pick from the catalog per wallet
    Random,
    Speedy,
    Steady,
    Cautious,
    Lazy,
}

impl FromStr for PersonaMode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(PersonaMode::Random),
            "speedy" => Ok(PersonaMode::Speedy),
            "steady" => Ok(PersonaMode::Steady),
            "cautious" => Ok(PersonaMode::Cautious),
            "lazy" => Ok(PersonaMode::Lazy),
            other => Err(ConsoleError::InvalidConfiguration(format!(
                "unknown persona mode '{}'",
                other
            ))),
        }
    }
}

/// Hands out personas from a small fixed catalog. The `steady` entry
/// takes its idle chance from the run configuration, so pinning the mode
/// to `steady` reproduces pure-config pacing.
pub struct PersonaManager {
    steady_idle_chance: f64,
}

impl PersonaManager {
    /// `wallet_idle_chance_pct` is the configured session idle chance in percent
    pub fn new(wallet_idle_chance_pct: u32) -> Self {
        Self {
            steady_idle_chance: f64::from(wallet_idle_chance_pct) / 100.0,
        }
    }

    /// Resolve a persona for a wallet according to the configured mode
    pub fn persona_by_mode(&self, mode: PersonaMode) -> Persona {
        match mode {
            PersonaMode::Random => self
                .catalog()
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_else(|| self.steady()),
            PersonaMode::Speedy => Self::speedy(),
            PersonaMode::Steady => self.steady(),
            PersonaMode::Cautious => Self::cautious(),
            PersonaMode::Lazy => Self::lazy(),
        }
    }

    fn catalog(&self) -> Vec<Persona> {
        vec![
            Self::speedy(),
            self.steady(),
            Self::cautious(),
            Self::lazy(),
        ]
    }

    fn speedy() -> Persona {
        Persona {
            name: "speedy".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/124.0".to_string(),
            idle_chance: 0.05,
            delay_factor: 0.45,
        }
    }

    fn steady(&self) -> Persona {
        Persona {
            name: "steady".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) Safari/605.1.15"
                .to_string(),
            idle_chance: self.steady_idle_chance,
            delay_factor: 1.0,
        }
    }

    fn cautious() -> Persona {
        Persona {
            name: "cautious".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/125.0".to_string(),
            idle_chance: 0.35,
            delay_factor: 1.6,
        }
    }

    fn lazy() -> Persona {
        Persona {
            name: "lazy".to_string(),
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) Mobile/15E148"
                .to_string(),
            idle_chance: 0.5,
            delay_factor: 2.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_modes_are_deterministic() {
        let manager = PersonaManager::new(30);
        for _ in 0..20 {
            assert_eq!(manager.persona_by_mode(PersonaMode::Speedy).name, "speedy");
            assert_eq!(manager.persona_by_mode(PersonaMode::Lazy).name, "lazy");
        }
    }

    #[test]
    fn test_steady_uses_configured_idle_chance() {
        let manager = PersonaManager::new(45);
        let persona = manager.persona_by_mode(PersonaMode::Steady);
        assert!((persona.idle_chance - 0.45).abs() < f64::EPSILON);
        assert_eq!(persona.delay_factor, 1.0);
    }

    #[test]
    fn test_random_mode_draws_from_catalog() {
        let manager = PersonaManager::new(30);
        let names = ["speedy", "steady", "cautious", "lazy"];
        for _ in 0..50 {
            let persona = manager.persona_by_mode(PersonaMode::Random);
            assert!(names.contains(&persona.name.as_str()));
            assert!(persona.delay_factor > 0.0);
            assert!((0.0..=1.0).contains(&persona.idle_chance));
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("random".parse::<PersonaMode>().unwrap(), PersonaMode::Random);
        assert!("ghost".parse::<PersonaMode>().is_err());
    }
}
