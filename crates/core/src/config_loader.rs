use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::EngineConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration by layering TOML and environment variables
    /// over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file("config/Wheelhouse.toml"))
            .merge(Env::prefixed("WHEELHOUSE_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration from an explicit TOML path, for tests and tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("WHEELHOUSE_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().expect("defaults should load");
            assert_eq!(config, EngineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Wheelhouse.toml",
                r#"
                [overlay]
                overwrite_cap_pct = 25
                earnings_gate = false
                "#,
            )?;
            let config = ConfigLoader::load().expect("toml should load");
            assert_eq!(config.overlay.overwrite_cap_pct, 25);
            assert!(!config.overlay.earnings_gate);
            // Untouched sections keep defaults
            assert_eq!(config.liquidity.min_open_interest, 100);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Wheelhouse.toml",
                "[liquidity]\nmin_open_interest = 250\n",
            )?;
            jail.set_env("WHEELHOUSE_LIQUIDITY__MIN_OPEN_INTEREST", "500");
            let config = ConfigLoader::load().expect("env should load");
            assert_eq!(config.liquidity.min_open_interest, 500);
            Ok(())
        });
    }
}
