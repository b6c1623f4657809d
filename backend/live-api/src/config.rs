use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub lobby_countdown_secs: u64,
    pub grading_display_secs: u64,
    pub finished_grace_secs: u64,
}

/// Engine timings derived from [`Config`], passed to the registry so
/// services never read configuration themselves.
#[derive(Debug, Clone, Copy)]
pub struct GameTimings {
    pub lobby_countdown: Duration,
    pub grading_display: Duration,
    pub finished_grace: Duration,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            // Load base config from TOML file
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let host = settings
            .get_string("server.host")
            .or_else(|_| env::var("HOST"))
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = settings
            .get_int("server.port")
            .ok()
            .map(|p| p as u16)
            .or_else(|| env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(8081);

        let lobby_countdown_secs = settings
            .get_int("game.lobby_countdown_secs")
            .map(|v| v as u64)
            .unwrap_or(5);

        let grading_display_secs = settings
            .get_int("game.grading_display_secs")
            .map(|v| v as u64)
            .unwrap_or(5);

        let finished_grace_secs = settings
            .get_int("game.finished_grace_secs")
            .map(|v| v as u64)
            .unwrap_or(60);

        Ok(Config {
            host,
            port,
            lobby_countdown_secs,
            grading_display_secs,
            finished_grace_secs,
        })
    }

    pub fn timings(&self) -> GameTimings {
        GameTimings {
            lobby_countdown: Duration::from_secs(self.lobby_countdown_secs),
            grading_display: Duration::from_secs(self.grading_display_secs),
            finished_grace: Duration::from_secs(self.finished_grace_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_convert_seconds_to_durations() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8081,
            lobby_countdown_secs: 3,
            grading_display_secs: 4,
            finished_grace_secs: 30,
        };
        let timings = config.timings();
        assert_eq!(timings.lobby_countdown, Duration::from_secs(3));
        assert_eq!(timings.grading_display, Duration::from_secs(4));
        assert_eq!(timings.finished_grace, Duration::from_secs(30));
    }
}
