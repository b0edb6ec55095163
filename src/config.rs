//! Command-line configuration.

use std::time::Duration;

use clap::Parser;

use crate::engine::pose::DEFAULT_SPIN_RATE;
use crate::engine::SceneSettings;
use crate::net::PollerSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "traffic_view")]
#[command(about = "3D viewer for a remote traffic simulation")]
pub struct Config {
    /// Base URL of the simulation server
    #[arg(short, long, default_value = "http://localhost:8585")]
    pub server: String,

    /// Number of cars requested in the configuration handshake
    #[arg(short, long, default_value_t = 10)]
    pub cars: u32,

    /// Seconds between polls of each feed
    #[arg(long, default_value_t = 5.0, value_parser = positive_secs)]
    pub poll_interval: f32,

    /// Seconds a new car stays hidden after it first moves [default: poll interval]
    #[arg(long, value_parser = non_negative_secs)]
    pub reveal_delay: Option<f32>,

    /// Render height of car origins above the ground
    #[arg(long, default_value_t = 0.2)]
    pub ride_height: f32,

    /// Wheel spin in degrees per second
    #[arg(long, default_value_t = DEFAULT_SPIN_RATE)]
    pub wheel_spin: f32,

    /// Grid cells along x
    #[arg(long, default_value_t = 26)]
    pub grid_width: u32,

    /// Grid cells along z
    #[arg(long, default_value_t = 26)]
    pub grid_height: u32,

    /// Show the debug HUD at startup (toggle with F3)
    #[arg(long)]
    pub show_hud: bool,
}

impl Config {
    pub fn reveal_delay(&self) -> f32 {
        self.reveal_delay.unwrap_or(self.poll_interval)
    }

    pub fn poller(&self) -> PollerSettings {
        PollerSettings {
            max_cars: self.cars,
            period: Duration::from_secs_f32(self.poll_interval),
        }
    }

    pub fn scene(&self) -> SceneSettings {
        SceneSettings {
            poll_interval: self.poll_interval,
            reveal_delay: self.reveal_delay(),
            ride_height: self.ride_height,
            spin_rate: self.wheel_spin,
            grid_width: self.grid_width,
            grid_height: self.grid_height,
        }
    }
}

fn positive_secs(s: &str) -> Result<f32, String> {
    let secs: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("{secs} is not a positive number of seconds"))
    }
}

fn non_negative_secs(s: &str) -> Result<f32, String> {
    let secs: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(format!("{secs} is not a valid delay"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["traffic_view"]);
        assert_eq!(config.server, "http://localhost:8585");
        assert_eq!(config.cars, 10);
        assert_eq!(config.poll_interval, 5.0);
        assert_eq!(config.reveal_delay(), 5.0);
        assert_eq!(config.ride_height, 0.2);
        assert_eq!(config.wheel_spin, 12.0);
        assert_eq!((config.grid_width, config.grid_height), (26, 26));
        assert!(!config.show_hud);
    }

    #[test]
    fn reveal_delay_follows_the_poll_interval_unless_set() {
        let config = Config::parse_from(["traffic_view", "--poll-interval", "2.5"]);
        assert_eq!(config.reveal_delay(), 2.5);
        assert_eq!(config.poller().period, Duration::from_millis(2500));

        let config = Config::parse_from(["traffic_view", "--poll-interval", "2.5", "--reveal-delay", "0"]);
        assert_eq!(config.scene().reveal_delay, 0.0);
        assert_eq!(config.scene().poll_interval, 2.5);
    }

    #[test]
    fn overrides() {
        let config = Config::parse_from([
            "traffic_view", "-s", "http://sim:9000", "-c", "25", "--wheel-spin", "90", "--show-hud",
        ]);
        assert_eq!(config.server, "http://sim:9000");
        assert_eq!(config.poller().max_cars, 25);
        assert_eq!(config.scene().spin_rate, 90.0);
        assert!(config.show_hud);
    }

    #[test]
    fn non_positive_poll_interval_is_rejected() {
        assert!(Config::try_parse_from(["traffic_view", "--poll-interval", "0"]).is_err());
        assert!(Config::try_parse_from(["traffic_view", "--poll-interval", "-1"]).is_err());
        assert!(Config::try_parse_from(["traffic_view", "--reveal-delay", "-1"]).is_err());
    }
}
