use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::model::Grouping;
use crate::planner::{PlannerConfig, plan_capacity};
use crate::types::DEFAULT_MAX_PALLET_HEIGHT;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlanningConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planner: PlanningConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PALLET_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "PALLET_PLANNER_API_PORT";

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (default_ip, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the pallet planner.
#[derive(Clone, Debug, Default)]
pub struct PlanningConfig {
    planner: PlannerConfig,
}

impl PlanningConfig {
    const MAX_HEIGHT_VAR: &'static str = "PALLET_PLANNER_DEFAULT_MAX_HEIGHT";
    const GROUPING_VAR: &'static str = "PALLET_PLANNER_DEFAULT_GROUPING";
    const MAX_CARTONS_VAR: &'static str = "PALLET_PLANNER_MAX_CARTONS";

    fn from_env() -> Self {
        let max_height = load_f64_with_warning(
            Self::MAX_HEIGHT_VAR,
            DEFAULT_MAX_PALLET_HEIGHT,
            fits_pallet,
            "must fit at least one layer (20 inches) and stay countable",
        );

        let grouping = env_string(Self::GROUPING_VAR)
            .and_then(|raw| parse_grouping(&raw, Self::GROUPING_VAR))
            .unwrap_or_default();

        let max_cartons = load_u64_with_warning(
            Self::MAX_CARTONS_VAR,
            PlannerConfig::DEFAULT_MAX_CARTONS,
            |value| value > 0,
            "must be greater than 0",
        );

        let planner = PlannerConfig::builder()
            .default_max_pallet_height(max_height)
            .default_grouping(grouping)
            .max_cartons(max_cartons)
            .build();

        Self { planner }
    }

    /// Returns the configured PlannerConfig.
    pub fn planner_config(&self) -> PlannerConfig {
        self.planner
    }
}

fn fits_pallet(height: f64) -> bool {
    height.is_finite() && plan_capacity(height).is_ok()
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("⚠️ Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_grouping(raw: &str, var_name: &str) -> Option<Grouping> {
    match raw.to_ascii_lowercase().parse::<Grouping>() {
        Ok(grouping) => Some(grouping),
        Err(err) => {
            warn!("⚠️ {} ignored: {}. Using default value.", var_name, err);
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_value(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn parse_f64_value(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if validator(value) => {
            if value != default {
                info!("{} = {}", var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => parse_u64_value(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn parse_u64_value(
    var_name: &str,
    raw: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match raw.parse::<u64>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as integer: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::from_values(None, None);
        assert_eq!(config.port(), 8080);
        assert!(config.binds_to_all_interfaces());
        assert!(config.uses_default_host());
    }

    #[test]
    fn test_api_config_invalid_values_fall_back() {
        let config = ApiConfig::from_values(Some("not-an-ip".into()), Some("0".into()));
        assert_eq!(config.display_host(), "0.0.0.0");
        assert_eq!(config.port(), 8080);

        let config = ApiConfig::from_values(Some("127.0.0.1".into()), Some("70000".into()));
        assert_eq!(config.display_host(), "127.0.0.1");
        assert!(!config.binds_to_all_interfaces());
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_api_config_custom_port() {
        let config = ApiConfig::from_values(Some("::1".into()), Some("9000".into()));
        assert_eq!(config.socket_addr().port(), 9000);
        assert!(config.socket_addr().is_ipv6());
    }

    #[test]
    fn test_parse_grouping_values() {
        assert_eq!(parse_grouping("none", "TEST_VAR"), Some(Grouping::None));
        assert_eq!(parse_grouping("ITEM", "TEST_VAR"), Some(Grouping::Item));
        assert_eq!(parse_grouping("po-item", "TEST_VAR"), Some(Grouping::PoItem));
        assert_eq!(parse_grouping("pallet", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_f64_value_validation() {
        let fits = |value: f64| value >= 20.0;
        assert_eq!(parse_f64_value("TEST_VAR", "60", 93.0, fits, "hint"), 60.0);
        assert_eq!(parse_f64_value("TEST_VAR", "12", 93.0, fits, "hint"), 93.0);
        assert_eq!(parse_f64_value("TEST_VAR", "tall", 93.0, fits, "hint"), 93.0);
    }

    #[test]
    fn test_default_height_must_be_plannable() {
        assert!(fits_pallet(20.0));
        assert!(fits_pallet(93.0));
        assert!(!fits_pallet(19.5));
        assert!(!fits_pallet(f64::INFINITY));
        assert!(!fits_pallet(f64::NAN));
        assert_eq!(
            parse_f64_value("TEST_VAR", "1e300", 93.0, fits_pallet, "hint"),
            93.0
        );
        assert_eq!(
            parse_f64_value("TEST_VAR", "120", 93.0, fits_pallet, "hint"),
            120.0
        );
    }

    #[test]
    fn test_parse_u64_value_validation() {
        let positive = |value: u64| value > 0;
        assert_eq!(parse_u64_value("TEST_VAR", "500", 10, positive, "hint"), 500);
        assert_eq!(parse_u64_value("TEST_VAR", "0", 10, positive, "hint"), 10);
        assert_eq!(parse_u64_value("TEST_VAR", "-3", 10, positive, "hint"), 10);
    }

    #[test]
    fn test_planning_config_default_matches_planner() {
        assert_eq!(
            PlanningConfig::default().planner_config(),
            PlannerConfig::default()
        );
    }
}
