use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use actix_web::http::header::HeaderValue;
use actix_web::http::Uri;
use log::warn;

pub const DEFAULT_ARTIFACT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/models/crop_bundle.json");

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub artifact_path: PathBuf,
    pub json_limit_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            json_limit_bytes: 64 * 1024,
            cors_origins: vec!["http://localhost:8080".to_string()],
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `WORKERS`, `ARTIFACT_PATH`, `JSON_LIMIT` and
    /// `CORS_ORIGINS`, keeping the default for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .filter(|origin| {
                        let valid = is_valid_origin(origin);
                        if !valid {
                            warn!("⚠️ Origine CORS ignorée: {:?}", origin);
                        }
                        valid
                    })
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.cors_origins);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            workers: parse_or(&lookup, "WORKERS", defaults.workers).max(1),
            artifact_path: lookup("ARTIFACT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_path),
            json_limit_bytes: parse_or(&lookup, "JSON_LIMIT", defaults.json_limit_bytes),
            cors_origins,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// actix-cors refuse "*" et les URI invalides, et l'erreur n'apparaît qu'au démarrage des workers.
fn is_valid_origin(origin: &str) -> bool {
    origin != "*"
        && origin.parse::<Uri>().is_ok()
        && HeaderValue::from_str(origin).is_ok()
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("⚠️ Valeur invalide {}={:?}, utilisation de {}", key, raw, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(config.workers >= 1);
        assert!(config.artifact_path.ends_with("models/crop_bundle.json"));
        assert_eq!(config.cors_origins, vec!["http://localhost:8080"]);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("WORKERS", "3"),
            ("ARTIFACT_PATH", "/srv/crop.json"),
            ("JSON_LIMIT", "1024"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ]);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.workers, 3);
        assert_eq!(config.artifact_path, PathBuf::from("/srv/crop.json"));
        assert_eq!(config.json_limit_bytes, 1024);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn invalid_cors_origins_are_dropped() {
        let config = config_from(&[("CORS_ORIGINS", "*, https://ok.example, not a uri")]);
        assert_eq!(config.cors_origins, vec!["https://ok.example"]);
    }

    #[test]
    fn only_invalid_cors_origins_keep_default() {
        let config = config_from(&[("CORS_ORIGINS", "*")]);
        assert_eq!(config.cors_origins, vec!["http://localhost:8080"]);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "eighty"), ("WORKERS", "0")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.workers, 1);
    }
}
