//! 환경 변수 기반 설정 관리

use std::env;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub peer: PeerConfig,
    pub matching: MatchingConfig,
    pub maintenance_interval_secs: u64,
    pub log_level: String,
}

/// 피어 표시 이름 설정
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub max_name_length: usize,
    pub default_name: String,
}

/// 매칭 정책 설정
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    /// skip 직후 같은 상대와 다시 매칭하지 않음
    pub avoid_repeat_match: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            avoid_repeat_match: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5600,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            peer: PeerConfig {
                max_name_length: 32,
                default_name: "Stranger".to_string(),
            },
            matching: MatchingConfig::default(),
            maintenance_interval_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.cors_origins),
            peer: PeerConfig {
                max_name_length: env::var("MAX_NAME_LENGTH")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.peer.max_name_length),
                default_name: env::var("DEFAULT_NAME")
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(defaults.peer.default_name),
            },
            matching: MatchingConfig {
                avoid_repeat_match: env::var("AVOID_REPEAT_MATCH")
                    .map(|v| v != "false")
                    .unwrap_or(defaults.matching.avoid_repeat_match),
            },
            maintenance_interval_secs: env::var("MAINTENANCE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.maintenance_interval_secs),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// 모든 origin 허용 여부
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(
            parse_list("http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_wildcard_origin() {
        let mut config = Config::default();
        assert!(config.allows_any_origin());

        config.cors_origins = vec!["http://localhost:3000".to_string()];
        assert!(!config.allows_any_origin());
    }
}
