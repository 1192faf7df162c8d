use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Runtime environment. Decides whether an unreachable database is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnv::Production),
            "development" | "dev" | "test" => Ok(AppEnv::Development),
            other => anyhow::bail!("unknown APP_ENV {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Local resume directory, served under `/uploads` when S3 is not configured.
    pub dir: PathBuf,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: AppEnv,
    pub database_url: Option<String>,
    pub connect_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = match std::env::var("APP_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => AppEnv::Development,
        };
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let connect_timeout_secs = std::env::var("DB_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "jobboard".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "jobboard-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 60),
        };
        let s3 = match (
            std::env::var("MINIO_ENDPOINT"),
            std::env::var("MINIO_BUCKET"),
            std::env::var("MINIO_ACCESS_KEY"),
            std::env::var("MINIO_SECRET_KEY"),
        ) {
            (Ok(endpoint), Ok(bucket), Ok(access_key), Ok(secret_key)) => Some(S3Config {
                endpoint,
                bucket,
                access_key,
                secret_key,
            }),
            _ => None,
        };
        let uploads = UploadConfig {
            dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            s3,
        };
        Ok(Self {
            env,
            database_url,
            connect_timeout_secs,
            jwt,
            uploads,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_parses_known_values() {
        assert_eq!("production".parse::<AppEnv>().unwrap(), AppEnv::Production);
        assert_eq!(" PROD ".parse::<AppEnv>().unwrap(), AppEnv::Production);
        assert_eq!("development".parse::<AppEnv>().unwrap(), AppEnv::Development);
        assert_eq!("test".parse::<AppEnv>().unwrap(), AppEnv::Development);
    }

    #[test]
    fn app_env_rejects_unknown_values() {
        let err = "staging".parse::<AppEnv>().unwrap_err();
        assert!(err.to_string().contains("staging"));
    }
}
