use std::path::PathBuf;

use iou_api::crypto;

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub base_url: String,
    pub jwt_secret: String,
    /// PBKDF2 rounds for new password hashes.
    pub password_iterations: u32,
    /// Allowed CORS origin; `None` allows any.
    pub cors_origin: Option<String>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = env_nonempty("IOU_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let port = match env_nonempty("PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {p:?}: {e}"))?,
            None => 3000,
        };

        let base_url =
            env_nonempty("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        let jwt_secret = match env_nonempty("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "JWT_SECRET not set, using a random secret; tokens will not survive a restart"
                );
                crypto::generate_token()?
            }
        };

        let password_iterations = match env_nonempty("IOU_PASSWORD_ITERATIONS") {
            Some(n) => n
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid IOU_PASSWORD_ITERATIONS {n:?}: {e}"))?,
            None => crypto::PBKDF2_ITERATIONS,
        };

        Ok(Self {
            data_dir,
            port,
            base_url,
            jwt_secret,
            password_iterations,
            cors_origin: env_nonempty("IOU_CORS_ORIGIN"),
        })
    }

    /// Config for in-process tests: fixed secret, cheap hashing.
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            port: 0,
            base_url: "http://localhost".into(),
            jwt_secret: "test-secret".into(),
            password_iterations: 1_000,
            cors_origin: None,
        }
    }
}
