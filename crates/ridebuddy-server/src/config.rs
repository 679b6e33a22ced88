use std::env;
use std::path::PathBuf;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Allowed browser origin; any origin when unset.
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env::var("RIDEBUDDY_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|e| anyhow::anyhow!("RIDEBUDDY_PORT={v:?}: {e}"))?,
            Err(_) => 5000,
        };

        Ok(Self {
            jwt_secret: env::var("RIDEBUDDY_JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.into()),
            db_path: env::var("RIDEBUDDY_DB_PATH")
                .unwrap_or_else(|_| "ridebuddy.db".into())
                .into(),
            host: env::var("RIDEBUDDY_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            cors_origin: env::var("RIDEBUDDY_CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}
