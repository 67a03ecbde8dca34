use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Remote identity service configuration.
#[derive(Debug, Deserialize, Default, Clone)]
#[allow(unused)]
pub struct Remote {
    /// Base URL of the identity service. Empty means not configured.
    pub url: String,
    /// Publishable API key sent with every request.
    pub key: String,
    /// Where OAuth sign-ins land after the provider redirect.
    pub redirect: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[allow(unused)]
pub struct Settings {
    pub remote: Remote,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("remote.url", "")?
            .set_default("remote.key", "")?
            .set_default("remote.redirect", "http://localhost:8080/todos")?
            .add_source(
                File::with_name("auth.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().separator("_"))
            .build()?;

        config.try_deserialize()
    }

    /// Whether the remote backend is usable. Evaluated once at resolver
    /// construction, never per call.
    pub fn remote_configured(&self) -> bool {
        !self.remote.url.is_empty() && !self.remote.key.is_empty()
    }
}
