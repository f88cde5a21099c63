use envconfig::Envconfig;

/// Minimum length accepted for `SESSION_KEY`; the cookie store needs 64 bytes
/// of key material for signing plus encryption.
pub const SESSION_KEY_MIN_LEN: usize = 64;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://epharmacy.db")]
    pub database_url: String,

    #[envconfig(from = "BIND_ADDRESS", default = "127.0.0.1:8080")]
    pub bind_address: String,

    #[envconfig(from = "SESSION_KEY")]
    pub session_key: Option<String>,

    #[envconfig(from = "SESSION_COOKIE_SECURE", default = "false")]
    pub session_cookie_secure: bool,

    #[envconfig(from = "PAGE_SIZE", default = "20")]
    pub page_size: u32,

    #[envconfig(from = "IMPORT_DEFAULT_STOCK", default = "100")]
    pub import_default_stock: i64,
}

impl Config {
    /// Session key bytes, if a usable one was configured.
    ///
    /// Returns `None` when the variable is unset or shorter than
    /// [`SESSION_KEY_MIN_LEN`]; the caller falls back to a random key.
    pub fn session_key_bytes(&self) -> Option<&[u8]> {
        match self.session_key.as_deref() {
            Some(key) if key.len() >= SESSION_KEY_MIN_LEN => Some(key.as_bytes()),
            Some(key) => {
                log::warn!(
                    "SESSION_KEY is too short ({} bytes, need {}); ignoring it",
                    key.len(),
                    SESSION_KEY_MIN_LEN
                );
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);

        assert_eq!(config.database_url, "sqlite://epharmacy.db");
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.import_default_stock, 100);
        assert!(!config.session_cookie_secure);
        assert!(config.session_key_bytes().is_none());
    }

    #[test]
    fn short_session_key_is_ignored() {
        let config = config_from(&[("SESSION_KEY", "too-short")]);
        assert!(config.session_key_bytes().is_none());

        let long = "k".repeat(SESSION_KEY_MIN_LEN);
        let config = config_from(&[("SESSION_KEY", long.as_str())]);
        assert_eq!(config.session_key_bytes().map(<[u8]>::len), Some(64));
    }
}
