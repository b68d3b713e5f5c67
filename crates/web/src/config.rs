use std::{env, net::SocketAddr};

use directory::listing::DEFAULT_PAGE_SIZE;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_address: SocketAddr,
    pub page_size: usize,
    /// Directory served under `/static`.
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            page_size: DEFAULT_PAGE_SIZE,
            static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/resources/www").to_owned(),
        }
    }
}

impl Config {
    /// Reads the environment once. Malformed values fall back to their
    /// defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = Self::default();

        let listen_address = match lookup("LISTEN_ADDRESS") {
            Some(address) => address.parse().unwrap_or_else(|why| {
                log::warn!(
                    "invalid LISTEN_ADDRESS {:?} ({}), using {}",
                    address,
                    why,
                    DEFAULT_LISTEN_ADDRESS
                );
                defaults.listen_address
            }),
            None => defaults.listen_address,
        };

        let page_size = match lookup("PAGE_SIZE") {
            Some(size) => match size.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    log::warn!("invalid PAGE_SIZE {:?}, using {}", size, DEFAULT_PAGE_SIZE);
                    defaults.page_size
                }
            },
            None => defaults.page_size,
        };

        let static_dir = lookup("STATIC_DIR").unwrap_or(defaults.static_dir);

        Self {
            listen_address,
            page_size,
            static_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_vars(&[]);
        assert_eq!(config.listen_address.to_string(), DEFAULT_LISTEN_ADDRESS);
        assert_eq!(config.page_size, 6);
    }

    #[test]
    fn overrides_and_fallbacks() {
        let config = from_vars(&[("LISTEN_ADDRESS", "127.0.0.1:3000"), ("PAGE_SIZE", "0")]);
        assert_eq!(config.listen_address.to_string(), "127.0.0.1:3000");
        assert_eq!(config.page_size, 6);

        let config = from_vars(&[("LISTEN_ADDRESS", "nowhere"), ("PAGE_SIZE", "12")]);
        assert_eq!(config.listen_address.to_string(), DEFAULT_LISTEN_ADDRESS);
        assert_eq!(config.page_size, 12);
    }
}
