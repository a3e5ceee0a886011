use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080));
const DEFAULT_DATABASE_PATH: &str = "pastes.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_MAX_PASTE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub database_max_connections: u32,
    /// Prefix for the share links handed back on creation, without a
    /// trailing slash.
    pub public_base_url: String,
    pub max_paste_bytes: usize,
    /// Honour the `x-test-now-ms` header.
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_owned(),
            max_paste_bytes: DEFAULT_MAX_PASTE_BYTES,
            test_mode: false,
        }
    }
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env`
    /// if one is present.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = parse_var(&lookup, "BIND_ADDR")?.unwrap_or(DEFAULT_BIND_ADDR);
        let database_path = lookup("DATABASE_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH), PathBuf::from);
        let database_max_connections =
            parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let max_paste_bytes =
            parse_var(&lookup, "MAX_PASTE_BYTES")?.unwrap_or(DEFAULT_MAX_PASTE_BYTES);
        let test_mode = lookup("TEST_MODE").is_some_and(|v| v == "1");

        Ok(Self {
            bind_addr,
            database_path,
            database_max_connections,
            public_base_url,
            max_paste_bytes,
            test_mode,
        })
    }

    /// Share link for a paste id.
    pub fn paste_url(&self, id: &str) -> String {
        format!(
            "{}{}/{id}",
            self.public_base_url,
            pastebin_lite_common::VIEW_ENDPOINT
        )
    }
}

fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|v| {
            v.trim()
                .parse()
                .with_context(|| format!("Invalid {key}={v:?}"))
        })
        .transpose()
}
