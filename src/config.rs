//! Configuration management for the pixtier server.
//!
//! Supports command-line arguments via clap with `PIXTIER_`-prefixed
//! environment variable fallbacks and sensible defaults:
//!
//! - `PIXTIER_HOST` - Server bind address (default: 0.0.0.0)
//! - `PIXTIER_PORT` - Server port (default: 3000)
//! - `PIXTIER_DATA_DIR` - Directory for blob files; in-memory when unset
//! - `PIXTIER_CACHE_BYTES` - Asset read-cache capacity (default: 64MB)
//! - `PIXTIER_CACHE_MAX_AGE` - Cache-Control max-age seconds (default: 3600)
//! - `PIXTIER_PUBLIC_URL` - Base URL for rendered asset/link URLs
//! - `PIXTIER_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `PIXTIER_SEED_TIERS` - Create the built-in Basic/Premium/Enterprise tiers

use std::path::PathBuf;

use clap::Parser;

use crate::store::DEFAULT_BLOB_CACHE_CAPACITY;

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// pixtier - a tiered image-hosting server.
///
/// Uploads derive thumbnails at the heights the account's tier grants,
/// optionally retain the original, and can be shared through expiring
/// public links.
#[derive(Parser, Debug, Clone)]
#[command(name = "pixtier")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PIXTIER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PIXTIER_PORT")]
    pub port: u16,

    /// Directory where blob files are stored.
    ///
    /// When not set, blobs live in memory and vanish on restart.
    #[arg(long, env = "PIXTIER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Asset read-cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_BLOB_CACHE_CAPACITY, env = "PIXTIER_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// HTTP Cache-Control max-age for owner asset responses, in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "PIXTIER_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Base URL prefixed to rendered asset and link URLs
    /// (e.g. "https://img.example.com"). Relative paths when unset.
    #[arg(long, env = "PIXTIER_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Comma-separated list of allowed CORS origins. Any origin when
    /// unset.
    #[arg(long, env = "PIXTIER_CORS_ORIGINS")]
    pub cors_origins: Option<String>,

    /// Create the built-in Basic/Premium/Enterprise tiers at startup.
    #[arg(long, default_value_t = false, env = "PIXTIER_SEED_TIERS")]
    pub seed_tiers: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Validate the configuration before starting the server.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_bytes == 0 {
            return Err("cache capacity must be greater than zero".to_string());
        }
        if let Some(url) = &self.public_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!(
                    "public URL must start with http:// or https://, got {url:?}"
                ));
            }
        }
        Ok(())
    }

    /// The socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed CORS origins, if restricted.
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        self.cors_origins.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
