use std::path::PathBuf;

use url::Url;

use crate::error::BookgrabError;

pub const CATALOG_URL_ENV: &str = "BASE_URL";
pub const MIRROR_URL_ENV: &str = "BASE_DL_URL";
pub const SAVE_ROOT_ENV: &str = "DL_PATH";

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the catalog search page.
    pub catalog_url: Url,
    /// Base URL of the download mirror serving detail pages.
    pub mirror_url: Url,
    /// Local directory under which downloads are saved.
    pub save_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, BookgrabError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup so tests never have to
    /// mutate process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BookgrabError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let catalog_url = parse_url(CATALOG_URL_ENV, "catalog base", &lookup)?;
        let mirror_url = parse_url(MIRROR_URL_ENV, "download mirror", &lookup)?;

        let save_root = required(SAVE_ROOT_ENV, &lookup)?;
        let save_root = PathBuf::from(save_root);

        Ok(Self {
            catalog_url,
            mirror_url,
            save_root,
        })
    }
}

fn required<F>(key: &str, lookup: &F) -> Result<String, BookgrabError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(BookgrabError::MissingEnv(key.to_string())),
    }
}

fn parse_url<F>(key: &str, name: &'static str, lookup: &F) -> Result<Url, BookgrabError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(key, lookup)?;
    Url::parse(&raw).map_err(|err| BookgrabError::InvalidUrl {
        name,
        message: err.to_string(),
    })
}
