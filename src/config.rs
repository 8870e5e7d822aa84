//! Run configuration assembled once per invocation from the environment.
//!
//! Nothing in the crate reads environment variables after this point: the
//! resulting [`RunConfig`] is passed by reference to every stage.

use std::path::PathBuf;

use crate::{Result, Season, TeamId};

pub const DATA_DIR_ENV_VAR: &str = "DODGERS_DATA_DIR";
pub const SEASON_ENV_VAR: &str = "DODGERS_SEASON";
pub const TEAM_ID_ENV_VAR: &str = "DODGERS_TEAM_ID";
pub const TEAM_ABBR_ENV_VAR: &str = "DODGERS_TEAM_ABBR";
pub const TEAM_NAME_ENV_VAR: &str = "DODGERS_TEAM_NAME";
pub const BUCKET_ENV_VAR: &str = "DODGERS_BUCKET";
pub const KEY_PREFIX_ENV_VAR: &str = "DODGERS_KEY_PREFIX";
pub const PUBLIC_BASE_URL_ENV_VAR: &str = "DODGERS_PUBLIC_BASE_URL";
pub const UPLOAD_ENDPOINT_ENV_VAR: &str = "DODGERS_UPLOAD_ENDPOINT";
pub const UPLOAD_TOKEN_ENV_VAR: &str = "DODGERS_UPLOAD_TOKEN";
pub const MIRROR_DIR_ENV_VAR: &str = "DODGERS_MIRROR_DIR";
pub const SOCIAL_WEBHOOK_ENV_VAR: &str = "DODGERS_SOCIAL_WEBHOOK";
pub const SOCIAL_TOKEN_ENV_VAR: &str = "DODGERS_SOCIAL_TOKEN";
pub const LEDGER_PATH_ENV_VAR: &str = "DODGERS_LEDGER_PATH";
pub const CI_ENV_VAR: &str = "GITHUB_ACTIONS";

/// Where the process is running; CI runs disable coloured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Ci,
}

/// The club every source is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    /// baseball-reference abbreviation (e.g. `LAD`)
    pub abbr: String,
    pub name: String,
}

impl Default for Team {
    fn default() -> Self {
        Self {
            id: TeamId::default(),
            abbr: "LAD".to_string(),
            name: "Los Angeles Dodgers".to_string(),
        }
    }
}

/// Base URLs of the upstream sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub baseball_reference: String,
    pub statsapi: String,
    /// Team stat leaderboards behind mlb.com
    pub stats_feed: String,
    pub savant: String,
    pub mlb_web: String,
    pub latimes: String,
    pub dodgers_nation: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            baseball_reference: "https://www.baseball-reference.com".to_string(),
            statsapi: "https://statsapi.mlb.com".to_string(),
            stats_feed: "https://bdfed.stitch.mlbinfra.com".to_string(),
            savant: "https://baseballsavant.mlb.com".to_string(),
            mlb_web: "https://www.mlb.com".to_string(),
            latimes: "https://www.latimes.com".to_string(),
            dodgers_nation: "https://dodgersnation.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every upstream at one base URL (mock servers in tests).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            baseball_reference: base.clone(),
            statsapi: base.clone(),
            stats_feed: base.clone(),
            savant: base.clone(),
            mlb_web: base.clone(),
            latimes: base.clone(),
            dodgers_nation: base,
        }
    }
}

/// Where published artifacts are uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// `PUT {endpoint}/{bucket}/{key}`; reads go through the public base URL
    Http {
        endpoint: String,
        token: Option<String>,
    },
    /// A directory laid out like the bucket
    Local { dir: PathBuf },
}

/// Outbound post endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialConfig {
    pub webhook_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub season: Season,
    pub team: Team,
    pub data_dir: PathBuf,
    pub bucket: String,
    pub key_prefix: String,
    pub public_base_url: String,
    pub store: StoreTarget,
    pub social: Option<SocialConfig>,
    pub ledger_path: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl Default for RunConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            mode: RunMode::Local,
            season: Season::current(),
            team: Team::default(),
            store: StoreTarget::Local {
                dir: data_dir.join("mirror"),
            },
            data_dir,
            bucket: "stilesdata.com".to_string(),
            key_prefix: "dodgers/data".to_string(),
            public_base_url: "https://stilesdata.com".to_string(),
            social: None,
            ledger_path: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl RunConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Malformed numbers are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mode = match get(CI_ENV_VAR).as_deref() {
            Some("true") => RunMode::Ci,
            _ => RunMode::Local,
        };

        let season = match get(SEASON_ENV_VAR) {
            Some(s) => s.parse::<Season>()?,
            None => defaults.season,
        };

        let mut team = Team::default();
        if let Some(id) = get(TEAM_ID_ENV_VAR) {
            team.id = id.parse::<TeamId>()?;
        }
        if let Some(abbr) = get(TEAM_ABBR_ENV_VAR) {
            team.abbr = abbr;
        }
        if let Some(name) = get(TEAM_NAME_ENV_VAR) {
            team.name = name;
        }

        let data_dir = get(DATA_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let store = match get(UPLOAD_ENDPOINT_ENV_VAR) {
            Some(endpoint) => StoreTarget::Http {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                token: get(UPLOAD_TOKEN_ENV_VAR),
            },
            None => StoreTarget::Local {
                dir: get(MIRROR_DIR_ENV_VAR)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("mirror")),
            },
        };

        let social = get(SOCIAL_WEBHOOK_ENV_VAR).map(|webhook_url| SocialConfig {
            webhook_url,
            token: get(SOCIAL_TOKEN_ENV_VAR),
        });

        Ok(Self {
            mode,
            season,
            team,
            data_dir,
            bucket: get(BUCKET_ENV_VAR).unwrap_or(defaults.bucket),
            key_prefix: get(KEY_PREFIX_ENV_VAR)
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(defaults.key_prefix),
            public_base_url: get(PUBLIC_BASE_URL_ENV_VAR)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            store,
            social,
            ledger_path: get(LEDGER_PATH_ENV_VAR).map(PathBuf::from),
            endpoints: defaults.endpoints,
        })
    }

    /// Object-store key for a file in a subject area.
    pub fn object_key(&self, subject: &str, file_name: &str) -> String {
        self.prefixed_key(&format!("{}/{}", subject, file_name))
    }

    /// Object-store key for a `{subject}/{file}` path.
    pub fn prefixed_key(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.key_prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.key_prefix, relative)
        }
    }

    /// Local path for a file in a subject area.
    pub fn local_path(&self, subject: &str, file_name: &str) -> PathBuf {
        self.data_dir.join(subject).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = RunConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.mode, RunMode::Local);
        assert_eq!(config.team.id.as_u32(), 119);
        assert_eq!(config.team.abbr, "LAD");
        assert_eq!(config.bucket, "stilesdata.com");
        assert_eq!(
            config.store,
            StoreTarget::Local {
                dir: PathBuf::from("data").join("mirror")
            }
        );
        assert!(config.social.is_none());
    }

    #[test]
    fn test_ci_mode_and_overrides() {
        let config = RunConfig::from_lookup(lookup_from(&[
            (CI_ENV_VAR, "true"),
            (SEASON_ENV_VAR, "2024"),
            (TEAM_ABBR_ENV_VAR, "SFG"),
            (KEY_PREFIX_ENV_VAR, "/giants/data/"),
            (UPLOAD_ENDPOINT_ENV_VAR, "https://uploads.example.com/"),
            (UPLOAD_TOKEN_ENV_VAR, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.mode, RunMode::Ci);
        assert_eq!(config.season, Season::new(2024));
        assert_eq!(config.team.abbr, "SFG");
        assert_eq!(config.key_prefix, "giants/data");
        assert_eq!(
            config.store,
            StoreTarget::Http {
                endpoint: "https://uploads.example.com".to_string(),
                token: Some("secret".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_season_is_an_error() {
        let result = RunConfig::from_lookup(lookup_from(&[(SEASON_ENV_VAR, "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config =
            RunConfig::from_lookup(lookup_from(&[(SOCIAL_WEBHOOK_ENV_VAR, "  ")])).unwrap();
        assert!(config.social.is_none());
    }

    #[test]
    fn test_object_key_and_local_path() {
        let config = RunConfig::default();
        assert_eq!(
            config.object_key("standings", "dodgers_wins_losses_current.json"),
            "dodgers/data/standings/dodgers_wins_losses_current.json"
        );
        assert_eq!(
            config.local_path("roster", "dodgers_roster_current.csv"),
            PathBuf::from("data/roster/dodgers_roster_current.csv")
        );
    }
}
