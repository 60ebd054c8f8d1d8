use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fitlog_core::identity::StaticIdentity;
use fitlog_core::models::DEFAULT_CALORIE_GOAL;
use fitlog_core::service::FitnessServices;
use fitlog_core::store::PostgrestConfig;

pub struct Config {
    pub db_path: PathBuf,
    /// Hosted store settings; `None` means local-only.
    pub remote: Option<PostgrestConfig>,
    pub user_id: Option<String>,
    pub calorie_goal: i32,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_db_path)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_db_path: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match var("FITLOG_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let remote = match (var("FITLOG_STORE_URL"), var("FITLOG_API_KEY")) {
            (Some(url), Some(key)) => {
                let mut remote = PostgrestConfig::new(url, key);
                remote.access_token = var("FITLOG_ACCESS_TOKEN");
                Some(remote)
            }
            (Some(_), None) => bail!("FITLOG_STORE_URL is set but FITLOG_API_KEY is missing"),
            _ => None,
        };

        let calorie_goal = match var("FITLOG_CALORIE_GOAL") {
            Some(goal) => parse_goal(&goal)?,
            None => DEFAULT_CALORIE_GOAL,
        };

        Ok(Config {
            db_path,
            remote,
            user_id: var("FITLOG_USER_ID"),
            calorie_goal,
        })
    }

    /// Build the shared services, against the hosted store unless
    /// `force_local` is set or none is configured.
    pub fn services(&self, force_local: bool) -> Result<FitnessServices> {
        let identity = Arc::new(StaticIdentity::new(self.user_id.clone()));
        let services = match &self.remote {
            Some(remote) if !force_local => {
                tracing::debug!(url = %remote.url, "using hosted store");
                FitnessServices::remote(remote.clone(), identity)
                    .context("Failed to set up the hosted store client")?
            }
            _ => {
                ensure_parent(&self.db_path)?;
                tracing::debug!(path = %self.db_path.display(), "using local database");
                FitnessServices::local(&self.db_path, identity).with_context(|| {
                    format!("Failed to open database: {}", self.db_path.display())
                })?
            }
        };
        Ok(services.with_calorie_goal(self.calorie_goal))
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;
    Ok(proj_dirs.data_dir().join("fitlog.db"))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
    }
    Ok(())
}

fn parse_goal(s: &str) -> Result<i32> {
    let goal: i32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid FITLOG_CALORIE_GOAL '{s}'. Use a whole number"))?;
    if goal <= 0 {
        bail!("FITLOG_CALORIE_GOAL must be greater than 0");
    }
    Ok(goal)
}
