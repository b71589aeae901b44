//! Checking whether a newer lab release has been published.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use semver::Version;

use crate::config::{Config, UpdateConfig};
use crate::error::{LabError, Result};
use crate::gitlab::GitLabClient;
use crate::output::styling::{bright_green, bright_yellow, dim};

pub const DISABLE_ENV: &str = "LAB_DISABLE_UPDATE_CHECK";
pub const FORCE_ENV: &str = "LAB_FORCE_UPDATE_CHECK";

const MAX_INTERVAL_HOURS: i64 = 24 * 365 * 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate(Version),
    Available { current: Version, latest: Version },
}

impl UpdateStatus {
    pub fn notice(&self) -> String {
        match self {
            Self::UpToDate(current) => {
                format!("{} lab {current} is up to date", bright_green("✓"))
            }
            Self::Available { current, latest } => format!(
                "{} A new version of lab is available: {} -> {}",
                bright_yellow("!"),
                dim(current),
                bright_green(latest)
            ),
        }
    }
}

/// Whether an environment value switches a flag on (`1`, `true`, `yes`, `on`).
pub fn env_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Decide if the automatic check should run now.
///
/// `forced` overrides everything; `disabled` (env) or the config switch skip
/// the check; otherwise it runs once the interval since the last check elapsed.
pub fn should_check(
    settings: &UpdateConfig,
    now: DateTime<Utc>,
    disabled: bool,
    forced: bool,
) -> bool {
    if forced {
        return true;
    }
    if disabled || settings.disabled {
        return false;
    }
    // Capped so absurd intervals stay within chrono's range
    let hours = i64::try_from(settings.interval_hours)
        .unwrap_or(i64::MAX)
        .min(MAX_INTERVAL_HOURS);
    let interval = Duration::hours(hours);
    settings
        .last_check
        .map_or(true, |last| now.signed_duration_since(last) >= interval)
}

pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| LabError::validation(format!("invalid version '{raw}': {e}")))
}

pub fn compare(current: &str, latest: &str) -> Result<UpdateStatus> {
    let current = parse_version(current)?;
    let latest = parse_version(latest)?;
    Ok(if latest > current {
        UpdateStatus::Available { current, latest }
    } else {
        UpdateStatus::UpToDate(current)
    })
}

/// Ask the release project for its latest tag and compare it to this build.
pub async fn check(settings: &UpdateConfig) -> Result<UpdateStatus> {
    let client = GitLabClient::new(&settings.host, None)?;
    let release = client.latest_release(&settings.project).await?;
    debug!("Latest published release: {}", release.tag_name);
    compare(env!("CARGO_PKG_VERSION"), &release.tag_name)
}

/// Run the check if it is due, print a notice when a newer version exists and
/// remember when it ran. Never fails the command it follows.
pub async fn run_automatic(config: &mut Config, config_path: Option<&Path>) {
    let disabled = env_truthy(std::env::var(DISABLE_ENV).ok().as_deref());
    let forced = env_truthy(std::env::var(FORCE_ENV).ok().as_deref());
    let now = Utc::now();

    if !should_check(&config.update, now, disabled, forced) {
        debug!("Skipping update check");
        return;
    }

    match check(&config.update).await {
        Ok(status) => {
            if matches!(status, UpdateStatus::Available { .. }) {
                eprintln!("\n{}", status.notice());
            }
            record_check(config, config_path, now);
        }
        Err(e) => debug!("Update check failed: {e}"),
    }
}

pub fn record_check(config: &mut Config, config_path: Option<&Path>, now: DateTime<Utc>) {
    config.update.last_check = Some(now);
    let Some(path) = config_path else {
        return;
    };
    match config.save(path) {
        Ok(()) => info!("Recorded update check in {}", path.display()),
        Err(e) => debug!("Could not record update check: {e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn settings(last_check: Option<DateTime<Utc>>) -> UpdateConfig {
        UpdateConfig {
            last_check,
            ..UpdateConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_env_truthy_values() {
        assert!(env_truthy(Some("1")));
        assert!(env_truthy(Some("TRUE")));
        assert!(env_truthy(Some(" yes")));
        assert!(!env_truthy(Some("0")));
        assert!(!env_truthy(Some("")));
        assert!(!env_truthy(None));
    }

    #[test]
    fn test_first_run_checks() {
        assert!(should_check(&settings(None), now(), false, false));
    }

    #[test]
    fn test_recent_check_is_skipped() {
        let recent = settings(Some(now() - Duration::hours(3)));
        assert!(!should_check(&recent, now(), false, false));

        let stale = settings(Some(now() - Duration::hours(24)));
        assert!(should_check(&stale, now(), false, false));
    }

    #[test]
    fn test_disabled_and_forced() {
        assert!(!should_check(&settings(None), now(), true, false));

        let switched_off = UpdateConfig {
            disabled: true,
            ..UpdateConfig::default()
        };
        assert!(!should_check(&switched_off, now(), false, false));

        let recent = settings(Some(now() - Duration::minutes(1)));
        assert!(should_check(&recent, now(), true, true));
    }

    #[test]
    fn test_compare_tolerates_v_prefix() {
        assert_eq!(
            compare("0.3.0", "v0.4.1").unwrap(),
            UpdateStatus::Available {
                current: Version::new(0, 3, 0),
                latest: Version::new(0, 4, 1),
            }
        );
        assert_eq!(
            compare("v1.2.0", "1.2.0").unwrap(),
            UpdateStatus::UpToDate(Version::new(1, 2, 0))
        );
        assert!(compare("1.0.0", "latest").is_err());
    }

    #[test]
    fn test_prerelease_is_older_than_release() {
        assert!(matches!(
            compare("1.0.0-rc.1", "1.0.0").unwrap(),
            UpdateStatus::Available { .. }
        ));
    }

    #[tokio::test]
    async fn test_check_reads_latest_release_tag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/api/v4/projects/lab-cli%2Flab/releases/permalink/latest",
            )
            .match_header("PRIVATE-TOKEN", mockito::Matcher::Missing)
            .with_body(r#"{"tag_name": "v999.0.0", "created_at": "2026-10-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let update = UpdateConfig {
            host: server.url(),
            ..UpdateConfig::default()
        };
        let status = check(&update).await.unwrap();

        match status {
            UpdateStatus::Available { latest, .. } => assert_eq!(latest.major, 999),
            other => panic!("expected a newer release, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[test]
    fn test_check_fails_on_unparseable_tag() {
        let mut server = mockito::Server::new();
        server
            .mock(
                "GET",
                "/api/v4/projects/lab-cli%2Flab/releases/permalink/latest",
            )
            .with_body(r#"{"tag_name": "nightly", "created_at": "2026-10-01T00:00:00Z"}"#)
            .create();

        let update = UpdateConfig {
            host: server.url(),
            ..UpdateConfig::default()
        };
        let err = tokio_test::block_on(check(&update)).unwrap_err();

        assert!(err.to_string().contains("invalid version 'nightly'"));
    }

    #[test]
    fn test_record_check_saves_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lab.toml");
        let mut config = Config::default();

        record_check(&mut config, Some(&path), now());

        let saved = Config::load(Some(&path)).unwrap();
        assert_eq!(saved.update.last_check, Some(now()));
    }
}
