//! Configuration: a static TOML file overlaid by environment variables.
//!
//! Precedence is applied exactly once, in [`SyncConfig::resolve`]; the
//! resulting value is immutable and shared read-only by every pipeline.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::TestCycleKey;
use crate::transition::{TransitionIds, TransitionTable};

const ZEPHYR: &str = "zephyr";
const JIRA: &str = "jira";

const DEFAULT_TEST_CASE_FIELD: &str = "customfield_10069";
/// JQL name of the default test case field.
const DEFAULT_TEST_CASE_JQL_FIELD: &str = "TestCaseID";

/// Static config file contents. Every field is optional here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// `[zephyr]` section.
    pub zephyr: ZephyrSection,
    /// `[jira]` section.
    pub jira: JiraSection,
}

/// `[zephyr]` section of the config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZephyrSection {
    /// `ZEPHYR_ENABLED`.
    pub enabled: Option<bool>,
    /// `ZEPHYR_BASE_URL`, e.g. `https://api.zephyrscale.smartbear.com/v2`.
    pub base_url: Option<String>,
    /// `ZEPHYR_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    /// Default cycle for titles without an `[..-R..]` token. `ZEPHYR_TEST_CYCLE_ID`.
    #[serde(alias = "test_cycle_id")]
    pub test_cycle_key: Option<String>,
    /// `ZEPHYR_TEST_PROJECT_KEY`.
    pub project_key: Option<String>,
    /// Execution environment name.
    pub environment_name: Option<String>,
    /// Executor shown on each execution.
    pub executed_by: Option<String>,
    /// Account the execution is assigned to.
    pub assigned_to_id: Option<String>,
}

/// `[jira]` section of the config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraSection {
    /// `JIRA_ENABLED`.
    pub enabled: Option<bool>,
    /// `JIRA_BASE_URL`, the site root.
    pub base_url: Option<String>,
    /// `JIRA_EMAIL`.
    pub email: Option<String>,
    /// `JIRA_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    /// `JIRA_PROJECT_KEY`.
    pub project_key: Option<String>,
    /// Issue type of created defects.
    pub issue_type_id: Option<String>,
    /// Reporter account of created defects.
    pub reporter_id: Option<String>,
    /// Custom field that carries the test case key on a defect.
    pub test_case_field: Option<String>,
    /// Name of the same field in JQL. Derived from `test_case_field` when unset.
    pub test_case_jql_field: Option<String>,
    /// `[jira.transitions]` ids.
    pub transitions: TransitionIds,
}

impl FileConfig {
    /// Reads and parses a TOML config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The credential in clear text, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Resolved settings of an enabled test-management service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZephyrSettings {
    /// API root without a trailing slash.
    pub base_url: String,
    /// Bearer token.
    pub access_token: Secret,
    /// Cycle for titles without an `[..-R..]` token.
    pub default_cycle: TestCycleKey,
    /// Project the executions belong to.
    pub project_key: String,
    /// Execution environment name.
    pub environment_name: String,
    /// Executor shown on each execution.
    pub executed_by: String,
    /// Account the execution is assigned to.
    pub assigned_to_id: Option<String>,
}

/// Resolved settings of an enabled issue tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JiraSettings {
    /// Site root without a trailing slash.
    pub base_url: String,
    /// Basic-auth user.
    pub email: String,
    /// Basic-auth API token.
    pub access_token: Secret,
    /// Project defects are created in.
    pub project_key: String,
    /// Issue type of created defects.
    pub issue_type_id: String,
    /// Reporter account of created defects.
    pub reporter_id: Option<String>,
    /// Custom field written on create, e.g. `customfield_10069`.
    pub test_case_field: String,
    /// The same field as named in search JQL, e.g. `TestCaseID` or `cf[10069]`.
    pub test_case_jql_field: String,
    /// Workflow transition ids.
    pub transitions: TransitionTable,
}

/// Resolved configuration. A service is `None` when it is disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Run-level cycle, known even when Zephyr is disabled.
    pub default_cycle: Option<TestCycleKey>,
    /// Test-management settings.
    pub zephyr: Option<ZephyrSettings>,
    /// Issue-tracker settings.
    pub jira: Option<JiraSettings>,
}

impl SyncConfig {
    /// Applies environment overrides from the process environment.
    pub fn from_env(file: FileConfig) -> Result<Self, ConfigError> {
        Self::resolve(file, |var| std::env::var(var).ok())
    }

    /// Overlays `env` onto `file` and validates every enabled service.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |var: &str| env(var).filter(|v| !v.trim().is_empty());
        let pick = |var: &str, file_value: Option<String>| {
            env(var).or(file_value.filter(|v| !v.trim().is_empty()))
        };
        let flag = |var: &'static str, file_value: Option<bool>| match env(var) {
            Some(raw) => parse_bool(var, &raw),
            None => Ok(file_value.unwrap_or(false)),
        };

        let z = file.zephyr;
        let default_cycle = pick("ZEPHYR_TEST_CYCLE_ID", z.test_cycle_key).map(TestCycleKey::new);

        let zephyr = if flag("ZEPHYR_ENABLED", z.enabled)? {
            Some(ZephyrSettings {
                base_url: trim_base(require(ZEPHYR, "base_url", pick("ZEPHYR_BASE_URL", z.base_url))?),
                access_token: Secret::new(require(
                    ZEPHYR,
                    "access_token",
                    pick("ZEPHYR_ACCESS_TOKEN", z.access_token),
                )?),
                default_cycle: default_cycle.clone().ok_or(ConfigError::Missing {
                    service: ZEPHYR,
                    field: "test_cycle_key",
                })?,
                project_key: require(
                    ZEPHYR,
                    "project_key",
                    pick("ZEPHYR_TEST_PROJECT_KEY", z.project_key),
                )?,
                environment_name: z.environment_name.unwrap_or_else(|| "TEST".to_string()),
                executed_by: z
                    .executed_by
                    .unwrap_or_else(|| "Automated Test Runner".to_string()),
                assigned_to_id: z.assigned_to_id,
            })
        } else {
            None
        };

        let j = file.jira;
        let jira = if flag("JIRA_ENABLED", j.enabled)? {
            Some(JiraSettings {
                base_url: trim_base(require(JIRA, "base_url", pick("JIRA_BASE_URL", j.base_url))?),
                email: require(JIRA, "email", pick("JIRA_EMAIL", j.email))?,
                access_token: Secret::new(require(
                    JIRA,
                    "access_token",
                    pick("JIRA_ACCESS_TOKEN", j.access_token),
                )?),
                project_key: require(JIRA, "project_key", pick("JIRA_PROJECT_KEY", j.project_key))?,
                issue_type_id: j.issue_type_id.unwrap_or_else(|| "10004".to_string()),
                reporter_id: j.reporter_id,
                test_case_jql_field: test_case_jql_field(
                    j.test_case_jql_field.clone(),
                    j.test_case_field.as_deref(),
                ),
                test_case_field: j
                    .test_case_field
                    .unwrap_or_else(|| DEFAULT_TEST_CASE_FIELD.to_string()),
                transitions: TransitionTable::new(&j.transitions)?,
            })
        } else {
            None
        };

        Ok(Self {
            default_cycle,
            zephyr,
            jira,
        })
    }

    /// Whether at least one service is enabled.
    pub fn any_enabled(&self) -> bool {
        self.zephyr.is_some() || self.jira.is_some()
    }
}

fn require(
    service: &'static str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::Missing { service, field })
}

/// An explicit JQL name wins. Otherwise a `customfield_<n>` id becomes
/// `cf[<n>]`, so search always reads the field create writes.
fn test_case_jql_field(explicit: Option<String>, field: Option<&str>) -> String {
    if let Some(name) = explicit.filter(|v| !v.trim().is_empty()) {
        return name;
    }
    match field {
        None => DEFAULT_TEST_CASE_JQL_FIELD.to_string(),
        Some(field) => match field.strip_prefix("customfield_") {
            Some(n) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                format!("cf[{n}]")
            }
            _ => field.to_string(),
        },
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn zephyr_file() -> FileConfig {
        FileConfig {
            zephyr: ZephyrSection {
                enabled: Some(true),
                base_url: Some("https://zephyr.example/v2/".into()),
                access_token: Some("file-token".into()),
                test_cycle_key: Some("ABC-R1".into()),
                project_key: Some("ABC".into()),
                ..ZephyrSection::default()
            },
            ..FileConfig::default()
        }
    }

    #[test]
    fn disabled_by_default() {
        let cfg = SyncConfig::resolve(FileConfig::default(), env_of(&[])).unwrap();
        assert!(!cfg.any_enabled());
    }

    #[test]
    fn environment_overrides_file() {
        let cfg = SyncConfig::resolve(
            zephyr_file(),
            env_of(&[("ZEPHYR_ACCESS_TOKEN", "env-token"), ("ZEPHYR_TEST_CYCLE_ID", "ABC-R5")]),
        )
        .unwrap();
        let z = cfg.zephyr.unwrap();
        assert_eq!(z.access_token.expose(), "env-token");
        assert_eq!(z.default_cycle.as_str(), "ABC-R5");
        assert_eq!(z.base_url, "https://zephyr.example/v2");
        assert_eq!(z.environment_name, "TEST");
        assert_eq!(z.executed_by, "Automated Test Runner");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let cfg = SyncConfig::resolve(zephyr_file(), env_of(&[("ZEPHYR_ACCESS_TOKEN", "")])).unwrap();
        assert_eq!(cfg.zephyr.unwrap().access_token.expose(), "file-token");
    }

    #[test]
    fn env_flag_can_disable() {
        let cfg = SyncConfig::resolve(zephyr_file(), env_of(&[("ZEPHYR_ENABLED", "false")])).unwrap();
        assert!(cfg.zephyr.is_none());
        // default cycle still known to the collector
        assert_eq!(cfg.default_cycle, Some(TestCycleKey::new("ABC-R1")));
    }

    #[test]
    fn invalid_flag_is_an_error() {
        let err = SyncConfig::resolve(zephyr_file(), env_of(&[("ZEPHYR_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { var: "ZEPHYR_ENABLED", .. }));
    }

    #[test]
    fn enabled_jira_requires_credentials() {
        let err = SyncConfig::resolve(
            FileConfig::default(),
            env_of(&[
                ("JIRA_ENABLED", "1"),
                ("JIRA_BASE_URL", "https://x.atlassian.net"),
                ("JIRA_ACCESS_TOKEN", "t"),
                ("JIRA_PROJECT_KEY", "ABC"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                service: "jira",
                field: "email"
            }
        ));
    }

    #[test]
    fn jira_from_env_only() {
        let cfg = SyncConfig::resolve(
            FileConfig::default(),
            env_of(&[
                ("JIRA_ENABLED", "yes"),
                ("JIRA_BASE_URL", "https://x.atlassian.net"),
                ("JIRA_EMAIL", "qa@example.com"),
                ("JIRA_ACCESS_TOKEN", "t"),
                ("JIRA_PROJECT_KEY", "ABC"),
            ]),
        )
        .unwrap();
        let j = cfg.jira.unwrap();
        assert_eq!(j.test_case_field, "customfield_10069");
        assert_eq!(j.test_case_jql_field, "TestCaseID");
        assert_eq!(j.issue_type_id, "10004");
        assert_eq!(
            j.transitions.id(crate::transition::IssueTransition::Done),
            "31"
        );
    }

    fn jira_file(section: JiraSection) -> FileConfig {
        FileConfig {
            jira: JiraSection {
                enabled: Some(true),
                base_url: Some("https://x.atlassian.net".into()),
                email: Some("qa@example.com".into()),
                access_token: Some("t".into()),
                project_key: Some("ABC".into()),
                ..section
            },
            ..FileConfig::default()
        }
    }

    #[test]
    fn search_field_follows_custom_test_case_field() {
        let cfg = SyncConfig::resolve(
            jira_file(JiraSection {
                test_case_field: Some("customfield_20001".into()),
                ..JiraSection::default()
            }),
            env_of(&[]),
        )
        .unwrap();
        let j = cfg.jira.unwrap();
        assert_eq!(j.test_case_field, "customfield_20001");
        assert_eq!(j.test_case_jql_field, "cf[20001]");

        let explicit = SyncConfig::resolve(
            jira_file(JiraSection {
                test_case_field: Some("customfield_20001".into()),
                test_case_jql_field: Some("Test Case".into()),
                ..JiraSection::default()
            }),
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(explicit.jira.unwrap().test_case_jql_field, "Test Case");
    }

    #[test]
    fn duplicate_transition_ids_are_rejected() {
        let err = SyncConfig::resolve(
            jira_file(JiraSection {
                transitions: TransitionIds {
                    in_progress: "31".into(),
                    ..TransitionIds::default()
                },
                ..JiraSection::default()
            }),
            env_of(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTransitionId { .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = SyncConfig::resolve(zephyr_file(), env_of(&[])).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("file-token"));
        assert!(dbg.contains("Secret(***)"));
    }
}
