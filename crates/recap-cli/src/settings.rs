use std::path::{Path, PathBuf};

use recap_core::{BranchPolicy, Identity, PolicyError};
use recap_mail::{parse_recipients, MailConfig, DEFAULT_PORT, DEFAULT_SUBJECT};
use recap_render::{Granularity, UnknownGranularity};

/// Every setting recap reads. The environment variable is the key in upper
/// case and wins over `config.json` in the store root. Blank values count
/// as unset.
pub const KEYS: &[&str] = &[
    "gitlab_url",
    "gitlab_token",
    "gitlab_username",
    "gitlab_email",
    "jira_url",
    "jira_username",
    "jira_password",
    "git_repo_roots",
    "branches_rollout",
    "branches_release",
    "branches_integration",
    "smtp_host",
    "smtp_port",
    "smtp_user",
    "smtp_password",
    "mail_from",
    "mail_to",
    "mail_cc",
    "mail_subject_template",
    "mail_thread",
    "author_name",
    "report_granularity",
    "report_template_dir",
    "report_template",
];

/// Keys whose values are never echoed back.
pub fn is_secret(key: &str) -> bool {
    key.ends_with("_token") || key.ends_with("_password")
}

pub fn env_name(key: &str) -> String {
    key.to_ascii_uppercase()
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing settings: {} (set them in the environment or with `recap config set`)", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value `{value}` for {key}: expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Granularity(#[from] UnknownGranularity),
    #[error(transparent)]
    Branches(#[from] PolicyError),
    #[error("cannot read {path}: {message}")]
    File { path: String, message: String },
}

// ── Config file ──

/// Read `config.json`. A missing file is an empty map.
pub fn read_config_file(
    path: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>, SettingsError> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let file_err = |message: String| SettingsError::File {
        path: path.display().to_string(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
    let val: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| file_err(e.to_string()))?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(file_err("expected a JSON object".into())),
    }
}

fn value_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ── Settings ──

#[derive(Debug, Clone)]
pub struct Settings {
    pub gitlab_url: Option<String>,
    pub gitlab_token: Option<String>,
    pub gitlab_username: Option<String>,
    pub gitlab_email: Option<String>,
    pub jira_url: Option<String>,
    pub jira_username: Option<String>,
    pub jira_password: Option<String>,
    pub git_repo_roots: Vec<PathBuf>,
    pub policy: BranchPolicy,
    pub mail: MailConfig,
    pub author_name: Option<String>,
    pub granularity: Granularity,
    pub template_dir: Option<PathBuf>,
    pub template: Option<String>,
}

/// Connection details for the code host.
pub struct CodeHostSettings<'a> {
    pub url: &'a str,
    pub token: &'a str,
    pub username: &'a str,
}

pub struct TrackerSettings<'a> {
    pub url: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl Settings {
    /// Config file under `config_json` overridden by the process environment.
    pub fn load(config_json: &Path) -> Result<Self, SettingsError> {
        let file = read_config_file(config_json)?;
        Self::from_sources(&file, |name| std::env::var(name).ok())
    }

    pub fn from_sources<F>(
        file: &serde_json::Map<String, serde_json::Value>,
        env: F,
    ) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |v: String| -> Option<String> {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        let get = |key: &str| -> Option<String> {
            env(&env_name(key))
                .and_then(present)
                .or_else(|| file.get(key).and_then(value_to_string).and_then(present))
        };
        let list = |key: &str, default: &[&str]| -> Vec<String> {
            match get(key) {
                Some(v) => v
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
                None => default.iter().map(|s| s.to_string()).collect(),
            }
        };

        let policy = BranchPolicy::new(
            &list("branches_rollout", recap_core::branches::DEFAULT_ROLLOUT),
            &list("branches_release", recap_core::branches::DEFAULT_RELEASE),
            &list("branches_integration", recap_core::branches::DEFAULT_INTEGRATION),
        )?;

        let smtp_port = match get("smtp_port") {
            Some(v) => v.parse::<u16>().map_err(|_| SettingsError::Invalid {
                key: env_name("smtp_port"),
                value: v.clone(),
                expected: "a port number",
            })?,
            None => DEFAULT_PORT,
        };
        let mail_thread = match get("mail_thread") {
            Some(v) => parse_bool(&v).ok_or_else(|| SettingsError::Invalid {
                key: env_name("mail_thread"),
                value: v.clone(),
                expected: "true or false",
            })?,
            None => false,
        };
        let granularity = match get("report_granularity") {
            Some(v) => v.parse()?,
            None => Granularity::default(),
        };

        let mail = MailConfig {
            smtp_host: get("smtp_host").unwrap_or_default(),
            smtp_port,
            smtp_user: get("smtp_user").unwrap_or_default(),
            smtp_password: get("smtp_password").unwrap_or_default(),
            from: get("mail_from").unwrap_or_default(),
            to: get("mail_to").map(|v| parse_recipients(&v)).unwrap_or_default(),
            cc: get("mail_cc").map(|v| parse_recipients(&v)).unwrap_or_default(),
            subject_template: get("mail_subject_template")
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            thread: mail_thread,
        };

        Ok(Self {
            gitlab_url: get("gitlab_url"),
            gitlab_token: get("gitlab_token"),
            gitlab_username: get("gitlab_username"),
            gitlab_email: get("gitlab_email"),
            jira_url: get("jira_url"),
            jira_username: get("jira_username"),
            jira_password: get("jira_password"),
            git_repo_roots: get("git_repo_roots")
                .map(|v| std::env::split_paths(&v).collect())
                .unwrap_or_default(),
            policy,
            mail,
            author_name: get("author_name"),
            granularity,
            template_dir: get("report_template_dir").map(PathBuf::from),
            template: get("report_template"),
        })
    }

    /// Required before anything talks to the network.
    pub fn code_host(&self) -> Result<CodeHostSettings<'_>, SettingsError> {
        let mut missing = Vec::new();
        for (key, val) in [
            ("gitlab_url", &self.gitlab_url),
            ("gitlab_token", &self.gitlab_token),
            ("gitlab_username", &self.gitlab_username),
        ] {
            if val.is_none() {
                missing.push(env_name(key));
            }
        }
        match (&self.gitlab_url, &self.gitlab_token, &self.gitlab_username) {
            (Some(url), Some(token), Some(username)) => Ok(CodeHostSettings {
                url,
                token,
                username,
            }),
            _ => Err(SettingsError::Missing(missing)),
        }
    }

    /// The tracker is optional; `None` unless all three settings are present.
    pub fn tracker(&self) -> Option<TrackerSettings<'_>> {
        Some(TrackerSettings {
            url: self.jira_url.as_deref()?,
            username: self.jira_username.as_deref()?,
            password: self.jira_password.as_deref()?,
        })
    }

    pub fn identity(&self) -> Identity {
        Identity::new(
            self.gitlab_username.clone().unwrap_or_default(),
            self.gitlab_email.clone(),
        )
    }

    /// Name used in the title and subject: `AUTHOR_NAME`, else the login.
    pub fn author(&self) -> String {
        self.author_name
            .clone()
            .or_else(|| self.gitlab_username.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn template_dir_or(&self, default: &Path) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
