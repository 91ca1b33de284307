//! Reviewer credential table loaded from TOML.
//!
//! ```toml
//! [users.U07H3RSNQLD]
//! github_login = "octocat"
//! token_env = "OCTOCAT_GITHUB_TOKEN"
//!
//! [users.U02ABCDEF12]
//! github_login = "hubot"
//! token = "ghp_..."
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use anyhow::{bail, Context, Result};
use relay_github::{Credential, CredentialResolver};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialFile {
    #[serde(default)]
    users: BTreeMap<String, CredentialEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialEntry {
    github_login: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_env: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct StaticCredentialMap {
    entries: HashMap<String, Credential>,
}

impl StaticCredentialMap {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials file {}", path.display()))?;
        Self::from_toml_str(&raw, |name| std::env::var(name).ok())
            .with_context(|| format!("invalid credentials file {}", path.display()))
    }

    pub(crate) fn from_toml_str<F>(raw: &str, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = toml::from_str::<CredentialFile>(raw).context("failed to parse credentials")?;
        let mut entries = HashMap::with_capacity(file.users.len());
        for (user_id, entry) in file.users {
            let user_id = user_id.trim().to_string();
            if user_id.is_empty() {
                bail!("credential entries must be keyed by a non-empty slack user id");
            }
            let github_login = entry.github_login.trim().to_string();
            if github_login.is_empty() {
                bail!("credential for {user_id} has an empty github_login");
            }
            let token = match (entry.token, entry.token_env) {
                (Some(token), None) => token,
                (None, Some(variable)) => lookup_env(variable.trim()).with_context(|| {
                    format!("credential for {user_id} references unset environment variable {variable}")
                })?,
                (Some(_), Some(_)) => {
                    bail!("credential for {user_id} must set only one of token or token_env")
                }
                (None, None) => bail!("credential for {user_id} must set token or token_env"),
            };
            if token.trim().is_empty() {
                bail!("credential for {user_id} has an empty token");
            }
            entries.insert(user_id, Credential::new(github_login, token.trim()));
        }
        Ok(Self { entries })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialResolver for StaticCredentialMap {
    fn resolve_credential(&self, chat_user_id: &str) -> Option<Credential> {
        self.entries.get(chat_user_id.trim()).cloned()
    }
}
