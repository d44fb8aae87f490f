// src/exec/credentials.rs

//! Alternate-user execution: account names, secrets and the environment an
//! impersonated child starts with.

use std::collections::HashMap;
use std::fmt;

use super::ExecError;

/// A password that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

/// `DOMAIN\user` or plain `user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountName {
    pub domain: Option<String>,
    pub user: String,
}

impl AccountName {
    /// Split on a single backslash. Anything else is a bare user name.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('\\');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(domain), Some(user), None) => Self {
                domain: Some(domain.to_string()),
                user: user.to_string(),
            },
            _ => Self {
                domain: None,
                user: raw.to_string(),
            },
        }
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.domain {
            Some(domain) => write!(f, "{domain}\\{}", self.user),
            None => f.write_str(&self.user),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub account: AccountName,
    pub password: Secret,
}

impl Credentials {
    pub fn new(user_name: &str, password: Secret) -> Self {
        Self {
            account: AccountName::parse(user_name),
            password,
        }
    }
}

/// Checks an account's password before a child is started under it.
///
/// Nothing in this crate can verify a password against the host's account
/// database, so the executor defaults to [`RejectPasswords`]. Hosts that can
/// authenticate (PAM, a logon service) plug in their own implementation.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, account: &AccountName, password: &Secret) -> Result<(), ExecError>;
}

/// Refuses every password, so runs under another account fail to start.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectPasswords;

impl Authenticator for RejectPasswords {
    fn authenticate(&self, account: &AccountName, _password: &Secret) -> Result<(), ExecError> {
        Err(ExecError::Impersonation {
            account: account.to_string(),
            reason: "password authentication is not supported".to_string(),
        })
    }
}

/// Grants an account access to the interactive session resources a child
/// needs before it can start under that account (window station and
/// desktop on Windows).
///
/// Only [`NoopSessionAccess`] ships here. There is no Windows ACL grant yet,
/// and alternate credentials fail to start on non-Unix hosts.
pub trait SessionAccess: Send + Sync {
    fn grant(&self, account: &AccountName) -> Result<(), ExecError>;
}

/// For hosts where a child under another account needs no extra grants.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionAccess;

impl SessionAccess for NoopSessionAccess {
    fn grant(&self, _account: &AccountName) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Variables from `vars` whose names start with `prefix`.
pub fn carry_over_vars<I>(prefix: &str, vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .collect()
}

/// Uid, gid and base environment of a local account.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub uid: u32,
    pub gid: u32,
    pub environment: HashMap<String, String>,
}

/// Resolve a local account. The domain part has no meaning on Unix and is
/// ignored.
#[cfg(unix)]
pub fn resolve_identity(account: &AccountName) -> Result<ResolvedIdentity, ExecError> {
    use nix::unistd::User;

    let user = User::from_name(&account.user)
        .map_err(|e| ExecError::Impersonation {
            account: account.to_string(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| ExecError::Impersonation {
            account: account.to_string(),
            reason: "no such user".to_string(),
        })?;

    let mut environment = HashMap::new();
    environment.insert("HOME".to_string(), user.dir.display().to_string());
    environment.insert("USER".to_string(), user.name.clone());
    environment.insert("LOGNAME".to_string(), user.name.clone());
    environment.insert("SHELL".to_string(), user.shell.display().to_string());
    environment.insert(
        "PATH".to_string(),
        "/usr/local/bin:/usr/bin:/bin".to_string(),
    );

    Ok(ResolvedIdentity {
        uid: user.uid.as_raw(),
        gid: user.gid.as_raw(),
        environment,
    })
}
