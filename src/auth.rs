//! Authentication context for talking to the backend.
//!
//! Identity itself is provided by an external identity platform; this module only holds its
//! client configuration and the accounts obtained from it.  An [`AuthSession`] is created once
//! with [`AuthSession::initialize`], passed explicitly to whatever needs it, and ended with
//! [`AuthSession::teardown`].  Accounts are cached in a session file so a restarted client
//! picks up the last-used account.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use time::OffsetDateTime;

use crate::error::{Error, Result};

/// Application (client) id registered with the identity platform.
pub const DEFAULT_CLIENT_ID: &str = "e97ea252-2fc4-4063-8375-4a3a9c57f725";

/// Authority of the tenant the application is registered in.
pub const DEFAULT_AUTHORITY: &str =
    "https://login.microsoftonline.com/ef93cf82-da30-4e5b-8b45-3342cdca86ec/";

const CACHE_VERSION: u8 = 1;

/// Identity client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Application (client) id.
    pub client_id: String,

    /// Authority URL of the tenant.
    pub authority: String,

    /// Where the identity platform redirects after login.
    pub redirect_uri: String,

    /// Where the identity platform redirects after logout.
    pub post_logout_redirect_uri: String,

    /// Scopes requested at login.
    pub scopes: Vec<String>,

    /// Session cache file; `None` keeps accounts in memory only.
    pub cache_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            redirect_uri: "/".to_string(),
            post_logout_redirect_uri: "/".to_string(),
            scopes: Vec::new(),
            cache_path: None,
        }
    }
}

impl AuthConfig {
    /// Sets the session cache file.
    pub fn with_cache_path(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }
}

/// An account signed in through the identity platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier of the account.
    pub home_account_id: String,

    /// Login name, usually an email address.
    pub username: String,

    /// Display name, if the token carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Bearer token presented to the backend.
    pub access_token: String,

    /// When the access token stops being valid.
    #[serde(default, with = "crate::utils::time::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Deserialize)]
struct Claims {
    oid: Option<String>,
    tid: Option<String>,
    sub: Option<String>,
    preferred_username: Option<String>,
    upn: Option<String>,
    email: Option<String>,
    name: Option<String>,
    exp: Option<i64>,
}

impl Account {
    /// Build an account from an access token issued by the identity platform.
    ///
    /// The token's claims are read without verifying the signature; verification is the
    /// backend's job.
    pub fn from_access_token(token: &str) -> Result<Self> {
        let token = token.trim();
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::authentication(
                "access token must be a JWT with three segments",
            ));
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|err| {
                Error::encoding("access token payload is not base64url", Some(Box::new(err)))
            })?;
        let claims: Claims = serde_json::from_slice(&bytes)?;

        let home_account_id = match (&claims.oid, &claims.tid) {
            (Some(oid), Some(tid)) => format!("{oid}.{tid}"),
            (Some(oid), None) => oid.clone(),
            _ => claims.sub.clone().ok_or_else(|| {
                Error::authentication("access token carries no subject or object id")
            })?,
        };
        let username = claims
            .preferred_username
            .or(claims.upn)
            .or(claims.email)
            .unwrap_or_else(|| home_account_id.clone());
        let expires_at = match claims.exp {
            Some(exp) => Some(OffsetDateTime::from_unix_timestamp(exp).map_err(|err| {
                Error::validation(
                    format!("access token expiry out of range: {err}"),
                    Some("exp".to_string()),
                )
            })?),
            None => None,
        };

        Ok(Self {
            home_account_id,
            username,
            name: claims.name,
            access_token: token.to_string(),
            expires_at,
        })
    }

    /// Returns true if the token has expired at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Returns true if the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// Events reported by the identity platform.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// An interactive login completed.
    LoginSuccess(Account),
    /// The user signed out.
    Logout,
}

#[derive(Serialize, Deserialize)]
struct SessionCache {
    version: u8,
    accounts: Vec<Account>,
}

/// The authentication context of one client.
#[derive(Debug)]
pub struct AuthSession {
    config: AuthConfig,
    accounts: Vec<Account>,
    active: Option<usize>,
    cache_discarded: bool,
}

impl AuthSession {
    /// Initialize from configuration, restoring cached accounts.
    ///
    /// The first unexpired cached account becomes active.  A missing cache file is not an
    /// error, and neither is one that cannot be parsed: it is ignored, reported by
    /// [`AuthSession::cache_discarded`], and overwritten on the next sign-in.
    pub fn initialize(config: AuthConfig) -> Result<Self> {
        let contents = match &config.cache_path {
            Some(path) => load_cache(path)?,
            None => CacheContents::Accounts(Vec::new()),
        };
        let (mut accounts, cache_discarded) = match contents {
            CacheContents::Accounts(accounts) => (accounts, false),
            CacheContents::Discarded => (Vec::new(), true),
        };
        let now = OffsetDateTime::now_utc();
        accounts.retain(|account| !account.is_expired_at(now));
        let active = if accounts.is_empty() { None } else { Some(0) };
        Ok(Self {
            config,
            accounts,
            active,
            cache_discarded,
        })
    }

    /// True when a session cache existed but could not be read and was ignored.
    pub fn cache_discarded(&self) -> bool {
        self.cache_discarded
    }

    /// The identity client configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// All known accounts.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// The active account, if any.
    pub fn active_account(&self) -> Option<&Account> {
        self.active.and_then(|idx| self.accounts.get(idx))
    }

    /// The active account, or an authentication error when nobody is signed in.
    pub fn require_active(&self) -> Result<&Account> {
        match self.active_account() {
            Some(account) if account.is_expired() => Err(Error::authentication(format!(
                "session for {} has expired; sign in again",
                account.username
            ))),
            Some(account) => Ok(account),
            None => Err(Error::authentication(
                "no signed-in account; sign in to continue",
            )),
        }
    }

    /// Bearer token of the active account.
    pub fn access_token(&self) -> Option<&str> {
        self.active_account()
            .map(|account| account.access_token.as_str())
    }

    /// Apply an event from the identity platform.
    pub fn handle_event(&mut self, event: AuthEvent) -> Result<()> {
        match event {
            AuthEvent::LoginSuccess(account) => {
                let idx = match self
                    .accounts
                    .iter()
                    .position(|known| known.home_account_id == account.home_account_id)
                {
                    Some(idx) => {
                        self.accounts[idx] = account;
                        idx
                    }
                    None => {
                        self.accounts.push(account);
                        self.accounts.len() - 1
                    }
                };
                self.active = Some(idx);
                self.persist()
            }
            AuthEvent::Logout => self.teardown(),
        }
    }

    /// Sign out: forget every account and remove the session cache.
    pub fn teardown(&mut self) -> Result<()> {
        self.accounts.clear();
        self.active = None;
        if let Some(path) = &self.config.cache_path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(Error::io("failed to remove session cache", err)),
            }
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.config.cache_path else {
            return Ok(());
        };
        // The active account goes first so it is the one restored.
        let mut accounts = Vec::with_capacity(self.accounts.len());
        if let Some(active) = self.active_account() {
            accounts.push(active.clone());
        }
        for (idx, account) in self.accounts.iter().enumerate() {
            if Some(idx) != self.active {
                accounts.push(account.clone());
            }
        }
        let cache = SessionCache {
            version: CACHE_VERSION,
            accounts,
        };
        // Written beside the cache and renamed over it so a failed write never truncates it.
        let staging = staging_path(path);
        let result = write_cache(&staging, &cache)
            .and_then(|()| {
                fs::rename(&staging, path)
                    .map_err(|err| Error::io("failed to replace session cache", err))
            });
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("session"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_cache(path: &Path, cache: &SessionCache) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // The cache holds bearer tokens.
    #[cfg(unix)]
    options.mode(0o600);
    let file = options
        .open(path)
        .map_err(|err| Error::io("failed to create session cache", err))?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, cache).map_err(|err| {
        Error::serialization("failed to serialize session cache", Some(Box::new(err)))
    })?;
    writer
        .flush()
        .map_err(|err| Error::io("failed to write session cache", err))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|err| Error::io("failed to write session cache", err))
}

fn load_cache(path: &Path) -> Result<CacheContents> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(CacheContents::Accounts(Vec::new()));
        }
        Err(err) => return Err(Error::io("failed to open session cache", err)),
    };
    // An unreadable or foreign cache is treated as absent and replaced on the next sign-in.
    match from_reader::<_, SessionCache>(BufReader::new(file)) {
        Ok(cache) if cache.version == CACHE_VERSION => Ok(CacheContents::Accounts(cache.accounts)),
        Ok(_) | Err(_) => Ok(CacheContents::Discarded),
    }
}

enum CacheContents {
    Accounts(Vec<Account>),
    Discarded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    fn account(id: &str) -> Account {
        Account {
            home_account_id: id.to_string(),
            username: format!("{id}@example.com"),
            name: None,
            access_token: format!("token-{id}"),
            expires_at: None,
        }
    }

    fn temp_cache(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "citechat-{name}-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn account_from_token_claims() {
        let token = jwt(serde_json::json!({
            "oid": "o1",
            "tid": "t1",
            "preferred_username": "ada@example.com",
            "name": "Ada",
            "exp": 4_102_444_800i64
        }));
        let account = Account::from_access_token(&token).unwrap();
        assert_eq!(account.home_account_id, "o1.t1");
        assert_eq!(account.username, "ada@example.com");
        assert_eq!(account.name.as_deref(), Some("Ada"));
        assert_eq!(account.access_token, token);
        assert!(!account.is_expired());
    }

    #[test]
    fn account_falls_back_to_subject() {
        let token = jwt(serde_json::json!({"sub": "s1", "exp": 1}));
        let account = Account::from_access_token(&token).unwrap();
        assert_eq!(account.home_account_id, "s1");
        assert_eq!(account.username, "s1");
        assert!(account.is_expired());
    }

    #[test]
    fn rejects_non_jwt() {
        let err = Account::from_access_token("opaque-token").unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn non_utf8_claims_rejected() {
        let payload = URL_SAFE_NO_PAD.encode([b'{', 0xff, 0xfe, b'}']);
        let err = Account::from_access_token(&format!("e30.{payload}.c2ln")).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn no_account_blocks() {
        let session = AuthSession::initialize(AuthConfig::default()).unwrap();
        assert!(session.active_account().is_none());
        assert!(session.require_active().unwrap_err().is_authentication());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn login_success_activates() {
        let mut session = AuthSession::initialize(AuthConfig::default()).unwrap();
        session
            .handle_event(AuthEvent::LoginSuccess(account("a")))
            .unwrap();
        session
            .handle_event(AuthEvent::LoginSuccess(account("b")))
            .unwrap();
        assert_eq!(session.accounts().len(), 2);
        assert_eq!(session.require_active().unwrap().home_account_id, "b");
        assert_eq!(session.access_token(), Some("token-b"));

        session
            .handle_event(AuthEvent::LoginSuccess(account("a")))
            .unwrap();
        assert_eq!(session.accounts().len(), 2);
        assert_eq!(session.active_account().unwrap().home_account_id, "a");
    }

    #[test]
    fn restores_last_used_account() {
        let path = temp_cache("restore");
        let config = AuthConfig::default().with_cache_path(Some(path.clone()));
        {
            let mut session = AuthSession::initialize(config.clone()).unwrap();
            session
                .handle_event(AuthEvent::LoginSuccess(account("a")))
                .unwrap();
            session
                .handle_event(AuthEvent::LoginSuccess(account("b")))
                .unwrap();
        }
        let session = AuthSession::initialize(config.clone()).unwrap();
        assert_eq!(session.active_account().unwrap().home_account_id, "b");

        let mut session = session;
        session.handle_event(AuthEvent::Logout).unwrap();
        assert!(!path.exists());
        let session = AuthSession::initialize(config).unwrap();
        assert!(session.active_account().is_none());
    }

    #[test]
    fn expired_accounts_not_restored() {
        let path = temp_cache("expired");
        let config = AuthConfig::default().with_cache_path(Some(path.clone()));
        let mut stale = account("old");
        stale.expires_at = Some(OffsetDateTime::UNIX_EPOCH);
        {
            let mut session = AuthSession::initialize(config.clone()).unwrap();
            session.handle_event(AuthEvent::LoginSuccess(stale)).unwrap();
        }
        let session = AuthSession::initialize(config).unwrap();
        assert!(session.active_account().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unreadable_cache_is_ignored() {
        for (name, contents) in [
            ("truncated", r#"{"version":1,"accounts":[{"home_acc"#),
            ("version", r#"{"version":9,"accounts":[]}"#),
            ("garbage", "not json"),
        ] {
            let path = temp_cache(name);
            fs::write(&path, contents).unwrap();
            let config = AuthConfig::default().with_cache_path(Some(path.clone()));
            let mut session = AuthSession::initialize(config.clone()).unwrap();
            assert!(session.cache_discarded(), "{name}");
            assert!(session.active_account().is_none(), "{name}");

            session
                .handle_event(AuthEvent::LoginSuccess(account("a")))
                .unwrap();
            let session = AuthSession::initialize(config).unwrap();
            assert!(!session.cache_discarded(), "{name}");
            assert_eq!(session.active_account().unwrap().home_account_id, "a");
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn cache_replaced_without_leftovers() {
        let path = temp_cache("staging");
        let config = AuthConfig::default().with_cache_path(Some(path.clone()));
        let mut session = AuthSession::initialize(config).unwrap();
        session
            .handle_event(AuthEvent::LoginSuccess(account("a")))
            .unwrap();
        session
            .handle_event(AuthEvent::LoginSuccess(account("b")))
            .unwrap();
        assert!(path.exists());
        assert!(!staging_path(&path).exists());
        let _ = fs::remove_file(path);
    }

    #[cfg(unix)]
    #[test]
    fn cache_readable_only_by_owner() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_cache("mode");
        let config = AuthConfig::default().with_cache_path(Some(path.clone()));
        let mut session = AuthSession::initialize(config).unwrap();
        session
            .handle_event(AuthEvent::LoginSuccess(account("a")))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let _ = fs::remove_file(path);
    }
}
