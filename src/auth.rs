//! Authentication records (users, passwords, tokens) stored as links plus
//! JSON payload files.
//!
//! Link schemas, with `num(id)` the numeric form of a string id:
//! 1. Users: `(num(userId) 2000)`
//! 2. Tokens: `(num(tokenId) num(userId))`, the token belongs to the user
//! 3. Passwords: `(num(passwordId) num(userId))`, the password belongs to the user

use crate::config::LinksConfig;
use crate::error::LinksError;
use crate::id::{id_to_number, record_id};
use crate::link_db::LinkDbService;
use crate::storage::{JsonDir, check_key};
use crate::types::Link;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Target of every user link.
pub const USER_TYPE_ID: u64 = 2000;

const USERS_DIR: &str = "users";
const TOKENS_DIR: &str = "tokens";
const PASSWORDS_DIR: &str = "passwords";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Free-form profile fields
    #[serde(flatten)]
    pub profile: BTreeMap<String, Value>,
}

/// Caller-supplied user fields for create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub profile: BTreeMap<String, Value>,
}

impl UserFields {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            email: Some(email.into()),
            profile: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Password {
    pub password_id: String,
    pub user_id: String,

    /// Already-hashed secret; this layer never sees plaintext
    pub hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordFields {
    pub hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub token_id: String,
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Link and file counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityStatistics {
    pub links: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatistics {
    pub total_links: usize,
    pub users: EntityStatistics,
    pub tokens: EntityStatistics,
    pub passwords: EntityStatistics,
}

/// Stores authentication data using the link database.
pub struct AuthStorageService {
    link_db: LinkDbService,
    users: JsonDir,
    tokens: JsonDir,
    passwords: JsonDir,
}

impl AuthStorageService {
    /// Service on the auth database and directories of `config`.
    pub fn new(config: &LinksConfig) -> Result<Self> {
        let auth_config = config.clone().with_db_path(config.auth_db_path());
        Self::with_link_db(LinkDbService::from_config(&auth_config), config.auth_dir())
    }

    pub fn with_link_db(link_db: LinkDbService, auth_dir: impl Into<PathBuf>) -> Result<Self> {
        let auth_dir = auth_dir.into();
        let open = |name: &str| {
            JsonDir::open(auth_dir.join(name)).wrap_err_with(|| format!("Failed to open auth {} directory", name))
        };
        Ok(Self {
            users: open(USERS_DIR)?,
            tokens: open(TOKENS_DIR)?,
            passwords: open(PASSWORDS_DIR)?,
            link_db,
        })
    }

    pub fn link_db(&self) -> &LinkDbService {
        &self.link_db
    }

    /// Write the payload, then its link; the payload is rolled back if the link fails.
    fn persist<T: Serialize>(&self, dir: &JsonDir, key: &str, record: &T, source: u64, target: u64) -> Result<Link> {
        dir.save(key, record)?;
        match self.link_db.create_link(source, target) {
            Ok(link) => Ok(link),
            Err(e) => {
                if let Err(cleanup) = dir.remove(key) {
                    log::warn!("Failed to roll back {}: {:#}", key, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Delete every link whose source is `source`.
    fn delete_links_from(&self, source: u64) -> Result<usize> {
        let links = self.link_db.read_all_links()?;
        let mut deleted = 0;
        for link in links.iter().filter(|l| l.source == source) {
            self.link_db.delete_link(link.id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    fn remove_file(dir: &JsonDir, key: &str) {
        match dir.remove(key) {
            Ok(true) => log::info!("Deleted {}", key),
            Ok(false) => log::warn!("No data file for {}", key),
            Err(e) => log::warn!("Failed to delete data file for {}: {:#}", key, e),
        }
    }

    // ==================== USER OPERATIONS ====================

    pub fn create_user(&self, fields: UserFields) -> Result<User> {
        let now = Utc::now();
        let content = serde_json::to_string(&fields).context("Failed to serialize user")?;
        let user_id = record_id("user", &content, now);

        let user = User {
            user_id: user_id.clone(),
            username: fields.username,
            email: fields.email,
            created_at: now,
            updated_at: None,
            profile: fields.profile,
        };

        self.persist(&self.users, &user_id, &user, id_to_number(&user_id), USER_TYPE_ID)
            .wrap_err_with(|| format!("Failed to create user link: {}", user_id))?;
        log::info!("User created in link database: {}", user_id);

        Ok(user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.users.load(user_id)
    }

    pub fn get_all_users(&self) -> Result<Vec<User>> {
        self.users.load_all()
    }

    /// Merge `updates` into an existing user; `userId` and `createdAt` are kept.
    pub fn update_user(&self, user_id: &str, updates: UserFields) -> Result<User> {
        let existing = self
            .get_user(user_id)?
            .ok_or_else(|| eyre::eyre!(LinksError::NotFound(format!("User {} not found", user_id))))?;

        let mut profile = existing.profile;
        profile.extend(updates.profile);
        let updated = User {
            user_id: existing.user_id,
            username: updates.username.or(existing.username),
            email: updates.email.or(existing.email),
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
            profile,
        };

        self.users.save(user_id, &updated)?;
        log::info!("User updated: {}", user_id);
        Ok(updated)
    }

    /// Delete a user with its tokens and passwords.
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        check_key(user_id)?;
        for token in self.get_user_tokens(user_id)? {
            self.delete_token(&token.token_id)?;
        }
        for password in self.get_user_passwords(user_id)? {
            self.delete_password(&password.password_id)?;
        }

        let numeric = id_to_number(user_id);
        let links = self.link_db.read_all_links()?;
        if let Some(link) = links.iter().find(|l| l.source == numeric && l.target == USER_TYPE_ID) {
            self.link_db.delete_link(link.id)?;
        }

        Self::remove_file(&self.users, user_id);
        Ok(())
    }

    /// Linear scan over all users.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .get_all_users()?
            .into_iter()
            .find(|u| u.username.as_deref() == Some(username)))
    }

    /// Linear scan over all users.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .get_all_users()?
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email)))
    }

    // ==================== TOKEN OPERATIONS ====================

    pub fn create_token(&self, user_id: &str, fields: TokenFields) -> Result<Token> {
        let now = Utc::now();
        let content = serde_json::to_string(&fields).context("Failed to serialize token")?;
        let token_id = record_id("token", &content, now);

        let token = Token {
            token_id: token_id.clone(),
            user_id: user_id.to_string(),
            api_key: fields.api_key,
            permissions: fields.permissions,
            expires_at: fields.expires_at,
            created_at: now,
            extra: fields.extra,
        };

        self.persist(
            &self.tokens,
            &token_id,
            &token,
            id_to_number(&token_id),
            id_to_number(user_id),
        )
        .wrap_err_with(|| format!("Failed to create token link: tokenId={}, userId={}", token_id, user_id))?;
        log::info!("Token created in link database: tokenId={}, userId={}", token_id, user_id);

        Ok(token)
    }

    pub fn get_token(&self, token_id: &str) -> Result<Option<Token>> {
        self.tokens.load(token_id)
    }

    pub fn get_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        Ok(self
            .tokens
            .load_all::<Token>()?
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect())
    }

    pub fn delete_token(&self, token_id: &str) -> Result<()> {
        check_key(token_id)?;
        self.delete_links_from(id_to_number(token_id))?;
        Self::remove_file(&self.tokens, token_id);
        Ok(())
    }

    /// Linear scan over all tokens.
    pub fn find_token_by_api_key(&self, api_key: &str) -> Result<Option<Token>> {
        Ok(self
            .tokens
            .load_all::<Token>()?
            .into_iter()
            .find(|t| t.api_key.as_deref() == Some(api_key)))
    }

    // ==================== PASSWORD OPERATIONS ====================

    /// Replace the user's password.
    pub fn set_password(&self, user_id: &str, fields: PasswordFields) -> Result<Password> {
        for existing in self.get_user_passwords(user_id)? {
            self.delete_password(&existing.password_id)?;
        }

        let now = Utc::now();
        let content = serde_json::to_string(&fields).context("Failed to serialize password")?;
        let password_id = record_id("pwd", &content, now);

        let password = Password {
            password_id: password_id.clone(),
            user_id: user_id.to_string(),
            hash: fields.hash,
            salt: fields.salt,
            algorithm: fields.algorithm,
            created_at: now,
        };

        self.persist(
            &self.passwords,
            &password_id,
            &password,
            id_to_number(&password_id),
            id_to_number(user_id),
        )
        .wrap_err_with(|| format!("Failed to create password link: passwordId={}, userId={}", password_id, user_id))?;
        log::info!("Password created in link database: passwordId={}, userId={}", password_id, user_id);

        Ok(password)
    }

    pub fn get_user_password(&self, user_id: &str) -> Result<Option<Password>> {
        Ok(self.get_user_passwords(user_id)?.into_iter().next())
    }

    pub fn get_user_passwords(&self, user_id: &str) -> Result<Vec<Password>> {
        Ok(self
            .passwords
            .load_all::<Password>()?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect())
    }

    pub fn delete_password(&self, password_id: &str) -> Result<()> {
        check_key(password_id)?;
        self.delete_links_from(id_to_number(password_id))?;
        Self::remove_file(&self.passwords, password_id);
        Ok(())
    }

    // ==================== STATISTICS & UTILITIES ====================

    pub fn get_statistics(&self) -> Result<AuthStatistics> {
        let links = self.link_db.read_all_links()?;
        let numeric_keys = |dir: &JsonDir| -> Result<HashSet<u64>> {
            Ok(dir.keys()?.iter().map(|k| id_to_number(k)).collect())
        };
        let token_ids = numeric_keys(&self.tokens)?;
        let password_ids = numeric_keys(&self.passwords)?;

        Ok(AuthStatistics {
            total_links: links.len(),
            users: EntityStatistics {
                links: links.iter().filter(|l| l.target == USER_TYPE_ID).count(),
                files: self.users.count()?,
            },
            tokens: EntityStatistics {
                links: links.iter().filter(|l| token_ids.contains(&l.source)).count(),
                files: token_ids.len(),
            },
            passwords: EntityStatistics {
                links: links.iter().filter(|l| password_ids.contains(&l.source)).count(),
                files: password_ids.len(),
            },
        })
    }

    /// Remove every auth link and record. Irreversible.
    pub fn clear_all_auth_data(&self) -> Result<()> {
        log::warn!("Clearing ALL authentication data - this is irreversible!");
        self.link_db.clear_database()?;
        for dir in [&self.users, &self.tokens, &self.passwords] {
            let removed = dir
                .clear()
                .wrap_err_with(|| format!("Failed to clear {}", dir.path().display()))?;
            log::info!("Cleared {} record(s) from {}", removed, dir.path().display());
        }
        Ok(())
    }
}
