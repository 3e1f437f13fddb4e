use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{AppError, ResultExt};
use crate::models::UserProfile;

/// Read access to stored applicant profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Point lookup of the profile record keyed by `uid`.
    async fn find_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Newest entry of the profile submission log, whoever submitted it.
    async fn latest_profile_submission(&self) -> Result<Option<UserProfile>, AppError>;
}

/// Resolves the profile used for a credit analysis.
#[derive(Clone)]
pub struct ProfileLookup {
    store: Arc<dyn ProfileStore>,
}

impl ProfileLookup {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Returns the user's own record, else the most recent submission from
    /// anyone, else `None`.
    pub async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        if let Some(profile) = self
            .store
            .find_user_profile(uid)
            .await
            .with_context(|| format!("Failed to read profile for uid {}", uid))?
        {
            tracing::info!("Found stored profile for uid {}", uid);
            return Ok(Some(profile));
        }

        let latest = self
            .store
            .latest_profile_submission()
            .await
            .context("Failed to read latest profile submission")?;

        match latest {
            Some(profile) => {
                tracing::warn!(
                    "No stored profile for uid {}, using latest profile submission",
                    uid
                );
                Ok(Some(profile))
            }
            None => {
                tracing::info!("No profile found for uid {}", uid);
                Ok(None)
            }
        }
    }
}

// ============ Postgres ============

/// Profile store backed by two Postgres tables:
/// `users(uid TEXT PRIMARY KEY, profile JSONB)` and
/// `user_profiles(id BIGSERIAL, profile JSONB, "timestamp" TIMESTAMPTZ)`.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool to the profile database and checks it answers.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let row: Option<(Json<UserProfile>,)> =
            sqlx::query_as("SELECT profile FROM users WHERE uid = $1 LIMIT 1")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to query users")?;

        Ok(row.map(|(Json(profile),)| profile))
    }

    async fn latest_profile_submission(&self) -> Result<Option<UserProfile>, AppError> {
        let row: Option<(Json<UserProfile>,)> = sqlx::query_as(
            r#"SELECT profile FROM user_profiles ORDER BY "timestamp" DESC LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query user_profiles")?;

        Ok(row.map(|(Json(profile),)| profile))
    }
}

// ============ In-memory ============

#[derive(Debug, Clone)]
struct ProfileSubmission {
    profile: UserProfile,
    timestamp: DateTime<Utc>,
}

/// Profile store held in process memory, for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    users: RwLock<HashMap<String, UserProfile>>,
    submissions: RwLock<Vec<ProfileSubmission>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, uid: impl Into<String>, profile: UserProfile) -> Self {
        if let Ok(mut users) = self.users.write() {
            users.insert(uid.into(), profile);
        }
        self
    }

    pub fn with_submission(self, profile: UserProfile, timestamp: DateTime<Utc>) -> Self {
        if let Ok(mut submissions) = self.submissions.write() {
            submissions.push(ProfileSubmission { profile, timestamp });
        }
        self
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let users = self
            .users
            .read()
            .map_err(|_| AppError::TransportFailure("profile store lock poisoned".to_string()))?;
        Ok(users.get(uid).cloned())
    }

    async fn latest_profile_submission(&self) -> Result<Option<UserProfile>, AppError> {
        let submissions = self
            .submissions
            .read()
            .map_err(|_| AppError::TransportFailure("profile store lock poisoned".to_string()))?;
        Ok(submissions
            .iter()
            .max_by_key(|s| s.timestamp)
            .map(|s| s.profile.clone()))
    }
}
