//! Persistence layer: in-process tables behind a single lock.
//!
//! Reads take the shared guard. Writes go through [`Store::transact`], which
//! stages the operation on a copy of the tables, persists the snapshot when a
//! data file is configured, and only then publishes the copy. An operation
//! that returns `Err` (or a snapshot that fails to write) leaves the store
//! untouched.
//!
//! ## Snapshot format
//!
//! When opened with a path, the whole table set is serialized as JSON and
//! replaced atomically (`<file>.tmp` then rename) on every commit.
//!
//! Each write clones and re-serializes every table, so write cost grows with
//! the total data size. That is acceptable for a single-site charity's volume
//! of users, campaigns and comments; a larger deployment needs a real database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{
    Campaign, CampaignId, CampaignStatus, Comment, CommentId, Donation, Role, User, UserId,
};

pub const SNAPSHOT_FILE: &str = "fundraiser.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid snapshot in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastIds {
    user: u64,
    campaign: u64,
    donation: u64,
    comment: u64,
}

/// Every persisted row. Mutators assign ids; they perform no validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    users: BTreeMap<UserId, User>,
    campaigns: BTreeMap<CampaignId, Campaign>,
    donations: BTreeMap<u64, Donation>,
    comments: BTreeMap<CommentId, Comment>,
    last_ids: LastIds,
}

impl Tables {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Exact match; callers pass an already-normalized email.
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|user| user.email == email)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn insert_user(&mut self, email: String, password_hash: String, role: Role) -> User {
        self.last_ids.user += 1;
        let user = User {
            id: self.last_ids.user,
            email,
            password_hash,
            role,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn campaign(&self, id: CampaignId) -> Option<&Campaign> {
        self.campaigns.get(&id)
    }

    pub fn campaign_mut(&mut self, id: CampaignId) -> Option<&mut Campaign> {
        self.campaigns.get_mut(&id)
    }

    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.values()
    }

    pub fn insert_campaign(
        &mut self,
        title: String,
        description: String,
        status: CampaignStatus,
        created_by_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Campaign {
        self.last_ids.campaign += 1;
        let campaign = Campaign {
            id: self.last_ids.campaign,
            title,
            description,
            status,
            created_by_id,
            created_at,
        };
        self.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    pub fn insert_donation(
        &mut self,
        user_id: UserId,
        campaign_id: CampaignId,
        amount: u32,
        created_at: DateTime<Utc>,
    ) -> Donation {
        self.last_ids.donation += 1;
        let donation = Donation {
            id: self.last_ids.donation,
            user_id,
            campaign_id,
            amount,
            created_at,
        };
        self.donations.insert(donation.id, donation.clone());
        donation
    }

    pub fn donations(&self) -> impl Iterator<Item = &Donation> {
        self.donations.values()
    }

    /// Sum of all donations to a campaign; 0 when it has none.
    pub fn donation_total(&self, campaign_id: CampaignId) -> u64 {
        self.donations
            .values()
            .filter(|donation| donation.campaign_id == campaign_id)
            .map(|donation| u64::from(donation.amount))
            .sum()
    }

    pub fn donation_totals(&self) -> BTreeMap<CampaignId, u64> {
        let mut totals = BTreeMap::new();
        for donation in self.donations.values() {
            *totals.entry(donation.campaign_id).or_insert(0) += u64::from(donation.amount);
        }
        totals
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.get_mut(&id)
    }

    pub fn comments_for(&self, campaign_id: CampaignId) -> impl Iterator<Item = &Comment> {
        self.comments
            .values()
            .filter(move |comment| comment.campaign_id == campaign_id)
    }

    pub fn insert_comment(
        &mut self,
        content: String,
        user_id: UserId,
        campaign_id: CampaignId,
        created_at: DateTime<Utc>,
    ) -> Comment {
        self.last_ids.comment += 1;
        let comment = Comment {
            id: self.last_ids.comment,
            content,
            user_id,
            campaign_id,
            created_at,
            updated_at: None,
        };
        self.comments.insert(comment.id, comment.clone());
        comment
    }

    pub fn remove_comment(&mut self, id: CommentId) -> Option<Comment> {
        self.comments.remove(&id)
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<RwLock<Tables>>,
    snapshot: Option<PathBuf>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Tables::default())),
            snapshot: None,
        }
    }

    /// Opens a snapshot-backed store. A missing file starts an empty store.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let tables = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| StoreError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no snapshot found; starting empty");
                Tables::default()
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(tables)),
            snapshot: Some(path),
        })
    }

    pub async fn read<T>(&self, op: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.inner.read().await;
        op(&guard)
    }

    /// Runs `op` as one write transaction. Writers are serialized.
    pub async fn transact<T, E>(&self, op: impl FnOnce(&mut Tables) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.inner.write().await;
        let mut staged = guard.clone();
        let out = op(&mut staged)?;
        if let Some(path) = &self.snapshot {
            write_snapshot(path, &staged).await?;
        }
        *guard = staged;
        Ok(out)
    }
}

async fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec_pretty(tables)?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source| StoreError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(write_err)?;
    }
    tokio::fs::write(&tmp, encoded).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    debug!(path = %path.display(), "snapshot written");
    Ok(())
}
