use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::browse::{CampaignPage, CampaignWithTotal, CommentEntry, DonationEntry};
use crate::identity::Viewer;
use crate::models::{
    Campaign, CampaignId, CampaignStatus, Comment, CommentId, DonationId, Role, UserId,
};

/// Viewer state rendered on every page.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewerView {
    Anonymous,
    Authenticated {
        id: UserId,
        email: String,
        role: Role,
    },
}

impl From<&Viewer> for ViewerView {
    fn from(viewer: &Viewer) -> Self {
        match viewer {
            Viewer::Anonymous => ViewerView::Anonymous,
            Viewer::Authenticated(user) => ViewerView::Authenticated {
                id: user.id,
                email: user.email.clone(),
                role: user.role,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub users: usize,
    pub campaigns: usize,
}

#[derive(Debug, Serialize)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub status: CampaignStatus,
    pub created_by_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl CampaignSummary {
    fn new(campaign: Campaign, total: Option<u64>) -> Self {
        Self {
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            status: campaign.status,
            created_by_id: campaign.created_by_id,
            created_at: campaign.created_at,
            total,
        }
    }
}

impl From<CampaignWithTotal> for CampaignSummary {
    fn from(entry: CampaignWithTotal) -> Self {
        CampaignSummary::new(entry.campaign, Some(entry.total))
    }
}

impl From<Campaign> for CampaignSummary {
    fn from(campaign: Campaign) -> Self {
        CampaignSummary::new(campaign, None)
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub viewer: ViewerView,
    pub campaigns: Vec<CampaignSummary>,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub content: String,
    pub author_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub can_edit: bool,
}

impl CommentView {
    pub fn new(comment: Comment, author_email: Option<String>, can_edit: bool) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author_id: comment.user_id,
            author_email,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            can_edit,
        }
    }
}

impl From<CommentEntry> for CommentView {
    fn from(entry: CommentEntry) -> Self {
        CommentView::new(entry.comment, entry.author_email, entry.can_edit)
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignDetailResponse {
    pub viewer: ViewerView,
    pub campaign: CampaignSummary,
    pub comments: Vec<CommentView>,
}

impl CampaignDetailResponse {
    pub fn new(viewer: &Viewer, page: CampaignPage) -> Self {
        Self {
            viewer: viewer.into(),
            campaign: CampaignSummary::new(page.campaign, Some(page.total)),
            comments: page.comments.into_iter().map(CommentView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DonationView {
    pub id: DonationId,
    pub campaign_id: CampaignId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_title: Option<String>,
    pub amount: u32,
    pub created_at: DateTime<Utc>,
}

impl From<DonationEntry> for DonationView {
    fn from(entry: DonationEntry) -> Self {
        Self {
            id: entry.donation.id,
            campaign_id: entry.donation.campaign_id,
            campaign_title: entry.campaign_title,
            amount: entry.donation.amount,
            created_at: entry.donation.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DonationListResponse {
    pub viewer: ViewerView,
    pub donations: Vec<DonationView>,
}

/// A blank or pre-filled form page.
#[derive(Debug, Serialize)]
pub struct FormPage<T: Serialize> {
    pub viewer: ViewerView,
    pub form: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CampaignForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "target_status", alias = "status_value")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DonateForm {
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}
