//! Read side: what each viewer is allowed to see.
//!
//! Closed campaigns are hidden from everyone except admins. Listings are
//! newest first.

use std::cmp::Ordering;

use crate::error::AppError;
use crate::identity::Viewer;
use crate::models::{Campaign, CampaignId, Comment, CommentId, Donation, User};
use crate::mutations::{authorize_comment_change, can_modify_comment};
use crate::store::{Store, Tables};

#[derive(Debug, Clone)]
pub struct CampaignWithTotal {
    pub campaign: Campaign,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: Comment,
    pub author_email: Option<String>,
    pub can_edit: bool,
}

#[derive(Debug, Clone)]
pub struct CampaignPage {
    pub campaign: Campaign,
    pub total: u64,
    pub comments: Vec<CommentEntry>,
}

#[derive(Debug, Clone)]
pub struct DonationEntry {
    pub donation: Donation,
    pub campaign_title: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Counts {
    pub users: usize,
    pub campaigns: usize,
}

fn newest_first(a: &Campaign, b: &Campaign) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

fn with_totals<'a>(
    tables: &Tables,
    campaigns: impl Iterator<Item = &'a Campaign>,
) -> Vec<CampaignWithTotal> {
    let totals = tables.donation_totals();
    let mut out = campaigns
        .map(|campaign| CampaignWithTotal {
            campaign: campaign.clone(),
            total: totals.get(&campaign.id).copied().unwrap_or(0),
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| newest_first(&a.campaign, &b.campaign));
    out
}

/// Public listing: open campaigns only, unless the viewer is an admin.
pub async fn list_campaigns(store: &Store, viewer: &Viewer) -> Vec<CampaignWithTotal> {
    let include_closed = viewer.is_admin();
    store
        .read(|tables| {
            with_totals(
                tables,
                tables
                    .campaigns()
                    .filter(|campaign| include_closed || campaign.is_open()),
            )
        })
        .await
}

/// Admin listing: every campaign regardless of status.
pub async fn all_campaigns(store: &Store) -> Vec<CampaignWithTotal> {
    store
        .read(|tables| with_totals(tables, tables.campaigns()))
        .await
}

/// A closed campaign is reported as missing to non-admins.
pub async fn campaign_page(
    store: &Store,
    viewer: &Viewer,
    campaign_id: CampaignId,
) -> Result<CampaignPage, AppError> {
    store
        .read(|tables| -> Result<CampaignPage, AppError> {
            let campaign = tables
                .campaign(campaign_id)
                .filter(|campaign| campaign.is_open() || viewer.is_admin())
                .ok_or(AppError::NotFound("Campaign not found"))?;

            let mut comments = tables
                .comments_for(campaign_id)
                .map(|comment| CommentEntry {
                    comment: comment.clone(),
                    author_email: tables.user(comment.user_id).map(|user| user.email.clone()),
                    can_edit: viewer
                        .user()
                        .is_some_and(|user| can_modify_comment(user, comment)),
                })
                .collect::<Vec<_>>();
            comments.sort_by(|a, b| {
                a.comment
                    .created_at
                    .cmp(&b.comment.created_at)
                    .then(a.comment.id.cmp(&b.comment.id))
            });

            Ok(CampaignPage {
                campaign: campaign.clone(),
                total: tables.donation_total(campaign_id),
                comments,
            })
        })
        .await
}

pub async fn campaign_for_edit(store: &Store, campaign_id: CampaignId) -> Result<Campaign, AppError> {
    store
        .read(|tables| tables.campaign(campaign_id).cloned())
        .await
        .ok_or(AppError::NotFound("Campaign not found"))
}

/// The caller's own donations, newest first.
pub async fn donations_of(store: &Store, user: &User) -> Vec<DonationEntry> {
    store
        .read(|tables| {
            let mut entries = tables
                .donations()
                .filter(|donation| donation.user_id == user.id)
                .map(|donation| DonationEntry {
                    donation: donation.clone(),
                    campaign_title: tables
                        .campaign(donation.campaign_id)
                        .map(|campaign| campaign.title.clone()),
                })
                .collect::<Vec<_>>();
            entries.sort_by(|a, b| {
                b.donation
                    .created_at
                    .cmp(&a.donation.created_at)
                    .then(b.donation.id.cmp(&a.donation.id))
            });
            entries
        })
        .await
}

pub async fn comment_for_edit(
    store: &Store,
    user: &User,
    comment_id: CommentId,
) -> Result<Comment, AppError> {
    let comment = store
        .read(|tables| tables.comment(comment_id).cloned())
        .await
        .ok_or(AppError::NotFound("Comment not found"))?;
    authorize_comment_change(user, &comment, "You don't have permission to edit this comment")?;
    Ok(comment)
}

pub async fn counts(store: &Store) -> Counts {
    store
        .read(|tables| Counts {
            users: tables.user_count(),
            campaigns: tables.campaigns().count(),
        })
        .await
}
