//! Validated writes: registration, campaigns, donations and comments.
//!
//! Every operation checks, in order: raw input bounds, normalization,
//! non-emptiness after trimming, existence of the referenced row, business
//! state, then ownership. Checks that depend on stored rows run inside the
//! same [`Store::transact`] call as the write, so a rejected request commits
//! nothing.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{
    Campaign, CampaignId, CampaignStatus, Comment, CommentId, Donation, Role, User,
};
use crate::password::CredentialHasher;
use crate::store::Store;

pub const EMAIL_MAX_LENGTH: usize = 64;
pub const PASSWORD_MAX_LENGTH: usize = 255;
pub const CAMPAIGN_TITLE_MAX_LENGTH: usize = 200;
pub const CAMPAIGN_DESCRIPTION_MAX_LENGTH: usize = 5000;
pub const COMMENT_CONTENT_MAX_LENGTH: usize = 1000;
pub const DONATION_AMOUNT_MIN: u32 = 1;
pub const DONATION_AMOUNT_MAX: u32 = 999_999_999;

const BAD_CREDENTIALS: &str = "Incorrect email or password.";

fn check_max_len(field: &str, raw: &str, max: usize) -> Result<(), AppError> {
    if raw.chars().count() > max {
        return Err(AppError::invalid(format!(
            "{field} must be at most {max} characters."
        )));
    }
    Ok(())
}

/// Trims and lowercases an email. Rejects over-long and blank input.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    check_max_len("Email", raw, EMAIL_MAX_LENGTH)?;
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::invalid("Email is required."));
    }
    Ok(email)
}

/// Bounds the password before it reaches the hasher. Passwords are not trimmed.
pub fn check_password(raw: &str) -> Result<(), AppError> {
    if raw.is_empty() {
        return Err(AppError::invalid("Password is required."));
    }
    check_max_len("Password", raw, PASSWORD_MAX_LENGTH)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub status: CampaignStatus,
}

impl CampaignDraft {
    /// A missing status means "open"; unknown values are coerced to "open".
    pub fn parse(title: &str, description: &str, status: Option<&str>) -> Result<Self, AppError> {
        check_max_len("Title", title, CAMPAIGN_TITLE_MAX_LENGTH)?;
        check_max_len("Description", description, CAMPAIGN_DESCRIPTION_MAX_LENGTH)?;

        let title = title.trim();
        let description = description.trim();
        if title.is_empty() {
            return Err(AppError::invalid("Title is required."));
        }
        if description.is_empty() {
            return Err(AppError::invalid("Description is required."));
        }

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
            status: status.map_or(CampaignStatus::Open, CampaignStatus::coerce),
        })
    }
}

pub fn parse_amount(raw: &str) -> Result<u32, AppError> {
    let out_of_range = || {
        AppError::invalid(format!(
            "Amount must be between {DONATION_AMOUNT_MIN} and {DONATION_AMOUNT_MAX}."
        ))
    };

    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::invalid("Amount must be a whole number."))?;
    if !(i64::from(DONATION_AMOUNT_MIN)..=i64::from(DONATION_AMOUNT_MAX)).contains(&value) {
        return Err(out_of_range());
    }
    u32::try_from(value).map_err(|_| out_of_range())
}

pub fn parse_comment(raw: &str) -> Result<String, AppError> {
    check_max_len("Comment", raw, COMMENT_CONTENT_MAX_LENGTH)?;
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::invalid("Comment content cannot be empty"));
    }
    Ok(content.to_string())
}

pub fn can_modify_comment(user: &User, comment: &Comment) -> bool {
    comment.user_id == user.id || user.is_admin()
}

pub(crate) fn authorize_comment_change(
    user: &User,
    comment: &Comment,
    denial: &'static str,
) -> Result<(), AppError> {
    if can_modify_comment(user, comment) {
        Ok(())
    } else {
        warn!(
            user_id = user.id,
            comment_id = comment.id,
            author_id = comment.user_id,
            "comment change denied"
        );
        Err(AppError::Forbidden(denial))
    }
}

/// Creates an account and grants `Admin` when the user table is empty.
///
/// The emptiness check and the insert share one write transaction, so two
/// concurrent first registrations cannot both become admin.
pub async fn register(
    store: &Store,
    hasher: &CredentialHasher,
    raw_email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(raw_email)?;
    check_password(password)?;

    let taken = store
        .read(|tables| tables.user_by_email(&email).is_some())
        .await;
    if taken {
        return Err(duplicate_email());
    }

    let password_hash = {
        let hasher = hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await??
    };

    let user = store
        .transact(|tables| -> Result<User, AppError> {
            if tables.user_by_email(&email).is_some() {
                return Err(duplicate_email());
            }
            let role = if tables.user_count() == 0 {
                Role::Admin
            } else {
                Role::User
            };
            Ok(tables.insert_user(email, password_hash, role))
        })
        .await?;

    if user.is_admin() {
        info!(user_id = user.id, "first registrant granted admin role");
    }
    info!(user_id = user.id, "user registered");
    Ok(user)
}

fn duplicate_email() -> AppError {
    AppError::Conflict(String::from("A user with this email already exists."))
}

/// Checks a login attempt. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn authenticate(
    store: &Store,
    hasher: &CredentialHasher,
    raw_email: &str,
    password: &str,
) -> Result<User, AppError> {
    check_max_len("Email", raw_email, EMAIL_MAX_LENGTH)?;
    check_max_len("Password", password, PASSWORD_MAX_LENGTH)?;
    let email = raw_email.trim().to_lowercase();

    let Some(user) = store
        .read(|tables| tables.user_by_email(&email).cloned())
        .await
    else {
        warn!("login failed: unknown email");
        return Err(AppError::invalid(BAD_CREDENTIALS));
    };

    let verified = {
        let hasher = hasher.clone();
        let password = password.to_owned();
        let digest = user.password_hash.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await?
    };
    if !verified {
        warn!(user_id = user.id, "login failed: wrong password");
        return Err(AppError::invalid(BAD_CREDENTIALS));
    }

    info!(user_id = user.id, "user logged in");
    Ok(user)
}

pub async fn create_campaign(
    store: &Store,
    creator: &User,
    draft: CampaignDraft,
) -> Result<Campaign, AppError> {
    let campaign = store
        .transact(|tables| {
            Ok::<_, AppError>(tables.insert_campaign(
                draft.title,
                draft.description,
                draft.status,
                creator.id,
                Utc::now(),
            ))
        })
        .await?;
    info!(
        campaign_id = campaign.id,
        admin_id = creator.id,
        status = campaign.status.as_str(),
        "campaign created"
    );
    Ok(campaign)
}

/// Any admin may edit any campaign, not only its creator.
pub async fn update_campaign(
    store: &Store,
    editor: &User,
    campaign_id: CampaignId,
    draft: CampaignDraft,
) -> Result<Campaign, AppError> {
    let campaign = store
        .transact(|tables| -> Result<Campaign, AppError> {
            let campaign = tables
                .campaign_mut(campaign_id)
                .ok_or(AppError::NotFound("Campaign not found"))?;
            campaign.title = draft.title;
            campaign.description = draft.description;
            campaign.status = draft.status;
            Ok(campaign.clone())
        })
        .await?;
    info!(
        campaign_id,
        admin_id = editor.id,
        status = campaign.status.as_str(),
        "campaign updated"
    );
    Ok(campaign)
}

pub async fn donate(
    store: &Store,
    donor: &User,
    campaign_id: CampaignId,
    raw_amount: &str,
) -> Result<Donation, AppError> {
    let amount = parse_amount(raw_amount)?;

    let donation = store
        .transact(|tables| -> Result<Donation, AppError> {
            if !tables.campaign(campaign_id).is_some_and(Campaign::is_open) {
                return Err(AppError::invalid(
                    "This campaign is not available for donations.",
                ));
            }
            Ok(tables.insert_donation(donor.id, campaign_id, amount, Utc::now()))
        })
        .await?;
    info!(
        donation_id = donation.id,
        campaign_id,
        user_id = donor.id,
        amount,
        "donation recorded"
    );
    Ok(donation)
}

pub async fn add_comment(
    store: &Store,
    author: &User,
    campaign_id: CampaignId,
    raw_content: &str,
) -> Result<Comment, AppError> {
    let content = parse_comment(raw_content)?;

    let comment = store
        .transact(|tables| -> Result<Comment, AppError> {
            if tables.campaign(campaign_id).is_none() {
                return Err(AppError::NotFound("Campaign not found"));
            }
            Ok(tables.insert_comment(content, author.id, campaign_id, Utc::now()))
        })
        .await?;
    info!(comment_id = comment.id, campaign_id, user_id = author.id, "comment added");
    Ok(comment)
}

pub async fn edit_comment(
    store: &Store,
    editor: &User,
    comment_id: CommentId,
    raw_content: &str,
) -> Result<Comment, AppError> {
    let content = parse_comment(raw_content)?;

    let comment = store
        .transact(|tables| -> Result<Comment, AppError> {
            let comment = tables
                .comment_mut(comment_id)
                .ok_or(AppError::NotFound("Comment not found"))?;
            authorize_comment_change(
                editor,
                comment,
                "You don't have permission to edit this comment",
            )?;
            comment.content = content;
            comment.updated_at = Some(Utc::now());
            Ok(comment.clone())
        })
        .await?;
    info!(comment_id, user_id = editor.id, "comment edited");
    Ok(comment)
}

pub async fn delete_comment(
    store: &Store,
    actor: &User,
    comment_id: CommentId,
) -> Result<Comment, AppError> {
    let comment = store
        .transact(|tables| -> Result<Comment, AppError> {
            let comment = tables
                .comment(comment_id)
                .ok_or(AppError::NotFound("Comment not found"))?;
            authorize_comment_change(
                actor,
                comment,
                "You don't have permission to delete this comment",
            )?;
            tables
                .remove_comment(comment_id)
                .ok_or(AppError::NotFound("Comment not found"))
        })
        .await?;
    info!(comment_id, user_id = actor.id, "comment deleted");
    Ok(comment)
}
