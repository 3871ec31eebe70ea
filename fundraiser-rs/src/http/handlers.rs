use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tracing::debug;

use crate::browse;
use crate::identity::Viewer;
use crate::models::{CampaignId, CommentId};
use crate::mutations::{self, CampaignDraft};

use super::error::ApiError;
use super::guard::{AdminUser, CurrentUser};
use super::responses::{
    CampaignDetailResponse, CampaignForm, CampaignListResponse, CampaignSummary, CommentForm,
    CommentView, CredentialsForm, DonateForm, DonationListResponse, FormPage, HealthResponse,
};
use super::session::Session;
use super::state::AppState;

const REGISTER_FORM: &str = "register";
const LOGIN_FORM: &str = "login";
const NEW_CAMPAIGN_FORM: &str = "new_campaign";
const EDIT_CAMPAIGN_FORM: &str = "edit_campaign";
const EDIT_COMMENT_FORM: &str = "edit_comment";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        .route("/campaigns/{id}", get(campaign_detail))
        .route("/campaigns/{id}/donate", post(donate))
        .route("/campaigns/{id}/comments", post(create_comment))
        .route("/me/donations", get(my_donations))
        .route(
            "/comments/{id}/edit",
            get(edit_comment_form).post(update_comment),
        )
        .route("/comments/{id}/delete", post(delete_comment))
        .route("/admin/campaigns", get(admin_campaigns).post(create_campaign))
        .route("/admin/campaigns/new", get(new_campaign_form))
        .route(
            "/admin/campaigns/{id}/edit",
            get(edit_campaign_form).post(update_campaign),
        )
        // Later layers wrap earlier ones: the id is set before it is propagated.
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(tower_http::request_id::SetRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
            tower_http::request_id::MakeRequestUuid::default(),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let counts = browse::counts(&state.store).await;
    Json(HealthResponse {
        status: "ok",
        users: counts.users,
        campaigns: counts.campaigns,
    })
}

fn blank_form(viewer: &Viewer, form: &'static str) -> Json<FormPage<()>> {
    Json(FormPage {
        viewer: viewer.into(),
        form,
        values: None,
    })
}

async fn register_form(viewer: Viewer) -> Json<FormPage<()>> {
    blank_form(&viewer, REGISTER_FORM)
}

async fn login_form(viewer: Viewer) -> Json<FormPage<()>> {
    blank_form(&viewer, LOGIN_FORM)
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<(Session, Redirect), ApiError> {
    let user = mutations::register(&state.store, &state.hasher, &form.email, &form.password)
        .await
        .map_err(ApiError::form(REGISTER_FORM))?;
    Ok((session.sign_in(user.id), Redirect::to("/")))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<(Session, Redirect), ApiError> {
    let user = mutations::authenticate(&state.store, &state.hasher, &form.email, &form.password)
        .await
        .map_err(ApiError::form(LOGIN_FORM))?;
    Ok((session.sign_in(user.id), Redirect::to("/")))
}

async fn logout(session: Session) -> (Session, Redirect) {
    (session.clear(), Redirect::to("/"))
}

async fn index(State(state): State<AppState>, viewer: Viewer) -> Json<CampaignListResponse> {
    let campaigns = browse::list_campaigns(&state.store, &viewer).await;
    debug!(campaigns = campaigns.len(), admin = viewer.is_admin(), "campaign list requested");
    Json(CampaignListResponse {
        viewer: (&viewer).into(),
        campaigns: campaigns.into_iter().map(CampaignSummary::from).collect(),
    })
}

async fn campaign_detail(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    viewer: Viewer,
) -> Result<Json<CampaignDetailResponse>, ApiError> {
    let page = browse::campaign_page(&state.store, &viewer, id).await?;
    Ok(Json(CampaignDetailResponse::new(&viewer, page)))
}

async fn donate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CampaignId>,
    Form(form): Form<DonateForm>,
) -> Result<Redirect, ApiError> {
    mutations::donate(&state.store, &user, id, &form.amount).await?;
    Ok(Redirect::to(&format!("/campaigns/{id}")))
}

async fn my_donations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<DonationListResponse> {
    let donations = browse::donations_of(&state.store, &user).await;
    Json(DonationListResponse {
        viewer: (&Viewer::Authenticated(user)).into(),
        donations: donations.into_iter().map(Into::into).collect(),
    })
}

async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CampaignId>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, ApiError> {
    mutations::add_comment(&state.store, &user, id, &form.content).await?;
    Ok(Redirect::to(&format!("/campaigns/{id}")))
}

async fn edit_comment_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
) -> Result<Json<FormPage<CommentView>>, ApiError> {
    let comment = browse::comment_for_edit(&state.store, &user, id).await?;
    let author_email = (comment.user_id == user.id).then(|| user.email.clone());
    Ok(Json(FormPage {
        form: EDIT_COMMENT_FORM,
        values: Some(CommentView::new(comment, author_email, true)),
        viewer: (&Viewer::Authenticated(user)).into(),
    }))
}

async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, ApiError> {
    let comment = mutations::edit_comment(&state.store, &user, id, &form.content).await?;
    Ok(Redirect::to(&format!("/campaigns/{}", comment.campaign_id)))
}

async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
) -> Result<Redirect, ApiError> {
    let comment = mutations::delete_comment(&state.store, &user, id).await?;
    Ok(Redirect::to(&format!("/campaigns/{}", comment.campaign_id)))
}

async fn admin_campaigns(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Json<CampaignListResponse> {
    let campaigns = browse::all_campaigns(&state.store).await;
    Json(CampaignListResponse {
        viewer: (&Viewer::Authenticated(admin)).into(),
        campaigns: campaigns.into_iter().map(CampaignSummary::from).collect(),
    })
}

async fn new_campaign_form(AdminUser(admin): AdminUser) -> Json<FormPage<()>> {
    blank_form(&Viewer::Authenticated(admin), NEW_CAMPAIGN_FORM)
}

async fn create_campaign(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<CampaignForm>,
) -> Result<Redirect, ApiError> {
    let draft = CampaignDraft::parse(&form.title, &form.description, form.status.as_deref())
        .map_err(ApiError::form(NEW_CAMPAIGN_FORM))?;
    mutations::create_campaign(&state.store, &admin, draft).await?;
    Ok(Redirect::to("/admin/campaigns"))
}

async fn edit_campaign_form(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<CampaignId>,
) -> Result<Json<FormPage<CampaignSummary>>, ApiError> {
    let campaign = browse::campaign_for_edit(&state.store, id).await?;
    Ok(Json(FormPage {
        viewer: (&Viewer::Authenticated(admin)).into(),
        form: EDIT_CAMPAIGN_FORM,
        values: Some(campaign.into()),
    }))
}

async fn update_campaign(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<CampaignId>,
    Form(form): Form<CampaignForm>,
) -> Result<Redirect, ApiError> {
    let draft = CampaignDraft::parse(&form.title, &form.description, form.status.as_deref())
        .map_err(ApiError::form(EDIT_CAMPAIGN_FORM))?;
    mutations::update_campaign(&state.store, &admin, id, draft).await?;
    Ok(Redirect::to("/admin/campaigns"))
}
