//! Profile route handlers.
//!
//! Anyone signed in may view any profile. Edits always target the signed-in
//! user's own record, so a crafted request cannot reach someone else's.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use satchel_core::{Email, Employee, ReflectionId};

use super::LayoutView;
use super::home::image_src;
use crate::db::RepositoryError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{HxRequest, RequireAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// New reflection form data.
#[derive(Debug, Deserialize)]
pub struct NewReflectionForm {
    #[serde(rename = "new-reflection-name")]
    pub name: String,
    #[serde(rename = "new-reflection-value", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PositionForm {
    #[serde(default)]
    pub position: String,
}

#[derive(Debug, Deserialize)]
pub struct BioForm {
    #[serde(default)]
    pub bio: String,
}

// =============================================================================
// View Types
// =============================================================================

/// Reflection as shown on a profile card.
#[derive(Debug, Clone)]
pub struct ReflectionView {
    pub id: String,
    pub key: String,
    pub value: String,
}

/// Profile data for templates.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub position: String,
    pub bio: String,
    pub image_src: Option<String>,
    pub reflections: Vec<ReflectionView>,
    pub is_editable: bool,
}

impl ProfileView {
    /// Build the view of `employee` as seen by `viewer`.
    #[must_use]
    pub fn new(employee: &Employee, viewer: &CurrentUser) -> Self {
        Self {
            name: employee.name.clone(),
            email: employee.email.to_string(),
            position: employee.position.clone(),
            bio: employee.bio.clone(),
            image_src: image_src(&employee.image_name),
            reflections: employee
                .reflections
                .iter()
                .filter_map(|r| {
                    r.id.map(|id| ReflectionView {
                        id: id.to_string(),
                        key: r.key.clone(),
                        value: r.value.clone(),
                    })
                })
                .collect(),
            is_editable: viewer.can_edit(employee),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Full profile page.
#[derive(Template, WebTemplate)]
#[template(path = "employee/show.html")]
pub struct EmployeeTemplate {
    pub layout: LayoutView,
    pub profile: ProfileView,
}

/// Profile card alone, swapped in after an edit.
#[derive(Template, WebTemplate)]
#[template(path = "employee/_profile.html")]
pub struct ProfileFragment {
    pub profile: ProfileView,
}

impl ProfileFragment {
    /// Render `employee` after one of `user`'s edits.
    fn edited(user: &CurrentUser, employee: &Employee) -> Result<Self, AppError> {
        user.authorize_edit(employee)?;
        Ok(Self {
            profile: ProfileView::new(employee, user),
        })
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Display a profile.
///
/// # Route
///
/// `GET /employee/{email}`
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    HxRequest(is_htmx): HxRequest,
    Path(email): Path<String>,
) -> Result<EmployeeTemplate, AppError> {
    let email = Email::parse(&email).map_err(|_| AppError::NotFound)?;

    let employee = match state.directory().get_employee_by_email(&email).await {
        Ok(employee) => employee,
        Err(RepositoryError::NotFound) => return Err(AppError::NotFound),
        Err(e) => {
            return Err(AppError::Retrieval(format!(
                "Error retrieving employee: {e}"
            )));
        }
    };

    Ok(EmployeeTemplate {
        layout: LayoutView::new(&state, Some(&user), is_htmx),
        profile: ProfileView::new(&employee, &user),
    })
}

/// Add a reflection to the signed-in user's profile.
///
/// # Route
///
/// `POST /reflection`
#[instrument(skip(state, user, form), fields(email = %user.email))]
pub async fn add_reflection(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<NewReflectionForm>,
) -> Result<ProfileFragment, AppError> {
    let key = form.name.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("reflection name is required".to_owned()));
    }

    let directory = state.directory();
    directory
        .add_reflection(&user.email, key, form.value.trim())
        .await?;
    let employee = directory.get_employee_by_email(&user.email).await?;

    ProfileFragment::edited(&user, &employee)
}

/// Remove one of the signed-in user's reflections.
///
/// # Route
///
/// `DELETE /reflection/{id}`
#[instrument(skip(state, user), fields(email = %user.email))]
pub async fn delete_reflection(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<ProfileFragment, AppError> {
    let raw: u64 = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid reflection id: {id}")))?;
    // Ids past i64::MAX cannot exist in storage.
    let id = ReflectionId::try_from(raw).map_err(|_| RepositoryError::ReflectionNotFound)?;

    let directory = state.directory();
    directory.delete_reflection(&user.email, id).await?;
    let employee = directory.get_employee_by_email(&user.email).await?;

    ProfileFragment::edited(&user, &employee)
}

/// Update the signed-in user's position.
///
/// # Route
///
/// `POST /profile/position`
#[instrument(skip(state, user, form), fields(email = %user.email))]
pub async fn save_position(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PositionForm>,
) -> Result<ProfileFragment, AppError> {
    let employee = state
        .directory()
        .save_position(&user.email, form.position.trim())
        .await?;

    ProfileFragment::edited(&user, &employee)
}

/// Update the signed-in user's bio.
///
/// # Route
///
/// `POST /profile/bio`
#[instrument(skip(state, user, form), fields(email = %user.email))]
pub async fn save_bio(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<BioForm>,
) -> Result<ProfileFragment, AppError> {
    let employee = state
        .directory()
        .save_bio(&user.email, form.bio.trim())
        .await?;

    ProfileFragment::edited(&user, &employee)
}
