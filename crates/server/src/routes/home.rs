//! Roster page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use satchel_core::Employee;

use super::LayoutView;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{HxRequest, OptionalAuth};
use crate::state::AppState;

/// One roster card.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub name: String,
    pub position: String,
    pub image_src: Option<String>,
    pub profile_path: String,
}

impl From<&Employee> for RosterEntry {
    fn from(employee: &Employee) -> Self {
        Self {
            name: employee.name.clone(),
            position: employee.position.clone(),
            image_src: image_src(&employee.image_name),
            profile_path: format!("/employee/{}", urlencoding::encode(employee.email.as_str())),
        }
    }
}

/// Image references that are absolute URLs are shown; anything else falls
/// back to initials.
pub(crate) fn image_src(image_name: &str) -> Option<String> {
    (image_name.starts_with("https://") || image_name.starts_with("http://"))
        .then(|| image_name.to_owned())
}

/// Roster page template.
#[derive(Template, WebTemplate)]
#[template(path = "roster.html")]
pub struct RosterTemplate {
    pub layout: LayoutView,
    pub employees: Vec<RosterEntry>,
}

/// Display the roster.
///
/// # Route
///
/// `GET /`
#[instrument(skip_all)]
pub async fn roster(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    HxRequest(is_htmx): HxRequest,
) -> Result<RosterTemplate, AppError> {
    let employees = state
        .directory()
        .get_employees()
        .await
        .map_err(|e| AppError::Retrieval(format!("Error retrieving employees: {e}")))?;

    Ok(RosterTemplate {
        layout: LayoutView::new(&state, user.as_ref(), is_htmx),
        employees: employees.iter().map(RosterEntry::from).collect(),
    })
}
