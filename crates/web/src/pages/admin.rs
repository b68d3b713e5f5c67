use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use chrono::Local;
use directory::{
    admin::{AdminDashboard, DeletionRequest},
    auth::{IdentityProvider, Session},
    client::Client,
    database::Database,
    RequestError,
};
use itertools::Itertools;
use model::{detail::PharmacyDetail, pharmacy::PharmacyDraft, stats::PharmacyStats};
use serde::{Deserialize, Serialize};
use utility::{
    id::Id,
    serde::{checkbox, empty_as_none},
};

use super::login::ADMIN_PATH;
use crate::{
    common::RouteResult, middleware::session::require_page_session, templates::Templates,
    WebState,
};

const LOAD_FAILED: &str = "Impossible de charger les pharmacies pour le moment.";
const SAVE_FAILED: &str = "Erreur lors de l'enregistrement";
const DELETE_FAILED: &str = "Erreur lors de la suppression";
const GONE: &str = "Cette pharmacie n'existe pas ou a déjà été supprimée.";

pub(crate) fn routes<D: Database, P: IdentityProvider>(
    state: WebState<D, P>,
) -> Router<WebState<D, P>> {
    Router::new()
        .route("/", get(dashboard::<D, P>))
        .route("/pharmacies", post(create::<D, P>))
        .route("/pharmacies/:id", post(update::<D, P>))
        .route(
            "/pharmacies/:id/delete",
            get(confirm_delete::<D, P>).post(delete::<D, P>),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            require_page_session::<D, P>,
        ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardParams {
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    search: Option<String>,

    /// Opens the form prefilled with this pharmacy.
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    edit: Option<String>,

    /// Opens the empty form.
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    new: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteForm {
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    confirm: bool,
}

#[derive(Serialize)]
struct FormView {
    title: &'static str,
    submit_label: &'static str,
    action: String,
    draft: PharmacyDraft,
    error: Option<String>,
}

impl FormView {
    fn create(draft: PharmacyDraft) -> Self {
        Self {
            title: "Ajouter une pharmacie",
            submit_label: "Enregistrer la pharmacie",
            action: "/admin/pharmacies".to_owned(),
            draft,
            error: None,
        }
    }

    fn edit(id: &str, draft: PharmacyDraft) -> Self {
        Self {
            title: "Modifier la pharmacie",
            submit_label: "Mettre à jour",
            action: format!("/admin/pharmacies/{}", id),
            draft,
            error: None,
        }
    }

    fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

#[derive(Serialize)]
struct RowView {
    #[serde(flatten)]
    detail: PharmacyDetail,
    edit_url: String,
    delete_url: String,
}

#[derive(Serialize)]
struct AdminView<'a> {
    email: Option<&'a str>,
    stats: &'a PharmacyStats,
    search: &'a str,
    rows: Vec<RowView>,
    regions: Vec<&'a str>,
    form: Option<FormView>,
    notice: Option<&'static str>,
}

#[derive(Serialize)]
struct ConfirmDeleteView<'a> {
    name: &'a str,
    action: String,
}

fn render_dashboard<D: Database>(
    templates: &Templates,
    dashboard: &AdminDashboard<D>,
    session: &Session,
    form: Option<FormView>,
    notice: Option<&'static str>,
    status: StatusCode,
) -> RouteResult<Response> {
    let today = Local::now().date_naive();
    let rows = dashboard
        .filtered()
        .into_iter()
        .map(|pharmacy| {
            let id = pharmacy.id.raw();
            RowView {
                edit_url: format!("/admin?edit={}", id),
                delete_url: format!("/admin/pharmacies/{}/delete", id),
                detail: PharmacyDetail::new(pharmacy, today),
            }
        })
        .collect();
    let regions = dashboard
        .pharmacies()
        .iter()
        .map(|pharmacy| pharmacy.content.region.trim())
        .filter(|region| !region.is_empty())
        .sorted()
        .dedup()
        .collect();

    let view = AdminView {
        email: session.user.email.as_deref(),
        stats: dashboard.stats(),
        search: dashboard.search().unwrap_or_default(),
        rows,
        regions,
        form,
        notice,
    };
    let page = templates.render("admin.html", &view)?;
    Ok((status, page).into_response())
}

/// Status and message for a failed mutation.
fn failure(why: &RequestError, message: &'static str) -> (StatusCode, &'static str) {
    match why {
        RequestError::NotFound => (StatusCode::NOT_FOUND, GONE),
        RequestError::Invalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        RequestError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

async fn loaded<D: Database>(client: Client<D>) -> (AdminDashboard<D>, Option<&'static str>) {
    let mut dashboard = AdminDashboard::new(client);
    // failures are logged by the client
    let notice = dashboard.load().await.err().map(|_| LOAD_FAILED);
    (dashboard, notice)
}

/// Renders the dashboard notice for a store that could not be read. Edits and
/// deletions look the pharmacy up in the loaded list, which is empty then.
fn load_failed<D: Database>(
    templates: &Templates,
    dashboard: &AdminDashboard<D>,
    session: &Session,
) -> RouteResult<Response> {
    render_dashboard(
        templates,
        dashboard,
        session,
        None,
        Some(LOAD_FAILED),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

pub(crate) async fn dashboard<D: Database, P: IdentityProvider>(
    State(WebState {
        client, templates, ..
    }): State<WebState<D, P>>,
    Extension(session): Extension<Session>,
    Query(params): Query<DashboardParams>,
) -> RouteResult<Response> {
    let (mut dashboard, notice) = loaded(client).await;
    dashboard.set_search(params.search.as_deref());

    let form = match (params.new, params.edit) {
        (true, _) => Some(FormView::create(dashboard.open_create())),
        (false, Some(id)) => match dashboard.open_edit(&Id::new(id.clone())) {
            Ok(draft) => Some(FormView::edit(&id, draft)),
            Err(_) => None,
        },
        (false, None) => None,
    };
    render_dashboard(&templates, &dashboard, &session, form, notice, StatusCode::OK)
}

pub(crate) async fn create<D: Database, P: IdentityProvider>(
    State(WebState {
        client, templates, ..
    }): State<WebState<D, P>>,
    Extension(session): Extension<Session>,
    Form(draft): Form<PharmacyDraft>,
) -> RouteResult<Response> {
    let (mut dashboard, _) = loaded(client).await;
    dashboard.open_create();
    match dashboard.submit(draft.clone()).await {
        Ok(_) => Ok(Redirect::to(ADMIN_PATH).into_response()),
        Err(why) => {
            let (status, message) = failure(&why, SAVE_FAILED);
            let form = FormView::create(draft).with_error(why.to_string());
            render_dashboard(&templates, &dashboard, &session, Some(form), Some(message), status)
        }
    }
}

pub(crate) async fn update<D: Database, P: IdentityProvider>(
    State(WebState {
        client, templates, ..
    }): State<WebState<D, P>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(draft): Form<PharmacyDraft>,
) -> RouteResult<Response> {
    let (mut dashboard, notice) = loaded(client).await;
    if notice.is_some() {
        return load_failed(&templates, &dashboard, &session);
    }
    let result = match dashboard.open_edit(&Id::new(id.clone())) {
        Ok(_) => dashboard.submit(draft.clone()).await,
        Err(why) => Err(why),
    };
    match result {
        Ok(_) => Ok(Redirect::to(ADMIN_PATH).into_response()),
        Err(why) => {
            let (status, message) = failure(&why, SAVE_FAILED);
            let form = match &why {
                RequestError::NotFound => None,
                _ => Some(FormView::edit(&id, draft).with_error(why.to_string())),
            };
            render_dashboard(&templates, &dashboard, &session, form, Some(message), status)
        }
    }
}

/// First phase of a deletion, asks for confirmation.
pub(crate) async fn confirm_delete<D: Database, P: IdentityProvider>(
    State(WebState {
        client, templates, ..
    }): State<WebState<D, P>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let (dashboard, notice) = loaded(client).await;
    if notice.is_some() {
        return load_failed(&templates, &dashboard, &session);
    }
    match dashboard.request_delete(&Id::new(id)) {
        Ok(DeletionRequest { id, name }) => {
            let view = ConfirmDeleteView {
                name: &name,
                action: format!("/admin/pharmacies/{}/delete", id),
            };
            templates
                .render("confirm_delete.html", &view)
                .map(IntoResponse::into_response)
        }
        Err(why) => {
            let (status, message) = failure(&why, DELETE_FAILED);
            render_dashboard(&templates, &dashboard, &session, None, Some(message), status)
        }
    }
}

/// Second phase of a deletion, only a confirmed form deletes.
pub(crate) async fn delete<D: Database, P: IdentityProvider>(
    State(WebState {
        client, templates, ..
    }): State<WebState<D, P>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> RouteResult<Response> {
    if !form.confirm {
        return Ok(Redirect::to(ADMIN_PATH).into_response());
    }

    let (mut dashboard, notice) = loaded(client).await;
    if notice.is_some() {
        return load_failed(&templates, &dashboard, &session);
    }
    let result = match dashboard.request_delete(&Id::new(id)) {
        Ok(request) => dashboard.confirm_delete(request).await,
        Err(why) => Err(why),
    };
    match result {
        Ok(_) => Ok(Redirect::to(ADMIN_PATH).into_response()),
        Err(why) => {
            let (status, message) = failure(&why, DELETE_FAILED);
            render_dashboard(&templates, &dashboard, &session, None, Some(message), status)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use directory::client::Client;
    use utility::id::Id;

    use crate::testing::{app, database, get, get_signed_in, post_form, send};

    fn rows(body: &str) -> usize {
        body.matches("<tr class=\"row").count()
    }

    const FORM: &str = "name=Pharmacie+Zongo&neighborhood=Zongo&city=Parakou&region=Borgou\
        &phone=%2B229+23+61+00+00&is24h=on&groupName=&startDate=&endDate=";

    #[tokio::test]
    async fn redirects_to_login_without_session() {
        let database = database();
        let app = app(database.clone());

        let (status, headers, _) = send(&app, get("/admin")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/login");

        let (status, _, _) = send(&app, post_form("/admin/pharmacies", FORM, false)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(database.len(), 8);
    }

    #[tokio::test]
    async fn dashboard_shows_stats_and_rows() {
        let app = app(database());

        let (status, _, body) = send(&app, get_signed_in("/admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rows(&body), 8);
        assert!(body.contains("Total Pharmacies"));
        assert!(body.contains("Services 24h/24"));
        assert!(body.contains("<option value=\"Atlantique\">"));

        let (_, _, body) = send(&app, get_signed_in("/admin?search=ou%C3%A9m%C3%A9")).await;
        assert_eq!(rows(&body), 2);
    }

    #[tokio::test]
    async fn create_keeps_the_form_open_on_errors() {
        let database = database();
        let app = app(database.clone());

        let (status, _, body) = send(
            &app,
            post_form("/admin/pharmacies", "name=Pharmacie+Zongo&region=Borgou", true),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("Erreur lors de l&#x27;enregistrement"));
        assert!(body.contains("value=\"Pharmacie Zongo\""));
        assert_eq!(database.len(), 8);

        let (status, headers, _) = send(&app, post_form("/admin/pharmacies", FORM, true)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/admin");
        assert_eq!(database.len(), 9);
    }

    #[tokio::test]
    async fn edit_prefills_and_updates() {
        let database = database();
        let app = app(database.clone());

        let (_, _, body) = send(&app, get_signed_in("/admin?edit=mem-000002")).await;
        assert!(body.contains("Modifier la pharmacie"));
        assert!(body.contains("value=\"Pharmacie Bénin\""));
        assert!(body.contains("value=\"2026-01-03\""));

        let (status, _, _) =
            send(&app, post_form("/admin/pharmacies/mem-000002", FORM, true)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let updated = Client::new(database.clone())
            .get_pharmacy(&Id::new("mem-000002".to_owned()))
            .await
            .unwrap();
        assert_eq!(updated.content.name, "Pharmacie Zongo");
        assert!(updated.content.is_24h);
        assert_eq!(database.len(), 8);

        let (status, _, _) =
            send(&app, post_form("/admin/pharmacies/inconnue", FORM, true)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_asks_for_confirmation_first() {
        let database = database();
        let app = app(database.clone());

        let (status, _, body) =
            send(&app, get_signed_in("/admin/pharmacies/mem-000003/delete")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Êtes-vous sûr de vouloir supprimer cette pharmacie ?"));
        assert!(body.contains("Pharmacie Camp Guézo"));
        assert_eq!(database.len(), 8);

        let (status, _, _) =
            send(&app, post_form("/admin/pharmacies/mem-000003/delete", "", true)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(database.len(), 8);

        let (status, _, _) = send(
            &app,
            post_form("/admin/pharmacies/mem-000003/delete", "confirm=true", true),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(database.len(), 7);

        let (_, _, body) = send(&app, get_signed_in("/admin")).await;
        assert_eq!(rows(&body), 7);
        assert!(!body.contains("Pharmacie Camp Guézo"));
    }

    #[tokio::test]
    async fn store_outages_are_not_reported_as_missing_pharmacies() {
        let database = database();
        let app = app(database.clone());
        database.set_unavailable(true);

        let requests = [
            get_signed_in("/admin/pharmacies/mem-000003/delete"),
            post_form("/admin/pharmacies/mem-000003/delete", "confirm=true", true),
            post_form("/admin/pharmacies/mem-000003", FORM, true),
        ];
        for request in requests {
            let (status, _, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("Impossible de charger les pharmacies pour le moment."));
            assert!(!body.contains("a déjà été supprimée"));
        }

        database.set_unavailable(false);
        assert_eq!(database.len(), 8);
    }
}
