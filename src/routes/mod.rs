mod admin;
mod auth;
mod form;
mod landing;
mod pages;
mod payments;
mod reviewer;
mod submissions;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::visits;

pub use form::MultipartForm;

/// Large enough for the 50 MiB hero background video.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let landing_page = Router::new()
        .route("/", get(pages::landing))
        .route_layer(middleware::from_fn_with_state(state.clone(), visits::track_visit));

    let public = Router::new()
        .route("/health", get(pages::health))
        .route("/api/landing-settings", get(pages::landing_settings))
        .route("/api/submission-status", get(pages::submission_status))
        .route("/download/resource/:index", get(pages::download_resource));

    let account = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me));

    let participant = Router::new()
        .route("/api/dashboard", get(submissions::dashboard))
        .route("/api/submissions", get(submissions::index).post(submissions::store))
        .route("/api/submissions/:id", get(submissions::show).post(submissions::update))
        .route(
            "/api/submissions/:id/request-deletion",
            post(submissions::request_deletion),
        )
        .route("/api/payments", get(payments::index).post(payments::store))
        .route("/api/payments/:id", delete(payments::destroy));

    let reviewer = Router::new()
        .route("/api/reviewer/dashboard", get(reviewer::dashboard))
        .route("/api/reviewer/reviews", get(reviewer::reviews))
        .route("/api/reviewer/reviews/:id", post(reviewer::submit_review))
        .route("/api/reviewer/submissions/:id", get(reviewer::show_submission));

    let admin = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/submissions", get(admin::submissions))
        .route("/submissions/export", get(admin::export_submissions))
        .route("/submissions/bulk-status", post(admin::bulk_update_status))
        .route("/submissions/:id", delete(admin::delete_submission))
        .route("/submissions/:id/status", put(admin::update_status))
        .route("/submissions/:id/reviewers", post(admin::assign_reviewers))
        .route(
            "/submissions/:id/reviewers/:reviewer_id",
            delete(admin::remove_reviewer),
        )
        .route("/payments", get(admin::payments))
        .route("/payments/:id/verify", post(admin::verify_payment))
        .route("/payments/:id/reject", post(admin::reject_payment))
        .route("/users", get(admin::users).post(admin::create_user))
        .route("/users/:id", delete(admin::delete_user))
        .route("/users/:id/role", put(admin::update_role))
        .route("/users/:id/password", put(admin::update_password))
        .route("/users/:id/verification", put(admin::toggle_verification))
        .route(
            "/submission-settings",
            get(admin::submission_settings).put(admin::update_submission_settings),
        )
        .route("/email-settings", get(admin::email_settings).put(admin::save_email_settings))
        .route("/email-settings/test", post(admin::test_email))
        .route("/settings", get(landing::index).post(landing::store))
        .route("/settings/:key", put(landing::update).delete(landing::destroy))
        .route("/settings/upload-speaker-photo", post(landing::upload_speaker_photo))
        .route("/settings/upload-sponsor-logo", post(landing::upload_sponsor_logo))
        .route("/settings/upload-resource-file", post(landing::upload_resource_file))
        .route("/settings/upload-hero-background", post(landing::upload_hero_background))
        .route("/settings/upload-hero-logo", post(landing::upload_hero_logo))
        .route(
            "/settings/upload-hero-logo-secondary",
            post(landing::upload_hero_logo_secondary),
        )
        .route(
            "/settings/delete-hero-logo-secondary",
            post(landing::delete_hero_logo_secondary),
        )
        .route("/settings/save-timeline", post(landing::save_timeline))
        .route("/settings/save-resources", post(landing::save_resources))
        .route("/settings/save-hero-text", post(landing::save_hero_text));

    let storage = ServeDir::new(state.config.storage_folder.clone());

    Router::new()
        .merge(landing_page)
        .merge(public)
        .merge(account)
        .merge(participant)
        .merge(reviewer)
        .nest("/api/admin", admin)
        .nest_service("/storage", storage)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
