use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{
    billing, budget, clients, company_profile, cost_items, counts, dropdowns, employee_details,
    employees, issue_resolutions, issues, login, milestones, permissions, portfolio, profile,
    projects, reports, resource_allocation, tasks, time_entries, user_management,
};

/// One nest per resource group, matching the paths the front end calls.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .nest("/Billing", billing::router())
                .nest("/Budget", budget::router())
                .nest("/Client", clients::router())
                .nest("/CompanyProfile", company_profile::router())
                .nest("/CostItem", cost_items::router())
                .nest("/Counts", counts::router())
                .nest("/Dropdowns", dropdowns::router())
                .nest("/EmployeeDetails", employee_details::router())
                .nest("/Employees", employees::router())
                .nest("/IssueResolutions", issue_resolutions::router())
                .nest("/Issues", issues::router())
                .nest("/Login", login::router())
                .nest("/Milestone", milestones::router())
                .nest("/Permissions", permissions::router())
                .nest("/Portfolio", portfolio::router())
                .nest("/Profile", profile::router())
                .nest("/Projects", projects::router())
                .nest("/Reports", reports::router())
                .nest("/ResourceAllocation", resource_allocation::router())
                .nest("/Task", tasks::router())
                .nest("/TimeEntries", time_entries::router())
                .nest("/UserManagement", user_management::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// An empty origin list keeps the permissive dev posture; otherwise only the
/// configured origins are allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The fake state's lazy pool needs a Tokio context to construct
    #[tokio::test]
    async fn router_builds_with_all_resource_groups() {
        let _app = build_app(AppState::fake());
    }

    #[test]
    fn configured_origins_drop_the_permissive_layer() {
        // Parseable vs unparseable origins must not panic either way
        let _restricted = cors_layer(&["http://localhost:3000".to_string()]);
        let _permissive = cors_layer(&[]);
    }
}
