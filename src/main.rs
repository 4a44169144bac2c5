mod app;
mod auth;
mod billing;
mod budget;
mod clients;
mod company_profile;
mod config;
mod cost_items;
mod counts;
mod dropdowns;
mod employee_details;
mod employees;
mod gateway;
mod issue_resolutions;
mod issues;
mod login;
mod mailer;
mod milestones;
mod permissions;
mod portfolio;
mod profile;
mod projects;
mod reports;
mod resource_allocation;
mod response;
mod state;
mod tasks;
mod time_entries;
mod user_management;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "pm_gateway=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    let app = app::build_app(state);
    app::serve(app).await
}
