use anyhow::Result;
use askama::Template;
use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};

mod activity;
mod auth;
mod config;
mod error;
mod facebook;
mod feed;
mod pending;
mod types;

use crate::{
    config::{ClientCredentials, Config},
    error::AppError,
    facebook::{FacebookApi, HttpFetch, ReqwestFetch},
    feed::NewsFeed,
    pending::PendingAuthorizations,
    types::*,
};

#[derive(Parser)]
#[command(name = "facebook-atom")]
#[command(about = "Private Atom feeds for your Facebook news feed")]
struct Args {
    #[arg(long, env = "FACEBOOK_APP_ID")]
    client_id: String,

    #[arg(long, env = "FACEBOOK_APP_SECRET", hide_env_values = true)]
    client_secret: String,

    #[arg(long, env = "SCHEME", default_value = "https")]
    scheme: String,

    /// Public host (and port, if not the default) feed URLs are built on
    #[arg(long, env = "HOST")]
    host: String,

    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    #[arg(long, env = "DEBUG")]
    debug: bool,

    #[arg(
        long,
        env = "FACEBOOK_AUTH_URL",
        default_value = "https://www.facebook.com/dialog/oauth/"
    )]
    auth_url: String,

    #[arg(
        long,
        env = "FACEBOOK_GRAPH_URL",
        default_value = "https://graph.facebook.com/"
    )]
    graph_url: String,

    /// How long a user has to finish the Facebook dialog
    #[arg(long, env = "STATE_TTL_SECS", default_value = "600")]
    state_ttl_secs: u64,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            credentials: ClientCredentials {
                client_id: self.client_id,
                client_secret: self.client_secret,
            },
            scheme: self.scheme,
            host: self.host,
            debug: self.debug,
            auth_url: self.auth_url,
            graph_url: self.graph_url,
            state_ttl: Duration::from_secs(self.state_ttl_secs),
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    facebook: FacebookApi,
    pending: PendingAuthorizations,
}

impl AppState {
    fn new(config: Config, http: Arc<dyn HttpFetch>) -> Self {
        let config = Arc::new(config);
        Self {
            facebook: FacebookApi::new(Arc::clone(&config), http),
            pending: PendingAuthorizations::new(config.state_ttl),
            config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let port = args.port;
    let config = args.into_config();
    info!(
        "Serving feeds for {}{}",
        config.host_url(),
        if config.debug { " (debug)" } else { "" }
    );

    let state = AppState::new(config, Arc::new(ReqwestFetch::new()?));
    let app = app(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate", post(generate))
        .route("/got_auth_code", get(got_auth_code))
        .route("/atom", get(atom))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            error::show_details,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate;

#[derive(Template)]
#[template(path = "generated.html")]
struct GeneratedTemplate {
    atom_url: String,
}

async fn root() -> Result<Html<String>, AppError> {
    Ok(Html(IndexTemplate.render()?))
}

/// Starts generating a feed URL by sending the user to the Facebook dialog.
async fn generate(State(state): State<AppState>) -> Result<Response, AppError> {
    info!("Generating a new feed. Asking Facebook for an auth code.");
    let url = auth::begin_authorization(&state.config, &state.facebook, &state.pending).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}

async fn got_auth_code(
    State(state): State<AppState>,
    params: Result<Query<AuthCallbackParams>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let Query(params) = params?;
    let atom_url =
        auth::complete_authorization(&state.config, &state.facebook, &state.pending, params)
            .await?;
    Ok(Html(GeneratedTemplate { atom_url }.render()?))
}

/// Proxies the user's news feed as Atom. The token travels in every request.
async fn atom(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    params: Result<Query<AtomParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let access_token = params
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingParameter("access_token"))?;

    let profile = state.facebook.fetch_home(&access_token).await?;
    let feed = NewsFeed::from_profile(&profile);
    info!(
        "Rendering feed for {} with {} items",
        feed.actor.name().unwrap_or("unknown user"),
        feed.items.len()
    );

    let request_url = state.config.request_url(
        headers.get(header::HOST).and_then(|h| h.to_str().ok()),
        uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/atom"),
    );
    let body = feed.render_atom(&state.config.host_url(), &request_url)?;

    Ok(([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response())
}
