mod args;
mod commands;

use anyhow::Context;
use clap::Parser;

use npi_outreach::{handoff::HandoffStore, http::ApiClient, session::SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = args::Args::parse();

    let session_store = SessionStore::new(&args.state_dir);
    let session = session_store.load()?;
    let client = ApiClient::new(&args.backend_url, session.token().map(str::to_string))
        .context("Failed building HTTP client")?;
    tracing::debug!(backend = client.base_url(), signed_in = session.is_signed_in(), "starting");

    let mut app = commands::App {
        client,
        session,
        session_store,
        handoff: HandoffStore::new(&args.state_dir),
    };

    match args.cmd {
        args::Command::Records(cmd) => commands::records(&app, cmd).await.context("records failed"),
        args::Command::Export(cmd) => commands::export(&app, cmd).await.context("export failed"),
        args::Command::Collect(cmd) => commands::collect(&app, cmd).await.context("collect failed"),
        args::Command::Send(cmd) => commands::send(&app, cmd).await.context("send failed"),
        args::Command::Sessions(cmd) => commands::sessions(&app, cmd).await.context("sessions failed"),
        args::Command::Auth(cmd) => commands::auth(&mut app, cmd).await.context("auth failed"),
        args::Command::GoogleUsers(cmd) => commands::google_users(&app, cmd)
            .await
            .context("google-users failed"),
    }
}
