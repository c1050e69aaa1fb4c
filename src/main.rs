// Entrypoint for the CLI application.
// - Sets up logging, loads configuration and any saved session, then hands
//   the API client to the UI loop.

use notebook_uploader::{api::ApiClient, config::Config, config::Session, ui::main_menu};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook_uploader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    info!(base_url = %config.base_url, term = %config.term, course = %config.course, "configuration loaded");

    // Environment wins over a session saved by a previous run.
    let session = config.session().or_else(|| match Session::load(&Session::default_path()) {
        Ok(session) => Some(session),
        Err(e) => {
            debug!("no saved session: {:#}", e);
            None
        }
    });

    let api = ApiClient::from_config(&config, session.as_ref())?;

    main_menu(api, session)?;
    Ok(())
}
