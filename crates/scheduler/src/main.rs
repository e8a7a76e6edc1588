use std::time::Duration;

use casewatch_common::config::AppConfig;
use casewatch_engine::{FileStateStore, Pipeline, Renderer};
use casewatch_notifier::SendGridMailer;
use casewatch_scheduler::scheduler::Scheduler;
use casewatch_tracker::TrackerClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "casewatch=info,casewatch_scheduler=info,casewatch_engine=info,\
                 casewatch_tracker=info,casewatch_notifier=info,casewatch_common=info"
                    .into()
            }),
        )
        .json()
        .init();

    tracing::info!("CaseWatch starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let timeout = config.request_timeout_secs.map(Duration::from_secs);

    let tracker = TrackerClient::new(config.page_size, timeout)?;

    let mut mail_client = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        mail_client = mail_client.timeout(timeout);
    }
    let mailer = SendGridMailer::new(
        mail_client.build()?,
        config.sendgrid_api_key.clone(),
        config.sender_email.clone(),
    );

    let renderer = match &config.template_path {
        Some(path) => Renderer::from_template_file(path, config.locale.clone())?,
        None => Renderer::new(config.locale.clone())?,
    };

    let store = FileStateStore::new(config.state_dir.clone());
    tracing::info!(state_dir = %store.dir().display(), "Using file state store");

    let pipeline = Pipeline::new(
        Box::new(tracker),
        Box::new(store),
        Box::new(mailer),
        renderer,
        config.email_subject.clone(),
    );
    let scheduler = Scheduler::new(pipeline, config.user_profiles, config.schedule_time_mins);

    // Run until Ctrl+C; an in-flight cycle is abandoned at its next await point
    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("CaseWatch stopped.");
    Ok(())
}
