//! Per-profile tracking pipeline.
//!
//! For each profile:
//! 1. Authenticate and resolve the first application on the account
//! 2. Fetch its status and compare against the stored snapshot
//! 3. On change: render, persist, then email
//!
//! Rendering happens before the snapshot is written so a template failure
//! leaves the old snapshot in place and the change is picked up next cycle.
//! A failed send does not roll the snapshot back.

use tracing::Instrument;
use uuid::Uuid;

use casewatch_common::error::AppError;
use casewatch_common::types::{OutgoingEmail, Profile, StateKey};
use casewatch_notifier::Mailer;
use casewatch_tracker::StatusSource;

use crate::detector::{describe_changes, has_changed};
use crate::render::Renderer;
use crate::store::StateStore;

/// How one profile's run ended when nothing went wrong upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// `lastUpdatedTime` matched the stored snapshot.
    Unchanged { application_number: String },
    /// Change detected, snapshot written, email accepted by the provider.
    Notified { application_number: String },
    /// Change detected and snapshot written, but the email was not delivered.
    DeliveryFailed { application_number: String },
}

/// Tally of one cycle over all profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub profiles: usize,
    pub unchanged: usize,
    pub notified: usize,
    pub delivery_failed: usize,
    /// Profiles with no applications on the account.
    pub skipped: usize,
    pub failed: usize,
}

/// The tracking pipeline with its upstream, storage and delivery seams.
pub struct Pipeline {
    source: Box<dyn StatusSource>,
    store: Box<dyn StateStore>,
    mailer: Box<dyn Mailer>,
    renderer: Renderer,
    subject: String,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn StatusSource>,
        store: Box<dyn StateStore>,
        mailer: Box<dyn Mailer>,
        renderer: Renderer,
        subject: String,
    ) -> Self {
        Self {
            source,
            store,
            mailer,
            renderer,
            subject,
        }
    }

    /// Run every profile once, sequentially. Failures are logged and counted
    /// per profile; none of them stop the cycle.
    pub async fn run_cycle(&self, profiles: &[Profile]) -> CycleSummary {
        let span = tracing::info_span!("cycle", cycle_id = %Uuid::new_v4());

        async {
            tracing::info!(profiles = profiles.len(), "Cycle started");
            let mut summary = CycleSummary {
                profiles: profiles.len(),
                ..Default::default()
            };

            for profile in profiles {
                match self.run_profile(profile).await {
                    Ok(ProfileOutcome::Unchanged { application_number }) => {
                        tracing::info!(
                            username = %profile.username,
                            app_number = %application_number,
                            "No changes"
                        );
                        summary.unchanged += 1;
                    }
                    Ok(ProfileOutcome::Notified { .. }) => summary.notified += 1,
                    Ok(ProfileOutcome::DeliveryFailed { .. }) => summary.delivery_failed += 1,
                    Err(e) if e.is_benign() => {
                        tracing::warn!(username = %profile.username, "{}", e);
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            username = %profile.username,
                            error = %e,
                            "Profile check failed"
                        );
                        summary.failed += 1;
                    }
                }
            }

            tracing::info!(
                unchanged = summary.unchanged,
                notified = summary.notified,
                delivery_failed = summary.delivery_failed,
                skipped = summary.skipped,
                failed = summary.failed,
                "Cycle finished"
            );
            summary
        }
        .instrument(span)
        .await
    }

    /// Run the full pipeline for one profile.
    pub async fn run_profile(&self, profile: &Profile) -> Result<ProfileOutcome, AppError> {
        let token = self
            .source
            .authenticate(&profile.username, &profile.password)
            .await?;

        let application_number = self
            .source
            .application_numbers(&token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NoApplicationsFound(profile.username.clone()))?;

        let current = self
            .source
            .application_status(&token, &application_number)
            .await?;

        let key = StateKey::new(profile.username.as_str(), application_number.as_str());
        let previous = self.store.load(&key).await?;

        if !has_changed(&current, previous.as_ref()) {
            return Ok(ProfileOutcome::Unchanged { application_number });
        }

        tracing::info!(
            username = %profile.username,
            app_number = %application_number,
            last_updated_time = current.last_updated_time,
            first_sighting = previous.is_none(),
            "Application status changed"
        );

        let changes = describe_changes(&current, previous.as_ref())?;
        let html_body = self
            .renderer
            .render(&current, previous.as_ref(), &changes)
            .map_err(|e| annotate(e, &application_number))?;

        self.store.save(&key, &current).await?;

        let email = OutgoingEmail {
            to: profile.receiver_email.clone(),
            subject: self.subject.clone(),
            html_body,
        };

        match self.mailer.send(&email).await {
            Ok(()) => Ok(ProfileOutcome::Notified { application_number }),
            Err(e) => {
                tracing::error!(
                    username = %profile.username,
                    app_number = %application_number,
                    error = %e,
                    "Notification not delivered; the change will not be re-sent"
                );
                Ok(ProfileOutcome::DeliveryFailed { application_number })
            }
        }
    }
}

fn annotate(e: AppError, application_number: &str) -> AppError {
    match e {
        AppError::Render(msg) => {
            AppError::Render(format!("application {}: {}", application_number, msg))
        }
        other => other,
    }
}
