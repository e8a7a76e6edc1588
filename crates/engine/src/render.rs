//! HTML notification rendering.
//!
//! The views here are plain serializable rows fed into a Tera template. The
//! built-in template lives in `templates/notification.html`; a deployment can
//! point `template_path` at its own file using the same variables.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::Path;

use chrono::{Local, TimeZone};
use serde::Serialize;
use tera::{Context, Tera};

use casewatch_common::error::AppError;
use casewatch_common::types::{LocalizedText, StatusRecord};

/// Previous status shown for an activity that did not exist before.
pub const NOT_AVAILABLE: &str = "N/A";

const TEMPLATE_NAME: &str = "notification.html";
const DEFAULT_TEMPLATE: &str = include_str!("../templates/notification.html");
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub activity: String,
    pub previous_status: String,
    pub current_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub time: String,
    pub title: String,
    pub details: String,
    pub is_new: bool,
}

/// Everything the template sees.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub application_number: String,
    pub status: String,
    pub last_updated_time: String,
    pub changes: Vec<String>,
    pub activities: Vec<ActivityRow>,
    pub history: Vec<HistoryRow>,
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in `tz`.
pub fn format_millis<Tz>(millis: i64, tz: &Tz) -> Result<String, AppError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .ok_or_else(|| AppError::Render(format!("timestamp {} is out of range", millis)))
}

pub fn format_local_millis(millis: i64) -> Result<String, AppError> {
    format_millis(millis, &Local)
}

/// Pair every current activity with its previous status, matched by name.
pub fn activities_view(current: &StatusRecord, previous: Option<&StatusRecord>) -> Vec<ActivityRow> {
    let before: HashMap<&str, &str> = previous
        .map(|p| {
            p.activities
                .iter()
                .map(|a| (a.activity.as_str(), a.status.as_str()))
                .collect()
        })
        .unwrap_or_default();

    current
        .activities
        .iter()
        .map(|a| ActivityRow {
            activity: a.activity.clone(),
            previous_status: before
                .get(a.activity.as_str())
                .copied()
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            current_status: a.status.clone(),
        })
        .collect()
}

/// History rows in upstream order, flagging events whose timestamp is unseen.
///
/// Events are keyed by `time` alone: two distinct events sharing a timestamp
/// are treated as the same event.
pub fn history_view<Tz>(
    current: &StatusRecord,
    previous: Option<&StatusRecord>,
    locale: &str,
    tz: &Tz,
) -> Result<Vec<HistoryRow>, AppError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let seen: HashSet<i64> = previous
        .map(|p| p.history.iter().map(|h| h.time).collect())
        .unwrap_or_default();

    current
        .history
        .iter()
        .map(|event| {
            Ok(HistoryRow {
                time: format_millis(event.time, tz)?,
                title: localized(&event.title, locale, "title", event.time)?,
                details: localized(&event.text, locale, "text", event.time)?,
                is_new: !seen.contains(&event.time),
            })
        })
        .collect()
}

fn localized(text: &LocalizedText, locale: &str, field: &str, time: i64) -> Result<String, AppError> {
    text.get(locale).cloned().ok_or_else(|| {
        AppError::Render(format!(
            "history event at {} has no '{}' {}",
            time, locale, field
        ))
    })
}

/// Tera-backed renderer holding the compiled notification template.
pub struct Renderer {
    tera: Tera,
    locale: String,
}

impl Renderer {
    /// Renderer using the built-in template.
    pub fn new(locale: impl Into<String>) -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, DEFAULT_TEMPLATE)
            .map_err(render_error)?;
        Ok(Self {
            tera,
            locale: locale.into(),
        })
    }

    /// Renderer using a template file from disk.
    pub fn from_template_file(path: &Path, locale: impl Into<String>) -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_template_file(path, Some(TEMPLATE_NAME))
            .map_err(render_error)?;
        tracing::info!(path = %path.display(), "Loaded notification template");
        Ok(Self {
            tera,
            locale: locale.into(),
        })
    }

    /// Build the template view with local-time formatting.
    pub fn view(
        &self,
        current: &StatusRecord,
        previous: Option<&StatusRecord>,
        changes: &[String],
    ) -> Result<NotificationView, AppError> {
        Ok(NotificationView {
            application_number: current.application_number.clone(),
            status: current.status.clone(),
            last_updated_time: format_local_millis(current.last_updated_time)?,
            changes: changes.to_vec(),
            activities: activities_view(current, previous),
            history: history_view(current, previous, &self.locale, &Local)?,
        })
    }

    pub fn render_view(&self, view: &NotificationView) -> Result<String, AppError> {
        let context = Context::from_serialize(view).map_err(render_error)?;
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(render_error)
    }

    /// Render the full HTML document for one detected change.
    pub fn render(
        &self,
        current: &StatusRecord,
        previous: Option<&StatusRecord>,
        changes: &[String],
    ) -> Result<String, AppError> {
        let view = self.view(current, previous, changes)?;
        self.render_view(&view)
    }
}

/// Tera nests the useful message in the source chain.
fn render_error(e: tera::Error) -> AppError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    AppError::Render(message)
}
