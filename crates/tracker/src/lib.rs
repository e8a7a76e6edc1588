//! Client for the case-tracking service: Cognito password login plus the
//! `/user` RPC endpoint that serves profile summaries and application details.

pub mod auth;
pub mod client;

use async_trait::async_trait;

use casewatch_common::error::AppError;
use casewatch_common::types::{SessionToken, StatusRecord};

pub use client::TrackerClient;

/// Identity provider endpoint (Cognito, ca-central-1).
pub const AUTH_URL: &str = "https://cognito-idp.ca-central-1.amazonaws.com/";

/// Public app client id used by the tracker web front end.
pub const CLIENT_ID: &str = "mtnf1qn9p739g2v8aij2anpju";

/// Single RPC endpoint; the operation is selected by the `method` body field.
pub const PROFILE_URL: &str = "https://api.tracker-suivi.apps.cic.gc.ca/user";

/// Everything the pipeline needs from upstream.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, AppError>;

    /// Application numbers on the account, in upstream order.
    async fn application_numbers(&self, token: &SessionToken) -> Result<Vec<String>, AppError>;

    /// Full status record for one application.
    async fn application_status(
        &self,
        token: &SessionToken,
        application_number: &str,
    ) -> Result<StatusRecord, AppError>;
}
