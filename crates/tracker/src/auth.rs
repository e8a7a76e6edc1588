//! Cognito `InitiateAuth` wire types.

use serde::{Deserialize, Serialize};

pub const AUTH_FLOW: &str = "USER_PASSWORD_AUTH";
pub const AMZ_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
pub const AMZ_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthRequest<'a> {
    pub auth_flow: &'a str,
    pub client_id: &'a str,
    pub auth_parameters: AuthParameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AuthParameters<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl<'a> InitiateAuthRequest<'a> {
    pub fn password(client_id: &'a str, username: &'a str, password: &'a str) -> Self {
        Self {
            auth_flow: AUTH_FLOW,
            client_id,
            auth_parameters: AuthParameters { username, password },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthResponse {
    pub authentication_result: AuthenticationResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub id_token: String,
}
