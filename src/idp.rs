//! The identity-provider boundary.
//!
//! Handlers talk to Cognito through the `IdentityProvider` trait so the
//! dispatch and error-mapping logic can be exercised without AWS. The
//! production implementation classifies Cognito failures by their error code
//! string into the closed `AuthError` set; the original deployment did the
//! same thing by catching the provider client's exception types.

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{AttributeType, AuthFlowType, AuthenticationResultType},
    Client,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// The upstream identity failures the gateway knows how to map to a status
/// code, plus the two arms that collapse to a generic 500: a field the
/// request body should have carried, and any unclassified provider failure.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("user not confirmed")]
    NotConfirmed,
    #[error("user already exists")]
    UserExists,
    #[error("confirmation code mismatch")]
    CodeMismatch,
    #[error("confirmation code expired")]
    ExpiredCode,
    #[error("not authorized")]
    NotAuthorized,
    #[error("missing request field `{0}`")]
    MissingField(&'static str),
    #[error("{0}")]
    Upstream(String),
}

/// Tokens issued by a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i32,
    pub token_type: String,
}

/// One method per identity-provider operation the gateway uses. Each call is
/// synchronous from the invocation's point of view and either succeeds or
/// yields one `AuthError`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: Option<&Map<String, Value>>,
    ) -> Result<(), AuthError>;

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError>;

    async fn resend_confirmation_code(&self, email: &str) -> Result<(), AuthError>;

    async fn password_auth(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError>;

    async fn refresh_auth(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

pub struct CognitoIdp {
    client: Client,
    client_id: String,
}

impl CognitoIdp {
    pub fn new(config: &aws_config::SdkConfig, client_id: String) -> Self {
        CognitoIdp {
            client: Client::new(config),
            client_id,
        }
    }
}

/// Map a Cognito error code onto the closed `AuthError` set. The detail text
/// is only kept for the unclassified arm, where it gets logged but never
/// surfaced to the caller.
fn classify(code: Option<&str>, detail: String) -> AuthError {
    match code {
        Some("UserNotConfirmedException") => AuthError::NotConfirmed,
        Some("UsernameExistsException") => AuthError::UserExists,
        Some("CodeMismatchException") => AuthError::CodeMismatch,
        Some("ExpiredCodeException") => AuthError::ExpiredCode,
        Some("NotAuthorizedException") => AuthError::NotAuthorized,
        _ => AuthError::Upstream(detail),
    }
}

fn sdk_error<E>(err: SdkError<E>) -> AuthError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();
    classify(err.code(), detail)
}

fn string_attribute(name: &str, value: &str) -> Result<AttributeType, AuthError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| AuthError::Upstream(e.to_string()))
}

fn missing(field: &'static str) -> impl FnOnce() -> AuthError {
    move || AuthError::Upstream(format!("authentication result missing {field}"))
}

fn tokens_from(result: Option<AuthenticationResultType>) -> Result<AuthTokens, AuthError> {
    let result =
        result.ok_or_else(|| AuthError::Upstream("no authentication result returned".into()))?;

    Ok(AuthTokens {
        access_token: result.access_token.ok_or_else(missing("AccessToken"))?,
        id_token: result.id_token.ok_or_else(missing("IdToken"))?,
        refresh_token: result.refresh_token,
        expires_in: result.expires_in,
        token_type: result.token_type.ok_or_else(missing("TokenType"))?,
    })
}

#[async_trait]
impl IdentityProvider for CognitoIdp {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: Option<&Map<String, Value>>,
    ) -> Result<(), AuthError> {
        let mut attrs = vec![string_attribute("email", email)?];

        if let Some(map) = attributes {
            for (name, value) in map {
                if name == "email" {
                    continue;
                }

                // Cognito attributes are all strings; anything else in the
                // request map is rendered to its JSON text.
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };

                attrs.push(string_attribute(name, &value)?);
            }
        }

        self.client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .set_user_attributes(Some(attrs))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(email)
            .confirmation_code(code)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn resend_confirmation_code(&self, email: &str) -> Result<(), AuthError> {
        self.client
            .resend_confirmation_code()
            .client_id(&self.client_id)
            .username(email)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn password_auth(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let result = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
            .map_err(sdk_error)?;

        tokens_from(result.authentication_result)
    }

    async fn refresh_auth(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let result = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::RefreshTokenAuth)
            .auth_parameters("REFRESH_TOKEN", refresh_token)
            .send()
            .await
            .map_err(sdk_error)?;

        tokens_from(result.authentication_result)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.client
            .forgot_password()
            .client_id(&self.client_id)
            .username(email)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.client
            .confirm_forgot_password()
            .client_id(&self.client_id)
            .username(email)
            .confirmation_code(code)
            .password(new_password)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}
