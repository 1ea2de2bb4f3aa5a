//! The identity gateway: the seven account operations and the translation of
//! upstream failures into stable HTTP responses.
//!
//! Operations assume unvalidated request bodies. There is no upfront schema
//! check; a missing field fails during construction of the upstream call and
//! maps to the generic 500 like any other unclassified failure.

use lambda_runtime::tracing;
use serde_json::{json, Value};

use crate::idp::{AuthError, IdentityProvider};
use crate::response::ApiResponse;
use crate::routes::{self, AuthOp};

/// Handle one identity-gateway invocation.
pub async fn handler(
    method: &str,
    path: &str,
    raw_body: Option<&str>,
    idp: &dyn IdentityProvider,
) -> ApiResponse {
    let Some(op) = routes::lookup(method, path) else {
        return ApiResponse::not_found();
    };

    let body = crate::lenient_body(raw_body);

    match run(op, &body, idp).await {
        Ok(payload) => ApiResponse::json(200, payload),
        Err(err) => error_response(err),
    }
}

async fn run(op: AuthOp, body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    match op {
        AuthOp::SignUp => sign_up(body, idp).await,
        AuthOp::Confirm => confirm(body, idp).await,
        AuthOp::Resend => resend(body, idp).await,
        AuthOp::Login => login(body, idp).await,
        AuthOp::Refresh => refresh(body, idp).await,
        AuthOp::Forgot => forgot(body, idp).await,
        AuthOp::Reset => reset(body, idp).await,
    }
}

fn require_str<'a>(body: &'a Value, field: &'static str) -> Result<&'a str, AuthError> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or(AuthError::MissingField(field))
}

async fn sign_up(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;
    let password = require_str(body, "password")?;
    let attributes = body.get("attributes").and_then(Value::as_object);

    idp.sign_up(email, password, attributes).await?;
    Ok(json!({
        "message": "Sign-up successful. Check your email for the confirmation code."
    }))
}

async fn confirm(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;
    let code = require_str(body, "code")?;

    idp.confirm_sign_up(email, code).await?;
    Ok(json!({ "message": "Email confirmed." }))
}

async fn resend(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;

    idp.resend_confirmation_code(email).await?;
    Ok(json!({ "message": "Confirmation code resent." }))
}

async fn login(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;
    let password = require_str(body, "password")?;

    let tokens = idp.password_auth(email, password).await?;

    let mut payload = json!({
        "access_token": tokens.access_token,
        "id_token": tokens.id_token,
        "expires_in": tokens.expires_in,
        "token_type": tokens.token_type,
    });

    // The provider only issues a refresh token on a fresh login; when it
    // doesn't, the field is omitted entirely rather than emitted as null.
    if let Some(refresh) = tokens.refresh_token {
        payload["refresh_token"] = Value::String(refresh);
    }

    Ok(payload)
}

async fn refresh(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let token = require_str(body, "refresh_token")?;

    let tokens = idp.refresh_auth(token).await?;

    // A refresh never returns a new refresh token.
    Ok(json!({
        "access_token": tokens.access_token,
        "id_token": tokens.id_token,
        "expires_in": tokens.expires_in,
        "token_type": tokens.token_type,
    }))
}

async fn forgot(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;

    idp.forgot_password(email).await?;
    Ok(json!({ "message": "Password reset code sent to email." }))
}

async fn reset(body: &Value, idp: &dyn IdentityProvider) -> Result<Value, AuthError> {
    let email = require_str(body, "email")?;
    let code = require_str(body, "code")?;
    let new_password = require_str(body, "new_password")?;

    idp.confirm_forgot_password(email, code, new_password).await?;
    Ok(json!({ "message": "Password has been reset." }))
}

/// The closed failure-kind table of the gateway's API contract. Everything
/// outside it is logged and collapsed to a generic 500 so internal error text
/// never reaches the caller.
fn error_response(err: AuthError) -> ApiResponse {
    let (status, message) = match &err {
        AuthError::NotConfirmed => (400, "User not confirmed. Please verify your email."),
        AuthError::UserExists => (400, "User already exists."),
        AuthError::CodeMismatch => (400, "Invalid confirmation code."),
        AuthError::ExpiredCode => (400, "Confirmation code expired."),
        AuthError::NotAuthorized => (401, "Invalid credentials."),
        AuthError::MissingField(_) | AuthError::Upstream(_) => {
            tracing::error!("identity operation failed: {err}");
            (500, "Internal server error")
        }
    };

    ApiResponse::json(status, json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idp::AuthTokens;
    use async_trait::async_trait;
    use serde_json::Map;

    /// A provider that either succeeds with canned tokens or fails every
    /// operation with one configured error.
    #[derive(Default)]
    struct FakeIdp {
        fail_with: Option<AuthError>,
        issue_refresh_token: bool,
    }

    impl FakeIdp {
        fn failing(err: AuthError) -> Self {
            FakeIdp {
                fail_with: Some(err),
                issue_refresh_token: false,
            }
        }

        fn outcome(&self) -> Result<(), AuthError> {
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn tokens(&self) -> AuthTokens {
            AuthTokens {
                access_token: "access-token".into(),
                id_token: "id-token".into(),
                refresh_token: self.issue_refresh_token.then(|| "refresh-token".into()),
                expires_in: 3600,
                token_type: "Bearer".into(),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdp {
        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _attributes: Option<&Map<String, Value>>,
        ) -> Result<(), AuthError> {
            self.outcome()
        }

        async fn confirm_sign_up(&self, _email: &str, _code: &str) -> Result<(), AuthError> {
            self.outcome()
        }

        async fn resend_confirmation_code(&self, _email: &str) -> Result<(), AuthError> {
            self.outcome()
        }

        async fn password_auth(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<AuthTokens, AuthError> {
            self.outcome()?;
            Ok(self.tokens())
        }

        async fn refresh_auth(&self, _refresh_token: &str) -> Result<AuthTokens, AuthError> {
            self.outcome()?;
            // Even if the upstream were to hand one back, the gateway must
            // not surface it.
            let mut tokens = self.tokens();
            tokens.refresh_token = Some("unexpected-refresh-token".into());
            Ok(tokens)
        }

        async fn forgot_password(&self, _email: &str) -> Result<(), AuthError> {
            self.outcome()
        }

        async fn confirm_forgot_password(
            &self,
            _email: &str,
            _code: &str,
            _new_password: &str,
        ) -> Result<(), AuthError> {
            self.outcome()
        }
    }

    fn body_of(resp: &ApiResponse) -> Value {
        serde_json::from_str(&resp.body).unwrap()
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let idp = FakeIdp::default();

        for (method, path) in [
            ("GET", "/auth/login"),
            ("POST", "/auth/nope"),
            ("DELETE", "/auth/signup"),
            ("POST", "/"),
        ] {
            let resp = handler(method, path, None, &idp).await;
            assert_eq!(resp.status_code, 404, "{method} {path}");
            assert_eq!(body_of(&resp), json!({ "error": "Not found" }));
        }
    }

    #[tokio::test]
    async fn signup_returns_confirmation_message() {
        let idp = FakeIdp::default();
        let body = r#"{"email":"a@b.c","password":"hunter22","attributes":{"name":"Ada"}}"#;

        let resp = handler("POST", "/auth/signup", Some(body), &idp).await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(
            body_of(&resp)["message"],
            "Sign-up successful. Check your email for the confirmation code."
        );
    }

    #[tokio::test]
    async fn login_includes_refresh_token_only_when_issued() {
        let idp = FakeIdp {
            issue_refresh_token: true,
            ..FakeIdp::default()
        };
        let body = r#"{"email":"a@b.c","password":"hunter22"}"#;

        let resp = handler("POST", "/auth/login", Some(body), &idp).await;
        assert_eq!(resp.status_code, 200);
        let payload = body_of(&resp);
        assert_eq!(payload["access_token"], "access-token");
        assert_eq!(payload["id_token"], "id-token");
        assert_eq!(payload["expires_in"], 3600);
        assert_eq!(payload["token_type"], "Bearer");
        assert_eq!(payload["refresh_token"], "refresh-token");

        let idp = FakeIdp::default();
        let resp = handler("POST", "/auth/login", Some(body), &idp).await;
        let payload = body_of(&resp);
        assert!(payload.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn refresh_never_returns_a_refresh_token() {
        let idp = FakeIdp::default();
        let body = r#"{"refresh_token":"refresh-token"}"#;

        let resp = handler("POST", "/auth/refresh", Some(body), &idp).await;
        assert_eq!(resp.status_code, 200);
        let payload = body_of(&resp);
        assert_eq!(payload["access_token"], "access-token");
        assert!(payload.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn mapped_failures_produce_their_status_and_message() {
        let cases = [
            (
                AuthError::NotConfirmed,
                400,
                "User not confirmed. Please verify your email.",
            ),
            (AuthError::UserExists, 400, "User already exists."),
            (AuthError::CodeMismatch, 400, "Invalid confirmation code."),
            (AuthError::ExpiredCode, 400, "Confirmation code expired."),
            (AuthError::NotAuthorized, 401, "Invalid credentials."),
        ];

        let body = r#"{"email":"a@b.c","code":"123456"}"#;

        for (err, status, message) in cases {
            let idp = FakeIdp::failing(err.clone());
            let resp = handler("POST", "/auth/confirm", Some(body), &idp).await;
            assert_eq!(resp.status_code, status, "{err:?}");
            assert_eq!(body_of(&resp), json!({ "error": message }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn mapping_does_not_depend_on_the_operation() {
        let idp = FakeIdp::failing(AuthError::NotAuthorized);
        let body = r#"{"email":"a@b.c","password":"hunter22"}"#;

        let resp = handler("POST", "/auth/signup", Some(body), &idp).await;
        assert_eq!(resp.status_code, 401);
        assert_eq!(body_of(&resp), json!({ "error": "Invalid credentials." }));
    }

    #[tokio::test]
    async fn unclassified_failures_never_leak_detail() {
        let idp = FakeIdp::failing(AuthError::Upstream(
            "secret internal diagnostics".into(),
        ));
        let body = r#"{"email":"a@b.c"}"#;

        let resp = handler("POST", "/auth/resend", Some(body), &idp).await;
        assert_eq!(resp.status_code, 500);
        assert_eq!(body_of(&resp), json!({ "error": "Internal server error" }));
        assert!(!resp.body.contains("secret"));
    }

    #[tokio::test]
    async fn missing_fields_collapse_to_500() {
        let idp = FakeIdp::default();

        let resp = handler("POST", "/auth/login", Some(r#"{"email":"a@b.c"}"#), &idp).await;
        assert_eq!(resp.status_code, 500);
        assert_eq!(body_of(&resp), json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn unparseable_bodies_behave_like_empty_ones() {
        let idp = FakeIdp::default();

        let resp = handler("POST", "/auth/forgot", Some("{not json"), &idp).await;
        assert_eq!(resp.status_code, 500);
        assert_eq!(body_of(&resp), json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn responses_are_always_valid_json_with_a_status() {
        let idp = FakeIdp::default();

        for (method, path, body) in [
            ("POST", "/auth/reset", None),
            ("POST", "/auth/reset", Some("")),
            ("PUT", "/elsewhere", Some("[1,2,3]")),
            (
                "POST",
                "/auth/reset",
                Some(r#"{"email":"a@b.c","code":"1","new_password":"pw"}"#),
            ),
        ] {
            let resp = handler(method, path, body, &idp).await;
            let value = serde_json::to_value(&resp).unwrap();
            assert!(value["statusCode"].is_u64());
            let _: Value = serde_json::from_str(value["body"].as_str().unwrap()).unwrap();
        }
    }
}
