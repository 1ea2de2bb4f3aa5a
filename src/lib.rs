//! The AWS/Lambda-powered identity and inference gateways.
//!
//! This library crate implements both gateway functions behind one shared
//! codebase, which is compiled into a small set of executables: the default
//! binary speaks raw Lambda function-URL events (what the cloud deployment
//! uses), `auth-genai-lambda-proxyevent` goes through `lambda_http`'s typed
//! request layer, and `auth-genai-lambda-oneshot` runs one invocation from
//! the command line for local testing.
//!
//! Which gateway an invocation is for is decided by the suffix of the invoked
//! function ARN. Each deployed function only ever sees its own traffic, but
//! bundling them keeps the deployment to a single artifact.

use lambda_runtime::{tracing, Error};
use serde::Deserialize;
use serde_json::{json, Value};

mod auth;
mod idp;
mod inference;
mod model;
mod prompts;
mod response;
mod routes;

use idp::CognitoIdp;
use model::BedrockModel;
pub use response::ApiResponse;

/// Environment-provided settings, read once at startup. A missing required
/// variable is fatal before the first invocation is served.
pub struct Config {
    pub user_pool_id: String,
    pub client_id: String,
    pub model_id: String,
    pub prompt_version: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Config {
            user_pool_id: require_env("USER_POOL_ID")?,
            client_id: require_env("CLIENT_ID")?,
            model_id: require_env("MODEL_ID")?,
            prompt_version: std::env::var("PROMPT_VERSION")
                .unwrap_or_else(|_| prompts::LATEST_VERSION.to_owned()),
        })
    }
}

fn require_env(name: &str) -> Result<String, Error> {
    std::env::var(name)
        .map_err(|_| -> Error { format!("environment variable {name} must be set").into() })
}

/// The function-URL event shape both gateways receive. Every part is
/// optional: a malformed event just yields empty method/path/body and falls
/// through to the normal 404/missing-field paths.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    #[serde(default)]
    request_context: RequestContext,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RequestContext {
    #[serde(default)]
    http: HttpDescriptor,
}

#[derive(Debug, Default, Deserialize)]
struct HttpDescriptor {
    #[serde(default)]
    method: String,
    #[serde(default)]
    path: String,
}

impl HttpEvent {
    pub fn method(&self) -> &str {
        &self.request_context.http.method
    }

    pub fn path(&self) -> &str {
        &self.request_context.http.path
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Parse a request body leniently: no body, or a body that isn't JSON,
/// becomes an empty object so that missing fields surface inside the
/// handlers instead of as a parse fault.
pub(crate) fn lenient_body(raw: Option<&str>) -> Value {
    raw.and_then(|text| serde_json::from_str(text).ok())
        .unwrap_or_else(|| json!({}))
}

pub struct Services {
    config: Config,
    idp: CognitoIdp,
    model: BedrockModel,
    template: &'static prompts::GradingTemplate,
}

impl Services {
    /// Create the shared state for the gateway Lambdas: configuration plus
    /// the AWS clients, built once per process and reused read-only across
    /// invocations.
    pub async fn init() -> Result<Self, Error> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false) // don't print the module name
            .without_time() // don't print time (CloudWatch has it)
            .init();

        let config = Config::from_env()?;
        let template = prompts::get(&config.prompt_version).ok_or_else(|| -> Error {
            format!("unknown PROMPT_VERSION `{}`", config.prompt_version).into()
        })?;

        let aws = aws_config::load_from_env().await;
        let idp = CognitoIdp::new(&aws, config.client_id.clone());
        let model = BedrockModel::new(&aws);

        tracing::info!(
            "gateway services ready: pool={} model={} grading-template={}",
            config.user_pool_id,
            config.model_id,
            template.version
        );

        Ok(Services {
            config,
            idp,
            model,
            template,
        })
    }

    /// Handle one invocation of whichever gateway function this process is
    /// deployed as, identified by the ARN suffix.
    pub async fn handle(
        &self,
        arn: &str,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<ApiResponse, Error> {
        if arn.ends_with("auth-gateway") {
            Ok(auth::handler(method, path, body, &self.idp).await)
        } else if arn.ends_with("genai-gateway") {
            Ok(inference::handle_generate(body, &self.model, &self.config.model_id).await)
        } else if arn.ends_with("essay-grader") {
            Ok(
                inference::handle_grade(body, &self.model, &self.config.model_id, self.template)
                    .await,
            )
        } else {
            Err(format!("unhandled function: {arn}").into())
        }
    }

    /// Raw-event entry point used by the default and oneshot binaries.
    pub async fn dispatch(&self, mut arn: String, payload: Option<Value>) -> Result<Value, Error> {
        // Local testing environment?
        if arn.ends_with(":test_function") {
            arn = require_env("GATEWAY_LOCALTEST_ARN")?;
        }

        let event: HttpEvent = payload
            .map(|value| serde_json::from_value(value).unwrap_or_default())
            .unwrap_or_default();

        let response = self
            .handle(&arn, event.method(), event.path(), event.body())
            .await?;
        Ok(serde_json::to_value(response)?)
    }
}
