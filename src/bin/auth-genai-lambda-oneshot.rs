//! "Oneshot" version of the gateway Lambdas.
//!
//! This executable runs one invocation, based on arguments given on the
//! command line: the function ARN (or just its suffix) and the JSON event
//! payload. Useful for poking at the handlers without a Lambda runtime.

use lambda_runtime::Error;
use serde_json::Value;
use std::env;

use auth_genai_lambda::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = env::args();
    args.next(); // skip argv[0]

    let arn = args.next().ok_or_else(|| -> Error {
        "first argument should be the ARN suffix to use (auth-gateway, genai-gateway, essay-grader)"
            .into()
    })?;

    let json_text = args
        .next()
        .ok_or_else(|| -> Error { "second argument should be JSON event text".into() })?;
    let payload: Value = serde_json::from_str(&json_text)?;

    let svcs = Services::init().await?;
    let result = svcs.dispatch(arn, Some(payload)).await?;

    serde_json::to_writer(std::io::stdout().lock(), &result)?;
    Ok(())
}
