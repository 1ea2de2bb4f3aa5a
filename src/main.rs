//! The identity & inference gateway Lambdas.
//!
//! Default entry point: serves raw Lambda function-URL events, which is how
//! the cloud deployment invokes these functions. The event's
//! `requestContext.http` section and string body are all the handlers need.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

use auth_genai_lambda::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        ref_svcs
            .dispatch(context.invoked_function_arn, Some(payload))
            .await
    }))
    .await?;
    Ok(())
}
