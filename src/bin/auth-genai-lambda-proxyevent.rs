//! "Proxy event" version of the gateway Lambdas.
//!
//! This executable goes through `lambda_http`'s typed request layer instead
//! of handling the raw function-URL event JSON. It is the right entry point
//! behind an API Gateway proxy integration, where the HTTP status of the
//! response should be the mapped status rather than 200-with-JSON-inside.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};

use auth_genai_lambda::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|req: Request| async move {
        let context = req.lambda_context();
        let method = req.method().as_str().to_owned();
        let path = req.uri().path().to_owned();
        let body = match req.body() {
            Body::Empty => None,
            Body::Text(text) => Some(text.clone()),
            Body::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        };

        let resp = ref_svcs
            .handle(&context.invoked_function_arn, &method, &path, body.as_deref())
            .await?;

        Ok::<_, Error>(
            Response::builder()
                .status(resp.status_code)
                .header("Content-Type", "application/json")
                .body(Body::Text(resp.body))?,
        )
    }))
    .await?;
    Ok(())
}
