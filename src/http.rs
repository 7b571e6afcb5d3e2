use crate::model::Counter;
use crate::model::Increment;
use crate::model::IncrementCounterInput;
use crate::service::CounterService;
use anyhow::anyhow;
use dropshot::endpoint;
use dropshot::ApiDescription;
use dropshot::ConfigDropshot;
use dropshot::HttpError;
use dropshot::HttpResponseOk;
use dropshot::HttpServerStarter;
use dropshot::RequestContext;
use dropshot::TypedBody;
use slog::error;
use slog::info;
use std::sync::Arc;

/// The server-wide context consists of just the counter service
pub struct ServerContext {
    service: Arc<dyn CounterService>,
}

impl ServerContext {
    pub fn new(service: Arc<dyn CounterService>) -> ServerContext {
        ServerContext { service }
    }
}

struct ErrorWrap(anyhow::Error);
impl From<ErrorWrap> for HttpError {
    fn from(value: ErrorWrap) -> Self {
        let message = format!("{:#}", value.0);
        dropshot::HttpError {
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            error_code: None,
            external_message: message.clone(),
            internal_message: message,
        }
    }
}

/// Describe the counter API.
pub fn counter_api() -> anyhow::Result<ApiDescription<ServerContext>> {
    let mut api = ApiDescription::new();
    api.register(api_get_counter)
        .map_err(|error| anyhow!("registering api_get_counter: {}", error))?;
    api.register(api_increment_counter).map_err(|error| {
        anyhow!("registering api_increment_counter: {}", error)
    })?;
    Ok(api)
}

/// Write the OpenAPI document for the counter API.
pub fn write_openapi(out: &mut dyn std::io::Write) -> anyhow::Result<()> {
    counter_api()?
        .openapi("Counter", env!("CARGO_PKG_VERSION"))
        .write(out)
        .map_err(|error| anyhow!("writing OpenAPI document: {:#}", error))
}

pub async fn create_dropshot_server(
    config_dropshot: ConfigDropshot,
    log: slog::Logger,
    service: Arc<dyn CounterService>,
) -> anyhow::Result<dropshot::HttpServer<ServerContext>> {
    let api = counter_api()?;
    let api_context = ServerContext::new(service);

    Ok(HttpServerStarter::new(&config_dropshot, api, api_context, &log)
        .map_err(|error| anyhow!("creating Dropshot server: {:#}", error))?
        .start())
}

/// Fetch the counter, creating it if it does not exist yet.
#[endpoint {
    method = GET,
    path = "/counter",
}]
async fn api_get_counter(
    rqctx: RequestContext<ServerContext>,
) -> Result<HttpResponseOk<Counter>, HttpError> {
    let api_context = rqctx.context();
    let counter = api_context.service.get_counter().await.map_err(|error| {
        error!(rqctx.log, "failed to get counter"; "error_message" => #%error);
        ErrorWrap(error)
    })?;
    Ok(HttpResponseOk(counter))
}

/// Add a positive amount (default 1) to the counter.
#[endpoint {
    method = POST,
    path = "/counter/increment",
}]
async fn api_increment_counter(
    rqctx: RequestContext<ServerContext>,
    body: TypedBody<IncrementCounterInput>,
) -> Result<HttpResponseOk<Counter>, HttpError> {
    let api_context = rqctx.context();
    let increment = Increment::try_from(body.into_inner()).map_err(|error| {
        HttpError::for_bad_request(
            Some(String::from("InvalidIncrement")),
            error.to_string(),
        )
    })?;
    let counter = api_context
        .service
        .increment_counter(increment)
        .await
        .map_err(|error| {
            error!(rqctx.log, "failed to increment counter";
                "error_message" => #%error);
            ErrorWrap(error)
        })?;
    info!(rqctx.log, "incremented counter";
        "increment" => increment.get(), "count" => counter.count);
    Ok(HttpResponseOk(counter))
}
