use common::config::Settings;
use common::telemetry::init_tracing;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use processing::services::ProcessingService;
use serde_json::Value;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = Settings::new(None)?;
    init_tracing(settings.log_format);

    let service = Arc::new(ProcessingService::new(&settings).await?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let service = Arc::clone(&service);
        async move { service.handle_event(event.payload).await.map_err(Error::from) }
    }))
    .await
}
