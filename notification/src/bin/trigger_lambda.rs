use common::config::Settings;
use common::telemetry::init_tracing;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use notification::handler::{TriggerResponse, handle_notification};
use notification::orchestrator::StepFunctionsStarter;
use serde_json::Value;
use std::sync::Arc;

struct RuntimeDependencies {
    state_machine_arn: String,
    starter: StepFunctionsStarter,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: Arc<RuntimeDependencies>,
) -> Result<TriggerResponse, Error> {
    let response =
        handle_notification(event.payload, &deps.state_machine_arn, &deps.starter).await?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = Settings::new(None)?;
    init_tracing(settings.log_format);

    let deps = Arc::new(RuntimeDependencies {
        state_machine_arn: settings.stepfunction_arn()?.to_string(),
        starter: StepFunctionsStarter::from_env().await,
    });

    lambda_runtime::run(service_fn(move |event| handle_request(event, Arc::clone(&deps)))).await
}
