use crate::envelope::extract_object_ref;
use crate::orchestrator::ExecutionStarter;
use common::Result;
use common::models::ExecutionInput;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl TriggerResponse {
    fn started() -> Result<Self> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string("StepFunction started!")?,
        })
    }
}

/// Decodes the notification batch and starts exactly one execution of
/// `state_machine_arn`. Nothing is started if decoding fails.
pub async fn handle_notification(
    event: Value,
    state_machine_arn: &str,
    starter: &dyn ExecutionStarter,
) -> Result<TriggerResponse> {
    let object = extract_object_ref(event)?;
    info!(bucket = %object.bucket, key = %object.key, "Upload notification received");

    let input = ExecutionInput::new(&object.bucket, &object.key);
    let payload = serde_json::to_string(&input)?;

    let execution_arn = starter.start_execution(state_machine_arn, &payload).await?;
    info!(execution_arn = %execution_arn, "Workflow execution started");

    TriggerResponse::started()
}
