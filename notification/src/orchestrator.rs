use async_trait::async_trait;
use common::Result;

/// Starts workflow executions. Returns the execution ARN.
#[async_trait]
pub trait ExecutionStarter: Send + Sync {
    async fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String>;
}

pub struct StepFunctionsStarter {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsStarter {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sfn::Client::new(&config))
    }
}

#[async_trait]
impl ExecutionStarter for StepFunctionsStarter {
    async fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String> {
        let response = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .input(input)
            .send()
            .await?;

        Ok(response.execution_arn().to_string())
    }
}
