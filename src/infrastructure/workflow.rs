//! Default evaluation workflow binding.

use async_trait::async_trait;
use tracing::info;

use crate::domain::workflow::{EvaluationRequest, EvaluationWorkflow, WorkflowError};

/// Workflow that only records the evaluation request in the log.
///
/// Used when no external workflow engine is wired in.
pub struct TracingWorkflow;

#[async_trait]
impl EvaluationWorkflow for TracingWorkflow {
    async fn start(&self, request: EvaluationRequest) -> Result<(), WorkflowError> {
        info!(
            account_id = %request.account_id,
            link_id = %request.link_id,
            destination = %request.destination,
            "Destination evaluation requested"
        );
        Ok(())
    }
}
