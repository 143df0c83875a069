//! Evaluation workflow contract.

use async_trait::async_trait;
use thiserror::Error;

/// Input of one evaluation run for a link destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub account_id: String,
    pub link_id: String,
    pub destination: String,
}

#[derive(Debug, Error)]
#[error("failed to start evaluation workflow: {0}")]
pub struct WorkflowError(pub String);

/// Starts the destination evaluation workflow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationWorkflow: Send + Sync {
    async fn start(&self, request: EvaluationRequest) -> Result<(), WorkflowError>;
}
