use crm_core::AppError;

/// Delivers password reset codes to their owner (email, SMS, ...).
#[async_trait::async_trait]
pub trait ResetCodeSink: Send + Sync {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), AppError>;
}

/// Writes reset codes to the log. For development deployments without a mail relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCodeSink;

#[async_trait::async_trait]
impl ResetCodeSink for LogCodeSink {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "Password reset code issued");
        tracing::debug!(email = %email, code = %code, "Password reset code");
        Ok(())
    }
}
