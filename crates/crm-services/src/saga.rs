//! Ordered multi-step operations with compensating actions.
//!
//! Each completed step registers a compensation. When a later step fails, the
//! registered compensations run in reverse order and the original failure is
//! returned as [`AppError::SagaFailed`] together with any compensation errors.
//! Compensation is best-effort: a failing compensation is logged and the
//! remaining ones still run.

use std::future::Future;
use std::pin::Pin;

use crm_core::AppError;

type Compensation = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

pub struct Saga {
    name: &'static str,
    completed: Vec<(String, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Vec::new(),
        }
    }

    /// Run `action`; on success register `compensate(&output)` for rollback.
    pub async fn step<T, F, C, CF>(
        &mut self,
        step: &str,
        action: F,
        compensate: C,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
        C: FnOnce(&T) -> CF,
        CF: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        match action.await {
            Ok(output) => {
                tracing::debug!(saga = self.name, step, "Saga step completed");
                self.completed
                    .push((step.to_string(), Box::pin(compensate(&output))));
                Ok(output)
            }
            Err(err) => Err(self.rollback(step, err).await),
        }
    }

    /// Run a step whose failure is tolerated: it is logged and the saga continues.
    pub async fn lenient_step<F>(&mut self, step: &str, action: F)
    where
        F: Future<Output = Result<(), AppError>>,
    {
        if let Err(err) = action.await {
            tracing::warn!(
                saga = self.name,
                step,
                error = %err,
                "Saga step failed; continuing without it"
            );
        }
    }

    /// Finish successfully, discarding compensations.
    pub fn complete(self) {
        tracing::info!(
            saga = self.name,
            steps = self.completed.len(),
            "Saga completed"
        );
    }

    async fn rollback(&mut self, failed_step: &str, err: AppError) -> AppError {
        tracing::warn!(
            saga = self.name,
            step = failed_step,
            error = %err,
            compensations = self.completed.len(),
            "Saga step failed, running compensations"
        );

        let mut compensation_errors = Vec::new();
        while let Some((step, compensation)) = self.completed.pop() {
            match compensation.await {
                Ok(()) => tracing::info!(saga = self.name, step = %step, "Compensated saga step"),
                Err(comp_err) => {
                    tracing::error!(
                        saga = self.name,
                        step = %step,
                        error = %comp_err,
                        "Compensation failed"
                    );
                    compensation_errors.push(format!("{}: {}", step, comp_err));
                }
            }
        }

        AppError::SagaFailed {
            step: failed_step.to_string(),
            source: Box::new(err),
            compensation_errors,
        }
    }
}
