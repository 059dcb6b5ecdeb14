//! Plan execution.
//!
//! Applies an ordered statement plan against the live database, one
//! statement at a time. There is no transaction around the plan: DDL on
//! MySQL commits implicitly, so a mid-plan failure leaves earlier statements
//! applied. The failing statement is attached to the error.

use sqlx::MySqlPool;
use tracing::{debug, info};

use schemasync_core::plan::Plan;

use crate::error::{Result, SyncError};

/// Executes plans against a database.
pub struct PlanExecutor {
    pool: MySqlPool,
    dry_run: bool,
}

impl PlanExecutor {
    /// Creates a new executor.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            dry_run: false,
        }
    }

    /// Enables dry-run mode: statements are printed, not executed.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Applies every statement of the plan in order. Returns the number of
    /// statements applied.
    pub async fn apply(&self, plan: &Plan) -> Result<usize> {
        if plan.is_empty() {
            info!("schema is up to date, nothing to apply");
            return Ok(0);
        }

        let total = plan.len();
        for (position, statement) in plan.iter().enumerate() {
            debug!(sql = %statement, "executing statement");

            if self.dry_run {
                println!("{statement}");
                continue;
            }

            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|source| SyncError::Execution {
                    statement: statement.to_string(),
                    source,
                })?;

            info!(
                statement = position + 1,
                total,
                "statement applied"
            );
        }

        Ok(total)
    }
}
