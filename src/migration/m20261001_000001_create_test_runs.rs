//! Migration: Create test_runs table.
//!
//! Runs are inserted by the dispatcher and mutated only by webhook reconciliation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE test_runs (
                    id VARCHAR(100) PRIMARY KEY, -- dispatcher-issued correlation id
                    name VARCHAR(500) NOT NULL,
                    project_id VARCHAR(100) NOT NULL,

                    status VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'queued', 'in_progress', 'completed', 'failed', 'cancelled', 'timeout')),
                    environment VARCHAR(100),

                    started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ,

                    -- CI metadata, last present value wins
                    commit_sha VARCHAR(64),
                    commit_message TEXT,
                    workflow_url VARCHAR(1000),
                    artifact_url VARCHAR(1000),
                    summary TEXT,

                    -- completed_at is set exactly for terminal states
                    CONSTRAINT chk_test_runs_completed_at CHECK (
                        (status IN ('completed', 'failed', 'cancelled', 'timeout')) = (completed_at IS NOT NULL)
                    )
                );

                -- Dashboard listing per project
                CREATE INDEX idx_test_runs_project_id ON test_runs(project_id, started_at DESC);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS test_runs CASCADE;")
            .await?;

        Ok(())
    }
}
