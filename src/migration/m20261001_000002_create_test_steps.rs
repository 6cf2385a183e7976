//! Migration: Create test_steps table.
//!
//! One row per (run, step name); webhook deliveries upsert into it.

use sea_orm_migration::prelude::*;

const CREATE_TEST_STEPS: &str = r#"
    CREATE TABLE test_steps (
        id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
        test_run_id VARCHAR(100) NOT NULL REFERENCES test_runs(id) ON DELETE CASCADE,
        name TEXT NOT NULL, -- reporter names are "<spec> - <test>", unbounded

        status VARCHAR(20) NOT NULL
            CHECK (status IN ('passed', 'failed', 'skipped', 'pending')),
        action TEXT NOT NULL,
        expected TEXT NOT NULL,
        actual TEXT,
        error TEXT,
        duration_ms BIGINT,
        artifact_url TEXT,
        screenshot TEXT
    );

    -- Idempotency key for upserts
    CREATE UNIQUE INDEX idx_test_steps_run_name ON test_steps(test_run_id, name);
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(CREATE_TEST_STEPS)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS test_steps CASCADE;")
            .await?;

        Ok(())
    }
}
