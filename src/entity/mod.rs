//! SeaORM entity definitions for PostgreSQL database.

pub mod test_run;
pub mod test_step;
