use std::time::Duration;

use tokio::fs;
use tracing::info;

use crate::{
    dao::{get_path, PoolOption, PoolType},
    error::Error,
    model::{AssetRecord, Table},
};

const MIGRATIONS: [&str; 1] = ["asset_history.sql"];

#[derive(Debug)]
pub struct DatabasePool {
    pub asset_history: Table<AssetRecord>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(database_url: &str) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        Ok(DatabasePool {
            asset_history: Table::new(pool.clone()),
            pool,
        })
    }

    pub async fn init_migrations(&self) -> Result<(), Error> {
        let dir = env!("CARGO_MANIFEST_DIR");

        for file in MIGRATIONS {
            let data = fs::read_to_string(get_path(dir, file)).await?;
            sqlx::raw_sql(&data).execute(&self.pool).await?;
            info!("migration {} applied", file);
        }

        Ok(())
    }
}
