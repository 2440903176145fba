use super::DataBase;
use crate::model::{AssetRecord, Table};
use chrono::{DateTime, Utc};
use sqlx::{error::Error, QueryBuilder};

impl Table<AssetRecord> {
    pub async fn insert_many(&self, data: &[AssetRecord]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(
            r#"
            INSERT INTO asset_history (
                symbol,
                name,
                borrow_amount,
                repay_amount,
                ratio,
                timestamp
            )"#,
        );

        query_builder.push_values(data, |mut b, record| {
            b.push_bind(&record.symbol)
                .push_bind(&record.name)
                .push_bind(record.borrow_amount)
                .push_bind(record.repay_amount)
                .push_bind(record.ratio)
                .push_bind(record.timestamp);
        });

        let query = query_builder.build();
        query.execute(&self.pool).await?;

        Ok(())
    }

    /// Latest row per symbol observed strictly after `since`.
    pub async fn get_latest_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssetRecord>, Error> {
        sqlx::query_as(
            r#"
            SELECT DISTINCT ON (symbol)
                symbol, name, borrow_amount, repay_amount, ratio, timestamp
            FROM asset_history
            WHERE timestamp > $1
            ORDER BY symbol, timestamp DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssetRecord>, Error> {
        sqlx::query_as(
            r#"
            SELECT symbol, name, borrow_amount, repay_amount, ratio, timestamp
            FROM asset_history
            WHERE timestamp > $1
            ORDER BY timestamp ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, Error> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM asset_history
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }
}
