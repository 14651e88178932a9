use crate::db::store::{PriceStore, PriceTx};
use crate::error::StoreError;
use crate::models::{BatchSummary, PriceRecord};
use sqlx::{PgPool, Postgres, Transaction};

/// 单条 INSERT 的最大行数 (5 个参数/行, 远低于 65535 绑定上限)
const STAGE_CHUNK_SIZE: usize = 1000;

/// Postgres 实现
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 持有一个 sqlx 事务, drop 时自动回滚
pub struct PgPriceTx {
    tx: Transaction<'static, Postgres>,
}

impl PriceStore for PgPriceStore {
    type Tx = PgPriceTx;

    async fn begin(&self) -> Result<PgPriceTx, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 临时表随事务结束 (提交或回滚) 自动删除
        sqlx::query(
            r#"
            CREATE TEMP TABLE prices_staging
                (LIKE prices INCLUDING DEFAULTS)
                ON COMMIT DROP
            "#
        )
        .execute(&mut *tx)
        .await?;

        Ok(PgPriceTx { tx })
    }

    async fn list_all(&self) -> Result<Vec<PriceRecord>, StoreError> {
        let records = sqlx::query_as::<_, PriceRecord>(
            r#"
            SELECT id, name, category, price, create_date
            FROM prices
            ORDER BY id
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

impl PriceTx for PgPriceTx {
    async fn stage(&mut self, records: &[PriceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        tracing::debug!("开始写入暂存表, {} 条记录", records.len());
        let start_time = std::time::Instant::now();

        for chunk in records.chunks(STAGE_CHUNK_SIZE) {
            let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
                "INSERT INTO prices_staging (id, name, category, price, create_date) "
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.id)
                    .push_bind(&record.name)
                    .push_bind(&record.category)
                    .push_bind(record.price.clone())
                    .push_bind(&record.create_date);
            });

            query_builder.build().execute(&mut *self.tx).await?;
        }

        tracing::debug!("暂存表写入完成, 耗时: {:?}", start_time.elapsed());
        Ok(())
    }

    async fn staged_summary(&mut self) -> Result<BatchSummary, StoreError> {
        let summary = sqlx::query_as::<_, BatchSummary>(
            r#"
            SELECT count(*) as total_items,
                   count(DISTINCT category) as total_categories,
                   coalesce(sum(price), 0)::numeric as total_price
            FROM prices_staging
            "#
        )
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(summary)
    }

    async fn publish(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO prices (id, name, category, price, create_date)
            SELECT id, name, category, price, create_date
            FROM prices_staging
            "#
        )
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
