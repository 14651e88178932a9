use crate::codec::archive::{self, DEFAULT_MAX_MEMBER_BYTES};
use crate::codec::records::{self, CoercionPolicy, ParsedBatch};
use crate::db::{PriceStore, PriceTx};
use crate::error::{IngestError, StoreError};
use crate::models::{BatchSummary, PriceRecord};
use axum::body::Bytes;

/// 上传压缩包中必须包含的文件名
pub const INGEST_MEMBER: &str = "test_data.csv";

/// 导入服务: 解压 -> 解析 -> 事务内暂存 -> 统计 -> 入库 -> 提交
pub struct IngestService<S: PriceStore> {
    store: S,
    policy: CoercionPolicy,
    max_csv_bytes: u64,
}

impl<S: PriceStore> IngestService<S> {
    pub fn new(store: S, policy: CoercionPolicy) -> Self {
        Self {
            store,
            policy,
            max_csv_bytes: DEFAULT_MAX_MEMBER_BYTES,
        }
    }

    /// 解压后 CSV 的大小上限
    pub fn with_max_csv_bytes(mut self, max_csv_bytes: u64) -> Self {
        self.max_csv_bytes = max_csv_bytes;
        self
    }

    /// 导入一个 zip 包, 返回本批次的汇总
    ///
    /// 要么整批可见, 要么完全不可见。存储层任一步失败都会回滚。
    pub async fn ingest(&self, archive_bytes: Bytes) -> Result<BatchSummary, IngestError> {
        let start_time = std::time::Instant::now();

        // 解压和解析是纯 CPU 工作, 放到阻塞线程池
        let policy = self.policy;
        let max_csv_bytes = self.max_csv_bytes;
        let batch = tokio::task::spawn_blocking(move || {
            decode_upload(&archive_bytes, policy, max_csv_bytes)
        })
        .await
        .map_err(|e| IngestError::Internal(format!("decode task failed: {}", e)))??;

        tracing::info!(
            "解析完成: 有效 {} 行, 跳过 {} 行, 拒绝 {} 行",
            batch.records.len(), batch.skipped, batch.rejected
        );

        let mut tx = self.store.begin().await?;

        let loaded = load_batch(&mut tx, &batch.records).await;
        let summary = match loaded {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("✗ 导入失败, 回滚事务: {}", e);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("回滚失败: {}", rollback_err);
                }
                return Err(e.into());
            }
        };

        tx.commit().await?;

        tracing::info!(
            "✓ 导入成功: {} 条, {} 个分类, 合计 {}, 耗时: {:?}",
            summary.total_items, summary.total_categories, summary.total_price,
            start_time.elapsed()
        );
        Ok(summary)
    }
}

fn decode_upload(
    archive_bytes: &[u8],
    policy: CoercionPolicy,
    max_csv_bytes: u64,
) -> Result<ParsedBatch, IngestError> {
    let csv_bytes = archive::open_member(archive_bytes, INGEST_MEMBER, max_csv_bytes)?;
    Ok(records::parse_records(&csv_bytes, policy)?)
}

async fn load_batch<T: PriceTx>(
    tx: &mut T,
    records: &[PriceRecord],
) -> Result<BatchSummary, StoreError> {
    tx.stage(records).await?;

    let summary = tx.staged_summary().await?;

    let published = tx.publish().await?;
    if published != summary.total_items as u64 {
        return Err(StoreError::Unavailable(format!(
            "published {} rows but staged {}",
            published, summary.total_items
        )));
    }

    Ok(summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::archive::create_archive;
    use crate::db::memory::{MemoryPriceStore, MemoryPriceTx};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    /// 在指定步骤失败的存储
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum FailAt {
        Begin,
        Stage,
        Summary,
        Publish,
        Commit,
        ListAll,
    }

    #[derive(Clone)]
    pub struct FailingStore {
        pub inner: MemoryPriceStore,
        pub fail_at: FailAt,
    }

    pub struct FailingTx {
        inner: MemoryPriceTx,
        fail_at: FailAt,
    }

    fn injected(step: FailAt) -> StoreError {
        StoreError::Unavailable(format!("injected failure at {:?}", step))
    }

    impl FailingTx {
        fn check(&self, step: FailAt) -> Result<(), StoreError> {
            if self.fail_at == step {
                Err(injected(step))
            } else {
                Ok(())
            }
        }
    }

    impl PriceStore for FailingStore {
        type Tx = FailingTx;

        async fn begin(&self) -> Result<FailingTx, StoreError> {
            if self.fail_at == FailAt::Begin {
                return Err(injected(FailAt::Begin));
            }
            Ok(FailingTx {
                inner: self.inner.begin().await?,
                fail_at: self.fail_at,
            })
        }

        async fn list_all(&self) -> Result<Vec<PriceRecord>, StoreError> {
            if self.fail_at == FailAt::ListAll {
                return Err(injected(FailAt::ListAll));
            }
            self.inner.list_all().await
        }
    }

    impl PriceTx for FailingTx {
        async fn stage(&mut self, records: &[PriceRecord]) -> Result<(), StoreError> {
            // 先写一半再失败, 模拟中途出错
            let half = records.len() / 2;
            self.inner.stage(&records[..half]).await?;
            self.check(FailAt::Stage)?;
            self.inner.stage(&records[half..]).await
        }

        async fn staged_summary(&mut self) -> Result<BatchSummary, StoreError> {
            self.check(FailAt::Summary)?;
            self.inner.staged_summary().await
        }

        async fn publish(&mut self) -> Result<u64, StoreError> {
            let moved = self.inner.publish().await?;
            self.check(FailAt::Publish)?;
            Ok(moved)
        }

        async fn commit(self) -> Result<(), StoreError> {
            self.check(FailAt::Commit)?;
            self.inner.commit().await
        }

        async fn rollback(self) -> Result<(), StoreError> {
            self.inner.rollback().await
        }
    }

    pub fn upload(csv: &str) -> Bytes {
        create_archive(INGEST_MEMBER, csv.as_bytes()).unwrap().into()
    }

    const SAMPLE: &str = "id,name,category,price,create_date\n\
1,A,cat1,10.00,2024-01-01\n\
2,B,cat1,5.50,2024-01-02\n\
3,C,cat2,4.50,2024-01-03\n";

    async fn seeded_store() -> MemoryPriceStore {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);
        service
            .ingest(upload("id,name,category,price,create_date\n100,Old,legacy,99.99,2020-01-01\n"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn summary_matches_uploaded_batch() {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);

        let summary = service.ingest(upload(SAMPLE)).await.unwrap();

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_categories, 2);
        assert_eq!(summary.total_price, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn summary_ignores_previously_stored_rows() {
        let store = seeded_store().await;
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);

        let summary = service.ingest(upload(SAMPLE)).await.unwrap();

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_categories, 2);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn short_rows_are_excluded_without_failing() {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);

        let csv = format!("{}4,D,cat3,1.00\n", SAMPLE);
        let summary = service.ingest(upload(&csv)).await.unwrap();

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_categories, 2);
        assert!(store.list_all().await.unwrap().iter().all(|r| r.id != 4));
    }

    #[tokio::test]
    async fn rejected_rows_are_excluded_from_summary() {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::Reject);

        let csv = format!("{}x,E,cat9,1.00,2024-01-04\n", SAMPLE);
        let summary = service.ingest(upload(&csv)).await.unwrap();

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_categories, 2);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn missing_member_is_bad_input() {
        let store = seeded_store().await;
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);

        let archive = create_archive("other.csv", SAMPLE.as_bytes()).unwrap();
        let err = service.ingest(archive.into()).await.unwrap_err();

        assert!(matches!(err, IngestError::BadInput(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_archive_is_bad_input() {
        let service = IngestService::new(MemoryPriceStore::new(), CoercionPolicy::ZeroFill);
        let err = service
            .ingest(Bytes::from_static(b"PK\x03\x04 truncated"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::BadInput(_)));
    }

    #[tokio::test]
    async fn csv_larger_than_limit_is_bad_input() {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill)
            .with_max_csv_bytes(1 << 10);

        let csv = format!("{}{}", SAMPLE, "0".repeat(1 << 20));
        let err = service.ingest(upload(&csv)).await.unwrap_err();

        assert!(matches!(err, IngestError::BadInput(msg) if msg.contains("exceeds")));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_prices_do_not_reach_storage() {
        let store = MemoryPriceStore::new();
        let service = IngestService::new(store.clone(), CoercionPolicy::ZeroFill);

        let csv = format!("{}4,D,cat3,1e20,d4\n5,E,cat3,1e-99999999999,d5\n", SAMPLE);
        let summary = service.ingest(upload(&csv)).await.unwrap();

        assert_eq!(summary.total_items, 5);
        assert_eq!(summary.total_price, BigDecimal::from_str("20.00").unwrap());
    }

    #[tokio::test]
    async fn empty_csv_is_bad_input() {
        let service = IngestService::new(MemoryPriceStore::new(), CoercionPolicy::ZeroFill);
        let err = service.ingest(upload("")).await.unwrap_err();
        assert!(matches!(err, IngestError::BadInput(_)));
    }

    #[tokio::test]
    async fn storage_failures_roll_back_everything() {
        for fail_at in [
            FailAt::Begin,
            FailAt::Stage,
            FailAt::Summary,
            FailAt::Publish,
            FailAt::Commit,
        ] {
            let inner = seeded_store().await;
            let store = FailingStore {
                inner: inner.clone(),
                fail_at,
            };
            let service = IngestService::new(store, CoercionPolicy::ZeroFill);

            let err = service.ingest(upload(SAMPLE)).await.unwrap_err();

            assert!(
                matches!(err, IngestError::StorageFailure(_)),
                "{:?} should be a storage failure",
                fail_at
            );
            assert_eq!(inner.len(), 1, "rows leaked after failure at {:?}", fail_at);
        }
    }
}
