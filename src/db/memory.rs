use crate::db::store::{PriceStore, PriceTx};
use crate::error::StoreError;
use crate::models::{BatchSummary, PriceRecord};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use std::sync::{Arc, RwLock};

/// 内存实现, 用于测试和本地无数据库运行
#[derive(Clone, Default)]
pub struct MemoryPriceStore {
    rows: Arc<RwLock<Vec<PriceRecord>>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 暂存区只存在于事务对象里, 提交前对读者不可见
pub struct MemoryPriceTx {
    rows: Arc<RwLock<Vec<PriceRecord>>>,
    staged: Vec<PriceRecord>,
    published: Vec<PriceRecord>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl PriceStore for MemoryPriceStore {
    type Tx = MemoryPriceTx;

    async fn begin(&self) -> Result<MemoryPriceTx, StoreError> {
        Ok(MemoryPriceTx {
            rows: self.rows.clone(),
            staged: Vec::new(),
            published: Vec::new(),
        })
    }

    async fn list_all(&self) -> Result<Vec<PriceRecord>, StoreError> {
        let mut records = self.rows.read().map_err(|_| poisoned())?.clone();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

impl PriceTx for MemoryPriceTx {
    async fn stage(&mut self, records: &[PriceRecord]) -> Result<(), StoreError> {
        self.staged.extend_from_slice(records);
        Ok(())
    }

    async fn staged_summary(&mut self) -> Result<BatchSummary, StoreError> {
        Ok(summarize(&self.staged))
    }

    async fn publish(&mut self) -> Result<u64, StoreError> {
        let moved = self.staged.len() as u64;
        self.published.append(&mut self.staged);
        Ok(moved)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.extend(self.published);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// 计数 / 分类去重计数 / 金额合计
pub fn summarize(records: &[PriceRecord]) -> BatchSummary {
    let categories: IndexSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let total_price = records
        .iter()
        .fold(BigDecimal::zero(), |acc, r| acc + &r.price);

    BatchSummary {
        total_items: records.len() as i64,
        total_categories: categories.len() as i64,
        total_price,
    }
}
