use crate::error::StoreError;
use crate::models::{BatchSummary, PriceRecord};
use std::future::Future;

/// 价格存储网关
///
/// 管道只通过这两个 trait 访问存储, 由 main 构造具体实现后注入。
pub trait PriceStore: Clone + Send + Sync + 'static {
    type Tx: PriceTx;

    /// 开启事务
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// 按 id 升序读取全部记录
    fn list_all(&self) -> impl Future<Output = Result<Vec<PriceRecord>, StoreError>> + Send;
}

/// 单次导入的事务
///
/// 未提交就被 drop 的事务等同于回滚 (请求被取消时依赖这一点)。
pub trait PriceTx: Send {
    /// 写入事务内的暂存区, 对其他连接不可见
    fn stage(
        &mut self,
        records: &[PriceRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 只统计暂存区
    fn staged_summary(&mut self) -> impl Future<Output = Result<BatchSummary, StoreError>> + Send;

    /// 暂存区整体拷贝进 prices 表, 返回行数
    fn publish(&mut self) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
