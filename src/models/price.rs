use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use sqlx::FromRow;

/// 价格记录 (prices 表一行)
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PriceRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,    // NUMERIC(12,2)
    pub create_date: String,  // 原样透传, 不校验格式
}

/// 单批次汇总 (只统计本次导入的数据)
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BatchSummary {
    pub total_items: i64,
    pub total_categories: i64,
    pub total_price: BigDecimal,
}

impl BatchSummary {
    pub fn empty() -> Self {
        Self {
            total_items: 0,
            total_categories: 0,
            total_price: BigDecimal::zero(),
        }
    }
}

/// POST /api/v0/prices 响应体
#[derive(Debug, Clone, Serialize)]
pub struct PostPricesResponse {
    pub total_items: i64,
    pub total_categories: i64,
    #[serde(serialize_with = "price_as_number")]
    pub total_price: BigDecimal,
}

impl From<BatchSummary> for PostPricesResponse {
    fn from(summary: BatchSummary) -> Self {
        Self {
            total_items: summary.total_items,
            total_categories: summary.total_categories,
            total_price: summary.total_price,
        }
    }
}

/// JSON 中金额输出为数字而不是字符串
fn price_as_number<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    let rounded = value.round(2);
    match rounded.to_f64() {
        Some(v) => serializer.serialize_f64(v),
        None => Err(serde::ser::Error::custom(format!("price out of range: {}", value))),
    }
}
