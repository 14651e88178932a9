use crate::error::RecordError;
use crate::models::PriceRecord;
use bigdecimal::{BigDecimal, Zero};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::str::FromStr;

/// 固定列数: id,name,category,price,create_date
pub const COLUMN_COUNT: usize = 5;
pub const HEADER: [&str; COLUMN_COUNT] = ["id", "name", "category", "price", "create_date"];

/// 与 prices.price NUMERIC(12,2) 一致
pub const PRICE_PRECISION: i64 = 12;
pub const PRICE_SCALE: i64 = 2;

/// 金额单元格的最大字符数, 超出直接视为无法解析
const MAX_PRICE_TEXT_LEN: usize = 64;

/// 数值列无法解析时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// 置零并保留该行
    #[default]
    ZeroFill,
    /// 丢弃该行 (RowRejected), 不入库也不参与统计
    Reject,
}

/// 单个 CSV 文件的解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub header: Vec<String>,
    pub records: Vec<PriceRecord>,
    /// 列数不等于 5 的行
    pub skipped: usize,
    /// Reject 策略下被拒绝的行
    pub rejected: usize,
}

enum RowOutcome {
    Accepted(PriceRecord),
    Rejected,
}

/// 解析 CSV: 第一行为表头, 列数不对的行直接跳过
pub fn parse_records(input: &[u8], policy: CoercionPolicy) -> Result<ParsedBatch, RecordError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let header = reader.headers()?.clone();
    if header.is_empty() {
        return Err(RecordError::MissingHeader);
    }

    let mut batch = ParsedBatch {
        header: header.iter().map(str::to_string).collect(),
        ..Default::default()
    };

    for row in reader.records() {
        let row = row?;
        if row.len() != COLUMN_COUNT {
            batch.skipped += 1;
            continue;
        }

        match coerce_row(&row, policy) {
            RowOutcome::Accepted(record) => batch.records.push(record),
            RowOutcome::Rejected => {
                let line = row.position().map(|p| p.line()).unwrap_or(0);
                tracing::debug!("第 {} 行数值列无法解析, 已拒绝", line);
                batch.rejected += 1;
            }
        }
    }

    Ok(batch)
}

fn coerce_row(row: &csv::StringRecord, policy: CoercionPolicy) -> RowOutcome {
    let id = row[0].parse::<i64>().ok();
    let price = parse_price(&row[3]);

    let (id, price) = match (id, price, policy) {
        (Some(id), Some(price), _) => (id, price),
        (_, _, CoercionPolicy::Reject) => return RowOutcome::Rejected,
        (id, price, CoercionPolicy::ZeroFill) => (
            id.unwrap_or(0),
            price.unwrap_or_else(BigDecimal::zero),
        ),
    };

    RowOutcome::Accepted(PriceRecord {
        id,
        name: row[1].to_string(),
        category: row[2].to_string(),
        price,
        create_date: row[4].to_string(),
    })
}

/// 金额按两位小数四舍五入; NaN/inf 之类以及超出 NUMERIC(12,2) 的值无法解析
pub fn parse_price(text: &str) -> Option<BigDecimal> {
    if text.len() > MAX_PRICE_TEXT_LEN {
        return None;
    }
    let value = BigDecimal::from_str(text).ok()?;
    let (digits, scale) = value.as_bigint_and_exponent();
    if digits.is_zero() {
        return Some(BigDecimal::zero().with_scale(PRICE_SCALE));
    }

    // 整数部分位数 = 有效数字位数 - scale, 先判断量级再 round, 避免超大 scale 逐位计算
    let digit_count = digits.to_string().trim_start_matches('-').len() as i64;
    let magnitude = digit_count.checked_sub(scale)?;
    if magnitude > PRICE_PRECISION - PRICE_SCALE {
        return None;
    }
    if magnitude < -PRICE_SCALE {
        // 小于 0.001, 四舍五入后为 0
        return Some(BigDecimal::zero().with_scale(PRICE_SCALE));
    }

    let rounded = value.round(PRICE_SCALE);
    let (rounded_digits, rounded_scale) = rounded.as_bigint_and_exponent();
    let rounded_count = rounded_digits.to_string().trim_start_matches('-').len() as i64;
    if !rounded_digits.is_zero() && rounded_count - rounded_scale > PRICE_PRECISION - PRICE_SCALE {
        return None;
    }
    Some(rounded)
}

/// 金额固定输出两位小数
pub fn format_price(price: &BigDecimal) -> String {
    price.round(2).with_scale(2).to_string()
}

/// 序列化为 CSV, 字段含逗号/引号/换行时自动加引号
pub fn format_records(records: &[PriceRecord], include_header: bool) -> Result<Vec<u8>, RecordError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    if include_header {
        writer
            .write_record(HEADER)
            .map_err(|e| RecordError::Write(e.to_string()))?;
    }

    for record in records {
        writer
            .write_record(&[
                record.id.to_string(),
                record.name.clone(),
                record.category.clone(),
                format_price(&record.price),
                record.create_date.clone(),
            ])
            .map_err(|e| RecordError::Write(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| RecordError::Write(e.to_string()))
}
