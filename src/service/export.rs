use crate::codec::{archive, records};
use crate::db::PriceStore;
use crate::error::ExportError;

/// 导出压缩包中的文件名
pub const EXPORT_MEMBER: &str = "data.csv";

/// 导出服务: 全量读取 -> CSV -> zip
pub struct ExportService<S: PriceStore> {
    store: S,
    include_header: bool,
}

impl<S: PriceStore> ExportService<S> {
    /// 默认 data.csv 只包含数据行, 不写表头
    pub fn new(store: S) -> Self {
        Self {
            store,
            include_header: false,
        }
    }

    /// 在 data.csv 第一行写入表头, 导出文件可直接重新上传
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    /// 生成完整的 zip 字节, 出错时不会返回任何部分内容
    pub async fn export(&self) -> Result<Vec<u8>, ExportError> {
        let rows = self.store.list_all().await?;
        let csv_bytes = records::format_records(&rows, self.include_header)?;
        let archive_bytes = archive::create_archive(EXPORT_MEMBER, &csv_bytes)?;

        tracing::info!("导出 {} 条记录, zip {} 字节", rows.len(), archive_bytes.len());
        Ok(archive_bytes)
    }
}
