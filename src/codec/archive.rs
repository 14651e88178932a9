use crate::error::ArchiveError;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// 解压后成员大小的默认上限
pub const DEFAULT_MAX_MEMBER_BYTES: u64 = 256 << 20;

/// 从 zip 字节中读取指定成员 (名称完全匹配, 不做路径归一化/大小写折叠)
///
/// 解压后超过 `max_bytes` 视为损坏, 不信任压缩包里声明的大小。
pub fn open_member(
    archive_bytes: &[u8],
    member_name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

    let mut member = match archive.by_name(member_name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::NotFound(member_name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let capacity = member.size().min(max_bytes).min(1 << 20) as usize;
    let mut content = Vec::with_capacity(capacity);
    member
        .by_ref()
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", member_name, e)))?;

    if content.len() as u64 > max_bytes {
        return Err(ArchiveError::Corrupt(format!(
            "{} exceeds {} bytes when decompressed",
            member_name, max_bytes
        )));
    }

    tracing::debug!("解压 {} 完成, {} 字节", member_name, content.len());
    Ok(content)
}

/// 创建只包含一个成员的 zip
pub fn create_archive(member_name: &str, content: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(member_name, options)?;
    writer.write_all(content)?;
    let cursor = writer.finish()?;

    Ok(cursor.into_inner())
}
