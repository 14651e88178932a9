use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// 进程内存储, 重启即丢失, 仅用于本地调试
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 上传文件大小上限 (字节)
    pub max_upload_bytes: usize,
    /// 解压后 CSV 大小上限 (字节)
    pub max_csv_bytes: u64,
    /// true: 数值列无法解析的行直接拒绝; false: 置零保留
    pub reject_invalid_numbers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// data.csv 是否写表头 (默认只写数据行)
    pub include_header: bool,
}

/// 环境变量 -> 配置键
const ENV_KEYS: [(&str, &str); 9] = [
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("STORAGE_BACKEND", "database.backend"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("INGEST_MAX_UPLOAD_BYTES", "ingest.max_upload_bytes"),
    ("INGEST_MAX_CSV_BYTES", "ingest.max_csv_bytes"),
    ("INGEST_REJECT_INVALID_NUMBERS", "ingest.reject_invalid_numbers"),
    ("EXPORT_INCLUDE_HEADER", "export.include_header"),
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: "postgres://localhost/prices".to_string(),
                max_connections: 20,
            },
            ingest: IngestConfig {
                max_upload_bytes: 32 << 20,
                max_csv_bytes: 256 << 20,
                reject_invalid_numbers: false,
            },
            export: ExportConfig {
                include_header: false,
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 默认值 + lookup 返回的覆盖项
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("ingest.max_upload_bytes", defaults.ingest.max_upload_bytes as i64)?
            .set_default("ingest.max_csv_bytes", defaults.ingest.max_csv_bytes as i64)?
            .set_default("ingest.reject_invalid_numbers", defaults.ingest.reject_invalid_numbers)?
            .set_default("export.include_header", defaults.export.include_header)?;

        for (env_key, config_key) in ENV_KEYS {
            builder = builder.set_override_option(config_key, lookup(env_key))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
