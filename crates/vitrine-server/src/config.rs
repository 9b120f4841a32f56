use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use vitrine_storage::drive::{DriveBackend, DriveConfig};
use vitrine_storage::object_store::{ObjectStoreBackend, ObjectStoreConfig};
use vitrine_storage::{LocalBackend, MediaBackend};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Admin token guarding mutation routes; mutations are open when unset
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Storage backend selection and settings
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            admin_token: None,
            storage: StorageConfig::default(),
        }
    }
}

/// Which backend to activate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Local filesystem
    #[default]
    Local,
    /// S3-compatible object store behind a CDN
    ObjectStore,
    /// Google Drive
    Drive,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "object-store" | "objectstore" | "s3" => Ok(BackendKind::ObjectStore),
            "drive" => Ok(BackendKind::Drive),
            other => anyhow::bail!("unknown storage backend: {other}"),
        }
    }
}

/// Storage selection plus per-backend settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Active backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Local filesystem settings
    #[serde(default)]
    pub local: LocalSettings,

    /// Object store settings; required when `backend = "object-store"`
    #[serde(default, rename = "object-store")]
    pub object_store: Option<ObjectStoreSettings>,

    /// Drive settings; required when `backend = "drive"`
    #[serde(default)]
    pub drive: Option<DriveSettings>,
}

/// Local filesystem backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Web-servable root; uploads land under `<public_dir>/uploads/<folder>`
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// Directory holding the JSON blobs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            public_dir: default_public_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// Object store backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// Bucket name
    #[serde(default)]
    pub bucket: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// CDN base URL serving the bucket
    #[serde(default)]
    pub public_base_url: String,
}

/// Drive backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveSettings {
    /// OAuth bearer token; usually supplied via `VITRINE_DRIVE_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    /// Folder key to Drive folder id
    #[serde(default)]
    pub folders: HashMap<String, String>,
    /// Drive folder id holding the JSON blobs
    #[serde(default)]
    pub data_folder_id: Option<String>,
}

impl ServerConfig {
    /// Load configuration from `vitrine.toml` (when present) and apply
    /// environment overrides for the selector and credentials.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("vitrine.toml");

        let mut config: ServerConfig = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            tracing::info!("No config file found, using defaults");
            ServerConfig::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Environment overrides: the backend selector plus per-backend
    /// credentials/locations that should not live in a checked-in file.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("VITRINE_STORAGE") {
            self.storage.backend = BackendKind::parse(&value)?;
        }
        if let Ok(value) = std::env::var("VITRINE_ADMIN_TOKEN") {
            self.admin_token = Some(value);
        }

        if let Ok(bucket) = std::env::var("VITRINE_S3_BUCKET") {
            self.storage.object_store.get_or_insert_with(Default::default).bucket = bucket;
        }
        if let Ok(endpoint) = std::env::var("VITRINE_S3_ENDPOINT") {
            self.storage
                .object_store
                .get_or_insert_with(Default::default)
                .endpoint = Some(endpoint);
        }
        if let Ok(base) = std::env::var("VITRINE_CDN_BASE_URL") {
            self.storage
                .object_store
                .get_or_insert_with(Default::default)
                .public_base_url = base;
        }

        if let Ok(token) = std::env::var("VITRINE_DRIVE_TOKEN") {
            self.storage.drive.get_or_insert_with(Default::default).token = Some(token);
        }
        if let Ok(id) = std::env::var("VITRINE_DRIVE_DATA_FOLDER") {
            self.storage
                .drive
                .get_or_insert_with(Default::default)
                .data_folder_id = Some(id);
        }
        for folder in ["carousel", "gallery"] {
            let var = format!("VITRINE_DRIVE_FOLDER_{}", folder.to_uppercase());
            if let Ok(id) = std::env::var(&var) {
                self.storage
                    .drive
                    .get_or_insert_with(Default::default)
                    .folders
                    .insert(folder.to_string(), id);
            }
        }

        Ok(())
    }

    /// Get the full bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Construct the configured backend, validating its settings up front.
///
/// This is the only place that inspects which backend is active; everything
/// downstream sees `Arc<dyn MediaBackend>`.
pub async fn build_backend(storage: &StorageConfig) -> Result<Arc<dyn MediaBackend>> {
    match storage.backend {
        BackendKind::Local => {
            let backend =
                LocalBackend::new(&storage.local.public_dir, &storage.local.data_dir).await?;
            Ok(Arc::new(backend))
        }
        BackendKind::ObjectStore => {
            let settings = storage.object_store.as_ref().context(
                "object-store backend selected but [storage.object-store] is not configured",
            )?;
            let backend = ObjectStoreBackend::new(ObjectStoreConfig {
                bucket: settings.bucket.clone(),
                endpoint: settings.endpoint.clone(),
                public_base_url: settings.public_base_url.clone(),
            })
            .await?;
            Ok(Arc::new(backend))
        }
        BackendKind::Drive => {
            let settings = storage
                .drive
                .as_ref()
                .context("drive backend selected but [storage.drive] is not configured")?;
            let token = settings
                .token
                .clone()
                .context("drive backend requires a token (VITRINE_DRIVE_TOKEN)")?;
            let data_folder_id = settings
                .data_folder_id
                .clone()
                .context("drive backend requires data_folder_id")?;
            let backend = DriveBackend::new(DriveConfig::new(
                token,
                settings.folders.clone(),
                data_folder_id,
            ))?;
            Ok(Arc::new(backend))
        }
    }
}
