use miette::Result;
use miette::miette;
use propx_editor_core::EditorOptions;
use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

/// Which page an image upload comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadSite {
    #[default]
    Blog,
    HelpCenter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API.
    pub api_base_url: String,
    /// Image upload endpoint used by the blog editor.
    pub blog_image_upload_url: String,
    /// Image upload endpoint for help-center articles; falls back to the blog one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_center_image_upload_url: Option<String>,
    /// Bearer token of the signed-in admin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub editor: EditorOptions,
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader
            .load()
            .await
            .map_err(|e| miette!("Failed to load configuration: {e}"))
    }
    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver
            .save(self)
            .await
            .map_err(|e| miette!("Failed to save configuration: {e}"))
    }

    pub fn upload_url(&self, site: UploadSite) -> &str {
        match site {
            UploadSite::Blog => &self.blog_image_upload_url,
            UploadSite::HelpCenter => self
                .help_center_image_upload_url
                .as_deref()
                .unwrap_or(&self.blog_image_upload_url),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://propxpro.run.place/api".to_owned(),
            blog_image_upload_url: "https://api.propxpro.com/api/admin/blogs/images/upload"
                .to_owned(),
            help_center_image_upload_url: None,
            token: None,
            editor: EditorOptions::default(),
        }
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(
        &self,
        config: &Config,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
///
/// The format follows the file extension: `.json` or `.toml`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Loader for FileStore {
    async fn load(
        &self,
    ) -> core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            _ => Err(miette!("Unsupported file format").into()),
        }
    }
}

impl Saver for FileStore {
    async fn save(
        &self,
        config: &Config,
    ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            Some("toml") => Ok(std::fs::write(&self.path, toml::to_string_pretty(config)?)?),
            _ => Err(miette!("Unsupported file format").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toml_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("propx.toml"));
        let config = Config {
            token: Some("secret".into()),
            editor: EditorOptions {
                reconcile_delay_ms: 300,
                ..Default::default()
            },
            ..Default::default()
        };
        config.save(&store).await.expect("save");
        assert_eq!(Config::load(&store).await.expect("load"), config);

        let partial = FileStore::new(dir.path().join("partial.json"));
        std::fs::write(partial.path(), r#"{ "token": "t", "editor": { "max_table_rows": 4 } }"#)
            .expect("write");
        let loaded = Config::load(&partial).await.expect("load");
        assert_eq!(loaded.api_base_url, Config::default().api_base_url);
        assert_eq!(loaded.editor.max_table_rows, 4);
        assert_eq!(loaded.editor.reconcile_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let store = FileStore::new("propx.yaml");
        assert!(Config::load(&store).await.is_err());
    }

    #[test]
    fn test_help_center_falls_back_to_blog_endpoint() {
        let mut config = Config::default();
        assert_eq!(
            config.upload_url(UploadSite::HelpCenter),
            config.upload_url(UploadSite::Blog)
        );
        config.help_center_image_upload_url = Some("https://api.test/help/upload".into());
        assert_eq!(config.upload_url(UploadSite::HelpCenter), "https://api.test/help/upload");
    }
}
