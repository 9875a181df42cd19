//! Collection-manager integration.
//!
//! Collections are fetched and activated by a separate tool; this crate only
//! consumes its enabled-plugin manifest. The [`CollectionSource`] trait keeps
//! that dependency injectable so tests can count how often the registry
//! actually consults it.

use crate::config::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Manifest file name under the collections root.
pub const ENABLED_MANIFEST_FILE: &str = "enabled.yaml";

/// One enabled plugin, as recorded by the collection manager.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EnabledPlugin {
	/// The name this plugin is invoked by.
	pub invoke_name: String,

	/// The collection the plugin came from.
	pub collection_name: String,

	/// The plugin's identifier within its collection.
	pub plugin_id: String,

	/// Absolute path of the plugin's config file.
	pub config_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct EnabledManifest {
	#[serde(default)]
	enabled_plugins: Vec<EnabledPlugin>,
}

/// Source of collection-manager plugin registrations.
pub trait CollectionSource {
	/// The enabled plugins, in manifest order. A missing or malformed
	/// manifest yields an empty list plus a warning, never an error.
	fn enabled_plugins(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<EnabledPlugin>;
}

/// File-backed collection source reading `enabled.yaml` from a collections
/// root directory.
#[derive(Debug, Clone)]
pub struct ManifestCollectionSource {
	manifest_path: PathBuf,
}

impl ManifestCollectionSource {
	pub fn new(collections_root: &Path) -> Self {
		ManifestCollectionSource {
			manifest_path: collections_root.join(ENABLED_MANIFEST_FILE),
		}
	}

	pub fn manifest_path(&self) -> &Path {
		&self.manifest_path
	}
}

impl CollectionSource for ManifestCollectionSource {
	fn enabled_plugins(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<EnabledPlugin> {
		let content = match std::fs::read_to_string(&self.manifest_path) {
			Ok(content) => content,
			// No manifest simply means no collections are enabled.
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
			Err(err) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Could not read collections manifest {}: {}",
					self.manifest_path.display(),
					err
				)));
				return Vec::new();
			}
		};

		match serde_yaml::from_str::<EnabledManifest>(&content) {
			Ok(manifest) => manifest.enabled_plugins,
			Err(err) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Could not parse collections manifest {}: {}",
					self.manifest_path.display(),
					err
				)));
				Vec::new()
			}
		}
	}
}
