use std::path::PathBuf;

/// Library-level structured errors for mdpress.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
///
/// Only structurally fatal problems live here. Recoverable issues (schema
/// typos, missing override files, unparsable main documents) are reported
/// through [`crate::config::Diagnostic`] instead and never abort resolution.
#[derive(Debug, thiserror::Error)]
pub enum MdpressError {
	#[error("Plugin '{name}' is not registered in any configuration source")]
	PluginNotRegistered { name: String },

	#[error("Plugin '{name}' is registered at {path}, but that file no longer exists")]
	RegisteredConfigMissing { name: String, path: PathBuf },

	#[error(
		"Relative plugin path '{spec}' cannot be resolved here; use an absolute path or a registered plugin name"
	)]
	RelativeSpecNotAllowed { spec: String },

	#[error("No '*.config.yaml' file found in plugin directory: {dir}")]
	NoConfigInDirectory { dir: PathBuf },

	#[error("Plugin path does not exist: {path}")]
	PluginPathNotFound { path: PathBuf },

	#[error("Failed to read plugin config file: {path}")]
	PluginConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse plugin config file: {path}")]
	PluginConfigParse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("Plugin config is not a YAML mapping: {path}")]
	PluginConfigNotAMapping { path: PathBuf },

	#[error("Plugin '{plugin}' does not declare 'handler_script' in {path}")]
	MissingHandlerScript { plugin: String, path: PathBuf },

	#[error("Handler script for plugin '{plugin}' not found: {path}")]
	HandlerScriptNotFound { plugin: String, path: PathBuf },

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using MdpressError.
pub type Result<T> = std::result::Result<T, MdpressError>;
