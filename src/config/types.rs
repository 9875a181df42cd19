use crate::config::diagnostics::Diagnostic;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// File name of the bundled default main config, under the bundled root.
pub const BUNDLED_MAIN_FILE: &str = "config.yaml";

/// File name of the bundled factory-default main config.
pub const FACTORY_MAIN_FILE: &str = "config.factory.yaml";

/// File name of the XDG-scope main config, under the XDG config dir.
pub const XDG_MAIN_FILE: &str = "config.yaml";

/// Directory of bundled plugins, under the bundled root.
pub const BUNDLED_PLUGINS_DIR: &str = "plugins";

/// Per-plugin XDG override file name, under `<xdg>/<plugin>/`.
pub const PLUGIN_OVERRIDE_FILE: &str = "default.yaml";

/// Shared base schema, under the bundled root.
pub const BASE_SCHEMA_FILE: &str = "schema/base.schema.yaml";

/// Filesystem roots the resolver reads from.
///
/// All roots are injected so tests can point them at temp directories; the
/// binary fills them from the install location and the XDG config dir.
#[derive(Debug, Clone)]
pub struct ResolverPaths {
	/// Directory holding the shipped main configs, base schema, and the
	/// bundled `plugins/` tree.
	pub bundled_root: PathBuf,

	/// User-global config directory (e.g. `~/.config/mdpress`).
	pub xdg_config_dir: PathBuf,

	/// Explicit project manifest path, if the caller supplied one.
	pub project_manifest: Option<PathBuf>,
}

impl ResolverPaths {
	pub fn bundled_main(&self) -> PathBuf {
		self.bundled_root.join(BUNDLED_MAIN_FILE)
	}

	pub fn factory_main(&self) -> PathBuf {
		self.bundled_root.join(FACTORY_MAIN_FILE)
	}

	pub fn xdg_main(&self) -> PathBuf {
		self.xdg_config_dir.join(XDG_MAIN_FILE)
	}

	pub fn bundled_plugins(&self) -> PathBuf {
		self.bundled_root.join(BUNDLED_PLUGINS_DIR)
	}

	pub fn base_schema(&self) -> PathBuf {
		self.bundled_root.join(BASE_SCHEMA_FILE)
	}
}

/// Why a particular file was selected as the primary main config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReason {
	/// Factory-defaults-only mode was requested.
	FactoryDefault,
	/// An explicit project manifest path was supplied and existed.
	ProjectFlag,
	/// The XDG-scope global file existed.
	XdgGlobal,
	/// The bundled default file existed.
	BundledMain,
	/// Nothing else existed; the factory-default file was used.
	FactoryFallback,
	/// Not even the factory-default file existed.
	NoneFound,
}

impl LoadReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			LoadReason::FactoryDefault => "factory default",
			LoadReason::ProjectFlag => "project (from explicit flag)",
			LoadReason::XdgGlobal => "XDG global",
			LoadReason::BundledMain => "bundled main",
			LoadReason::FactoryFallback => "factory default fallback",
			LoadReason::NoneFound => "none found",
		}
	}
}

/// A top-level configuration document with its provenance.
#[derive(Debug, Clone)]
pub struct MainConfig {
	/// The parsed document (always a mapping; empty on load failure).
	pub document: Value,

	/// Where the document came from, if any file was selected.
	pub path: Option<PathBuf>,

	/// Why that file was selected.
	pub load_reason: LoadReason,
}

impl MainConfig {
	/// An empty document with no backing file.
	pub fn none() -> Self {
		MainConfig {
			document: Value::Mapping(serde_yaml::Mapping::new()),
			path: None,
			load_reason: LoadReason::NoneFound,
		}
	}
}

/// Registration source tier, in ascending precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceTier {
	Bundled,
	CollectionManager,
	XdgFile,
	ProjectFile,
}

impl SourceTier {
	pub fn as_str(&self) -> &'static str {
		match self {
			SourceTier::Bundled => "bundled",
			SourceTier::CollectionManager => "collection",
			SourceTier::XdgFile => "xdg",
			SourceTier::ProjectFile => "project",
		}
	}
}

/// One plugin registration: where its config file lives and which source
/// tier declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRegistryEntry {
	pub config_path: PathBuf,
	pub source_tier: SourceTier,
}

/// The unmerged, as-loaded content of one plugin configuration file.
#[derive(Debug, Clone)]
pub struct RawPluginLayer {
	/// The parsed document.
	pub raw_config: Value,

	/// Stylesheet paths resolved against this layer's own directory.
	pub resolved_css_paths: Vec<PathBuf>,

	/// Whether this layer's stylesheets append to the accumulated list.
	pub inherit_css: bool,

	/// The file this layer was loaded from.
	pub actual_path: PathBuf,
}

/// The final, fully merged configuration bundle returned to callers.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
	/// The merged plugin document. `handler_script` is always the value from
	/// the plugin's own base file regardless of override layers, and
	/// `css_files` holds the final resolved stylesheet list.
	pub plugin_config: Value,

	/// The primary main document, for callers that need global settings.
	pub main_config: Value,

	/// Directory containing the plugin's base config file.
	pub plugin_base_path: PathBuf,

	/// Absolute path of the plugin's handler script (verified to exist).
	pub handler_script_path: PathBuf,

	/// Whether factory-defaults-only mode produced this bundle.
	pub was_factory_defaults: bool,

	/// Final resolved stylesheet list: deduplicated, every entry on disk.
	pub css_files: Vec<PathBuf>,

	/// Human-readable provenance of every file or inline source that
	/// participated in the merge, in application order.
	pub contributing_paths: Vec<String>,

	/// The file subset of `contributing_paths`, for watch mode.
	pub contributing_files: Vec<PathBuf>,

	/// Non-fatal issues observed while producing this bundle.
	pub warnings: Vec<Diagnostic>,
}

impl EffectiveConfig {
	/// The `handler_script` value as declared in the plugin's base file.
	pub fn handler_script(&self) -> &str {
		crate::config::value::get_str(&self.plugin_config, crate::config::value::KEY_HANDLER_SCRIPT)
			.unwrap_or_default()
	}
}

/// Everything a file-watcher needs to monitor, and a diagnostics command
/// needs to explain, about one resolution.
#[derive(Debug, Clone)]
pub struct ConfigFileSources {
	pub main_config_path: Option<PathBuf>,
	pub plugin_config_paths: Vec<PathBuf>,
	pub css_files: Vec<PathBuf>,
}

/// Expand `~`, then resolve a registered plugin path against the directory
/// of the document that declared it.
pub fn resolve_declared_path(
	declared: &str,
	declaring_doc_dir: Option<&Path>,
) -> crate::error::Result<PathBuf> {
	let expanded = crate::config::value::expand_tilde(declared)?;
	if expanded.is_absolute() {
		return Ok(expanded);
	}
	match declaring_doc_dir {
		Some(dir) => Ok(dir.join(expanded)),
		None => Ok(expanded),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_source_tier_precedence_order() {
		assert!(SourceTier::Bundled < SourceTier::CollectionManager);
		assert!(SourceTier::CollectionManager < SourceTier::XdgFile);
		assert!(SourceTier::XdgFile < SourceTier::ProjectFile);
	}

	#[test]
	fn test_resolver_paths_layout() {
		let paths = ResolverPaths {
			bundled_root: PathBuf::from("/opt/mdpress"),
			xdg_config_dir: PathBuf::from("/home/u/.config/mdpress"),
			project_manifest: None,
		};
		assert_eq!(paths.bundled_main(), PathBuf::from("/opt/mdpress/config.yaml"));
		assert_eq!(
			paths.factory_main(),
			PathBuf::from("/opt/mdpress/config.factory.yaml")
		);
		assert_eq!(
			paths.xdg_main(),
			PathBuf::from("/home/u/.config/mdpress/config.yaml")
		);
		assert_eq!(paths.bundled_plugins(), PathBuf::from("/opt/mdpress/plugins"));
	}

	#[test]
	fn test_resolve_declared_path_relative_to_doc_dir() {
		let resolved = resolve_declared_path("plugins/cv", Some(Path::new("/proj"))).unwrap();
		assert_eq!(resolved, PathBuf::from("/proj/plugins/cv"));

		let resolved = resolve_declared_path("/abs/cv", Some(Path::new("/proj"))).unwrap();
		assert_eq!(resolved, PathBuf::from("/abs/cv"));
	}
}
