use crate::collection::CollectionSource;
use crate::config::diagnostics::Diagnostic;
use crate::config::main_config::MainConfigSet;
use crate::config::types::{PluginRegistryEntry, ResolverPaths, SourceTier, resolve_declared_path};
use crate::config::value::get_mapping;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Suffix of plugin base config files.
pub const PLUGIN_CONFIG_SUFFIX: &str = ".config.yaml";

/// Plugin name → registry entry, from all registration sources.
pub type PluginRegistry = BTreeMap<String, PluginRegistryEntry>;

/// Build the plugin registry by merging four registration sources in
/// ascending precedence: bundled, collection manager, XDG `plugins:` map,
/// project `plugins:` map. Later sources overwrite earlier ones per name.
///
/// Under factory-defaults-only, only the bundled scan contributes.
pub fn build_registry(
	paths: &ResolverPaths,
	factory_defaults_only: bool,
	mains: &MainConfigSet,
	collections: Option<&dyn CollectionSource>,
	diagnostics: &mut Vec<Diagnostic>,
) -> PluginRegistry {
	let mut registry = PluginRegistry::new();

	register_bundled(&paths.bundled_plugins(), &mut registry, diagnostics);

	if factory_defaults_only {
		return registry;
	}

	if let Some(source) = collections {
		for plugin in source.enabled_plugins(diagnostics) {
			registry.insert(
				plugin.invoke_name,
				PluginRegistryEntry {
					config_path: plugin.config_path,
					source_tier: SourceTier::CollectionManager,
				},
			);
		}
	}

	register_from_document(
		&mains.xdg().document,
		mains.xdg().path.as_deref(),
		SourceTier::XdgFile,
		&mut registry,
		diagnostics,
	);

	register_from_document(
		&mains.project().document,
		mains.project().path.as_deref(),
		SourceTier::ProjectFile,
		&mut registry,
		diagnostics,
	);

	registry
}

/// Scan the bundled plugin directory: every subdirectory containing a
/// `<dirname>.config.yaml` becomes one Bundled-tier entry.
fn register_bundled(
	plugins_dir: &Path,
	registry: &mut PluginRegistry,
	diagnostics: &mut Vec<Diagnostic>,
) {
	let entries = match std::fs::read_dir(plugins_dir) {
		Ok(entries) => entries,
		Err(err) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Could not scan bundled plugin directory {}: {}",
				plugins_dir.display(),
				err
			)));
			return;
		}
	};

	for entry in entries.flatten() {
		let path = entry.path();
		if !path.is_dir() {
			continue;
		}
		let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
			continue;
		};
		let config_path = path.join(format!("{name}{PLUGIN_CONFIG_SUFFIX}"));
		if config_path.is_file() {
			registry.insert(
				name.to_string(),
				PluginRegistryEntry {
					config_path,
					source_tier: SourceTier::Bundled,
				},
			);
		}
	}
}

/// Register plugins declared in a main document's `plugins:` name→path map.
/// Paths expand `~` and resolve relative to the declaring document's
/// directory.
fn register_from_document(
	document: &Value,
	document_path: Option<&Path>,
	tier: SourceTier,
	registry: &mut PluginRegistry,
	diagnostics: &mut Vec<Diagnostic>,
) {
	let Some(declared) = get_mapping(document, "plugins") else {
		return;
	};
	let doc_dir = document_path.and_then(Path::parent);

	for (name, value) in declared {
		let (Some(name), Some(declared_path)) = (name.as_str(), value.as_str()) else {
			diagnostics.push(Diagnostic::warning(format!(
				"Ignoring malformed plugins entry in {} config{}",
				tier.as_str(),
				document_path
					.map(|p| format!(" ({})", p.display()))
					.unwrap_or_default()
			)));
			continue;
		};

		match resolve_declared_path(declared_path, doc_dir) {
			Ok(config_path) => {
				registry.insert(
					name.to_string(),
					PluginRegistryEntry {
						config_path,
						source_tier: tier,
					},
				);
			}
			Err(err) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Ignoring plugin '{}' from {} config: {}",
					name,
					tier.as_str(),
					err
				)));
			}
		}
	}
}
