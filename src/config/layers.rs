use crate::config::diagnostics::Diagnostic;
use crate::config::main_config::MainConfigSet;
use crate::config::types::{
	PLUGIN_OVERRIDE_FILE, RawPluginLayer, ResolverPaths, resolve_declared_path,
};
use crate::config::value::{
	KEY_CSS_FILES, KEY_INHERIT_CSS, deep_merge, get_bool_or, get_mapping, string_sequence,
};
use crate::css;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Result of applying the override layers on top of a plugin's base config.
#[derive(Debug)]
pub struct MergedLayers {
	pub merged_config: Value,
	pub merged_css_paths: Vec<PathBuf>,
	pub contributing_paths: Vec<String>,
	pub contributing_files: Vec<PathBuf>,
}

/// Apply the four override layers to a plugin's layer-0 data, in fixed
/// order: XDG file, XDG inline, project file, project inline. Each layer is
/// a deep merge; each layer's stylesheets merge under its own
/// `inherit_css` flag, resolved against the layer's own directory.
///
/// Under factory-defaults-only the layer-0 data passes through untouched.
pub fn apply_override_layers(
	paths: &ResolverPaths,
	factory_defaults_only: bool,
	mains: &MainConfigSet,
	plugin_name: &str,
	layer0: &RawPluginLayer,
	contributing_paths: Vec<String>,
	contributing_files: Vec<PathBuf>,
	diagnostics: &mut Vec<Diagnostic>,
) -> MergedLayers {
	let mut state = MergedLayers {
		merged_config: layer0.raw_config.clone(),
		merged_css_paths: layer0.resolved_css_paths.clone(),
		contributing_paths,
		contributing_files,
	};

	if factory_defaults_only {
		return state;
	}

	// Layer 1: XDG file.
	let xdg_override = paths
		.xdg_config_dir
		.join(plugin_name)
		.join(PLUGIN_OVERRIDE_FILE);
	if xdg_override.is_file()
		&& let Some(layer) = try_load_layer(&xdg_override, diagnostics)
	{
		let base_dir = xdg_override.parent().unwrap_or(Path::new(".")).to_path_buf();
		state.contributing_files.push(xdg_override.clone());
		merge_layer(
			&mut state,
			&layer,
			&base_dir,
			xdg_override.display().to_string(),
			plugin_name,
			diagnostics,
		);
	}

	// Layer 2: XDG inline.
	apply_inline_layer(&mut state, mains, Scope::Xdg, plugin_name, diagnostics);

	// Layer 3: project file, from the project `plugins:` map.
	let project = mains.project();
	if let Some(declared) = get_mapping(&project.document, "plugins")
		.and_then(|plugins| plugins.get(plugin_name))
		.and_then(Value::as_str)
	{
		let project_dir = project.path.as_deref().and_then(Path::parent);
		match resolve_declared_path(declared, project_dir) {
			Ok(path) if path.is_file() => {
				if let Some(layer) = try_load_layer(&path, diagnostics) {
					let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
					state.contributing_files.push(path.clone());
					merge_layer(
						&mut state,
						&layer,
						&base_dir,
						path.display().to_string(),
						plugin_name,
						diagnostics,
					);
				}
			}
			Ok(path) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Override file for plugin '{}' declared in project config but missing: {}",
					plugin_name,
					path.display()
				)));
			}
			Err(err) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Cannot resolve override path '{declared}' for plugin '{plugin_name}': {err}"
				)));
			}
		}
	}

	// Layer 4: project inline.
	apply_inline_layer(&mut state, mains, Scope::Project, plugin_name, diagnostics);

	state
}

#[derive(Clone, Copy)]
enum Scope {
	Xdg,
	Project,
}

impl Scope {
	fn as_str(&self) -> &'static str {
		match self {
			Scope::Xdg => "XDG",
			Scope::Project => "project",
		}
	}
}

/// Merge an inline override: a key equal to the plugin name, with a mapping
/// value, in the scope's main document. Relative stylesheet paths resolve
/// against the declaring document's directory.
fn apply_inline_layer(
	state: &mut MergedLayers,
	mains: &MainConfigSet,
	scope: Scope,
	plugin_name: &str,
	diagnostics: &mut Vec<Diagnostic>,
) {
	let main = match scope {
		Scope::Xdg => mains.xdg(),
		Scope::Project => mains.project(),
	};
	let Some(inline) = get_mapping(&main.document, plugin_name) else {
		return;
	};

	let doc_path = main
		.path
		.as_deref()
		.map(|p| p.display().to_string())
		.unwrap_or_else(|| "<unknown>".to_string());
	let base_dir = main
		.path
		.as_deref()
		.and_then(Path::parent)
		.unwrap_or(Path::new("."))
		.to_path_buf();

	merge_layer(
		state,
		&Value::Mapping(inline.clone()),
		&base_dir,
		format!("Inline override from {} main config: {}", scope.as_str(), doc_path),
		plugin_name,
		diagnostics,
	);
}

/// Deep-merge one layer into the accumulated state and apply its
/// stylesheet declarations.
fn merge_layer(
	state: &mut MergedLayers,
	layer: &Value,
	base_dir: &Path,
	provenance: String,
	plugin_name: &str,
	diagnostics: &mut Vec<Diagnostic>,
) {
	let declared = string_sequence(layer, KEY_CSS_FILES);
	let inherit = get_bool_or(layer, KEY_INHERIT_CSS, true);
	if !declared.is_empty() || !inherit {
		state.merged_css_paths = css::resolve_and_merge(
			&declared,
			base_dir,
			&state.merged_css_paths,
			inherit,
			plugin_name,
			&provenance,
			diagnostics,
		);
	}

	state.merged_config = deep_merge(&state.merged_config, layer);
	state.contributing_paths.push(provenance);
}

/// Load one override file, skipping the layer (with a warning) when it
/// cannot be read or parsed, or is not a mapping.
fn try_load_layer(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Option<Value> {
	let content = match std::fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Skipping override file {}: {}",
				path.display(),
				err
			)));
			return None;
		}
	};
	match serde_yaml::from_str::<Value>(&content) {
		Ok(value @ Value::Mapping(_)) => Some(value),
		Ok(Value::Null) => None,
		Ok(_) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Skipping override file {}: not a YAML mapping",
				path.display()
			)));
			None
		}
		Err(err) => {
			diagnostics.push(Diagnostic::warning(format!(
				"Skipping override file {}: {}",
				path.display(),
				err
			)));
			None
		}
	}
}
