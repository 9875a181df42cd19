use crate::collection::CollectionSource;
use crate::config::diagnostics::Diagnostic;
use crate::config::layers::apply_override_layers;
use crate::config::main_config::MainConfigSet;
use crate::config::registry::{PLUGIN_CONFIG_SUFFIX, PluginRegistry, build_registry};
use crate::config::schema::SchemaSet;
use crate::config::types::{ConfigFileSources, EffectiveConfig, RawPluginLayer, ResolverPaths};
use crate::config::value::{
	KEY_CSS_FILES, KEY_HANDLER_SCRIPT, KEY_INHERIT_CSS, deep_merge, expand_tilde, get_bool_or,
	get_mapping, get_str, load_yaml_file, string_sequence,
};
use crate::css;
use crate::error::{MdpressError, Result};
use once_cell::unsync::OnceCell;
use serde_yaml::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Suffix of optional per-plugin schema files, sibling to the config file.
const PLUGIN_SCHEMA_SUFFIX: &str = ".schema.yaml";

/// Main-document keys holding the global option groups merged underneath
/// every plugin's own groups.
const GLOBAL_PDF_KEY: &str = "global_pdf_options";
const PDF_GROUP_KEY: &str = "pdf_options";
const GLOBAL_MATH_KEY: &str = "global_math";
const MATH_GROUP_KEY: &str = "math";

/// Behavioral switches fixed at construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverOptions {
	/// Isolation mode: only bundled sources contribute anywhere.
	pub factory_defaults_only: bool,

	/// Whether a relative path spec may be resolved against the current
	/// working directory. Off for specs coming from config data, where a
	/// relative path would be ambiguous.
	pub allow_cwd_relative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	plugin_name: String,
	spec_was_path: bool,
	base_config_path: PathBuf,
	factory_defaults_only: bool,
	primary_main_path: Option<PathBuf>,
	local_overrides: String,
	markdown_path: Option<PathBuf>,
}

/// The orchestrator and sole entry point for configuration resolution.
///
/// Inputs (paths, options, collection source) are immutable after
/// construction; the main-config set and plugin registry are built at most
/// once per instance, and effective configs are cached per distinct input
/// combination for the instance's lifetime. To observe changed inputs,
/// construct a new resolver.
pub struct ConfigResolver {
	paths: ResolverPaths,
	options: ResolverOptions,
	collections: Option<Box<dyn CollectionSource>>,
	schemas: SchemaSet,
	mains: OnceCell<MainConfigSet>,
	registry: OnceCell<PluginRegistry>,
	pending_diagnostics: RefCell<Vec<Diagnostic>>,
	cache: RefCell<HashMap<CacheKey, Rc<EffectiveConfig>>>,
}

impl ConfigResolver {
	/// Construct a resolver. The schema set is compiled here, eagerly; a
	/// missing base schema disables validation and leaves a critical
	/// diagnostic pending.
	pub fn new(
		paths: ResolverPaths,
		options: ResolverOptions,
		collections: Option<Box<dyn CollectionSource>>,
	) -> Self {
		let mut diagnostics = Vec::new();
		let schemas = SchemaSet::compile(&paths, &mut diagnostics);
		ConfigResolver {
			paths,
			options,
			collections,
			schemas,
			mains: OnceCell::new(),
			registry: OnceCell::new(),
			pending_diagnostics: RefCell::new(diagnostics),
			cache: RefCell::new(HashMap::new()),
		}
	}

	pub fn paths(&self) -> &ResolverPaths {
		&self.paths
	}

	pub fn options(&self) -> ResolverOptions {
		self.options
	}

	/// The three main documents, built on first use.
	pub fn main_configs(&self) -> &MainConfigSet {
		self.mains.get_or_init(|| {
			let mut diagnostics = self.pending_diagnostics.borrow_mut();
			MainConfigSet::load(&self.paths, self.options.factory_defaults_only, &mut diagnostics)
		})
	}

	/// The plugin registry, built on first use. Repeated calls return the
	/// memoized map without touching the filesystem or the collection
	/// source again.
	pub fn plugin_registry(&self) -> &PluginRegistry {
		if self.registry.get().is_none() {
			let mains = self.main_configs();
			let mut diagnostics = Vec::new();
			let built = build_registry(
				&self.paths,
				self.options.factory_defaults_only,
				mains,
				self.collections.as_deref(),
				&mut diagnostics,
			);
			self.pending_diagnostics.borrow_mut().extend(diagnostics);
			let _ = self.registry.set(built);
		}
		self.registry.get().expect("registry initialized above")
	}

	/// Drain diagnostics produced outside an `effective_config` call
	/// (schema compilation, lazy builds triggered by registry listings).
	pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
		self.pending_diagnostics.borrow_mut().drain(..).collect()
	}

	/// Resolve a plugin spec and produce the fully merged configuration
	/// bundle. Repeated calls with identical inputs are pure memory reads.
	pub fn effective_config(
		&self,
		plugin_spec: &str,
		local_overrides: Option<&Value>,
		markdown_path: Option<&Path>,
	) -> Result<Rc<EffectiveConfig>> {
		let mut diagnostics = Vec::new();
		let located = self.locate_plugin(plugin_spec)?;

		let key = CacheKey {
			plugin_name: located.name.clone(),
			spec_was_path: located.spec_was_path,
			base_config_path: located.config_path.clone(),
			factory_defaults_only: self.options.factory_defaults_only,
			primary_main_path: self.main_configs().primary().path.clone(),
			local_overrides: local_overrides
				.map(|value| serde_yaml::to_string(value).unwrap_or_default())
				.unwrap_or_default(),
			markdown_path: markdown_path.map(Path::to_path_buf),
		};

		if let Some(hit) = self.cache.borrow().get(&key).cloned() {
			return Ok(hit);
		}

		// Anything the lazy builds reported belongs to the call that
		// triggered them.
		diagnostics.extend(self.pending_diagnostics.borrow_mut().drain(..));

		let effective = Rc::new(self.resolve_uncached(
			&located,
			local_overrides,
			markdown_path,
			diagnostics,
		)?);
		self.cache.borrow_mut().insert(key, effective.clone());
		Ok(effective)
	}

	/// Everything a watcher needs to monitor about one resolution, and a
	/// diagnostics command needs to explain.
	pub fn config_file_sources(
		&self,
		plugin_spec: &str,
		local_overrides: Option<&Value>,
		markdown_path: Option<&Path>,
	) -> Result<ConfigFileSources> {
		let effective = self.effective_config(plugin_spec, local_overrides, markdown_path)?;
		Ok(ConfigFileSources {
			main_config_path: self.main_configs().primary().path.clone(),
			plugin_config_paths: effective.contributing_files.clone(),
			css_files: effective.css_files.clone(),
		})
	}

	fn locate_plugin(&self, plugin_spec: &str) -> Result<LocatedPlugin> {
		if is_path_spec(plugin_spec) {
			let expanded = expand_tilde(plugin_spec)?;
			let path = if expanded.is_absolute() {
				expanded
			} else if self.options.allow_cwd_relative {
				std::env::current_dir()
					.map(|cwd| cwd.join(&expanded))
					.map_err(|_| MdpressError::RelativeSpecNotAllowed {
						spec: plugin_spec.to_string(),
					})?
			} else {
				return Err(MdpressError::RelativeSpecNotAllowed {
					spec: plugin_spec.to_string(),
				});
			};

			let (name, config_path) = locate_in_path(&path)?;
			Ok(LocatedPlugin {
				name,
				config_path,
				spec_was_path: true,
			})
		} else {
			let entry = self
				.plugin_registry()
				.get(plugin_spec)
				.ok_or_else(|| MdpressError::PluginNotRegistered {
					name: plugin_spec.to_string(),
				})?
				.clone();

			if !entry.config_path.is_file() {
				return Err(MdpressError::RegisteredConfigMissing {
					name: plugin_spec.to_string(),
					path: entry.config_path,
				});
			}

			Ok(LocatedPlugin {
				name: plugin_spec.to_string(),
				config_path: entry.config_path,
				spec_was_path: false,
			})
		}
	}

	fn resolve_uncached(
		&self,
		located: &LocatedPlugin,
		local_overrides: Option<&Value>,
		markdown_path: Option<&Path>,
		mut diagnostics: Vec<Diagnostic>,
	) -> Result<EffectiveConfig> {
		let plugin_name = &located.name;
		let base_config_path = &located.config_path;
		let plugin_base = base_config_path
			.parent()
			.unwrap_or(Path::new("."))
			.to_path_buf();

		// Layer 0: the plugin's own config. A missing handler script here
		// is the one structurally fatal config problem.
		let raw_config = load_yaml_file(base_config_path)?;
		if !raw_config.is_mapping() {
			return Err(MdpressError::PluginConfigNotAMapping {
				path: base_config_path.clone(),
			});
		}
		let handler_script = get_str(&raw_config, KEY_HANDLER_SCRIPT)
			.filter(|script| !script.is_empty())
			.ok_or_else(|| MdpressError::MissingHandlerScript {
				plugin: plugin_name.clone(),
				path: base_config_path.clone(),
			})?
			.to_string();

		let declared_css = string_sequence(&raw_config, KEY_CSS_FILES);
		let inherit_css = get_bool_or(&raw_config, KEY_INHERIT_CSS, true);
		let layer0_css = css::resolve_and_merge(
			&declared_css,
			&plugin_base,
			&[],
			inherit_css,
			plugin_name,
			&base_config_path.display().to_string(),
			&mut diagnostics,
		);

		// Schema validation surfaces typos but never halts resolution.
		let schema_path = plugin_base.join(format!("{plugin_name}{PLUGIN_SCHEMA_SUFFIX}"));
		self.schemas
			.validate(plugin_name, &raw_config, &schema_path, &mut diagnostics);

		let layer0 = RawPluginLayer {
			raw_config,
			resolved_css_paths: layer0_css,
			inherit_css,
			actual_path: base_config_path.clone(),
		};

		let mains = self.main_configs();
		let mut merged = apply_override_layers(
			&self.paths,
			self.options.factory_defaults_only,
			mains,
			plugin_name,
			&layer0,
			vec![base_config_path.display().to_string()],
			vec![base_config_path.clone()],
			&mut diagnostics,
		);

		// Per-document local overrides always win. Their stylesheets
		// resolve against the document's own directory.
		if let Some(local) = local_overrides.filter(|value| value.is_mapping()) {
			let declared = string_sequence(local, KEY_CSS_FILES);
			let inherit = get_bool_or(local, KEY_INHERIT_CSS, true);
			if !declared.is_empty() || !inherit {
				let doc_dir = markdown_path
					.and_then(Path::parent)
					.map(Path::to_path_buf)
					.or_else(|| std::env::current_dir().ok())
					.unwrap_or_else(|| PathBuf::from("."));
				merged.merged_css_paths = css::resolve_and_merge(
					&declared,
					&doc_dir,
					&merged.merged_css_paths,
					inherit,
					plugin_name,
					"local overrides",
					&mut diagnostics,
				);
			}
			merged.merged_config = deep_merge(&merged.merged_config, local);
			merged.contributing_paths.push(match markdown_path {
				Some(path) => format!("Inline local overrides for {}", path.display()),
				None => "Inline local overrides".to_string(),
			});
		}

		// Re-stamp the handler script from layer 0. The merge primitive
		// already refuses to overwrite it, but the contract is absolute.
		if let Value::Mapping(mapping) = &mut merged.merged_config {
			mapping.insert(
				Value::String(KEY_HANDLER_SCRIPT.to_string()),
				Value::String(handler_script.clone()),
			);
		}

		// Global option groups sit underneath the plugin's own: the plugin
		// wins per key, nested sub-mappings merged one level deeper.
		let primary = mains.primary();
		merge_global_group(&mut merged.merged_config, &primary.document, GLOBAL_PDF_KEY, PDF_GROUP_KEY);
		merge_global_group(&mut merged.merged_config, &primary.document, GLOBAL_MATH_KEY, MATH_GROUP_KEY);

		let css_files = css::dedupe_existing(&merged.merged_css_paths);
		if let Value::Mapping(mapping) = &mut merged.merged_config {
			mapping.insert(
				Value::String(KEY_CSS_FILES.to_string()),
				Value::Sequence(
					css_files
						.iter()
						.map(|path| Value::String(path.display().to_string()))
						.collect(),
				),
			);
		}

		let handler_script_path = plugin_base.join(&handler_script);
		if !handler_script_path.is_file() {
			return Err(MdpressError::HandlerScriptNotFound {
				plugin: plugin_name.clone(),
				path: handler_script_path,
			});
		}

		Ok(EffectiveConfig {
			plugin_config: merged.merged_config,
			main_config: primary.document.clone(),
			plugin_base_path: plugin_base,
			handler_script_path,
			was_factory_defaults: self.options.factory_defaults_only,
			css_files,
			contributing_paths: merged.contributing_paths,
			contributing_files: merged.contributing_files,
			warnings: diagnostics,
		})
	}
}

struct LocatedPlugin {
	name: String,
	config_path: PathBuf,
	spec_was_path: bool,
}

/// A spec is a path when it contains a separator or starts with `.`/`~`;
/// anything else is a registry name.
fn is_path_spec(spec: &str) -> bool {
	spec.contains('/')
		|| spec.contains(std::path::MAIN_SEPARATOR)
		|| spec.starts_with('.')
		|| spec.starts_with('~')
}

/// Resolve a path spec to a concrete config file: a directory looks for
/// `<dirname>.config.yaml` first, then any `*.config.yaml`; a file is used
/// directly.
fn locate_in_path(path: &Path) -> Result<(String, PathBuf)> {
	if path.is_dir() {
		let dirname = path
			.file_name()
			.and_then(|name| name.to_str())
			.unwrap_or_default()
			.to_string();

		let conventional = path.join(format!("{dirname}{PLUGIN_CONFIG_SUFFIX}"));
		if conventional.is_file() {
			return Ok((dirname, conventional));
		}

		let mut candidates: Vec<PathBuf> = std::fs::read_dir(path)
			.map_err(|source| MdpressError::PluginConfigRead {
				path: path.to_path_buf(),
				source,
			})?
			.flatten()
			.map(|entry| entry.path())
			.filter(|candidate| {
				candidate.is_file()
					&& candidate
						.file_name()
						.and_then(|name| name.to_str())
						.is_some_and(|name| name.ends_with(PLUGIN_CONFIG_SUFFIX))
			})
			.collect();
		candidates.sort();

		match candidates.into_iter().next() {
			Some(config_path) => {
				let name = plugin_name_from_config(&config_path);
				Ok((name, config_path))
			}
			None => Err(MdpressError::NoConfigInDirectory {
				dir: path.to_path_buf(),
			}),
		}
	} else if path.is_file() {
		Ok((plugin_name_from_config(path), path.to_path_buf()))
	} else {
		Err(MdpressError::PluginPathNotFound {
			path: path.to_path_buf(),
		})
	}
}

/// `<name>.config.yaml` → `name`; any other file name falls back to its
/// stem.
fn plugin_name_from_config(config_path: &Path) -> String {
	let file_name = config_path
		.file_name()
		.and_then(|name| name.to_str())
		.unwrap_or_default();
	file_name
		.strip_suffix(PLUGIN_CONFIG_SUFFIX)
		.map(str::to_string)
		.unwrap_or_else(|| {
			config_path
				.file_stem()
				.and_then(|stem| stem.to_str())
				.unwrap_or_default()
				.to_string()
		})
}

/// Merge a global option group from the main document underneath the
/// plugin's own group: union of keys, plugin wins on conflict, values that
/// are mappings on both sides merged one level deeper.
fn merge_global_group(plugin_doc: &mut Value, main_doc: &Value, global_key: &str, group_key: &str) {
	let Some(global) = get_mapping(main_doc, global_key) else {
		return;
	};
	let plugin_group = get_mapping(plugin_doc, group_key)
		.cloned()
		.unwrap_or_default();

	let mut combined = global.clone();
	for (key, value) in &plugin_group {
		match (combined.get(key), value) {
			(Some(Value::Mapping(global_sub)), Value::Mapping(plugin_sub)) => {
				let mut sub = global_sub.clone();
				for (sub_key, sub_value) in plugin_sub {
					sub.insert(sub_key.clone(), sub_value.clone());
				}
				combined.insert(key.clone(), Value::Mapping(sub));
			}
			_ => {
				combined.insert(key.clone(), value.clone());
			}
		}
	}

	if let Value::Mapping(mapping) = plugin_doc {
		mapping.insert(
			Value::String(group_key.to_string()),
			Value::Mapping(combined),
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn yaml(s: &str) -> Value {
		serde_yaml::from_str(s).unwrap()
	}

	#[test]
	fn test_is_path_spec() {
		assert!(is_path_spec("./plugins/cv"));
		assert!(is_path_spec("~/plugins/cv"));
		assert!(is_path_spec("/abs/cv"));
		assert!(is_path_spec("sub/cv"));
		assert!(!is_path_spec("cv"));
		assert!(!is_path_spec("default"));
	}

	#[test]
	fn test_plugin_name_from_config() {
		assert_eq!(plugin_name_from_config(Path::new("/p/cv.config.yaml")), "cv");
		assert_eq!(plugin_name_from_config(Path::new("/p/custom.yaml")), "custom");
	}

	#[test]
	fn test_merge_global_group_plugin_wins_margin_deep() {
		let mut plugin_doc = yaml("{pdf_options: {format: A5, margin: {top: 1cm}}}");
		let main_doc = yaml(
			"{global_pdf_options: {format: A4, landscape: false, margin: {top: 2cm, bottom: 2cm}}}",
		);

		merge_global_group(&mut plugin_doc, &main_doc, "global_pdf_options", "pdf_options");

		let group = plugin_doc.get("pdf_options").unwrap();
		assert_eq!(get_str(group, "format"), Some("A5"));
		assert_eq!(group.get("landscape"), Some(&Value::Bool(false)));
		let margin = group.get("margin").unwrap();
		assert_eq!(get_str(margin, "top"), Some("1cm"));
		assert_eq!(get_str(margin, "bottom"), Some("2cm"));
	}

	#[test]
	fn test_merge_global_group_without_plugin_group() {
		let mut plugin_doc = yaml("{handler_script: h.tpl}");
		let main_doc = yaml("{global_math: {enabled: true, engine: katex}}");

		merge_global_group(&mut plugin_doc, &main_doc, "global_math", "math");

		let math = plugin_doc.get("math").unwrap();
		assert_eq!(math.get("enabled"), Some(&Value::Bool(true)));
		assert_eq!(get_str(math, "engine"), Some("katex"));
	}

	#[test]
	fn test_merge_global_group_absent_global_is_noop() {
		let mut plugin_doc = yaml("{pdf_options: {format: A5}}");
		let before = plugin_doc.clone();
		merge_global_group(&mut plugin_doc, &yaml("{}"), "global_pdf_options", "pdf_options");
		assert_eq!(plugin_doc, before);
	}
}
