use crate::config::diagnostics::Diagnostic;
use crate::config::types::{LoadReason, MainConfig, ResolverPaths};
use crate::config::value::load_yaml_lenient;

/// The three top-level documents the engine layers from: the selected
/// primary, plus the raw XDG-scope and project-scope documents.
///
/// Built once per resolver instance and never mutated; a resolver with
/// different inputs is a new resolver.
#[derive(Debug, Clone)]
pub struct MainConfigSet {
	primary: MainConfig,
	xdg: MainConfig,
	project: MainConfig,
}

impl MainConfigSet {
	/// Select and load the primary document, then the XDG and project
	/// documents, reusing the primary's parse when paths coincide.
	///
	/// An unreadable or malformed document degrades to an empty mapping with
	/// a warning; selection never fails the process.
	pub fn load(
		paths: &ResolverPaths,
		factory_defaults_only: bool,
		diagnostics: &mut Vec<Diagnostic>,
	) -> Self {
		let primary = Self::select_primary(paths, factory_defaults_only, diagnostics);

		// Factory-defaults-only is strict isolation: no other scope is read.
		if factory_defaults_only {
			return MainConfigSet {
				primary,
				xdg: MainConfig::none(),
				project: MainConfig::none(),
			};
		}

		let xdg_path = paths.xdg_main();
		let xdg = if !xdg_path.exists() {
			MainConfig::none()
		} else if primary.path.as_deref() == Some(xdg_path.as_path()) {
			MainConfig {
				document: primary.document.clone(),
				path: Some(xdg_path),
				load_reason: LoadReason::XdgGlobal,
			}
		} else {
			MainConfig {
				document: load_yaml_lenient(&xdg_path, diagnostics),
				path: Some(xdg_path),
				load_reason: LoadReason::XdgGlobal,
			}
		};

		let project = match &paths.project_manifest {
			Some(path) if path.exists() => {
				if primary.path.as_deref() == Some(path.as_path()) {
					MainConfig {
						document: primary.document.clone(),
						path: Some(path.clone()),
						load_reason: LoadReason::ProjectFlag,
					}
				} else {
					MainConfig {
						document: load_yaml_lenient(path, diagnostics),
						path: Some(path.clone()),
						load_reason: LoadReason::ProjectFlag,
					}
				}
			}
			Some(path) => {
				diagnostics.push(Diagnostic::warning(format!(
					"Project manifest {} does not exist; ignoring it",
					path.display()
				)));
				MainConfig::none()
			}
			None => MainConfig::none(),
		};

		MainConfigSet { primary, xdg, project }
	}

	/// The precedence chain for the primary document, first match wins:
	/// factory mode, explicit project manifest, XDG global, bundled main,
	/// factory-default fallback.
	fn select_primary(
		paths: &ResolverPaths,
		factory_defaults_only: bool,
		diagnostics: &mut Vec<Diagnostic>,
	) -> MainConfig {
		let factory_path = paths.factory_main();

		if factory_defaults_only {
			return MainConfig {
				document: load_yaml_lenient(&factory_path, diagnostics),
				path: Some(factory_path),
				load_reason: LoadReason::FactoryDefault,
			};
		}

		if let Some(project_path) = &paths.project_manifest
			&& project_path.exists()
		{
			return MainConfig {
				document: load_yaml_lenient(project_path, diagnostics),
				path: Some(project_path.clone()),
				load_reason: LoadReason::ProjectFlag,
			};
		}

		let xdg_path = paths.xdg_main();
		if xdg_path.exists() {
			return MainConfig {
				document: load_yaml_lenient(&xdg_path, diagnostics),
				path: Some(xdg_path),
				load_reason: LoadReason::XdgGlobal,
			};
		}

		let bundled_path = paths.bundled_main();
		if bundled_path.exists() {
			return MainConfig {
				document: load_yaml_lenient(&bundled_path, diagnostics),
				path: Some(bundled_path),
				load_reason: LoadReason::BundledMain,
			};
		}

		if factory_path.exists() {
			return MainConfig {
				document: load_yaml_lenient(&factory_path, diagnostics),
				path: Some(factory_path),
				load_reason: LoadReason::FactoryFallback,
			};
		}

		diagnostics.push(Diagnostic::warning(
			"No main configuration file found anywhere; proceeding with empty settings",
		));
		MainConfig::none()
	}

	/// The single primary top-level document.
	pub fn primary(&self) -> &MainConfig {
		&self.primary
	}

	/// The raw XDG-scope document (empty when absent or in factory mode).
	pub fn xdg(&self) -> &MainConfig {
		&self.xdg
	}

	/// The raw project-scope document (empty when absent or in factory mode).
	pub fn project(&self) -> &MainConfig {
		&self.project
	}
}
