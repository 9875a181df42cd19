use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use mdpress_cli::collection::ManifestCollectionSource;
use mdpress_cli::config::{ConfigResolver, ResolverOptions, ResolverPaths};

#[derive(Parser)]
#[command(name = "mdpress")]
#[command(
	author,
	version,
	about = "CLI for converting markdown documents via pluggable handlers"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	/// Path to a project manifest (highest-precedence main config)
	#[arg(long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Ignore all user/project configuration and use bundled defaults only
	#[arg(long, global = true)]
	factory_defaults: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Configuration inspection commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
	/// Plugin registry commands
	Plugins {
		#[command(subcommand)]
		action: PluginsAction,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the effective configuration for a plugin with provenance
	Show {
		/// Plugin name, or path to a plugin directory/config file
		plugin: String,

		/// Markdown document the configuration applies to
		#[arg(long, value_name = "FILE")]
		md: Option<PathBuf>,
	},
	/// List the files that contribute to a plugin's configuration
	Sources {
		/// Plugin name, or path to a plugin directory/config file
		plugin: String,

		/// Markdown document the configuration applies to
		#[arg(long, value_name = "FILE")]
		md: Option<PathBuf>,
	},
}

#[derive(Subcommand)]
enum PluginsAction {
	/// List every registered plugin with its source tier
	List,
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	let resolver = build_resolver(&cli)?;

	match cli.command {
		Commands::Config { action } => match action {
			ConfigAction::Show { plugin, md } => handle_config_show(&resolver, &plugin, md.as_deref()),
			ConfigAction::Sources { plugin, md } => {
				handle_config_sources(&resolver, &plugin, md.as_deref())
			}
		},
		Commands::Plugins { action } => match action {
			PluginsAction::List => handle_plugins_list(&resolver),
		},
	}
}

/// Assemble the resolver from the install layout, the XDG config dir, and
/// the CLI flags. Every root honors an environment override so tests and
/// relocated installs can point elsewhere.
fn build_resolver(cli: &Cli) -> Result<ConfigResolver> {
	let paths = ResolverPaths {
		bundled_root: bundled_root(),
		xdg_config_dir: xdg_config_dir()?,
		project_manifest: cli.config.clone(),
	};
	let options = ResolverOptions {
		factory_defaults_only: cli.factory_defaults,
		// Specs typed at the command line may be CWD-relative.
		allow_cwd_relative: true,
	};
	let collections = ManifestCollectionSource::new(&collections_root()?);
	Ok(ConfigResolver::new(paths, options, Some(Box::new(collections))))
}

fn bundled_root() -> PathBuf {
	if let Ok(dir) = std::env::var("MDPRESS_BUNDLED_ROOT") {
		return PathBuf::from(dir);
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		let beside_exe = dir.join("assets");
		if beside_exe.is_dir() {
			return beside_exe;
		}
	}
	// Development layout: assets/ next to Cargo.toml.
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

fn xdg_config_dir() -> Result<PathBuf> {
	if let Ok(dir) = std::env::var("MDPRESS_CONFIG_DIR") {
		return Ok(PathBuf::from(dir));
	}
	let base = dirs::config_dir().context("Failed to resolve the user config directory")?;
	Ok(base.join("mdpress"))
}

fn collections_root() -> Result<PathBuf> {
	if let Ok(dir) = std::env::var("MDPRESS_COLLECTIONS_ROOT") {
		return Ok(PathBuf::from(dir));
	}
	let base = dirs::data_dir().context("Failed to resolve the user data directory")?;
	Ok(base.join("mdpress").join("collections"))
}

fn handle_config_show(
	resolver: &ConfigResolver,
	plugin: &str,
	md: Option<&std::path::Path>,
) -> Result<ExitCode> {
	let effective = resolver
		.effective_config(plugin, None, md)
		.with_context(|| format!("Failed to resolve configuration for plugin '{plugin}'"))?;

	let primary = resolver.main_configs().primary();
	println!(
		"# Main config: {} ({})",
		primary
			.path
			.as_ref()
			.map(|p| p.display().to_string())
			.unwrap_or_else(|| "<none>".to_string()),
		primary.load_reason.as_str()
	);
	println!("# Plugin base: {}", effective.plugin_base_path.display());
	println!("# Handler script: {}", effective.handler_script_path.display());
	println!();

	let rendered = serde_yaml::to_string(&effective.plugin_config)
		.context("Failed to render effective configuration")?;
	println!("{rendered}");

	println!("# Contributing sources (in application order):");
	for source in &effective.contributing_paths {
		println!("#   {source}");
	}

	print_warnings(resolver, &effective.warnings);
	Ok(ExitCode::SUCCESS)
}

fn handle_config_sources(
	resolver: &ConfigResolver,
	plugin: &str,
	md: Option<&std::path::Path>,
) -> Result<ExitCode> {
	let sources = resolver
		.config_file_sources(plugin, None, md)
		.with_context(|| format!("Failed to resolve configuration for plugin '{plugin}'"))?;

	println!(
		"Main config: {}",
		sources
			.main_config_path
			.map(|p| p.display().to_string())
			.unwrap_or_else(|| "<none>".to_string())
	);

	println!("Plugin config files:");
	for path in &sources.plugin_config_paths {
		println!("  {}", path.display());
	}

	println!("Stylesheets:");
	for path in &sources.css_files {
		println!("  {}", path.display());
	}

	print_warnings(resolver, &[]);
	Ok(ExitCode::SUCCESS)
}

fn handle_plugins_list(resolver: &ConfigResolver) -> Result<ExitCode> {
	let registry = resolver.plugin_registry();

	if registry.is_empty() {
		println!("No plugins registered.");
	} else {
		for (name, entry) in registry {
			println!(
				"{}  [{}]  {}",
				name,
				entry.source_tier.as_str(),
				entry.config_path.display()
			);
		}
	}

	print_warnings(resolver, &[]);
	Ok(ExitCode::SUCCESS)
}

/// Warnings never change the exit code; they go to stderr so stdout stays
/// machine-readable.
fn print_warnings(resolver: &ConfigResolver, warnings: &[mdpress_cli::config::Diagnostic]) {
	for warning in warnings {
		eprintln!("{warning}");
	}
	for warning in resolver.take_diagnostics() {
		eprintln!("{warning}");
	}
}
