#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const BASE_SCHEMA: &str = r#"
properties:
  handler_script: string
  css_files: sequence
groups:
  pdf_options:
    closed: true
    properties:
      format: string
      margin: mapping
"#;

/// Isolated roots for one CLI invocation, so host configuration never
/// leaks into a test.
struct CliFixture {
	_dir: tempfile::TempDir,
	root: PathBuf,
	bundled: PathBuf,
	xdg: PathBuf,
	collections: PathBuf,
}

impl CliFixture {
	fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path().to_path_buf();
		let bundled = root.join("bundled");
		let xdg = root.join("xdg");
		let collections = root.join("collections");
		fs::create_dir_all(bundled.join("schema")).unwrap();
		fs::create_dir_all(&xdg).unwrap();
		fs::create_dir_all(&collections).unwrap();
		fs::write(bundled.join("schema/base.schema.yaml"), BASE_SCHEMA).unwrap();

		let fixture = CliFixture {
			_dir: dir,
			root,
			bundled,
			xdg,
			collections,
		};
		fixture.add_bundled_plugin("default", "handler_script: handler.tpl\ncss_files: [default.css]\n");
		fixture
	}

	fn add_bundled_plugin(&self, name: &str, config: &str) {
		let dir = self.bundled.join("plugins").join(name);
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join(format!("{name}.config.yaml")), config).unwrap();
		fs::write(dir.join("handler.tpl"), "<html/>").unwrap();
		fs::write(dir.join(format!("{name}.css")), "/* */").unwrap();
	}

	fn write(&self, relative: &str, content: &str) -> PathBuf {
		let path = self.root.join(relative);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(&path, content).unwrap();
		path
	}

	fn cmd(&self) -> assert_cmd::Command {
		let mut cmd = assert_cmd::Command::cargo_bin("mdpress").unwrap();
		cmd.env("MDPRESS_BUNDLED_ROOT", &self.bundled)
			.env("MDPRESS_CONFIG_DIR", &self.xdg)
			.env("MDPRESS_COLLECTIONS_ROOT", &self.collections);
		cmd
	}
}

// ============================================================================
// CLI flag tests
// ============================================================================

#[test]
fn test_help_flag() {
	let fx = CliFixture::new();
	fx.cmd()
		.arg("--help")
		.assert()
		.success()
		.stdout(predicate::str::contains("pluggable handlers"));
}

#[test]
fn test_version_flag() {
	let fx = CliFixture::new();
	fx.cmd()
		.arg("--version")
		.assert()
		.success()
		.stdout(predicate::str::contains("mdpress"));
}

#[test]
fn test_no_args_shows_help() {
	let fx = CliFixture::new();
	fx.cmd()
		.assert()
		.failure()
		.stderr(predicate::str::contains("Usage"));
}

// ============================================================================
// plugins list
// ============================================================================

#[test]
fn test_plugins_list_shows_bundled_plugin() {
	let fx = CliFixture::new();
	fx.cmd()
		.args(["plugins", "list"])
		.assert()
		.success()
		.stdout(predicate::str::contains("default"))
		.stdout(predicate::str::contains("[bundled]"));
}

#[test]
fn test_plugins_list_shows_xdg_registration() {
	let fx = CliFixture::new();
	let extra = fx.write("extra/extra.config.yaml", "handler_script: handler.tpl\n");
	fx.write("xdg/config.yaml", &format!("plugins:\n  extra: {}\n", extra.display()));

	fx.cmd()
		.args(["plugins", "list"])
		.assert()
		.success()
		.stdout(predicate::str::contains("extra"))
		.stdout(predicate::str::contains("[xdg]"));
}

#[test]
fn test_factory_defaults_hides_user_registrations() {
	let fx = CliFixture::new();
	let extra = fx.write("extra/extra.config.yaml", "handler_script: handler.tpl\n");
	fx.write("xdg/config.yaml", &format!("plugins:\n  extra: {}\n", extra.display()));

	fx.cmd()
		.args(["--factory-defaults", "plugins", "list"])
		.assert()
		.success()
		.stdout(predicate::str::contains("extra").not())
		.stdout(predicate::str::contains("default"));
}

// ============================================================================
// config show
// ============================================================================

#[test]
fn test_config_show_prints_effective_config() {
	let fx = CliFixture::new();
	fx.cmd()
		.args(["config", "show", "default"])
		.assert()
		.success()
		.stdout(predicate::str::contains("handler_script: handler.tpl"))
		.stdout(predicate::str::contains("# Contributing sources"));
}

#[test]
fn test_config_show_applies_project_inline_override() {
	let fx = CliFixture::new();
	let manifest = fx.write("proj/mdpress.yaml", "default:\n  theme: dark\n");

	fx.cmd()
		.args(["--config", &manifest.display().to_string(), "config", "show", "default"])
		.assert()
		.success()
		.stdout(predicate::str::contains("theme: dark"))
		.stdout(predicate::str::contains("Inline override from project main config"));
}

#[test]
fn test_config_show_unknown_plugin_fails() {
	let fx = CliFixture::new();
	fx.cmd()
		.args(["config", "show", "nonexistent"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("not registered"));
}

#[test]
fn test_schema_typo_warns_on_stderr_without_failing() {
	let fx = CliFixture::new();
	fx.add_bundled_plugin(
		"report",
		"handler_script: handler.tpl\npdf_options:\n  formt: A4\n",
	);

	fx.cmd()
		.args(["config", "show", "report"])
		.assert()
		.success()
		.stderr(predicate::str::contains("possible typo"));
}

#[test]
fn test_missing_base_schema_reports_critical_degrade() {
	let fx = CliFixture::new();
	fs::remove_file(fx.bundled.join("schema/base.schema.yaml")).unwrap();

	fx.cmd()
		.args(["config", "show", "default"])
		.assert()
		.success()
		.stderr(predicate::str::contains("validation is disabled"));
}

// ============================================================================
// config sources
// ============================================================================

#[test]
fn test_config_sources_lists_files() {
	let fx = CliFixture::new();
	fx.write("xdg/default/default.yaml", "footer: false\n");

	fx.cmd()
		.args(["config", "sources", "default"])
		.assert()
		.success()
		.stdout(predicate::str::contains("default.config.yaml"))
		.stdout(predicate::str::contains(
			Path::new("default").join("default.yaml").display().to_string(),
		))
		.stdout(predicate::str::contains("default.css"));
}

#[test]
fn test_missing_handler_script_is_fatal() {
	let fx = CliFixture::new();
	fx.add_bundled_plugin("broken", "description: nothing else\n");

	fx.cmd()
		.args(["config", "show", "broken"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("handler_script"));
}
