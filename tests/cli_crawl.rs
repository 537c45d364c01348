#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Fixture {
    dir: tempfile::TempDir,
    config: PathBuf,
    script: PathBuf,
}

impl Fixture {
    /// Resolver echoes the selector back, validator is the default `test -d`.
    fn new(crawl_body: &str) -> Self {
        Self::with_resolver("echo {selector}", crawl_body)
    }

    fn with_resolver(resolver: &str, crawl_body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("run")).unwrap();

        let script = dir.path().join("crawl.sh");
        std::fs::write(&script, crawl_body).unwrap();

        let config = dir.path().join("runctl.toml");
        std::fs::write(
            &config,
            format!(
                "[tools]\nresolver = \"{resolver}\"\ncrawl = \"sh {} {{dir}} --tag={{tag}}\"\n",
                script.display()
            ),
        )
        .unwrap();

        Self { dir, config, script }
    }

    fn run_dir(&self) -> PathBuf {
        self.dir.path().join("run")
    }

    fn crawl(&self, selector: &Path, tag: Option<&str>) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_runctl"));
        cmd.arg("--config").arg(&self.config).arg("crawl").arg(selector);
        if let Some(tag) = tag {
            cmd.arg(tag);
        }
        cmd.env_remove("RUST_LOG")
            .output()
            .expect("failed to run runctl binary")
    }
}

const ECHO_ARGS: &str = "echo \"crawled $1 $2\"\n";

#[test]
fn echoes_command_then_crawls_with_default_tag() {
    let fx = Fixture::new(ECHO_ARGS);
    let out = fx.crawl(&fx.run_dir(), None);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    let dir = fx.run_dir().display().to_string();
    assert_eq!(
        lines,
        [
            format!("sh {} {dir} --tag='eval_rewards'", fx.script.display()),
            format!("crawled {dir} --tag=eval_rewards"),
        ]
    );
}

#[test]
fn custom_tag_with_spaces_is_quoted_and_passed_whole() {
    let fx = Fixture::new("printf '%s\\n' \"$2\"\n");
    let out = fx.crawl(&fx.run_dir(), Some("custom tag"));
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].ends_with(" --tag='custom tag'"), "{}", lines[0]);
    assert_eq!(lines[1], "--tag=custom tag");
}

#[test]
fn invalid_directory_never_crawls() {
    let fx = Fixture::new(ECHO_ARGS);
    let out = fx.crawl(&fx.dir.path().join("missing"), None);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed validation"));
}

#[test]
fn crawl_tool_status_is_the_exit_status() {
    let fx = Fixture::new("exit 5\n");
    let out = fx.crawl(&fx.run_dir(), Some("loss"));
    assert_eq!(out.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&out.stdout).contains("--tag='loss'"));
}

#[test]
fn repeated_crawls_print_the_same_command() {
    let fx = Fixture::new(ECHO_ARGS);
    let first = fx.crawl(&fx.run_dir(), Some("eval_rewards"));
    let second = fx.crawl(&fx.run_dir(), Some("eval_rewards"));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn failed_resolution_never_crawls() {
    let fx = Fixture::with_resolver("sh -c 'exit 3' resolver {selector}", ECHO_ARGS);
    let out = fx.crawl(Path::new("myrun"), None);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("cannot resolve"));
}
