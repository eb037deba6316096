//! Version command

use anyhow::Result;
use serde::Serialize;

use crate::cli::VersionArgs;

/// Encoding of snapshot files written by this binary
const SNAPSHOT_FORMAT: &str = "json+chacha20poly1305";

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct BuildInfo {
    version: &'static str,
    commit: Option<&'static str>,
    build_date: Option<&'static str>,
    target: Option<&'static str>,
    snapshot_format: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_SHA"),
            build_date: option_env!("BUILD_DATE"),
            target: option_env!("TARGET"),
            snapshot_format: SNAPSHOT_FORMAT,
        }
    }

    /// One-line summary, e.g. `snapvault 0.1.0 (abc1234, 2026-01-01)`
    fn summary(&self) -> String {
        let build: Vec<&str> = [self.commit, self.build_date].into_iter().flatten().collect();
        if build.is_empty() {
            format!("snapvault {}", self.version)
        } else {
            format!("snapvault {} ({})", self.version, build.join(", "))
        }
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    let info = BuildInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", info.summary());
    if let Some(target) = info.target {
        println!("Target:          {}", target);
    }
    println!("Snapshot format: {}", info.snapshot_format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(commit: Option<&'static str>, build_date: Option<&'static str>) -> BuildInfo {
        BuildInfo {
            version: "1.2.0",
            commit,
            build_date,
            target: None,
            snapshot_format: SNAPSHOT_FORMAT,
        }
    }

    #[test]
    fn test_current_version_is_valid_semver() {
        let info = BuildInfo::current();
        assert!(
            semver::Version::parse(info.version).is_ok(),
            "version should be valid semver, got: {}",
            info.version
        );
    }

    #[test]
    fn test_summary_includes_commit_and_build_date() {
        assert_eq!(
            info(Some("abc1234"), Some("2026-01-01")).summary(),
            "snapvault 1.2.0 (abc1234, 2026-01-01)"
        );
        assert_eq!(
            info(None, Some("2026-01-01")).summary(),
            "snapvault 1.2.0 (2026-01-01)"
        );
        assert_eq!(info(None, None).summary(), "snapvault 1.2.0");
    }

    #[test]
    fn test_json_uses_kebab_case_keys() {
        let json = serde_json::to_value(info(Some("abc1234"), None)).unwrap();
        assert_eq!(json["build-date"], serde_json::Value::Null);
        assert_eq!(json["snapshot-format"], SNAPSHOT_FORMAT);
        assert_eq!(json["commit"], "abc1234");
    }
}
