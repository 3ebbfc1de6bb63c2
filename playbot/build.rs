//! Build script for playbot
//!
//! Stamps the binary with the values `/health` reports:
//! - `GIT_HASH`: short commit hash, or "unknown" outside a git checkout
//! - `BUILD_TIMESTAMP`: RFC 3339, UTC, whole seconds
//! - `BUILD_PROFILE`: cargo profile (debug/release)

use std::process::Command;

fn main() {
    // Source tarballs have no .git; a failed git call is not a build error
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    // Set by cargo for build scripts
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    // Read back with env!() in api::handlers::health
    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    // New commits and branch switches both rewrite HEAD
    println!("cargo:rerun-if-changed=.git/HEAD");
}
