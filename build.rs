// rf-relay-switch - Build Script

use std::process::Command;

fn main() {
    // ESP-IDF environment setup (MUST be first!)
    // Only needed for the espidf firmware target; `embuild` is unavailable
    // on the host (see Cargo.toml note) so this is gated out of host builds.
    #[cfg(target_os = "espidf")]
    embuild::espidf::sysenv::output();

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=rf-relay-switch v{}-g{}", version, git_hash);

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
