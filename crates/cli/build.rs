use std::process::Command;

fn main() {
    // Short commit hash for `weektally --version`
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");

    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", git_hash);

    let env_or_unknown = |key: &str| std::env::var(key).unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET={}", env_or_unknown("TARGET"));
    println!("cargo:rustc-env=BUILD_PROFILE={}", env_or_unknown("PROFILE"));
}
