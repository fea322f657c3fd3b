use std::process::Command;

/// `lra --version` prints `<crate version> <git describe>`. Builds from a
/// source tarball have no git metadata and can set `LRA_GIT_DESCRIBE`.
fn main() {
    println!("cargo:rerun-if-env-changed=LRA_GIT_DESCRIBE");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/");

    let describe = std::env::var("LRA_GIT_DESCRIBE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_describe)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=LRA_GIT_DESCRIBE={describe}");
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
