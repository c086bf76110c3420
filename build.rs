use std::process::Command;

/// Short commit of the checkout, with a `-dirty` suffix when the tree has
/// uncommitted changes. Builds from a source tarball report `unknown`.
fn git_revision() -> Option<String> {
    let head = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !head.status.success() {
        return None;
    }
    let mut hash = String::from_utf8_lossy(&head.stdout).trim().to_string();
    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .map(|o| o.status.success() && !o.stdout.is_empty())
        .unwrap_or(false);
    if dirty {
        hash.push_str("-dirty");
    }
    Some(hash)
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!(
        "cargo:rustc-env=GIT_HASH={}",
        git_revision().unwrap_or_else(|| "unknown".into())
    );
}
