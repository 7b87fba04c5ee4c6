use std::process::Command;

/// Short git revision, suffixed with `-dirty` when the tree has local edits.
fn git_revision() -> Option<String> {
    let head = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let hash = String::from_utf8_lossy(&head.stdout).trim().to_string();

    let dirty = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|s| !s.success())
        .unwrap_or(false);

    Some(if dirty { format!("{hash}-dirty") } else { hash })
}

fn main() {
    let revision = git_revision().unwrap_or_else(|| "unknown".to_string());

    // exposed as env!("GIT_HASH") for the health endpoint and startup log
    println!("cargo:rustc-env=GIT_HASH={revision}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
