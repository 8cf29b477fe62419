//! Build script: embeds the git short hash for the version string and checks
//! that the toolkit behind a requested GPU feature is installed before
//! whisper-rs-sys starts compiling against it.

use std::process::Command;

fn main() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        require_tool("nvcc", "CUDA toolkit", "https://developer.nvidia.com/cuda-downloads");
    }
    if cfg!(feature = "vulkan") {
        require_tool("vulkaninfo", "Vulkan SDK", "https://vulkan.lunarg.com/");
    }
    if cfg!(feature = "hipblas") {
        require_tool("rocminfo", "ROCm", "https://rocm.docs.amd.com/");
    }
    if cfg!(feature = "openblas") {
        check_openblas();
    }
}

/// Fail early with an actionable message instead of letting whisper-rs-sys
/// die mid-compile on a missing toolkit.
fn require_tool(binary: &str, toolkit: &str, install_url: &str) {
    if Command::new(binary).arg("--version").output().is_err() {
        panic!(
            "`{}` not found — {} is not installed.\n\
             Install it from {} or build without the feature: cargo build --release",
            binary, toolkit, install_url
        );
    }
    println!("cargo::warning={} detected", toolkit);
}

fn check_openblas() {
    let pkg_config_ok = Command::new("pkg-config")
        .args(["--exists", "openblas"])
        .status()
        .is_ok_and(|s| s.success());

    let lib_exists = || {
        ["/usr/lib/x86_64-linux-gnu", "/usr/lib", "/usr/lib64"]
            .iter()
            .any(|dir| std::path::Path::new(dir).join("libopenblas.so").exists())
    };

    if !pkg_config_ok && !lib_exists() {
        panic!(
            "OpenBLAS not found.\n\
             Install it (e.g. sudo apt install libopenblas-dev) or build without \
             the feature: cargo build --release"
        );
    }
    println!("cargo::warning=OpenBLAS detected");
}
