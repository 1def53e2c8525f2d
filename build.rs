use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Embed the compiler version and target triple for the User-Agent string.
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|s| s.split_whitespace().nth(1).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let target = std::env::var("TARGET").unwrap_or_default();

    println!("cargo:rustc-env=TINIFY_RUSTC_VERSION={}", version);
    println!("cargo:rustc-env=TINIFY_TARGET={}", target);
}
