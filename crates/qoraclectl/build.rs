// qoraclectl build script: `--version` reports QORACLE_VERSION.
//
// Tagged builds export QORACLE_VERSION (e.g. "1.1.0-rc2"); local builds get
// the workspace version.

fn main() {
    let version = match std::env::var("QORACLE_VERSION") {
        Ok(tagged) if !tagged.trim().is_empty() => tagged,
        _ => env!("CARGO_PKG_VERSION").to_string(),
    };

    println!("cargo:rustc-env=QORACLE_VERSION={}", version);
    println!("cargo:rerun-if-changed=../../Cargo.toml");
    println!("cargo:rerun-if-env-changed=QORACLE_VERSION");
}
