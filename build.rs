//! Build script for the lifecycle firmware
//!
//! Handles:
//! - Linker scripts for the `lifecycle-node` binary (cortex-m-rt, defmt)
//! - Nothing on host builds, where only the library and tests are built

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // memory.x comes from embassy-stm32's `memory-x` feature
    if std::env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("arm") {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
