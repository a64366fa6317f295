use std::{env, error::Error};

fn main() -> Result<(), Box<dyn Error>> {
    let target = env::var("TARGET").unwrap_or_default();
    let profile = env::var("PROFILE").unwrap_or_default();

    println!("cargo:rustc-env=BPMON_BUILD_TARGET={target}");
    println!("cargo:rustc-env=BPMON_BUILD_PROFILE={profile}");

    Ok(())
}
