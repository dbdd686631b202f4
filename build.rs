// Build script for the scoreboard
// Copies the sample config next to the built binary

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=scoreboard.toml");

    let out_dir = env::var("OUT_DIR").unwrap();

    // OUT_DIR = target/<profile>/build/<crate>-<hash>/out
    let target_dir = Path::new(&out_dir)
        .ancestors()
        .nth(3)
        .expect("Could not find target directory");

    let config_src = Path::new("scoreboard.toml");
    let config_dst = target_dir.join("scoreboard.toml");

    if config_src.exists() {
        fs::copy(config_src, &config_dst).expect("Failed to copy config file");
    }
}
