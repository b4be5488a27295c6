//! Build script for periscope-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates periscope.toml and turns it into board defaults

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Largest capture buffer the staging area can report (samples)
const MAX_BUFFER_SIZE: i64 = 512;

/// Highest converter channel (vref)
const MAX_CHANNEL: i64 = 17;

fn main() {
    setup_linker();
    generate_defaults();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate periscope.toml and emit `defaults.rs` into OUT_DIR
fn generate_defaults() {
    println!("cargo:rerun-if-changed=periscope.toml");

    let config_path = Path::new("periscope.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail(&[format!("Failed to read periscope.toml: {}", e)]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(&[format!("Invalid TOML syntax in periscope.toml: {}", e)]),
    };

    let mut errors = Vec::new();

    let acquisition = match config.get("acquisition") {
        Some(toml::Value::Table(t)) => t.clone(),
        _ => fail(&["Missing [acquisition] section".to_string()]),
    };

    let mut mask: u32 = 0;
    match acquisition.get("channels") {
        Some(toml::Value::Array(channels)) if !channels.is_empty() => {
            for channel in channels {
                match channel.as_integer() {
                    Some(c) if (0..=MAX_CHANNEL).contains(&c) => mask |= 1 << c,
                    _ => errors.push(format!(
                        "[acquisition] channels entries must be 0-{}",
                        MAX_CHANNEL
                    )),
                }
            }
        }
        _ => errors.push("[acquisition] channels must be a non-empty list".to_string()),
    }

    let sample_time = integer(&acquisition, "sample_time", 0, 7, &mut errors);
    let frequency_hz = integer(&acquisition, "frequency_hz", 1, 1_000_000, &mut errors);
    let buffer_size = integer(&acquisition, "buffer_size", 2, MAX_BUFFER_SIZE, &mut errors);
    let averaging_factor = integer(&acquisition, "averaging_factor", 0, 1000, &mut errors);
    let averaging_enabled = match acquisition.get("averaging_enabled") {
        Some(toml::Value::Boolean(b)) => *b,
        None => true,
        _ => {
            errors.push("[acquisition] averaging_enabled must be a boolean".to_string());
            true
        }
    };

    let baudrate = match config.get("host") {
        Some(toml::Value::Table(host)) => integer(host, "baudrate", 9600, 4_000_000, &mut errors),
        _ => 921_600,
    };

    if buffer_size < 2 * mask.count_ones() as i64 {
        errors.push("[acquisition] buffer_size must hold two conversion groups".to_string());
    }

    if !errors.is_empty() {
        fail(&errors);
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("defaults.rs")).unwrap();
    writeln!(f, "pub const CHANNEL_MASK: u32 = {:#x};", mask).unwrap();
    writeln!(f, "pub const SAMPLE_TIME: u8 = {};", sample_time).unwrap();
    writeln!(f, "pub const FREQUENCY_HZ: u32 = {};", frequency_hz).unwrap();
    writeln!(f, "pub const BUFFER_SIZE: u32 = {};", buffer_size).unwrap();
    writeln!(f, "pub const AVERAGING_FACTOR: u16 = {};", averaging_factor).unwrap();
    writeln!(f, "pub const AVERAGING_ENABLED: bool = {};", averaging_enabled).unwrap();
    writeln!(f, "pub const HOST_BAUDRATE: u32 = {};", baudrate).unwrap();

    println!("cargo:warning=periscope.toml validated successfully");
}

/// Read an integer field and check its range
fn integer(
    table: &toml::map::Map<String, toml::Value>,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) -> i64 {
    match table.get(key).and_then(|v| v.as_integer()) {
        Some(v) if (min..=max).contains(&v) => v,
        Some(_) => {
            errors.push(format!("{} must be {}-{}", key, min, max));
            min
        }
        None => {
            errors.push(format!("missing integer '{}'", key));
            min
        }
    }
}

/// Abort the build with a boxed error report
fn fail(errors: &[String]) -> ! {
    let lines = errors
        .iter()
        .map(|e| format!("║  • {:<62} ║", e))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: periscope.toml                                           ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        lines
    );
}
