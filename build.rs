//! Build script reporting the system tools Miyobi depends on.
//!
//! Nothing here fails the build: the `opencv` crate reports its own link
//! errors. Missing tools only produce warnings with install hints.

use std::env;
use std::process::Command;

/// Run `program args`, returning its trimmed stdout on success
fn tool_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn warn(lines: &[&str]) {
    for line in lines {
        println!("cargo:warning={line}");
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for var in ["PKG_CONFIG_PATH", "OPENCV_LINK_PATHS", "OPENCV_INCLUDE_PATHS"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let target = env::var("TARGET").unwrap_or_default();
    println!("cargo:rustc-env=BUILD_TARGET={target}");

    // OpenCV is located through pkg-config on Unix; Windows uses vcpkg or env vars
    if !target.contains("windows") {
        if tool_output("pkg-config", &["--version"]).is_none() {
            warn(&["pkg-config not found; the opencv crate needs it to locate OpenCV"]);
        } else if let Some(version) = ["opencv4", "opencv"]
            .iter()
            .find_map(|lib| tool_output("pkg-config", &["--modversion", lib]))
        {
            println!("cargo:warning=Building against OpenCV {version}");
        } else {
            warn(&[
                "OpenCV 4 not found via pkg-config (needs videoio, highgui, objdetect, dnn)",
                "On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev",
                "On macOS: brew install opencv",
            ]);
        }
    }

    // Runtime dependency of the default Linux backend
    if target.contains("linux") && tool_output("brightnessctl", &["--version"]).is_none() {
        warn(&[
            "brightnessctl not found; install it or run with `--backend system`",
            "On Ubuntu: sudo apt-get install brightnessctl",
        ]);
    }
}
