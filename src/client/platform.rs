//! Platform detection for request headers and wheel selection

use std::env::consts;

/// Operating system name in the style Python's `platform.system()` reports
pub fn system_name() -> &'static str {
    match consts::OS {
        "linux" => "Linux",
        "windows" => "Windows",
        "macos" => "Darwin",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Machine architecture in the style Python's `platform.machine()` reports
pub fn machine_name() -> &'static str {
    match (consts::OS, consts::ARCH) {
        ("windows", "x86_64") => "AMD64",
        ("macos", "aarch64") => "arm64",
        (_, arch) => arch,
    }
}

/// Regex fragment matching the wheel platform tags this host can install
pub fn wheel_platform_pattern() -> &'static str {
    platform_pattern_for(consts::OS, consts::ARCH)
}

/// Wheel platform tag family for an OS/arch pair, as a regex fragment.
///
/// Any manylinux or macOS deployment target is accepted, so
/// `manylinux_2_28_x86_64` matches as well as `manylinux1_x86_64`.
pub fn platform_pattern_for(os: &str, arch: &str) -> &'static str {
    match (os, arch) {
        ("linux", "aarch64") => r#"manylinux[^'" >]*_aarch64"#,
        ("linux", _) => r#"manylinux[^'" >]*_x86_64"#,
        ("windows", _) => "win_amd64",
        ("macos", "aarch64") => r#"macosx_[^'" >]*_(?:arm64|universal2)"#,
        _ => r#"macosx_[^'" >]*_(?:x86_64|intel|universal2)"#,
    }
}

/// CPython interpreter tag (`cp311`) for a `(major, minor)` version
pub fn interpreter_tag(version: (u32, u32)) -> String {
    format!("cp{}{}", version.0, version.1)
}

/// User-Agent that looks like pip's own, so mirrors serve us the same way
pub fn pip_user_agent(pip_version: &str, python_version: Option<(u32, u32)>) -> String {
    let python = match python_version {
        Some((major, minor)) => format!("{}.{}", major, minor),
        None => "3".to_string(),
    };
    format!("pip/{} Python/{} ({}; {})", pip_version, python, system_name(), machine_name())
}
