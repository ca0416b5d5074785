//! Launching episode links in an external application.

use crate::error::{AppError, Result};
use log::debug;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Platform default command for opening URLs.
pub fn default_opener() -> Result<&'static str> {
    match env::consts::OS {
        "linux" | "freebsd" | "openbsd" | "netbsd" => Ok("xdg-open"),
        "macos" => Ok("open"),
        "windows" => Ok("explorer.exe"),
        other => Err(AppError::InvalidInput(format!(
            "OS '{}' has no default URL opener",
            other
        ))),
    }
}

/// Search for an executable in the system PATH.
///
/// Paths containing a separator are checked directly.
pub fn find_in_path<P: AsRef<Path>>(exe_name: P) -> Option<PathBuf> {
    let exe_path = exe_name.as_ref();

    if exe_path.is_absolute()
        || exe_path
            .to_string_lossy()
            .contains(std::path::MAIN_SEPARATOR)
    {
        return exe_path.is_file().then(|| exe_path.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(exe_path))
            .find(|full_path| full_path.is_file())
    })
}

/// Build the command line for opening `url`.
///
/// A configured opener may carry its own arguments (`"firefox --new-tab"`);
/// the URL is always passed last as a separate argument.
pub fn build_command(url: &str, opener: Option<&str>) -> Result<(String, Vec<String>)> {
    let command_line = match opener.map(str::trim).filter(|o| !o.is_empty()) {
        Some(configured) => configured.to_string(),
        None => default_opener()?.to_string(),
    };

    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| AppError::InvalidInput("empty opener command".to_string()))?;
    let mut args: Vec<String> = parts.collect();
    args.push(url.to_string());
    Ok((program, args))
}

/// Open `url` without waiting for the opener to exit.
pub fn open_link(url: &str, opener: Option<&str>) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::InvalidInput(format!("refusing to open '{}'", url)));
    }

    let (program, args) = build_command(url, opener)?;
    if find_in_path(&program).is_none() {
        return Err(AppError::InvalidInput(format!("{} not found in PATH", program)));
    }

    debug!("Opening {} with {}", url, program);
    Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}
