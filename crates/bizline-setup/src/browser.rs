//! Launch the operator's default browser.

use std::process::Command;

/// Open `url` with the platform's default handler.
///
/// Blocks until the opener exits.
pub fn open_url(url: &str) -> std::io::Result<()> {
    wait_for(launcher(url)?)
}

/// Run the opener to completion so the child is reaped.
fn wait_for(mut cmd: Command) -> std::io::Result<()> {
    let status = cmd.status()?;
    if !status.success() {
        return Err(std::io::Error::other(format!("browser opener exited with {}", status)));
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn launcher(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    Ok(cmd)
}

#[cfg(target_os = "linux")]
fn launcher(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    Ok(cmd)
}

#[cfg(target_os = "windows")]
fn launcher(url: &str) -> std::io::Result<Command> {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    Ok(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn launcher(_url: &str) -> std::io::Result<Command> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no browser launcher for this platform",
    ))
}
