use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs a helper tool that prints JSON on stdout and parses it.
pub async fn run_json_tool(program: &str, args: &[&str], timeout: Duration) -> Result<Value> {
    debug!("Running {} {}", program, args.join(" "));

    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output(),
    )
    .await
    .with_context(|| format!("{program} timed out"))?
    .with_context(|| format!("Failed to run {program}"))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!("{} failed: {}", program, error.trim()));
    }

    serde_json::from_slice(&output.stdout).with_context(|| format!("Failed to parse {program} output"))
}

/// Checks that a helper tool can be launched.
pub async fn tool_available(program: &str, version_arg: &str) -> bool {
    match tokio::process::Command::new(program)
        .arg(version_arg)
        .output()
        .await
    {
        Ok(output) => {
            if output.status.success() {
                let version_line = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("unknown")
                    .to_string();
                info!("✅ {} is available: {}", program, version_line);
                true
            } else {
                warn!("❌ {} command failed", program);
                false
            }
        }
        Err(e) => {
            warn!("❌ {} not found: {}", program, e);
            false
        }
    }
}
