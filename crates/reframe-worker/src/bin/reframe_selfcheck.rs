use std::net::UdpSocket;
use std::path::Path;

use reframe_worker::config::StreamEndpoint;
use reframe_worker::WorkerConfig;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "reframe-selfcheck: {}x{} {} -> {}x{}",
        config.reframe.source_width,
        config.reframe.source_height,
        config.input_format,
        config.reframe.output_width,
        config.reframe.output_height,
    );
    ensure_input(&config.input)?;
    if let Some(path) = &config.decision_log {
        ensure_parent_dir(path)?;
    }
    if let StreamEndpoint::File(path) = &config.output {
        ensure_parent_dir(path)?;
    }
    if let Some(addr) = config.osc_addr {
        UdpSocket::bind(addr).map_err(|e| anyhow::anyhow!("cannot bind OSC port {}: {}", addr, e))?;
    }

    println!("reframe-selfcheck: ok");
    Ok(())
}

fn ensure_input(endpoint: &StreamEndpoint) -> anyhow::Result<()> {
    if let StreamEndpoint::File(path) = endpoint {
        if !path.is_file() {
            return Err(anyhow::anyhow!("input {} is not a file", path.display()));
        }
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            Err(anyhow::anyhow!("directory {} does not exist", dir.display()))
        }
        _ => Ok(()),
    }
}
