use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "xow", version = VERSION, about = "Live test-run dashboard TUI")]
pub struct Cli {
    /// Base URL of the reporting service
    #[arg(short, long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Records per list page
    #[arg(short, long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub page_size: u32,

    /// Seconds to wait before reconnecting the live channel
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub reconnect_delay: u64,

    /// Where the selection, section and theme are remembered
    /// (default: $XDG_STATE_HOME/xow/state.json)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/xow/debug.log
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay)
    }
}

/// Checks that `server` is an absolute http(s) URL.
pub fn validate_server(server: &str) -> Result<(), String> {
    let url = url::Url::parse(server).map_err(|e| format!("Invalid server URL '{server}': {e}"))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(format!("Server URL '{server}' has no host.")),
        other => Err(format!(
            "Unsupported scheme '{other}' in '{server}'. Expected http or https."
        )),
    }
}

/// `$XDG_STATE_HOME/xow`, then `~/.local/state/xow`, then `/tmp/xow`.
pub fn state_dir() -> PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        PathBuf::from(state).join("xow")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local").join("state").join("xow")
    } else {
        PathBuf::from("/tmp/xow")
    }
}
