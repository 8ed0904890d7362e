use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "focus-guard", version, about = "Focus session enforcement core")]
pub struct Args {
    /// Directory holding the state database. Defaults to the platform data dir.
    #[arg(long, env = "FOCUS_GUARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Settings file. Defaults to `settings.json` inside the data dir.
    #[arg(long, env = "FOCUS_GUARD_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Keep state in memory only; nothing survives a restart.
    #[arg(long)]
    pub memory: bool,
}

impl Args {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("focus-guard")
        })
    }

    pub fn resolved_settings(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(|| self.resolved_data_dir().join("settings.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::parse_from(["focus-guard", "--data-dir", "/tmp/fg", "--memory"]);
        assert!(args.memory);
        assert_eq!(args.resolved_data_dir(), PathBuf::from("/tmp/fg"));
        assert_eq!(args.resolved_settings(), PathBuf::from("/tmp/fg/settings.json"));
    }
}
