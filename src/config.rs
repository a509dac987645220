use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// nvm 可执行文件
    pub nvm_command: String,
    /// npm 可执行文件（Windows 上是 npm.cmd）
    pub npm_command: String,
    pub node_command: String,
    /// 单条命令超时（秒）
    pub timeout_secs: u64,
    /// 配置快照导出目录
    pub export_dir: PathBuf,
    /// 活动日志保留行数
    pub log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nvm_command: "nvm".to_string(),
            npm_command: if cfg!(windows) { "npm.cmd" } else { "npm" }.to_string(),
            node_command: "node".to_string(),
            timeout_secs: 60,
            export_dir: home_dir().join(".lian/nvm"),
            log_lines: 50,
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

impl Config {
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/lian-nvm/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            log::debug!("已加载配置: {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
