use crate::nvm::ConfigSnapshot;
use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

/// 把配置快照写成 JSON 文件
pub struct ConfigExporter {
    base_dir: PathBuf,
}

impl ConfigExporter {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// 写入 `<base_dir>/nvm-config-<毫秒时间戳>.json`，返回文件路径
    pub fn save(&self, snapshot: &ConfigSnapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)?;

        let filename = format!("nvm-config-{}.json", Utc::now().timestamp_millis());
        let filepath = self.base_dir.join(filename);

        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(&filepath, content)?;

        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvm::{Arch, InstalledVersion};

    #[test]
    fn writes_pretty_json_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ConfigExporter::new(dir.path().join("exports"));
        let snapshot = ConfigSnapshot {
            timestamp: "2026-10-16T08:00:00Z".to_string(),
            nvm_root: Some("C:\\nvm".to_string()),
            current_version: Some("18.17.0".to_string()),
            installed_versions: vec![InstalledVersion {
                version: "18.17.0".to_string(),
                is_active: true,
                is_lts: false,
                arch: Arch::Bit64,
            }],
            app_version: "0.1.0".to_string(),
        };

        let path = exporter.save(&snapshot).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("nvm-config-") && name.ends_with(".json"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["nvmRoot"], "C:\\nvm");
        assert_eq!(value["currentVersion"], "18.17.0");
        assert_eq!(value["installedVersions"][0]["arch"], "64");
        assert_eq!(value["appVersion"], "0.1.0");
    }
}
