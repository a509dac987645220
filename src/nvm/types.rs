//! nvm 相关数据类型定义

use serde::{Deserialize, Serialize};

/// 一次外部命令调用的统一结果
///
/// - `success == true`：`output` 为标准输出（标准输出为空时取标准错误），`error` 为 `None`
/// - `success == false`：`output` 为错误描述，`error` 为子进程标准错误（为空时同 `output`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failed(message: String, stderr: Option<String>) -> Self {
        let error = match stderr {
            Some(s) if !s.trim().is_empty() => s,
            _ => message.clone(),
        };
        Self {
            success: false,
            output: message,
            error: Some(error),
        }
    }

    /// 适合展示给用户的错误文本
    pub fn error_text(&self) -> &str {
        match &self.error {
            Some(e) if !e.trim().is_empty() => e.trim(),
            _ => self.output.trim(),
        }
    }
}

/// Node.js 架构标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "64")]
    Bit64,
    #[serde(rename = "32")]
    Bit32,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Bit64 => "64",
            Arch::Bit32 => "32",
            Arch::Unknown => "unknown",
        }
    }

    /// 作为 nvm 命令参数时的取值；`Unknown` 不能传给 nvm
    pub fn as_flag(&self) -> Option<&'static str> {
        match self {
            Arch::Bit64 => Some("64"),
            Arch::Bit32 => Some("32"),
            Arch::Unknown => None,
        }
    }

    /// 解析 `nvm arch` 输出，如 "64" / "System Default: 64-bit."
    pub fn from_output(output: &str) -> Self {
        if output.contains("64") {
            Arch::Bit64
        } else if output.contains("32") {
            Arch::Bit32
        } else {
            Arch::Unknown
        }
    }
}

/// `nvm list` 中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledVersion {
    pub version: String,
    pub is_active: bool,
    #[serde(rename = "isLTS")]
    pub is_lts: bool,
    pub arch: Arch,
}

/// `nvm list available` 中的一个版本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVersion {
    pub version: String,
    #[serde(rename = "isLTS")]
    pub is_lts: bool,
    pub is_current: bool,
}

/// `nvm list available` 的解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableVersionSet {
    pub lts: Option<String>,
    pub current: Option<String>,
    pub all: Vec<AvailableVersion>,
}

/// 全局 npm 包
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalPackage {
    pub name: String,
    pub version: String,
}

/// nvm 安装检测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvmStatus {
    pub installed: bool,
    pub version: Option<String>,
}

/// nvm 根目录占用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub bytes: u64,
}

impl DiskUsage {
    /// 以 GB 为单位，保留两位小数
    pub fn gigabytes(&self) -> String {
        format!("{:.2}", self.bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// 导出的配置快照
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub timestamp: String,
    pub nvm_root: Option<String>,
    pub current_version: Option<String>,
    pub installed_versions: Vec<InstalledVersion>,
    pub app_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_falls_back_to_message_when_stderr_blank() {
        let r = CommandResult::failed("命令超时".to_string(), Some("  \n".to_string()));
        assert!(!r.success);
        assert_eq!(r.output, "命令超时");
        assert_eq!(r.error.as_deref(), Some("命令超时"));

        let r = CommandResult::failed("exit 1".to_string(), Some("boom".to_string()));
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert_eq!(r.error_text(), "boom");
    }

    #[test]
    fn arch_serializes_as_bit_strings() {
        let v = InstalledVersion {
            version: "18.17.0".to_string(),
            is_active: true,
            is_lts: false,
            arch: Arch::Bit64,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["arch"], "64");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["isLTS"], false);
        assert_eq!(serde_json::to_value(Arch::Unknown).unwrap(), "unknown");
    }

    #[test]
    fn arch_from_nvm_output() {
        assert_eq!(Arch::from_output("System Default: 64-bit."), Arch::Bit64);
        assert_eq!(Arch::from_output("32\n"), Arch::Bit32);
        assert_eq!(Arch::from_output(""), Arch::Unknown);
    }

    #[test]
    fn disk_usage_in_gigabytes() {
        let usage = DiskUsage { bytes: 3 * 1024 * 1024 * 1024 / 2 };
        assert_eq!(usage.gigabytes(), "1.50");
        assert_eq!(DiskUsage { bytes: 0 }.gigabytes(), "0.00");
    }
}
