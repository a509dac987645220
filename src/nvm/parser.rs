//! nvm / npm 输出解析函数
//!
//! 所有解析都是尽力而为：无法识别的行直接跳过，不视为错误。

use super::types::{Arch, AvailableVersion, AvailableVersionSet, GlobalPackage, InstalledVersion};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `nvm list` 在没有任何已安装版本时输出的提示
const NO_INSTALLATIONS_MARKER: &str = "No installations";

/// `nvm root` 输出的前缀
const ROOT_PREFIX: &str = "Current Root: ";

/// 可选的 `*` 激活标记 + 可选的 `v` 前缀 + 三段式版本号
static INSTALLED_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\*?)\s*v?(\d+\.\d+\.\d+)").expect("invalid installed version regex")
});

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+)").expect("invalid version regex"));

/// 清理终端输出中的 ANSI 转义序列和控制字符
pub fn clean_terminal_output(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            // Windows 换行的 \r 直接丢弃，逐行解析只看 \n
            '\r' => {}
            c if c.is_control() && c != '\n' && c != '\t' => {}
            _ => result.push(c),
        }
    }

    result
}

/// 提取一行中的第一个三段式版本号
fn first_version(line: &str) -> Option<String> {
    VERSION_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 解析 `nvm list` 输出
///
/// 典型输出（nvm-windows）：
///   `  * 18.17.0 (Currently using 64-bit executable)`
///   `    16.20.1`
pub fn parse_installed_versions(output: &str) -> Vec<InstalledVersion> {
    let cleaned = clean_terminal_output(output);
    let mut versions = Vec::new();

    for line in cleaned.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains(NO_INSTALLATIONS_MARKER) {
            continue;
        }

        let Some(caps) = INSTALLED_LINE_REGEX.captures(line) else {
            continue;
        };
        let Some(version) = caps.get(2) else {
            continue;
        };
        let is_active = caps.get(1).is_some_and(|m| m.as_str() == "*");

        let arch = if line.contains("64-bit") {
            Arch::Bit64
        } else if line.contains("32-bit") {
            Arch::Bit32
        } else {
            Arch::Unknown
        };

        versions.push(InstalledVersion {
            version: version.as_str().to_string(),
            is_active,
            is_lts: line.to_lowercase().contains("lts"),
            arch,
        });
    }

    versions
}

/// 解析 `nvm list available` 输出
///
/// `lts` / `current` 只取第一个命中的行；`all` 的每项标记按小写行独立判断，
/// 两者可能不一致（同一行同时出现两种标记时）。
pub fn parse_available_versions(output: &str) -> AvailableVersionSet {
    let cleaned = clean_terminal_output(output);
    let mut set = AvailableVersionSet::default();

    for line in cleaned.lines() {
        let line = line.trim();

        if set.lts.is_none() && line.contains("LTS") {
            set.lts = first_version(line);
        }

        if set.current.is_none() && line.contains("Current") {
            set.current = first_version(line);
        }

        if let Some(version) = first_version(line) {
            let lower = line.to_lowercase();
            set.all.push(AvailableVersion {
                version,
                is_lts: lower.contains("lts"),
                is_current: lower.contains("current"),
            });
        }
    }

    set
}

/// 解析 `nvm root` 输出，如 "\nCurrent Root: C:\\nvm\n"
pub fn parse_root_path(output: &str) -> Option<String> {
    let cleaned = clean_terminal_output(output);
    let first = cleaned.trim().lines().next()?;
    let root = first.replace(ROOT_PREFIX, "");
    let root = root.trim();
    if root.is_empty() {
        None
    } else {
        Some(root.to_string())
    }
}

/// 解析 `nvm proxy` 输出，"none" 视为未配置
pub fn parse_proxy(output: &str) -> Option<String> {
    let proxy = output.trim();
    if proxy.is_empty() || proxy.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(proxy.to_string())
    }
}

/// 去掉 `nvm current` / `npm -v` 输出里的空白和 `v` 前缀
pub fn normalize_version(output: &str) -> String {
    let trimmed = output.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed).to_string()
}

/// `node -p process.arch` 的展示文本
pub fn describe_node_arch(output: &str) -> String {
    match output.trim() {
        "x64" => "64-bit (x64)".to_string(),
        "x32" | "ia32" => "32-bit (x32)".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct NpmListReport {
    #[serde(default)]
    dependencies: BTreeMap<String, NpmDependency>,
}

#[derive(Debug, Deserialize)]
struct NpmDependency {
    #[serde(default)]
    version: Option<String>,
}

/// 解析 `npm list -g --depth=0 --json` 输出，按包名排序
pub fn parse_global_packages(output: &str) -> Result<Vec<GlobalPackage>, serde_json::Error> {
    let report: NpmListReport = serde_json::from_str(output)?;
    Ok(report
        .dependencies
        .into_iter()
        .map(|(name, dep)| GlobalPackage {
            name,
            version: dep.version.unwrap_or_default(),
        })
        .collect())
}
