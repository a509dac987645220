//! nvm 模块：对 nvm / npm 命令行的封装

pub mod disk;
pub mod executor;
pub mod parser;
pub mod types;

// 重新导出常用类型和函数
pub use executor::Executor;
pub use types::{
    Arch, AvailableVersionSet, CommandResult, ConfigSnapshot, DiskUsage,
    GlobalPackage, InstalledVersion, NvmStatus,
};

use crate::config::Config;
use crate::export::ConfigExporter;
use chrono::Utc;
use parser::{parse_available_versions, parse_global_packages, parse_installed_versions, parse_root_path};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 命令失败，或命令成功但输出无法使用
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvocationFailure {
    pub message: String,
    pub detail: Option<String>,
}

impl InvocationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// 优先展示子进程的 stderr
    pub fn display_text(&self) -> &str {
        match &self.detail {
            Some(d) if !d.trim().is_empty() => d.trim(),
            _ => self.message.trim(),
        }
    }
}

impl From<InvocationFailure> for CommandResult {
    fn from(failure: InvocationFailure) -> Self {
        CommandResult::failed(failure.message, failure.detail)
    }
}

impl CommandResult {
    /// 把失败结果提升为 `Err`，成功时返回输出文本
    pub fn into_output(self) -> Result<String, InvocationFailure> {
        if self.success {
            Ok(self.output)
        } else {
            Err(InvocationFailure {
                message: self.output,
                detail: self.error,
            })
        }
    }
}

/// 校验用户输入的参数：去掉首尾空白，拒绝空值和以 `-` 开头的值
pub fn validate_argument(kind: &str, value: &str) -> Result<String, InvocationFailure> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InvocationFailure::new(format!("{}不能为空", kind)));
    }
    if value.starts_with('-') {
        return Err(InvocationFailure::new(format!("无效的{}: {}", kind, value)));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone)]
pub struct NodeVersionManager {
    nvm: String,
    npm: String,
    node: String,
    executor: Executor,
}

impl NodeVersionManager {
    pub fn new(config: &Config) -> Self {
        Self {
            nvm: config.nvm_command.clone(),
            npm: config.npm_command.clone(),
            node: config.node_command.clone(),
            executor: Executor::new(config.timeout()),
        }
    }

    pub fn nvm_command(&self) -> &str {
        &self.nvm
    }

    pub fn npm_command(&self) -> &str {
        &self.npm
    }

    async fn run_nvm<S: AsRef<str>>(&self, args: &[S]) -> CommandResult {
        self.executor.run(&self.nvm, args).await
    }

    async fn run_npm<S: AsRef<str>>(&self, args: &[S]) -> CommandResult {
        self.executor.run(&self.npm, args).await
    }

    // ===== 版本管理 =====

    /// 已安装版本 (nvm list)
    pub async fn list_installed(&self) -> Result<Vec<InstalledVersion>, InvocationFailure> {
        let output = self.run_nvm(&["list"]).await.into_output()?;
        Ok(parse_installed_versions(&output))
    }

    /// 可安装版本 (nvm list available)
    pub async fn list_available(&self) -> Result<AvailableVersionSet, InvocationFailure> {
        let output = self.run_nvm(&["list", "available"]).await.into_output()?;
        Ok(parse_available_versions(&output))
    }

    /// nvm install <version> [arch]
    pub async fn install(&self, version: &str, arch: Option<Arch>) -> CommandResult {
        let version = match validate_argument("版本号", version) {
            Ok(v) => v,
            Err(e) => return e.into(),
        };
        let args = with_arch(vec!["install".to_string(), version], arch);
        self.run_nvm(args.as_slice()).await
    }

    /// nvm use <version> [arch]
    pub async fn use_version(&self, version: &str, arch: Option<Arch>) -> CommandResult {
        let version = match validate_argument("版本号", version) {
            Ok(v) => v,
            Err(e) => return e.into(),
        };
        let args = with_arch(vec!["use".to_string(), version], arch);
        self.run_nvm(args.as_slice()).await
    }

    /// nvm uninstall <version>
    pub async fn uninstall(&self, version: &str) -> CommandResult {
        let version = match validate_argument("版本号", version) {
            Ok(v) => v,
            Err(e) => return e.into(),
        };
        self.run_nvm(&["uninstall", version.as_str()]).await
    }

    pub async fn current(&self) -> CommandResult {
        self.run_nvm(&["current"]).await
    }

    pub async fn nvm_version(&self) -> CommandResult {
        self.run_nvm(&["version"]).await
    }

    // ===== 配置 =====

    pub async fn root(&self) -> CommandResult {
        self.run_nvm(&["root"]).await
    }

    pub async fn set_root(&self, path: &str) -> CommandResult {
        let path = match validate_argument("根目录", path) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        self.run_nvm(&["root", path.as_str()]).await
    }

    pub async fn proxy(&self) -> CommandResult {
        self.run_nvm(&["proxy"]).await
    }

    /// 设置代理，`None` 或空字符串表示清除（nvm proxy none）
    pub async fn set_proxy(&self, proxy: Option<&str>) -> CommandResult {
        let proxy = match proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => match validate_argument("代理地址", p) {
                Ok(p) => p,
                Err(e) => return e.into(),
            },
            None => "none".to_string(),
        };
        self.run_nvm(&["proxy", proxy.as_str()]).await
    }

    pub async fn arch(&self) -> CommandResult {
        self.run_nvm(&["arch"]).await
    }

    pub async fn set_arch(&self, arch: Arch) -> CommandResult {
        match arch.as_flag() {
            Some(flag) => self.run_nvm(&["arch", flag]).await,
            None => InvocationFailure::new("未知架构，只能设置为 64 或 32").into(),
        }
    }

    pub async fn enable(&self) -> CommandResult {
        self.run_nvm(&["on"]).await
    }

    pub async fn disable(&self) -> CommandResult {
        self.run_nvm(&["off"]).await
    }

    // ===== 环境信息 =====

    pub async fn npm_version(&self) -> CommandResult {
        self.run_npm(&["-v"]).await
    }

    pub async fn node_arch(&self) -> CommandResult {
        self.executor
            .run(&self.node, &["-p", "process.arch"])
            .await
    }

    /// 检测 nvm 是否可用
    pub async fn check_installation(&self) -> NvmStatus {
        let result = self.nvm_version().await;
        NvmStatus {
            installed: result.success,
            version: if result.success {
                Some(result.output.trim().to_string())
            } else {
                None
            },
        }
    }

    /// 统计 nvm 根目录占用
    pub async fn disk_usage(&self) -> anyhow::Result<DiskUsage> {
        let output = self.root().await.into_output()?;
        let root = parse_root_path(&output)
            .ok_or_else(|| anyhow::anyhow!("无法解析 nvm 根目录"))?;
        let root = PathBuf::from(root);
        tokio::task::spawn_blocking(move || disk::directory_size(&root)).await?
    }

    // ===== 全局 npm 包 =====

    /// npm list -g --depth=0 --json
    pub async fn list_global_packages(&self) -> Result<Vec<GlobalPackage>, InvocationFailure> {
        let output = self
            .run_npm(&["list", "-g", "--depth=0", "--json"])
            .await
            .into_output()?;
        parse_global_packages(&output).map_err(|e| InvocationFailure {
            message: "无法解析 npm 全局包列表".to_string(),
            detail: Some(e.to_string()),
        })
    }

    pub async fn install_global(&self, package: &str) -> CommandResult {
        let package = match validate_argument("包名", package) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        self.run_npm(&["install", "-g", package.as_str()]).await
    }

    pub async fn uninstall_global(&self, package: &str) -> CommandResult {
        let package = match validate_argument("包名", package) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        self.run_npm(&["uninstall", "-g", package.as_str()]).await
    }

    // ===== 导出 =====

    /// 收集当前状态快照
    pub async fn snapshot(&self) -> ConfigSnapshot {
        let (root, current, installed) =
            tokio::join!(self.root(), self.current(), self.list_installed());

        ConfigSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            nvm_root: root
                .into_output()
                .ok()
                .and_then(|o| parse_root_path(&o)),
            current_version: current
                .into_output()
                .ok()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
            installed_versions: installed.unwrap_or_default(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 导出配置快照到目录，返回写入的文件路径
    pub async fn export_config(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let snapshot = self.snapshot().await;
        let exporter = ConfigExporter::new(dir.to_path_buf());
        tokio::task::spawn_blocking(move || exporter.save(&snapshot)).await?
    }
}

fn with_arch(mut args: Vec<String>, arch: Option<Arch>) -> Vec<String> {
    if let Some(flag) = arch.and_then(|a| a.as_flag()) {
        args.push(flag.to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_and_rejects_options() {
        assert_eq!(validate_argument("版本号", " 18.17.0 ").unwrap(), "18.17.0");
        assert!(validate_argument("版本号", "   ").is_err());
        assert!(validate_argument("包名", "--registry=evil").is_err());
        assert_eq!(validate_argument("包名", "@vue/cli").unwrap(), "@vue/cli");
    }

    #[test]
    fn arch_flag_is_appended() {
        let args = with_arch(vec!["install".to_string(), "lts".to_string()], Some(Arch::Bit32));
        assert_eq!(args, vec!["install", "lts", "32"]);
        let args = with_arch(vec!["use".to_string(), "18.17.0".to_string()], Some(Arch::Unknown));
        assert_eq!(args, vec!["use", "18.17.0"]);
    }

    #[test]
    fn failed_result_into_output() {
        let err = CommandResult::failed("exit 1".to_string(), Some("not found".to_string()))
            .into_output()
            .unwrap_err();
        assert_eq!(err.message, "exit 1");
        assert_eq!(err.display_text(), "not found");
        assert_eq!(
            CommandResult::ok("ok".to_string()).into_output().unwrap(),
            "ok"
        );
    }

    /// 用 shell 脚本模拟 nvm / npm
    #[cfg(unix)]
    mod fake_tools {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        fn manager(dir: &Path, nvm_body: &str, npm_body: &str) -> NodeVersionManager {
            let config = Config {
                nvm_command: write_script(dir, "nvm", nvm_body),
                npm_command: write_script(dir, "npm", npm_body),
                node_command: write_script(dir, "node", "echo x64"),
                timeout_secs: 10,
                ..Config::default()
            };
            NodeVersionManager::new(&config)
        }

        const FAKE_NVM: &str = r#"
case "$1 $2" in
  "list available") printf 'LTS: 18.17.0\nCurrent: 20.5.0\n' ;;
  "list "*) printf '\n  * 20.5.0 (Currently using 64-bit executable)\n    18.17.0\n' ;;
  "current "*) echo v20.5.0 ;;
  "root "*) printf '\nCurrent Root: %s\n' "$NVM_FAKE_ROOT" ;;
  "version "*) echo 1.1.11 ;;
  "install "*) echo "install $2 $3" ;;
  "uninstall "*) echo "not installed: $2" 1>&2; exit 1 ;;
  *) echo "$@" ;;
esac
"#;

        #[tokio::test]
        async fn lists_installed_and_available() {
            let dir = tempfile::tempdir().unwrap();
            let nvm = manager(dir.path(), FAKE_NVM, "echo {}");

            let installed = nvm.list_installed().await.unwrap();
            assert_eq!(installed.len(), 2);
            assert!(installed[0].is_active);
            assert_eq!(installed[0].arch, Arch::Bit64);

            let available = nvm.list_available().await.unwrap();
            assert_eq!(available.lts.as_deref(), Some("18.17.0"));
            assert_eq!(available.current.as_deref(), Some("20.5.0"));
        }

        #[tokio::test]
        async fn install_passes_arch_as_separate_argument() {
            let dir = tempfile::tempdir().unwrap();
            let nvm = manager(dir.path(), FAKE_NVM, "echo {}");
            let result = nvm.install("18.17.0", Some(Arch::Bit64)).await;
            assert!(result.success);
            assert_eq!(result.output.trim(), "install 18.17.0 64");
        }

        #[tokio::test]
        async fn failed_uninstall_reports_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let nvm = manager(dir.path(), FAKE_NVM, "echo {}");
            let result = nvm.uninstall("14.0.0").await;
            assert!(!result.success);
            assert_eq!(result.error_text(), "not installed: 14.0.0");
        }

        #[tokio::test]
        async fn invalid_input_never_spawns() {
            let dir = tempfile::tempdir().unwrap();
            let nvm = manager(dir.path(), "touch \"$(dirname \"$0\")/spawned\"", "echo {}");
            let result = nvm.install("  ", None).await;
            assert!(!result.success);
            assert!(!dir.path().join("spawned").exists());
        }

        #[tokio::test]
        async fn global_packages_from_json_report() {
            let dir = tempfile::tempdir().unwrap();
            let npm = r#"echo '{"dependencies":{"pnpm":{"version":"8.6.0"}}}'"#;
            let nvm = manager(dir.path(), FAKE_NVM, npm);
            let packages = nvm.list_global_packages().await.unwrap();
            assert_eq!(
                packages,
                vec![GlobalPackage {
                    name: "pnpm".to_string(),
                    version: "8.6.0".to_string()
                }]
            );

            let broken = manager(dir.path(), FAKE_NVM, "echo oops");
            let err = broken.list_global_packages().await.unwrap_err();
            assert_eq!(err.message, "无法解析 npm 全局包列表");
        }

        #[tokio::test]
        async fn check_installation_and_node_arch() {
            let dir = tempfile::tempdir().unwrap();
            let nvm = manager(dir.path(), FAKE_NVM, "echo {}");
            let status = nvm.check_installation().await;
            assert!(status.installed);
            assert_eq!(status.version.as_deref(), Some("1.1.11"));
            assert_eq!(nvm.node_arch().await.output.trim(), "x64");

            let missing = Config {
                nvm_command: dir.path().join("no-such-nvm").display().to_string(),
                ..Config::default()
            };
            let status = NodeVersionManager::new(&missing).check_installation().await;
            assert!(!status.installed);
            assert_eq!(status.version, None);
        }

        #[tokio::test]
        async fn disk_usage_and_export() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("nvm-root");
            fs::create_dir_all(root.join("v20.5.0")).unwrap();
            fs::write(root.join("v20.5.0").join("node.exe"), vec![1u8; 64]).unwrap();

            let body = FAKE_NVM.replace("$NVM_FAKE_ROOT", &root.display().to_string());
            let nvm = manager(dir.path(), &body, "echo {}");

            let usage = nvm.disk_usage().await.unwrap();
            assert_eq!(usage.bytes, 64);

            let path = nvm.export_config(&dir.path().join("exports")).await.unwrap();
            let value: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(value["nvmRoot"], root.display().to_string());
            assert_eq!(value["currentVersion"], "v20.5.0");
            assert_eq!(value["installedVersions"].as_array().unwrap().len(), 2);
        }
    }
}
