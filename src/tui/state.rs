use super::input::InputBox;
use crate::config::Config;
use crate::envinfo::EnvInfo;
use crate::nvm::{
    Arch, AvailableVersionSet, CommandResult, DiskUsage, GlobalPackage, InstalledVersion,
    InvocationFailure, NodeVersionManager,
};
use chrono::Local;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// 提示消息显示时长
const TOAST_DURATION: Duration = Duration::from_secs(3);

// ========== 枚举 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Dashboard,
    Versions, // 已安装版本：use / uninstall
    Install,  // 安装新版本
    Packages, // 全局 npm 包
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Command,
    Output,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// 会修改 nvm / npm 状态的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install { version: String, arch: Option<Arch> },
    Use(String),
    Uninstall(String),
    InstallPackage(String),
    UninstallPackage(String),
    SetRoot(String),
    SetProxy(Option<String>),
    SetArch(Arch),
    Enable,
    Disable,
}

/// 操作完成后需要重新加载的数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Versions,
    Packages,
    Environment,
}

impl Action {
    /// 与之等价的命令行（仅用于日志展示）
    pub fn command_line(&self, app: &App) -> String {
        let nvm = app.nvm.nvm_command();
        let npm = app.nvm.npm_command();
        match self {
            Action::Install { version, arch } => match arch.and_then(|a| a.as_flag()) {
                Some(flag) => format!("{nvm} install {version} {flag}"),
                None => format!("{nvm} install {version}"),
            },
            Action::Use(version) => format!("{nvm} use {version}"),
            Action::Uninstall(version) => format!("{nvm} uninstall {version}"),
            Action::InstallPackage(name) => format!("{npm} install -g {name}"),
            Action::UninstallPackage(name) => format!("{npm} uninstall -g {name}"),
            Action::SetRoot(path) => format!("{nvm} root {path}"),
            Action::SetProxy(proxy) => format!("{nvm} proxy {}", proxy.as_deref().unwrap_or("none")),
            Action::SetArch(arch) => format!("{nvm} arch {}", arch.as_str()),
            Action::Enable => format!("{nvm} on"),
            Action::Disable => format!("{nvm} off"),
        }
    }

    pub fn success_message(&self) -> String {
        match self {
            Action::Install { version, .. } => format!("Node.js {version} 安装完成"),
            Action::Use(version) => format!("已切换到 Node.js {version}"),
            Action::Uninstall(version) => format!("Node.js {version} 已卸载"),
            Action::InstallPackage(name) => format!("{name} 安装完成"),
            Action::UninstallPackage(name) => format!("{name} 已卸载"),
            Action::SetRoot(path) => format!("nvm 根目录已改为 {path}"),
            Action::SetProxy(Some(proxy)) => format!("代理已设置为 {proxy}"),
            Action::SetProxy(None) => "代理已清除".to_string(),
            Action::SetArch(arch) => format!("默认架构已设置为 {}-bit", arch.as_str()),
            Action::Enable => "nvm 已启用".to_string(),
            Action::Disable => "nvm 已停用".to_string(),
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Action::Install { .. } => "安装失败",
            Action::Use(_) => "切换版本失败",
            Action::Uninstall(_) => "卸载失败",
            Action::InstallPackage(_) => "安装包失败",
            Action::UninstallPackage(_) => "卸载包失败",
            Action::SetRoot(_) => "修改根目录失败",
            Action::SetProxy(_) => "设置代理失败",
            Action::SetArch(_) => "设置架构失败",
            Action::Enable => "启用 nvm 失败",
            Action::Disable => "停用 nvm 失败",
        }
    }

    /// 是否来自设置页
    pub fn is_setting(&self) -> bool {
        matches!(
            self,
            Action::SetRoot(_)
                | Action::SetProxy(_)
                | Action::SetArch(_)
                | Action::Enable
                | Action::Disable
        )
    }

    pub fn refreshes(&self) -> &'static [Refresh] {
        match self {
            Action::Install { .. } | Action::Uninstall(_) => &[Refresh::Versions, Refresh::Environment],
            Action::Use(_) => &[Refresh::Versions, Refresh::Environment, Refresh::Packages],
            Action::InstallPackage(_) | Action::UninstallPackage(_) => &[Refresh::Packages],
            Action::SetRoot(_) => &[Refresh::Environment, Refresh::Versions],
            Action::SetProxy(_) | Action::SetArch(_) | Action::Enable | Action::Disable => {
                &[Refresh::Environment]
            }
        }
    }
}

/// 设置页面项目类型
#[derive(Debug, Clone)]
pub enum SettingsItem {
    /// 分组标题（不可选中）
    Section(String),
    /// 复选框开关项
    Toggle {
        label: String,
        key: String,
        value: bool,
    },
    /// 多选一，Enter 循环切换
    Choice {
        label: String,
        key: String,
        options: Vec<String>,
        index: usize,
    },
    /// 文本编辑项
    TextEdit {
        label: String,
        key: String,
        value: String,
    },
    /// 执行一次性操作
    Button { label: String, key: String },
}

// ========== 事件 ==========

#[derive(Debug)]
pub enum AppEvent {
    EnvDetected(EnvInfo),
    VersionsLoaded(Result<Vec<InstalledVersion>, InvocationFailure>),
    AvailableLoaded(Result<AvailableVersionSet, InvocationFailure>),
    DiskUsageLoaded(Option<DiskUsage>),
    PackagesLoaded(Result<Vec<GlobalPackage>, InvocationFailure>),
    ActionFinished { action: Action, result: CommandResult },
    Exported(Result<PathBuf, String>),
}

// ========== 活动日志 / 提示 / 确认框 ==========

#[derive(Debug, Clone)]
pub struct LogLine {
    pub time: String,
    pub kind: LogKind,
    pub text: String,
}

/// 命令活动日志，超过容量时丢弃最旧的行
#[derive(Debug, Clone)]
pub struct ActivityLog {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, kind: LogKind, text: impl Into<String>) {
        let text = text.into();
        // 多行输出逐行记录
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.lines.push_back(LogLine {
                time: Local::now().format("%H:%M:%S").to_string(),
                kind,
                text: line.trim_end().to_string(),
            });
        }
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_DURATION
    }
}

/// 需要用户确认的操作
#[derive(Debug, Clone)]
pub struct Confirm {
    pub message: String,
    pub action: Action,
}

// ========== 子状态结构体 ==========

pub struct VersionsModeState {
    pub filter: InputBox,
    pub versions: Vec<InstalledVersion>,
    pub filtered: Vec<usize>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct InstallModeState {
    pub input: InputBox,
    /// None 表示使用 nvm 默认架构
    pub arch: Option<Arch>,
    pub available: Option<AvailableVersionSet>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct PackagesModeState {
    pub input: InputBox,
    pub packages: Vec<GlobalPackage>,
    pub filtered: Vec<usize>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct SettingsModeState {
    pub items: Vec<SettingsItem>,
    pub selected: usize,
    pub editing: bool,
    pub edit: InputBox,
    pub message: Option<String>,
}

// ========== 子状态 impl ==========

impl VersionsModeState {
    pub fn new() -> Self {
        Self {
            filter: InputBox::new(),
            versions: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            loading: false,
            error: None,
        }
    }

    /// 对已安装版本列表应用筛选
    pub fn apply_filter(&mut self) {
        let keyword = self.filter.content().trim().trim_start_matches('v').to_lowercase();
        self.filtered = self
            .versions
            .iter()
            .enumerate()
            .filter(|(_, v)| keyword.is_empty() || v.version.contains(&keyword))
            .map(|(i, _)| i)
            .collect();
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }

    pub fn selected_version(&self) -> Option<&InstalledVersion> {
        self.filtered
            .get(self.selected)
            .and_then(|&i| self.versions.get(i))
    }

    pub fn active_version(&self) -> Option<&InstalledVersion> {
        self.versions.iter().find(|v| v.is_active)
    }
}

impl InstallModeState {
    pub fn new() -> Self {
        Self {
            input: InputBox::new(),
            arch: None,
            available: None,
            selected: 0,
            loading: false,
            error: None,
        }
    }

    /// 架构循环：默认 → 64 → 32 → 默认
    pub fn cycle_arch(&mut self) {
        self.arch = match self.arch {
            None => Some(Arch::Bit64),
            Some(Arch::Bit64) => Some(Arch::Bit32),
            Some(_) => None,
        };
    }

    pub fn arch_label(&self) -> &'static str {
        match self.arch {
            Some(Arch::Bit64) => "64-bit",
            Some(Arch::Bit32) => "32-bit",
            _ => "默认",
        }
    }

    /// 要安装的版本：输入框优先，其次是列表选中项
    pub fn target_version(&self) -> Option<String> {
        let typed = self.input.content().trim();
        if !typed.is_empty() {
            return Some(typed.to_string());
        }
        self.available
            .as_ref()
            .and_then(|set| set.all.get(self.selected))
            .map(|v| v.version.clone())
    }
}

impl PackagesModeState {
    pub fn new() -> Self {
        Self {
            input: InputBox::new(),
            packages: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            loading: false,
            error: None,
        }
    }

    pub fn apply_filter(&mut self) {
        let keyword = self.input.content().trim().to_lowercase();
        self.filtered = self
            .packages
            .iter()
            .enumerate()
            .filter(|(_, p)| keyword.is_empty() || p.name.to_lowercase().contains(&keyword))
            .map(|(i, _)| i)
            .collect();
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }

    pub fn selected_package(&self) -> Option<&GlobalPackage> {
        self.filtered
            .get(self.selected)
            .and_then(|&i| self.packages.get(i))
    }
}

impl SettingsModeState {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            editing: false,
            edit: InputBox::new(),
            message: None,
        }
    }

    /// 可聚焦项在 items 中的实际下标
    pub fn focused_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !matches!(item, SettingsItem::Section(_)))
            .map(|(i, _)| i)
            .nth(self.selected)
    }

    pub fn focusable_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !matches!(item, SettingsItem::Section(_)))
            .count()
    }
}

// ========== App ==========

/// 整个界面的状态，所有渲染和按键处理都显式接收它
pub struct App {
    pub mode: AppMode,
    pub config: Config,
    pub nvm: NodeVersionManager,
    pub env: Option<EnvInfo>,
    pub disk_usage: Option<DiskUsage>,
    pub nvm_enabled: bool,
    pub log: ActivityLog,
    pub toast: Option<Toast>,
    pub confirm: Option<Confirm>,
    /// 正在执行的修改类操作；同一时间只允许一个
    pub running: Option<Action>,
    pub should_quit: bool,
    // 子状态
    pub versions: VersionsModeState,
    pub install: InstallModeState,
    pub packages: PackagesModeState,
    pub settings: SettingsModeState,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            mode: AppMode::Dashboard,
            nvm: NodeVersionManager::new(&config),
            log: ActivityLog::new(config.log_lines),
            config,
            env: None,
            disk_usage: None,
            nvm_enabled: true,
            toast: None,
            confirm: None,
            running: None,
            should_quit: false,
            versions: VersionsModeState::new(),
            install: InstallModeState::new(),
            packages: PackagesModeState::new(),
            settings: SettingsModeState::new(),
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind));
    }

    /// 清理过期提示
    pub fn tick(&mut self) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }
    }

    /// 把命令结果写入活动日志和提示
    pub fn record_result(&mut self, action: &Action, result: &CommandResult) {
        if result.success {
            self.log.push(LogKind::Success, action.success_message());
            self.log.push(LogKind::Output, result.output.clone());
            self.notify(action.success_message(), ToastKind::Success);
        } else {
            self.log.push(LogKind::Error, action.failure_message());
            self.log.push(LogKind::Error, result.error_text().to_string());
            self.notify(action.failure_message(), ToastKind::Error);
        }
    }

    /// 配置中的命令 / 超时变化后重建 nvm 封装
    pub fn rebuild_nvm(&mut self) {
        self.nvm = NodeVersionManager::new(&self.config);
    }

    /// 从当前状态构建设置项列表
    pub fn build_settings_items(&mut self) {
        let env = self.env.as_ref();
        let arch_index = match env.map(|e| e.default_arch) {
            Some(Arch::Bit32) => 1,
            _ => 0,
        };
        self.settings.items = vec![
            SettingsItem::Section("nvm".to_string()),
            SettingsItem::Toggle {
                label: "启用 nvm".to_string(),
                key: "nvm.enabled".to_string(),
                value: self.nvm_enabled,
            },
            SettingsItem::TextEdit {
                label: "根目录".to_string(),
                key: "nvm.root".to_string(),
                value: env.and_then(|e| e.root.clone()).unwrap_or_default(),
            },
            SettingsItem::TextEdit {
                label: "代理".to_string(),
                key: "nvm.proxy".to_string(),
                value: env.and_then(|e| e.proxy.clone()).unwrap_or_default(),
            },
            SettingsItem::Choice {
                label: "默认架构".to_string(),
                key: "nvm.arch".to_string(),
                options: vec!["64-bit".to_string(), "32-bit".to_string()],
                index: arch_index,
            },
            SettingsItem::Section("命令".to_string()),
            SettingsItem::TextEdit {
                label: "nvm 命令".to_string(),
                key: "nvm_command".to_string(),
                value: self.config.nvm_command.clone(),
            },
            SettingsItem::TextEdit {
                label: "npm 命令".to_string(),
                key: "npm_command".to_string(),
                value: self.config.npm_command.clone(),
            },
            SettingsItem::TextEdit {
                label: "node 命令".to_string(),
                key: "node_command".to_string(),
                value: self.config.node_command.clone(),
            },
            SettingsItem::TextEdit {
                label: "超时(秒)".to_string(),
                key: "timeout_secs".to_string(),
                value: self.config.timeout_secs.to_string(),
            },
            SettingsItem::TextEdit {
                label: "日志行数".to_string(),
                key: "log_lines".to_string(),
                value: self.config.log_lines.to_string(),
            },
            SettingsItem::Section("导出".to_string()),
            SettingsItem::TextEdit {
                label: "导出目录".to_string(),
                key: "export_dir".to_string(),
                value: self.config.export_dir.display().to_string(),
            },
            SettingsItem::Button {
                label: "导出配置快照".to_string(),
                key: "export".to_string(),
            },
        ];
        self.settings.selected = self
            .settings
            .selected
            .min(self.settings.focusable_count().saturating_sub(1));
        self.settings.editing = false;
    }

    /// 写回应用配置项；nvm 相关项返回需要执行的操作
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Option<Action> {
        let value = value.trim();
        match key {
            "nvm.root" => {
                if value.is_empty() {
                    self.settings.message = Some("✗ 根目录不能为空".to_string());
                    None
                } else {
                    Some(Action::SetRoot(value.to_string()))
                }
            }
            "nvm.proxy" => Some(Action::SetProxy(
                Some(value.to_string()).filter(|v| !v.is_empty()),
            )),
            "nvm_command" | "npm_command" | "node_command" if value.is_empty() => {
                self.settings.message = Some("✗ 命令不能为空".to_string());
                None
            }
            "nvm_command" => {
                self.config.nvm_command = value.to_string();
                self.rebuild_nvm();
                None
            }
            "npm_command" => {
                self.config.npm_command = value.to_string();
                self.rebuild_nvm();
                None
            }
            "node_command" => {
                self.config.node_command = value.to_string();
                self.rebuild_nvm();
                None
            }
            "timeout_secs" => {
                match value.parse::<u64>() {
                    Ok(t) if t > 0 => {
                        self.config.timeout_secs = t;
                        self.rebuild_nvm();
                    }
                    _ => self.settings.message = Some("✗ 超时必须是正整数".to_string()),
                }
                None
            }
            "log_lines" => {
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => {
                        self.config.log_lines = n;
                        self.log.set_capacity(n);
                    }
                    _ => self.settings.message = Some("✗ 日志行数必须是正整数".to_string()),
                }
                None
            }
            "export_dir" => {
                if !value.is_empty() {
                    self.config.export_dir = PathBuf::from(value);
                }
                None
            }
            _ => None,
        }
    }

    /// 保存配置到磁盘
    pub fn save_settings(&mut self) {
        match self.config.save() {
            Ok(()) => {
                self.settings.message = Some(format!(
                    "✓ 已保存到 {}",
                    crate::config::Config::config_path().display()
                ));
            }
            Err(e) => {
                log::error!("保存配置失败: {}", e);
                self.settings.message = Some(format!("✗ 保存失败: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(v: &str, active: bool) -> InstalledVersion {
        InstalledVersion {
            version: v.to_string(),
            is_active: active,
            is_lts: false,
            arch: Arch::Unknown,
        }
    }

    #[test]
    fn activity_log_keeps_last_lines() {
        let mut log = ActivityLog::new(3);
        log.push(LogKind::Command, "nvm list");
        log.push(LogKind::Output, "a\n\nb\nc");
        assert_eq!(log.len(), 3);
        let texts: Vec<&str> = log.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn versions_filter_ignores_v_prefix() {
        let mut state = VersionsModeState::new();
        state.versions = vec![version("20.5.0", true), version("18.17.0", false)];
        for c in "v18".chars() {
            state.filter.insert(c);
        }
        state.apply_filter();
        assert_eq!(state.filtered, vec![1]);
        assert_eq!(state.selected_version().map(|v| v.version.as_str()), Some("18.17.0"));
        assert_eq!(state.active_version().map(|v| v.version.as_str()), Some("20.5.0"));
    }

    #[test]
    fn install_target_prefers_typed_version() {
        let mut state = InstallModeState::new();
        state.available = Some(crate::nvm::parser::parse_available_versions(
            "LTS: 18.17.0\nCurrent: 20.5.0",
        ));
        state.selected = 1;
        assert_eq!(state.target_version().as_deref(), Some("20.5.0"));
        for c in "lts".chars() {
            state.input.insert(c);
        }
        assert_eq!(state.target_version().as_deref(), Some("lts"));
    }

    #[test]
    fn arch_cycles_through_default() {
        let mut state = InstallModeState::new();
        state.cycle_arch();
        assert_eq!(state.arch, Some(Arch::Bit64));
        state.cycle_arch();
        assert_eq!(state.arch, Some(Arch::Bit32));
        state.cycle_arch();
        assert_eq!(state.arch, None);
        assert_eq!(state.arch_label(), "默认");
    }

    #[test]
    fn settings_apply_validates_values() {
        let mut app = App::new(Config::default());
        app.build_settings_items();

        assert_eq!(app.apply_setting("timeout_secs", "abc"), None);
        assert_eq!(app.config.timeout_secs, 60);
        assert!(app.settings.message.is_some());

        app.apply_setting("timeout_secs", " 90 ");
        assert_eq!(app.config.timeout_secs, 90);

        assert_eq!(
            app.apply_setting("nvm.proxy", "  "),
            Some(Action::SetProxy(None))
        );
        assert_eq!(
            app.apply_setting("nvm.root", "D:\\nvm"),
            Some(Action::SetRoot("D:\\nvm".to_string()))
        );
    }

    #[test]
    fn settings_focus_skips_sections() {
        let mut app = App::new(Config::default());
        app.build_settings_items();
        app.settings.selected = 0;
        assert_eq!(app.settings.focused_index(), Some(1));
        assert!(matches!(
            app.settings.items[1],
            SettingsItem::Toggle { .. }
        ));
    }

    #[test]
    fn failed_action_is_logged_with_stderr() {
        let mut app = App::new(Config::default());
        let action = Action::Uninstall("14.0.0".to_string());
        let result = CommandResult::failed("exit 1".to_string(), Some("not installed".to_string()));
        app.record_result(&action, &result);
        let last = app.log.lines().last().unwrap();
        assert_eq!(last.kind, LogKind::Error);
        assert_eq!(last.text, "not installed");
        assert_eq!(app.toast.as_ref().unwrap().kind, ToastKind::Error);
        assert_eq!(action.command_line(&app), "nvm uninstall 14.0.0");
    }
}
