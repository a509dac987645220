//! 后台任务：所有 nvm / npm 调用都在 tokio 任务里执行，结果通过通道送回主循环

use super::state::{Action, App, AppEvent, LogKind, Refresh, ToastKind};
use crate::envinfo::EnvInfo;
use crate::nvm::{CommandResult, NodeVersionManager};
use tokio::sync::mpsc::Sender;

pub fn spawn_detect_env(app: &App, tx: &Sender<AppEvent>) {
    let nvm = app.nvm.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let info = EnvInfo::detect(&nvm).await;
        let _ = tx.send(AppEvent::EnvDetected(info)).await;
        // 磁盘占用依赖根目录，放在环境检测之后
        let usage = match nvm.disk_usage().await {
            Ok(usage) => Some(usage),
            Err(e) => {
                log::warn!("统计磁盘占用失败: {:#}", e);
                None
            }
        };
        let _ = tx.send(AppEvent::DiskUsageLoaded(usage)).await;
    });
}

pub fn spawn_load_versions(app: &mut App, tx: &Sender<AppEvent>) {
    app.versions.loading = true;
    let nvm = app.nvm.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = nvm.list_installed().await;
        let _ = tx.send(AppEvent::VersionsLoaded(result)).await;
    });
}

pub fn spawn_load_available(app: &mut App, tx: &Sender<AppEvent>) {
    app.install.loading = true;
    let nvm = app.nvm.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = nvm.list_available().await;
        let _ = tx.send(AppEvent::AvailableLoaded(result)).await;
    });
}

pub fn spawn_load_packages(app: &mut App, tx: &Sender<AppEvent>) {
    app.packages.loading = true;
    let nvm = app.nvm.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = nvm.list_global_packages().await;
        let _ = tx.send(AppEvent::PackagesLoaded(result)).await;
    });
}

pub fn spawn_export(app: &mut App, tx: &Sender<AppEvent>) {
    let nvm = app.nvm.clone();
    let dir = app.config.export_dir.clone();
    let tx = tx.clone();
    app.log.push(LogKind::Command, format!("导出配置到 {}", dir.display()));
    tokio::spawn(async move {
        let result = nvm.export_config(&dir).await.map_err(|e| {
            log::error!("导出配置失败: {:#}", e);
            format!("{:#}", e)
        });
        let _ = tx.send(AppEvent::Exported(result)).await;
    });
}

/// 启动一个修改类操作；已有操作在执行时拒绝
///
/// 返回是否真正启动
pub fn spawn_action(app: &mut App, tx: &Sender<AppEvent>, action: Action) -> bool {
    if let Some(running) = &app.running {
        let message = format!("请等待 {} 完成", running.command_line(app));
        app.notify(message, ToastKind::Info);
        return false;
    }

    let command_line = action.command_line(app);
    app.log.push(LogKind::Command, command_line);
    app.running = Some(action.clone());

    let nvm = app.nvm.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = perform(&nvm, &action).await;
        let _ = tx.send(AppEvent::ActionFinished { action, result }).await;
    });
    true
}

async fn perform(nvm: &NodeVersionManager, action: &Action) -> CommandResult {
    match action {
        Action::Install { version, arch } => nvm.install(version, *arch).await,
        Action::Use(version) => nvm.use_version(version, None).await,
        Action::Uninstall(version) => nvm.uninstall(version).await,
        Action::InstallPackage(name) => nvm.install_global(name).await,
        Action::UninstallPackage(name) => nvm.uninstall_global(name).await,
        Action::SetRoot(path) => nvm.set_root(path).await,
        Action::SetProxy(proxy) => nvm.set_proxy(proxy.as_deref()).await,
        Action::SetArch(arch) => nvm.set_arch(*arch).await,
        Action::Enable => nvm.enable().await,
        Action::Disable => nvm.disable().await,
    }
}

/// 操作已经结束：记录结果，再按需刷新
pub fn finish_action(app: &mut App, tx: &Sender<AppEvent>, action: Action, result: CommandResult) {
    app.running = None;
    app.record_result(&action, &result);

    if !result.success {
        if matches!(action, Action::Enable | Action::Disable) {
            app.nvm_enabled = matches!(action, Action::Disable);
        }
        // 设置页的修改失败时，按未变的状态恢复显示
        if action.is_setting() {
            app.build_settings_items();
        }
        return;
    }

    match &action {
        Action::Install { .. } => app.install.input.clear(),
        Action::InstallPackage(_) => {
            app.packages.input.clear();
            app.packages.apply_filter();
        }
        Action::Enable => app.nvm_enabled = true,
        Action::Disable => app.nvm_enabled = false,
        _ => {}
    }

    for refresh in action.refreshes() {
        match refresh {
            Refresh::Versions => spawn_load_versions(app, tx),
            Refresh::Packages => spawn_load_packages(app, tx),
            Refresh::Environment => spawn_detect_env(app, tx),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tokio::sync::mpsc;

    fn app_with_nvm(body: &str) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvm");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let config = Config {
            nvm_command: path.display().to_string(),
            ..Config::default()
        };
        (App::new(config), dir)
    }

    #[tokio::test]
    async fn second_action_is_rejected_while_running() {
        let (mut app, _dir) = app_with_nvm("sleep 1");
        let (tx, _rx) = mpsc::channel(8);

        assert!(spawn_action(&mut app, &tx, Action::Use("18.17.0".to_string())));
        assert!(!spawn_action(&mut app, &tx, Action::Uninstall("16.0.0".to_string())));
        assert_eq!(app.running, Some(Action::Use("18.17.0".to_string())));
    }

    #[tokio::test]
    async fn refresh_starts_after_action_finishes() {
        let (mut app, _dir) = app_with_nvm(
            r#"
case "$1" in
  use) echo "Now using node v18.17.0" ;;
  list) echo "  * 18.17.0 (Currently using 64-bit executable)" ;;
esac
"#,
        );
        let (tx, mut rx) = mpsc::channel(8);

        spawn_action(&mut app, &tx, Action::Use("18.17.0".to_string()));
        assert!(!app.versions.loading);

        let Some(AppEvent::ActionFinished { action, result }) = rx.recv().await else {
            panic!("expected ActionFinished");
        };
        assert!(result.success);
        finish_action(&mut app, &tx, action, result);
        assert!(app.running.is_none());
        assert!(app.versions.loading);

        // 刷新事件顺序不固定，找到版本列表即可
        loop {
            match rx.recv().await {
                Some(AppEvent::VersionsLoaded(Ok(versions))) => {
                    assert_eq!(versions.len(), 1);
                    assert!(versions[0].is_active);
                    break;
                }
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }
    }

    #[tokio::test]
    async fn failed_toggle_restores_checkbox() {
        let (mut app, _dir) = app_with_nvm("echo 'access denied' >&2; exit 1");
        let (tx, mut rx) = mpsc::channel(8);
        app.nvm_enabled = true;

        spawn_action(&mut app, &tx, Action::Disable);
        let Some(AppEvent::ActionFinished { action, result }) = rx.recv().await else {
            panic!("expected ActionFinished");
        };
        finish_action(&mut app, &tx, action, result);
        assert!(app.nvm_enabled);
        assert!(app.log.lines().any(|l| l.text == "access denied"));
    }
}
