mod dashboard;
pub mod input;
mod install;
mod layout;
mod packages;
mod settings;
pub mod state;
mod tasks;
mod theme;
mod versions;

use crate::config::Config;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use state::{App, AppEvent, AppMode, LogKind, ToastKind};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{self, Sender};

pub async fn run(config: Config) -> Result<()> {
    // 终端初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, config).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
) -> Result<()> {
    let mut app = App::new(config);
    let (tx, mut rx) = mpsc::channel(32);

    // 启动时检测环境并读取已安装版本
    tasks::spawn_detect_env(&app, &tx);
    tasks::spawn_load_versions(&mut app, &tx);

    // 主循环
    loop {
        app.tick();
        terminal.draw(|f| ui(f, &app))?;

        // 处理按键
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(key, &mut app, &tx);
                }
            }
        }

        // 处理异步事件
        while let Ok(event) = rx.try_recv() {
            handle_event(event, &mut app, &tx);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    // Ctrl+C 任何时候都退出
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // 确认弹窗优先
    if let Some(confirm) = app.confirm.take() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                tasks::spawn_action(app, tx, confirm.action);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
            // 其它按键不关闭弹窗
            _ => app.confirm = Some(confirm),
        }
        return;
    }

    match app.mode {
        AppMode::Dashboard => handle_dashboard_key(key, app, tx),
        AppMode::Versions => versions::handle_versions_key(key, app, tx),
        AppMode::Install => install::handle_install_key(key, app, tx),
        AppMode::Packages => packages::handle_packages_key(key, app, tx),
        AppMode::Settings => settings::handle_settings_key(key, app, tx),
    }
}

/// 首页快捷键；其余页面有输入框，只在首页用字母切换
fn handle_dashboard_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('v' | 'V') => enter_mode(AppMode::Versions, app, tx),
        KeyCode::Char('i' | 'I') => enter_mode(AppMode::Install, app, tx),
        KeyCode::Char('p' | 'P') => enter_mode(AppMode::Packages, app, tx),
        KeyCode::Char('c' | 'C') => enter_mode(AppMode::Settings, app, tx),
        KeyCode::Char('r') => {
            app.log.push(LogKind::Command, "重新检测环境");
            tasks::spawn_detect_env(app, tx);
            tasks::spawn_load_versions(app, tx);
        }
        _ => {}
    }
}

fn enter_mode(mode: AppMode, app: &mut App, tx: &Sender<AppEvent>) {
    app.mode = mode;
    match mode {
        AppMode::Versions => {
            app.versions.filter.clear();
            app.versions.apply_filter();
            if app.versions.versions.is_empty() && !app.versions.loading {
                tasks::spawn_load_versions(app, tx);
            }
        }
        AppMode::Install => {
            if app.install.available.is_none() && !app.install.loading {
                tasks::spawn_load_available(app, tx);
            }
        }
        AppMode::Packages => {
            if !app.packages.loading {
                tasks::spawn_load_packages(app, tx);
            }
        }
        AppMode::Settings => app.build_settings_items(),
        AppMode::Dashboard => {}
    }
}

fn handle_event(event: AppEvent, app: &mut App, tx: &Sender<AppEvent>) {
    match event {
        AppEvent::EnvDetected(info) => {
            if !info.nvm.installed {
                app.log.push(
                    LogKind::Warning,
                    format!("未找到 {}，请确认 nvm 已安装并在 PATH 中", app.nvm.nvm_command()),
                );
            }
            app.env = Some(info);
            if app.mode == AppMode::Settings && !app.settings.editing {
                app.build_settings_items();
            }
        }
        AppEvent::DiskUsageLoaded(usage) => {
            app.disk_usage = usage;
        }
        AppEvent::VersionsLoaded(result) => {
            app.versions.loading = false;
            match result {
                Ok(versions) => {
                    app.versions.versions = versions;
                    app.versions.error = None;
                }
                Err(e) => {
                    app.log.push(LogKind::Error, format!("读取已安装版本失败: {}", e.display_text()));
                    app.versions.error = Some(e.display_text().to_string());
                }
            }
            app.versions.apply_filter();
        }
        AppEvent::AvailableLoaded(result) => {
            app.install.loading = false;
            match result {
                Ok(set) => {
                    app.install.selected = 0;
                    app.install.available = Some(set);
                    app.install.error = None;
                }
                Err(e) => {
                    app.log.push(LogKind::Error, format!("读取可安装版本失败: {}", e.display_text()));
                    app.install.error = Some(e.display_text().to_string());
                }
            }
        }
        AppEvent::PackagesLoaded(result) => {
            app.packages.loading = false;
            match result {
                Ok(packages) => {
                    app.packages.packages = packages;
                    app.packages.error = None;
                }
                Err(e) => {
                    app.log.push(LogKind::Error, format!("读取全局包失败: {}", e.display_text()));
                    app.packages.error = Some(e.display_text().to_string());
                }
            }
            app.packages.apply_filter();
        }
        AppEvent::ActionFinished { action, result } => {
            tasks::finish_action(app, tx, action, result);
        }
        AppEvent::Exported(result) => match result {
            Ok(path) => {
                let message = format!("配置已导出到 {}", path.display());
                app.log.push(LogKind::Success, message.clone());
                app.notify(message, ToastKind::Success);
            }
            Err(e) => {
                app.log.push(LogKind::Error, format!("导出失败: {}", e));
                app.notify("导出失败", ToastKind::Error);
            }
        },
    }
}

fn ui(f: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Dashboard => dashboard::render_dashboard(f, app),
        AppMode::Versions => versions::render_versions(f, app),
        AppMode::Install => install::render_install(f, app),
        AppMode::Packages => packages::render_packages(f, app),
        AppMode::Settings => settings::render_settings(f, app),
    }

    if let Some(confirm) = &app.confirm {
        layout::render_confirm(f, &confirm.message);
    }
}
