use super::input::render_input_box;
use super::layout;
use super::state::{Action, App, AppEvent, AppMode, Confirm, ToastKind};
use super::tasks;
use super::theme::{BRIGHT_WHITE, DIM, RED, SEL_BG};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc::Sender;

/// 处理全局包页按键；输入框同时用于筛选和填写要安装的包名
pub fn handle_packages_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            if app.packages.input.content().is_empty() {
                app.mode = AppMode::Dashboard;
            } else {
                app.packages.input.clear();
                app.packages.apply_filter();
            }
        }
        KeyCode::Up => {
            app.packages.selected = app.packages.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.packages.selected + 1 < app.packages.filtered.len() {
                app.packages.selected += 1;
            }
        }
        KeyCode::Char('a') if ctrl => {
            let name = app.packages.input.content().trim().to_string();
            if name.is_empty() {
                app.notify("请先输入包名", ToastKind::Info);
            } else {
                tasks::spawn_action(app, tx, Action::InstallPackage(name));
            }
        }
        KeyCode::Char('d') if ctrl => {
            if let Some(package) = app.packages.selected_package() {
                let name = package.name.clone();
                app.confirm = Some(Confirm {
                    message: format!("确定卸载全局包 {}？", name),
                    action: Action::UninstallPackage(name),
                });
            }
        }
        KeyCode::Char('r') if ctrl => tasks::spawn_load_packages(app, tx),
        _ => {
            if app.packages.input.handle_key(key) {
                app.packages.selected = 0;
                app.packages.apply_filter();
            }
        }
    }
}

pub fn render_packages(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    layout::render_header(f, "📦  全局 npm 包", chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(chunks[1]);

    render_input_box(
        f,
        &app.packages.input,
        "包名:",
        "输入以筛选，Ctrl+A 安装",
        true,
        body[0],
    );
    render_list(f, app, body[1]);

    layout::render_activity_log(f, app, chunks[2]);
    layout::render_footer(
        f,
        app,
        "↑↓ 选择 | Ctrl+A 安装 | Ctrl+D 卸载 | Ctrl+R 刷新 | Esc 返回",
        chunks[3],
    );
}

fn render_list(f: &mut Frame, app: &App, area: Rect) {
    let state = &app.packages;
    let block = Block::default()
        .title(format!(" 共 {} 个包 ", state.packages.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    if state.loading && state.packages.is_empty() {
        f.render_widget(Paragraph::new("正在读取 npm 全局包...").style(Style::default().fg(DIM)), inner);
        return;
    }
    if let Some(error) = &state.error {
        f.render_widget(
            Paragraph::new(format!("✗ {}", error)).style(Style::default().fg(RED)),
            inner,
        );
        return;
    }
    if state.filtered.is_empty() {
        let hint = if state.packages.is_empty() {
            "没有全局安装的包"
        } else {
            "没有匹配的包，Ctrl+A 按输入安装"
        };
        f.render_widget(Paragraph::new(hint).style(Style::default().fg(DIM)), inner);
        return;
    }

    let name_width = state
        .packages
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(10)
        + 2;
    let visible = inner.height as usize;
    let scroll = layout::list_scroll(state.selected, visible);

    let lines: Vec<Line> = state
        .filtered
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .filter_map(|(row, &idx)| state.packages.get(idx).map(|p| (row, p)))
        .map(|(row, p)| {
            let selected = row == state.selected;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            let name_style = if selected {
                base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
            } else {
                base.fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {:<width$}", p.name, width = name_width), name_style),
                Span::styled(p.version.clone(), base.fg(DIM)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
    layout::render_scrollbar(f, state.filtered.len(), visible, scroll, area);
}
