use super::input::render_input_box;
use super::layout;
use super::state::{Action, App, AppEvent, AppMode, Confirm, ToastKind};
use super::tasks;
use super::theme::{BLUE, BRIGHT_WHITE, DIM, GREEN, RED, SEL_BG};
use crate::nvm::Arch;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc::Sender;

/// 处理已安装版本页按键
pub fn handle_versions_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            if app.versions.filter.content().is_empty() {
                app.mode = AppMode::Dashboard;
            } else {
                app.versions.filter.clear();
                app.versions.apply_filter();
            }
        }
        KeyCode::Up => {
            app.versions.selected = app.versions.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.versions.selected + 1 < app.versions.filtered.len() {
                app.versions.selected += 1;
            }
        }
        KeyCode::Enter => {
            let Some(selected) = app.versions.selected_version() else {
                return;
            };
            if selected.is_active {
                let message = format!("{} 已是当前版本", selected.version);
                app.notify(message, ToastKind::Info);
                return;
            }
            let version = selected.version.clone();
            tasks::spawn_action(app, tx, Action::Use(version));
        }
        KeyCode::Char('d') if ctrl => {
            if let Some(selected) = app.versions.selected_version() {
                let version = selected.version.clone();
                app.confirm = Some(Confirm {
                    message: format!("确定卸载 Node.js {}？", version),
                    action: Action::Uninstall(version),
                });
            }
        }
        KeyCode::Char('r') if ctrl => {
            tasks::spawn_load_versions(app, tx);
        }
        _ => {
            if app.versions.filter.handle_key(key) {
                app.versions.selected = 0;
                app.versions.apply_filter();
            }
        }
    }
}

pub fn render_versions(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    layout::render_header(f, "⬢  已安装版本", chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(chunks[1]);

    render_input_box(f, &app.versions.filter, "筛选:", "输入版本号", true, body[0]);
    render_list(f, app, body[1]);

    layout::render_activity_log(f, app, chunks[2]);
    layout::render_footer(
        f,
        app,
        "↑↓ 选择 | Enter 切换 | Ctrl+D 卸载 | Ctrl+R 刷新 | Esc 返回",
        chunks[3],
    );
}

fn render_list(f: &mut Frame, app: &App, area: Rect) {
    let state = &app.versions;
    let title = match state.active_version() {
        Some(active) => format!(" 共 {} 个版本，当前 v{} ", state.versions.len(), active.version),
        None => format!(" 共 {} 个版本 ", state.versions.len()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    if state.loading && state.versions.is_empty() {
        f.render_widget(Paragraph::new("正在读取 nvm list...").style(Style::default().fg(DIM)), inner);
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
        let hint = if state.versions.is_empty() {
            "尚未安装任何版本，按 Esc 后按 I 安装"
        } else {
            "没有匹配的版本"
        };
        f.render_widget(Paragraph::new(hint).style(Style::default().fg(DIM)), inner);
        return;
    }

    let visible = inner.height as usize;
    let scroll = layout::list_scroll(state.selected, visible);

    let lines: Vec<Line> = state
        .filtered
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .filter_map(|(row, &idx)| state.versions.get(idx).map(|v| (row, v)))
        .map(|(row, v)| {
            let selected = row == state.selected;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            let marker = if v.is_active { "● " } else { "  " };
            let version_style = if v.is_active {
                base.fg(GREEN).add_modifier(Modifier::BOLD)
            } else if selected {
                base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
            } else {
                base.fg(Color::White)
            };

            let mut spans = vec![
                Span::styled(marker, base.fg(GREEN)),
                Span::styled(format!("v{:<12}", v.version), version_style),
            ];
            if v.arch != Arch::Unknown {
                spans.push(Span::styled(format!("{}-bit  ", v.arch.as_str()), base.fg(DIM)));
            }
            if v.is_lts {
                spans.push(Span::styled("LTS  ", base.fg(BLUE)));
            }
            if v.is_active {
                spans.push(Span::styled("当前使用", base.fg(GREEN)));
            }
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
    layout::render_scrollbar(f, state.filtered.len(), visible, scroll, area);
}
