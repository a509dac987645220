use super::input::render_input_box;
use super::layout;
use super::state::{Action, App, AppEvent, AppMode, ToastKind};
use super::tasks;
use super::theme::{AMBER, BLUE, BRIGHT_WHITE, DIM, GREEN, RED, SEL_BG};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc::Sender;

/// 处理安装页按键
pub fn handle_install_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            if app.install.input.content().is_empty() {
                app.mode = AppMode::Dashboard;
            } else {
                app.install.input.clear();
            }
        }
        KeyCode::Tab => app.install.cycle_arch(),
        KeyCode::Up => {
            app.install.selected = app.install.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            let total = app.install.available.as_ref().map_or(0, |a| a.all.len());
            if app.install.selected + 1 < total {
                app.install.selected += 1;
            }
        }
        KeyCode::Enter => match app.install.target_version() {
            Some(version) => start_install(app, tx, version),
            None => app.notify("请输入版本号或从列表选择", ToastKind::Info),
        },
        KeyCode::Char('l') if ctrl => start_install(app, tx, "lts".to_string()),
        KeyCode::Char('n') if ctrl => start_install(app, tx, "latest".to_string()),
        KeyCode::Char('r') if ctrl => tasks::spawn_load_available(app, tx),
        _ => {
            app.install.input.handle_key(key);
        }
    }
}

fn start_install(app: &mut App, tx: &Sender<AppEvent>, version: String) {
    let arch = app.install.arch;
    tasks::spawn_action(app, tx, Action::Install { version, arch });
}

pub fn render_install(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    layout::render_header(f, "⬇  安装 Node.js", chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(chunks[1]);

    render_input_box(
        f,
        &app.install.input,
        "版本:",
        "如 18.17.0，留空则安装列表选中项",
        true,
        body[0],
    );

    let arch_line = Line::from(vec![
        Span::styled(" 架构: ", Style::default().fg(BLUE).add_modifier(Modifier::BOLD)),
        Span::styled(
            app.install.arch_label(),
            Style::default().fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  (Tab 切换)", Style::default().fg(DIM)),
    ]);
    f.render_widget(Paragraph::new(arch_line), body[1]);

    render_available(f, app, body[2]);

    layout::render_activity_log(f, app, chunks[2]);
    layout::render_footer(
        f,
        app,
        "Enter 安装 | Ctrl+L LTS | Ctrl+N 最新 | Ctrl+R 刷新列表 | Esc 返回",
        chunks[3],
    );
}

fn render_available(f: &mut Frame, app: &App, area: Rect) {
    let state = &app.install;
    let block = Block::default()
        .title(" 可安装版本 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    if let Some(error) = &state.error {
        f.render_widget(
            Paragraph::new(format!("✗ {}", error)).style(Style::default().fg(RED)),
            inner,
        );
        return;
    }
    let Some(available) = &state.available else {
        let text = if state.loading {
            "正在读取 nvm list available..."
        } else {
            "按 Ctrl+R 读取可安装版本"
        };
        f.render_widget(Paragraph::new(text).style(Style::default().fg(DIM)), inner);
        return;
    };
    if available.all.is_empty() {
        f.render_widget(
            Paragraph::new("没有解析到可安装版本").style(Style::default().fg(DIM)),
            inner,
        );
        return;
    }

    let visible = inner.height as usize;
    let scroll = layout::list_scroll(state.selected, visible);

    let lines: Vec<Line> = available
        .all
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, v)| {
            let selected = i == state.selected;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            let version_style = if selected {
                base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
            } else {
                base.fg(Color::White)
            };
            let mut spans = vec![Span::styled(format!(" v{:<12}", v.version), version_style)];
            if v.is_lts {
                spans.push(Span::styled("LTS  ", base.fg(GREEN)));
            }
            if v.is_current {
                spans.push(Span::styled("Current", base.fg(AMBER)));
            }
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
    layout::render_scrollbar(f, available.all.len(), visible, scroll, area);
}
