use super::input::InputBox;
use super::layout;
use super::state::{Action, App, AppEvent, AppMode, SettingsItem};
use super::tasks;
use super::theme::{BLUE, BRIGHT_WHITE, DIM, GREEN, PINK, SEL_BG};
use crate::nvm::Arch;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;
use tokio::sync::mpsc::Sender;
use unicode_width::UnicodeWidthStr;

/// 处理设置模式按键
pub fn handle_settings_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    if app.settings.editing {
        handle_editing_key(key, app, tx)
    } else {
        handle_browsing_key(key, app, tx)
    }
}

/// 浏览模式按键处理
fn handle_browsing_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let total = app.settings.focusable_count();

    match key.code {
        KeyCode::Esc => app.mode = AppMode::Dashboard,
        KeyCode::Up => {
            app.settings.selected = app.settings.selected.saturating_sub(1);
            app.settings.message = None;
        }
        KeyCode::Down => {
            if app.settings.selected + 1 < total {
                app.settings.selected += 1;
            }
            app.settings.message = None;
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.settings.message = None;
            activate_item(app, tx);
        }
        KeyCode::Char('s') if ctrl => app.save_settings(),
        KeyCode::Char('e') if ctrl => tasks::spawn_export(app, tx),
        _ => {}
    }
}

/// 切换 / 编辑 / 执行当前选中项
fn activate_item(app: &mut App, tx: &Sender<AppEvent>) {
    let Some(idx) = app.settings.focused_index() else {
        return;
    };

    match app.settings.items[idx].clone() {
        SettingsItem::Toggle { key, value, .. } => {
            let Some(action) = toggle_action(&key, !value) else {
                return;
            };
            if tasks::spawn_action(app, tx, action) {
                // 先更新界面，失败时由结果处理恢复
                if let SettingsItem::Toggle { value, .. } = &mut app.settings.items[idx] {
                    *value = !*value;
                }
            }
        }
        SettingsItem::Choice { key, options, index, .. } => {
            let next = (index + 1) % options.len().max(1);
            let Some(action) = choice_action(&key, next) else {
                return;
            };
            if tasks::spawn_action(app, tx, action) {
                if let SettingsItem::Choice { index, .. } = &mut app.settings.items[idx] {
                    *index = next;
                }
            }
        }
        SettingsItem::TextEdit { value, .. } => {
            app.settings.edit = InputBox::with_content(&value);
            app.settings.editing = true;
        }
        SettingsItem::Button { key, .. } => {
            if key == "export" {
                tasks::spawn_export(app, tx);
            }
        }
        SettingsItem::Section(_) => {}
    }
}

/// 编辑模式按键处理
fn handle_editing_key(key: KeyEvent, app: &mut App, tx: &Sender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            // 取消编辑
            app.settings.editing = false;
        }
        KeyCode::Enter => confirm_edit(app, tx),
        _ => {
            app.settings.edit.handle_key(key);
        }
    }
}

fn confirm_edit(app: &mut App, tx: &Sender<AppEvent>) {
    app.settings.editing = false;
    app.settings.message = None;
    let Some(idx) = app.settings.focused_index() else {
        return;
    };
    let new_value = app.settings.edit.content().trim().to_string();

    let key = match &app.settings.items[idx] {
        SettingsItem::TextEdit { key, value, .. } if *value != new_value => key.clone(),
        _ => return,
    };

    match app.apply_setting(&key, &new_value) {
        Some(action) => {
            if tasks::spawn_action(app, tx, action) {
                set_text_value(app, idx, new_value);
            } else {
                // 操作被拒绝，显示回到 nvm 当前的值
                app.build_settings_items();
            }
        }
        // 校验失败时保留原值
        None if app.settings.message.is_some() => {}
        None => {
            set_text_value(app, idx, new_value);
            app.settings.message = Some("✓ 已修改，Ctrl+S 保存到配置文件".to_string());
        }
    }
}

fn set_text_value(app: &mut App, idx: usize, new_value: String) {
    if let Some(SettingsItem::TextEdit { value, .. }) = app.settings.items.get_mut(idx) {
        *value = new_value;
    }
}

/// 复选框切换到 `value` 时对应的 nvm 操作
fn toggle_action(key: &str, value: bool) -> Option<Action> {
    match key {
        "nvm.enabled" if value => Some(Action::Enable),
        "nvm.enabled" => Some(Action::Disable),
        _ => None,
    }
}

/// 多选项切换到 `index` 时对应的 nvm 操作
fn choice_action(key: &str, index: usize) -> Option<Action> {
    match key {
        "nvm.arch" => Some(Action::SetArch(if index == 1 { Arch::Bit32 } else { Arch::Bit64 })),
        _ => None,
    }
}

/// 渲染设置视图
pub fn render_settings(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());

    // Header
    layout::render_header(f, "⚙  设置", chunks[0]);

    // Content
    let content_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let content_inner = content_block.inner(chunks[1]);
    f.render_widget(content_block, chunks[1]);

    let padded = content_inner.inner(Margin {
        horizontal: 2,
        vertical: 1,
    });

    if padded.height >= 3 {
        render_items(f, app, padded);
    }

    layout::render_activity_log(f, app, chunks[2]);

    let footer_text = if app.settings.editing {
        "输入新值 | Enter 确认 | Esc 取消".to_string()
    } else {
        "↑↓ 选择 | Enter/Space 切换/编辑 | Ctrl+S 保存 | Ctrl+E 导出 | Esc 返回".to_string()
    };
    // 设置页自己的消息优先于快捷键
    let footer_text = match &app.settings.message {
        Some(msg) => format!("{} | {}", msg, footer_text),
        None => footer_text,
    };
    layout::render_footer(f, app, &footer_text, chunks[3]);
}

/// 渲染设置项列表
fn render_items(f: &mut Frame, app: &App, area: Rect) {
    let state = &app.settings;
    if state.items.is_empty() {
        let hint = Paragraph::new("正在加载设置...").style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, area);
        return;
    }

    // 计算 label 最大宽度用于对齐
    let max_label_width = state
        .items
        .iter()
        .filter_map(|item| match item {
            SettingsItem::TextEdit { label, .. } | SettingsItem::Choice { label, .. } => {
                Some(UnicodeWidthStr::width(label.as_str()))
            }
            _ => None,
        })
        .max()
        .unwrap_or(10);

    let visible_height = area.height as usize;
    let mut lines: Vec<Line> = Vec::new();
    let mut focusable_idx = 0;

    for (i, item) in state.items.iter().enumerate() {
        let is_selected = focusable_idx == state.selected;
        let bg = if is_selected {
            Style::default().bg(SEL_BG)
        } else {
            Style::default()
        };

        match item {
            SettingsItem::Section(title) => {
                // 分组前空一行（非首项）
                if i > 0 {
                    lines.push(Line::from(""));
                }
                lines.push(Line::from(Span::styled(
                    format!("── {} ──", title),
                    Style::default().fg(PINK).add_modifier(Modifier::BOLD),
                )));
                continue;
            }
            SettingsItem::Toggle { label, value, .. } => {
                let checkbox = if *value { "[✓]" } else { "[ ]" };
                let checkbox_color = if *value { GREEN } else { DIM };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!(" {} ", checkbox),
                        bg.fg(checkbox_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" {}", label), label_style(bg, is_selected)),
                ]));
            }
            SettingsItem::Choice {
                label,
                options,
                index,
                ..
            } => {
                let current = options.get(*index).map(String::as_str).unwrap_or("-");
                lines.push(Line::from(vec![
                    Span::styled(padded_label(label, max_label_width), bg.fg(BLUE).add_modifier(Modifier::BOLD)),
                    Span::styled(format!("‹ {} ›", current), label_style(bg, is_selected)),
                ]));
            }
            SettingsItem::TextEdit { label, value, .. } => {
                let label_padded = padded_label(label, max_label_width);
                if is_selected && state.editing {
                    // 编辑中：显示 buffer 和光标
                    let (before, at, after) = state.edit.split_at_cursor();
                    lines.push(Line::from(vec![
                        Span::styled(label_padded, bg.fg(BLUE).add_modifier(Modifier::BOLD)),
                        Span::styled(before, bg.fg(BRIGHT_WHITE)),
                        Span::styled(at, Style::default().fg(Color::Black).bg(Color::Yellow)),
                        Span::styled(after, bg.fg(BRIGHT_WHITE)),
                    ]));
                } else {
                    let (display, color) = if value.is_empty() {
                        ("(未设置)".to_string(), DIM)
                    } else {
                        (value.clone(), Color::White)
                    };
                    let value_style = if is_selected {
                        bg.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
                    } else {
                        bg.fg(color)
                    };
                    lines.push(Line::from(vec![
                        Span::styled(label_padded, bg.fg(BLUE)),
                        Span::styled(display, value_style),
                    ]));
                }
            }
            SettingsItem::Button { label, .. } => {
                lines.push(Line::from(Span::styled(
                    format!(" ▶ {}", label),
                    label_style(bg, is_selected).fg(GREEN),
                )));
            }
        }
        focusable_idx += 1;
    }

    // 滚动处理
    let total_lines = lines.len();
    let scroll = if total_lines > visible_height {
        let selected_line = find_selected_line(&state.items, state.selected);
        if selected_line >= visible_height {
            selected_line.saturating_sub(visible_height / 2)
        } else {
            0
        }
    } else {
        0
    };

    let visible_lines: Vec<Line> = lines.into_iter().skip(scroll).take(visible_height).collect();
    f.render_widget(Paragraph::new(visible_lines), area);

    // 滚动条
    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        let mut scroll_state = ScrollbarState::new(total_lines).position(scroll);
        f.render_stateful_widget(scrollbar, area, &mut scroll_state);
    }
}

fn label_style(bg: Style, selected: bool) -> Style {
    if selected {
        bg.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
    } else {
        bg.fg(Color::White)
    }
}

fn padded_label(label: &str, width: usize) -> String {
    let padding = width.saturating_sub(UnicodeWidthStr::width(label));
    format!(" {}:{} ", label, " ".repeat(padding))
}

/// 找到选中项在渲染行中的行号
fn find_selected_line(items: &[SettingsItem], selected: usize) -> usize {
    let mut line = 0;
    let mut focusable_idx = 0;

    for (i, item) in items.iter().enumerate() {
        match item {
            SettingsItem::Section(_) => {
                if i > 0 {
                    line += 1;
                }
                line += 1;
            }
            _ => {
                if focusable_idx == selected {
                    return line;
                }
                line += 1;
                focusable_idx += 1;
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::sync::mpsc;

    fn settings_app() -> App {
        let mut app = App::new(Config::default());
        app.mode = AppMode::Settings;
        app.build_settings_items();
        app
    }

    /// 选中指定 key 的文本项并填入新内容
    fn edit(app: &mut App, target: &str, content: &str) -> usize {
        let (selected, idx) = app
            .settings
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !matches!(item, SettingsItem::Section(_)))
            .enumerate()
            .find(|(_, (_, item))| matches!(item, SettingsItem::TextEdit { key, .. } if key == target))
            .map(|(selected, (idx, _))| (selected, idx))
            .unwrap();
        app.settings.selected = selected;
        app.settings.editing = true;
        app.settings.edit = InputBox::with_content(content);
        idx
    }

    fn text_value(app: &App, idx: usize) -> &str {
        match &app.settings.items[idx] {
            SettingsItem::TextEdit { value, .. } => value,
            other => panic!("not a text item: {:?}", other),
        }
    }

    #[test]
    fn refused_root_change_keeps_old_value() {
        let mut app = settings_app();
        let (tx, _rx) = mpsc::channel(8);
        app.running = Some(Action::Enable);
        let idx = edit(&mut app, "nvm.root", "/opt/nvm");
        let old = text_value(&app, idx).to_string();

        confirm_edit(&mut app, &tx);

        assert!(!app.settings.editing);
        assert_eq!(text_value(&app, idx), old);
        assert_eq!(app.running, Some(Action::Enable));
        assert!(app.toast.is_some());
    }

    #[tokio::test]
    async fn started_root_change_shows_new_value() {
        let mut app = settings_app();
        let (tx, _rx) = mpsc::channel(8);
        let idx = edit(&mut app, "nvm.root", "/opt/nvm");

        confirm_edit(&mut app, &tx);

        assert_eq!(text_value(&app, idx), "/opt/nvm");
        assert_eq!(app.running, Some(Action::SetRoot("/opt/nvm".to_string())));
    }

    #[test]
    fn invalid_timeout_keeps_old_value() {
        let mut app = settings_app();
        let (tx, _rx) = mpsc::channel(8);
        let idx = edit(&mut app, "timeout_secs", "soon");

        confirm_edit(&mut app, &tx);

        assert_eq!(text_value(&app, idx), app.config.timeout_secs.to_string());
        assert!(app.settings.message.as_deref().is_some_and(|m| m.starts_with('✗')));
    }

    #[test]
    fn valid_config_edit_is_applied() {
        let mut app = settings_app();
        let (tx, _rx) = mpsc::channel(8);
        let idx = edit(&mut app, "log_lines", "80");

        confirm_edit(&mut app, &tx);

        assert_eq!(text_value(&app, idx), "80");
        assert_eq!(app.config.log_lines, 80);
        assert!(app.settings.message.as_deref().is_some_and(|m| m.starts_with('✓')));
    }

    #[test]
    fn toggle_and_choice_dispatch_by_key() {
        assert_eq!(toggle_action("nvm.enabled", true), Some(Action::Enable));
        assert_eq!(toggle_action("nvm.enabled", false), Some(Action::Disable));
        assert_eq!(toggle_action("unknown", true), None);
        assert_eq!(choice_action("nvm.arch", 1), Some(Action::SetArch(Arch::Bit32)));
        assert_eq!(choice_action("nvm.arch", 0), Some(Action::SetArch(Arch::Bit64)));
        assert_eq!(choice_action("unknown", 0), None);
    }

    #[test]
    fn selected_line_accounts_for_section_spacing() {
        let items = vec![
            SettingsItem::Section("a".to_string()),
            SettingsItem::Button {
                label: "x".to_string(),
                key: "x".to_string(),
            },
            SettingsItem::Section("b".to_string()),
            SettingsItem::Button {
                label: "y".to_string(),
                key: "y".to_string(),
            },
        ];
        assert_eq!(find_selected_line(&items, 0), 1);
        // 标题 + 项 + 空行 + 标题
        assert_eq!(find_selected_line(&items, 1), 4);
    }

    #[test]
    fn labels_align_by_display_width() {
        assert_eq!(padded_label("代理", 6), " 代理:   ");
        assert_eq!(padded_label("nvm 命令", 8), " nvm 命令: ");
    }
}
