use super::state::{App, LogKind, ToastKind};
use super::theme::{AMBER, BLUE, DIM, GREEN, RED};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

/// 活动日志面板高度（含边框）
const LOG_PANEL_HEIGHT: u16 = 8;

/// 四段式布局：Header(3) + Content(弹性) + 活动日志 + Footer(3)
pub fn main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(LOG_PANEL_HEIGHT),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

/// 渲染通用 header
pub fn render_header(f: &mut Frame, title: &str, area: Rect) {
    let header = Paragraph::new(title)
        .style(Style::default().fg(GREEN).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

/// 渲染 footer：有提示消息时优先显示提示，其次显示正在执行的命令，最后是快捷键
pub fn render_footer(f: &mut Frame, app: &App, hints: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    let mut spans = Vec::new();
    if let Some(toast) = &app.toast {
        let (icon, color) = match toast.kind {
            ToastKind::Info => ("ℹ", BLUE),
            ToastKind::Success => ("✓", GREEN),
            ToastKind::Error => ("✗", RED),
        };
        spans.push(Span::styled(
            format!("{icon} {} | ", toast.message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(action) = &app.running {
        spans.push(Span::styled(
            format!("⏳ {} | ", action.command_line(app)),
            Style::default().fg(AMBER),
        ));
    }
    spans.push(Span::styled(hints.to_string(), Style::default().fg(Color::DarkGray)));

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// 渲染活动日志，始终显示最新的几行
pub fn render_activity_log(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" 活动日志 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    let visible = inner.height as usize;
    let total = app.log.len();
    let skip = total.saturating_sub(visible);

    let lines: Vec<Line> = app
        .log
        .lines()
        .skip(skip)
        .map(|line| {
            let (prefix, color) = match line.kind {
                LogKind::Command => ("$", BLUE),
                LogKind::Output => (" ", Color::White),
                LogKind::Success => ("✓", GREEN),
                LogKind::Warning => ("!", AMBER),
                LogKind::Error => ("✗", RED),
            };
            Line::from(vec![
                Span::styled(format!("{} ", line.time), Style::default().fg(DIM)),
                Span::styled(format!("{prefix} "), Style::default().fg(color)),
                Span::styled(line.text.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    if lines.is_empty() {
        f.render_widget(
            Paragraph::new("暂无操作").style(Style::default().fg(DIM)),
            inner,
        );
    } else {
        f.render_widget(Paragraph::new(lines), inner);
    }
}

/// 渲染确认弹窗
pub fn render_confirm(f: &mut Frame, message: &str) {
    let area = centered_rect(50, 7, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" 确认 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(AMBER));
    let inner = block.inner(area).inner(Margin {
        horizontal: 2,
        vertical: 1,
    });
    f.render_widget(block, area);

    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y/Enter", Style::default().fg(GREEN).add_modifier(Modifier::BOLD)),
            Span::styled(" 确认   ", Style::default().fg(Color::White)),
            Span::styled("n/Esc", Style::default().fg(RED).add_modifier(Modifier::BOLD)),
            Span::styled(" 取消", Style::default().fg(Color::White)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

/// 按百分比宽度和固定高度居中
pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// 让选中行保持在可见区域内的滚动偏移
pub fn list_scroll(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        selected.saturating_sub(visible - 1)
    }
}

/// 列表超出可见高度时渲染滚动条
pub fn render_scrollbar(f: &mut Frame, total: usize, visible: usize, position: usize, area: Rect) {
    if total <= visible {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut state = ScrollbarState::new(total).position(position);
    f.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            horizontal: 0,
            vertical: 1,
        }),
        &mut state,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_scroll_follows_selection() {
        assert_eq!(list_scroll(0, 5), 0);
        assert_eq!(list_scroll(4, 5), 0);
        assert_eq!(list_scroll(7, 5), 3);
        assert_eq!(list_scroll(3, 0), 0);
    }

    #[test]
    fn centered_rect_fits_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(50, 7, outer);
        assert_eq!(rect.height, 7);
        assert_eq!(rect.width, 50);
    }
}
