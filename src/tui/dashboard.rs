use super::layout;
use super::state::App;
use super::theme::{AMBER, DIM, GREEN, RED};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const ASCII_LOGO: &str = r#"
███╗   ██╗██╗   ██╗███╗   ███╗
████╗  ██║██║   ██║████╗ ████║
██╔██╗ ██║██║   ██║██╔████╔██║
██║╚██╗██║╚██╗ ██╔╝██║╚██╔╝██║
██║ ╚████║ ╚████╔╝ ██║ ╚═╝ ██║
╚═╝  ╚═══╝  ╚═══╝  ╚═╝     ╚═╝"#;

pub fn render_dashboard(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    layout::render_header(f, &format!("lian-nvm v{}", env!("CARGO_PKG_VERSION")), chunks[0]);

    let area = chunks[1];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(block, area);

    // 构建所有行
    let mut lines: Vec<Line> = Vec::new();

    // ASCII Logo
    for logo_line in ASCII_LOGO.lines() {
        lines.push(Line::from(vec![Span::styled(
            logo_line.to_string(),
            Style::default().fg(GREEN).add_modifier(Modifier::BOLD),
        )]));
    }

    lines.push(Line::from(""));
    lines.push(section_title("── 环境 ──"));

    match &app.env {
        Some(env) => {
            let nvm_line = match (env.nvm.installed, &env.nvm.version) {
                (true, Some(v)) => (format!("已安装 {}", v), GREEN),
                (true, None) => ("已安装".to_string(), GREEN),
                (false, _) => ("未检测到 nvm".to_string(), RED),
            };
            lines.push(colored_info_line("nvm  ", &nvm_line.0, nvm_line.1));
            lines.push(info_line("Node.js  ", &or_dash(env.node_version.as_ref().map(|v| format!("v{v}")))));
            lines.push(info_line("npm  ", &or_dash(env.npm_version.clone())));
            lines.push(info_line("架构  ", &or_dash(env.node_arch.clone())));
            lines.push(info_line("根目录  ", &or_dash(env.root.clone())));
            lines.push(info_line("代理  ", env.proxy.as_deref().unwrap_or("未设置")));
        }
        None => {
            lines.push(info_line("nvm  ", "检测中..."));
            lines.push(info_line("Node.js  ", "检测中..."));
        }
    }

    let disk = app
        .disk_usage
        .map(|d| format!("{} GB", d.gigabytes()))
        .unwrap_or_else(|| "-".to_string());
    lines.push(info_line("占用空间  ", &disk));

    if let Some(available) = &app.install.available {
        lines.push(info_line("最新 LTS  ", &or_dash(available.lts.clone())));
        lines.push(info_line("最新版本  ", &or_dash(available.current.clone())));
    }

    lines.push(Line::from(""));
    lines.push(section_title("── 快捷键 ──"));

    // 快捷键列表
    lines.push(shortcut_line("V", " 已安装版本       "));
    lines.push(shortcut_line("I", " 安装新版本       "));
    lines.push(shortcut_line("P", " 全局 npm 包      "));
    lines.push(shortcut_line("C", " 设置             "));
    lines.push(shortcut_line("r", " 重新检测         "));
    lines.push(shortcut_line("q", " 退出             "));

    let lines_count = lines.len();
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);

    // 垂直居中：计算内容高度，用 Layout 居中
    let content_height = lines_count as u16;
    let inner = area.inner(Margin {
        horizontal: 1,
        vertical: 1,
    });

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(content_height),
            Constraint::Min(0),
        ])
        .split(inner);

    f.render_widget(paragraph, vertical[1]);

    layout::render_activity_log(f, app, chunks[2]);
    layout::render_footer(f, app, "V 版本 | I 安装 | P 全局包 | C 设置 | q 退出", chunks[3]);
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

fn section_title(title: &str) -> Line<'static> {
    Line::from(vec![Span::styled(
        title.to_string(),
        Style::default().fg(AMBER).add_modifier(Modifier::BOLD),
    )])
}

/// 信息行: "  标签: 值"
fn info_line(label: &str, value: &str) -> Line<'static> {
    colored_info_line(label, value, Color::White)
}

fn colored_info_line(label: &str, value: &str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().fg(DIM).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value.to_string(), Style::default().fg(color)),
    ])
}

/// 快捷键行: "  X  描述"
fn shortcut_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("  {key}"),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc.to_string(), Style::default().fg(Color::White)),
    ])
}
