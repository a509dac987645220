use super::theme::{BLUE, DIM};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 通用文本输入框组件，支持 UTF-8 (中英文)
#[derive(Debug, Clone, Default)]
pub struct InputBox {
    /// 输入内容
    content: String,
    /// 光标位置（按字符计数，非字节）
    cursor: usize,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            cursor: content.chars().count(),
        }
    }

    /// 在光标处插入字符
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte(&self.content, self.cursor);
        self.content.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Backspace: 删除光标前的字符
    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let start = char_to_byte(&self.content, self.cursor);
            let end = char_to_byte(&self.content, self.cursor + 1);
            self.content.drain(start..end);
        }
    }

    /// Delete: 删除光标后的字符
    pub fn delete_forward(&mut self) {
        if self.cursor < self.content.chars().count() {
            let start = char_to_byte(&self.content, self.cursor);
            let end = char_to_byte(&self.content, self.cursor + 1);
            self.content.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// 光标右移
    pub fn move_right(&mut self) {
        if self.cursor < self.content.chars().count() {
            self.cursor += 1;
        }
    }

    /// 光标移到行首
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// 获取内容
    pub fn content(&self) -> &str {
        &self.content
    }

    /// 处理编辑类按键，返回内容是否改变
    ///
    /// 带 Ctrl/Alt 的字符交给调用方处理
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert(c);
                true
            }
            KeyCode::Backspace => {
                let before = self.content.len();
                self.delete_back();
                before != self.content.len()
            }
            KeyCode::Delete => {
                let before = self.content.len();
                self.delete_forward();
                before != self.content.len()
            }
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Home => {
                self.move_home();
                false
            }
            KeyCode::End => {
                self.move_end();
                false
            }
            _ => false,
        }
    }

    /// 光标前 / 光标处 / 光标后三段，用于渲染
    pub fn split_at_cursor(&self) -> (String, String, String) {
        let before: String = self.content.chars().take(self.cursor).collect();
        let at: String = self.content.chars().skip(self.cursor).take(1).collect();
        let after: String = self.content.chars().skip(self.cursor + 1).collect();
        let at = if at.is_empty() { " ".to_string() } else { at };
        (before, at, after)
    }
}

/// 渲染输入框
pub fn render_input_box(
    f: &mut Frame,
    input: &InputBox,
    label: &str,
    placeholder: &str,
    focused: bool,
    area: Rect,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let mut spans = vec![Span::styled(
        format!("{label} "),
        Style::default().fg(BLUE).add_modifier(Modifier::BOLD),
    )];

    if input.content().is_empty() && !focused {
        spans.push(Span::styled(placeholder.to_string(), Style::default().fg(DIM)));
    } else {
        let (before, at, after) = input.split_at_cursor();
        spans.push(Span::styled(before, Style::default().fg(Color::White)));
        if focused {
            spans.push(Span::styled(
                at,
                Style::default().fg(Color::Black).bg(Color::White),
            ));
        } else {
            spans.push(Span::styled(at, Style::default().fg(Color::White)));
        }
        spans.push(Span::styled(after, Style::default().fg(Color::White)));
        if input.content().is_empty() {
            spans.push(Span::styled(placeholder.to_string(), Style::default().fg(DIM)));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(paragraph, area);
}

/// UTF-8 安全的字符位置转字节位置
fn char_to_byte(s: &str, char_pos: usize) -> usize {
    s.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn edits_multibyte_content() {
        let mut input = InputBox::with_content("代理");
        input.move_left();
        input.insert('服');
        assert_eq!(input.content(), "代服理");
        input.handle_key(key(KeyCode::Backspace));
        assert_eq!(input.content(), "代理");
        input.handle_key(key(KeyCode::Delete));
        assert_eq!(input.content(), "代");
        let (before, at, after) = input.split_at_cursor();
        assert_eq!((before.as_str(), at.as_str(), after.as_str()), ("代", " ", ""));
    }

    #[test]
    fn control_chars_are_not_inserted() {
        let mut input = InputBox::new();
        let changed = input.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(!changed);
        assert!(input.content().is_empty());
        assert!(input.handle_key(KeyEvent::new(KeyCode::Char('L'), KeyModifiers::SHIFT)));
        assert_eq!(input.content(), "L");
    }

    #[test]
    fn split_shows_block_cursor_at_end() {
        let input = InputBox::with_content("18");
        let (before, at, after) = input.split_at_cursor();
        assert_eq!((before.as_str(), at.as_str(), after.as_str()), ("18", " ", ""));
    }
}
