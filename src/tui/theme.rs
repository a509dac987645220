//! 主题色定义，全局统一使用

use ratatui::style::Color;

/// Node 绿
pub const GREEN: Color = Color::Rgb(104, 160, 99);
/// 强调蓝
pub const BLUE: Color = Color::Rgb(91, 206, 250);
/// 分组标题粉
pub const PINK: Color = Color::Rgb(245, 169, 184);
/// 选中行背景色
pub const SEL_BG: Color = Color::Rgb(45, 35, 55);
/// 亮白色
pub const BRIGHT_WHITE: Color = Color::Rgb(255, 255, 255);
/// 暗灰色（次要信息）
pub const DIM: Color = Color::Rgb(130, 130, 140);
/// 错误红
pub const RED: Color = Color::Rgb(230, 90, 90);
/// 警告黄
pub const AMBER: Color = Color::Rgb(240, 190, 80);
