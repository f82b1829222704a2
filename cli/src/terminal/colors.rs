use colored::Color;
use sweepr_core::discovery::Tag;

pub const PRIMARY: Color = Color::TrueColor { r: 120, g: 200, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 180, b: 80 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 210 };

pub const IPV4_ADDR: Color = Color::TrueColor { r: 130, g: 220, b: 130 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 180, g: 150, b: 255 };

pub const ONLINE: Color = Color::TrueColor { r: 76, g: 175, b: 80 };
pub const OFFLINE: Color = Color::TrueColor { r: 244, g: 67, b: 54 };
pub const DISCOVERED: Color = Color::TrueColor { r: 33, g: 150, b: 243 };

pub fn tag_color(tag: Tag) -> Color {
    let (r, g, b) = tag.color();
    Color::TrueColor { r, g, b }
}
