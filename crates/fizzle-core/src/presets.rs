//! Stage-size presets offered by the design panel.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCategory {
    SocialMedia,
    Print,
    Digital,
    Custom,
}

impl StageCategory {
    pub fn label(self) -> &'static str {
        match self {
            StageCategory::SocialMedia => "Social Media",
            StageCategory::Print => "Print",
            StageCategory::Digital => "Digital",
            StageCategory::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSize {
    pub name: &'static str,
    pub width: f64,
    pub height: f64,
    pub category: StageCategory,
}

const fn stage(name: &'static str, width: f64, height: f64, category: StageCategory) -> StageSize {
    StageSize {
        name,
        width,
        height,
        category,
    }
}

use StageCategory::{Custom, Digital, Print, SocialMedia};

pub const STAGE_SIZES: &[StageSize] = &[
    stage("Instagram Post", 1080.0, 1080.0, SocialMedia),
    stage("Instagram Story", 1080.0, 1920.0, SocialMedia),
    stage("Facebook Post", 1200.0, 630.0, SocialMedia),
    stage("Twitter Post", 1200.0, 675.0, SocialMedia),
    stage("LinkedIn Post", 1200.0, 628.0, SocialMedia),
    stage("YouTube Thumbnail", 1280.0, 720.0, SocialMedia),
    stage("A4 Portrait", 2480.0, 3508.0, Print),
    stage("A4 Landscape", 3508.0, 2480.0, Print),
    stage("US Letter", 2551.0, 3508.0, Print),
    stage("Business Card", 1050.0, 600.0, Print),
    stage("A5 Portrait", 2480.0, 1754.0, Print),
    stage("HD Desktop", 1920.0, 1080.0, Digital),
    stage("Laptop", 1366.0, 768.0, Digital),
    stage("iPhone", 375.0, 812.0, Digital),
    stage("iPhone Plus", 414.0, 896.0, Digital),
    stage("iPad", 768.0, 1024.0, Digital),
    stage("iPad Landscape", 1024.0, 768.0, Digital),
    stage("Custom Small", 800.0, 600.0, Custom),
    stage("Custom Medium", 1200.0, 800.0, Custom),
    stage("Custom Large", 1600.0, 1200.0, Custom),
];

/// Case-insensitive lookup by preset name.
pub fn find_stage(name: &str) -> Option<&'static StageSize> {
    STAGE_SIZES.iter().find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

pub fn stages_in(category: StageCategory) -> impl Iterator<Item = &'static StageSize> {
    STAGE_SIZES.iter().filter(move |s| s.category == category)
}

/// Parse a `WIDTHxHEIGHT` string, or a preset name.
pub fn parse_stage(input: &str) -> Option<(f64, f64)> {
    if let Some(stage) = find_stage(input) {
        return Some((stage.width, stage.height));
    }
    let (w, h) = input.trim().split_once(['x', 'X', '×'])?;
    let width: f64 = w.trim().parse().ok()?;
    let height: f64 = h.trim().parse().ok()?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_by_name() {
        let stage = find_stage("instagram story").unwrap();
        assert_eq!((stage.width, stage.height), (1080.0, 1920.0));
        assert!(find_stage("Billboard").is_none());
    }

    #[test]
    fn categories_partition_the_list() {
        let total: usize = [SocialMedia, Print, Digital, Custom]
            .into_iter()
            .map(|c| stages_in(c).count())
            .sum();
        assert_eq!(total, STAGE_SIZES.len());
        assert_eq!(stages_in(Custom).count(), 3);
    }

    #[test]
    fn parses_dimensions_or_names() {
        assert_eq!(parse_stage("800x600"), Some((800.0, 600.0)));
        assert_eq!(parse_stage("Custom Large"), Some((1600.0, 1200.0)));
        assert_eq!(parse_stage("0x600"), None);
        assert_eq!(parse_stage("wide"), None);
    }
}
