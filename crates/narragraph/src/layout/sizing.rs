//! Node box estimation from label text.
//!
//! Labels are measured in grapheme clusters times a fixed character width.
//! A label too wide for `max_node_width` wraps greedily at word boundaries and
//! the box grows one `node_height` per line.

use unicode_segmentation::UnicodeSegmentation;

use narragraph_core::geometry::Size;

use crate::config::LayoutConfig;

/// Estimate the box for a label
pub fn measure(label: &str, config: &LayoutConfig) -> Size {
    let chars = label.graphemes(true).count();
    let natural = chars as f32 * config.char_width + 2.0 * config.node_padding;
    // max/min rather than clamp: an unchecked config may have min > max
    let width = natural.max(config.min_node_width).min(config.max_node_width);

    let lines = if natural > config.max_node_width {
        wrapped_lines(label, line_capacity(config))
    } else {
        1
    };
    Size::new(width, config.node_height * lines as f32)
}

/// Characters that fit on one line of the widest node
fn line_capacity(config: &LayoutConfig) -> usize {
    let usable = (config.max_node_width - 2.0 * config.node_padding) / config.char_width;
    if usable.is_finite() && usable >= 1.0 {
        usable.floor() as usize
    } else {
        1
    }
}

fn wrapped_lines(label: &str, capacity: usize) -> usize {
    let mut lines = 1;
    let mut current = 0;
    for word in label.split_whitespace() {
        let len = word.graphemes(true).count();
        if current > 0 && current + 1 + len <= capacity {
            current += 1 + len;
            continue;
        }
        if current > 0 {
            lines += 1;
        }
        // A word longer than a line is broken across several.
        let extra = (len.max(1) - 1) / capacity;
        lines += extra;
        current = len - extra * capacity;
    }
    lines
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_short_label_uses_min_width() {
        let size = measure("Go", &LayoutConfig::default());
        assert!(approx_eq!(f32, size.width(), 80.0));
        assert!(approx_eq!(f32, size.height(), 40.0));
    }

    #[test]
    fn test_width_grows_with_label() {
        // 12 chars × 8 + 24 padding
        let size = measure("Collect data", &LayoutConfig::default());
        assert!(approx_eq!(f32, size.width(), 120.0));
    }

    #[test]
    fn test_long_label_wraps() {
        let config = LayoutConfig::default();
        // capacity is (220 - 24) / 8 = 24 chars per line
        let label = "Validate every incoming request against the published schema";
        let size = measure(label, &config);

        assert!(approx_eq!(f32, size.width(), 220.0));
        assert!(approx_eq!(f32, size.height(), 120.0));
    }

    #[test]
    fn test_wrapped_lines() {
        assert_eq!(wrapped_lines("", 10), 1);
        assert_eq!(wrapped_lines("one two", 10), 1);
        assert_eq!(wrapped_lines("one two three", 10), 2);
        assert_eq!(wrapped_lines("abcdefghijklmnopqrstuvwxy", 10), 3);
    }

    #[test]
    fn test_graphemes_count_once() {
        let config = LayoutConfig {
            min_node_width: 1.0,
            node_padding: 0.0,
            ..Default::default()
        };
        let size = measure("e\u{301}e\u{301}", &config);
        assert!(approx_eq!(f32, size.width(), 16.0));
    }
}
