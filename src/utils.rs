use scraper::{ElementRef, Selector};

/// Parses a selector known at compile time
pub fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Full text content of an element, trimmed, with inner whitespace runs collapsed
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Checks whether an element carries the given class
pub fn has_class(element: ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Parses a stat cell as a number, tolerating a leading '+' and trailing footnote markers
pub fn parse_stat_number(s: &str) -> Option<f64> {
    let s = s.trim().trim_start_matches('+');
    let s = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    if s.is_empty() {
        return None;
    }
    // Minutes are rendered as MM:SS
    if let Some((minutes, seconds)) = s.split_once(':') {
        let minutes: f64 = minutes.parse().ok()?;
        let seconds: f64 = seconds.parse().ok()?;
        return Some(minutes + seconds / 60.0);
    }
    s.parse().ok()
}
