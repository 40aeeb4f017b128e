use indicatif::{ProgressBar, ProgressStyle};

/// Template shared by the archive decoding bars.
pub const DECODE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}";

/// Creates a progress bar style with a consistent look.
///
/// Falls back to the default bar style if `template` does not parse.
pub fn create_progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Creates an empty decoding bar with the shared style.
pub fn decode_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(create_progress_style(DECODE_TEMPLATE));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_template_falls_back() {
        let bar = ProgressBar::hidden();
        bar.set_style(create_progress_style("{bar:40.cyan/blue"));
        bar.set_length(3);
        bar.inc(3);
        assert_eq!(bar.position(), 3);
    }

    #[test]
    fn test_decode_progress_bar_starts_empty() {
        let bar = decode_progress_bar();
        assert_eq!(bar.length(), Some(0));
        assert_eq!(bar.position(), 0);
    }
}
