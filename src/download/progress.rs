use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const PAGE_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}";

/// Per-episode page bar. Hidden when progress output is off.
pub fn page_bar(total: u64, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(PAGE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━━╸ "),
    );
    bar.set_message(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
