use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE_PROGRESS: &str =
    "[{elapsed_precise}] {msg} {spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} eta: {eta}";
const TEMPLATE_SPINNER: &str = "[{elapsed_precise}] {msg} {spinner:.green}";

/// Row counting progress bar. Falls back to a spinner when the row count is
/// unknown and draws nothing in quiet mode.
pub fn create_progress_bar(quiet_mode: bool, msg: &str, length: Option<u64>) -> ProgressBar {
    let bar = match (quiet_mode, length) {
        (true, _) => ProgressBar::hidden(),
        (false, Some(len)) => ProgressBar::new(len),
        (false, None) => ProgressBar::new_spinner(),
    };

    bar.set_message(msg);
    match length {
        Some(_) => bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE_PROGRESS)
                .progress_chars("=> "),
        ),
        None => bar.set_style(ProgressStyle::default_spinner().template(TEMPLATE_SPINNER)),
    };

    bar.inc(0); // Just to avoid the drawing after the log.

    bar
}
