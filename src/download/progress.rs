use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
                     {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        // Enable steady tick for smooth spinner animation
        bar.enable_steady_tick(Duration::from_millis(100));

        DownloadProgress { bar }
    }

    pub fn set_total(&mut self, total: usize) {
        self.bar.set_length(total as u64);
    }

    pub fn set_current(&mut self, current: usize) {
        self.bar.set_position(current as u64);
    }

    pub fn set_message(&mut self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&mut self) {
        self.bar.finish_with_message("Complete");
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.bar.abandon();
        }
    }
}
