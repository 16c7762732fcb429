// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for pipeline execution
// reference: uses indicatif for progress bars and tracks processing metrics

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub records_scanned: usize,
    pub skipped_existing: usize,
    pub skipped_missing_text: usize,
    pub documents_written: usize,
    pub documents_failed: usize,
    pub keys_resolved: usize,
    pub keys_unresolved: usize,
    pub duration_secs: u64,
}

impl PipelineStats {
    pub fn success_rate(&self) -> f64 {
        let total = self.documents_written + self.documents_failed;
        if total == 0 {
            return 0.0;
        }
        (self.documents_written as f64 / total as f64) * 100.0
    }

    pub fn skipped(&self) -> usize {
        self.skipped_existing + self.skipped_missing_text
    }
}

#[derive(Default)]
struct Counters {
    records_scanned: AtomicUsize,
    skipped_existing: AtomicUsize,
    skipped_missing_text: AtomicUsize,
    documents_written: AtomicUsize,
    documents_failed: AtomicUsize,
    keys_resolved: AtomicUsize,
    keys_unresolved: AtomicUsize,
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    counters: Arc<Counters>,
    start_time: Instant,
}

impl ProgressTracker {
    /// Bar of length `total`, or a spinner when the length is unknown
    /// (a corpus scan).
    pub fn with_color(total: Option<usize>, colored: bool) -> Self {
        Self::build(MultiProgress::new(), total.map(|t| t as u64), colored)
    }

    /// Tracks counts without drawing anything.
    pub fn hidden() -> Self {
        Self::build(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            None,
            false,
        )
    }

    fn build(multi_progress: MultiProgress, total: Option<u64>, colored: bool) -> Self {
        let main_bar = create_progress_bar(&multi_progress, total, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            counters: Arc::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    pub fn inc_scanned(&self) {
        self.counters.records_scanned.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
    }

    pub fn inc_skipped_existing(&self) {
        self.counters.skipped_existing.fetch_add(1, Ordering::SeqCst);
    }

    pub fn inc_skipped_missing_text(&self) {
        self.counters
            .skipped_missing_text
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn inc_written(&self) {
        self.counters.documents_written.fetch_add(1, Ordering::SeqCst);
        self.update_detail_bar();
    }

    pub fn inc_failed(&self) {
        self.counters.documents_failed.fetch_add(1, Ordering::SeqCst);
        self.update_detail_bar();
    }

    pub fn inc_resolved(&self) {
        self.counters.keys_resolved.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_unresolved(&self) {
        self.counters.keys_unresolved.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("done");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        let counters = &self.counters;

        PipelineStats {
            records_scanned: load(&counters.records_scanned),
            skipped_existing: load(&counters.skipped_existing),
            skipped_missing_text: load(&counters.skipped_missing_text),
            documents_written: load(&counters.documents_written),
            documents_failed: load(&counters.documents_failed),
            keys_resolved: load(&counters.keys_resolved),
            keys_unresolved: load(&counters.keys_unresolved),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn update_detail_bar(&self) {
        let stats = self.get_stats();
        let message = if stats.keys_resolved + stats.keys_unresolved > 0 {
            format!(
                "Resolved: {} | Unresolved: {}",
                stats.keys_resolved,
                stats.keys_unresolved.to_string().yellow()
            )
        } else {
            format!(
                "Written: {} | Failed: {} | Skipped: {}",
                stats.documents_written,
                stats.documents_failed.to_string().red(),
                stats.skipped()
            )
        };

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: Option<u64>, colored: bool) -> ProgressBar {
    let Some(total) = total else {
        let bar = multi_progress.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} [{elapsed_precise}] {pos} records scanned {msg}")
                .expect("Failed to create spinner template"),
        );
        return bar;
    };

    let bar = multi_progress.add(ProgressBar::new(total));
    if colored {
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .expect("Failed to create progress bar template")
                .progress_chars("█▓▒░"),
        );
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}")
                .expect("Failed to create progress bar template")
                .progress_chars("=>-"),
        );
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .expect("Failed to create detail bar template");
    bar.set_style(style);
    bar
}
