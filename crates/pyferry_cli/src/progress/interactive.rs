use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pyferry::RegistryProgress;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Page bar for the current listing.
    fetch_bar: Option<ProgressBar>,
    /// One tick per package copied.
    mirror_bar: Option<ProgressBar>,
    /// One tick per DELETE issued.
    delete_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A reporter that draws nowhere.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn add_bar(&self, len: u64, prefix: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(Self::bar_style());
        pb.set_prefix(format!("{:12}", prefix));
        pb
    }

    /// Print above the bars without tearing them.
    fn println(&self, line: String) {
        self.multi.println(line).ok();
    }

    pub fn handle(&self, event: RegistryProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            RegistryProgress::FetchingPackages {
                project,
                total_pages,
            } => {
                let pb = self.add_bar(u64::from(total_pages), &project);
                pb.set_message("Fetching packages...");
                if total_pages == 0 {
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(100));
                }
                state.fetch_bar = Some(pb);
            }

            RegistryProgress::FetchedPage {
                page, total_so_far, ..
            } => {
                if let Some(ref pb) = state.fetch_bar {
                    if let Some(len) = pb.length()
                        && u64::from(page) > len
                    {
                        pb.set_length(u64::from(page));
                    }
                    pb.set_position(u64::from(page));
                    pb.set_message(format!("Page {} ({} packages)", page, total_so_far));
                }
            }

            RegistryProgress::FetchComplete { total, .. } => {
                if let Some(pb) = state.fetch_bar.take() {
                    pb.finish_with_message(format!("Fetched {} packages", total));
                }
            }

            RegistryProgress::MirroringPackage {
                name,
                version,
                index,
                total,
                ..
            } => {
                let pb = state
                    .mirror_bar
                    .get_or_insert_with(|| self.add_bar(total as u64, "Mirroring"));
                pb.set_position(index.saturating_sub(1) as u64);
                pb.set_message(format!("{} {}", name, version));
            }

            RegistryProgress::Downloaded { filename, .. } => {
                if let Some(ref pb) = state.mirror_bar {
                    pb.set_message(format!("Downloaded {}", filename));
                }
            }

            RegistryProgress::SkippedDuplicate { filename } => {
                if let Some(ref pb) = state.mirror_bar {
                    pb.set_message(format!("Skipped {}", filename));
                }
            }

            RegistryProgress::Uploaded { filename } => {
                if let Some(ref pb) = state.mirror_bar {
                    pb.set_message(format!("Uploaded {}", filename));
                }
            }

            RegistryProgress::TransferFailed { file, error } => {
                self.println(format!("{} {}: {}", style("✗").red().bold(), file, error));
            }

            RegistryProgress::MirrorComplete {
                uploaded, skipped, ..
            } => {
                if let Some(pb) = state.mirror_bar.take() {
                    if let Some(len) = pb.length() {
                        pb.set_position(len);
                    }
                    pb.finish_with_message(format!(
                        "{} uploaded, {} skipped",
                        uploaded, skipped
                    ));
                }
            }

            RegistryProgress::DeletingPackages { count, .. } => {
                let pb = self.add_bar(count as u64, "Deleting");
                state.delete_bar = Some(pb);
            }

            RegistryProgress::Deleted { id } => {
                if let Some(ref pb) = state.delete_bar {
                    pb.inc(1);
                    pb.set_message(format!("Deleted {}", id));
                }
            }

            RegistryProgress::DeleteFailed { id, error } => {
                if let Some(ref pb) = state.delete_bar {
                    pb.inc(1);
                }
                self.println(format!(
                    "{} package {}: {}",
                    style("✗").red().bold(),
                    id,
                    error
                ));
            }

            RegistryProgress::Warning { message } => {
                self.println(format!("{} {}", style("⚠").yellow().bold(), message));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in [&state.fetch_bar, &state.mirror_bar, &state.delete_bar]
            .into_iter()
            .flatten()
        {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
