use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_yellow, heading};

/// Progress tracking for the three collection phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}", heading("⚙️", "Phases"));
        let pb = create_spinner(bright_yellow("Phase 1/3: Listing builds").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, build_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Listed {build_count} builds ✓")).to_string(),
        );
        let pb = create_bar(
            build_count as u64,
            bright_yellow("Phase 2/3: Analyzing timelines").to_string(),
        );
        Self { pb }
    }

    /// Marks one build of phase 2 as analyzed.
    pub fn inc(&self) {
        self.pb.inc(1);
    }

    pub fn finish_phase_2_start_phase_3(self, deployments: usize, failures: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!(
                "Phase 2/3: Found {deployments} deployments, {failures} failed changes ✓"
            ))
            .to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Computing DORA metrics").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: DORA metrics computed ✓").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn create_bar(len: u64, message: String) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(message);
    pb
}
