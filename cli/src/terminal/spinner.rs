use std::io::Write;
use std::sync::OnceLock;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sweepr_core::scanner::SweepProgress;

use crate::terminal::colors;

const TIP_DURATION: Duration = Duration::from_secs(3);
const MESSAGE_READ_TIME: Duration = Duration::from_millis(500);
const MIN_TIP_VISIBILITY: Duration = Duration::from_millis(750);
const TIPS: &[&str] = &[
    "Use --method tcp when ICMP sockets are not available",
    "Set --deadline to put a hard cap on the sweep",
    "Raise --concurrency to sweep large ranges faster",
];

pub struct SpinnerHandle {
    pub spinner: ProgressBar,
    tx: Sender<String>,
}

impl SpinnerHandle {
    pub fn send_to_queue(&self, message: String) {
        let _ = self.tx.send(message);
    }

    /// Prints above the spinner, or straight to stdout once it is gone.
    pub fn println(&self, msg: &str) {
        if self.spinner.is_finished() || self.spinner.is_hidden() {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{msg}");
        } else {
            self.spinner.println(msg);
        }
    }

    pub fn finish_and_clear(&self) {
        self.spinner.finish_and_clear();
    }
}

pub(crate) static SPINNER: OnceLock<SpinnerHandle> = OnceLock::new();

pub fn get_spinner() -> &'static SpinnerHandle {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> SpinnerHandle {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel::<String>();
    let pb_clone = pb.clone();

    thread::spawn(move || {
        let mut tip_index = 0;
        let mut next_action_time = Instant::now() + TIP_DURATION;
        let mut is_showing_tip = false;
        let mut last_tip_time = Instant::now();

        loop {
            if pb_clone.is_finished() {
                break;
            }

            let wait_time = next_action_time.saturating_duration_since(Instant::now());

            match rx.recv_timeout(wait_time) {
                Ok(mut msg) => {
                    if is_showing_tip {
                        let elapsed = last_tip_time.elapsed();
                        if elapsed < MIN_TIP_VISIBILITY {
                            thread::sleep(MIN_TIP_VISIBILITY - elapsed);
                        }
                        is_showing_tip = false;
                    }
                    // Only the newest progress line is worth showing.
                    while let Ok(newer_msg) = rx.try_recv() {
                        msg = newer_msg;
                    }
                    pb_clone.set_message(msg);
                    next_action_time = Instant::now() + MESSAGE_READ_TIME;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let tip = TIPS[tip_index % TIPS.len()];
                    pb_clone.set_message(format!("{}", tip.italic().white()));

                    tip_index += 1;
                    is_showing_tip = true;
                    last_tip_time = Instant::now();

                    next_action_time = Instant::now() + TIP_DURATION;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        }
    });

    SpinnerHandle { spinner: pb, tx }
}

pub fn report_sweep_progress(progress: SweepProgress) {
    get_spinner().send_to_queue(
        format!(
            "Probed {} of {} targets, {} answered so far...",
            progress.completed.to_string().bold(),
            progress.total,
            progress.reachable.to_string().green().bold()
        )
        .color(colors::TEXT_DEFAULT)
        .to_string(),
    );
}

pub struct SpinnerWriter;

impl std::io::Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        get_spinner().println(msg.trim_end());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
