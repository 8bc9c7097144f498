use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::SessionUpdate;
use crate::domain::WorkerOutcome;

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    }
}

/// 终端上的结果区和进度条
pub struct ResultsView {
    progress: ProgressBar,
    show_progress: bool,
    start_time: Instant,
}

impl ResultsView {
    pub fn new(show_progress: bool) -> Self {
        Self {
            progress: make_progress_bar(show_progress),
            show_progress,
            start_time: Instant::now(),
        }
    }

    /// 重新开始计时，换一个新的进度条
    pub fn restart(&mut self) {
        self.progress.finish_and_clear();
        self.progress = make_progress_bar(self.show_progress);
        self.start_time = Instant::now();
    }

    /// 显示一条会话更新
    pub fn show(&self, update: &SessionUpdate) {
        match update {
            SessionUpdate::Line(line) => {
                // 隐藏的进度条不会输出 println 的内容
                if self.progress.is_hidden() {
                    println!("{}", line);
                } else {
                    self.progress.println(line);
                }
            }
            SessionUpdate::Progress(value) => self.progress.set_position(u64::from(*value)),
            SessionUpdate::Finished(outcome) => {
                self.progress.finish_and_clear();
                if let Err(err) = print_outcome(outcome, self.start_time.elapsed()) {
                    eprintln!("输出结果时出错: {}", err);
                }
            }
        }
    }
}

fn make_progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress
}

/// 输出结束状态
pub fn print_outcome(outcome: &WorkerOutcome, duration: Duration) -> Result<()> {
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "----------------------------")?;
    match outcome {
        WorkerOutcome::Completed {
            matches,
            files_scanned,
        } => {
            writeln!(stdout, "完成! 扫描文件: {} | 结果: {}", files_scanned, matches)?;
        }
        WorkerOutcome::Cancelled { files_scanned } => {
            writeln!(stdout, "已停止，扫描文件: {}", files_scanned)?;
        }
    }
    writeln!(stdout, "总用时: {}", format_duration(duration))?;

    Ok(())
}
