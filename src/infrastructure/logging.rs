use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::Local;

/// 日志记录器trait
pub trait LoggerTrait: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn log_message(&self, message: &str) -> Result<()>;
    fn log_file(&self, path: &Path, status: &str) -> Result<()>;
    fn log_run_summary(&self, files_scanned: u64, total_results: u64, duration: Duration) -> Result<()>;
}

/// 调试日志记录器（记录搜索参数、逐文件状态和每次搜索的汇总）
pub struct Logger {
    log_file: Arc<Mutex<Option<File>>>,
    log_path: PathBuf,
    enabled: bool,
}

impl Logger {
    /// 不写任何文件的记录器
    pub fn disabled() -> Self {
        Self {
            log_file: Arc::new(Mutex::new(None)),
            log_path: PathBuf::new(),
            enabled: false,
        }
    }

    /// 在指定目录下创建 `debug_<时间戳>.log`
    pub fn new(enabled: bool, log_dir: &Path) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let now = Local::now();
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("debug_{}.log", timestamp));
        Self::with_path(&log_path)
    }

    /// 写入到指定文件
    pub fn with_path(log_path: &Path) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        // 写入UTF-8 BOM以确保文件被正确识别为UTF-8
        let mut file_clone = file.try_clone()?;
        file_clone.write_all(&[0xEF, 0xBB, 0xBF])?;

        let now = Local::now();
        writeln!(file_clone, "# filesearch 调试日志")?;
        writeln!(file_clone, "# 开始时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file_clone, "# --------------------------------------------")?;

        Ok(Self {
            log_file: Arc::new(Mutex::new(Some(file))),
            log_path: log_path.to_path_buf(),
            enabled: true,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 写入结束标记
    pub fn finalize(&self, duration: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let now = Local::now();
                writeln!(file, "# --------------------------------------------")?;
                writeln!(file, "# 结束时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
                writeln!(file, "# 运行时长: {:.3}秒", duration.as_secs_f64())?;
                writeln!(file, "# ============================================")?;
                file.flush()?;
            }
        }

        Ok(())
    }

    fn write_line(&self, line: &str) -> Result<()> {
        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "{}", line)?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl LoggerTrait for Logger {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_message(&self, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&format!("[{}] {}", timestamp, message))
    }

    fn log_file(&self, path: &Path, status: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&format!("[{}] 文件: {} | 状态: {}", timestamp, path.display(), status))
    }

    fn log_run_summary(&self, files_scanned: u64, total_results: u64, duration: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&format!(
            "[{}] 搜索完成 | 扫描文件数: {} | 结果数: {} | 用时: {:.3}秒",
            timestamp,
            files_scanned,
            total_results,
            duration.as_secs_f64()
        ))
    }
}
