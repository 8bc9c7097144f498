use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Local;

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// 文件读取错误 (文件消失或无权限)，该文件按未匹配处理
    FileRead,
    /// 遍历目录时的错误
    Traversal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::FileRead => "文件读取",
            ErrorType::Traversal => "目录遍历",
        }
    }
}

/// 错误日志记录器
///
/// 搜索中被吞掉的错误只在这里留下痕迹。未启用时只计数，不写文件。
pub struct ErrorLogger {
    error_file: Arc<Mutex<Option<File>>>,
    error_path: PathBuf,
    enabled: bool,
    error_counts: Arc<Mutex<HashMap<ErrorType, usize>>>,
}

impl ErrorLogger {
    pub fn disabled() -> Self {
        Self {
            error_file: Arc::new(Mutex::new(None)),
            error_path: PathBuf::new(),
            enabled: false,
            error_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 在指定目录下创建 `error_<时间戳>.log`
    pub fn new(enabled: bool, log_dir: &Path) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let now = Local::now();
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let error_path = log_dir.join(format!("error_{}.log", timestamp));
        Self::with_path(&error_path)
    }

    pub fn with_path(error_path: &Path) -> Result<Self> {
        if let Some(parent) = error_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(error_path)?;

        let mut file_clone = file.try_clone()?;
        file_clone.write_all(&[0xEF, 0xBB, 0xBF])?; // UTF-8 BOM

        let now = Local::now();
        writeln!(file_clone, "# filesearch 错误日志")?;
        writeln!(file_clone, "# 开始时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file_clone, "# ============================================")?;
        writeln!(file_clone)?;

        Ok(Self {
            error_file: Arc::new(Mutex::new(Some(file))),
            error_path: error_path.to_path_buf(),
            enabled: true,
            error_counts: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// 记录错误
    pub fn log_error(
        &self,
        error_type: ErrorType,
        file_path: Option<&str>,
        message: &str,
        details: Option<&str>,
    ) -> Result<()> {
        if let Ok(mut counts) = self.error_counts.lock() {
            *counts.entry(error_type).or_insert(0) += 1;
        }

        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        if let Ok(mut file_guard) = self.error_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "[{}] {} - {}", timestamp, error_type.as_str(), message)?;

                if let Some(path) = file_path {
                    writeln!(file, "  文件路径: {}", path)?;
                }

                if let Some(detail) = details {
                    writeln!(file, "  详细信息: {}", detail)?;
                }

                writeln!(file)?;
                file.flush()?;
            }
        }

        Ok(())
    }

    /// 获取错误统计信息
    pub fn get_error_summary(&self) -> HashMap<ErrorType, usize> {
        self.error_counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    /// 获取总错误数
    pub fn get_total_errors(&self) -> usize {
        self.error_counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.get_total_errors() > 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 完成错误日志记录
    pub fn finalize(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let summary = self.get_error_summary();
        if let Ok(mut file_guard) = self.error_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let now = Local::now();
                writeln!(file, "# ============================================")?;
                writeln!(file, "# 结束时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;

                if !summary.is_empty() {
                    writeln!(file, "# 错误统计:")?;
                    for (error_type, count) in sorted_counts(&summary) {
                        writeln!(file, "#   {}: {} 次", error_type.as_str(), count)?;
                    }
                    writeln!(file, "#   总计: {} 个错误", summary.values().sum::<usize>())?;
                } else {
                    writeln!(file, "# 无错误记录")?;
                }

                file.flush()?;
            }
        }

        Ok(())
    }

    /// 打印错误摘要到控制台
    pub fn print_error_summary(&self) {
        if !self.has_errors() {
            return;
        }

        println!("\n⚠️  搜索过程中跳过了部分文件:");
        println!("----------------------------");

        for (error_type, count) in sorted_counts(&self.get_error_summary()) {
            println!("  {}: {} 次", error_type.as_str(), count);
        }

        println!("  总计: {} 个错误", self.get_total_errors());
        if self.enabled {
            println!("  详细错误信息请查看: {}", self.error_path.display());
        }
    }
}

fn sorted_counts(summary: &HashMap<ErrorType, usize>) -> Vec<(ErrorType, usize)> {
    let mut counts: Vec<_> = summary.iter().map(|(t, c)| (*t, *c)).collect();
    counts.sort_by_key(|(t, _)| t.as_str());
    counts
}
