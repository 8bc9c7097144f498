use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::error::SearchError;
use crate::domain::file_walker::{build_walker, count_files, is_file, FolderExclusions};
use crate::domain::search::{file_name_of, progress_percent};
use crate::domain::worker::{spawn_worker, WorkerContext, WorkerEvent, WorkerHandle, WorkerOutcome};
use crate::infrastructure::ErrorType;

/// 某个扩展名下的文件名列表
///
/// 只保留文件名，不同目录下的同名文件合并为一条。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionListing {
    pub extension: String,
    pub names: BTreeSet<String>,
}

impl ExtensionListing {
    pub fn header(&self) -> String {
        format!("List of .{} Extensions:", self.extension)
    }

    /// 显示用的行：标题在前，文件名按字典序
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.names.len() + 1);
        lines.push(self.header());
        lines.extend(self.names.iter().cloned());
        lines
    }
}

impl fmt::Display for ExtensionListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lines().join("\n"))
    }
}

/// 规范化扩展名，允许带前导点
pub fn normalize_extension(extension: &str) -> Result<String, SearchError> {
    let trimmed = extension.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(SearchError::InvalidExtension(extension.to_string()));
    }
    Ok(bare.to_string())
}

/// 扩展名列举工作线程
pub struct ExtensionLister;

impl ExtensionLister {
    pub fn spawn(
        root: impl Into<PathBuf>,
        extension: &str,
        ctx: WorkerContext,
    ) -> Result<WorkerHandle, SearchError> {
        let root = root.into();
        SearchError::check_root(&root)?;
        let extension = normalize_extension(extension)?;
        spawn_worker("extension-lister", move |cancel, emit| {
            Self::run(&root, &extension, &ctx, cancel, emit)
        })
    }

    /// 遍历整棵目录树 (不做目录排除)，收集以 `.<extension>` 结尾的文件名
    pub fn run(
        root: &Path,
        extension: &str,
        ctx: &WorkerContext,
        cancel: &AtomicBool,
        emit: &mut dyn FnMut(WorkerEvent) -> bool,
    ) -> WorkerOutcome {
        let logger = &ctx.logger;
        let exclusions = FolderExclusions::none();
        let suffix = format!(".{}", extension);

        if logger.is_enabled() {
            let _ = logger.log_message(&format!(
                "列举扩展名: {} | 目录: {}",
                suffix,
                root.display()
            ));
        }

        let total_files = match count_files(root, &exclusions, cancel, Arc::clone(logger)) {
            Some(total) => total,
            None => return WorkerOutcome::Cancelled { files_scanned: 0 },
        };

        let mut names = BTreeSet::new();
        let mut processed = 0u64;

        for result in build_walker(root, &exclusions, Arc::clone(logger)) {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    let _ = ctx.errors.log_error(
                        ErrorType::Traversal,
                        None,
                        "遍历目录失败",
                        Some(&err.to_string()),
                    );
                    continue;
                }
            };

            if !is_file(&entry) {
                continue;
            }

            if cancel.load(Ordering::Relaxed) {
                return WorkerOutcome::Cancelled { files_scanned: processed };
            }

            let name = file_name_of(entry.path());
            if name.ends_with(&suffix) {
                names.insert(name);
            }

            processed += 1;
            if !emit(WorkerEvent::Progress(progress_percent(processed, total_files))) {
                return WorkerOutcome::Cancelled { files_scanned: processed };
            }
        }

        let found = names.len() as u64;
        if logger.is_enabled() {
            let _ = logger.log_message(&format!(
                "扩展名 {} 共 {} 个文件名 (扫描 {} 文件)",
                suffix, found, processed
            ));
        }

        emit(WorkerEvent::Listing(ExtensionListing {
            extension: extension.to_string(),
            names,
        }));

        WorkerOutcome::Completed {
            matches: found,
            files_scanned: processed,
        }
    }
}
