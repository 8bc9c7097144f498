use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};

use crate::domain::error::SearchError;
use crate::domain::extension_lister::ExtensionListing;
use crate::domain::file_walker::{build_walker, count_files, is_file, ExclusionRules, FolderExclusions};
use crate::domain::search::{progress_percent, MatchPredicate, SearchOptions, SearchResult};
use crate::infrastructure::{ErrorLogger, ErrorType, Logger, LoggerTrait};

/// 工作线程发往界面线程的单向通知
///
/// 通道断开即表示工作线程已结束。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// 一条搜索结果 (匹配路径或最终汇总)
    Result(SearchResult),
    /// 进度百分比
    Progress(u8),
    /// 扩展名列表
    Listing(ExtensionListing),
}

/// 工作线程的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed { matches: u64, files_scanned: u64 },
    Cancelled { files_scanned: u64 },
}

impl WorkerOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerOutcome::Cancelled { .. })
    }

    pub fn files_scanned(&self) -> u64 {
        match self {
            WorkerOutcome::Completed { files_scanned, .. } => *files_scanned,
            WorkerOutcome::Cancelled { files_scanned } => *files_scanned,
        }
    }
}

/// 取消标志，只会从 false 变为 true
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// 工作线程共用的日志与排除规则
#[derive(Clone)]
pub struct WorkerContext {
    pub logger: Arc<dyn LoggerTrait>,
    pub errors: Arc<ErrorLogger>,
    pub rules: ExclusionRules,
}

impl WorkerContext {
    pub fn new(logger: Arc<dyn LoggerTrait>, errors: Arc<ErrorLogger>, rules: ExclusionRules) -> Self {
        Self {
            logger,
            errors,
            rules,
        }
    }
}

impl Default for WorkerContext {
    fn default() -> Self {
        Self {
            logger: Arc::new(Logger::disabled()),
            errors: Arc::new(ErrorLogger::disabled()),
            rules: ExclusionRules::default(),
        }
    }
}

/// 正在运行的工作线程句柄
///
/// 句柄被丢弃时会请求取消。
pub struct WorkerHandle {
    events: Receiver<WorkerEvent>,
    cancel: CancelToken,
    thread: Option<JoinHandle<WorkerOutcome>>,
}

impl WorkerHandle {
    /// 通知接收端
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// 请求取消，工作线程在处理下一个文件前停止
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 等待工作线程结束
    pub fn join(mut self) -> Result<WorkerOutcome, SearchError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| SearchError::WorkerPanicked),
            None => Err(SearchError::WorkerPanicked),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

/// 在独立线程中运行任务，任务通过回调发送通知
pub(crate) fn spawn_worker<F>(name: &str, job: F) -> Result<WorkerHandle, SearchError>
where
    F: FnOnce(&AtomicBool, &mut dyn FnMut(WorkerEvent) -> bool) -> WorkerOutcome + Send + 'static,
{
    let (tx, rx) = unbounded::<WorkerEvent>();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut emit = |event: WorkerEvent| tx.send(event).is_ok();
            job(worker_cancel.flag(), &mut emit)
        })
        .map_err(SearchError::WorkerSpawn)?;

    Ok(WorkerHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    })
}

/// 搜索工作线程
pub struct SearchWorker;

impl SearchWorker {
    /// 校验根目录后启动后台搜索
    pub fn spawn(options: SearchOptions, ctx: WorkerContext) -> Result<WorkerHandle, SearchError> {
        SearchError::check_root(&options.root_folder)?;
        spawn_worker("search-worker", move |cancel, emit| {
            Self::run(&options, &ctx, cancel, emit)
        })
    }

    /// 在当前线程执行一次完整搜索
    ///
    /// 先统计文件总数，再逐个文件匹配。每处理完一个文件发送一次进度；
    /// 每个文件开始前检查取消标志，取消后不再发送任何通知，也不发送汇总。
    /// `emit` 返回 false 表示接收端已经关闭，按取消处理。
    pub fn run(
        options: &SearchOptions,
        ctx: &WorkerContext,
        cancel: &AtomicBool,
        emit: &mut dyn FnMut(WorkerEvent) -> bool,
    ) -> WorkerOutcome {
        let start_time = Instant::now();
        let logger = &ctx.logger;
        let exclusions = FolderExclusions::from_options(options, &ctx.rules);

        if logger.is_enabled() {
            let _ = logger.log_message(&format!(
                "开始搜索: {} | 搜索内容: {:?} | 类型: {} | 区分大小写: {}",
                options.root_folder.display(),
                options.search_text,
                options.search_type,
                options.case_sensitive
            ));
            let mut excluded: Vec<_> = exclusions.excluded_dirs.iter().cloned().collect();
            excluded.sort();
            let _ = logger.log_message(&format!("排除目录: {:?}", excluded));
        }

        let total_files = match count_files(&options.root_folder, &exclusions, cancel, Arc::clone(logger)) {
            Some(total) => total,
            None => {
                if logger.is_enabled() {
                    let _ = logger.log_message("统计文件时被取消");
                }
                return WorkerOutcome::Cancelled { files_scanned: 0 };
            }
        };

        if logger.is_enabled() {
            let _ = logger.log_message(&format!("待处理文件数: {}", total_files));
        }

        let predicate = MatchPredicate::from_options(options);
        let mut processed = 0u64;
        let mut matches = 0u64;

        for result in build_walker(&options.root_folder, &exclusions, Arc::clone(logger)) {
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
                if logger.is_enabled() {
                    let _ = logger.log_message(&format!("搜索已取消，已处理 {} 文件", processed));
                }
                return WorkerOutcome::Cancelled { files_scanned: processed };
            }

            let path = entry.path();
            match predicate.check(path) {
                Ok(true) => {
                    matches += 1;
                    if logger.is_enabled() {
                        let _ = logger.log_file(path, "匹配");
                    }
                    if !emit(WorkerEvent::Result(SearchResult::Match(path.to_path_buf()))) {
                        return WorkerOutcome::Cancelled { files_scanned: processed };
                    }
                }
                Ok(false) => {
                    if logger.is_enabled() {
                        let _ = logger.log_file(path, "未匹配");
                    }
                }
                Err(err) => {
                    let _ = ctx.errors.log_error(
                        ErrorType::FileRead,
                        Some(&path.to_string_lossy()),
                        "读取文件失败，按未匹配处理",
                        Some(&err.to_string()),
                    );
                    if logger.is_enabled() {
                        let _ = logger.log_file(path, "已跳过(读取失败)");
                    }
                }
            }

            processed += 1;
            if !emit(WorkerEvent::Progress(progress_percent(processed, total_files))) {
                return WorkerOutcome::Cancelled { files_scanned: processed };
            }
        }

        emit(WorkerEvent::Result(SearchResult::Summary { total: matches }));

        if logger.is_enabled() {
            let _ = logger.log_run_summary(processed, matches, start_time.elapsed());
        }

        WorkerOutcome::Completed {
            matches,
            files_scanned: processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::SearchType;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn run_collect(options: &SearchOptions) -> (Vec<WorkerEvent>, WorkerOutcome) {
        let cancel = AtomicBool::new(false);
        let mut events = Vec::new();
        let outcome = SearchWorker::run(options, &WorkerContext::default(), &cancel, &mut |event| {
            events.push(event);
            true
        });
        (events, outcome)
    }

    fn results(events: &[WorkerEvent]) -> Vec<SearchResult> {
        events
            .iter()
            .filter_map(|event| match event {
                WorkerEvent::Result(result) => Some(result.clone()),
                _ => None,
            })
            .collect()
    }

    fn matched_paths(events: &[WorkerEvent]) -> Vec<PathBuf> {
        results(events)
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::Match(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    fn progress_values(events: &[WorkerEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                WorkerEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a.xml"), "<a>alpha</a>").unwrap();
        fs::write(root.join("b.txt"), "bbb").unwrap();
        fs::write(root.join(".git/c.xml"), "<c>alpha</c>").unwrap();
    }

    #[test]
    fn test_xml_search_default_options() {
        let dir = tempdir().unwrap();
        sample_tree(dir.path());

        let options = SearchOptions::new(dir.path(), "a");
        let (events, outcome) = run_collect(&options);

        assert_eq!(
            results(&events),
            vec![
                SearchResult::Match(dir.path().join("a.xml")),
                SearchResult::Summary { total: 1 },
            ]
        );
        assert_eq!(
            outcome,
            WorkerOutcome::Completed {
                matches: 1,
                files_scanned: 2
            }
        );
        assert_eq!(progress_values(&events), vec![50, 100]);
    }

    #[test]
    fn test_include_git_searches_git_folder() {
        let dir = tempdir().unwrap();
        sample_tree(dir.path());

        let options = SearchOptions::new(dir.path(), "alpha").include_git(true);
        let (events, _) = run_collect(&options);
        let paths = matched_paths(&events);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&dir.path().join(".git/c.xml")));
    }

    #[test]
    fn test_name_search_case_insensitive_is_superset() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("Readme.md"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();
        fs::write(dir.path().join("sub/READ.me"), "").unwrap();
        fs::write(dir.path().join("other.rs"), "").unwrap();

        let base = SearchOptions::new(dir.path(), "read").with_search_type(SearchType::NameOnly);
        let (insensitive, _) = run_collect(&base);
        let (sensitive, _) = run_collect(&base.clone().case_sensitive(true));

        let insensitive = matched_paths(&insensitive);
        let sensitive = matched_paths(&sensitive);
        assert_eq!(insensitive.len(), 3);
        assert_eq!(sensitive, vec![dir.path().join("readme.txt")]);
        assert!(sensitive.iter().all(|p| insensitive.contains(p)));
    }

    #[test]
    fn test_excluded_folders_not_counted() {
        let dir = tempdir().unwrap();
        for name in ["Languages", "languages", "Source", "source", ".git"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
            fs::write(dir.path().join(name).join("hit.xml"), "hit").unwrap();
        }
        fs::write(dir.path().join("hit.xml"), "hit").unwrap();

        let options = SearchOptions::new(dir.path(), "hit").with_search_type(SearchType::NameOnly);
        let (events, outcome) = run_collect(&options);
        assert_eq!(matched_paths(&events), vec![dir.path().join("hit.xml")]);
        assert_eq!(outcome.files_scanned(), 1);
        assert_eq!(progress_values(&events), vec![100]);
    }

    #[test]
    fn test_progress_non_decreasing() {
        let dir = tempdir().unwrap();
        for i in 0..7 {
            fs::create_dir_all(dir.path().join(format!("d{}", i % 3))).unwrap();
            fs::write(dir.path().join(format!("d{}/f{}.txt", i % 3, i)), "data").unwrap();
        }

        let options = SearchOptions::new(dir.path(), "data").with_search_type(SearchType::ContentsAll);
        let (events, _) = run_collect(&options);
        let progress = progress_values(&events);
        assert_eq!(progress.len(), 7);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[test]
    fn test_empty_folder_completes() {
        let dir = tempdir().unwrap();
        let options = SearchOptions::new(dir.path(), "x");
        let (events, outcome) = run_collect(&options);
        assert_eq!(events, vec![WorkerEvent::Result(SearchResult::Summary { total: 0 })]);
        assert_eq!(
            outcome,
            WorkerOutcome::Completed {
                matches: 0,
                files_scanned: 0
            }
        );
    }

    #[test]
    fn test_invalid_utf8_contents_still_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bin.dat"), b"\xff\xfeneedle\x00").unwrap();

        let options = SearchOptions::new(dir.path(), "needle").with_search_type(SearchType::ContentsAll);
        let (events, _) = run_collect(&options);
        assert_eq!(matched_paths(&events), vec![dir.path().join("bin.dat")]);
    }

    #[test]
    fn test_unreadable_file_logged_and_counted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hit").unwrap();
        fs::write(dir.path().join("b.txt"), "hit").unwrap();

        let errors = Arc::new(ErrorLogger::disabled());
        let ctx = WorkerContext::new(
            Arc::new(Logger::disabled()),
            Arc::clone(&errors),
            ExclusionRules::default(),
        );
        let options = SearchOptions::new(dir.path(), "hit").with_search_type(SearchType::ContentsAll);
        let cancel = AtomicBool::new(false);
        let mut events = Vec::new();

        // b.txt 已被统计和遍历到，但在读取之前被删除
        let outcome = SearchWorker::run(&options, &ctx, &cancel, &mut |event| {
            let first_progress = matches!(event, WorkerEvent::Progress(_))
                && !events.iter().any(|e| matches!(e, WorkerEvent::Progress(_)));
            if first_progress {
                fs::remove_file(dir.path().join("b.txt")).unwrap();
            }
            events.push(event);
            true
        });

        assert_eq!(
            results(&events),
            vec![
                SearchResult::Match(dir.path().join("a.txt")),
                SearchResult::Summary { total: 1 },
            ]
        );
        assert_eq!(progress_values(&events), vec![50, 100]);
        assert_eq!(
            outcome,
            WorkerOutcome::Completed {
                matches: 1,
                files_scanned: 2
            }
        );
        assert_eq!(errors.get_error_summary().get(&ErrorType::FileRead), Some(&1));
        assert_eq!(errors.get_total_errors(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_searched() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("target.xml"), "<a>needle</a>").unwrap();
        symlink(outside.path().join("target.xml"), dir.path().join("link.xml")).unwrap();

        let (events, outcome) = run_collect(&SearchOptions::new(dir.path(), "needle"));
        assert_eq!(
            results(&events),
            vec![
                SearchResult::Match(dir.path().join("link.xml")),
                SearchResult::Summary { total: 1 },
            ]
        );
        assert_eq!(progress_values(&events), vec![100]);
        assert_eq!(outcome.files_scanned(), 1);

        let by_name = SearchOptions::new(dir.path(), "link").with_search_type(SearchType::NameOnly);
        let (events, _) = run_collect(&by_name);
        assert_eq!(matched_paths(&events), vec![dir.path().join("link.xml")]);
    }

    #[test]
    fn test_cancel_stops_events() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{}.xml", i)), "hit").unwrap();
        }

        let options = SearchOptions::new(dir.path(), "hit");
        let cancel = AtomicBool::new(false);
        let mut events = Vec::new();
        let outcome = SearchWorker::run(&options, &WorkerContext::default(), &cancel, &mut |event| {
            if matches!(event, WorkerEvent::Result(SearchResult::Match(_))) {
                cancel.store(true, Ordering::Relaxed);
            }
            events.push(event);
            true
        });

        // 设置标志时正在处理的文件仍会发送进度，之后不再有任何通知
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], WorkerEvent::Result(SearchResult::Match(_))));
        assert!(matches!(events[1], WorkerEvent::Progress(_)));
        assert_eq!(outcome, WorkerOutcome::Cancelled { files_scanned: 1 });
    }

    #[test]
    fn test_cancel_before_start_emits_nothing() {
        let dir = tempdir().unwrap();
        sample_tree(dir.path());

        let options = SearchOptions::new(dir.path(), "a");
        let cancel = AtomicBool::new(true);
        let mut count = 0;
        let outcome = SearchWorker::run(&options, &WorkerContext::default(), &cancel, &mut |_| {
            count += 1;
            true
        });
        assert_eq!(count, 0);
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_spawned_worker_streams_events() {
        let dir = tempdir().unwrap();
        sample_tree(dir.path());

        let handle = SearchWorker::spawn(SearchOptions::new(dir.path(), "a"), WorkerContext::default()).unwrap();
        let events: Vec<_> = handle.events().iter().collect();
        let outcome = handle.join().unwrap();

        assert_eq!(
            events.last(),
            Some(&WorkerEvent::Result(SearchResult::Summary { total: 1 }))
        );
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_spawn_rejects_missing_folder() {
        let dir = tempdir().unwrap();
        let options = SearchOptions::new(dir.path().join("missing"), "a");
        assert!(matches!(
            SearchWorker::spawn(options, WorkerContext::default()),
            Err(SearchError::FolderNotFound(_))
        ));
    }
}
