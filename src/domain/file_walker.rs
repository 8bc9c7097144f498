use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::{DirEntry, Walk, WalkBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::search::SearchOptions;
use crate::infrastructure::LoggerTrait;

/// 可排除目录名的分组，每组对应一个 include 开关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    /// 对应 include_git
    pub git_dirs: Vec<String>,
    /// 对应 include_languages
    pub language_dirs: Vec<String>,
    /// 对应 include_source
    pub source_dirs: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            git_dirs: vec![".git".to_string()],
            language_dirs: vec!["Languages".to_string(), "languages".to_string()],
            source_dirs: vec!["Source".to_string(), "source".to_string()],
        }
    }
}

/// 一次遍历中被剪枝的目录名集合
#[derive(Debug, Clone, Default)]
pub struct FolderExclusions {
    pub excluded_dirs: HashSet<String>,
}

impl FolderExclusions {
    /// 不排除任何目录
    pub fn none() -> Self {
        Self::default()
    }

    /// 根据搜索选项中的 include 开关选出要排除的目录名
    pub fn from_options(options: &SearchOptions, rules: &ExclusionRules) -> Self {
        let mut excluded_dirs = HashSet::new();
        if !options.include_git {
            excluded_dirs.extend(rules.git_dirs.iter().cloned());
        }
        if !options.include_languages {
            excluded_dirs.extend(rules.language_dirs.iter().cloned());
        }
        if !options.include_source {
            excluded_dirs.extend(rules.source_dirs.iter().cloned());
        }
        Self { excluded_dirs }
    }

    /// 检查目录名是否被排除 (精确匹配，区分大小写)
    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.excluded_dirs.contains(name)
    }

    /// 检查遍历条目是否需要剪枝
    ///
    /// 只剪目录，根目录本身永远保留。
    pub fn should_prune(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || self.excluded_dirs.is_empty() {
            return false;
        }
        if !entry.file_type().map_or(false, |ft| ft.is_dir()) {
            return false;
        }
        self.is_excluded_name(&entry.file_name().to_string_lossy())
    }
}

/// 创建顺序遍历器
///
/// 包含隐藏文件，不读取任何 ignore 规则，不跟随符号链接。
/// 被排除的目录在进入之前就被剪掉。
pub fn build_walker(
    root: &Path,
    exclusions: &FolderExclusions,
    logger: Arc<dyn LoggerTrait>,
) -> Walk {
    let exclusions = Arc::new(exclusions.clone());

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    builder.filter_entry(move |entry| {
        if exclusions.should_prune(entry) {
            if logger.is_enabled() {
                let _ = logger.log_file(entry.path(), "已跳过(目录排除)");
            }
            return false;
        }
        true
    });

    builder.build()
}

/// 检查条目是否为普通文件，指向文件的符号链接也算
///
/// 不跟随链接进入目录，指向目录的链接和断开的链接都不算文件。
pub fn is_file(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(ft) if ft.is_symlink() => fs::metadata(entry.path()).map_or(false, |m| m.is_file()),
        _ => false,
    }
}

/// 统计排除规则下可达的文件总数
///
/// 被取消时返回 `None`。
pub fn count_files(
    root: &Path,
    exclusions: &FolderExclusions,
    cancel: &AtomicBool,
    logger: Arc<dyn LoggerTrait>,
) -> Option<u64> {
    let mut total = 0u64;
    for result in build_walker(root, exclusions, logger) {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        if let Ok(entry) = result {
            if is_file(&entry) {
                total += 1;
            }
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::Logger;
    use tempfile::tempdir;

    fn silent() -> Arc<dyn LoggerTrait> {
        Arc::new(Logger::disabled())
    }

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("Languages")).unwrap();
        fs::create_dir_all(root.join("nested/source")).unwrap();
        fs::write(root.join("a.xml"), "a").unwrap();
        fs::write(root.join(".git/config"), "x").unwrap();
        fs::write(root.join(".git/objects/pack"), "x").unwrap();
        fs::write(root.join("Languages/en.xml"), "x").unwrap();
        fs::write(root.join("nested/b.txt"), "x").unwrap();
        fs::write(root.join("nested/source/c.cs"), "x").unwrap();
    }

    #[test]
    fn test_exclusions_from_options() {
        let options = SearchOptions::new("/tmp", "x");
        let rules = ExclusionRules::default();

        let exclusions = FolderExclusions::from_options(&options, &rules);
        assert!(exclusions.is_excluded_name(".git"));
        assert!(exclusions.is_excluded_name("Languages"));
        assert!(exclusions.is_excluded_name("source"));
        assert!(!exclusions.is_excluded_name("SOURCE"));

        let options = options.include_git(true).include_source(true);
        let exclusions = FolderExclusions::from_options(&options, &rules);
        assert!(!exclusions.is_excluded_name(".git"));
        assert!(exclusions.is_excluded_name("languages"));
        assert!(!exclusions.is_excluded_name("Source"));
    }

    #[test]
    fn test_count_files_respects_exclusions() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let cancel = AtomicBool::new(false);

        let options = SearchOptions::new(dir.path(), "x");
        let exclusions = FolderExclusions::from_options(&options, &ExclusionRules::default());
        assert_eq!(count_files(dir.path(), &exclusions, &cancel, silent()), Some(2));

        assert_eq!(count_files(dir.path(), &FolderExclusions::none(), &cancel, silent()), Some(6));
    }

    #[test]
    fn test_pruned_subtree_never_visited() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());

        let options = SearchOptions::new(dir.path(), "x");
        let exclusions = FolderExclusions::from_options(&options, &ExclusionRules::default());
        let visited: Vec<_> = build_walker(dir.path(), &exclusions, silent())
            .filter_map(Result::ok)
            .map(|entry| entry.path().to_path_buf())
            .collect();

        assert!(visited.iter().all(|p| !p.starts_with(dir.path().join(".git"))));
        assert!(visited.iter().all(|p| !p.starts_with(dir.path().join("Languages"))));
        assert!(visited.iter().all(|p| !p.starts_with(dir.path().join("nested/source"))));
    }

    #[test]
    fn test_root_named_like_excluded_is_walked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Source");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("main.xml"), "x").unwrap();

        let options = SearchOptions::new(&root, "x");
        let exclusions = FolderExclusions::from_options(&options, &ExclusionRules::default());
        let cancel = AtomicBool::new(false);
        assert_eq!(count_files(&root, &exclusions, &cancel, silent()), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_counted_dir_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("target.xml"), "x").unwrap();
        fs::create_dir_all(outside.path().join("linked")).unwrap();
        fs::write(outside.path().join("linked/inner.xml"), "x").unwrap();

        fs::write(dir.path().join("plain.xml"), "x").unwrap();
        symlink(outside.path().join("target.xml"), dir.path().join("link.xml")).unwrap();
        symlink(outside.path().join("linked"), dir.path().join("linked")).unwrap();
        symlink(outside.path().join("missing.xml"), dir.path().join("dangling.xml")).unwrap();

        let cancel = AtomicBool::new(false);
        assert_eq!(count_files(dir.path(), &FolderExclusions::none(), &cancel, silent()), Some(2));
    }

    #[test]
    fn test_count_files_cancelled() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let cancel = AtomicBool::new(true);
        assert_eq!(count_files(dir.path(), &FolderExclusions::none(), &cancel, silent()), None);
    }
}
