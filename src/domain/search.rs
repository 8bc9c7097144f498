use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

/// 搜索类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// 只比较文件名
    NameOnly,
    /// 搜索所有文件的内容
    ContentsAll,
    /// 只搜索 .xml 文件的内容
    #[default]
    XmlContentsOnly,
}

impl SearchType {
    pub const ALL: [SearchType; 3] = [
        SearchType::NameOnly,
        SearchType::ContentsAll,
        SearchType::XmlContentsOnly,
    ];

    /// 界面上显示的名称
    pub fn label(&self) -> &'static str {
        match self {
            SearchType::NameOnly => "File and Folder Names",
            SearchType::ContentsAll => "Inside All Files",
            SearchType::XmlContentsOnly => ".xml Extensions Only",
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "names" | "name_only" => Ok(SearchType::NameOnly),
            "contents" | "content" | "contents_all" => Ok(SearchType::ContentsAll),
            "xml" | "xml_contents_only" => Ok(SearchType::XmlContentsOnly),
            other => Err(format!("未知的搜索类型: {} (可选: name, contents, xml)", other)),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次搜索的全部参数，搜索期间不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub root_folder: PathBuf,
    pub search_text: String,
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub include_git: bool,
    pub include_languages: bool,
    pub include_source: bool,
}

impl SearchOptions {
    /// 使用默认选项创建 (不区分大小写，排除所有特殊目录)
    pub fn new(root_folder: impl Into<PathBuf>, search_text: impl Into<String>) -> Self {
        Self {
            root_folder: root_folder.into(),
            search_text: search_text.into(),
            search_type: SearchType::default(),
            case_sensitive: false,
            include_git: false,
            include_languages: false,
            include_source: false,
        }
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn include_git(mut self, yes: bool) -> Self {
        self.include_git = yes;
        self
    }

    pub fn include_languages(mut self, yes: bool) -> Self {
        self.include_languages = yes;
        self
    }

    pub fn include_source(mut self, yes: bool) -> Self {
        self.include_source = yes;
        self
    }
}

/// 搜索结果：匹配的文件路径，或者结束时的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Match(PathBuf),
    Summary { total: u64 },
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchResult::Match(path) => write!(f, "{}", path.display()),
            SearchResult::Summary { total } => write!(f, "Total Results: {}", total),
        }
    }
}

/// 子串匹配器
///
/// 不区分大小写时，搜索串在构造时转为小写，被比较的文本在比较时转为小写。
#[derive(Debug, Clone)]
pub struct TextMatcher {
    needle: String,
    case_sensitive: bool,
}

impl TextMatcher {
    pub fn new(text: &str, case_sensitive: bool) -> Self {
        let needle = if case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };
        Self {
            needle,
            case_sensitive,
        }
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        if self.case_sensitive {
            haystack.contains(&self.needle)
        } else {
            haystack.to_lowercase().contains(&self.needle)
        }
    }
}

/// 按搜索类型对单个文件做判断
#[derive(Debug, Clone)]
pub struct MatchPredicate {
    search_type: SearchType,
    matcher: TextMatcher,
}

impl MatchPredicate {
    pub fn from_options(options: &SearchOptions) -> Self {
        Self {
            search_type: options.search_type,
            matcher: TextMatcher::new(&options.search_text, options.case_sensitive),
        }
    }

    /// 判断文件是否匹配
    ///
    /// 读取失败时返回错误，调用方按不匹配处理。
    pub fn check(&self, path: &Path) -> io::Result<bool> {
        let file_name = file_name_of(path);
        match self.search_type {
            SearchType::NameOnly => Ok(self.matcher.is_match(&file_name)),
            SearchType::ContentsAll => self.check_contents(path),
            SearchType::XmlContentsOnly => {
                if file_name.ends_with(".xml") {
                    self.check_contents(path)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn check_contents(&self, path: &Path) -> io::Result<bool> {
        let bytes = fs::read(path)?;
        Ok(self.matcher.is_match(&decode_ignoring_invalid(&bytes)))
    }
}

/// 按 UTF-8 解码，丢弃无效字节序列
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in ByteSlice::utf8_chunks(bytes) {
        text.push_str(chunk.valid());
    }
    text
}

/// 取路径的文件名部分
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 计算进度百分比，总数为 0 时视为完成
pub fn progress_percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = processed.saturating_mul(100) / total;
    percent.min(100) as u8
}
