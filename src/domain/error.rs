use std::path::PathBuf;

use thiserror::Error;

/// 搜索核心的错误类型
///
/// 单个文件读取失败不会出现在这里：那类错误在遍历中被吞掉，
/// 文件按不匹配处理。
#[derive(Debug, Error)]
pub enum SearchError {
    /// 搜索根目录不存在
    #[error("目录不存在: {0}")]
    FolderNotFound(PathBuf),

    /// 搜索根路径不是目录
    #[error("不是有效的目录: {0}")]
    NotADirectory(PathBuf),

    /// 扩展名为空或只有一个点
    #[error("无效的扩展名: {0:?}")]
    InvalidExtension(String),

    /// 无法启动工作线程
    #[error("无法启动搜索线程: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// 工作线程异常退出
    #[error("搜索线程异常退出")]
    WorkerPanicked,
}

impl SearchError {
    /// 检查搜索根目录，返回对应错误
    pub fn check_root(root: &std::path::Path) -> Result<(), SearchError> {
        if !root.exists() {
            return Err(SearchError::FolderNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(SearchError::NotADirectory(root.to_path_buf()));
        }
        Ok(())
    }
}
