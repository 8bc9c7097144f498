use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// 把显示的结果原样写入文本文件
///
/// 内容为空时不创建文件，返回 false。
pub fn save_results(path: &Path, text: &str) -> Result<bool> {
    if text.is_empty() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
    }

    fs::write(path, text).with_context(|| format!("无法写入结果文件: {}", path.display()))?;
    Ok(true)
}

/// 读取之前保存的结果文件
pub fn load_results(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("无法读取结果文件: {}", path.display()))
}
