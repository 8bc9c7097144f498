use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ExclusionRules, SearchType};

/// 应用程序配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 搜索选项的默认值
    pub search: SearchConfig,
    /// 可排除的目录名
    pub exclude: ExclusionRules,
    /// 扩展名列举的预设
    pub extensions: ExtensionsConfig,
    /// 日志相关配置
    pub logging: LoggingConfig,
}

/// 搜索配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 默认搜索类型
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub include_git: bool,
    pub include_languages: bool,
    pub include_source: bool,
}

/// 扩展名列举配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub presets: Vec<String>,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 是否写调试日志和错误日志
    pub enabled: bool,
    /// 日志目录
    pub directory: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_type: SearchType::XmlContentsOnly,
            case_sensitive: false,
            include_git: false,
            include_languages: false,
            include_source: false,
        }
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            presets: ["xml", "dll", "png", "dds"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("."),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            exclude: ExclusionRules::default(),
            extensions: ExtensionsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 从配置文件加载配置，文件不存在时使用默认值
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("无法创建配置目录: {}", parent.display()))?;
            }
        }

        let content = toml::to_string_pretty(self).context("无法序列化配置")?;

        fs::write(config_path, content)
            .with_context(|| format!("无法写入配置文件: {}", config_path.display()))?;

        Ok(())
    }

    /// 获取配置文件的默认路径 (程序所在目录下的 config.toml)
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("无法获取程序路径")?;

        let exe_dir = exe_path.parent().context("无法获取程序目录")?;

        Ok(exe_dir.join("config.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let groups = [
            ("git_dirs", &self.exclude.git_dirs),
            ("language_dirs", &self.exclude.language_dirs),
            ("source_dirs", &self.exclude.source_dirs),
        ];
        for (name, dirs) in groups {
            if dirs.iter().any(|d| d.trim().is_empty()) {
                anyhow::bail!("exclude.{} 不能包含空的目录名", name);
            }
        }

        if self
            .extensions
            .presets
            .iter()
            .any(|ext| ext.trim().trim_start_matches('.').is_empty())
        {
            anyhow::bail!("extensions.presets 不能包含空的扩展名");
        }

        Ok(())
    }
}
