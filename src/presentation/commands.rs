use std::path::PathBuf;

use crate::domain::SearchType;

/// 交互模式下的命令，对应原窗口上的各个按钮和选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 选择目录
    Folder(PathBuf),
    /// 开始搜索
    Search(String),
    /// 停止当前搜索
    Stop,
    /// 切换搜索类型
    Type(SearchType),
    /// 设置开关
    Toggle(OptionToggle, bool),
    /// 列举扩展名
    List(String),
    /// 保存结果
    Save(PathBuf),
    /// 清空结果
    Clear,
    /// 输出当前结果
    Show,
    /// 输出当前选项
    Status,
    Help,
    Quit,
}

/// 可开关的搜索选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionToggle {
    CaseSensitive,
    IncludeGit,
    IncludeLanguages,
    IncludeSource,
}

/// 解析一行输入，空行返回 `Ok(None)`
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "folder" | "cd" => Command::Folder(PathBuf::from(required(rest, "folder <目录>")?)),
        // 搜索内容保留原样，允许为空
        "search" | "s" => Command::Search(rest.to_string()),
        "stop" => Command::Stop,
        "type" => Command::Type(required(rest, "type <name|contents|xml>")?.parse()?),
        "case" => Command::Toggle(OptionToggle::CaseSensitive, parse_switch(rest)?),
        "git" => Command::Toggle(OptionToggle::IncludeGit, parse_switch(rest)?),
        "languages" => Command::Toggle(OptionToggle::IncludeLanguages, parse_switch(rest)?),
        "source" => Command::Toggle(OptionToggle::IncludeSource, parse_switch(rest)?),
        "list" => Command::List(required(rest, "list <扩展名>")?.to_string()),
        "save" => Command::Save(PathBuf::from(required(rest, "save <文件>")?)),
        "clear" => Command::Clear,
        "show" => Command::Show,
        "status" | "options" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("未知命令: {} (输入 help 查看帮助)", other)),
    };

    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("用法: {}", usage))
    } else {
        Ok(rest)
    }
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        _ => Err("开关只能是 on 或 off".to_string()),
    }
}

/// 交互模式帮助文本
pub fn help_text(presets: &[String]) -> String {
    let types = SearchType::ALL
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(" / ");
    format!(
        "命令:\n\
         \x20 folder <目录>              选择搜索目录\n\
         \x20 search <内容>              开始搜索 (会取消正在进行的搜索)\n\
         \x20 stop                       停止当前搜索\n\
         \x20 type <name|contents|xml>   搜索类型: {}\n\
         \x20 case|git|languages|source <on|off>  区分大小写 / 包含 .git、Languages、Source 目录\n\
         \x20 list <扩展名>              列举扩展名 (预设: {})\n\
         \x20 save <文件>                保存结果到文本文件\n\
         \x20 clear | show | status      清空结果 / 显示结果 / 显示选项\n\
         \x20 quit                       退出",
        types,
        presets.join(", ")
    )
}
