use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{never, select, unbounded, Receiver};

use filesearch::application::{Config, SearchRequest, SearchSession, SessionUpdate};
use filesearch::domain::{SearchType, WorkerContext};
use filesearch::infrastructure::{ErrorLogger, Logger, LoggerTrait};
use filesearch::presentation::{help_text, parse_command, Command, OptionToggle, ResultsView};

/// 按文件名或文件内容搜索目录的工具
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 要搜索的内容 (省略且未指定 --list-ext 时进入交互模式)
    pattern: Option<String>,

    /// 要搜索的目录
    #[clap(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// 搜索类型: name, contents, xml
    #[clap(short = 't', long = "type")]
    search_type: Option<SearchType>,

    /// 区分大小写
    #[clap(short, long, overrides_with = "no_case_sensitive")]
    case_sensitive: bool,

    /// 不区分大小写 (覆盖配置文件)
    #[clap(long, overrides_with = "case_sensitive")]
    no_case_sensitive: bool,

    /// 包含 .git 目录
    #[clap(long, overrides_with = "exclude_git")]
    include_git: bool,

    /// 排除 .git 目录 (覆盖配置文件)
    #[clap(long, overrides_with = "include_git")]
    exclude_git: bool,

    /// 包含 Languages 目录
    #[clap(long, overrides_with = "exclude_languages")]
    include_languages: bool,

    /// 排除 Languages 目录 (覆盖配置文件)
    #[clap(long, overrides_with = "include_languages")]
    exclude_languages: bool,

    /// 包含 Source 目录
    #[clap(long, overrides_with = "exclude_source")]
    include_source: bool,

    /// 排除 Source 目录 (覆盖配置文件)
    #[clap(long, overrides_with = "include_source")]
    exclude_source: bool,

    /// 列举指定扩展名的文件名，而不是搜索
    #[clap(long, value_name = "EXT")]
    list_ext: Option<String>,

    /// 把结果保存到文本文件
    #[clap(short, long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// 配置文件路径 (默认为程序目录下的 config.toml)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 把默认配置写入配置文件后退出
    #[clap(long)]
    init_config: bool,

    /// 启用调试日志和错误日志
    #[clap(long)]
    log: bool,

    /// 不显示进度条
    #[clap(long)]
    no_progress: bool,
}

impl Args {
    /// 用命令行开关覆盖配置中的默认值，未给出的开关保持配置不变
    fn apply_to(&self, request: &mut SearchRequest) {
        if let Some(search_type) = self.search_type {
            request.search_type = search_type;
        }
        override_switch(&mut request.case_sensitive, self.case_sensitive, self.no_case_sensitive);
        override_switch(&mut request.include_git, self.include_git, self.exclude_git);
        override_switch(&mut request.include_languages, self.include_languages, self.exclude_languages);
        override_switch(&mut request.include_source, self.include_source, self.exclude_source);
    }
}

fn override_switch(slot: &mut bool, on: bool, off: bool) {
    if on {
        *slot = true;
    } else if off {
        *slot = false;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };

    if args.init_config {
        Config::default().save_to_file(&config_path)?;
        println!("已创建默认配置文件: {}", config_path.display());
        return Ok(());
    }

    let config = Config::load_or_default(&config_path)?;

    // 初始化日志记录器
    let log_enabled = args.log || config.logging.enabled;
    let logger = Arc::new(Logger::new(log_enabled, &config.logging.directory)?);
    let errors = Arc::new(ErrorLogger::new(log_enabled, &config.logging.directory)?);
    if logger.is_enabled() {
        println!("日志文件已创建: {}", logger.log_path().display());
        logger.log_message(&format!("配置文件: {}", config_path.display()))?;
    }

    let ctx = WorkerContext::new(logger.clone(), errors.clone(), config.exclude.clone());
    let show_progress = !args.no_progress && io::stderr().is_terminal();
    let mut view = ResultsView::new(show_progress);
    let mut session = SearchSession::new(config, ctx);

    let mut template = SearchRequest::from_config("", session.config());
    args.apply_to(&mut template);

    if args.pattern.is_some() || args.list_ext.is_some() {
        run_once(&args, &mut session, &mut view, template)?;
    } else {
        if let Some(dir) = &args.dir {
            session.select_folder(dir)?;
        }
        run_interactive(&mut session, &mut view, template)?;
    }

    logger.finalize(start_time.elapsed())?;
    errors.finalize()?;
    errors.print_error_summary();

    Ok(())
}

/// 执行一次搜索或扩展名列举
fn run_once(
    args: &Args,
    session: &mut SearchSession,
    view: &mut ResultsView,
    template: SearchRequest,
) -> Result<()> {
    let dir = args.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    session.select_folder(&dir)?;

    if let Some(extension) = &args.list_ext {
        session.list_extensions(extension)?;
    } else {
        let request = SearchRequest {
            text: args.pattern.clone().unwrap_or_default(),
            ..template
        };
        println!("在 {} 中搜索: {:?} ({})", dir.display(), request.text, request.search_type);
        session.start_search(request)?;
    }

    view.restart();
    session.wait(|update| view.show(update))?;

    if let Some(save_path) = &args.save {
        if session.save_results(save_path)? {
            println!("结果已保存到: {}", save_path.display());
        }
    }

    Ok(())
}

/// 在后台线程逐行读取标准输入
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// 交互模式：命令和工作线程通知在同一个循环里处理
fn run_interactive(
    session: &mut SearchSession,
    view: &mut ResultsView,
    mut template: SearchRequest,
) -> Result<()> {
    let input = spawn_stdin_reader();
    println!("{}", help_text(&session.config().extensions.presets));

    loop {
        let events = session.active_events().unwrap_or_else(never);
        select! {
            recv(input) -> line => match line {
                Ok(line) => {
                    if !handle_line(&line, session, view, &mut template)? {
                        session.stop();
                        break;
                    }
                }
                Err(_) => {
                    // 输入结束时等待当前任务完成
                    session.wait(|update| view.show(update))?;
                    break;
                }
            },
            recv(events) -> event => match event {
                Ok(event) => {
                    for update in session.handle_event(event) {
                        view.show(&update);
                    }
                }
                Err(_) => {
                    if let Some(outcome) = session.finish_active()? {
                        view.show(&SessionUpdate::Finished(outcome));
                    }
                }
            },
        }
    }

    Ok(())
}

/// 处理一行命令，返回 false 表示退出
fn handle_line(
    line: &str,
    session: &mut SearchSession,
    view: &mut ResultsView,
    template: &mut SearchRequest,
) -> Result<bool> {
    let command = match parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(message) => {
            eprintln!("{}", message);
            return Ok(true);
        }
    };

    match command {
        Command::Folder(path) => match session.select_folder(&path) {
            Ok(()) => println!("已选择目录: {}", path.display()),
            Err(err) => eprintln!("{}", err),
        },
        Command::Search(text) => {
            let request = SearchRequest {
                text,
                ..template.clone()
            };
            match session.start_search(request) {
                Ok(true) => view.restart(),
                Ok(false) => {}
                Err(err) => eprintln!("{:#}", err),
            }
        }
        Command::Stop => session.stop(),
        Command::Type(search_type) => {
            template.search_type = search_type;
            println!("搜索类型: {}", search_type);
        }
        Command::Toggle(toggle, value) => {
            let slot = match toggle {
                OptionToggle::CaseSensitive => &mut template.case_sensitive,
                OptionToggle::IncludeGit => &mut template.include_git,
                OptionToggle::IncludeLanguages => &mut template.include_languages,
                OptionToggle::IncludeSource => &mut template.include_source,
            };
            *slot = value;
        }
        Command::List(extension) => match session.list_extensions(&extension) {
            Ok(true) => view.restart(),
            Ok(false) => {}
            Err(err) => eprintln!("{:#}", err),
        },
        Command::Save(path) => match session.save_results(&path) {
            Ok(true) => println!("结果已保存到: {}", path.display()),
            Ok(false) => {}
            Err(err) => eprintln!("{:#}", err),
        },
        Command::Clear => session.clear_results(),
        Command::Show => println!("{}", session.results_text()),
        Command::Status => {
            let folder = session
                .selected_folder()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(未选择)".to_string());
            println!("目录: {}", folder);
            println!("搜索类型: {}", template.search_type);
            println!("区分大小写: {}", template.case_sensitive);
            println!(
                "包含 .git: {} | 包含 Languages: {} | 包含 Source: {}",
                template.include_git, template.include_languages, template.include_source
            );
            println!("进度: {}% {}", session.progress(), if session.is_running() { "(运行中)" } else { "" });
        }
        Command::Help => println!("{}", help_text(&session.config().extensions.presets)),
        Command::Quit => return Ok(false),
    }

    Ok(true)
}
