use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};

use crate::application::Config;
use crate::domain::{
    ExtensionLister, SearchError, SearchOptions, SearchType, SearchWorker, WorkerContext, WorkerEvent,
    WorkerHandle, WorkerOutcome,
};
use crate::infrastructure::save_results;

/// 用户在界面上填写的一次搜索请求 (不含目录)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub include_git: bool,
    pub include_languages: bool,
    pub include_source: bool,
}

impl SearchRequest {
    /// 用配置中的默认开关创建请求
    pub fn from_config(text: impl Into<String>, config: &Config) -> Self {
        let search = &config.search;
        Self {
            text: text.into(),
            search_type: search.search_type,
            case_sensitive: search.case_sensitive,
            include_git: search.include_git,
            include_languages: search.include_languages,
            include_source: search.include_source,
        }
    }

    pub fn into_options(self, root_folder: &Path) -> SearchOptions {
        SearchOptions {
            root_folder: root_folder.to_path_buf(),
            search_text: self.text,
            search_type: self.search_type,
            case_sensitive: self.case_sensitive,
            include_git: self.include_git,
            include_languages: self.include_languages,
            include_source: self.include_source,
        }
    }
}

/// 会话向界面报告的变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// 结果区追加一行
    Line(String),
    /// 进度条数值
    Progress(u8),
    /// 工作线程结束，进度条归零
    Finished(WorkerOutcome),
}

/// 搜索会话：选中的目录、最多一个活动工作线程、结果文本和进度
pub struct SearchSession {
    config: Config,
    ctx: WorkerContext,
    selected_folder: Option<PathBuf>,
    active: Option<WorkerHandle>,
    results: Vec<String>,
    progress: u8,
}

impl SearchSession {
    pub fn new(config: Config, ctx: WorkerContext) -> Self {
        Self {
            config,
            ctx,
            selected_folder: None,
            active: None,
            results: Vec::new(),
            progress: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 选择搜索目录
    pub fn select_folder(&mut self, folder: impl Into<PathBuf>) -> Result<()> {
        let folder = folder.into();
        SearchError::check_root(&folder)?;
        self.selected_folder = Some(folder);
        Ok(())
    }

    pub fn selected_folder(&self) -> Option<&Path> {
        self.selected_folder.as_deref()
    }

    /// 开始搜索
    ///
    /// 未选择目录时什么也不做，返回 false。已有的工作线程会被取消。
    pub fn start_search(&mut self, request: SearchRequest) -> Result<bool> {
        let folder = match &self.selected_folder {
            Some(folder) => folder.clone(),
            None => return Ok(false),
        };

        self.replace_active();
        self.clear_results();

        let options = request.into_options(&folder);
        let handle = SearchWorker::spawn(options, self.ctx.clone()).context("无法开始搜索")?;
        self.active = Some(handle);
        Ok(true)
    }

    /// 列举指定扩展名的文件名
    ///
    /// 未选择目录时什么也不做，返回 false。
    pub fn list_extensions(&mut self, extension: &str) -> Result<bool> {
        let folder = match &self.selected_folder {
            Some(folder) => folder.clone(),
            None => return Ok(false),
        };

        self.replace_active();
        self.clear_results();

        let handle = ExtensionLister::spawn(folder, extension, self.ctx.clone())
            .context("无法开始列举扩展名")?;
        self.active = Some(handle);
        Ok(true)
    }

    /// 请求停止当前工作线程
    pub fn stop(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// 当前工作线程的通知接收端
    pub fn active_events(&self) -> Option<Receiver<WorkerEvent>> {
        self.active.as_ref().map(|handle| handle.events().clone())
    }

    /// 把一条通知应用到会话状态
    pub fn handle_event(&mut self, event: WorkerEvent) -> Vec<SessionUpdate> {
        match event {
            WorkerEvent::Result(result) => {
                let line = result.to_string();
                self.results.push(line.clone());
                vec![SessionUpdate::Line(line)]
            }
            WorkerEvent::Progress(progress) => {
                self.progress = progress;
                vec![SessionUpdate::Progress(progress)]
            }
            WorkerEvent::Listing(listing) => listing
                .to_lines()
                .into_iter()
                .map(|line| {
                    self.results.push(line.clone());
                    SessionUpdate::Line(line)
                })
                .collect(),
        }
    }

    /// 回收已结束的工作线程
    pub fn finish_active(&mut self) -> Result<Option<WorkerOutcome>> {
        let handle = match self.active.take() {
            Some(handle) => handle,
            None => return Ok(None),
        };
        self.progress = 0;
        let outcome = handle.join()?;
        Ok(Some(outcome))
    }

    /// 非阻塞地取出所有已到达的通知
    pub fn poll(&mut self) -> Result<Vec<SessionUpdate>> {
        let mut updates = Vec::new();
        let Some(events) = self.active_events() else {
            return Ok(updates);
        };

        loop {
            match events.try_recv() {
                Ok(event) => updates.extend(self.handle_event(event)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if let Some(outcome) = self.finish_active()? {
                        updates.push(SessionUpdate::Finished(outcome));
                    }
                    break;
                }
            }
        }

        Ok(updates)
    }

    /// 阻塞直到当前工作线程结束
    pub fn wait<F>(&mut self, mut on_update: F) -> Result<Option<WorkerOutcome>>
    where
        F: FnMut(&SessionUpdate),
    {
        let Some(events) = self.active_events() else {
            return Ok(None);
        };

        for event in events.iter() {
            for update in self.handle_event(event) {
                on_update(&update);
            }
        }

        let outcome = self.finish_active()?;
        if let Some(outcome) = outcome {
            on_update(&SessionUpdate::Finished(outcome));
        }
        Ok(outcome)
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn results(&self) -> &[String] {
        &self.results
    }

    /// 结果区的完整文本，每条结果一行
    pub fn results_text(&self) -> String {
        self.results.join("\n")
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    /// 保存结果到文本文件，没有结果时不写文件
    pub fn save_results(&self, path: &Path) -> Result<bool> {
        save_results(path, &self.results_text())
    }

    fn replace_active(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.cancel();
        }
        self.progress = 0;
    }
}
