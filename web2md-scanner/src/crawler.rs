use crate::convert::html_to_markdown;
use crate::error::{Result, ScanError};
use crate::filename::map_url_to_path;
use crate::media::{MediaFetcher, download_all};
use crate::page::{build_fragment, plan_page};
use crate::render::Renderer;
use crate::result::{CrawlSummary, PageOutcome, PageResult, TaskState};
use crate::scope::{CrawlConfig, CrawlScope, normalize_url};
use crate::session::CrawlSession;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(PageResult) + Send + Sync>;

/// Shared between workers. Popping a URL, checking it and marking it visited
/// all happen under one lock.
struct CrawlState {
    session: CrawlSession,
    stack: Vec<Url>,
    in_flight: usize,
}

/// Everything a worker needs to process a page.
struct WorkerContext {
    scope: CrawlScope,
    renderer: Arc<dyn Renderer>,
    fetcher: Arc<dyn MediaFetcher>,
    render_timeout: Duration,
    state: Mutex<CrawlState>,
}

/// One dispatched page moving through its lifecycle.
struct PageTask {
    url: Url,
    state: TaskState,
}

impl PageTask {
    fn new(url: Url) -> Self {
        Self {
            url,
            state: TaskState::Pending,
        }
    }

    fn advance(&mut self, next: TaskState) {
        debug_assert!(!self.state.is_terminal(), "{:?} is terminal", self.state);
        debug!(url = %self.url, from = ?self.state, to = ?next, "Page state");
        self.state = next;
    }
}

pub struct Crawler {
    config: CrawlConfig,
    renderer: Arc<dyn Renderer>,
    fetcher: Arc<dyn MediaFetcher>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    pub fn new(
        config: CrawlConfig,
        renderer: Arc<dyn Renderer>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config,
            renderer,
            fetcher,
            progress_callback: None,
            result_callback: None,
        }
    }

    /// Called with `(worker_id, url)` whenever a worker picks up a page.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Called once per dispatched page with its final record.
    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    /// Crawl everything reachable from `target` that stays inside its scope.
    ///
    /// With a single worker pages are visited depth-first with children in
    /// sorted order. Per-page failures are recorded in the summary; only
    /// setup problems and worker panics surface as `Err`.
    pub async fn crawl(&self, target: &Url) -> Result<CrawlSummary> {
        let scope = CrawlScope::new(target, &self.config)?;
        let workers = self.config.workers.max(1);
        info!(
            "Starting crawl of {} (scope {}) with {} workers",
            target,
            scope.base_url(),
            workers
        );

        let start = normalize_url(target);
        if !scope.admits(&start) {
            warn!(
                "Target {} is outside the crawl limits (max depth {}), nothing to do",
                start,
                scope.max_depth()
            );
        }

        let ctx = Arc::new(WorkerContext {
            scope,
            renderer: self.renderer.clone(),
            fetcher: self.fetcher.clone(),
            render_timeout: self.config.render_timeout,
            state: Mutex::new(CrawlState {
                session: CrawlSession::new(),
                stack: vec![start],
                in_flight: 0,
            }),
        });
        let results: Arc<Mutex<Vec<PageResult>>> = Arc::new(Mutex::new(Vec::new()));

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let ctx = ctx.clone();
            let results = results.clone();
            let progress_cb = self.progress_callback.clone();
            let result_cb = self.result_callback.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    let work_item = {
                        let mut state = ctx.state.lock().await;
                        if state.session.count_reached(&ctx.scope) {
                            state.stack.clear();
                        }

                        let mut next = None;
                        while let Some(url) = state.stack.pop() {
                            if let Some(depth) = state.session.try_dispatch(&url, &ctx.scope) {
                                state.in_flight += 1;
                                next = Some((url, depth));
                                break;
                            }
                        }

                        match next {
                            Some(item) => Some(item),
                            None if state.in_flight == 0 => break,
                            None => None,
                        }
                    };

                    let Some((url, depth)) = work_item else {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        continue;
                    };

                    if let Some(ref callback) = progress_cb {
                        callback(worker_id, url.to_string());
                    }

                    let (page_result, children) = Self::process_page(&ctx, url, depth).await;

                    {
                        let mut state = ctx.state.lock().await;
                        state.in_flight -= 1;
                        if !state.session.count_reached(&ctx.scope) {
                            // reversed so the smallest child is popped first
                            for child in children.into_iter().rev() {
                                if state.session.is_admissible(&child, &ctx.scope) {
                                    state.stack.push(child);
                                }
                            }
                        }
                    }

                    if let Some(ref callback) = result_cb {
                        callback(page_result.clone());
                    }
                    results.lock().await.push(page_result);
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            handle.await?;
        }

        let pages = std::mem::take(&mut *results.lock().await);
        let saved = ctx.state.lock().await.session.saved_count();
        info!(
            "Crawl complete. Dispatched {} pages, saved {}",
            pages.len(),
            saved
        );

        Ok(CrawlSummary {
            target: target.to_string(),
            base_url: ctx.scope.base_url().to_string(),
            output_root: ctx.scope.output_root().to_path_buf(),
            saved,
            pages,
        })
    }

    /// Render, extract and persist one page. Returns the page record and the
    /// links discovered on it; links are reported even when the page is
    /// skipped or fails to save. Only a failed render drops them.
    async fn process_page(ctx: &WorkerContext, url: Url, depth: usize) -> (PageResult, Vec<Url>) {
        let started = Instant::now();
        let mut task = PageTask::new(url);
        let mut result = PageResult::new(task.url.to_string(), depth);

        task.advance(TaskState::Fetching);
        let rendered = match tokio::time::timeout(
            ctx.render_timeout,
            ctx.renderer.render(&task.url),
        )
        .await
        {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return Self::fail(task, result, started, e),
            Err(_) => {
                let e = ScanError::RenderTimeout {
                    url: task.url.to_string(),
                    secs: ctx.render_timeout.as_secs(),
                };
                return Self::fail(task, result, started, e);
            }
        };
        result.final_url = Some(rendered.final_url.to_string());

        task.advance(TaskState::Extracting);
        let page_path = map_url_to_path(&task.url, &ctx.scope);
        let plan = plan_page(
            &rendered.html,
            &rendered.base_uri,
            &page_path,
            ctx.scope.media(),
        );
        result.links_found = plan.links.iter().map(Url::to_string).collect();
        let children = plan.links;

        if ctx.state.lock().await.session.count_reached(&ctx.scope) {
            result.outcome = PageOutcome::SkippedLimit;
            result.elapsed = started.elapsed();
            return (result, Vec::new());
        }

        let media = download_all(ctx.fetcher.as_ref(), &plan.media, ctx.scope.media()).await;
        result.media_saved = media.downloaded;

        let markdown = build_fragment(
            &rendered.html,
            &rendered.base_uri,
            &page_path,
            &ctx.scope,
            &media.map,
        )
        .and_then(|fragment| html_to_markdown(&fragment));

        let Some(markdown) = markdown else {
            debug!(url = %task.url, "No content left after extraction");
            task.advance(TaskState::SkippedEmpty);
            result.outcome = PageOutcome::SkippedEmpty;
            result.elapsed = started.elapsed();
            return (result, children);
        };

        if !ctx.state.lock().await.session.reserve_save(&ctx.scope) {
            debug!(url = %task.url, "Page budget exhausted, not saving");
            result.outcome = PageOutcome::SkippedLimit;
            result.elapsed = started.elapsed();
            return (result, Vec::new());
        }

        task.advance(TaskState::Saving);
        match write_page(&page_path, &markdown).await {
            Ok(()) => {
                ctx.state.lock().await.session.commit_save();
                info!("Saved {} -> {}", task.url, page_path.display());
                task.advance(TaskState::Saved);
                result.outcome = PageOutcome::Saved;
                result.output_path = Some(page_path);
                result.elapsed = started.elapsed();
                (result, children)
            }
            Err(e) => {
                ctx.state.lock().await.session.release_save();
                let (result, _) = Self::fail(task, result, started, e);
                // links were discovered before saving, so the crawl still follows them
                (result, children)
            }
        }
    }

    fn fail(
        mut task: PageTask,
        mut result: PageResult,
        started: Instant,
        error: ScanError,
    ) -> (PageResult, Vec<Url>) {
        warn!("Crawl error for {}: {}", task.url, error);
        task.advance(TaskState::Failed);
        result.outcome = PageOutcome::Failed;
        result.error = Some(error.to_string());
        result.elapsed = started.elapsed();
        (result, Vec::new())
    }
}

async fn write_page(path: &Path, markdown: &str) -> Result<()> {
    let persist = |source| ScanError::Persist {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(persist)?;
    }
    tokio::fs::write(path, markdown).await.map_err(persist)
}
