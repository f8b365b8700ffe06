//! Units of crawl work

use std::fmt;
use url::Url;

/// The two kinds of page the crawler visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    List,
    Detail,
}

impl TaskKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Detail => "detail",
        }
    }
}

/// What a task fetches; the variant fixes the task kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskTarget {
    /// Index of a page of the paginated list
    ListPage(u32),

    /// Absolute URL of an item's page
    DetailPage(Url),
}

/// One unit of work on the task queue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTask {
    pub target: TaskTarget,

    /// Number of times this task has been requeued after a transient failure
    pub retry_count: u32,
}

impl CrawlTask {
    pub fn list(page: u32) -> Self {
        Self {
            target: TaskTarget::ListPage(page),
            retry_count: 0,
        }
    }

    pub fn detail(url: Url) -> Self {
        Self {
            target: TaskTarget::DetailPage(url),
            retry_count: 0,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self.target {
            TaskTarget::ListPage(_) => TaskKind::List,
            TaskTarget::DetailPage(_) => TaskKind::Detail,
        }
    }

    /// The same task with its retry count bumped
    pub fn retried(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }

    /// Page index or URL, as written to logs and the dead-letter table
    pub fn target_string(&self) -> String {
        match &self.target {
            TaskTarget::ListPage(page) => page.to_string(),
            TaskTarget::DetailPage(url) => url.to_string(),
        }
    }
}

impl fmt::Display for CrawlTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            TaskTarget::ListPage(page) => write!(f, "list page {}", page)?,
            TaskTarget::DetailPage(url) => write!(f, "detail page {}", url)?,
        }
        if self.retry_count > 0 {
            write!(f, " (retry {})", self.retry_count)?;
        }
        Ok(())
    }
}
