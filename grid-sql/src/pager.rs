//! Paging coordinator: runs the counting and paging queries for a request and
//! assembles the page envelope.

use crate::config::EngineConfig;
use crate::exec::{ExecError, FromRow, Row, SqlExecutor, with_timeout};
use crate::filter::{Composer, ValidationError};
use crate::pagination::{PageEnvelope, PageRequest};
use crate::table::TableDescriptor;
use crate::template::{PageWindow, Template};
use crate::types::QueryResult;
use thiserror::Error;
use tracing::debug;

/// Errors from serving a list request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PagingError {
    /// The request could not be composed into SQL.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A query failed or timed out.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The queries a request resolves to, before execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PagePlan {
    /// Count then fetch one window.
    Paged {
        window: PageWindow,
        count: QueryResult,
        rows: QueryResult,
    },
    /// Fetch every matching row.
    Unpaged { rows: QueryResult },
}

impl PagePlan {
    /// Resolve the window and render the queries for `request`.
    ///
    /// Planning needs no connection; [`PagingCoordinator::fetch_page`] runs
    /// the plan it gets from here.
    pub fn new(
        config: &EngineConfig,
        table: &TableDescriptor,
        request: &PageRequest,
    ) -> Result<Self, ValidationError> {
        let composer = Composer::new(table);
        let template = Template::new(config.dialect, table);

        if !request.paging {
            let clauses = composer.compose(request, None)?;
            return Ok(Self::Unpaged {
                rows: template.render(&clauses),
            });
        }

        let window = PageWindow::new(request.skip, config.effective_take(request.take));
        let clauses = composer.compose(request, Some(window))?;
        Ok(Self::Paged {
            window,
            count: template.render_counting(&clauses, table.grouped()),
            rows: template.render_paging(&clauses),
        })
    }
}

/// Serves list requests against one executor and configuration.
///
/// Holds only borrowed, shared state; one coordinator can serve any number of
/// tables and requests.
#[derive(Debug)]
pub struct PagingCoordinator<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    config: &'a EngineConfig,
}

impl<'a, E: SqlExecutor + ?Sized> PagingCoordinator<'a, E> {
    /// Create a coordinator.
    pub const fn new(executor: &'a E, config: &'a EngineConfig) -> Self {
        Self { executor, config }
    }

    /// Serve one list request.
    ///
    /// Paged requests run the counting query first; when it reports no rows
    /// the paging query is skipped. Every query runs under the configured
    /// timeout.
    pub async fn fetch_page<T: FromRow>(
        &self,
        table: &TableDescriptor,
        request: &PageRequest,
    ) -> Result<PageEnvelope<T>, PagingError> {
        let timeout = self.config.query_timeout;

        match PagePlan::new(self.config, table, request)? {
            PagePlan::Unpaged { rows } => {
                let rows = with_timeout(timeout, self.executor.fetch_all(&rows)).await?;
                let subset = decode(&rows)?;
                debug!(table = table.name(), rows = subset.len(), "served unpaged list");
                Ok(PageEnvelope::unpaged(subset))
            },
            PagePlan::Paged {
                window,
                count,
                rows,
            } => {
                let total = with_timeout(timeout, self.executor.fetch_scalar(&count)).await?;
                let total = u64::try_from(total).unwrap_or(0);
                if total == 0 {
                    return Ok(PageEnvelope::empty(window.skip, window.take));
                }

                let rows = with_timeout(timeout, self.executor.fetch_all(&rows)).await?;
                let subset = decode(&rows)?;
                debug!(
                    table = table.name(),
                    total,
                    skip = window.skip,
                    take = window.take,
                    rows = subset.len(),
                    "served page"
                );
                Ok(PageEnvelope::new(subset, total, window.skip, window.take))
            },
        }
    }
}

fn decode<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, ExecError> {
    rows.iter().map(T::from_row).collect()
}
