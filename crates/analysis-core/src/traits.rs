use std::sync::Arc;

use async_trait::async_trait;

use crate::{AnalysisError, LineItem, StatementRequest};

/// Source of financial statement line items for one (company, year, report, consolidation)
/// combination.
///
/// An empty list means the filer published nothing for that combination. Implementations
/// must not retry on behalf of the caller; the orchestrator treats an error exactly like an
/// empty response and moves on to the next combination.
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError>;
}

#[async_trait]
impl<T: StatementSource + ?Sized> StatementSource for Arc<T> {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        (**self).fetch_statements(request).await
    }
}
