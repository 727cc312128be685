//! Wire types for `fnlttSinglAcntAll.json` (full financial statements of one company).

use analysis_core::{AnalysisError, LineItem, StatementType, Term};
use serde::Deserialize;

pub const STATUS_OK: &str = "000";
/// "No data found": the filer has nothing for the requested combination
pub const STATUS_NO_DATA: &str = "013";

#[derive(Debug, Deserialize)]
pub struct StatementResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list: Vec<StatementRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementRow {
    #[serde(default)]
    pub sj_div: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub account_nm: String,
    pub thstrm_amount: Option<String>,
    pub frmtrm_amount: Option<String>,
    pub bfefrmtrm_amount: Option<String>,
}

impl StatementRow {
    /// `None` for statement types the scorer does not read (e.g. `SCE`)
    pub fn into_line_item(self) -> Option<LineItem> {
        let statement = StatementType::from_code(self.sj_div.trim())?;
        let mut item = LineItem::new(statement, self.account_id, self.account_nm);

        let columns = [
            (Term::Current, self.thstrm_amount),
            (Term::Prior, self.frmtrm_amount),
            (Term::BeforePrior, self.bfefrmtrm_amount),
        ];
        for (term, amount) in columns {
            if let Some(raw) = amount {
                item = item.with_amount(term, raw);
            }
        }
        Some(item)
    }
}

impl StatementResponse {
    /// Typed line items. `013` maps to an empty list, any other non-`000` status to
    /// [`AnalysisError::Status`].
    pub fn into_line_items(self) -> Result<Vec<LineItem>, AnalysisError> {
        match self.status.as_str() {
            STATUS_OK => Ok(self
                .list
                .into_iter()
                .filter_map(StatementRow::into_line_item)
                .collect()),
            STATUS_NO_DATA => Ok(Vec::new()),
            _ => Err(AnalysisError::Status {
                code: self.status,
                message: self.message,
            }),
        }
    }
}

pub fn parse_statements(body: &str) -> Result<Vec<LineItem>, AnalysisError> {
    let response: StatementResponse = serde_json::from_str(body)?;
    response.into_line_items()
}
