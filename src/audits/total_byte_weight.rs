//! Total network payload of the page, scored on a log-normal curve

use async_trait::async_trait;
use serde_json::{json, Value};

use super::statistics::log_normal_score;
use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;
use crate::computed::{NetworkRecords, NetworkRecordsInput};
use crate::models::{GatherMode, ScoreDisplayMode};

/// 2667 KiB
const DEFAULT_P10: f64 = 2_731_008.0;
/// 4000 KiB
const DEFAULT_MEDIAN: f64 = 4_096_000.0;
/// Largest requests listed in details
const MAX_ITEMS: usize = 10;

pub struct TotalByteWeightAudit {
    meta: AuditMeta,
}

impl TotalByteWeightAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "total-byte-weight",
                "Avoids enormous network payloads",
                "Large network payloads cost users real money and are highly correlated with \
                 long load times.",
            )
            .failure_title("Avoid enormous network payloads")
            .requires(&["DevtoolsLog"])
            .display_mode(ScoreDisplayMode::Numeric)
            .modes(&[GatherMode::Navigation, GatherMode::Timespan]),
        }
    }
}

impl Default for TotalByteWeightAudit {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn kib(bytes: u64) -> String {
    format!("{:.0}", bytes as f64 / 1024.0)
}

#[async_trait]
impl Audit for TotalByteWeightAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    fn default_options(&self) -> Value {
        json!({ "p10": DEFAULT_P10, "median": DEFAULT_MEDIAN })
    }

    async fn audit(&self, artifacts: &Artifacts, ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let input = NetworkRecordsInput::from_artifacts(artifacts)?;
        let records = ctx.computed.request(&NetworkRecords, &input).await?;

        let mut counted: Vec<_> = records
            .iter()
            .filter(|r| !r.is_non_network() && r.transfer_size > 0)
            .collect();
        let total: u64 = counted.iter().map(|r| r.transfer_size).sum();

        let p10 = ctx.option_or("p10", DEFAULT_P10);
        let median = ctx.option_or("median", DEFAULT_MEDIAN);
        let score = log_normal_score(p10, median, total as f64)?;

        counted.sort_by(|a, b| b.transfer_size.cmp(&a.transfer_size));
        let items: Vec<Value> = counted
            .iter()
            .take(MAX_ITEMS)
            .map(|r| json!({ "url": r.url, "totalBytes": r.transfer_size }))
            .collect();

        Ok(AuditProduct::new(score)
            .with_numeric(total as f64, "byte")
            .with_display_value(format!("Total size was {} KiB", kib(total)))
            .with_details(json!({
                "type": "table",
                "headings": [
                    { "key": "url", "valueType": "url", "label": "URL" },
                    { "key": "totalBytes", "valueType": "bytes", "label": "Transfer Size" }
                ],
                "items": items,
            })))
    }
}
