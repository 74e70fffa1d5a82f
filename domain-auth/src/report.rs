//! Report rendering for terminals and machines

use crate::authentication::{
    DkimKeyRecord, DmarcPolicyRecord, DomainAuthReport, RecordCheckResult, RecordKind, TagList,
};
use crate::error::Result;

/// Render a report as pretty-printed JSON
pub fn render_json(report: &DomainAuthReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render several reports as one JSON array
pub fn render_json_batch(reports: &[DomainAuthReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

/// Render a human-readable summary.
///
/// Output only depends on the report, so it can be compared against golden
/// text in tests.
pub fn render_text(report: &DomainAuthReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Email authentication for {} (DKIM selector: {})\n",
        report.domain,
        if report.selector.is_empty() { "<none>" } else { report.selector.as_str() }
    ));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for kind in [RecordKind::Dmarc, RecordKind::Dkim] {
        out.push('\n');
        render_result(&mut out, kind, report.result(kind));
    }

    out.push('\n');
    out.push_str(if report.is_fully_valid() {
        "Overall: PASS\n"
    } else {
        "Overall: FAIL\n"
    });
    out
}

fn render_result(out: &mut String, kind: RecordKind, result: &RecordCheckResult) {
    let status = if result.valid { "PASS" } else { "FAIL" };
    out.push_str(&format!("[{}] {}\n", kind, status));

    if !result.lookup_hostname.is_empty() {
        out.push_str(&format!("  Lookup:     {}\n", result.lookup_hostname));
    }
    if let Some(record) = &result.record {
        out.push_str(&format!("  Record:     {}\n", record));
    }
    if let Some(summary) = result.parsed.as_ref().and_then(|tags| summarize(kind, tags)) {
        out.push_str(&format!("  Summary:    {}\n", summary));
    }
    if let Some(error) = &result.error {
        out.push_str(&format!("  Error:      {}\n", error));
    }
    if let Some(suggestion) = &result.suggestion {
        out.push_str(&format!("  Suggestion: {}\n", suggestion));
    }
}

/// One-line description of a record that validated
fn summarize(kind: RecordKind, tags: &TagList) -> Option<String> {
    match kind {
        RecordKind::Dmarc => DmarcPolicyRecord::from_tags(tags).ok().map(|policy| {
            let mut line = format!("policy={} pct={}", policy.policy, policy.percentage);
            if let Some(sp) = policy.subdomain_policy {
                line.push_str(&format!(" subdomains={}", sp));
            }
            if !policy.aggregate_report_uris.is_empty() {
                line.push_str(&format!(" reports={}", policy.aggregate_report_uris.join(",")));
            }
            line
        }),
        RecordKind::Dkim => DkimKeyRecord::from_tags(tags).ok().map(|key| {
            let mut line = format!("key={} ({} bytes)", key.key_type, key.public_key_len);
            if key.testing {
                line.push_str(" testing");
            }
            line
        }),
    }
}
