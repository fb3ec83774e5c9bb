//! Console rendering of API responses.
//!
//! Citation titles and page ranges are printed exactly as the API returned
//! them; missing fields print as `Unknown Document` / `NA`.

use crate::api::MessagesResponse;
use crate::output::AskOutput;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 80;

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

/// Render one response: text, citations, then token usage.
pub fn format_response(response: &MessagesResponse) -> String {
    let mut out = String::new();
    let eq = rule('=');

    let _ = writeln!(out, "{eq}");
    let _ = writeln!(out, "BATCH QUERY RESPONSES");
    let _ = writeln!(out, "{eq}");
    write_body(&mut out, response);

    let _ = writeln!(out, "\n{eq}");
    write_usage(&mut out, response);
    let _ = writeln!(out, "{eq}");
    out
}

fn write_body(out: &mut String, response: &MessagesResponse) {
    for item in &response.content {
        let _ = writeln!(out, "{}", item.text.as_deref().unwrap_or(""));
        for c in &item.citations {
            let _ = writeln!(
                out,
                "  [Cited from: {}, Pages: {}]",
                c.title_or_unknown(),
                c.page_range()
            );
        }
    }
}

fn write_usage(out: &mut String, response: &MessagesResponse) {
    let usage = response.usage.as_ref();
    let show = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "NA".into());
    let _ = writeln!(out, "TOKEN USAGE SUMMARY:");
    let _ = writeln!(out, "  Input Tokens: {}", show(usage.and_then(|u| u.input_tokens)));
    let _ = writeln!(out, "  Output Tokens: {}", show(usage.and_then(|u| u.output_tokens)));
}

/// Render a whole batch: one section per document, then the summary.
pub fn format_ask_output(output: &AskOutput) -> String {
    let mut out = String::new();
    let eq = rule('=');
    let dash = rule('-');

    let _ = writeln!(out, "{eq}");
    let _ = writeln!(
        out,
        "BATCH QUERY RESPONSES ({}/{} documents answered)",
        output.stats.succeeded, output.stats.total_documents
    );
    let _ = writeln!(out, "{eq}");

    for answer in &output.answers {
        let _ = writeln!(out, "{dash}");
        let _ = writeln!(out, "[{}] {}", answer.index + 1, answer.title);
        let _ = writeln!(out, "{dash}");
        match (&answer.response, &answer.error) {
            (_, Some(err)) => {
                let _ = writeln!(out, "{err}");
            }
            (Some(resp), None) => write_body(&mut out, resp),
            (None, None) => {
                let _ = writeln!(out, "(no response)");
            }
        }
    }

    if let Some(ref summary) = output.summary {
        let _ = writeln!(out, "\n{eq}");
        let _ = writeln!(out, "CONSOLIDATED ANSWER");
        let _ = writeln!(out, "{eq}");
        write_body(&mut out, summary);
    } else if let Some(ref err) = output.summary_error {
        let _ = writeln!(out, "\nSummary failed: {err}");
    }

    let _ = writeln!(out, "\n{eq}");
    let _ = writeln!(out, "TOKEN USAGE SUMMARY:");
    let _ = writeln!(out, "  Input Tokens: {}", output.stats.total_input_tokens);
    let _ = writeln!(out, "  Output Tokens: {}", output.stats.total_output_tokens);
    let _ = writeln!(out, "{eq}");
    out
}
