use std::fmt::Write as _;
use std::io::{self, Write};

use anyhow::Error;
use unicode_width::UnicodeWidthChar;

use crate::core::{Finding, PriorityTier, ResponseEnvelope};

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for engine details");
    let _ = writeln!(stderr, "  - see `bugbridge --help` for commands and options");
}

/// Plain-text rendering of an envelope: errors, or a findings table plus stats.
pub fn render_summary(envelope: &ResponseEnvelope) -> String {
    render_summary_with(envelope, false)
}

pub fn render_summary_with(envelope: &ResponseEnvelope, color: bool) -> String {
    let mut out = String::new();

    if !envelope.errors.is_empty() {
        for error in &envelope.errors {
            let _ = writeln!(out, "{}: {}", error.code, error.message);
        }
        return out;
    }

    if let Some(stats) = &envelope.stats {
        let _ = writeln!(
            out,
            "target: {}  targets={} findings={} classpath={} plugins={} ({} ms, engine {})",
            truncate_middle(&stats.target, 60),
            stats.target_count,
            stats.finding_count,
            stats.classpath_count,
            stats.plugin_count,
            stats.duration_ms,
            stats.engine_version
        );
    }

    if envelope.results.is_empty() {
        let _ = writeln!(out, "no findings");
        return out;
    }

    let _ = writeln!(out);
    write_findings_table(&mut out, &envelope.results, color);
    out
}

fn write_findings_table(out: &mut String, findings: &[Finding], color: bool) {
    let label_rank = "rank";
    let label_priority = "priority";
    let label_type = "type";
    let label_location = "location";

    let rank_w = visible_width(label_rank);
    let priority_w = visible_width(label_priority);
    let type_w = findings
        .iter()
        .map(|f| visible_width(&f.bug_type))
        .max()
        .unwrap_or(0)
        .max(visible_width(label_type));
    let location_w = findings
        .iter()
        .map(|f| visible_width(&location_of(f)))
        .max()
        .unwrap_or(0)
        .max(visible_width(label_location));

    let _ = writeln!(
        out,
        "{}  {}  {}  {}  message",
        pad_start(label_rank, rank_w),
        pad_end(label_priority, priority_w),
        pad_end(label_type, type_w),
        pad_end(label_location, location_w)
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}  -------",
        "-".repeat(rank_w),
        "-".repeat(priority_w),
        "-".repeat(type_w),
        "-".repeat(location_w)
    );

    for finding in findings {
        let priority = pad_end(&format_priority(finding.priority, color), priority_w);
        let _ = writeln!(
            out,
            "{}  {priority}  {}  {}  {}",
            pad_start(&finding.rank.to_string(), rank_w),
            pad_end(&finding.bug_type, type_w),
            pad_end(&location_of(finding), location_w),
            finding.message
        );
    }
}

fn location_of(finding: &Finding) -> String {
    let file = finding
        .full_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(if finding.real_source_path.is_empty() {
            &finding.source_file
        } else {
            &finding.real_source_path
        });
    format!("{}:{}", truncate_middle(file, 48), finding.start_line)
}

fn format_priority(priority: PriorityTier, color: bool) -> String {
    let s = priority.as_str();
    if !color {
        return s.to_string();
    }

    let code = match priority {
        PriorityTier::High => "31",
        PriorityTier::Medium => "33",
        PriorityTier::Low => "90",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s.chars().skip(len - right).collect();

    format!("{prefix}...{suffix}")
}

fn pad_end(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

/// Display width ignoring ANSI color sequences.
fn visible_width(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
