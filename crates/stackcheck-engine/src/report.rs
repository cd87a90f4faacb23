//! Report rendering.
//!
//! Renders a [`RunReport`] as colorized human-readable text or as JSON for
//! scripting. Rendering is deterministic: categories alphabetical, probes
//! in discovery order within each category, so two runs against an
//! unchanged environment diff cleanly in CI logs.

use crate::executor::{ProbeOutcome, ProbeReport, RunReport};
use crossterm::style::{style, Color, Stylize};
use stackcheck_domain::{Bucket, Category, CheckStatus};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Icons for report rendering.
struct Icons {
    check: &'static str,
    cross: &'static str,
    info: &'static str,
    arrow: &'static str,
}

impl Icons {
    fn unicode() -> Self {
        Self {
            check: "✓",
            cross: "✗",
            info: "○",
            arrow: "↳",
        }
    }

    fn ascii() -> Self {
        Self {
            check: "[OK]",
            cross: "[!!]",
            info: "[--]",
            arrow: "->",
        }
    }
}

/// Trait for rendering run reports.
pub trait Renderer {
    /// Render the report to a string ready for stdout.
    fn render(&self, report: &RunReport) -> String;
}

/// Human-readable text renderer.
pub struct TextRenderer {
    /// Whether to emit ANSI colors.
    pub color: bool,
    /// Whether to use unicode glyphs.
    pub unicode: bool,
    /// Verbosity: 1 shows per-probe outcome and noise, 2 adds stderr.
    pub verbose: u8,
    /// Show each result's reproduction command.
    pub show_commands: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            color: true,
            unicode: true,
            verbose: 0,
            show_commands: false,
        }
    }
}

impl TextRenderer {
    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            style(text).with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn status_glyph<'a>(&self, status: CheckStatus, icons: &'a Icons) -> (&'a str, Color) {
        match status.bucket() {
            Bucket::Success => (icons.check, Color::Green),
            Bucket::Informational => (icons.info, Color::Cyan),
            Bucket::AttentionNeeded => (icons.cross, Color::Red),
        }
    }
}

impl Renderer for TextRenderer {
    fn render(&self, report: &RunReport) -> String {
        let icons = if self.unicode {
            Icons::unicode()
        } else {
            Icons::ascii()
        };
        let mut out = String::new();

        let _ = writeln!(out, "Configuration Verification");
        let _ = writeln!(
            out,
            "  Checks: {} ({} probes)",
            report.spec.checks_dir.display(),
            report.probes.len()
        );
        let _ = writeln!(out, "  Domain: {}", report.spec.publish_domain);
        let _ = writeln!(out, "  Suite:  {}", report.spec.short_digest());
        let _ = writeln!(out);

        for (category, probes) in by_category(report) {
            let _ = writeln!(out, "{}", self.paint(category.as_str(), Color::DarkGrey));

            for probe in probes {
                if self.verbose > 0 {
                    let outcome = match &probe.outcome {
                        ProbeOutcome::Completed { exit_code } => {
                            format!("completed, exit {exit_code}")
                        }
                        ProbeOutcome::TimedOut { after_secs } => {
                            format!("timed out after {after_secs}s")
                        }
                        ProbeOutcome::LaunchFailed { reason } => {
                            format!("launch failed: {reason}")
                        }
                    };
                    let line = format!("  [{}] {} ({}ms)", probe.name, outcome, probe.duration_ms);
                    let _ = writeln!(out, "{}", self.paint(&line, Color::DarkGrey));
                }

                for result in &probe.results {
                    let (glyph, color) = self.status_glyph(result.status, &icons);
                    let _ = writeln!(
                        out,
                        "  {} {} {} {}",
                        self.paint(glyph, color),
                        self.paint(&format!("{:<8}", result.status), color),
                        format_args!("{:<24}", result.check_name),
                        result.message,
                    );
                    if self.show_commands && !result.command.is_empty() {
                        let cmd = format!("      {} {}", icons.arrow, result.command);
                        let _ = writeln!(out, "{}", self.paint(&cmd, Color::DarkGrey));
                    }
                }

                if self.verbose > 0 {
                    for noise in &probe.noise {
                        let _ = writeln!(out, "      {}", self.paint(noise, Color::DarkGrey));
                    }
                }
                if self.verbose > 1 && !probe.stderr.is_empty() {
                    for line in probe.stderr.lines() {
                        let _ = writeln!(out, "      {}", self.paint(line, Color::DarkGrey));
                    }
                }
            }
            let _ = writeln!(out);
        }

        let malformed: Vec<(&ProbeReport, &crate::probe::Malformed)> = report
            .probes
            .iter()
            .flat_map(|p| p.malformed.iter().map(move |m| (p, m)))
            .collect();
        if !malformed.is_empty() {
            let header = format!("Malformed output ({}):", malformed.len());
            let _ = writeln!(out, "{}", self.paint(&header, Color::Yellow));
            for (probe, bad) in malformed {
                let detail = match &bad.error {
                    Some(e) => format!("{}: {}: {:?}", probe.name, e, bad.line),
                    None => format!("{}: {:?}", probe.name, bad.line),
                };
                let _ = writeln!(out, "  {} {}", self.paint(icons.cross, Color::Yellow), detail);
            }
            let _ = writeln!(out);
        }

        let summary = &report.summary;
        let _ = writeln!(
            out,
            "Summary: {} checks  {} ok  {} info  {} attention  ({} malformed)",
            summary.total,
            summary.success,
            summary.informational,
            summary.attention_needed,
            summary.malformed,
        );

        let gate = if summary.gate_passed() {
            self.paint(&format!("{} PASSED", icons.check), Color::Green)
        } else {
            self.paint(&format!("{} FAILED", icons.cross), Color::Red)
        };
        let _ = writeln!(out, "Gate: {} ({}ms)", gate, report.duration_ms);

        out
    }
}

/// JSON renderer for scripting and CI archival.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, report: &RunReport) -> String {
        let value = serde_json::json!({
            "run_id": report.run_id,
            "spec": report.spec,
            "started_at": report.started_at,
            "duration_ms": report.duration_ms,
            "gate_passed": report.summary.gate_passed(),
            "exit_code": report.exit_code(),
            "summary": report.summary,
            "probes": report.probes,
        });
        serde_json::to_string_pretty(&value).unwrap_or_default()
    }
}

/// Group probe reports by category (alphabetical), keeping discovery order
/// within each group.
fn by_category(report: &RunReport) -> BTreeMap<&Category, Vec<&ProbeReport>> {
    let mut map: BTreeMap<&Category, Vec<&ProbeReport>> = BTreeMap::new();
    for probe in &report.probes {
        map.entry(&probe.category).or_default().push(probe);
    }
    map
}
