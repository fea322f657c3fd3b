//! Console output for `lra run`. Everything here is plain stdout text.

use lra_core::SessionKind;
use lra_scheduler::{WaitSource, format_wait_time};
use lra_session::{BackendEvent, ProgressSummary, read_progress};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::orchestrator::{LoopEvent, LoopObserver, LoopSummary, Termination};

const RULE_WIDTH: usize = 70;
const TOOL_INPUT_PREVIEW_CHARS: usize = 200;
const TOOL_ERROR_PREVIEW_CHARS: usize = 500;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

fn banner(title: &str) -> String {
    format!("{}\n  {title}\n{}", rule('='), rule('='))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Text to print for one backend event.
pub fn render_event(event: &BackendEvent) -> String {
    match event {
        BackendEvent::AssistantText(text) => text.clone(),
        BackendEvent::ToolUse { name, input } => format!(
            "\n[Tool: {name}]\n   Input: {}\n",
            truncate_chars(&input.to_string(), TOOL_INPUT_PREVIEW_CHARS)
        ),
        BackendEvent::ToolResult { content, is_error } => {
            if content.to_lowercase().contains("blocked") {
                format!("   [BLOCKED] {content}\n")
            } else if *is_error {
                format!(
                    "   [Error] {}\n",
                    truncate_chars(content, TOOL_ERROR_PREVIEW_CHARS)
                )
            } else {
                "   [Done]\n".to_string()
            }
        }
    }
}

/// Stream one event to stdout.
pub fn print_event(event: &BackendEvent) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(render_event(event).as_bytes());
    let _ = out.flush();
}

pub fn format_progress(summary: &ProgressSummary) -> String {
    format!(
        "Progress: {}/{} tests passing ({:.1}%)",
        summary.passing,
        summary.total,
        summary.percent()
    )
}

pub fn print_progress(project_dir: &Path) {
    if let Some(summary) = read_progress(project_dir) {
        println!("{}", format_progress(&summary));
    }
}

/// What the run header needs to know.
pub struct RunHeader<'a> {
    pub project_dir: &'a Path,
    pub planning_model: &'a str,
    pub coding_model: &'a str,
    pub max_iterations: Option<u32>,
    pub fresh: bool,
}

pub fn print_run_header(header: &RunHeader<'_>) {
    println!("\n{}", banner("AUTONOMOUS CODING AGENT"));
    println!("\nProject directory: {}", header.project_dir.display());
    if header.planning_model != header.coding_model {
        println!("\nHybrid mode:");
        println!("   Planning model:  {}", header.planning_model);
        println!("   Coding model:    {}", header.coding_model);
    } else {
        println!("Model: {}", header.coding_model);
    }
    match header.max_iterations {
        Some(max) => println!("Max iterations: {max}"),
        None => println!("Max iterations: Unlimited (will run until completion)"),
    }
    println!("Rate limit handling: enabled (waits and resumes automatically)\n");

    if header.fresh {
        println!("Fresh start - will use initializer agent\n");
        println!("{}", rule('='));
        println!("  NOTE: The first session can take a long time while the");
        println!("  feature list is generated. Watch for [Tool: ...] output.");
        println!("{}\n", rule('='));
    } else {
        println!("Continuing existing project");
        print_progress(header.project_dir);
    }
}

/// Prints loop progress and the final summary.
pub struct ConsoleReporter {
    project_dir: PathBuf,
    planning_model: String,
    hybrid: bool,
}

impl ConsoleReporter {
    pub fn new(project_dir: &Path, planning_model: &str, hybrid: bool) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            planning_model: planning_model.to_string(),
            hybrid,
        }
    }

    pub fn print_final_summary(&self, summary: &LoopSummary) {
        println!("\n{}", banner("SESSION COMPLETE"));
        println!("\nProject directory: {}", self.project_dir.display());
        print_progress(&self.project_dir);
        println!("Successful sessions this run: {}", summary.state.completed);

        if summary.termination == Termination::Interrupted {
            println!("\nInterrupted by user");
            println!("To resume, run the same command again");
        }
        println!("\nDone!");
    }
}

impl LoopObserver for ConsoleReporter {
    fn on_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::SessionStarting { session, kind } => {
                let label = match kind {
                    SessionKind::Initializer => "INITIALIZER",
                    SessionKind::Coding => "CODING AGENT",
                };
                println!("\n{}", banner(&format!("SESSION {session}: {label}")));
                println!();
                if kind == SessionKind::Initializer && self.hybrid {
                    println!("Using planning model: {}", self.planning_model);
                }
            }
            LoopEvent::SessionContinued { next_in, .. } => {
                println!("\n{}\n", rule('-'));
                println!("Agent will auto-continue in {}s...", next_in.as_secs());
                print_progress(&self.project_dir);
            }
            LoopEvent::SessionFailed { message, .. } => {
                println!("\nError during agent session: {message}");
                println!("Will retry with a fresh session...");
            }
            LoopEvent::RateLimited {
                attempt,
                ceiling,
                wait,
            } => {
                let duration = format_wait_time(wait.duration.as_secs());
                match wait.source {
                    WaitSource::Explicit => {
                        println!("\nRate limit hit - waiting {duration} (from backend)")
                    }
                    WaitSource::Fallback => {
                        println!("\nRate limit hit (no retry hint) - fallback wait: {duration}")
                    }
                    WaitSource::ExtendedFallback => println!(
                        "\nRate limit hit again after fallback wait - extended wait: {duration}"
                    ),
                }
                println!("   (attempt {attempt}/{ceiling})");
                println!("\n{}", banner("RATE LIMITED - quota reached"));
                println!("\nWaiting {duration} before resuming...");
                println!("(The agent will automatically continue after the wait)\n");
            }
            LoopEvent::WaitProgress { remaining } => {
                println!("  ... {} remaining", format_wait_time(remaining.as_secs()));
            }
            LoopEvent::WaitComplete => println!("\nWait complete! Resuming agent...\n"),
            LoopEvent::PreparingNext => println!("\nPreparing next session...\n"),
            LoopEvent::MaxIterationsReached { max } => {
                println!("\nReached max iterations ({max})");
                println!("To continue, run the command again without --max-iterations");
            }
            LoopEvent::RetryCeilingExceeded { retries, ceiling } => {
                println!("\nToo many rate limit retries ({retries}, max {ceiling}). Stopping agent.");
                println!("   Try again later or upgrade your subscription.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_tool_use_truncates_input() {
        let long = "x".repeat(500);
        let rendered = render_event(&BackendEvent::ToolUse {
            name: "Write".into(),
            input: json!({ "content": long }),
        });
        assert!(rendered.starts_with("\n[Tool: Write]\n   Input: "));
        let input_line = rendered.lines().nth(2).unwrap();
        let preview = input_line.trim_start().strip_prefix("Input: ").unwrap();
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_render_short_tool_input_untouched() {
        let rendered = render_event(&BackendEvent::ToolUse {
            name: "Bash".into(),
            input: json!({"command": "ls"}),
        });
        assert!(rendered.contains(r#"Input: {"command":"ls"}"#));
    }

    #[test]
    fn test_render_tool_results() {
        assert_eq!(
            render_event(&BackendEvent::ToolResult {
                content: "Command BLOCKED by hook".into(),
                is_error: true,
            }),
            "   [BLOCKED] Command BLOCKED by hook\n"
        );
        let error = render_event(&BackendEvent::ToolResult {
            content: "e".repeat(600),
            is_error: true,
        });
        assert!(error.starts_with("   [Error] "));
        assert_eq!(error.trim_end().chars().count(), "   [Error] ".len() + 503);
        assert_eq!(
            render_event(&BackendEvent::ToolResult {
                content: "fine".into(),
                is_error: false,
            }),
            "   [Done]\n"
        );
    }

    #[test]
    fn test_render_assistant_text_verbatim() {
        assert_eq!(
            render_event(&BackendEvent::AssistantText("Hi\n".into())),
            "Hi\n"
        );
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("🔥🔥🔥", 2), "🔥🔥...");
        assert_eq!(truncate_chars("ab", 2), "ab");
    }

    #[test]
    fn test_format_progress() {
        let summary = ProgressSummary {
            passing: 3,
            total: 8,
        };
        assert_eq!(
            format_progress(&summary),
            "Progress: 3/8 tests passing (37.5%)"
        );
    }
}
