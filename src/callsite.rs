//! Best-effort call-site resolution from captured stack text.
//!
//! There is no reflection API for "who called the logger", so the stack
//! trace is the only source of truth. A [`StackFormat`] bundles the
//! heuristics for one textual stack layout: which lines are frames, which
//! frames belong to the logger itself, which frames look like application
//! modules, and a single pattern that pulls method, module, file and line
//! out of the chosen frame. Anything that does not match degrades to the
//! `unknown` / `-1` sentinel instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::backtrace::Backtrace;

/// Placeholder for method and class names that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// Placeholder line number for an unresolved call site.
pub const UNKNOWN_LINE: i64 = -1;

const BROWSER_PATTERN: &str =
    r"(?:[ .](?P<method>[^ .]+) \()?http.*/(?:(?P<module>[\w_-]+)/)(?P<file>[^/]+\.js).*:(?P<line>\d+):(?P<col>\d+)";

const NATIVE_PATTERN: &str = r"at (?:\S*::)?(?P<method>[^\s:{}<>]+)(?:::\{\{closure\}\})* \((?:\S*/)?(?P<module>[\w-]+)/(?P<file>[^/\s]+\.rs):(?P<line>\d+):(?P<col>\d+)\)";

static NATIVE_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+:\s+(?P<symbol>.+)$").unwrap());

static BROWSER: Lazy<StackFormat> = Lazy::new(|| StackFormat {
    frame_marker: "at".to_string(),
    skip_markers: vec!["arc.js".to_string(), "/arc/".to_string()],
    module_markers: vec!["/modules/".to_string(), "/components/".to_string()],
    pattern: Regex::new(BROWSER_PATTERN).unwrap(),
    layout: FrameLayout::SingleLine,
});

static NATIVE: Lazy<StackFormat> = Lazy::new(|| StackFormat {
    frame_marker: "at".to_string(),
    skip_markers: [
        concat!(env!("CARGO_CRATE_NAME"), "::"),
        "at std::",
        "at <std::",
        "at core::",
        "at <core::",
        "at alloc::",
        "at <alloc::",
        "at tokio::",
        "at <tokio::",
        "at test::",
        "at <unknown>",
        "at __rust_try",
        "/rustc/",
        "/.cargo/registry/",
        "/registry/src/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect(),
    module_markers: vec!["/src/".to_string()],
    pattern: Regex::new(NATIVE_PATTERN).unwrap(),
    layout: FrameLayout::SymbolThenLocation,
});

/// How frames are laid out in the raw stack text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// One frame per line, e.g. `    at fn (https://host/dir/file.js:10:5)`.
    SingleLine,
    /// `std::backtrace` output: a numbered symbol line, optionally followed
    /// by an `at path:line:col` line. Frames are joined into the
    /// single-line form `    at symbol (path:line:col)` before filtering.
    SymbolThenLocation,
}

/// Heuristics for one stack text format.
///
/// `pattern` must define the named groups `module`, `file` and `line`;
/// `method` is optional.
#[derive(Debug, Clone)]
pub struct StackFormat {
    /// A line is a frame when, trimmed, it starts with this token.
    pub frame_marker: String,
    /// Frames containing any of these are dropped (the logger's own frames,
    /// runtime internals).
    pub skip_markers: Vec<String>,
    /// Frames containing any of these are preferred as the call site.
    pub module_markers: Vec<String>,
    pub pattern: Regex,
    pub layout: FrameLayout,
}

impl StackFormat {
    /// Stack traces as browsers print them for script errors.
    pub fn browser() -> Self {
        BROWSER.clone()
    }

    /// Rust backtraces captured through [`std::backtrace::Backtrace`].
    pub fn native() -> Self {
        NATIVE.clone()
    }

    /// A custom single-line format with no skip or module markers.
    pub fn new(frame_marker: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(StackFormat {
            frame_marker: frame_marker.into(),
            skip_markers: Vec::new(),
            module_markers: Vec::new(),
            pattern: Regex::new(pattern)?,
            layout: FrameLayout::SingleLine,
        })
    }

    pub fn with_skip_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_module_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn is_frame(&self, line: &str) -> bool {
        line.trim().starts_with(self.frame_marker.as_str())
    }

    pub fn is_own_frame(&self, line: &str) -> bool {
        self.skip_markers.iter().any(|m| line.contains(m.as_str()))
    }

    pub fn is_module_frame(&self, line: &str) -> bool {
        self.module_markers.iter().any(|m| line.contains(m.as_str()))
    }

    /// Frames of `raw` that may be reported as the call site, in stack order.
    pub fn frames(&self, raw: &str) -> Vec<String> {
        let lines = match self.layout {
            FrameLayout::SingleLine => raw.lines().map(str::to_string).collect(),
            FrameLayout::SymbolThenLocation => join_symbol_frames(raw),
        };

        lines
            .into_iter()
            .filter(|line| self.is_frame(line) && !self.is_own_frame(line))
            .collect()
    }

    /// First frame that looks like application code, else the first frame.
    pub fn pick<'a>(&self, frames: &'a [String]) -> Option<&'a str> {
        frames
            .iter()
            .find(|f| self.is_module_frame(f))
            .or_else(|| frames.first())
            .map(String::as_str)
    }

    fn extract(&self, frame: &str) -> Option<Extracted> {
        let caps = self.pattern.captures(frame)?;
        let module = caps.name("module")?.as_str();
        let file = caps.name("file")?.as_str();
        let line = caps.name("line")?.as_str().parse().ok()?;

        Some(Extracted {
            method: caps.name("method").map(|m| m.as_str().to_string()),
            class: format!("{}.{}", module, file),
            line,
        })
    }
}

struct Extracted {
    method: Option<String>,
    class: String,
    line: i64,
}

/// Where an arc was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// The filtered frames, newline separated.
    pub stack_trace: String,
    pub method_name: Option<String>,
    /// `<module>.<file>` of the chosen frame.
    pub class_name: String,
    pub line_number: i64,
}

impl CallSite {
    pub fn unknown(stack_trace: String) -> Self {
        CallSite {
            stack_trace,
            method_name: Some(UNKNOWN.to_string()),
            class_name: UNKNOWN.to_string(),
            line_number: UNKNOWN_LINE,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.line_number != UNKNOWN_LINE
    }
}

/// Parse raw stack text into a call site, falling back to the sentinel.
pub fn parse_location(raw: &str, format: &StackFormat) -> CallSite {
    let frames = format.frames(raw);
    let stack_trace = frames.join("\n");

    match format.pick(&frames).and_then(|frame| format.extract(frame)) {
        Some(found) => CallSite {
            stack_trace,
            method_name: found.method,
            class_name: found.class,
            line_number: found.line,
        },
        None => CallSite::unknown(stack_trace),
    }
}

/// Like [`parse_location`], but `None` instead of the sentinel.
pub fn locate_frame(raw: &str, format: &StackFormat) -> Option<CallSite> {
    let site = parse_location(raw, format);
    if site.is_resolved() {
        Some(site)
    } else {
        None
    }
}

/// Capture the current stack and resolve the caller's location from it.
pub fn resolve_location(format: &StackFormat) -> CallSite {
    let captured = Backtrace::force_capture().to_string();
    parse_location(&captured, format)
}

fn join_symbol_frames(raw: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in raw.lines() {
        if let Some(caps) = NATIVE_SYMBOL.captures(line) {
            if let Some(frame) = pending.take() {
                frames.push(frame);
            }
            pending = Some(format!("    at {}", &caps["symbol"]));
        } else if let Some(location) = line.trim().strip_prefix("at ") {
            if let Some(frame) = pending.take() {
                frames.push(format!("{} ({})", frame, location));
            }
        }
    }
    frames.extend(pending);
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_STACK: &str = "Error: Source Stack
    at populateLocation (https://acme.lightning.force.com/components/c/arc.js:120:17)
    at buildArc (https://acme.lightning.force.com/components/c/arc.js:98:13)
    at Module.info (https://acme.lightning.force.com/components/c/arc.js:45:3)
    at https://acme.lightning.force.com/auraFW/javascript/aura_prod.js:2:100
    at NarrativeDemo.logSuccess (https://acme.lightning.force.com/components/c/narrativeDemo.js:52:9)";

    const NATIVE_STACK: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:117:9
   1: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   2: arc_telemetry::callsite::resolve_location
             at ./src/callsite.rs:230:20
   3: checkout::cart::submit::{{closure}}
             at /home/dev/checkout/src/cart/submit.rs:41:9
   4: checkout::main
             at /home/dev/checkout/src/main.rs:12:5
   5: <unknown>
   6: __libc_start_main";

    #[test]
    fn browser_prefers_component_frames_and_drops_own_frames() {
        let site = parse_location(BROWSER_STACK, &StackFormat::browser());

        assert_eq!(site.method_name.as_deref(), Some("logSuccess"));
        assert_eq!(site.class_name, "c.narrativeDemo.js");
        assert_eq!(site.line_number, 52);
        assert!(!site.stack_trace.contains("arc.js"));
        assert_eq!(site.stack_trace.lines().count(), 2);
    }

    #[test]
    fn browser_falls_back_to_first_remaining_frame() {
        let raw = "Error\n    at run (https://host/static/bundle/app.js:7:21)\n    at https://host/other/lib.js:1:1";
        let site = parse_location(raw, &StackFormat::browser());

        assert_eq!(site.method_name.as_deref(), Some("run"));
        assert_eq!(site.class_name, "bundle.app.js");
        assert_eq!(site.line_number, 7);
    }

    #[test]
    fn anonymous_frames_have_no_method() {
        let raw = "Error\n    at https://host/modules/c/widget.js:3:4";
        let site = parse_location(raw, &StackFormat::browser());

        assert_eq!(site.method_name, None);
        assert_eq!(site.class_name, "c.widget.js");
        assert_eq!(site.line_number, 3);
    }

    #[test]
    fn unmatched_frames_yield_the_sentinel() {
        let raw = "Error: Source Stack\n    at eval (eval at <anonymous>)\n    at file:///tmp/x.mjs";
        let site = parse_location(raw, &StackFormat::browser());

        assert_eq!(site.method_name.as_deref(), Some(UNKNOWN));
        assert_eq!(site.class_name, UNKNOWN);
        assert_eq!(site.line_number, UNKNOWN_LINE);
        assert!(site.stack_trace.contains("eval"));
        assert!(locate_frame(raw, &StackFormat::browser()).is_none());
    }

    #[test]
    fn empty_stack_yields_the_sentinel() {
        let site = parse_location("", &StackFormat::native());
        assert!(!site.is_resolved());
        assert_eq!(site.stack_trace, "");
    }

    #[test]
    fn native_frames_are_joined_and_filtered() {
        let format = StackFormat::native();
        let frames = format.frames(NATIVE_STACK);

        assert_eq!(
            frames[0],
            "    at checkout::cart::submit::{{closure}} (/home/dev/checkout/src/cart/submit.rs:41:9)"
        );
        assert!(frames.iter().all(|f| !f.contains("std::") && !f.contains("arc_telemetry")));
        assert!(frames.iter().any(|f| f.contains("__libc_start_main")));
    }

    #[test]
    fn native_resolves_method_module_and_line() {
        let site = parse_location(NATIVE_STACK, &StackFormat::native());

        assert_eq!(site.method_name.as_deref(), Some("submit"));
        assert_eq!(site.class_name, "cart.submit.rs");
        assert_eq!(site.line_number, 41);
    }

    #[test]
    fn unwind_guard_frames_are_not_the_call_site() {
        let raw = "   0: arc_telemetry::logger::ArcLogger::log::{{closure}}
             at ./src/logger.rs:77:13
   1: __rust_try
   2: std::panic::catch_unwind
             at /rustc/abc/library/std/src/panic.rs:142:14
   3: arc_telemetry::logger::ArcLogger::info
             at ./src/logger.rs:52:9
   4: leveled_api::reports_caller::{{closure}}
             at ./tests/leveled_api.rs:9:12
   5: <core::pin::Pin<P> as core::future::future::Future>::poll
             at /rustc/abc/library/core/src/future/future.rs:123:9
   6: tokio::runtime::park::CachedParkThread::block_on
             at /usr/local/cargo/registry/src/index.crates.io-6f17d22bba15001f/tokio-1.38.0/src/runtime/park.rs:281:63";
        let site = parse_location(raw, &StackFormat::native());

        assert_eq!(site.method_name.as_deref(), Some("reports_caller"));
        assert_eq!(site.class_name, "tests.leveled_api.rs");
        assert_eq!(site.line_number, 9);
        assert_eq!(site.stack_trace.lines().count(), 1);
    }

    #[test]
    fn custom_formats_are_tunable() {
        let format = StackFormat::new("#", r"(?P<module>\w+)/(?P<file>\w+\.py):(?P<line>\d+)")
            .unwrap()
            .with_skip_markers(["logging/"])
            .with_module_markers(["app/"]);
        let raw = "# logging/handler.py:10\n# lib/util.py:3\n# app/views.py:88";
        let site = parse_location(raw, &format);

        assert_eq!(site.class_name, "app.views.py");
        assert_eq!(site.line_number, 88);
        assert_eq!(site.method_name, None);
    }

    #[test]
    fn live_capture_never_reports_own_frames() {
        let site = resolve_location(&StackFormat::native());

        // Inside this crate every frame up to the test harness is an own
        // frame, so only the filtering is observable here.
        assert!(!site.stack_trace.contains("arc_telemetry::"));
        assert!(!site.stack_trace.contains("__rust_try"));
        assert!(!site.stack_trace.contains("/rustc/"));
    }
}
