//! Stack-trace rendering (§4.6, §7 "stack trace, most recent frame first").

use hemlock_core::ExecutionContext;

/// Render the current call stack, most-recent-frame-first, for an
/// uncaught exception or `panic` (§4.6, §12 stack-trace rendering).
pub fn render(ctx: &ExecutionContext) -> String {
    let mut out = String::new();
    for frame in ctx.frames_most_recent_first() {
        out.push_str("  at ");
        out.push_str(&frame.function_name);
        if let Some(file) = &frame.source_file {
            out.push_str(&format!(" ({file}"));
            if let Some(line) = frame.line {
                out.push_str(&format!(":{line}"));
            }
            out.push(')');
        } else if let Some(line) = frame.line {
            out.push_str(&format!(" (line {line})"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemlock_core::CallFrame;

    #[test]
    fn renders_most_recent_frame_first() {
        let mut ctx = ExecutionContext::default();
        ctx.push_frame(CallFrame {
            function_name: "outer".into(),
            source_file: None,
            line: Some(1),
        })
        .unwrap();
        ctx.push_frame(CallFrame {
            function_name: "inner".into(),
            source_file: None,
            line: Some(2),
        })
        .unwrap();
        let rendered = render(&ctx);
        assert!(rendered.find("inner").unwrap() < rendered.find("outer").unwrap());
    }
}
