//! Operator-facing HTML texts.

use crate::{
    domain::ChatReference,
    relay::RunCounters,
    run::{LastRun, RunEvent},
    state::{Awaiting, LinkRange, RunState, TextAccepted},
};

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn help_html(max_targets: u8) -> String {
    format!(
        "✅ <b>List Maker</b> (photos only)\n\n\
<b>Step 1: Set chats</b>\n\
/setsource &lt;username_or_-100id&gt; - Source list\n\
/settarget &lt;n&gt; &lt;username_or_-100id&gt; - Target n (indexed channel)\n\
/setdest &lt;n&gt; &lt;username_or_-100id&gt; - Destination for target n\n\n\
<b>Step 2: Set ranges (post links)</b>\n\
/setsourcerange - then send the first and the last source post link\n\
/settargetrange &lt;n&gt; - then send the first and the last post link of target n\n\n\
<b>Step 3: Run</b>\n\
/run - Index targets and relay matches\n\
/status - Show current settings\n\
/reset - Clear everything\n\n\
Targets: 1 to {max_targets}"
    )
}

pub fn text_accepted_html(accepted: TextAccepted) -> String {
    match accepted {
        TextAccepted::SourceRangeStart => "Now send the <b>LAST</b> source post link.".to_string(),
        TextAccepted::SourceRangeComplete => {
            "✅ Source range set.\nNow set target ranges with /settargetrange &lt;n&gt;.".to_string()
        }
        TextAccepted::TargetRangeStart(n) => {
            format!("Now send the <b>LAST</b> post link of target {n}.")
        }
        TextAccepted::TargetRangeComplete(n) => {
            format!("✅ Target {n} range set.\nRun with /run when everything is configured.")
        }
    }
}

pub fn awaiting_prompt_html(awaiting: Awaiting) -> String {
    match awaiting {
        Awaiting::Idle => String::new(),
        Awaiting::SourceRangeStart => "Send the <b>FIRST</b> source post link now.".to_string(),
        Awaiting::SourceRangeEnd => "Send the <b>LAST</b> source post link now.".to_string(),
        Awaiting::TargetRangeStart(n) => {
            format!("Send the <b>FIRST</b> post link of target {n} now.")
        }
        Awaiting::TargetRangeEnd(n) => format!("Send the <b>LAST</b> post link of target {n} now."),
    }
}

pub fn status_html(state: &RunState, last: Option<&LastRun>, running: bool) -> String {
    let mut lines: Vec<String> = vec!["📊 <b>Current Settings</b>\n".to_string()];

    lines.push(format!("Source: {}", chat_html(state.source.as_ref())));
    lines.push(format!("Source range: {}", range_html(&state.source_range)));

    if state.targets.is_empty() {
        lines.push("\n⚪ No targets configured".to_string());
    }
    for (n, t) in &state.targets {
        lines.push(format!("\n<b>Target {n}</b>"));
        lines.push(format!("   Channel: {}", chat_html(t.chat.as_ref())));
        lines.push(format!("   Destination: {}", chat_html(t.destination.as_ref())));
        lines.push(format!("   Range: {}", range_html(&t.range)));
    }

    if state.awaiting != Awaiting::Idle {
        lines.push(format!("\n⏳ {}", awaiting_prompt_html(state.awaiting)));
    }

    if running {
        lines.push("\n🔄 Run: in progress".to_string());
    } else if let Some(last) = last {
        let when = last.finished_at.format("%Y-%m-%d %H:%M:%S UTC");
        match &last.outcome {
            Ok(c) => {
                lines.push(format!("\n🕘 Last run ({when}):"));
                lines.push(counters_html(c));
            }
            Err(e) => lines.push(format!(
                "\n🕘 Last run ({when}) failed: <code>{}</code>",
                escape_html(e)
            )),
        }
    }

    lines.join("\n")
}

pub fn counters_html(c: &RunCounters) -> String {
    let mut lines = vec![format!("Photos read from source range: {}", c.processed)];
    for t in &c.targets {
        lines.push(format!(
            "{}: sent {} | no match {}",
            escape_html(&t.label),
            t.sent,
            t.not_found
        ));
    }
    lines.join("\n")
}

pub fn summary_html(c: &RunCounters) -> String {
    format!("✅ <b>Done!</b>\n{}", counters_html(c))
}

pub fn progress_html(event: &RunEvent) -> String {
    match event {
        RunEvent::Indexing { label } => {
            format!("⏳ Building index from {} (photos only)...", escape_html(label))
        }
        RunEvent::Indexed { label, entries } => format!(
            "✅ Indexed {entries} photo captions from {}.",
            escape_html(label)
        ),
        RunEvent::Relaying { targets } => format!(
            "⏳ Processing source photos against {targets} target{}...",
            if *targets == 1 { "" } else { "s" }
        ),
    }
}

pub fn error_html(e: &str) -> String {
    format!("❌ {}", escape_html(e))
}

fn chat_html(chat: Option<&ChatReference>) -> String {
    match chat {
        Some(c) => format!("<code>{}</code>", escape_html(&c.to_string())),
        None => "<i>not set</i>".to_string(),
    }
}

fn range_html(range: &LinkRange) -> String {
    let end = |v: &Option<String>| match v {
        Some(s) => format!("<code>{}</code>", escape_html(s)),
        None => "<i>not set</i>".to_string(),
    };
    format!("{} → {}", end(&range.first), end(&range.last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::TargetCounters;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn status_shows_targets_and_armed_input() {
        let mut st = RunState::new(2);
        st.set_source(ChatReference::parse("@src<x>"));
        st.set_target_chat(1, ChatReference::parse("-1005")).unwrap();
        st.begin_target_range(1).unwrap();

        let html = status_html(&st, None, false);
        assert!(html.contains("<code>@src&lt;x&gt;</code>"));
        assert!(html.contains("<b>Target 1</b>"));
        assert!(html.contains("<code>-1005</code>"));
        assert!(html.contains("Destination: <i>not set</i>"));
        assert!(html.contains("FIRST</b> post link of target 1"));
    }

    #[test]
    fn summary_lists_every_target() {
        let c = RunCounters {
            processed: 3,
            targets: vec![
                TargetCounters {
                    label: "target 1".to_string(),
                    sent: 2,
                    not_found: 1,
                },
                TargetCounters {
                    label: "target 2".to_string(),
                    sent: 0,
                    not_found: 3,
                },
            ],
        };
        let html = summary_html(&c);
        assert!(html.contains("Photos read from source range: 3"));
        assert!(html.contains("target 1: sent 2 | no match 1"));
        assert!(html.contains("target 2: sent 0 | no match 3"));
    }
}
