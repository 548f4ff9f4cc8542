//! Prompt and message templates.

use crate::error::AbacusError;
use crate::tools::BookContext;
use crate::types::ToolOutcome;

const PERSONA: &str = "You are Abacus, a bookkeeping assistant. You help the user record \
income and expenses, look up their books and explain their spending. Reply in the language \
the user writes in. Keep answers short and concrete.";

const TOOL_PROTOCOL: &str = "To act on the user's books, reply with a fenced JSON block listing \
the tools to call, in order:\n\
```json\n\
{\"toolCalls\": [{\"name\": \"<tool name>\", \"arguments\": {}}]}\n\
```\n\
Put any message for the user before the block. Only call tools from the list above. After the \
tools run you will receive their results and can continue.";

/// System prompt sent at the start of every model request.
pub fn system_prompt(catalog: &str, book: Option<&BookContext>) -> String {
    let mut prompt = String::from(PERSONA);
    if !catalog.trim().is_empty() {
        prompt.push_str("\n\nAvailable tools:\n");
        prompt.push_str(catalog.trim_end());
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_PROTOCOL);
    }
    prompt.push_str("\n\n");
    match book {
        Some(book) => prompt.push_str(&format!(
            "Active book: {}. Use book id \"{}\" for tools that need one.",
            book.label(),
            book.book_id
        )),
        None => prompt.push_str(
            "No book is selected. Ask the user to pick a book before recording anything.",
        ),
    }
    prompt
}

fn render_outcome(out: &mut String, index: usize, outcome: &ToolOutcome) {
    let status = if outcome.success { "succeeded" } else { "failed" };
    out.push_str(&format!("{}. {} {status}\n", index + 1, outcome.name));
    if let Some(result) = &outcome.result {
        let json = serde_json::to_string(result).unwrap_or_else(|_| result.to_string());
        out.push_str(&format!("   result: {json}\n"));
    }
    if let Some(error) = &outcome.error {
        out.push_str(&format!("   error: {error}\n"));
    }
}

/// Synthesized user turn carrying tool results back to the model.
pub fn tool_results_message(outcomes: &[ToolOutcome]) -> String {
    let mut out = String::from("Tool results:\n");
    for (index, outcome) in outcomes.iter().enumerate() {
        render_outcome(&mut out, index, outcome);
    }
    out.push_str(
        "\nIf more tools are needed, call them now. Otherwise reply to the user with a short \
         summary of what was done.",
    );
    out
}

/// Human-readable summary appended to the reply when a tool failed.
pub fn tool_summary(outcomes: &[ToolOutcome]) -> String {
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let failed = outcomes.len() - succeeded;
    let mut out = format!("Tool summary: {succeeded} succeeded, {failed} failed");
    for outcome in outcomes {
        match &outcome.error {
            None if outcome.success => out.push_str(&format!("\n✓ {}", outcome.name)),
            Some(error) => out.push_str(&format!("\n✗ {}: {error}", outcome.name)),
            None => out.push_str(&format!("\n✗ {}", outcome.name)),
        }
    }
    out
}

pub fn max_iterations_notice(max_iterations: u32) -> String {
    format!(
        "I stopped after reaching the maximum of {max_iterations} steps, so the task may be \
         incomplete."
    )
}

pub fn max_iterations_message(text: &str, max_iterations: u32) -> String {
    let notice = max_iterations_notice(max_iterations);
    if text.trim().is_empty() {
        notice
    } else {
        format!("{}\n\n{notice}", text.trim_end())
    }
}

pub fn failure_message(err: &AbacusError) -> String {
    format!("Sorry, I couldn't finish that request. {}", err.user_message())
}
