//! Shared output formatting for boardsync CLI commands.

use serde::Serialize;

use crate::error::Result;

pub const SCHEMA_VERSION: &str = "boardsync.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

/// JSON envelope shared by every command. `body` becomes either a `data`
/// or an `error` key.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    body: Body<'a, T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Body<'a, T: Serialize> {
    Data(&'a T),
    Error(ErrorBody),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

/// Report a finished command: the JSON envelope with `--json`, nothing with
/// `--quiet`, otherwise the human sections.
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            body: Body::Data(data),
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        _ => {}
    }
    Ok(())
}

/// Report a failed command. Human errors go to stderr with the first
/// suggested next step as a hint.
pub fn emit_error(command: &str, err: &crate::error::Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            body: Body::Error(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: Vec::new(),
            next_steps,
        };
        return print_envelope(&envelope);
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Global flags that take a value, so their value is not mistaken for the
/// command name.
const VALUE_FLAGS: [&str; 3] = ["--dir", "--user", "--events"];

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

pub fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "boardsync".to_string()
}

fn error_kind(err: &crate::error::Error) -> &'static str {
    match err.exit_code() {
        crate::error::exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &crate::error::Error) -> Vec<String> {
    use crate::error::Error;

    match err {
        Error::TaskNotFound(_) => vec!["boardsync list".to_string()],
        Error::SubtaskOutOfRange { task_id, .. } => vec![format!("boardsync show {task_id}")],
        Error::InvalidConfig(_) => vec!["fix board.toml then retry".to_string()],
        Error::LockFailed(_) => vec!["retry once the other writer has finished".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn command_name_skips_flag_values() {
        assert_eq!(infer_command_name(args(&["--dir", "/tmp/b", "list"])), "list");
        assert_eq!(infer_command_name(args(&["--json", "move", "1", "done"])), "move");
        assert_eq!(infer_command_name(args(&[])), "boardsync");
    }

    #[test]
    fn envelope_nests_data_or_error() {
        let data = serde_json::json!({ "total": 2 });
        let success = serde_json::to_value(Envelope {
            schema_version: SCHEMA_VERSION,
            command: "list",
            status: "success",
            body: Body::Data(&data),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        })
        .unwrap();
        assert_eq!(success["data"]["total"], 2);
        assert!(success.get("warnings").is_none());

        let err = crate::error::Error::TaskNotFound("7".to_string());
        let failure = serde_json::to_value(Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command: "show",
            status: "error",
            body: Body::Error(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(&err),
                details: err.details(),
            }),
            warnings: Vec::new(),
            next_steps: error_next_steps(&err),
        })
        .unwrap();
        assert_eq!(failure["error"]["kind"], "user_error");
        assert_eq!(failure["error"]["details"]["task_id"], "7");
        assert_eq!(failure["next_steps"][0], "boardsync list");
        assert!(failure.get("data").is_none());
    }

    #[test]
    fn human_output_sections() {
        let mut human = HumanOutput::new("Moved task 1");
        human.push_summary("To", "done");
        human.push_warning("store write failed");
        let text = format_human(&human);
        assert!(text.starts_with("Moved task 1"));
        assert!(text.contains("Summary:\n- To: done"));
        assert!(text.contains("Warnings:\n- store write failed"));
        assert!(!text.contains("Next steps"));
    }
}
