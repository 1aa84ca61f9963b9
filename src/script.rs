//! JSON command sequences for a [`Session`].
//!
//! A script is an object with a `sequence` array. Each step is an object with
//! exactly one key, the command, mapping to its parameters:
//!
//! ```text
//! {
//!   "sequence": [
//!     { "start": { "mode": "acquire", "in": "mock://scope", "out": "capture.bin",
//!                   "fs": 1000, "loops": 10, "chunk": 512 } },
//!     { "wait":  { "seconds": 2 } },
//!     { "stop":  {} },
//!     { "write": { "out": "wave.bin", "fo": 2000, "n": 2048,
//!                  "wave": "square", "amp": 1.0, "chunk": 512 } }
//!   ]
//! }
//! ```
//!
//! Malformed steps and unknown commands are reported and skipped; a failing
//! command never ends the sequence.

use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::ScriptError;
use crate::session::{JobConfig, Session, StopOutcome, WaitSpec};

#[derive(Debug, Clone)]
pub enum Command {
    Start(JobConfig),
    Wait(WaitSpec),
    Stop,
    Read(JobConfig),
    Write(JobConfig),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Wait(_) => "wait",
            Command::Stop => "stop",
            Command::Read(_) => "read",
            Command::Write(_) => "write",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Command(Command),
    /// A step that could not be understood, with the reason
    Skipped(String),
}

/// Counts of what happened while running a script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ScriptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "executed={} skipped={} failed={}",
            self.executed, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let doc: Value = serde_json::from_str(source)?;
        Self::from_value(&doc)
    }

    /// Only the document shape is fatal; individual steps are checked one by one.
    pub fn from_value(doc: &Value) -> Result<Self, ScriptError> {
        let root = doc
            .as_object()
            .ok_or(ScriptError::Shape("document must be a JSON object"))?;

        let steps = match root.get("sequence") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(steps)) => steps.iter().map(parse_step).collect(),
            Some(_) => return Err(ScriptError::Shape("sequence must be an array")),
        };

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Execute every step in order, then stop any job left running.
    pub fn run(&self, session: &mut Session) -> ScriptSummary {
        let console = session.console().clone();
        let mut summary = ScriptSummary::default();

        for step in &self.steps {
            let command = match step {
                Step::Command(command) => command,
                Step::Skipped(reason) => {
                    log::warn!("skipping step: {}", reason);
                    console.line(format!("[WARN] {}", reason));
                    summary.skipped += 1;
                    continue;
                }
            };

            console.line(format!("\n[script] {}", command.name().to_ascii_uppercase()));
            summary.executed += 1;

            let outcome = match command {
                Command::Start(config) => session.start(config),
                Command::Wait(spec) => session.wait(spec).map(|_| ()),
                Command::Stop => {
                    session.stop();
                    Ok(())
                }
                Command::Read(config) => session.read(config).map(|_| ()),
                Command::Write(config) => session.write(config).map(|_| ()),
            };

            if let Err(e) = outcome {
                log::warn!("{} failed: {}", command.name(), e);
                console.line(format!("[WARN] {}: {}", command.name(), e));
                summary.failed += 1;
            }
        }

        if session.has_job() {
            if let StopOutcome::Abandoned = session.stop() {
                log::warn!("background job abandoned at end of script");
            }
        }

        console.line(format!("\n[script] Done. ({})", summary));
        summary
    }
}

fn parse_step(step: &Value) -> Step {
    let entry = match step.as_object() {
        Some(map) if map.len() == 1 => map.iter().next(),
        _ => None,
    };
    let Some((name, params)) = entry else {
        return Step::Skipped(format!("Bad step: {}", step));
    };

    // A missing parameter object means "no parameters"
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => params.clone(),
        other => {
            return Step::Skipped(format!("Bad parameters for {}: {}", name, other));
        }
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => serde_json::from_value(params).map(Command::Start),
        "wait" => serde_json::from_value(params).map(Command::Wait),
        "stop" => Ok(Command::Stop),
        "read" => serde_json::from_value(params).map(Command::Read),
        "write" => serde_json::from_value(params).map(Command::Write),
        other => return Step::Skipped(format!("Unknown command: {}", other)),
    };

    match command {
        Ok(command) => Step::Command(command),
        Err(e) => Step::Skipped(format!("Bad parameters for {}: {}", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_steps_are_skipped_not_fatal() {
        let script = Script::parse(
            r#"{ "sequence": [
                { "stop": {} },
                { "start": {}, "stop": {} },
                "wait",
                { "dance": {} },
                { "wait": { "seconds": "soon" } },
                { "wait": null }
            ] }"#,
        )
        .unwrap();

        let kinds: Vec<&str> = script
            .steps()
            .iter()
            .map(|s| match s {
                Step::Command(c) => c.name(),
                Step::Skipped(_) => "skipped",
            })
            .collect();
        assert_eq!(kinds, vec!["stop", "skipped", "skipped", "skipped", "skipped", "wait"]);
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        let script = Script::parse(r#"{ "sequence": [ { "STOP": {} } ] }"#).unwrap();
        assert!(matches!(script.steps(), [Step::Command(Command::Stop)]));
    }

    #[test]
    fn test_document_shape_errors() {
        assert!(matches!(Script::parse("[]"), Err(ScriptError::Shape(_))));
        assert!(matches!(
            Script::parse(r#"{ "sequence": 3 }"#),
            Err(ScriptError::Shape(_))
        ));
        assert!(matches!(Script::parse("{"), Err(ScriptError::Json(_))));
        assert!(Script::parse("{}").unwrap().steps().is_empty());
    }
}
