//! Command specifications accepted by the process scheduler.

use serde::{Deserialize, Serialize};

/// How an external command is started.
///
/// `Shell` hands the whole string to `sh -c` (or `cmd /C` on Windows) and is
/// therefore subject to shell quoting. `Exec` starts `program` directly with
/// `args` and must be used whenever any argument comes from dynamic text such
/// as a prompt.
///
/// In TOML task files a bare string is a shell command and a table with
/// `program`/`args` is a direct exec:
///
/// ```
/// use kanon_domain::process::CommandSpec;
///
/// let shell: CommandSpec = serde_json::from_str(r#""echo hi""#).unwrap();
/// assert_eq!(shell, CommandSpec::shell("echo hi"));
///
/// let exec: CommandSpec =
///     serde_json::from_str(r#"{"program": "git", "args": ["status"]}"#).unwrap();
/// assert_eq!(exec, CommandSpec::exec("git", ["status"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CommandSpec {
    pub fn shell(command: impl Into<String>) -> Self {
        CommandSpec::Shell(command.into())
    }

    pub fn exec<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, CommandSpec::Shell(_))
    }

    /// Literal command line recorded on the process (for display only).
    pub fn display(&self) -> String {
        match self {
            CommandSpec::Shell(command) => command.clone(),
            CommandSpec::Exec { program, args } => {
                let mut parts = Vec::with_capacity(args.len() + 1);
                parts.push(program.as_str());
                parts.extend(args.iter().map(String::as_str));
                parts.join(" ")
            }
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CommandSpec::shell("ls -la | wc -l").display(), "ls -la | wc -l");
        assert_eq!(
            CommandSpec::exec("claude", ["-p", "fix the bug"]).display(),
            "claude -p fix the bug"
        );
        assert_eq!(CommandSpec::exec("true", Vec::<String>::new()).display(), "true");
    }

    #[test]
    fn test_exec_without_args_deserializes() {
        let spec: CommandSpec = serde_json::from_str(r#"{"program": "make"}"#).unwrap();
        assert_eq!(spec, CommandSpec::exec("make", Vec::<String>::new()));
        assert!(!spec.is_shell());
    }
}
