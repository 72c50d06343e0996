//! Command tokenization

use crate::error::ExecError;

/// A command split into program and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable to run
    pub program: String,
    /// Arguments, unquoted
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a command string using POSIX shell quoting rules
    ///
    /// Single quotes, double quotes and backslash escapes are honoured. No
    /// expansion, redirection or pipelines are performed.
    pub fn parse(command: &str) -> Result<Option<Self>, ExecError> {
        let mut words = shlex::split(command).ok_or_else(|| ExecError::Parse {
            command: command.to_string(),
        })?;

        if words.is_empty() {
            return Ok(None);
        }
        let program = words.remove(0);
        Ok(Some(Self {
            program,
            args: words,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_whitespace() {
        let cmd = CommandLine::parse("  make   build NAME=api ").unwrap().unwrap();
        assert_eq!(cmd.program, "make");
        assert_eq!(cmd.args, vec!["build", "NAME=api"]);
    }

    #[test]
    fn test_quoted_arguments() {
        let cmd = CommandLine::parse(r#"sh -c 'echo "hello world"' "two words" a\ b"#)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.program, "sh");
        assert_eq!(
            cmd.args,
            vec!["-c", r#"echo "hello world""#, "two words", "a b"]
        );
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(CommandLine::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_unbalanced_quote() {
        let err = CommandLine::parse("echo 'oops").unwrap_err();
        assert!(matches!(err, ExecError::Parse { .. }));
    }
}
