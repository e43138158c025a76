//! Line tokenization for the interpreter.
//!
//! A line holds one or more commands separated by `;`. Everything from the
//! first `#` to the end of the line is a comment. Within one command,
//! arguments are separated by runs of whitespace. There is no quoting and
//! no escaping in this little language.

/// Truncate `line` at the first `#`, dropping the comment.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Split a raw input line into its `;`-separated command strings.
///
/// Comment stripping happens first, so a `#` hides every later `;`.
/// Empty segments (from `;;` or a trailing `;`) are kept; callers skip
/// commands that tokenize to nothing.
pub fn split_commands(line: &str) -> Vec<&str> {
    strip_comment(line).split(';').collect()
}

/// Split one command string into its whitespace-separated words.
///
/// The first word is the command name, the rest are its arguments.
pub fn split_words(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_to_end_of_line() {
        assert_eq!(strip_comment("ls -l # list things"), "ls -l ");
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(strip_comment("no comment here"), "no comment here");
    }

    #[test]
    fn comment_hides_later_separators() {
        let commands = split_commands("echo a # ; echo b");
        assert_eq!(commands, vec!["echo a "]);
    }

    #[test]
    fn splits_on_semicolons() {
        let commands = split_commands("ls;pwd ; cat f");
        assert_eq!(commands, vec!["ls", "pwd ", " cat f"]);
    }

    #[test]
    fn empty_segments_survive_for_caller_to_skip() {
        let commands = split_commands("ls;;");
        assert_eq!(commands.len(), 3);
        assert!(split_words(commands[1]).is_empty());
        assert!(split_words(commands[2]).is_empty());
    }

    #[test]
    fn words_split_on_any_whitespace() {
        assert_eq!(split_words("  ls\t-l   /tmp "), vec!["ls", "-l", "/tmp"]);
        assert!(split_words("   \t ").is_empty());
    }
}
