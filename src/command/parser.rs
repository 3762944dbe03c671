//! Command line parser.
//!
//! A command line is `token||Name||arg||arg...`. Fields wrapped in `[`/`]`
//! become lists split on `", "`; everything else stays a plain string.

use std::fmt;

pub const SEPARATOR: &str = "||";
const LIST_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Command Parser Error: The command is invalid.")]
    Malformed,
}

/// One positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Scalar(String),
    List(Vec<String>),
}

impl Arg {
    fn decode(field: &str) -> Self {
        match field
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            Some(inner) => Arg::List(inner.split(LIST_SEPARATOR).map(str::to_string).collect()),
            None => Arg::Scalar(field.to_string()),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Scalar(s) => f.write_str(s),
            Arg::List(items) => write!(f, "[{}]", items.join(LIST_SEPARATOR)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub token: String,
    pub name: String,
    pub args: Vec<Arg>,
}

pub fn parse(raw: &str) -> Result<ParsedCommand, ParseError> {
    let mut fields = raw.split(SEPARATOR);
    // `split` always yields at least one field, so only the name can be missing.
    let token = fields.next().ok_or(ParseError::Malformed)?;
    let name = fields.next().ok_or(ParseError::Malformed)?;

    Ok(ParsedCommand {
        token: token.to_string(),
        name: name.to_string(),
        args: fields.map(Arg::decode).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(s: &str) -> Arg {
        Arg::Scalar(s.to_string())
    }

    fn list(items: &[&str]) -> Arg {
        Arg::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn splits_token_name_and_args() {
        let parsed = parse("tok1||SendMessage||Alice||Hello").unwrap();
        assert_eq!(parsed.token, "tok1");
        assert_eq!(parsed.name, "SendMessage");
        assert_eq!(parsed.args, vec![scalar("Alice"), scalar("Hello")]);
    }

    #[test]
    fn no_args_is_fine() {
        let parsed = parse("tok2||Quit").unwrap();
        assert_eq!(parsed.token, "tok2");
        assert_eq!(parsed.name, "Quit");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn single_field_is_malformed() {
        assert_eq!(parse("badformat"), Err(ParseError::Malformed));
        assert_eq!(parse(""), Err(ParseError::Malformed));
        assert_eq!(
            ParseError::Malformed.to_string(),
            "Command Parser Error: The command is invalid."
        );
    }

    #[test]
    fn bracketed_field_becomes_list() {
        let parsed = parse("t||GroupCreate||Team||[Alice, Bob]||None").unwrap();
        assert_eq!(
            parsed.args,
            vec![scalar("Team"), list(&["Alice", "Bob"]), scalar("None")]
        );
    }

    #[test]
    fn three_element_list_keeps_order() {
        let parsed = parse("t||X||[a, b, c]").unwrap();
        assert_eq!(parsed.args, vec![list(&["a", "b", "c"])]);
    }

    #[test]
    fn single_element_list_stays_a_list() {
        let parsed = parse("t||X||[solo]").unwrap();
        assert_eq!(parsed.args, vec![list(&["solo"])]);
    }

    #[test]
    fn comma_without_space_does_not_split() {
        let parsed = parse("t||X||[a,b]").unwrap();
        assert_eq!(parsed.args, vec![list(&["a,b"])]);
    }

    #[test]
    fn empty_brackets_yield_one_empty_item() {
        let parsed = parse("t||X||[]").unwrap();
        assert_eq!(parsed.args, vec![list(&[""])]);
    }

    #[test]
    fn half_bracketed_fields_stay_scalar() {
        let parsed = parse("t||X||[open||close]||[").unwrap();
        assert_eq!(
            parsed.args,
            vec![scalar("[open"), scalar("close]"), scalar("[")]
        );
    }

    #[test]
    fn empty_fields_are_kept_as_scalars() {
        let parsed = parse("||Name||").unwrap();
        assert_eq!(parsed.token, "");
        assert_eq!(parsed.name, "Name");
        assert_eq!(parsed.args, vec![scalar("")]);
    }

    #[test]
    fn values_are_not_coerced() {
        let parsed = parse("t||GetLastSeen||Bob||30").unwrap();
        assert_eq!(parsed.args[1], scalar("30"));
    }

    #[test]
    fn arg_display_reencodes() {
        assert_eq!(list(&["a", "b"]).to_string(), "[a, b]");
        assert_eq!(scalar("x").to_string(), "x");
    }
}
