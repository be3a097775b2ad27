//! `args.gn` parsing and serialization
//!
//! Assignments are kept in first-seen order; assigning a key again replaces
//! its value in place. Serialization writes one `key = value` line per
//! assignment with a trailing newline.

use std::fmt;

use crate::resolve::ResolvedSettings;

/// A GN value as it appears on the right of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GnValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<GnValue>),
}

impl fmt::Display for GnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GnValue::Bool(b) => write!(f, "{}", b),
            GnValue::Int(i) => write!(f, "{}", i),
            GnValue::Str(s) => write!(f, "\"{}\"", escape_gn_string(s)),
            GnValue::List(items) if items.is_empty() => f.write_str("[]"),
            GnValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[ {} ]", rendered.join(", "))
            }
        }
    }
}

/// Escape a string for use between GN double quotes.
pub fn escape_gn_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Errors from parsing GN assignments
#[derive(Debug, thiserror::Error)]
pub enum GnArgsError {
    #[error("GN args syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

/// Ordered GN assignments plus any `import()` statements seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GnArgs {
    entries: Vec<(String, GnValue)>,
    imports: Vec<String>,
}

impl GnArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` assignments. Accepts both the single-line fragments
    /// used in the config document and the multi-line `args.gn` layout,
    /// including `#` comments and `import("...")` lines.
    pub fn parse(text: &str) -> Result<Self, GnArgsError> {
        Parser::new(text).parse()
    }

    /// Assign `key`, keeping its original position if already present.
    pub fn set(&mut self, key: impl Into<String>, value: GnValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&GnValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True when `key` is assigned the boolean `true`.
    pub fn is_true(&self, key: &str) -> bool {
        matches!(self.get(key), Some(GnValue::Bool(true)))
    }

    pub fn string_value(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(GnValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Files named by `import()` statements, in order.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Apply every assignment of `other` on top of this one.
    pub fn extend(&mut self, other: GnArgs) {
        for (key, value) in other.entries {
            self.set(key, value);
        }
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `key = value` line per assignment.
    pub fn to_gn_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{} = {}\n", key, value))
            .collect()
    }
}

/// Values supplied on the command line rather than by the config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgsExtras {
    pub goma_dir: Option<String>,
    pub android_version_code: Option<String>,
    pub android_version_name: Option<String>,
}

impl ArgsExtras {
    fn apply(&self, args: &mut GnArgs) {
        let extras = [
            ("goma_dir", &self.goma_dir),
            ("android_default_version_code", &self.android_version_code),
            ("android_default_version_name", &self.android_version_name),
        ];
        for (key, value) in extras {
            if let Some(value) = value {
                args.set(key, GnValue::Str(value.clone()));
            }
        }
    }
}

/// Render the text of `args.gn`.
///
/// With `imported` set (the parsed contents of the settings' args file), the
/// args file is inlined instead of imported and the result is sorted.
pub fn render_args(
    settings: &ResolvedSettings,
    extras: &ArgsExtras,
    imported: Option<GnArgs>,
) -> Result<String, GnArgsError> {
    let mut args = GnArgs::parse(&settings.gn_args)?;
    extras.apply(&mut args);

    if let Some(mut base) = imported {
        base.extend(args);
        base.sort();
        return Ok(base.to_gn_string());
    }

    match &settings.args_file {
        Some(args_file) => Ok(format!("import(\"{}\")\n{}", args_file, args.to_gn_string())),
        None => {
            args.sort();
            Ok(args.to_gn_string())
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<GnArgs, GnArgsError> {
        let mut args = GnArgs::new();
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                return Ok(args);
            }

            let ident = self.identifier()?;
            self.skip_trivia();
            if ident == "import" && self.peek() == Some('(') {
                self.pos += 1;
                self.skip_trivia();
                let path = self.string()?;
                self.skip_trivia();
                self.expect(')')?;
                args.imports.push(path);
                continue;
            }

            self.expect('=')?;
            self.skip_trivia();
            let value = self.value()?;
            args.set(ident, value);
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> GnArgsError {
        GnArgsError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, c: char) -> Result<(), GnArgsError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn identifier(&mut self) -> Result<String, GnArgsError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn value(&mut self) -> Result<GnValue, GnArgsError> {
        match self.peek() {
            Some('"') => Ok(GnValue::Str(self.string()?)),
            Some('[') => self.list(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.integer(),
            Some(c) if c.is_ascii_alphabetic() => match self.identifier()?.as_str() {
                "true" => Ok(GnValue::Bool(true)),
                "false" => Ok(GnValue::Bool(false)),
                other => Err(self.error(format!("unsupported value '{}'", other))),
            },
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("expected a value")),
        }
    }

    fn string(&mut self) -> Result<String, GnArgsError> {
        self.expect('"')?;
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') => {
                    self.pos += 1;
                    return Ok(s);
                }
                Some('\\') => {
                    match self.chars.get(self.pos + 1).copied() {
                        Some(next @ ('"' | '$' | '\\')) => {
                            s.push(next);
                            self.pos += 2;
                        }
                        _ => {
                            s.push('\\');
                            self.pos += 1;
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn integer(&mut self) -> Result<GnValue, GnArgsError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map(GnValue::Int)
            .map_err(|_| self.error(format!("invalid integer '{}'", text)))
    }

    fn list(&mut self) -> Result<GnValue, GnArgsError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(GnValue::List(items));
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(gn_args: &str) -> ResolvedSettings {
        ResolvedSettings::from_gn_args(gn_args)
    }

    #[test]
    fn test_sorted_output() {
        let text = render_args(&settings("use_goma=true is_debug=true"), &ArgsExtras::default(), None).unwrap();
        assert_eq!(text, "is_debug = true\nuse_goma = true\n");
    }

    #[test]
    fn test_later_assignment_wins() {
        let args = GnArgs::parse("is_debug=true use_goma=true is_debug=false").unwrap();
        assert_eq!(args.to_gn_string(), "is_debug = false\nuse_goma = true\n");
    }

    #[test]
    fn test_quoted_strings_and_lists() {
        let args = GnArgs::parse(r#"target_os="chromeos" extra_cflags="-O2 -g" tags=["a", "b",] n=-3"#).unwrap();

        assert_eq!(args.string_value("target_os"), Some("chromeos"));
        assert_eq!(args.string_value("extra_cflags"), Some("-O2 -g"));
        assert_eq!(
            args.get("tags"),
            Some(&GnValue::List(vec![GnValue::Str("a".into()), GnValue::Str("b".into())]))
        );
        assert_eq!(args.get("n"), Some(&GnValue::Int(-3)));
        assert_eq!(
            args.to_gn_string(),
            "target_os = \"chromeos\"\nextra_cflags = \"-O2 -g\"\ntags = [ \"a\", \"b\" ]\nn = -3\n"
        );
    }

    #[test]
    fn test_goma_dir_escaped() {
        let extras = ArgsExtras {
            goma_dir: Some("c:\\goma".to_string()),
            ..ArgsExtras::default()
        };
        let text = render_args(&settings("is_debug=true use_goma=true"), &extras, None).unwrap();
        assert_eq!(text, "goma_dir = \"c:\\\\goma\"\nis_debug = true\nuse_goma = true\n");
    }

    #[test]
    fn test_android_versions() {
        let extras = ArgsExtras {
            android_version_code: Some("123".to_string()),
            android_version_name: Some("1.2.3".to_string()),
            ..ArgsExtras::default()
        };
        let text = render_args(&settings(""), &extras, None).unwrap();
        assert_eq!(
            text,
            "android_default_version_code = \"123\"\nandroid_default_version_name = \"1.2.3\"\n"
        );
    }

    #[test]
    fn test_args_file_import_keeps_merged_order() {
        let mut resolved = settings("use_goma=true is_debug=false");
        resolved.args_file = Some("//build/args/fake.gn".to_string());

        let text = render_args(&resolved, &ArgsExtras::default(), None).unwrap();
        assert_eq!(
            text,
            "import(\"//build/args/fake.gn\")\nuse_goma = true\nis_debug = false\n"
        );
    }

    #[test]
    fn test_args_file_only() {
        let resolved = ResolvedSettings::from_args_file("//build/args/bots/fake_master/fake_args_bot.gn");
        let text = render_args(&resolved, &ArgsExtras::default(), None).unwrap();
        assert_eq!(text, "import(\"//build/args/bots/fake_master/fake_args_bot.gn\")\n");
    }

    #[test]
    fn test_inlined_args_file_sorted_and_overridden() {
        let mut resolved = settings("use_goma=true is_debug=false");
        resolved.args_file = Some("//build/args/fake.gn".to_string());
        let imported = GnArgs::parse("# bot args\nis_debug = true\nenable_nacl = false\n").unwrap();

        let text = render_args(&resolved, &ArgsExtras::default(), Some(imported)).unwrap();
        assert_eq!(text, "enable_nacl = false\nis_debug = false\nuse_goma = true\n");
    }

    #[test]
    fn test_parse_args_gn_with_import() {
        let args = GnArgs::parse("import(\"//build/args/fake.gn\")\nuse_goma = true\n").unwrap();
        assert_eq!(args.imports(), ["//build/args/fake.gn".to_string()]);
        assert!(args.is_true("use_goma"));
    }

    #[test]
    fn test_empty_input_renders_empty() {
        assert_eq!(render_args(&settings(""), &ArgsExtras::default(), None).unwrap(), "");
    }

    #[test]
    fn test_rendering_is_stable() {
        let resolved = settings("z=1 a=\"x\" m=true");
        let first = render_args(&resolved, &ArgsExtras::default(), None).unwrap();
        let second = render_args(&resolved, &ArgsExtras::default(), None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(GnArgs::parse("is_debug").is_err());
        assert!(GnArgs::parse("name=\"unterminated").is_err());
        assert!(GnArgs::parse("=true").is_err());
    }
}
