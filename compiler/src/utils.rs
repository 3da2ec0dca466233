use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// JSON-style quoting used in error messages.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Upper-cases the first character. ASCII only.
pub fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
    }
}

/// Lower-cases the first character. ASCII only.
pub fn untitle(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
    }
}

/// `*Apple` -> `Apple`. Only one level is removed.
pub fn strip_pointer(type_: &str) -> &str {
    type_.trim().strip_prefix('*').unwrap_or(type_.trim()).trim()
}

pub fn is_pointer(type_: &str) -> bool {
    type_.trim().starts_with('*')
}

/// The bare type name with pointer, package qualifier and generic arguments removed:
/// `*pkg.Box[T]` -> `Box`.
pub fn base_type_name(type_: &str) -> &str {
    let bare = strip_pointer(type_);
    let bare = match bare.find('[') {
        Some(i) => &bare[..i],
        None => bare,
    };
    match bare.rfind('.') {
        Some(i) => &bare[i + 1..],
        None => bare,
    }
}

/// Splits on commas that are not nested inside `()`, `[]` or `{}`.
/// Every part is trimmed; an empty input yields no parts.
pub fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Members of a tuple type: `(A, B)` -> `[A, B]`, `A, B` -> `[A, B]`, `A` -> `[A]`.
pub fn tuple_members(type_: &str) -> Vec<String> {
    let trimmed = type_.trim();
    let inner = if trimmed.starts_with('(') && matching_close(trimmed, 0) == Some(trimmed.len() - 1) {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    split_top_level(inner)
}

/// Index of the bracket closing the one opened at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Prefixes every non-empty line with one tab.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("\t{}", line) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders `text` as `// ` comment lines.
pub fn comment_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| if line.trim().is_empty() { "//".to_string() } else { format!("// {}", line) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("*Apple"), "Apple");
        assert_eq!(base_type_name("fruit.Apple"), "Apple");
        assert_eq!(base_type_name("*Box[T, U]"), "Box");
        assert_eq!(base_type_name(" Orange "), "Orange");
    }

    #[test]
    fn test_title_untitle_ascii() {
        assert_eq!(title("apple"), "Apple");
        assert_eq!(untitle("Apple"), "apple");
        assert_eq!(untitle(""), "");
        assert_eq!(title("élan"), "élan");
    }

    #[test]
    fn test_tuple_members() {
        assert_eq!(tuple_members("(int, error)"), vec!["int", "error"]);
        assert_eq!(tuple_members("int, error"), vec!["int", "error"]);
        assert_eq!(tuple_members("map[string]int"), vec!["map[string]int"]);
        assert_eq!(tuple_members("func(a, b int) bool"), vec!["func(a, b int) bool"]);
        assert_eq!(tuple_members("(func(a int), error)"), vec!["func(a int)", "error"]);
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb"), "\ta\n\n\tb");
    }
}
