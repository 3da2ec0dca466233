//! `$`-token substitution.
//!
//! A template is copied verbatim except for `$` tokens, which are handed to a
//! [`Resolve`] implementation:
//!
//! | token            | resolver method            |
//! |------------------|----------------------------|
//! | `$`              | `single`                   |
//! | `$0`             | `by_index` (one digit)     |
//! | `$name`          | `by_name`, longest prefix  |
//! | `$0.1`, `$name.1`| `tuple_by_index/_by_name`  |
//! | `$name.Field`    | `field_by_name`            |
//! | `<token>.$kw`    | `modifier`, chained        |
//! | `$(token)`       | same as `$token`, `.$kw` may follow |
//!
//! Text inside `'...'`, `"..."` and `` `...` `` is never scanned for tokens.

use crate::error::ConvertError;
use crate::utils::{is_ident_char, title, untitle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Single,
    Index(usize),
    Name(String),
}

/// A parsed token. `modifiers` holds the keywords applied so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    pub head:      Head,
    pub item:      Option<usize>,
    pub field:     Option<String>,
    pub modifiers: Vec<String>,
}

impl TokenRef {
    pub fn name(&self) -> Option<&str> {
        match &self.head {
            Head::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self.head {
            Head::Index(i) => Some(i),
            _ => None,
        }
    }
}

/// Resolver callbacks. Every method declines by default.
pub trait Resolve {
    fn single(&self) -> Option<String> {
        None
    }

    fn by_index(&self, _index: usize) -> Option<String> {
        None
    }

    fn by_name(&self, _name: &str) -> Option<String> {
        None
    }

    fn tuple_by_index(&self, _index: usize, _item: usize) -> Option<String> {
        None
    }

    fn tuple_by_name(&self, _name: &str, _item: usize) -> Option<String> {
        None
    }

    fn field_by_name(&self, _name: &str, _field: &str) -> Option<String> {
        None
    }

    /// Applies `keyword` to the value resolved so far for `token`.
    fn modifier(&self, _token: &TokenRef, _value: &str, _keyword: &str) -> Option<String> {
        None
    }
}

impl<T: Resolve + ?Sized> Resolve for &T {
    fn single(&self) -> Option<String> {
        (**self).single()
    }

    fn by_index(&self, index: usize) -> Option<String> {
        (**self).by_index(index)
    }

    fn by_name(&self, name: &str) -> Option<String> {
        (**self).by_name(name)
    }

    fn tuple_by_index(&self, index: usize, item: usize) -> Option<String> {
        (**self).tuple_by_index(index, item)
    }

    fn tuple_by_name(&self, name: &str, item: usize) -> Option<String> {
        (**self).tuple_by_name(name, item)
    }

    fn field_by_name(&self, name: &str, field: &str) -> Option<String> {
        (**self).field_by_name(name, field)
    }

    fn modifier(&self, token: &TokenRef, value: &str, keyword: &str) -> Option<String> {
        (**self).modifier(token, value, keyword)
    }
}

/// Tries `.0` first, then `.1`, method by method.
pub struct Chain<A, B>(pub A, pub B);

impl<A: Resolve, B: Resolve> Resolve for Chain<A, B> {
    fn single(&self) -> Option<String> {
        self.0.single().or_else(|| self.1.single())
    }

    fn by_index(&self, index: usize) -> Option<String> {
        self.0.by_index(index).or_else(|| self.1.by_index(index))
    }

    fn by_name(&self, name: &str) -> Option<String> {
        self.0.by_name(name).or_else(|| self.1.by_name(name))
    }

    fn tuple_by_index(&self, index: usize, item: usize) -> Option<String> {
        self.0.tuple_by_index(index, item).or_else(|| self.1.tuple_by_index(index, item))
    }

    fn tuple_by_name(&self, name: &str, item: usize) -> Option<String> {
        self.0.tuple_by_name(name, item).or_else(|| self.1.tuple_by_name(name, item))
    }

    fn field_by_name(&self, name: &str, field: &str) -> Option<String> {
        self.0.field_by_name(name, field).or_else(|| self.1.field_by_name(name, field))
    }

    fn modifier(&self, token: &TokenRef, value: &str, keyword: &str) -> Option<String> {
        self.0
            .modifier(token, value, keyword)
            .or_else(|| self.1.modifier(token, value, keyword))
    }
}

/// Resolves nothing. Replacing with it succeeds only for token-free templates.
pub struct NoTokens;

impl Resolve for NoTokens {}

/// Replaces every `$` token in `template`.
pub fn replace(template: &str, resolver: &impl Resolve) -> Result<String, ConvertError> {
    Scanner { text: template, source: template, resolver }.run()
}

fn builtin_modifier(value: &str, keyword: &str) -> Option<String> {
    match keyword {
        "title" => Some(title(value)),
        "untitle" => Some(untitle(value)),
        _ => None,
    }
}

struct Scanner<'t, R> {
    text:     &'t str,
    /// Template reported in errors; differs from `text` inside `$(...)`.
    source:   &'t str,
    resolver: &'t R,
}

impl<'t, R: Resolve> Scanner<'t, R> {
    fn run(&self) -> Result<String, ConvertError> {
        let bytes = self.text.as_bytes();
        let mut out = String::with_capacity(self.text.len());
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' | b'"' => i = self.skip_quoted(i)?,
                b'`' => i = self.skip_raw(i)?,
                b'$' => {
                    out.push_str(&self.text[literal_start..i]);
                    let (value, end) = self.token(i)?;
                    out.push_str(&value);
                    i = end;
                    literal_start = i;
                }
                _ => i += 1,
            }
        }
        out.push_str(&self.text[literal_start..]);
        Ok(out)
    }

    fn unterminated(&self, offset: usize) -> ConvertError {
        ConvertError::UnterminatedString { template: self.source.to_string(), offset }
    }

    fn unresolved(&self, token: &str) -> ConvertError {
        ConvertError::UnresolvedToken {
            template: self.source.to_string(),
            token:    token.to_string(),
        }
    }

    /// `'...'` or `"..."`; a backslash always consumes the next byte.
    fn skip_quoted(&self, open: usize) -> Result<usize, ConvertError> {
        let bytes = self.text.as_bytes();
        let quote = bytes[open];
        let mut j = open + 1;
        while j < bytes.len() {
            if bytes[j] == b'\\' {
                j += 2;
            } else if bytes[j] == quote {
                return Ok(j + 1);
            } else {
                j += 1;
            }
        }
        Err(self.unterminated(open))
    }

    /// `` `...` ``, no escapes.
    fn skip_raw(&self, open: usize) -> Result<usize, ConvertError> {
        match self.text[open + 1..].find('`') {
            Some(rel) => Ok(open + 1 + rel + 1),
            None => Err(self.unterminated(open)),
        }
    }

    fn ident_end(&self, start: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut j = start;
        while j < bytes.len() && is_ident_char(bytes[j] as char) {
            j += 1;
        }
        j
    }

    /// Resolves the token starting at `at` (a `$`), returning its value and end offset.
    fn token(&self, at: usize) -> Result<(String, usize), ConvertError> {
        let (token, value, end) = self.head(at)?;
        let (_, value, end) = self.modifiers(at, token, value, end)?;
        Ok((value, end))
    }

    /// The token at `at` up to its first `.$` modifier.
    fn head(&self, at: usize) -> Result<(TokenRef, String, usize), ConvertError> {
        let bytes = self.text.as_bytes();
        let mut j = at + 1;

        if j < bytes.len() && bytes[j] == b'(' {
            return self.parenthesized(j);
        }

        let head = if j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            Head::Index((bytes[j - 1] - b'0') as usize)
        } else if j < bytes.len() && (bytes[j].is_ascii_alphabetic() || bytes[j] == b'_') {
            let end = self.ident_end(j);
            let name = self.text[j..end].to_string();
            j = end;
            Head::Name(name)
        } else {
            Head::Single
        };

        let mut token = TokenRef { head, item: None, field: None, modifiers: Vec::new() };
        let mut value = None;
        let dot_follows = j + 1 < bytes.len() && bytes[j] == b'.';

        if dot_follows && token.head != Head::Single && bytes[j + 1].is_ascii_digit() {
            let mut end = j + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            token.item = self.text[j + 1..end].parse().ok();
            j = end;
        } else if dot_follows && (bytes[j + 1].is_ascii_alphabetic() || bytes[j + 1] == b'_') {
            if let Some(name) = token.name() {
                let end = self.ident_end(j + 1);
                let field = &self.text[j + 1..end];
                if let Some(v) = self.resolver.field_by_name(name, field) {
                    token.field = Some(field.to_string());
                    value = Some(v);
                    j = end;
                }
            }
        }

        let value = match value {
            Some(v) => Some(v),
            None => match (token.head.clone(), token.item) {
                (Head::Single, _) => self.resolver.single(),
                (Head::Index(i), None) => self.resolver.by_index(i),
                (Head::Index(i), Some(m)) => self.resolver.tuple_by_index(i, m),
                (Head::Name(n), None) => self.longest_name(&n, &mut token, &mut j),
                (Head::Name(n), Some(m)) => self.resolver.tuple_by_name(&n, m),
            },
        };
        let value = value.ok_or_else(|| self.unresolved(&self.text[at..j]))?;
        Ok((token, value, j))
    }

    /// Applies the `.$keyword` chain following offset `j`.
    fn modifiers(
        &self,
        at: usize,
        mut token: TokenRef,
        mut value: String,
        mut j: usize,
    ) -> Result<(TokenRef, String, usize), ConvertError> {
        let bytes = self.text.as_bytes();
        while j + 1 < bytes.len() && bytes[j] == b'.' && bytes[j + 1] == b'$' {
            let end = self.ident_end(j + 2);
            let keyword = &self.text[j + 2..end];
            value = self
                .resolver
                .modifier(&token, &value, keyword)
                .or_else(|| builtin_modifier(&value, keyword))
                .ok_or_else(|| self.unresolved(&self.text[at..end]))?;
            token.modifiers.push(keyword.to_string());
            j = end;
        }

        Ok((token, value, j))
    }

    /// Resolves `name`, or failing that its longest resolvable prefix; the
    /// rest of the identifier is left as literal text (`$FromTo` -> `$From` + `To`).
    fn longest_name(&self, name: &str, token: &mut TokenRef, end: &mut usize) -> Option<String> {
        if let Some(v) = self.resolver.by_name(name) {
            return Some(v);
        }
        let start = *end - name.len();
        for len in (1..name.len()).rev() {
            if let Some(v) = self.resolver.by_name(&name[..len]) {
                token.head = Head::Name(name[..len].to_string());
                *end = start + len;
                return Some(v);
            }
        }
        None
    }

    /// `$(expr)`: `open` points at the `(`. Modifiers may follow the `)`.
    fn parenthesized(&self, open: usize) -> Result<(TokenRef, String, usize), ConvertError> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut close = None;
        for (k, b) in bytes.iter().enumerate().skip(open) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(k);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| ConvertError::UnbalancedParens {
            template: self.source.to_string(),
            offset:   open,
        })?;

        let inner = &self.text[open + 1..close];
        let expr = format!("${}", inner);
        let sub = Scanner { text: &expr, source: self.source, resolver: self.resolver };
        let (token, value, end) = sub.head(0)?;
        let (token, value, end) = sub.modifiers(0, token, value, end)?;
        if end != expr.len() {
            return Err(self.unresolved(&format!("$({})", inner)));
        }
        Ok((token, value, close + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapResolver {
        names:  HashMap<&'static str, &'static str>,
        index:  Vec<&'static str>,
        fields: HashMap<(&'static str, &'static str), &'static str>,
        single: Option<&'static str>,
    }

    impl Resolve for MapResolver {
        fn single(&self) -> Option<String> {
            self.single.map(String::from)
        }

        fn by_index(&self, index: usize) -> Option<String> {
            self.index.get(index).map(|s| s.to_string())
        }

        fn by_name(&self, name: &str) -> Option<String> {
            self.names.get(name).map(|s| s.to_string())
        }

        fn tuple_by_name(&self, name: &str, item: usize) -> Option<String> {
            (name == "pair").then(|| format!("_pair_{}", item))
        }

        fn field_by_name(&self, name: &str, field: &str) -> Option<String> {
            let key = self.fields.keys().find(|(n, f)| *n == name && *f == field)?;
            Some(self.fields[key].to_string())
        }

        fn modifier(&self, token: &TokenRef, value: &str, keyword: &str) -> Option<String> {
            match keyword {
                "" => Some(format!("{}.Field", value)),
                "type" if token.field.is_some() => Some("FieldType".to_string()),
                "type" => Some(format!("T({})", token.name().unwrap_or("?"))),
                _ => None,
            }
        }
    }

    fn resolver() -> MapResolver {
        let mut r = MapResolver::default();
        r.names.insert("a", "left");
        r.names.insert("b", "right");
        r.index = vec!["zero", "one"];
        r.fields.insert(("a", "Size"), "left.Size");
        r.single = Some("Fn");
        r
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let text = "x := y + z // no tokens here";
        assert_eq!(replace(text, &NoTokens).unwrap(), text);
    }

    #[test]
    fn test_basic_tokens() {
        let r = resolver();
        assert_eq!(replace("$a == $b", &r).unwrap(), "left == right");
        assert_eq!(replace("$0 $1", &r).unwrap(), "zero one");
        assert_eq!(replace("$ is $", &r).unwrap(), "Fn is Fn");
        assert_eq!(replace("$pair.1", &r).unwrap(), "_pair_1");
    }

    #[test]
    fn test_longest_resolvable_name_wins() {
        let mut r = resolver();
        r.names.insert("ab", "both");
        assert_eq!(replace("$ab", &r).unwrap(), "both");
        assert_eq!(replace("$abc", &r).unwrap(), "bothc");
        assert_eq!(replace("$aSuffix", &r).unwrap(), "leftSuffix");
        assert!(replace("$zzz", &r).is_err());
    }

    #[test]
    fn test_single_digit_index_limit() {
        let r = resolver();
        assert_eq!(replace("$10", &r).unwrap(), "one0");
    }

    #[test]
    fn test_modifiers_chain() {
        let r = resolver();
        assert_eq!(replace("$a.$", &r).unwrap(), "left.Field");
        assert_eq!(replace("$a.$type", &r).unwrap(), "T(a)");
        assert_eq!(replace("$a.$title", &r).unwrap(), "Left");
        assert_eq!(replace("$a.$type.$untitle", &r).unwrap(), "t(a)");
        assert_eq!(replace("$a.$.Method()", &r).unwrap(), "left.Field.Method()");
    }

    #[test]
    fn test_field_by_name_and_fallthrough() {
        let r = resolver();
        assert_eq!(replace("$a.Size", &r).unwrap(), "left.Size");
        assert_eq!(replace("$a.Size.$type", &r).unwrap(), "FieldType");
        // Unknown field: only `$a` is a token.
        assert_eq!(replace("$a.Other", &r).unwrap(), "left.Other");
    }

    #[test]
    fn test_parenthesized_token() {
        let r = resolver();
        assert_eq!(replace("$(a)Suffix", &r).unwrap(), "leftSuffix");
        assert_eq!(replace("$(a.$title)Box", &r).unwrap(), "LeftBox");
        assert!(replace("$(a)$title", &r).is_err());
        assert_eq!(replace("$(a).$title", &r).unwrap(), "Left");
        assert_eq!(replace("$(a).$title.$untitle", &r).unwrap(), "left");
    }

    #[test]
    fn test_string_literals_are_opaque() {
        let r = resolver();
        assert_eq!(replace(r#"$a + "$b""#, &r).unwrap(), r#"left + "$b""#);
        assert_eq!(replace(r#"'$' "a\"$b" $b"#, &r).unwrap(), r#"'$' "a\"$b" right"#);
        assert_eq!(replace("`$a\\` $b", &r).unwrap(), "`$a\\` right");
    }

    #[test]
    fn test_unresolved_token_names_template_and_token() {
        let r = resolver();
        let err = replace("x = $missing + 1", &r).unwrap_err();
        match err {
            ConvertError::UnresolvedToken { template, token } => {
                assert_eq!(template, "x = $missing + 1");
                assert_eq!(token, "$missing");
            }
            other => panic!("unexpected error {:?}", other),
        }
        let err = replace("$a.$bogus", &r).unwrap_err();
        assert!(matches!(err, ConvertError::UnresolvedToken { token, .. } if token == "$a.$bogus"));
        assert!(replace("$", &NoTokens).is_err());
    }

    #[test]
    fn test_unterminated_and_unbalanced() {
        let r = resolver();
        assert!(matches!(
            replace("x = \"abc", &r),
            Err(ConvertError::UnterminatedString { offset: 4, .. })
        ));
        assert!(matches!(replace("x = `abc", &r), Err(ConvertError::UnterminatedString { .. })));
        assert!(matches!(replace("$(a", &r), Err(ConvertError::UnbalancedParens { offset: 1, .. })));
    }

    #[test]
    fn test_chain_falls_back() {
        let mut first = MapResolver::default();
        first.names.insert("a", "first");
        let chained = Chain(first, resolver());
        assert_eq!(replace("$a $b", &chained).unwrap(), "first right");
    }
}
