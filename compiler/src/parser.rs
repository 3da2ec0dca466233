use crate::{
    error::ConvertError,
    tokenizer::{parse_error, tokenize_signature, Token},
    types::{FunctionSignature, Param, TypeParam},
    utils::quote,
};

/// Tokens that start a type rather than name a parameter.
const TYPE_KEYWORDS: [&str; 5] = ["chan", "func", "map", "struct", "interface"];

/// Parses `[func] [(recv T)] Name[TypeParams](params) [results]`.
pub fn parse_signature(text: &str) -> Result<FunctionSignature, ConvertError> {
    let tokens = tokenize_signature(text)?;
    let mut parser = Parser { text, tokens: &tokens, index: 0 };
    parser.signature()
}

enum Item {
    /// A lone identifier: a type in an unnamed list, a grouped name otherwise.
    Bare(String),
    Named(String, String),
    Type(String),
}

struct Parser<'a> {
    text:   &'a str,
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    fn peek_is(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.text == text)
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.peek_is(text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn column(&self) -> usize {
        match self.peek() {
            Some(tok) => tok.column(),
            None => self.text.len() + 1,
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(tok) => quote(&tok.text),
            None => "end of signature".to_string(),
        }
    }

    fn signature(&mut self) -> Result<FunctionSignature, ConvertError> {
        self.eat("func");

        let receiver = if self.peek_is("(") {
            let column = self.column();
            let (start, end) = self.group()?;
            let mut params = self.params(start, end)?;
            if params.len() != 1 {
                return Err(parse_error("Expected exactly one receiver".to_string(), column));
            }
            params.pop()
        } else {
            None
        };

        let name = match self.peek() {
            Some(tok) if tok.is_identifier() => tok.text.clone(),
            _ => {
                return Err(parse_error(
                    format!("Expected function name but found {}", self.found()),
                    self.column(),
                ))
            }
        };
        self.index += 1;

        let mut type_params = Vec::new();
        if self.peek_is("[") {
            let column = self.column();
            let (start, end) = self.group()?;
            for param in self.params(start, end)? {
                if param.name.is_empty() {
                    return Err(parse_error(
                        format!("Type parameter {} has no constraint", quote(&param.type_)),
                        column,
                    ));
                }
                type_params.push(TypeParam { name: param.name, constraint: param.type_ });
            }
        }

        if !self.peek_is("(") {
            return Err(parse_error(format!("Expected \"(\" but found {}", self.found()), self.column()));
        }
        let (start, end) = self.group()?;
        let args = self.params(start, end)?;

        let results = match self.peek() {
            None => Vec::new(),
            Some(tok) if tok.text == "(" => {
                let (start, end) = self.group()?;
                let results = self.params(start, end)?;
                if self.peek().is_some() {
                    return Err(parse_error(format!("Unexpected token {}", self.found()), self.column()));
                }
                results
            }
            Some(tok) => {
                let last = &self.tokens[self.tokens.len() - 1];
                self.index = self.tokens.len();
                vec![Param::new("", &self.text[tok.start..last.end])]
            }
        };

        Ok(FunctionSignature { name, type_params, args, results, receiver, comment: String::new() })
    }

    /// Consumes a bracketed group starting at the current token and returns the
    /// token range strictly inside it.
    fn group(&mut self) -> Result<(usize, usize), ConvertError> {
        let open_index = self.index;
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open_index) {
            match tok.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth == 0 {
                        self.index = i + 1;
                        return Ok((open_index + 1, i));
                    }
                }
                _ => {}
            }
        }
        Err(parse_error(
            format!("Unclosed {}", quote(&self.tokens[open_index].text)),
            self.tokens[open_index].column(),
        ))
    }

    fn span(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.tokens[start].start..self.tokens[end - 1].end]
    }

    fn item(&self, start: usize, end: usize) -> Item {
        let first = &self.tokens[start];
        if end - start == 1 {
            return if first.is_identifier() {
                Item::Bare(first.text.clone())
            } else {
                Item::Type(first.text.clone())
            };
        }
        let second = &self.tokens[start + 1];
        let named = first.is_identifier()
            && !TYPE_KEYWORDS.contains(&first.text.as_str())
            && second.start > first.end;
        if named {
            Item::Named(first.text.clone(), self.span(start + 1, end).to_string())
        } else {
            Item::Type(self.span(start, end).to_string())
        }
    }

    /// Parses a comma separated parameter list with Go's grouping rule:
    /// either every parameter is named (`a, b int`) or none is.
    fn params(&self, start: usize, end: usize) -> Result<Vec<Param>, ConvertError> {
        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut item_start = start;
        for i in start..end {
            match self.tokens[i].text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                "," if depth == 0 => {
                    if i == item_start {
                        return Err(parse_error("Empty parameter".to_string(), self.tokens[i].column()));
                    }
                    items.push((item_start, self.item(item_start, i)));
                    item_start = i + 1;
                }
                _ => {}
            }
        }
        if item_start < end {
            items.push((item_start, self.item(item_start, end)));
        }

        let any_named = items.iter().any(|(_, item)| matches!(item, Item::Named(..)));
        if !any_named {
            return Ok(items
                .into_iter()
                .map(|(_, item)| match item {
                    Item::Bare(t) | Item::Type(t) | Item::Named(_, t) => Param::new("", &t),
                })
                .collect());
        }

        let mut params = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for (at, item) in items {
            match item {
                Item::Bare(name) => pending.push(name),
                Item::Named(name, type_) => {
                    for grouped in pending.drain(..) {
                        params.push(Param::new(&grouped, &type_));
                    }
                    params.push(Param::new(&name, &type_));
                }
                Item::Type(type_) => {
                    return Err(parse_error(
                        format!("Mixed named and unnamed parameters near {}", quote(&type_)),
                        self.tokens[at].column(),
                    ))
                }
            }
        }
        if let Some(name) = pending.first() {
            return Err(parse_error(
                format!("Missing type for parameter {}", quote(name)),
                self.tokens[end.saturating_sub(1)].column(),
            ));
        }
        Ok(params)
    }
}
