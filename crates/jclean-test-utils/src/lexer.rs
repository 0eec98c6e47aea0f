use jclean_ast::{CommentKind, FrontendError, TextRange, TextRangeExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    Punct,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

pub(crate) const KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "try",
    "void",
    "volatile",
    "while",
    "true",
    "false",
    "null",
];

pub(crate) const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

// Longest first.
const PUNCTUATION: &[&str] = &[
    ">>>=", "<<=", ">>=", ">>>", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=",
    ">=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "(", ")", "{", "}", "[",
    "]", ";", ",", ".", "@", "=", ">", "<", "!", "~", "?", ":", "+", "-", "*", "/", "&", "|",
    "^", "%",
];

pub(crate) struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<(CommentKind, TextRange)>,
}

pub(crate) fn lex(input: &str) -> Result<Lexed, FrontendError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if input[i..].starts_with("//") {
            let end = input[i..]
                .find(['\n', '\r'])
                .map_or(input.len(), |rel| i + rel);
            comments.push((CommentKind::Line, TextRange::from_offsets(i, end)));
            i = end;
            continue;
        }

        if input[i..].starts_with("/*") {
            let Some(rel) = input[i + 2..].find("*/") else {
                return Err(syntax(i, "unterminated comment"));
            };
            let end = i + 2 + rel + 2;
            let text = &input[i..end];
            let kind = if text.starts_with("/**") && text != "/**/" {
                CommentKind::Javadoc
            } else {
                CommentKind::Block
            };
            comments.push((kind, TextRange::from_offsets(i, end)));
            i = end;
            continue;
        }

        if b == b'_' || b == b'$' || b.is_ascii_alphabetic() || !b.is_ascii() {
            let start = i;
            while i < bytes.len() {
                let c = bytes[i];
                if c == b'_' || c == b'$' || c.is_ascii_alphanumeric() || !c.is_ascii() {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                range: TextRange::from_offsets(start, i),
            });
            continue;
        }

        if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            let kind = lex_number(bytes, &mut i);
            tokens.push(Token {
                kind,
                range: TextRange::from_offsets(start, i),
            });
            continue;
        }

        if b == b'"' {
            if input[i..].starts_with("\"\"\"") {
                return Err(FrontendError::Unsupported {
                    offset: i,
                    what: "text block".into(),
                });
            }
            let start = i;
            i = skip_quoted(bytes, i, b'"').ok_or_else(|| syntax(start, "unterminated string"))?;
            tokens.push(Token {
                kind: TokenKind::StringLiteral,
                range: TextRange::from_offsets(start, i),
            });
            continue;
        }

        if b == b'\'' {
            let start = i;
            i = skip_quoted(bytes, i, b'\'').ok_or_else(|| syntax(start, "unterminated char"))?;
            tokens.push(Token {
                kind: TokenKind::CharLiteral,
                range: TextRange::from_offsets(start, i),
            });
            continue;
        }

        let Some(punct) = PUNCTUATION.iter().find(|p| input[i..].starts_with(**p)) else {
            return Err(syntax(i, "unexpected character"));
        };
        tokens.push(Token {
            kind: TokenKind::Punct,
            range: TextRange::from_len(i, punct.len()),
        });
        i += punct.len();
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        range: TextRange::insertion(input.len()),
    });
    Ok(Lexed { tokens, comments })
}

fn lex_number(bytes: &[u8], i: &mut usize) -> TokenKind {
    let hex = bytes[*i] == b'0' && matches!(bytes.get(*i + 1), Some(b'x' | b'X'));
    let mut is_float = false;
    while *i < bytes.len() {
        let c = bytes[*i];
        let exponent = if hex {
            matches!(c, b'p' | b'P')
        } else {
            matches!(c, b'e' | b'E')
        };
        if exponent {
            is_float = true;
            *i += 1;
            if matches!(bytes.get(*i), Some(b'+' | b'-')) {
                *i += 1;
            }
        } else if c == b'.' && !hex && !is_float {
            is_float = true;
            *i += 1;
        } else if c.is_ascii_alphanumeric() || c == b'_' {
            *i += 1;
        } else {
            break;
        }
    }
    match bytes[*i - 1] {
        b'l' | b'L' => TokenKind::LongLiteral,
        b'f' | b'F' if !hex => TokenKind::FloatLiteral,
        b'd' | b'D' if !hex => TokenKind::DoubleLiteral,
        _ if is_float => TokenKind::DoubleLiteral,
        _ => TokenKind::IntLiteral,
    }
}

fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' | b'\r' => return None,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn syntax(offset: usize, message: &str) -> FrontendError {
    FrontendError::Syntax {
        offset,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        let lexed = lex(input).expect("lex");
        lexed
            .tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.range.slice(input)))
            .collect()
    }

    #[test]
    fn numbers_strings_and_operators() {
        assert_eq!(
            kinds("x >>>= 0x1FL + 1.5f - 'c' + \"s\\\"\";"),
            vec![
                (TokenKind::Ident, "x"),
                (TokenKind::Punct, ">>>="),
                (TokenKind::LongLiteral, "0x1FL"),
                (TokenKind::Punct, "+"),
                (TokenKind::FloatLiteral, "1.5f"),
                (TokenKind::Punct, "-"),
                (TokenKind::CharLiteral, "'c'"),
                (TokenKind::Punct, "+"),
                (TokenKind::StringLiteral, "\"s\\\"\""),
                (TokenKind::Punct, ";"),
            ]
        );
    }

    #[test]
    fn comments_are_collected_apart_from_tokens() {
        let input = "/** doc */ /**/ a // tail\r\n/* b */";
        let lexed = lex(input).expect("lex");
        let comments: Vec<_> = lexed
            .comments
            .iter()
            .map(|(kind, range)| (*kind, range.slice(input)))
            .collect();
        assert_eq!(
            comments,
            vec![
                (CommentKind::Javadoc, "/** doc */"),
                (CommentKind::Block, "/**/"),
                (CommentKind::Line, "// tail"),
                (CommentKind::Block, "/* b */"),
            ]
        );
        assert_eq!(lexed.tokens.len(), 2);
    }
}
