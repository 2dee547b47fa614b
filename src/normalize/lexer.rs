//! Just enough of a JS/JSX tokenizer to find statement boundaries.
//!
//! A quote only opens a string where an expression can start (after `=`,
//! `(`, `return`, ...) and only when it closes on the same line. Anywhere else
//! it is punctuation, so apostrophes inside JSX text (`{name}'s pick`,
//! `Don't miss`) never hide the brackets that follow them. Unterminated
//! templates and block comments degrade the same way.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Str,
    Template,
    Comment,
    Punct,
    Space,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Newline | TokenKind::Comment)
    }

    pub fn is_punct(&self, src: &str, c: char) -> bool {
        self.kind == TokenKind::Punct && src[self.start..].starts_with(c)
    }

    pub fn is_word(&self, src: &str, w: &str) -> bool {
        self.kind == TokenKind::Word && self.text(src) == w
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Keywords after which an expression, and so a string literal, may follow.
const EXPRESSION_KEYWORDS: [&str; 17] = [
    "return", "typeof", "case", "in", "of", "yield", "await", "else", "do", "void", "delete", "new", "throw",
    "from", "import", "export", "default",
];

/// Punctuation after which an expression may follow. `>` is absent so text
/// right after a JSX tag never opens a string.
const EXPRESSION_PUNCT: [char; 18] = [
    '=', '(', ',', '{', '[', ':', '?', ';', '+', '-', '*', '%', '&', '|', '!', '~', '^', '<',
];

fn quote_can_open(src: &str, prev: Option<&Token>) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::Word => EXPRESSION_KEYWORDS.contains(&prev.text(src)),
        TokenKind::Punct => prev.text(src).chars().next().is_some_and(|c| EXPRESSION_PUNCT.contains(&c)),
        _ => false,
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Scans a '/"-quoted string that starts at `pos`; `None` when it does not close on the line.
    fn scan_quoted(&self, quote: char) -> Option<usize> {
        let mut chars = self.src[self.pos..].char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '\n' => return None,
                c if c == quote => return Some(self.pos + i + c.len_utf8()),
                _ => {}
            }
        }
        None
    }

    fn scan_template(&self) -> Option<usize> {
        let mut chars = self.src[self.pos..].char_indices().skip(1).peekable();
        let mut depth = 0usize;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '$' if depth == 0 && chars.peek().map(|(_, n)| *n) == Some('{') => {
                    chars.next();
                    depth = 1;
                }
                '{' if depth > 0 => depth += 1,
                '}' if depth > 0 => depth -= 1,
                '`' if depth == 0 => return Some(self.pos + i + 1),
                _ => {}
            }
        }
        None
    }
}

pub fn tokenize(src: &str) -> Vec<Token> {
    let mut cur = Cursor { src, pos: 0 };
    let mut out: Vec<Token> = Vec::new();
    let mut prev_sig: Option<Token> = None;

    while let Some(c) = cur.peek() {
        let start = cur.pos;
        let kind = match c {
            '\n' => {
                cur.bump();
                TokenKind::Newline
            }
            c if c.is_whitespace() => {
                cur.eat_while(|c| c.is_whitespace() && c != '\n');
                TokenKind::Space
            }
            c if is_word_char(c) => {
                cur.eat_while(is_word_char);
                TokenKind::Word
            }
            '/' if cur.peek_second() == Some('/') => {
                cur.eat_while(|c| c != '\n');
                TokenKind::Comment
            }
            '/' if cur.peek_second() == Some('*') => {
                match src[start + 2..].find("*/") {
                    Some(i) => cur.pos = start + 2 + i + 2,
                    None => cur.pos = src.len(),
                }
                TokenKind::Comment
            }
            '\'' | '"' => match cur.scan_quoted(c).filter(|_| quote_can_open(src, prev_sig.as_ref())) {
                Some(end) => {
                    cur.pos = end;
                    TokenKind::Str
                }
                None => {
                    cur.bump();
                    TokenKind::Punct
                }
            },
            '`' => match cur.scan_template() {
                Some(end) => {
                    cur.pos = end;
                    TokenKind::Template
                }
                None => {
                    cur.bump();
                    TokenKind::Punct
                }
            },
            _ => {
                cur.bump();
                TokenKind::Punct
            }
        };
        let tok = Token { kind, start, end: cur.pos };
        if !tok.is_trivia() {
            prev_sig = Some(tok);
        }
        out.push(tok);
    }
    out
}
