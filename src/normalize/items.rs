//! Top-level statement view of a component module.
//!
//! A new item starts at a depth-0 `import`/`export`/declaration keyword that
//! opens a line or follows a `;`. Everything else (JSX, expressions, prose)
//! stays attached to the item before it, so concatenating item spans always
//! reproduces the input.
//!
//! Stray brackets in JSX text (`<span>:)</span>`) make depth meaningless.
//! When the brackets do not pair up, items start only at column-0 keywords.

use std::ops::Range;

use super::lexer::{tokenize, Token, TokenKind};

const STARTERS: [&str; 8] = ["import", "export", "const", "let", "var", "function", "class", "async"];

const NOT_IDENTIFIERS: [&str; 12] = [
    "function", "class", "async", "new", "await", "typeof", "void", "this", "null", "true", "false", "undefined",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub binding: Binding,
    pub exported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultTarget {
    /// `export default Name` or `export { Name as default }`.
    Ident(Binding),
    Function { name: Option<Binding>, keyword: Range<usize> },
    Class { name: Option<Binding>, keyword: Range<usize> },
    Expression { start: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExport {
    pub target: DefaultTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub default_binding: Option<Binding>,
    pub namespace: Option<Binding>,
    /// The `{ ... }` specifier list, braces included.
    pub named: Option<Range<usize>>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Import(Import),
    DefaultExport(DefaultExport),
    Declaration(Declaration),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Whole segment, up to the next item.
    pub span: Range<usize>,
    /// End of the statement itself; trailing markup in the segment lies beyond it.
    pub stmt_end: usize,
    pub kind: ItemKind,
}

impl Item {
    pub fn statement(&self) -> Range<usize> {
        self.span.start..self.stmt_end
    }
}

pub struct Module<'a> {
    pub src: &'a str,
    pub tokens: Vec<Token>,
    pub items: Vec<Item>,
}

impl<'a> Module<'a> {
    pub fn parse(src: &'a str) -> Self {
        let tokens = tokenize(src);
        let bounds = segment_bounds(src, &tokens);
        let mut items = Vec::with_capacity(bounds.len());
        for (i, &(tok_from, tok_to)) in bounds.iter().enumerate() {
            let start = if i == 0 { 0 } else { tokens[tok_from].start };
            let end = bounds.get(i + 1).map(|&(next, _)| tokens[next].start).unwrap_or(src.len());
            let seg = &tokens[tok_from..tok_to];
            let (kind, stmt_end) = classify(src, seg, start);
            items.push(Item { span: start..end, stmt_end, kind });
        }
        Self { src, tokens, items }
    }

    pub fn imports(&self) -> impl Iterator<Item = (&Item, &Import)> {
        self.items.iter().filter_map(|it| match &it.kind {
            ItemKind::Import(imp) => Some((it, imp)),
            _ => None,
        })
    }

    pub fn default_exports(&self) -> impl Iterator<Item = (&Item, &DefaultExport)> {
        self.items.iter().filter_map(|it| match &it.kind {
            ItemKind::DefaultExport(d) => Some((it, d)),
            _ => None,
        })
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&Item, &Declaration)> {
        self.items.iter().filter_map(|it| match &it.kind {
            ItemKind::Declaration(d) => Some((it, d)),
            _ => None,
        })
    }

    pub fn declaration_named(&self, name: &str) -> Option<&Declaration> {
        self.declarations().map(|(_, d)| d).find(|d| d.binding.name == name)
    }

    /// Spans of `name` used as a JSX tag, opening (`<name`) or closing (`</name`).
    pub fn element_tags(&self, name: &str) -> Vec<Range<usize>> {
        let t = &self.tokens;
        let mut out = Vec::new();
        for i in 0..t.len() {
            if !t[i].is_punct(self.src, '<') {
                continue;
            }
            let mut j = i + 1;
            if t.get(j).is_some_and(|x| x.is_punct(self.src, '/')) {
                j += 1;
            }
            if let Some(w) = t.get(j).filter(|w| w.is_word(self.src, name)) {
                out.push(w.start..w.end);
            }
        }
        out
    }

    /// True when `name` is rendered as a JSX element outside `skip`.
    pub fn renders_element(&self, name: &str, skip: &Range<usize>) -> bool {
        self.element_tags(name).iter().any(|r| !skip.contains(&r.start))
    }
}

/// Token index ranges, one per item. The first item always starts at token 0.
fn segment_bounds(src: &str, tokens: &[Token]) -> Vec<(usize, usize)> {
    match bracket_starts(src, tokens) {
        Some(starts) => ranges(starts, tokens.len()),
        None => {
            log::debug!("normalize: unbalanced brackets, splitting items at column 0");
            ranges(column_starts(src, tokens), tokens.len())
        }
    }
}

fn ranges(starts: Vec<usize>, len: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(starts.len());
    for (n, &s) in starts.iter().enumerate() {
        let e = starts.get(n + 1).copied().unwrap_or(len);
        out.push((s, e));
    }
    out
}

fn closer_for(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

/// Item starts by bracket depth; `None` when a bracket is unmatched or mismatched.
fn bracket_starts(src: &str, tokens: &[Token]) -> Option<Vec<usize>> {
    let mut starts = vec![0usize];
    let mut open: Vec<&str> = Vec::new();
    let mut line_start = true;
    let mut prev_sig: Option<&Token> = None;

    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::Newline => {
                line_start = true;
                continue;
            }
            TokenKind::Space | TokenKind::Comment => continue,
            _ => {}
        }
        let after_semicolon = prev_sig.is_some_and(|p| p.is_punct(src, ';'));
        if open.is_empty() && i > 0 && (line_start || after_semicolon) && opens_statement(src, tokens, i) {
            starts.push(i);
        }
        if tok.kind == TokenKind::Punct {
            match tok.text(src) {
                t @ ("{" | "(" | "[") => open.push(t),
                t @ ("}" | ")" | "]") => {
                    if open.pop().map_or(true, |o| closer_for(o) != t) {
                        return None;
                    }
                }
                _ => {}
            }
        }
        line_start = false;
        prev_sig = Some(tok);
    }
    open.is_empty().then_some(starts)
}

fn at_column_zero(src: &str, tok: &Token) -> bool {
    tok.start == 0 || src.as_bytes()[tok.start - 1] == b'\n'
}

/// Item starts at statement keywords in the first column, ignoring depth.
fn column_starts(src: &str, tokens: &[Token]) -> Vec<usize> {
    let mut starts = vec![0usize];
    starts.extend((1..tokens.len()).filter(|&i| at_column_zero(src, &tokens[i]) && opens_statement(src, tokens, i)));
    starts
}

fn next_sig(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&j| !tokens[j].is_trivia())
}

fn opens_statement(src: &str, tokens: &[Token], i: usize) -> bool {
    let tok = &tokens[i];
    if tok.kind != TokenKind::Word || !STARTERS.contains(&tok.text(src)) {
        return false;
    }
    let next = next_sig(tokens, i + 1).map(|j| &tokens[j]);
    match tok.text(src) {
        "async" => next.is_some_and(|n| n.is_word(src, "function")),
        // dynamic import() and import.meta are expressions
        "import" => !next.is_some_and(|n| n.is_punct(src, '(') || n.is_punct(src, '.')),
        _ => true,
    }
}

fn is_identifier(src: &str, tok: &Token) -> bool {
    tok.kind == TokenKind::Word
        && !NOT_IDENTIFIERS.contains(&tok.text(src))
        && tok.text(src).chars().next().is_some_and(|c| !c.is_ascii_digit())
}

fn binding(src: &str, tok: &Token) -> Binding {
    Binding { name: tok.text(src).to_string(), span: tok.start..tok.end }
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn classify(src: &str, seg: &[Token], seg_start: usize) -> (ItemKind, usize) {
    let sig: Vec<&Token> = seg.iter().filter(|t| !t.is_trivia()).collect();
    let Some(first) = sig.first() else {
        return (ItemKind::Other, seg_start);
    };
    let word = |k: usize| sig.get(k).filter(|t| t.kind == TokenKind::Word).map(|t| t.text(src));

    let kind = match first.text(src) {
        "import" if first.kind == TokenKind::Word => parse_import(src, &sig),
        "export" if first.kind == TokenKind::Word => match word(1) {
            Some("default") => parse_default_export(src, &sig),
            Some(_) => parse_declaration(src, &sig[1..], true),
            None if sig.get(1).is_some_and(|t| t.is_punct(src, '{')) => parse_specifier_default(src, &sig),
            None => ItemKind::Other,
        },
        _ if first.kind == TokenKind::Word => parse_declaration(src, &sig, false),
        _ => ItemKind::Other,
    };
    let end = statement_end(src, seg, &kind).unwrap_or_else(|| sig.last().map_or(seg_start, |t| t.end));
    (kind, end)
}

fn parse_import(src: &str, sig: &[&Token]) -> ItemKind {
    let mut imp = Import { default_binding: None, namespace: None, named: None, source: None };
    let mut k = 1;
    if let Some(t) = sig.get(k) {
        if is_identifier(src, t) && !t.is_word(src, "from") {
            imp.default_binding = Some(binding(src, t));
            k += 1;
            if sig.get(k).is_some_and(|t| t.is_punct(src, ',')) {
                k += 1;
            }
        }
    }
    if sig.get(k).is_some_and(|t| t.is_punct(src, '*')) {
        if let (Some(a), Some(n)) = (sig.get(k + 1), sig.get(k + 2)) {
            if a.is_word(src, "as") && is_identifier(src, n) {
                imp.namespace = Some(binding(src, n));
            }
        }
        k += 3;
    }
    if sig.get(k).is_some_and(|t| t.is_punct(src, '{')) {
        if let Some(close) = (k..sig.len()).find(|&j| sig[j].is_punct(src, '}')) {
            imp.named = Some(sig[k].start..sig[close].end);
            k = close + 1;
        }
    }
    imp.source = sig[k.min(sig.len())..]
        .iter()
        .find(|t| t.kind == TokenKind::Str)
        .map(|t| unquote(t.text(src)));
    ItemKind::Import(imp)
}

fn parse_default_export(src: &str, sig: &[&Token]) -> ItemKind {
    let Some(t) = sig.get(2) else {
        return ItemKind::Other;
    };
    let mut k = 2;
    if t.is_word(src, "async") && sig.get(3).is_some_and(|n| n.is_word(src, "function")) {
        k = 3;
    }
    let head = sig[k];
    let target = if head.is_word(src, "function") {
        let mut n = k + 1;
        if sig.get(n).is_some_and(|t| t.is_punct(src, '*')) {
            n += 1;
        }
        let name = sig.get(n).filter(|t| is_identifier(src, t)).map(|t| binding(src, t));
        DefaultTarget::Function { name, keyword: head.start..head.end }
    } else if head.is_word(src, "class") {
        let name = sig
            .get(k + 1)
            .filter(|t| is_identifier(src, t) && !t.is_word(src, "extends"))
            .map(|t| binding(src, t));
        DefaultTarget::Class { name, keyword: head.start..head.end }
    } else if is_identifier(src, head) && sig.get(k + 1).map_or(true, |n| n.is_punct(src, ';')) {
        DefaultTarget::Ident(binding(src, head))
    } else {
        DefaultTarget::Expression { start: head.start }
    };
    ItemKind::DefaultExport(DefaultExport { target })
}

/// `export { Name as default }`
fn parse_specifier_default(src: &str, sig: &[&Token]) -> ItemKind {
    let close = (2..sig.len()).find(|&j| sig[j].is_punct(src, '}')).unwrap_or(sig.len());
    let inner = &sig[2.min(close)..close];
    for w in inner.windows(3) {
        if is_identifier(src, w[0]) && w[1].is_word(src, "as") && w[2].is_word(src, "default") {
            return ItemKind::DefaultExport(DefaultExport { target: DefaultTarget::Ident(binding(src, w[0])) });
        }
    }
    ItemKind::Other
}

fn parse_declaration(src: &str, sig: &[&Token], exported: bool) -> ItemKind {
    let Some(first) = sig.first() else {
        return ItemKind::Other;
    };
    let (kind, mut k) = match first.text(src) {
        "const" => (DeclKind::Const, 1),
        "let" => (DeclKind::Let, 1),
        "var" => (DeclKind::Var, 1),
        "class" => (DeclKind::Class, 1),
        "function" => (DeclKind::Function, 1),
        "async" if sig.get(1).is_some_and(|t| t.is_word(src, "function")) => (DeclKind::Function, 2),
        _ => return ItemKind::Other,
    };
    if kind == DeclKind::Function && sig.get(k).is_some_and(|t| t.is_punct(src, '*')) {
        k += 1;
    }
    match sig.get(k) {
        Some(t) if is_identifier(src, t) => {
            ItemKind::Declaration(Declaration { kind, binding: binding(src, t), exported })
        }
        _ => ItemKind::Other,
    }
}

fn has_block_body(kind: &ItemKind) -> bool {
    match kind {
        ItemKind::Declaration(d) => matches!(d.kind, DeclKind::Function | DeclKind::Class),
        ItemKind::DefaultExport(d) => {
            matches!(d.target, DefaultTarget::Function { .. } | DefaultTarget::Class { .. })
        }
        _ => false,
    }
}

/// Characters that, ending a line, mean the expression carries on.
fn continues_line(text: &str) -> bool {
    matches!(
        text,
        "=" | "," | "(" | "[" | "{" | "+" | "-" | "*" | "/" | "?" | ":" | "&" | "|" | "!" | "~" | "^" | "%" | "<" | ">" | "."
    )
}

/// First `;` at depth 0, the close of a function/class body, or an
/// unambiguous line end for expression statements.
fn statement_end(src: &str, seg: &[Token], kind: &ItemKind) -> Option<usize> {
    if matches!(kind, ItemKind::Other) {
        return None;
    }
    let block = has_block_body(kind);
    let mut depth = 0usize;
    let mut opened_body = false;
    let mut last_sig: Option<&Token> = None;

    for (i, tok) in seg.iter().enumerate() {
        if tok.kind == TokenKind::Newline {
            if depth == 0 && !block {
                if let Some(prev) = last_sig {
                    let next = next_sig(seg, i + 1).map(|j| &seg[j]);
                    let prev_continues = prev.kind == TokenKind::Punct && continues_line(prev.text(src));
                    let next_continues = next.is_some_and(|n| n.is_punct(src, '.') || n.is_punct(src, '?'));
                    if !prev_continues && !next_continues {
                        return Some(prev.end);
                    }
                }
            }
            continue;
        }
        if tok.is_trivia() {
            continue;
        }
        if tok.kind == TokenKind::Punct {
            match tok.text(src) {
                ";" if depth == 0 => return Some(tok.end),
                "{" => {
                    if depth == 0 && block {
                        opened_body = true;
                    }
                    depth += 1;
                }
                "(" | "[" => depth += 1,
                "}" | ")" | "]" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && opened_body && tok.text(src) == "}" {
                        let after = next_sig(seg, i + 1).map(|j| &seg[j]);
                        return Some(match after {
                            Some(n) if n.is_punct(src, ';') => n.end,
                            _ => tok.end,
                        });
                    }
                }
                _ => {}
            }
        }
        last_sig = Some(tok);
    }
    last_sig.map(|t| t.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(m: &Module) -> Vec<&'static str> {
        m.items
            .iter()
            .map(|it| match it.kind {
                ItemKind::Import(_) => "import",
                ItemKind::DefaultExport(_) => "default",
                ItemKind::Declaration(_) => "decl",
                ItemKind::Other => "other",
            })
            .collect()
    }

    #[test]
    fn spans_reassemble_the_source() {
        let src = "// header\nimport a from 'a'\nconst X = 1; export default X;\n<div/>";
        let m = Module::parse(src);
        let joined: String = m.items.iter().map(|it| &src[it.span.clone()]).collect();
        assert_eq!(joined, src);
        assert_eq!(kinds(&m), vec!["other", "import", "decl", "default"]);
    }

    #[test]
    fn recognises_import_shapes() {
        let src = "import React, { useState } from \"react\";\nimport * as Icons from 'lucide-react';\nimport './x.css';";
        let m = Module::parse(src);
        let imps: Vec<&Import> = m.imports().map(|(_, i)| i).collect();
        assert_eq!(imps.len(), 3);
        assert_eq!(imps[0].default_binding.as_ref().unwrap().name, "React");
        assert_eq!(&src[imps[0].named.clone().unwrap()], "{ useState }");
        assert_eq!(imps[0].source.as_deref(), Some("react"));
        assert_eq!(imps[1].namespace.as_ref().unwrap().name, "Icons");
        assert!(imps[2].default_binding.is_none());
        assert_eq!(imps[2].source.as_deref(), Some("./x.css"));
    }

    #[test]
    fn recognises_default_export_shapes() {
        let cases = [
            ("export default Shop;", "ident"),
            ("export default function Page() { return null; }", "fn"),
            ("export default async function () {}", "fn-anon"),
            ("export default class Store extends React.Component {}", "class"),
            ("export default () => <div/>;", "expr"),
            ("export default memo(Shop);", "expr"),
            ("export { Shop as default };", "ident"),
        ];
        for (src, want) in cases {
            let m = Module::parse(src);
            let (_, d) = m.default_exports().next().unwrap_or_else(|| panic!("no default export in {src}"));
            let got = match &d.target {
                DefaultTarget::Ident(_) => "ident",
                DefaultTarget::Function { name: Some(_), .. } => "fn",
                DefaultTarget::Function { name: None, .. } => "fn-anon",
                DefaultTarget::Class { name: Some(_), .. } => "class",
                DefaultTarget::Class { name: None, .. } => "class-anon",
                DefaultTarget::Expression { .. } => "expr",
            };
            assert_eq!(got, want, "{src}");
        }
    }

    #[test]
    fn nested_keywords_do_not_open_items() {
        let src = "function Page() {\n  const items = [1];\n  function helper() {}\n  return <div/>;\n}";
        let m = Module::parse(src);
        assert_eq!(m.items.len(), 1);
        assert_eq!(m.declaration_named("Page").unwrap().kind, DeclKind::Function);
        assert!(m.declaration_named("items").is_none());
    }

    #[test]
    fn statement_end_stops_before_trailing_markup() {
        let src = "const items = [\"a\", \"b\"]\n<ul>{items.map(i => <li>{i}</li>)}</ul>";
        let m = Module::parse(src);
        assert_eq!(m.items.len(), 1);
        assert_eq!(&src[m.items[0].statement()], "const items = [\"a\", \"b\"]");

        let src = "function Hero() {\n  return <h1/>;\n}\n<Hero />";
        let m = Module::parse(src);
        assert_eq!(&src[m.items[0].statement()], "function Hero() {\n  return <h1/>;\n}");
    }

    #[test]
    fn jsx_element_references_are_found() {
        let src = "const Hero = () => <h1/>;\nconst Page = () => <main><Hero /></main>;";
        let m = Module::parse(src);
        let page = m.items[1].span.clone();
        assert!(m.renders_element("Hero", &m.items[0].span));
        assert!(!m.renders_element("Page", &page));
        assert!(!m.renders_element("Hero", &(0..src.len())));
    }

    #[test]
    fn stray_closer_in_jsx_text_keeps_nested_declarations_inside() {
        let src = "function Shop() {\n  const smile = <span>:)</span>;\n  const Banner = () => <div>Sale</div>;\n  return <main>{smile}<Banner/></main>;\n}\nexport default Shop;";
        let m = Module::parse(src);
        assert_eq!(kinds(&m), vec!["decl", "default"]);
        assert!(m.declaration_named("Banner").is_none());
        let joined: String = m.items.iter().map(|it| &src[it.span.clone()]).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn unclosed_opener_in_jsx_text_still_finds_the_export() {
        let src = "const Shop = () => (\n  <p>Deals (today only</p>\n);\nexport default Shop;";
        let m = Module::parse(src);
        assert_eq!(kinds(&m), vec!["decl", "default"]);
    }

    #[test]
    fn element_tags_cover_opening_and_closing_forms() {
        let src = "<Card><Card.Body/></Card>";
        let m = Module::parse(src);
        assert_eq!(m.element_tags("Card"), vec![1..5, 7..11, 20..24]);
    }
}
