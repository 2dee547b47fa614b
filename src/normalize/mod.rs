//! Turns whatever the model returned into a module the preview can mount.
//!
//! The cascade runs on a top-level item view of the code (see [`items`]):
//! fences are stripped, stray default React imports removed, the default
//! export renamed to `App` (or one appended, or a wrapper synthesized around
//! bare markup), and finally one canonical React import is prepended.
//! `normalize` never fails and is idempotent.

mod fence;
mod items;
mod lexer;

use std::ops::Range;

use items::{DefaultTarget, Import, Item, ItemKind, Module};

pub use fence::strip_fences;

pub const CANONICAL_NAME: &str = "App";
pub const CANONICAL_IMPORT: &str = r#"import React from "react";"#;
const BASE_LIBRARY: &str = "react";
const BASE_DEFAULT_NAME: &str = "React";
/// Name given to a pre-existing `App` binding when another component takes the slot.
const DISPLACED_NAME: &str = "AppBase";

#[derive(Default)]
struct Edits(Vec<(Range<usize>, String)>);

impl Edits {
    fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.0.push((range, text.into()));
    }

    fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.0.push((at..at, text.into()));
    }

    fn apply(mut self, src: &str) -> String {
        self.0.sort_by_key(|(r, _)| (r.start, r.end));
        let mut out = String::with_capacity(src.len() + 64);
        let mut cursor = 0;
        for (range, text) in self.0 {
            if range.start < cursor {
                log::debug!("normalize: skipping overlapping edit at {}", range.start);
                continue;
            }
            out.push_str(&src[cursor..range.start]);
            out.push_str(&text);
            cursor = range.end;
        }
        out.push_str(&src[cursor..]);
        out
    }
}

fn is_base_default_import(imp: &Import) -> bool {
    imp.source.as_deref() == Some(BASE_LIBRARY)
        && [&imp.default_binding, &imp.namespace]
            .into_iter()
            .flatten()
            .any(|b| b.name == BASE_DEFAULT_NAME)
}

/// What an import statement becomes: itself, its named part only, or nothing.
fn rewritten_import(src: &str, item: &Item, imp: &Import) -> Option<String> {
    if !is_base_default_import(imp) {
        return Some(src[item.statement()].to_string());
    }
    imp.named
        .clone()
        .map(|named| format!("import {} from \"{BASE_LIBRARY}\";", &src[named]))
}

fn strip_base_imports(m: &Module, edits: &mut Edits) {
    for (item, imp) in m.imports().filter(|(_, imp)| is_base_default_import(imp)) {
        let text = rewritten_import(m.src, item, imp).unwrap_or_default();
        edits.replace(item.statement(), text);
    }
}

fn displace_existing_app(m: &Module, target: &str, edits: &mut Edits) {
    if target == CANONICAL_NAME {
        return;
    }
    if let Some(existing) = m.declaration_named(CANONICAL_NAME) {
        log::debug!("normalize: renaming existing {CANONICAL_NAME} binding to {DISPLACED_NAME}");
        edits.replace(existing.binding.span.clone(), DISPLACED_NAME);
        for tag in m.element_tags(CANONICAL_NAME) {
            edits.replace(tag, DISPLACED_NAME);
        }
    }
}

/// Case (a): a default export exists; make it export `App`.
fn canonicalize_default_export(m: &Module, edits: &mut Edits) -> bool {
    let mut exports = m.default_exports();
    let Some((item, export)) = exports.next() else {
        return false;
    };

    for (extra, d) in exports {
        match &d.target {
            DefaultTarget::Function { name: Some(_), keyword } | DefaultTarget::Class { name: Some(_), keyword } => {
                edits.replace(extra.span.start..keyword.start, "");
            }
            _ => edits.replace(extra.statement(), ""),
        }
    }

    match &export.target {
        DefaultTarget::Ident(b) if b.name == CANONICAL_NAME => {}
        DefaultTarget::Ident(b) => {
            displace_existing_app(m, &b.name, edits);
            match m.declaration_named(&b.name) {
                Some(decl) => {
                    edits.replace(b.span.clone(), CANONICAL_NAME);
                    edits.replace(decl.binding.span.clone(), CANONICAL_NAME);
                }
                None => edits.replace(
                    item.statement(),
                    format!("const {CANONICAL_NAME} = {};\nexport default {CANONICAL_NAME};", b.name),
                ),
            }
        }
        DefaultTarget::Function { name, keyword } | DefaultTarget::Class { name, keyword } => match name {
            Some(b) if b.name == CANONICAL_NAME => {}
            Some(b) => {
                displace_existing_app(m, &b.name, edits);
                edits.replace(b.span.clone(), CANONICAL_NAME);
            }
            None => {
                displace_existing_app(m, "", edits);
                edits.insert(keyword.end, format!(" {CANONICAL_NAME}"));
            }
        },
        DefaultTarget::Expression { start } => {
            displace_existing_app(m, "", edits);
            edits.replace(item.span.start..*start, format!("const {CANONICAL_NAME} = "));
            let terminator = if m.src[..item.stmt_end].ends_with(';') { "" } else { ";" };
            edits.insert(item.stmt_end, format!("{terminator}\nexport default {CANONICAL_NAME};"));
        }
    }
    true
}

/// Case (b): pick the component to expose when nothing is exported.
///
/// An existing `App` wins; otherwise the last capitalized declaration that no
/// other item renders as a JSX element, falling back to the last one.
fn pick_component<'m>(m: &'m Module) -> Option<&'m str> {
    let candidates: Vec<(&Item, &str)> = m
        .declarations()
        .filter(|(_, d)| d.binding.name.chars().next().is_some_and(char::is_uppercase))
        .map(|(it, d)| (it, d.binding.name.as_str()))
        .collect();
    if let Some((_, name)) = candidates.iter().find(|(_, n)| *n == CANONICAL_NAME) {
        return Some(*name);
    }
    candidates
        .iter()
        .rev()
        .find(|(it, name)| !m.renders_element(name, &it.span))
        .or(candidates.last())
        .map(|(_, name)| *name)
}

/// Case (c): wrap bare markup in an `App` fragment, hoisting module-level statements.
fn wrap_markup(m: &Module) -> String {
    let mut hoisted = Vec::new();
    let mut edits = Edits::default();
    for item in &m.items {
        match &item.kind {
            ItemKind::Import(imp) => {
                hoisted.extend(rewritten_import(m.src, item, imp));
                edits.replace(item.statement(), "");
            }
            ItemKind::Declaration(_) => {
                hoisted.push(m.src[item.statement()].to_string());
                edits.replace(item.statement(), "");
            }
            _ => {}
        }
    }
    let markup = edits.apply(m.src);
    let wrapper = format!(
        "export default function {CANONICAL_NAME}() {{\n  return (\n    <>\n      {}\n    </>\n  );\n}}",
        markup.trim()
    );
    if hoisted.is_empty() {
        wrapper
    } else {
        format!("{}\n\n{wrapper}", hoisted.join("\n"))
    }
}

/// A line opening with `export default`, whether or not it parsed as an item.
fn has_line_level_default_export(src: &str) -> bool {
    src.lines().any(|l| l.trim_start().starts_with("export default"))
}

pub fn normalize(raw: &str) -> String {
    let cleaned = strip_fences(raw);
    let module = Module::parse(&cleaned);

    let mut edits = Edits::default();
    strip_base_imports(&module, &mut edits);

    let body = if canonicalize_default_export(&module, &mut edits) {
        edits.apply(&cleaned)
    } else if has_line_level_default_export(&cleaned) {
        log::debug!("normalize: unparsed default export left in place");
        edits.apply(&cleaned)
    } else if let Some(name) = pick_component(&module) {
        let tail = if name == CANONICAL_NAME {
            format!("\n\nexport default {CANONICAL_NAME};")
        } else {
            format!("\n\nconst {CANONICAL_NAME} = {name};\nexport default {CANONICAL_NAME};")
        };
        edits.insert(cleaned.len(), tail);
        edits.apply(&cleaned)
    } else {
        wrap_markup(&module)
    };

    format!("{CANONICAL_IMPORT}\n\n{}\n", body.trim())
}

/// The export surface of a module, as the preview sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSurface {
    /// One entry per top-level default export; anonymous ones read `<anonymous>`.
    pub default_exports: Vec<String>,
    /// Top-level imports that bind React under its default name.
    pub base_imports: usize,
}

pub fn export_surface(src: &str) -> ExportSurface {
    let m = Module::parse(src);
    let default_exports = m
        .default_exports()
        .map(|(_, d)| match &d.target {
            DefaultTarget::Ident(b) => b.name.clone(),
            DefaultTarget::Function { name, .. } | DefaultTarget::Class { name, .. } => {
                name.as_ref().map_or_else(|| "<anonymous>".to_string(), |b| b.name.clone())
            }
            DefaultTarget::Expression { .. } => "<anonymous>".to_string(),
        })
        .collect();
    let base_imports = m.imports().filter(|(_, imp)| is_base_default_import(imp)).count();
    ExportSurface { default_exports, base_imports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_canonical(out: &str) {
        let surface = export_surface(out);
        assert_eq!(surface.default_exports, vec![CANONICAL_NAME.to_string()], "{out}");
        assert_eq!(surface.base_imports, 1, "{out}");
        assert!(out.starts_with(CANONICAL_IMPORT), "{out}");
        assert_eq!(out.matches(CANONICAL_IMPORT).count(), 1, "{out}");
    }

    #[test]
    fn fenced_component_is_renamed_to_app() {
        let raw = "```jsx\nconst Shop = () => <div>Hi</div>;\nexport default Shop;\n```";
        let out = normalize(raw);
        assert!(!out.contains("```"));
        assert!(out.contains("const App = () => <div>Hi</div>;"));
        assert!(out.contains("export default App;"));
        assert!(!out.contains("Shop"));
        assert_canonical(&out);
    }

    #[test]
    fn bare_markup_is_wrapped_in_a_fragment() {
        let out = normalize("<div>Hello</div>");
        assert_eq!(
            out,
            "import React from \"react\";\n\nexport default function App() {\n  return (\n    <>\n      <div>Hello</div>\n    </>\n  );\n}\n"
        );
    }

    #[test]
    fn stray_react_import_is_not_duplicated() {
        let raw = "import React from \"react\";\n\nexport default function Page() {\n  return <main />;\n}";
        let out = normalize(raw);
        assert_canonical(&out);
        assert!(out.contains("export default function App() {"));
    }

    #[test]
    fn named_react_specifiers_survive_import_removal() {
        let raw = "import React, { useState } from 'react';\nexport default function Page() {\n  const [open, setOpen] = useState(false);\n  return <button onClick={() => setOpen(!open)} />;\n}";
        let out = normalize(raw);
        assert!(out.contains("import { useState } from \"react\";"));
        assert_canonical(&out);
    }

    #[test]
    fn namespace_react_import_is_removed() {
        let out = normalize("import * as React from 'react';\nexport default App;\nfunction App() { return null; }");
        assert_canonical(&out);
        assert!(!out.contains("* as React"));
    }

    #[test]
    fn unexported_component_gets_a_default_export() {
        let raw = "const products = [1, 2];\nconst ProductCard = ({ p }) => <li>{p}</li>;\nconst ShopPage = () => (\n  <ul>{products.map(p => <ProductCard p={p} />)}</ul>\n);";
        let out = normalize(raw);
        assert!(out.contains("const ShopPage = () => ("));
        assert!(out.ends_with("const App = ShopPage;\nexport default App;\n"));
        assert_canonical(&out);
    }

    #[test]
    fn unexported_app_is_exported_directly() {
        let out = normalize("function Hero() { return <h1/>; }\nfunction App() { return <Hero/>; }");
        assert!(out.ends_with("function App() { return <Hero/>; }\n\nexport default App;\n"));
        assert_canonical(&out);
    }

    #[test]
    fn anonymous_and_expression_exports_are_named() {
        let out = normalize("export default function () {\n  return <div/>;\n}");
        assert!(out.contains("export default function App () {"));
        assert_canonical(&out);

        let out = normalize("export default () => <div/>");
        assert!(out.contains("const App = () => <div/>;\nexport default App;"));
        assert_canonical(&out);
    }

    #[test]
    fn only_the_exported_binding_is_renamed() {
        let raw = "function Shop() {\n  return <h1>Shop now</h1>;\n}\nexport default Shop;";
        let out = normalize(raw);
        assert!(out.contains("function App() {"));
        assert!(out.contains("<h1>Shop now</h1>"));
        assert_canonical(&out);
    }

    #[test]
    fn existing_app_binding_is_displaced() {
        let raw = "const App = () => <div/>;\nconst Page = () => <App/>;\nexport default Page;";
        let out = normalize(raw);
        assert!(out.contains("const AppBase = () => <div/>;"));
        assert!(out.contains("const App = () => <AppBase/>;"));
        assert_canonical(&out);
    }

    #[test]
    fn undeclared_export_target_is_aliased() {
        let out = normalize("import Landing from './Landing';\nexport default Landing;");
        assert!(out.contains("const App = Landing;\nexport default App;"));
        assert_canonical(&out);
    }

    #[test]
    fn specifier_default_export_is_renamed() {
        let out = normalize("const Shop = () => <div/>;\nexport { Shop as default };");
        assert!(out.contains("export { App as default };"));
        assert_canonical(&out);
    }

    #[test]
    fn extra_default_exports_are_demoted() {
        let raw = "export default function Page() { return <Hero/>; }\nexport default function Hero() { return <h1/>; }";
        let out = normalize(raw);
        assert!(out.contains("\nfunction Hero()"));
        assert_canonical(&out);
    }

    #[test]
    fn wrapper_hoists_imports_and_declarations() {
        let raw = "import { Star } from 'lucide-react';\nconst items = ['a', 'b'];\n<ul>{items.map(i => <li key={i}><Star />{i}</li>)}</ul>";
        let out = normalize(raw);
        let wrapper_at = out.find("export default function App()").unwrap();
        assert!(out.find("import { Star } from 'lucide-react';").unwrap() < wrapper_at);
        assert!(out.find("const items = ['a', 'b'];").unwrap() < wrapper_at);
        assert!(out.contains("      <ul>{items.map"));
        assert_canonical(&out);
    }

    #[test]
    fn jsx_apostrophes_do_not_confuse_the_parser() {
        let raw = "const Hero = () => <p>We're open</p>;\nconst Page = () => <main><Hero/><p>Don't wait</p></main>;";
        let out = normalize(raw);
        assert!(out.ends_with("const App = Page;\nexport default App;\n"));
        assert_canonical(&out);
    }

    #[test]
    fn possessive_jsx_text_keeps_a_single_default_export() {
        let raw = "const Shop = () => (\n  <ul>{items.map(i => <li>{i}'s pick</li>)} <p>Don't miss</p></ul>\n);\nexport default Shop;";
        let out = normalize(raw);
        assert!(out.contains("const App = () => (\n  <ul>{items.map(i => <li>{i}'s pick</li>)} <p>Don't miss</p></ul>\n);"));
        assert!(out.ends_with(");\nexport default App;\n"));
        assert!(!out.contains("Shop"));
        assert_canonical(&out);
        assert_eq!(normalize(&out), out);
    }

    #[test]
    fn stray_paren_in_jsx_text_exports_the_outer_component() {
        let raw = "function Shop() {\n  const smile = <span>:)</span>;\n  const Banner = () => <div>Sale</div>;\n  return <main>{smile}<Banner/></main>;\n}";
        let out = normalize(raw);
        assert!(out.contains("  const Banner = () => <div>Sale</div>;"));
        assert!(out.ends_with("}\n\nconst App = Shop;\nexport default App;\n"));
        assert_canonical(&out);
        assert_eq!(normalize(&out), out);
    }

    #[test]
    fn indented_default_export_is_never_duplicated() {
        let raw = "const Shop = () => (\n  <p>(</p>\n);\n  export default Shop;";
        let out = normalize(raw);
        assert_eq!(out.matches("export default").count(), 1, "{out}");
        assert!(!out.contains("const App = Shop"));
    }

    #[test]
    fn empty_input_still_yields_a_component() {
        let out = normalize("   ");
        assert_canonical(&out);
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let inputs = [
            "```jsx\nconst Shop = () => <div>Hi</div>;\nexport default Shop;\n```",
            "<div>Hello</div>",
            "import React from 'react';\nconst Page = () => <div/>;",
            "export default () => <div/>",
            "import { Star } from 'lucide-react';\nconst items = [1];\n<Star />",
        ];
        for raw in inputs {
            let once = normalize(raw);
            let twice = normalize(&once);
            assert_eq!(once, twice, "{raw}");
            assert_canonical(&twice);
        }
    }

    proptest! {
        #[test]
        fn never_panics_and_leads_with_one_canonical_import(raw in "\\PC{0,200}") {
            let out = normalize(&raw);
            prop_assert!(out.starts_with(CANONICAL_IMPORT));
            prop_assert!(out.ends_with('\n'));
        }

        #[test]
        fn component_declarations_always_end_up_exported_as_app(
            name in "[A-Z][a-zA-Z]{0,8}",
            exported in any::<bool>(),
        ) {
            let mut raw = format!("const {name} = () => <div>{{\"{name}\"}}</div>;");
            if exported {
                raw.push_str(&format!("\nexport default {name};"));
            }
            let out = normalize(&raw);
            let surface = export_surface(&out);
            prop_assert_eq!(surface.default_exports, vec![CANONICAL_NAME.to_string()]);
            prop_assert_eq!(surface.base_imports, 1);
        }

        #[test]
        fn punctuated_jsx_text_normalizes_to_a_fixed_point(
            name in "[A-Z][a-z]{0,6}",
            lead in "[a-z ':()]{0,12}",
            tail in "[a-z ':()]{0,12}",
            arrow in any::<bool>(),
            exported in any::<bool>(),
        ) {
            let mut raw = if arrow {
                format!("const {name} = () => (\n  <div>{lead}<p>{tail}</p></div>\n);")
            } else {
                format!(
                    "function {name}() {{\n  const note = <span>{lead}</span>;\n  return <main>{{note}}<p>{tail}</p></main>;\n}}"
                )
            };
            if exported {
                raw.push_str(&format!("\nexport default {name};"));
            }
            let once = normalize(&raw);
            let surface = export_surface(&once);
            prop_assert_eq!(surface.default_exports, vec![CANONICAL_NAME.to_string()], "{}", once);
            prop_assert_eq!(surface.base_imports, 1);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
