use regex::Regex;
use std::sync::LazyLock;

use crate::wire::{GenerationRequest, PageVariant, StylePreset};

/// Imperative openers that mark an instruction as a follow-up edit.
pub const REFINEMENT_VERBS: [&str; 12] = [
    "make", "change", "add", "switch", "update", "refine",
    "fix", "remove", "bigger", "smaller", "darker", "lighter",
];

static REFINEMENT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^({})", REFINEMENT_VERBS.join("|"))).expect("refinement pattern is valid")
});

pub const PREVIOUS_CODE_MARKER: &str = "Previous code (modify according to the user's request):";
pub const REFINEMENT_REQUEST_MARKER: &str = "User refinement request:";
pub const REFERENCE_LABEL: &str = "Reference website (use as design inspiration):";

const ROLE: &str =
    "You are an expert React and Tailwind CSS developer. Generate a complete, production-ready single-page component.";

pub const BASE_RULES: &str = r#"- Output ONLY valid React (no Next.js). Use standard React and JSX.
- Use Tailwind CSS for ALL styling. No inline styles or CSS files.
- Use only: React, JSX, Tailwind class names. No "next/image", no "next/link". Use <img> and <a> instead.
- Single default export: export default function Page() { return (...); }
- Mobile-responsive: use Tailwind responsive prefixes (sm:, md:, lg:).
- No external API calls or useState/useEffect unless needed for a simple UI toggle.
- Output only the code, no markdown fences or explanation."#;

pub const LANDING_STRUCTURE: &str = r#"Landing page must include these sections in order:
1. Navigation bar (sticky or static)
2. Hero section (headline, subheadline, CTA button)
3. Features/benefits grid (at least 3 items)
4. Pricing table (at least 2 tiers)
5. Testimonials (at least 2)
6. Call-to-action section
7. Footer (links, copyright)"#;

pub const PRODUCT_STRUCTURE: &str = r#"Product page must include:
1. Navigation bar
2. Product image gallery (or single image with placeholder)
3. Product title and short description
4. Price display
5. Add to cart button
6. Product details/specs (list or table)
7. Reviews section (placeholder or 1-2 review cards)
8. Footer"#;

fn structure(variant: PageVariant) -> &'static str {
    match variant {
        PageVariant::Landing => LANDING_STRUCTURE,
        PageVariant::Product => PRODUCT_STRUCTURE,
    }
}

fn preset_hint(preset: Option<StylePreset>) -> String {
    let hint = match preset {
        None => return String::new(),
        Some(StylePreset::Minimalist) => "lots of whitespace, simple typography, few colors, clean lines.",
        Some(StylePreset::Bold) => "strong colors, large typography, high contrast, confident layout.",
        Some(StylePreset::Luxury) => "elegant fonts, gold/dark accents, refined spacing, premium feel.",
        Some(StylePreset::Playful) => "rounded corners, bright colors, friendly tone, soft shadows.",
    };
    let label = preset.map(StylePreset::label).unwrap_or_default();
    format!("Design style: {label}: {hint}")
}

/// Role, global rules, page checklist and optional style hint, blank-line separated.
pub fn build_system_prompt(variant: PageVariant, preset: Option<StylePreset>) -> String {
    let page_type = format!("Page type: {}.", variant.label());
    let hint = preset_hint(preset);
    [ROLE, BASE_RULES, page_type.as_str(), structure(variant), hint.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The prior source only travels when `is_refinement` is set and it is non-empty.
pub fn build_user_prompt(
    instruction: &str,
    _variant: PageVariant,
    reference_url: Option<&str>,
    is_refinement: bool,
    prior_code: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(url) = reference_url.map(str::trim).filter(|u| !u.is_empty()) {
        parts.push(format!("{REFERENCE_LABEL} {url}"));
    }
    if let Some(prior) = prior_code.filter(|c| is_refinement && !c.trim().is_empty()) {
        parts.push(PREVIOUS_CODE_MARKER.to_string());
        parts.push(prior.to_string());
        parts.push(format!("\n{REFINEMENT_REQUEST_MARKER}"));
    }
    parts.push(instruction.trim().to_string());
    parts.join("\n\n")
}

/// Both prompts for a validated request.
pub fn prompts_for(req: &GenerationRequest) -> (String, String) {
    let system = build_system_prompt(req.page_variant, req.style_preset);
    let user = build_user_prompt(
        &req.instruction_text,
        req.page_variant,
        req.reference_url.as_deref(),
        req.is_refinement,
        req.prior_code.as_deref(),
    );
    (system, user)
}

/// Anchored, case-insensitive prefix test against [`REFINEMENT_VERBS`].
pub fn looks_like_refinement(instruction: &str) -> bool {
    REFINEMENT_PREFIX.is_match(instruction.trim_start())
}

/// A refinement needs both the phrasing and something to refine.
pub fn is_refinement(instruction: &str, prior_code: Option<&str>) -> bool {
    looks_like_refinement(instruction) && prior_code.is_some_and(|c| !c.trim().is_empty())
}
