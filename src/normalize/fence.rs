const FENCE: &str = "```";
const JS_TAGS: [&str; 6] = ["jsx", "tsx", "js", "javascript", "ts", "typescript"];

struct Block {
    tag: String,
    lines: Vec<String>,
}

impl Block {
    fn is_script(&self) -> bool {
        self.tag.is_empty() || JS_TAGS.contains(&self.tag.as_str())
    }
}

fn fenced_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<Block> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        match open.as_mut() {
            None => {
                if let Some(info) = trimmed.strip_prefix(FENCE) {
                    let tag = info.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
                    open = Some(Block { tag, lines: Vec::new() });
                }
            }
            Some(block) => {
                if trimmed.starts_with(FENCE) {
                    blocks.extend(open.take());
                } else if let Some(body) = line.trim_end().strip_suffix(FENCE) {
                    block.lines.push(body.to_string());
                    blocks.extend(open.take());
                } else {
                    block.lines.push(line.to_string());
                }
            }
        }
    }
    // a truncated response may never close its fence
    blocks.extend(open);
    blocks
}

/// Keeps only fenced code when fences are present, otherwise trims the text.
///
/// Script-tagged (or untagged) blocks win over other languages; prose outside
/// the fences is dropped.
pub fn strip_fences(text: &str) -> String {
    let blocks = fenced_blocks(text);
    if blocks.is_empty() {
        return text.trim().to_string();
    }
    let any_script = blocks.iter().any(Block::is_script);
    blocks
        .iter()
        .filter(|b| !any_script || b.is_script())
        .map(|b| b.lines.join("\n").trim().to_string())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
