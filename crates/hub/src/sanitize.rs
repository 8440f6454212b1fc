//! Escaping of user text embedded in in-game print commands.

use gamebridge_common::InboundMessage;

/// Maximum characters of escaped message content kept per relay.
pub const MAX_CONTENT_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Escape `text` for a double-quoted script string literal, turning line
/// breaks into spaces. Stops before exceeding `limit` output characters and
/// reports whether anything was cut.
fn escape_into(out: &mut String, text: &str, limit: Option<usize>) -> bool {
    let mut used = 0;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let unit: &[char] = match c {
            '\\' => &['\\', '\\'],
            '"' => &['\\', '"'],
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                &[' ']
            },
            '\n' => &[' '],
            _ => std::slice::from_ref(&c),
        };
        if limit.is_some_and(|max| used + unit.len() > max) {
            return true;
        }
        out.extend(unit);
        used += unit.len();
    }
    false
}

/// Escape message content and cap it at [`MAX_CONTENT_CHARS`] characters,
/// appending `...` when anything was cut. Escape pairs are never split.
pub fn sanitize(content: &str) -> String {
    let mut out = String::with_capacity(content.len().min(MAX_CONTENT_CHARS * 2));
    if escape_into(&mut out, content, Some(MAX_CONTENT_CHARS)) {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Command that prints a relayed message to every player.
pub fn relay_command(message: &InboundMessage) -> String {
    let mut source = String::new();
    escape_into(&mut source, &message.source, None);
    let mut author = String::new();
    escape_into(&mut author, &message.author, None);
    format!(
        "/sc game.print(\"[color=purple][{source}][/color] {author}: {}\")",
        sanitize(&message.content)
    )
}
