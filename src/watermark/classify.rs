// Pictograph vs text classification for watermark tokens.
// A raw code-point threshold: anything whose first char is at or above
// U+1F000 is treated as an emoji. Some symbol blocks below it are emoji too
// and get the text tier.

use crate::constants::PICTOGRAPH_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Leading code point of a pictographic token
    Pictograph(char),
    Text,
}

pub fn is_pictographic(token: &str) -> bool {
    token
        .chars()
        .next()
        .map_or(false, |c| c as u32 >= PICTOGRAPH_THRESHOLD)
}

/// `None` for an empty or all-whitespace token.
pub fn classify(token: &str) -> Option<TokenKind> {
    let token = token.trim();
    let first = token.chars().next()?;
    if is_pictographic(token) {
        Some(TokenKind::Pictograph(first))
    } else {
        Some(TokenKind::Text)
    }
}

/// Lowercase hex of a code point, as emoji asset sets name their files.
pub fn codepoint_hex(c: char) -> String {
    format!("{:x}", c as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_is_pictograph() {
        assert_eq!(classify("🔥"), Some(TokenKind::Pictograph('🔥')));
        assert_eq!(classify(" 😀 hi"), Some(TokenKind::Pictograph('😀')));
        assert!(is_pictographic("🀄"));
    }

    #[test]
    fn test_text_and_low_symbols() {
        assert_eq!(classify("@channel"), Some(TokenKind::Text));
        // U+2764 HEAVY BLACK HEART sits below the threshold
        assert_eq!(classify("❤"), Some(TokenKind::Text));
        assert_eq!(classify("   "), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_codepoint_hex() {
        assert_eq!(codepoint_hex('🔥'), "1f525");
        assert_eq!(codepoint_hex('A'), "41");
    }
}
