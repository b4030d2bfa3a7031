// WHY: bidi control code points arrive from RTL-rendered sources and break every pattern match
// Standalone so every other stage can share one definition of "control character"

/// Unicode bidirectional formatting characters
/// ALM, LRM, RLM, the embedding/override set and the isolate set
pub const DIRECTIONAL_CONTROLS: &[char] = &[
    '\u{061C}', // ARABIC LETTER MARK
    '\u{200E}', // LEFT-TO-RIGHT MARK
    '\u{200F}', // RIGHT-TO-LEFT MARK
    '\u{202A}', // LEFT-TO-RIGHT EMBEDDING
    '\u{202B}', // RIGHT-TO-LEFT EMBEDDING
    '\u{202C}', // POP DIRECTIONAL FORMATTING
    '\u{202D}', // LEFT-TO-RIGHT OVERRIDE
    '\u{202E}', // RIGHT-TO-LEFT OVERRIDE
    '\u{2066}', // LEFT-TO-RIGHT ISOLATE
    '\u{2067}', // RIGHT-TO-LEFT ISOLATE
    '\u{2068}', // FIRST STRONG ISOLATE
    '\u{2069}', // POP DIRECTIONAL ISOLATE
];

/// Byte order mark, the one removal outside the directional set
/// WHY: it is encoding residue from the reader, never text; left in, the first line of a file matches no pattern
const BYTE_ORDER_MARK: char = '\u{FEFF}';

pub fn is_directional_control(ch: char) -> bool {
    DIRECTIONAL_CONTROLS.contains(&ch)
}

/// Remove directional controls (and a stray BOM) leaving every other code point untouched,
/// including Hebrew vowel points and cantillation marks
pub fn sanitize(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    sanitize_into(raw, &mut result);
    result
}

/// Sanitize into supplied buffer to avoid allocation
/// WHY: every line of every file passes through here
pub fn sanitize_into(raw: &str, buffer: &mut String) {
    buffer.clear();
    buffer.reserve(raw.len());
    buffer.extend(
        raw.chars()
            .filter(|&ch| ch != BYTE_ORDER_MARK && !is_directional_control(ch)),
    );
}

/// Quick check used to skip the copy when a line is already clean
pub fn needs_sanitizing(raw: &str) -> bool {
    raw.chars()
        .any(|ch| ch == BYTE_ORDER_MARK || is_directional_control(ch))
}
