// WHY: Hebrew and Greek must reach the console even when the sink cannot display them;
// fall back to ASCII transliteration and count every fallback

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use unicode_normalization::char::is_combining_mark;

use crate::tokenizer::{greek_fold, is_hebrew_block};

/// Locale variables consulted in precedence order
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG"];

#[derive(Debug)]
pub struct ConsoleRenderer {
    unicode: bool,
    fallbacks: AtomicU64,
}

impl ConsoleRenderer {
    pub fn new(unicode: bool) -> Self {
        Self {
            unicode,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Detect from the locale; `force_ascii` always wins
    pub fn from_env(force_ascii: bool) -> Self {
        let locale = LOCALE_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty());
        let unicode = !force_ascii && locale.as_deref().is_some_and(locale_is_unicode);
        debug!(?locale, unicode, "Console rendering mode");
        Self::new(unicode)
    }

    pub fn is_unicode(&self) -> bool {
        self.unicode
    }

    /// Number of EncodingRenderFailure recoveries so far
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn render<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.unicode || text.is_ascii() {
            return Cow::Borrowed(text);
        }
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        Cow::Owned(transliterate(text))
    }

    /// Write one line; a sink that rejects the text gets the ASCII form instead
    pub fn write_line(&self, out: &mut dyn Write, text: &str) -> io::Result<()> {
        let rendered = self.render(text);
        match writeln!(out, "{rendered}") {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe && !rendered.is_ascii() => {
                debug!("Sink rejected unicode output, retrying as ASCII: {}", e);
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                writeln!(out, "{}", transliterate(text))
            }
            other => other,
        }
    }
}

fn locale_is_unicode(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    value.contains("utf-8") || value.contains("utf8")
}

/// ASCII-only rendering: Hebrew consonants and Greek letters transliterated,
/// points and accents dropped, anything else escaped as `\u{XXXX}`
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else if let Some(latin) = hebrew_letter(ch) {
            out.push_str(latin);
        } else if ch == '\u{05BE}' {
            out.push('-');
        } else if let Some(latin) = greek_letter(ch) {
            out.push_str(latin);
        } else if is_hebrew_block(ch) || is_combining_mark(ch) {
            // points, accents and remaining Hebrew punctuation
        } else {
            out.push_str(&format!("\\u{{{:04X}}}", ch as u32));
        }
    }
    out
}

fn hebrew_letter(ch: char) -> Option<&'static str> {
    Some(match ch {
        'א' => "'",
        'ב' => "b",
        'ג' => "g",
        'ד' => "d",
        'ה' => "h",
        'ו' => "w",
        'ז' => "z",
        'ח' => "kh",
        'ט' => "t",
        'י' => "y",
        'ך' | 'כ' => "k",
        'ל' => "l",
        'ם' | 'מ' => "m",
        'ן' | 'נ' => "n",
        'ס' => "s",
        'ע' => "`",
        'ף' | 'פ' => "p",
        'ץ' | 'צ' => "ts",
        'ק' => "q",
        'ר' => "r",
        'ש' => "sh",
        'ת' => "t",
        _ => return None,
    })
}

fn greek_letter(ch: char) -> Option<&'static str> {
    let folded = greek_fold(&ch.to_string());
    let mut chars = folded.chars();
    let base = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(match base {
        'α' => "a",
        'β' => "b",
        'γ' => "g",
        'δ' => "d",
        'ε' => "e",
        'ζ' => "z",
        'η' => "e",
        'θ' => "th",
        'ι' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "x",
        'ο' => "o",
        'π' => "p",
        'ρ' => "r",
        'σ' => "s",
        'τ' => "t",
        'υ' => "u",
        'φ' => "ph",
        'χ' => "ch",
        'ψ' => "ps",
        'ω' => "o",
        _ => return None,
    })
}
