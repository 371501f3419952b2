//! Splits raw omnibox input into tokens and edits the input around them.
//!
//! Tokens are separated by whitespace. Quoted groups (`"..."` or `'...'`)
//! opened at a token boundary form a single token with the quotes removed.
//! A run made only of hyphens acts as a separator, while a hyphen attached to
//! other characters (`-9`, `2020-01-01`) stays part of its token.

const QUOTES: [char; 2] = ['"', '\''];

pub fn tokenize(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if QUOTES.contains(&c) {
            // unterminated and empty groups produce nothing
            if let Some(quoted) = read_quoted(&chars, &mut i) {
                if !quoted.trim().is_empty() {
                    tokens.push(quoted);
                }
            }
            continue;
        }

        let word = read_word(&chars, &mut i);
        if !word.chars().all(|c| c == '-') {
            tokens.push(word);
        }
    }

    tokens
}

fn read_quoted(chars: &[char], i: &mut usize) -> Option<String> {
    let quote = chars[*i];
    *i += 1; // skip opening quote
    let start = *i;
    while *i < chars.len() {
        if chars[*i] == quote {
            let s = chars[start..*i].iter().collect();
            *i += 1; // skip closing quote
            return Some(s);
        }
        *i += 1;
    }
    None
}

fn read_word(chars: &[char], i: &mut usize) -> String {
    let mut word = String::new();
    while *i < chars.len() && !chars[*i].is_whitespace() {
        word.push(chars[*i]);
        *i += 1;
    }
    word
}

/// Removes the leading keyword word when `input` starts with `keyword`
/// (case-insensitive). An empty keyword never strips anything.
pub fn strip_keyword<'a>(input: &'a str, keyword: &str) -> &'a str {
    let trimmed = input.trim_start();
    if keyword.is_empty() || !trimmed.to_lowercase().starts_with(&keyword.to_lowercase()) {
        return input;
    }

    match trimmed.find(char::is_whitespace) {
        Some(idx) => trimmed[idx..].trim_start(),
        None => "",
    }
}

/// Quote positions and separators of an input, computed with the same quote
/// rules the tokenizer uses.
struct Scan {
    /// Byte offset just past the last whitespace outside quotes.
    last_space_end: Option<usize>,
    /// Byte offset of the last quote that opened or closed a group.
    last_quote: Option<usize>,
    quote_count: usize,
    open_quote: Option<char>,
}

fn scan(input: &str) -> Scan {
    let mut result = Scan {
        last_space_end: None,
        last_quote: None,
        quote_count: 0,
        open_quote: None,
    };
    let mut at_boundary = true;

    for (idx, c) in input.char_indices() {
        match result.open_quote {
            Some(quote) if c == quote => {
                result.open_quote = None;
                result.last_quote = Some(idx);
                result.quote_count += 1;
                at_boundary = false;
            }
            Some(_) => {}
            None if c.is_whitespace() => {
                result.last_space_end = Some(idx + c.len_utf8());
                at_boundary = true;
            }
            None if at_boundary && QUOTES.contains(&c) => {
                result.open_quote = Some(c);
                result.last_quote = Some(idx);
                result.quote_count += 1;
                at_boundary = false;
            }
            None => at_boundary = false,
        }
    }

    result
}

/// Removes the trailing in-progress token so a chosen completion can be
/// spliced in without touching earlier tokens.
pub fn strip_last_token(input: &str) -> &str {
    let scan = scan(input);
    let last_space = scan.last_space_end.map(|end| end - 1);
    let balanced = scan.quote_count % 2 == 0;

    let trim_at_space = last_space > scan.last_quote && balanced;
    let trim_at_quote = scan.last_quote > last_space && !balanced;

    match (trim_at_space, trim_at_quote) {
        (true, true) => {
            log::warn!("ambiguous last token in input {input:?}; leaving it unchanged");
            input
        }
        (true, false) => scan.last_space_end.map_or(input, |end| &input[..end]),
        (false, true) => scan.last_quote.map_or(input, |idx| &input[..idx]),
        (false, false) => input,
    }
}

/// Tokens for option lookup. When the text ends in whitespace outside a quote
/// the previous token is finished, so an empty in-progress token is appended.
pub fn tokenize_in_progress(text: &str) -> Vec<String> {
    let mut tokens = tokenize(text);
    let finished = text.ends_with(char::is_whitespace) && scan(text).open_quote.is_none();
    if !text.trim().is_empty() && finished {
        tokens.push(String::new());
    }
    tokens
}

/// Wraps a value in quotes when it would not survive tokenization as-is.
pub fn quote_token(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.chars().any(char::is_whitespace)
        || value.chars().all(|c| c == '-')
        || value.starts_with(QUOTES);
    if !needs_quotes {
        return value.to_string();
    }
    if value.contains('"') {
        format!("'{value}'")
    } else {
        format!("\"{value}\"")
    }
}

/// Renders free text so that tokenizing it and joining the tokens with single
/// spaces gives the text back (modulo whitespace runs).
pub fn quote_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            if word.starts_with(QUOTES) || word.chars().all(|c| c == '-') {
                quote_token(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splices `value` into `input`, either replacing the in-progress token or
/// the whole input. The result ends in a space so composition can continue.
pub fn splice_value(input: &str, value: &str, append: bool) -> String {
    let value = quote_token(value);
    if !append {
        return format!("{value} ");
    }

    let mut base = strip_last_token(input);
    if base == input && !input.ends_with(char::is_whitespace) && tokenize(input).len() <= 1 {
        // a lone word is the in-progress token
        base = "";
    }
    if base.is_empty() || base.ends_with(char::is_whitespace) {
        format!("{base}{value} ")
    } else {
        format!("{base} {value} ")
    }
}
