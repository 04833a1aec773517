//! String normalization for matching LLM output against catalog records.

/// Mechanic suffixes printed after a Pokemon's name.
const NAME_SUFFIXES: &[&str] = &[
    "ex", "gx", "v", "vmax", "vstar", "v-union", "break", "lv.x", "lvx", "prime", "star", "legend",
];

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        '’' | '‘' | '`' | '´' => '\'',
        '–' | '—' => '-',
        c if c.is_alphanumeric() || c == '\'' || c == '-' || c == '.' => c,
        _ => ' ',
    }
}

/// Lowercases, folds accents, and collapses whitespace.
///
/// `"Pokémon  Center’s"` becomes `"pokemon center's"`.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace('&', " and ");
    let folded: String = lowered.chars().map(fold_char).collect();

    folded
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '.' || c == '-' || c == '\''))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized name without trailing mechanic suffixes ("charizard ex" -> "charizard").
pub fn base_name(name: &str) -> String {
    let normalized = normalize_name(name);
    let mut tokens: Vec<&str> = normalized.split(' ').collect();

    while tokens.len() > 1 {
        match tokens.last() {
            Some(last) if NAME_SUFFIXES.contains(last) => {
                tokens.pop();
            }
            _ => break,
        }
    }

    let mut joined = tokens.join(" ");
    // hyphenated form, "charizard-gx"
    if let Some((head, tail)) = joined.rsplit_once('-') {
        if !head.is_empty() && NAME_SUFFIXES.contains(&tail) {
            joined = head.to_string();
        }
    }

    joined
}

/// Whether two card names plausibly refer to the same card.
pub fn names_agree(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_name(a), normalize_name(b));
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb {
        return true;
    }

    let (ba, bb) = (base_name(a), base_name(b));
    contains_words(&ba, &bb) || contains_words(&bb, &ba)
}

/// True when every word of `needle` appears in order inside `haystack`.
fn contains_words(haystack: &str, needle: &str) -> bool {
    let padded = format!(" {} ", haystack);
    padded.contains(&format!(" {} ", needle))
}

/// Makes a value safe to embed inside a quoted Pokemon TCG query term.
pub fn lucene_quote(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Makes a value safe for an unquoted wildcard term: only word characters survive
/// and spaces become `?` wildcards.
pub fn lucene_wildcard_term(value: &str) -> String {
    normalize_name(value)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '?' })
        .collect()
}

/// A printed collector number such as `025/165`, `TG05/TG30` or `SWSH050`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorNumber {
    pub number: String,
    pub printed_total: Option<u32>,
}

impl CollectorNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix("No.")
            .or_else(|| trimmed.strip_prefix("no."))
            .unwrap_or(trimmed)
            .trim_start_matches('#')
            .trim();

        let (number_part, total_part) = match trimmed.split_once('/') {
            Some((n, t)) => (n.trim(), Some(t.trim())),
            None => (trimmed, None),
        };

        let number = canonical_number(number_part)?;
        let printed_total = total_part.and_then(|t| t.parse::<u32>().ok());

        Some(Self {
            number,
            printed_total,
        })
    }
}

fn canonical_number(part: &str) -> Option<String> {
    let cleaned: String = part.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.chars().all(|c| c.is_ascii_digit()) {
        let stripped = cleaned.trim_start_matches('0');
        return Some(if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        });
    }

    Some(cleaned.to_uppercase())
}

/// Compares two collector numbers after canonicalization ("025" == "25").
pub fn numbers_match(a: &str, b: &str) -> bool {
    match (CollectorNumber::parse(a), CollectorNumber::parse(b)) {
        (Some(a), Some(b)) => a.number == b.number,
        _ => false,
    }
}
