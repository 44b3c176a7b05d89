use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Target languages are plain codes such as `en`, `ja` or `zh-TW`. Validation
/// checks the primary subtag against ISO 639-1 / ISO 639-3; the region part is
/// kept as written since it also names the output file.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
}

/// Canonical spelling of a language code: trimmed and lower-cased
pub fn canonical_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Primary language subtag (`zh-tw` -> `zh`, `pt_BR` -> `pt`)
pub fn primary_subtag(code: &str) -> String {
    canonical_code(code)
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2/T code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let primary = primary_subtag(code);

    if primary.len() == 2 && Language::from_639_1(&primary).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if primary.len() == 3 && Language::from_639_3(&primary).is_some() {
        return Ok(LanguageCodeType::Part2T);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let primary = primary_subtag(code);
    let lang = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}

/// Canonicalize and de-duplicate language codes, keeping first occurrences
pub fn dedup_language_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<String> = Vec::new();
    for code in codes {
        let code = canonical_code(code.as_ref());
        if !code.is_empty() && !result.contains(&code) {
            result.push(code);
        }
    }
    result
}

/// Parse a comma separated language list (`"en, de,ja"`)
pub fn parse_language_list(list: &str) -> Vec<String> {
    dedup_language_codes(list.split(','))
}
