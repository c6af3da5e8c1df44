//! Locale packing, BCP-47 conversion and the CLDR-derived tables used by
//! configuration matching.
//!
//! See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/LocaleData.cpp

use std::cmp::Ordering;

use log::warn;
use phf::{phf_map, phf_set};

use crate::structs::ResTableConfig;

/// Packed form of "fil", stored in two bytes
pub const FILIPINO: [u8; 2] = [0xad, 0x05];
pub const TAGALOG: [u8; 2] = *b"tl";
pub const ENGLISH: [u8; 2] = *b"en";
pub const UNITED_STATES: [u8; 2] = *b"US";

/// Likely script per language, region specific keys take precedence
static LIKELY_SCRIPTS: phf::Map<&'static str, &'static str> = phf_map! {
    "af" => "Latn", "am" => "Ethi", "ar" => "Arab", "as" => "Beng", "az" => "Latn",
    "az-IR" => "Arab", "be" => "Cyrl", "bg" => "Cyrl", "bn" => "Beng", "bo" => "Tibt",
    "bs" => "Latn", "ca" => "Latn", "cs" => "Latn", "cy" => "Latn", "da" => "Latn",
    "de" => "Latn", "el" => "Grek", "en" => "Latn", "es" => "Latn", "et" => "Latn",
    "eu" => "Latn", "fa" => "Arab", "fi" => "Latn", "fil" => "Latn", "fo" => "Latn",
    "fr" => "Latn", "ga" => "Latn", "gl" => "Latn", "gu" => "Gujr", "ha" => "Latn",
    "he" => "Hebr", "hi" => "Deva", "hr" => "Latn", "hu" => "Latn", "hy" => "Armn",
    "id" => "Latn", "in" => "Latn", "is" => "Latn", "it" => "Latn", "iw" => "Hebr",
    "ja" => "Jpan", "ka" => "Geor", "kk" => "Cyrl", "km" => "Khmr", "kn" => "Knda",
    "ko" => "Kore", "ky" => "Cyrl", "lo" => "Laoo", "lt" => "Latn", "lv" => "Latn",
    "mk" => "Cyrl", "ml" => "Mlym", "mn" => "Cyrl", "mr" => "Deva", "ms" => "Latn",
    "my" => "Mymr", "nb" => "Latn", "ne" => "Deva", "nl" => "Latn", "no" => "Latn",
    "or" => "Orya", "pa" => "Guru", "pa-PK" => "Arab", "pl" => "Latn", "ps" => "Arab",
    "pt" => "Latn", "ro" => "Latn", "ru" => "Cyrl", "si" => "Sinh", "sk" => "Latn",
    "sl" => "Latn", "sq" => "Latn", "sr" => "Cyrl", "sr-ME" => "Latn", "sv" => "Latn",
    "sw" => "Latn", "ta" => "Taml", "te" => "Telu", "th" => "Thai", "tl" => "Latn",
    "tr" => "Latn", "uk" => "Cyrl", "ur" => "Arab", "uz" => "Latn", "uz-AF" => "Arab",
    "vi" => "Latn", "yi" => "Hebr", "zh" => "Hans", "zh-HK" => "Hant", "zh-MO" => "Hant",
    "zh-TW" => "Hant", "zu" => "Latn",
};

static ARAB_PARENTS: phf::Map<&'static str, &'static str> = phf_map! {
    "ar-AE" => "ar-015", "ar-DZ" => "ar-015", "ar-EH" => "ar-015", "ar-LY" => "ar-015",
    "ar-MA" => "ar-015", "ar-TN" => "ar-015",
};

static HANT_PARENTS: phf::Map<&'static str, &'static str> = phf_map! {
    "zh-MO" => "zh-HK",
};

static LATN_PARENTS: phf::Map<&'static str, &'static str> = phf_map! {
    "en-150" => "en-001", "en-AG" => "en-001", "en-AI" => "en-001", "en-AT" => "en-150",
    "en-AU" => "en-001", "en-BB" => "en-001", "en-BE" => "en-150", "en-BM" => "en-001",
    "en-BS" => "en-001", "en-BW" => "en-001", "en-BZ" => "en-001", "en-CA" => "en-001",
    "en-CH" => "en-150", "en-CY" => "en-001", "en-DE" => "en-150", "en-DK" => "en-150",
    "en-FI" => "en-150", "en-GB" => "en-001", "en-GH" => "en-001", "en-GI" => "en-001",
    "en-HK" => "en-001", "en-IE" => "en-001", "en-IL" => "en-001", "en-IN" => "en-001",
    "en-JM" => "en-001", "en-KE" => "en-001", "en-MT" => "en-001", "en-MY" => "en-001",
    "en-NG" => "en-001", "en-NL" => "en-150", "en-NZ" => "en-001", "en-PK" => "en-001",
    "en-SE" => "en-150", "en-SG" => "en-001", "en-ZA" => "en-001", "en-ZM" => "en-001",
    "es-AR" => "es-419", "es-BO" => "es-419", "es-BR" => "es-419", "es-CL" => "es-419",
    "es-CO" => "es-419", "es-CR" => "es-419", "es-CU" => "es-419", "es-DO" => "es-419",
    "es-EC" => "es-419", "es-GT" => "es-419", "es-HN" => "es-419", "es-MX" => "es-419",
    "es-NI" => "es-419", "es-PA" => "es-419", "es-PE" => "es-419", "es-PR" => "es-419",
    "es-PY" => "es-419", "es-SV" => "es-419", "es-US" => "es-419", "es-UY" => "es-419",
    "es-VE" => "es-419", "pt-AO" => "pt-PT", "pt-CH" => "pt-PT", "pt-CV" => "pt-PT",
    "pt-GQ" => "pt-PT", "pt-GW" => "pt-PT", "pt-LU" => "pt-PT", "pt-MO" => "pt-PT",
    "pt-MZ" => "pt-PT", "pt-ST" => "pt-PT", "pt-TL" => "pt-PT",
};

/// Locales that best represent their language and script
static REPRESENTATIVE_LOCALES: phf::Set<&'static str> = phf_set! {
    "ar-Arab-EG", "de-Latn-DE", "en-Latn-GB", "en-Latn-US", "es-Latn-ES", "es-Latn-MX",
    "fr-Latn-FR", "it-Latn-IT", "ja-Jpan-JP", "ko-Kore-KR", "nl-Latn-NL", "pt-Latn-BR",
    "pt-Latn-PT", "ru-Cyrl-RU", "sr-Cyrl-RS", "zh-Hans-CN", "zh-Hant-HK", "zh-Hant-TW",
};

/// Regions whose English is closer to US English than to `en-001`
static CLOSE_TO_US_ENGLISH: phf::Set<&'static str> = phf_set! {
    "", "AS", "GU", "MH", "MP", "PR", "UM", "US", "VI",
};

/// Pack a two or three letter subtag.
///
/// Three letter subtags are stored as three 5 bit values relative to `base`
/// with the high bit of the first byte set.
fn pack_subtag(input: &[u8], base: u8) -> [u8; 2] {
    match input {
        [a, b] => [*a, *b],
        [a, b, c, ..] => {
            let first = a.wrapping_sub(base) & 0x7f;
            let second = b.wrapping_sub(base) & 0x7f;
            let third = c.wrapping_sub(base) & 0x7f;
            [0x80 | (third << 2) | (second >> 3), (second << 5) | first]
        }
        _ => [0, 0],
    }
}

fn unpack_subtag(input: [u8; 2], base: u8) -> String {
    if input[0] & 0x80 != 0 {
        let first = input[1] & 0x1f;
        let second = ((input[1] & 0xe0) >> 5) + ((input[0] & 0x03) << 3);
        let third = (input[0] & 0x7c) >> 2;
        [first, second, third]
            .iter()
            .map(|c| char::from(c.wrapping_add(base)))
            .collect()
    } else if input[0] != 0 {
        input.iter().map(|&c| char::from(c)).collect()
    } else {
        String::new()
    }
}

#[inline]
pub fn pack_language(language: &str) -> [u8; 2] {
    pack_subtag(language.to_ascii_lowercase().as_bytes(), b'a')
}

#[inline]
pub fn pack_region(region: &str) -> [u8; 2] {
    pack_subtag(region.to_ascii_uppercase().as_bytes(), b'0')
}

#[inline]
pub fn unpack_language(language: [u8; 2]) -> String {
    unpack_subtag(language, b'a')
}

#[inline]
pub fn unpack_region(region: [u8; 2]) -> String {
    unpack_subtag(region, b'0')
}

/// `tl` and `fil` are the same language
#[inline]
pub fn langs_are_equivalent(lang1: [u8; 2], lang2: [u8; 2]) -> bool {
    lang1 == lang2
        || (lang1 == TAGALOG && lang2 == FILIPINO)
        || (lang1 == FILIPINO && lang2 == TAGALOG)
}

/// Zero padded byte array to `&str`
pub(crate) fn fixed_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

/// Likely script for given language and region, zeroes if unknown
pub fn compute_script(language: [u8; 2], region: [u8; 2]) -> [u8; 4] {
    if language[0] == 0 {
        return [0; 4];
    }

    let language = unpack_language(language);
    let region = unpack_region(region);

    let script = LIKELY_SCRIPTS
        .get(format!("{}-{}", language, region).as_str())
        .or_else(|| LIKELY_SCRIPTS.get(language.as_str()));

    let mut out = [0u8; 4];
    if let Some(script) = script {
        out.copy_from_slice(&script.as_bytes()[..4]);
    }
    out
}

/// Is given region one of the regions where US English is used
#[inline]
pub fn is_close_to_us_english(region: [u8; 2]) -> bool {
    CLOSE_TO_US_ENGLISH.contains(unpack_region(region).as_str())
}

/// Locale in the parent tree, `region` is empty for the bare language
#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeLocale {
    language: String,
    region: String,
}

impl TreeLocale {
    fn key(&self) -> String {
        if self.region.is_empty() {
            self.language.clone()
        } else {
            format!("{}-{}", self.language, self.region)
        }
    }

    /// `None` once the language itself is reached
    fn parent(&self, script: &str) -> Option<TreeLocale> {
        if self.region.is_empty() {
            return None;
        }

        let parents = match script {
            "Arab" => Some(&ARAB_PARENTS),
            "Hant" => Some(&HANT_PARENTS),
            "Latn" => Some(&LATN_PARENTS),
            _ => None,
        };

        let parent = parents.and_then(|p| p.get(self.key().as_str()));
        Some(match parent.and_then(|p| p.split_once('-')) {
            Some((language, region)) => TreeLocale {
                language: language.to_owned(),
                region: region.to_owned(),
            },
            None => TreeLocale {
                language: self.language.clone(),
                region: String::new(),
            },
        })
    }

    /// Walk up from `self` collecting ancestors until one of `stop` is hit.
    ///
    /// Returns the ancestors (self included) and the index in `stop` that ended the walk.
    fn ancestors(&self, script: &str, stop: &[TreeLocale]) -> (Vec<TreeLocale>, Option<usize>) {
        let mut out = Vec::new();
        let mut current = Some(self.clone());

        while let Some(locale) = current {
            let hit = stop.iter().position(|s| *s == locale);
            let next = locale.parent(script);
            out.push(locale);
            if hit.is_some() {
                return (out, hit);
            }
            current = next;
        }

        (out, None)
    }

    /// Distance in the parent tree between `self` and the lowest shared ancestor
    fn distance(&self, script: &str, request_ancestors: &[TreeLocale]) -> usize {
        let (own, index) = self.ancestors(script, request_ancestors);
        own.len() + index.unwrap_or(request_ancestors.len()) - 1
    }

    fn is_representative(&self, script: &str) -> bool {
        REPRESENTATIVE_LOCALES.contains(
            format!("{}-{}-{}", self.language, script, self.region).as_str(),
        )
    }
}

/// Compare two resource regions against a requested locale.
///
/// `Greater` means `left` is the better match.
pub fn compare_regions(
    left: [u8; 2],
    right: [u8; 2],
    requested_language: [u8; 2],
    requested_script: [u8; 4],
    requested_region: [u8; 2],
) -> Ordering {
    if left == right {
        return Ordering::Equal;
    }

    let language = unpack_language(requested_language);
    let script = fixed_str(&requested_script);
    let make = |region: [u8; 2]| TreeLocale {
        language: language.clone(),
        region: unpack_region(region),
    };

    let left_locale = make(left);
    let right_locale = make(right);
    let request = make(requested_region);

    let stop = [left_locale.clone(), right_locale.clone()];
    let (request_ancestors, hit) = request.ancestors(script, &stop);
    match hit {
        Some(0) => return Ordering::Greater,
        Some(_) => return Ordering::Less,
        None => {}
    }

    // neither is an ancestor of the request, closer in the tree wins
    let left_distance = left_locale.distance(script, &request_ancestors);
    let right_distance = right_locale.distance(script, &request_ancestors);
    if left_distance != right_distance {
        return right_distance.cmp(&left_distance);
    }

    let left_repr = left_locale.is_representative(script);
    let right_repr = right_locale.is_representative(script);
    if left_repr != right_repr {
        return left_repr.cmp(&right_repr);
    }

    // stable fallback, lower region code wins and letters sort before digits
    let packed = |r: [u8; 2]| u16::from_be_bytes(r);
    packed(right).cmp(&packed(left))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Base,
    UnicodeExtension,
    IgnoreTheRest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnicodeState {
    NoKey,
    ExpectKey,
    IgnoreKey,
    NumberingSystem,
}

#[derive(Debug, Clone, Copy)]
struct LocaleParser {
    state: ParserState,
    unicode: UnicodeState,
}

impl LocaleParser {
    fn assign(&mut self, config: &mut ResTableConfig, part: &str) {
        let bytes = part.as_bytes();

        if self.state == ParserState::UnicodeExtension {
            match bytes.len() {
                // other extensions are not supported
                1 => self.state = ParserState::IgnoreTheRest,
                2 => match self.unicode {
                    UnicodeState::NoKey | UnicodeState::ExpectKey => {
                        self.unicode = if part.eq_ignore_ascii_case("nu") {
                            UnicodeState::NumberingSystem
                        } else {
                            UnicodeState::IgnoreKey
                        };
                    }
                    _ => self.state = ParserState::IgnoreTheRest,
                },
                3..=8 => match self.unicode {
                    UnicodeState::NumberingSystem => {
                        // only the first numbering system counts
                        if config.locale_numbering_system[0] == 0 {
                            copy_lower(&mut config.locale_numbering_system, bytes);
                            self.unicode = UnicodeState::ExpectKey;
                        } else {
                            self.state = ParserState::IgnoreTheRest;
                        }
                    }
                    UnicodeState::IgnoreKey => self.unicode = UnicodeState::ExpectKey,
                    UnicodeState::ExpectKey => self.state = ParserState::IgnoreTheRest,
                    UnicodeState::NoKey => {}
                },
                _ => self.state = ParserState::IgnoreTheRest,
            }
            return;
        }

        match bytes.len() {
            0 => self.state = ParserState::IgnoreTheRest,
            1 => {
                self.state = if part.eq_ignore_ascii_case("u") {
                    ParserState::UnicodeExtension
                } else {
                    ParserState::IgnoreTheRest
                };
            }
            2 | 3 => {
                if config.language[0] != 0 {
                    config.country = pack_region(part);
                } else {
                    config.language = pack_language(part);
                }
            }
            4 if !bytes[0].is_ascii_digit() => {
                config.locale_script = [
                    bytes[0].to_ascii_uppercase(),
                    bytes[1].to_ascii_lowercase(),
                    bytes[2].to_ascii_lowercase(),
                    bytes[3].to_ascii_lowercase(),
                ];
            }
            4..=8 => copy_lower(&mut config.locale_variant, bytes),
            _ => self.state = ParserState::IgnoreTheRest,
        }
    }
}

fn copy_lower(out: &mut [u8], input: &[u8]) {
    for (o, i) in out.iter_mut().zip(input) {
        *o = i.to_ascii_lowercase();
    }
}

impl ResTableConfig {
    /// Reset language, region, script, variant and numbering system
    pub fn clear_locale(&mut self) {
        self.language = [0; 2];
        self.country = [0; 2];
        self.locale_script = [0; 4];
        self.locale_script_was_computed = false;
        self.locale_variant = [0; 8];
        self.locale_numbering_system = [0; 8];
    }

    /// Fill `locale_script` from the likely scripts table
    #[inline]
    pub fn compute_script(&mut self) {
        self.locale_script = compute_script(self.language, self.country);
    }

    /// Set the locale from a BCP-47 tag such as `sr-Latn-RS` or `ar-u-nu-latn`.
    ///
    /// Unsupported subtags stop the parse, everything read so far is kept.
    pub fn set_bcp47_locale(&mut self, tag: &str) {
        self.clear_locale();

        let mut parser = LocaleParser {
            state: ParserState::Base,
            unicode: UnicodeState::NoKey,
        };

        for part in tag.split('-') {
            parser.assign(self, part);
            if parser.state == ParserState::IgnoreTheRest {
                warn!("ignoring unsupported part of locale tag {:?}", tag);
                break;
            }
        }

        self.locale_script_was_computed = self.locale_script[0] == 0;
        if self.locale_script_was_computed {
            self.compute_script();
        }
    }

    /// BCP-47 tag of the locale part, computed scripts are omitted
    pub fn bcp47_locale(&self, canonicalize: bool) -> String {
        let mut parts = Vec::with_capacity(5);

        if self.language[0] != 0 {
            let language = unpack_language(self.language);
            parts.push(if canonicalize && language == "tl" {
                "fil".to_owned()
            } else {
                language
            });
        }
        if self.locale_script[0] != 0 && !self.locale_script_was_computed {
            parts.push(fixed_str(&self.locale_script).to_owned());
        }
        if self.country[0] != 0 {
            parts.push(unpack_region(self.country));
        }
        if self.locale_variant[0] != 0 {
            parts.push(fixed_str(&self.locale_variant).to_owned());
        }
        if self.locale_numbering_system[0] != 0 {
            parts.push(format!(
                "u-nu-{}",
                fixed_str(&self.locale_numbering_system)
            ));
        }

        parts.join("-")
    }
}
