//! Resource directory qualifiers: `en-rUS-land-xhdpi-v21` and friends.
//!
//! [App resource overview. Table 2](https://developer.android.com/guide/topics/resources/providing-resources#AlternativeResources)

use std::fmt::{self, Write};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::QualifierError;
use crate::structs::ResTableConfig;
use crate::structs::locale::{fixed_str, pack_language, pack_region, unpack_language, unpack_region};

static NUMBERED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(mcc|mnc|sw|w|h|v)(\d+)(dp)?$").expect("static regex is valid")
});

static DENSITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)dpi$").expect("static regex is valid"));

static SCREEN_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)x(\d+)$").expect("static regex is valid"));

static LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}$").expect("static regex is valid"));

static REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^r([a-z]{2}|[0-9]{3})$").expect("static regex is valid"));

/// Qualifiers that set a masked bit field: (token, field, mask, value)
const KEYWORDS: &[(&str, Field, u8, u8)] = &[
    ("ldltr", Field::ScreenLayout, ResTableConfig::MASK_LAYOUTDIR, ResTableConfig::LAYOUTDIR_LTR),
    ("ldrtl", Field::ScreenLayout, ResTableConfig::MASK_LAYOUTDIR, ResTableConfig::LAYOUTDIR_RTL),
    ("small", Field::ScreenLayout, ResTableConfig::MASK_SCREENSIZE, ResTableConfig::SCREENSIZE_SMALL),
    ("normal", Field::ScreenLayout, ResTableConfig::MASK_SCREENSIZE, ResTableConfig::SCREENSIZE_NORMAL),
    ("large", Field::ScreenLayout, ResTableConfig::MASK_SCREENSIZE, ResTableConfig::SCREENSIZE_LARGE),
    ("xlarge", Field::ScreenLayout, ResTableConfig::MASK_SCREENSIZE, ResTableConfig::SCREENSIZE_XLARGE),
    ("long", Field::ScreenLayout, ResTableConfig::MASK_SCREENLONG, ResTableConfig::SCREENLONG_YES),
    ("notlong", Field::ScreenLayout, ResTableConfig::MASK_SCREENLONG, ResTableConfig::SCREENLONG_NO),
    ("round", Field::ScreenLayout2, ResTableConfig::MASK_SCREENROUND, ResTableConfig::SCREENROUND_YES),
    ("notround", Field::ScreenLayout2, ResTableConfig::MASK_SCREENROUND, ResTableConfig::SCREENROUND_NO),
    ("widecg", Field::ColorMode, ResTableConfig::MASK_WIDE_COLOR_GAMUT, ResTableConfig::WIDE_COLOR_GAMUT_YES),
    ("nowidecg", Field::ColorMode, ResTableConfig::MASK_WIDE_COLOR_GAMUT, ResTableConfig::WIDE_COLOR_GAMUT_NO),
    ("highdr", Field::ColorMode, ResTableConfig::MASK_HDR, ResTableConfig::HDR_YES),
    ("lowdr", Field::ColorMode, ResTableConfig::MASK_HDR, ResTableConfig::HDR_NO),
    ("port", Field::Orientation, 0xff, ResTableConfig::ORIENTATION_PORT),
    ("land", Field::Orientation, 0xff, ResTableConfig::ORIENTATION_LAND),
    ("square", Field::Orientation, 0xff, ResTableConfig::ORIENTATION_SQUARE),
    ("desk", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_DESK),
    ("car", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_CAR),
    ("television", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_TELEVISION),
    ("appliance", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_APPLIANCE),
    ("watch", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_WATCH),
    ("vrheadset", Field::UiMode, ResTableConfig::MASK_UI_MODE_TYPE, ResTableConfig::UI_MODE_TYPE_VR_HEADSET),
    ("night", Field::UiMode, ResTableConfig::MASK_UI_MODE_NIGHT, ResTableConfig::UI_MODE_NIGHT_YES),
    ("notnight", Field::UiMode, ResTableConfig::MASK_UI_MODE_NIGHT, ResTableConfig::UI_MODE_NIGHT_NO),
    ("notouch", Field::Touchscreen, 0xff, ResTableConfig::TOUCHSCREEN_NOTOUCH),
    ("stylus", Field::Touchscreen, 0xff, ResTableConfig::TOUCHSCREEN_STYLUS),
    ("finger", Field::Touchscreen, 0xff, ResTableConfig::TOUCHSCREEN_FINGER),
    ("keysexposed", Field::InputFlags, ResTableConfig::MASK_KEYSHIDDEN, ResTableConfig::KEYSHIDDEN_NO),
    ("keyshidden", Field::InputFlags, ResTableConfig::MASK_KEYSHIDDEN, ResTableConfig::KEYSHIDDEN_YES),
    ("keyssoft", Field::InputFlags, ResTableConfig::MASK_KEYSHIDDEN, ResTableConfig::KEYSHIDDEN_SOFT),
    ("nokeys", Field::Keyboard, 0xff, ResTableConfig::KEYBOARD_NOKEYS),
    ("qwerty", Field::Keyboard, 0xff, ResTableConfig::KEYBOARD_QWERTY),
    ("12key", Field::Keyboard, 0xff, ResTableConfig::KEYBOARD_12KEY),
    ("navexposed", Field::InputFlags, ResTableConfig::MASK_NAVHIDDEN, ResTableConfig::NAVHIDDEN_NO),
    ("navhidden", Field::InputFlags, ResTableConfig::MASK_NAVHIDDEN, ResTableConfig::NAVHIDDEN_YES),
    ("nonav", Field::Navigation, 0xff, ResTableConfig::NAVIGATION_NONAV),
    ("dpad", Field::Navigation, 0xff, ResTableConfig::NAVIGATION_DPAD),
    ("trackball", Field::Navigation, 0xff, ResTableConfig::NAVIGATION_TRACKBALL),
    ("wheel", Field::Navigation, 0xff, ResTableConfig::NAVIGATION_WHEEL),
];

const DENSITIES: &[(&str, u16)] = &[
    ("ldpi", ResTableConfig::DENSITY_LOW),
    ("mdpi", ResTableConfig::DENSITY_MEDIUM),
    ("tvdpi", ResTableConfig::DENSITY_TV),
    ("hdpi", ResTableConfig::DENSITY_HIGH),
    ("xhdpi", ResTableConfig::DENSITY_XHIGH),
    ("xxhdpi", ResTableConfig::DENSITY_XXHIGH),
    ("xxxhdpi", ResTableConfig::DENSITY_XXXHIGH),
    ("anydpi", ResTableConfig::DENSITY_ANY),
    ("nodpi", ResTableConfig::DENSITY_NONE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ScreenLayout,
    ScreenLayout2,
    ColorMode,
    Orientation,
    UiMode,
    Touchscreen,
    InputFlags,
    Keyboard,
    Navigation,
}

impl ResTableConfig {
    fn field_mut(&mut self, field: Field) -> &mut u8 {
        match field {
            Field::ScreenLayout => &mut self.screen_layout,
            Field::ScreenLayout2 => &mut self.screen_layout2,
            Field::ColorMode => &mut self.color_mode,
            Field::Orientation => &mut self.orientation,
            Field::UiMode => &mut self.ui_mode,
            Field::Touchscreen => &mut self.touchscreen,
            Field::InputFlags => &mut self.input_flags,
            Field::Keyboard => &mut self.keyboard,
            Field::Navigation => &mut self.navigation,
        }
    }

    fn field(&self, field: Field) -> u8 {
        match field {
            Field::ScreenLayout => self.screen_layout,
            Field::ScreenLayout2 => self.screen_layout2,
            Field::ColorMode => self.color_mode,
            Field::Orientation => self.orientation,
            Field::UiMode => self.ui_mode,
            Field::Touchscreen => self.touchscreen,
            Field::InputFlags => self.input_flags,
            Field::Keyboard => self.keyboard,
            Field::Navigation => self.navigation,
        }
    }

    /// Raise `sdk_version` to the first platform that understands the qualifiers in use
    pub fn apply_version_for_compatibility(&mut self) {
        let min_sdk = if self.color_mode & (Self::MASK_WIDE_COLOR_GAMUT | Self::MASK_HDR) != 0
            || self.ui_mode & Self::MASK_UI_MODE_TYPE == Self::UI_MODE_TYPE_VR_HEADSET
        {
            26
        } else if self.screen_layout2 & Self::MASK_SCREENROUND != 0 {
            23
        } else if self.density == Self::DENSITY_ANY {
            21
        } else if self.smallest_screen_width_dp != 0
            || self.screen_width_dp != 0
            || self.screen_height_dp != 0
        {
            13
        } else if self.ui_mode & (Self::MASK_UI_MODE_TYPE | Self::MASK_UI_MODE_NIGHT) != 0 {
            8
        } else if self.screen_layout & (Self::MASK_SCREENSIZE | Self::MASK_SCREENLONG) != 0
            || self.density != Self::DENSITY_DEFAULT
        {
            4
        } else {
            0
        };

        if min_sdk > self.sdk_version {
            self.sdk_version = min_sdk;
        }
    }

    /// Parse qualifiers without the implicit version bump
    pub fn parse_qualifiers(qualifiers: &str) -> Result<ResTableConfig, QualifierError> {
        let mut config = ResTableConfig::default();
        if qualifiers.is_empty() || qualifiers == "default" {
            return Ok(config);
        }

        let lowered = qualifiers.to_ascii_lowercase();
        let mut tokens = lowered.split('-').peekable();

        while let Some(token) = tokens.next() {
            let unknown = || QualifierError::Unknown(token.to_owned());

            if let Some((_, field, mask, value)) = KEYWORDS.iter().find(|(k, ..)| *k == token) {
                let slot = config.field_mut(*field);
                *slot = (*slot & !mask) | value;
                continue;
            }

            if let Some((_, density)) = DENSITIES.iter().find(|(k, _)| *k == token) {
                config.density = *density;
                continue;
            }

            if let Some(caps) = DENSITY.captures(token) {
                config.density = number(&caps[1], token)?;
                continue;
            }

            if let Some(caps) = SCREEN_SIZE.captures(token) {
                let (a, b): (u16, u16) = (number(&caps[1], token)?, number(&caps[2], token)?);
                // larger value always goes first
                config.screen_width = a.max(b);
                config.screen_height = a.min(b);
                continue;
            }

            if let Some(caps) = NUMBERED.captures(token) {
                let dp = caps.get(3).is_some();
                let digits = &caps[2];
                match (&caps[1], dp) {
                    ("mcc", false) => config.mcc = number(digits, token)?,
                    // mnc00 is a real network code, distinct from "any"
                    ("mnc", false) if digits.chars().all(|c| c == '0') => config.mnc = 0xffff,
                    ("mnc", false) => config.mnc = number(digits, token)?,
                    ("sw", true) => config.smallest_screen_width_dp = number(digits, token)?,
                    ("w", true) => config.screen_width_dp = number(digits, token)?,
                    ("h", true) => config.screen_height_dp = number(digits, token)?,
                    ("v", false) => config.sdk_version = number(digits, token)?,
                    _ => return Err(unknown()),
                }
                continue;
            }

            if let Some(tag) = token.strip_prefix("b+") {
                config.set_bcp47_locale(&tag.replace('+', "-"));
                if config.locale_script_was_computed {
                    config.locale_script = [0; 4];
                    config.locale_script_was_computed = false;
                }
                continue;
            }

            if config.language[0] == 0 && LANGUAGE.is_match(token) {
                config.language = pack_language(token);
                if let Some(region) = tokens.peek().copied().and_then(|t| REGION.captures(t)) {
                    config.country = pack_region(&region[1]);
                    tokens.next();
                }
                continue;
            }

            return Err(unknown());
        }

        Ok(config)
    }
}

fn number<T: FromStr>(digits: &str, token: &str) -> Result<T, QualifierError> {
    digits
        .parse()
        .map_err(|_| QualifierError::OutOfRange(token.to_owned()))
}

impl FromStr for ResTableConfig {
    type Err = QualifierError;

    /// Parse qualifiers the way resource directories are named, with the
    /// implicit minimum platform version applied.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config = ResTableConfig::parse_qualifiers(s)?;
        config.apply_version_for_compatibility();
        Ok(config)
    }
}

#[inline]
fn push_part(result: &mut String, part: &str) {
    if !result.is_empty() {
        result.push('-');
    }
    result.push_str(part);
}

impl ResTableConfig {
    /// Locale in directory form: legacy `en-rUS`, or `b+sr+Latn` when a
    /// script, variant or numbering system is present
    fn append_dir_locale(&self, result: &mut String) {
        if self.language[0] == 0 {
            return;
        }

        let script_provided = self.locale_script[0] != 0 && !self.locale_script_was_computed;
        if !script_provided && self.locale_variant[0] == 0 && self.locale_numbering_system[0] == 0
        {
            push_part(result, &unpack_language(self.language));
            if self.country[0] != 0 {
                let _ = write!(result, "-r{}", unpack_region(self.country));
            }
            return;
        }

        let mut tag = format!("b+{}", unpack_language(self.language));
        if script_provided {
            let _ = write!(tag, "+{}", fixed_str(&self.locale_script));
        }
        if self.country[0] != 0 {
            let _ = write!(tag, "+{}", unpack_region(self.country));
        }
        if self.locale_variant[0] != 0 {
            let _ = write!(tag, "+{}", fixed_str(&self.locale_variant));
        }
        if self.locale_numbering_system[0] != 0 {
            let _ = write!(tag, "+u+nu+{}", fixed_str(&self.locale_numbering_system));
        }
        push_part(result, &tag);
    }

    fn keyword(&self, field: Field, mask: u8) -> Option<&'static str> {
        let value = self.field(field) & mask;
        if value == 0 {
            return None;
        }
        KEYWORDS
            .iter()
            .find(|(_, f, m, v)| *f == field && *m == mask && *v == value)
            .map(|(k, ..)| *k)
    }
}

impl fmt::Display for ResTableConfig {
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=3368)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = String::with_capacity(32);

        if self.mcc != 0 {
            push_part(&mut result, &format!("mcc{}", self.mcc));
        }
        match self.mnc {
            0 => {}
            0xffff => push_part(&mut result, "mnc00"),
            mnc => push_part(&mut result, &format!("mnc{}", mnc)),
        }

        self.append_dir_locale(&mut result);

        let keyword = |field: Field, mask: u8, result: &mut String| {
            if let Some(k) = self.keyword(field, mask) {
                push_part(result, k);
            }
        };

        keyword(Field::ScreenLayout, Self::MASK_LAYOUTDIR, &mut result);

        if self.smallest_screen_width_dp != 0 {
            push_part(&mut result, &format!("sw{}dp", self.smallest_screen_width_dp));
        }
        if self.screen_width_dp != 0 {
            push_part(&mut result, &format!("w{}dp", self.screen_width_dp));
        }
        if self.screen_height_dp != 0 {
            push_part(&mut result, &format!("h{}dp", self.screen_height_dp));
        }

        keyword(Field::ScreenLayout, Self::MASK_SCREENSIZE, &mut result);
        keyword(Field::ScreenLayout, Self::MASK_SCREENLONG, &mut result);
        keyword(Field::ScreenLayout2, Self::MASK_SCREENROUND, &mut result);
        keyword(Field::ColorMode, Self::MASK_WIDE_COLOR_GAMUT, &mut result);
        keyword(Field::ColorMode, Self::MASK_HDR, &mut result);
        keyword(Field::Orientation, 0xff, &mut result);
        keyword(Field::UiMode, Self::MASK_UI_MODE_TYPE, &mut result);
        keyword(Field::UiMode, Self::MASK_UI_MODE_NIGHT, &mut result);

        if self.density != Self::DENSITY_DEFAULT {
            match DENSITIES.iter().find(|(_, d)| *d == self.density) {
                Some((name, _)) => push_part(&mut result, name),
                None => push_part(&mut result, &format!("{}dpi", self.density)),
            }
        }

        keyword(Field::Touchscreen, 0xff, &mut result);
        keyword(Field::InputFlags, Self::MASK_KEYSHIDDEN, &mut result);
        keyword(Field::Keyboard, 0xff, &mut result);
        keyword(Field::InputFlags, Self::MASK_NAVHIDDEN, &mut result);
        keyword(Field::Navigation, 0xff, &mut result);

        if self.screen_size() != 0 {
            push_part(
                &mut result,
                &format!("{}x{}", self.screen_width, self.screen_height),
            );
        }

        if self.version() != 0 {
            push_part(&mut result, &format!("v{}", self.sdk_version));
            if self.minor_version != 0 {
                let _ = write!(result, ".{}", self.minor_version);
            }
        }

        if result.is_empty() {
            f.write_str("default")
        } else {
            f.write_str(&result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_legacy_locale() {
        let config: ResTableConfig = "en-rUS-land-xhdpi-v21".parse().unwrap();
        assert_eq!(config.language, *b"en");
        assert_eq!(config.country, *b"US");
        assert_eq!(config.orientation, ResTableConfig::ORIENTATION_LAND);
        assert_eq!(config.density, ResTableConfig::DENSITY_XHIGH);
        assert_eq!(config.sdk_version, 21);
        assert_eq!(config.locale_script, [0; 4]);
        assert_eq!(config.to_string(), "en-rUS-land-xhdpi-v21");
    }

    #[test]
    fn parse_bcp47_locale() {
        let config: ResTableConfig = "b+sr+Latn+RS".parse().unwrap();
        assert_eq!(config.language, *b"sr");
        assert_eq!(config.locale_script, *b"Latn");
        assert_eq!(config.country, *b"RS");
        assert_eq!(config.to_string(), "b+sr+Latn+RS");

        let config: ResTableConfig = "b+es+419".parse().unwrap();
        assert_eq!(config.to_string(), "es-r419");
    }

    #[test]
    fn implicit_versions() {
        let cases = [
            ("night", 8),
            ("sw600dp", 13),
            ("anydpi", 21),
            ("round", 23),
            ("widecg", 26),
            ("large", 4),
            ("hdpi", 4),
            ("hdpi-v11", 11),
            ("port", 0),
        ];
        for (input, sdk) in cases {
            let config: ResTableConfig = input.parse().unwrap();
            assert_eq!(config.sdk_version, sdk, "{input}");
        }
    }

    #[test]
    fn mnc_zero() {
        let config = ResTableConfig::parse_qualifiers("mcc310-mnc00").unwrap();
        assert_eq!(config.mcc, 310);
        assert_eq!(config.mnc, 0xffff);
        assert_eq!(config.to_string(), "mcc310-mnc00");
    }

    #[test]
    fn display_order() {
        let config = ResTableConfig::parse_qualifiers("v26-night-ldrtl-de-keyshidden-sw360dp").unwrap();
        assert_eq!(config.to_string(), "de-ldrtl-sw360dp-night-keyshidden-v26");
        assert_eq!(ResTableConfig::default().to_string(), "default");
    }

    #[test]
    fn rejects_unknown() {
        assert_eq!(
            ResTableConfig::parse_qualifiers("en-bogus"),
            Err(QualifierError::Unknown("bogus".to_owned()))
        );
        assert!(matches!(
            ResTableConfig::parse_qualifiers("v99999999"),
            Err(QualifierError::OutOfRange(_))
        ));
        // a single language only
        assert!(ResTableConfig::parse_qualifiers("en-de").is_err());
    }
}
