use bitflags::bitflags;
use log::warn;
use winnow::binary::{le_u16, le_u32, u8};
use winnow::prelude::*;
use winnow::token::take;

bitflags! {
    /// Bitmask for configuration changes and qualifiers from Android's AConfiguration.
    ///
    /// Also used as type spec flags: which axes vary across the variants of one entry.
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/native/include/android/configuration.h;l=57)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResTableConfigFlags: u32 {
        /// Bit mask for Mobile Country Code (MCC) configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#mcc>
        const CONFIG_MCC = 0x0001;

        /// Bit mask for Mobile Network Code (MNC) configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#mnc>
        const CONFIG_MNC = 0x0002;

        /// Bit mask for locale configuration (language and region).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#LocaleQualifier>
        const CONFIG_LOCALE = 0x0004;

        /// Bit mask for touchscreen configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#TouchscreenQualifier>
        const CONFIG_TOUCHSCREEN = 0x0008;

        /// Bit mask for keyboard type configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#ImeQualifier>
        const CONFIG_KEYBOARD = 0x0010;

        /// Bit mask for keyboard availability (hidden/shown).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#KeyboardAvailQualifier>
        const CONFIG_KEYBOARD_HIDDEN = 0x0020;

        /// Bit mask for navigation method configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#NavigationQualifier>
        const CONFIG_NAVIGATION = 0x0040;

        /// Bit mask for screen orientation configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#OrientationQualifier>
        const CONFIG_ORIENTATION = 0x0080;

        /// Bit mask for screen density configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#DensityQualifier>
        const CONFIG_DENSITY = 0x0100;

        /// Bit mask for screen size configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#ScreenSizeQualifier>
        const CONFIG_SCREEN_SIZE = 0x0200;

        /// Bit mask for platform version configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#VersionQualifier>
        const CONFIG_VERSION = 0x0400;

        /// Bit mask for screen layout (long/short, size).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#ScreenAspectQualifier>
        const CONFIG_SCREEN_LAYOUT = 0x0800;

        /// Bit mask for UI mode (normal, car, desk, watch, etc.).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#UiModeQualifier>
        const CONFIG_UI_MODE = 0x1000;

        /// Bit mask for smallest screen width configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#SmallestScreenWidthQualifier>
        const CONFIG_SMALLEST_SCREEN_SIZE = 0x2000;

        /// Bit mask for layout direction (LTR or RTL).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#LayoutDirectionQualifier>
        const CONFIG_LAYOUTDIR = 0x4000;

        /// Bit mask for screen roundness (round or not).
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#ScreenRoundQualifier>
        const CONFIG_SCREEN_ROUND = 0x8000;

        /// Bit mask for wide color gamut and HDR configuration.
        /// See: <https://developer.android.com/guide/topics/resources/providing-resources#WideColorGamutQualifier>
        const CONFIG_COLOR_MODE = 0x10000;

        /// Additional flag indicating an entry is public
        const SPEC_PUBLIC = 0x40000000;

        /// Additional flag indicating the resource id for this resource may change in a future build.
        const SPEC_STAGED_API = 0x20000000;
    }
}

impl ResTableConfigFlags {
    /// Diff value that drops every cached bag
    pub const EVERYTHING: ResTableConfigFlags = ResTableConfigFlags::from_bits_retain(u32::MAX);
}

/// Describes a particular resource configuration.
///
/// Every field uses `0` for "any". The packed unions of the C structure
/// (`imsi`, `locale`, `screenType`, ...) are exposed as methods.
///
/// See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=960
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResTableConfig {
    /// Mobile country code (from SIM). 0 means "any".
    pub mcc: u16,

    /// Mobile network code (from SIM). 0 means "any", 0xffff means "no mnc".
    pub mnc: u16,

    /// Two ASCII letters, or a packed three letter ISO-639-2 code when the high bit is set
    pub language: [u8; 2],

    /// Two ASCII letters, or a packed UN M.49 3 digit region code when the high bit is set
    pub country: [u8; 2],

    pub orientation: u8,
    pub touchscreen: u8,
    pub density: u16,

    pub keyboard: u8,
    pub navigation: u8,
    pub input_flags: u8,

    pub screen_width: u16,
    pub screen_height: u16,

    pub sdk_version: u16,

    /// For now minor version must always be 0
    pub minor_version: u16,

    pub screen_layout: u8,
    pub ui_mode: u8,
    pub smallest_screen_width_dp: u16,

    pub screen_width_dp: u16,
    pub screen_height_dp: u16,

    /// ISO-15924 short name, title case
    pub locale_script: [u8; 4],

    /// A single BCP-47 variant subtag, lowercase, 0 padded
    pub locale_variant: [u8; 8],

    pub screen_layout2: u8,
    pub color_mode: u8,

    /// `locale_script` was filled by the locale data, not provided by the resource
    pub locale_script_was_computed: bool,

    /// Unicode `nu` extension value, lowercase, 0 padded
    pub locale_numbering_system: [u8; 8],
}

impl ResTableConfig {
    pub const ORIENTATION_ANY: u8 = 0x0000;
    pub const ORIENTATION_PORT: u8 = 0x0001;
    pub const ORIENTATION_LAND: u8 = 0x0002;
    pub const ORIENTATION_SQUARE: u8 = 0x0003;

    pub const TOUCHSCREEN_ANY: u8 = 0x0000;
    pub const TOUCHSCREEN_NOTOUCH: u8 = 0x0001;
    pub const TOUCHSCREEN_STYLUS: u8 = 0x0002;
    pub const TOUCHSCREEN_FINGER: u8 = 0x0003;

    pub const DENSITY_DEFAULT: u16 = 0;
    pub const DENSITY_LOW: u16 = 120;
    pub const DENSITY_MEDIUM: u16 = 160;
    pub const DENSITY_TV: u16 = 213;
    pub const DENSITY_HIGH: u16 = 240;
    pub const DENSITY_XHIGH: u16 = 320;
    pub const DENSITY_XXHIGH: u16 = 480;
    pub const DENSITY_XXXHIGH: u16 = 640;
    pub const DENSITY_ANY: u16 = 0xfffe;
    pub const DENSITY_NONE: u16 = 0xffff;

    pub const KEYBOARD_ANY: u8 = 0x0000;
    pub const KEYBOARD_NOKEYS: u8 = 0x0001;
    pub const KEYBOARD_QWERTY: u8 = 0x0002;
    pub const KEYBOARD_12KEY: u8 = 0x0003;

    pub const NAVIGATION_ANY: u8 = 0x0000;
    pub const NAVIGATION_NONAV: u8 = 0x0001;
    pub const NAVIGATION_DPAD: u8 = 0x0002;
    pub const NAVIGATION_TRACKBALL: u8 = 0x0003;
    pub const NAVIGATION_WHEEL: u8 = 0x0004;

    pub const MASK_KEYSHIDDEN: u8 = 0x0003;
    pub const KEYSHIDDEN_ANY: u8 = 0x0000;
    pub const KEYSHIDDEN_NO: u8 = 0x0001;
    pub const KEYSHIDDEN_YES: u8 = 0x0002;
    pub const KEYSHIDDEN_SOFT: u8 = 0x0003;

    pub const MASK_NAVHIDDEN: u8 = 0x000c;
    pub const SHIFT_NAVHIDDEN: u8 = 2;
    pub const NAVHIDDEN_ANY: u8 = 0x0000;
    pub const NAVHIDDEN_NO: u8 = 0x0001 << Self::SHIFT_NAVHIDDEN;
    pub const NAVHIDDEN_YES: u8 = 0x0002 << Self::SHIFT_NAVHIDDEN;

    pub const MASK_SCREENSIZE: u8 = 0x0f;
    pub const SCREENSIZE_ANY: u8 = 0x00;
    pub const SCREENSIZE_SMALL: u8 = 0x01;
    pub const SCREENSIZE_NORMAL: u8 = 0x02;
    pub const SCREENSIZE_LARGE: u8 = 0x03;
    pub const SCREENSIZE_XLARGE: u8 = 0x04;

    pub const MASK_SCREENLONG: u8 = 0x30;
    pub const SHIFT_SCREENLONG: u8 = 4;
    pub const SCREENLONG_ANY: u8 = 0x00;
    pub const SCREENLONG_NO: u8 = 0x1 << Self::SHIFT_SCREENLONG;
    pub const SCREENLONG_YES: u8 = 0x2 << Self::SHIFT_SCREENLONG;

    pub const MASK_LAYOUTDIR: u8 = 0xc0;
    pub const SHIFT_LAYOUTDIR: u8 = 6;
    pub const LAYOUTDIR_ANY: u8 = 0x00;
    pub const LAYOUTDIR_LTR: u8 = 0x01 << Self::SHIFT_LAYOUTDIR;
    pub const LAYOUTDIR_RTL: u8 = 0x02 << Self::SHIFT_LAYOUTDIR;

    pub const MASK_UI_MODE_TYPE: u8 = 0x0f;
    pub const UI_MODE_TYPE_ANY: u8 = 0x00;
    pub const UI_MODE_TYPE_NORMAL: u8 = 0x01;
    pub const UI_MODE_TYPE_DESK: u8 = 0x02;
    pub const UI_MODE_TYPE_CAR: u8 = 0x03;
    pub const UI_MODE_TYPE_TELEVISION: u8 = 0x04;
    pub const UI_MODE_TYPE_APPLIANCE: u8 = 0x05;
    pub const UI_MODE_TYPE_WATCH: u8 = 0x06;
    pub const UI_MODE_TYPE_VR_HEADSET: u8 = 0x07;

    pub const MASK_UI_MODE_NIGHT: u8 = 0x30;
    pub const SHIFT_UI_MODE_NIGHT: u8 = 4;
    pub const UI_MODE_NIGHT_ANY: u8 = 0x00;
    pub const UI_MODE_NIGHT_NO: u8 = 0x1 << Self::SHIFT_UI_MODE_NIGHT;
    pub const UI_MODE_NIGHT_YES: u8 = 0x2 << Self::SHIFT_UI_MODE_NIGHT;

    pub const MASK_SCREENROUND: u8 = 0x03;
    pub const SCREENROUND_ANY: u8 = 0x00;
    pub const SCREENROUND_NO: u8 = 0x1;
    pub const SCREENROUND_YES: u8 = 0x2;

    pub const MASK_WIDE_COLOR_GAMUT: u8 = 0x03;
    pub const WIDE_COLOR_GAMUT_ANY: u8 = 0x00;
    pub const WIDE_COLOR_GAMUT_NO: u8 = 0x1;
    pub const WIDE_COLOR_GAMUT_YES: u8 = 0x2;

    pub const MASK_HDR: u8 = 0x0c;
    pub const SHIFT_COLOR_MODE_HDR: u8 = 2;
    pub const HDR_ANY: u8 = 0x00;
    pub const HDR_NO: u8 = 0x1 << Self::SHIFT_COLOR_MODE_HDR;
    pub const HDR_YES: u8 = 0x2 << Self::SHIFT_COLOR_MODE_HDR;

    /// Size of the structure written by current tools
    pub const SIZE: u32 = 64;

    /// Parse `ResTable_config`, fields beyond the declared size stay 0
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableConfig> {
        // to keep track of how many bytes was consumed
        let start = input.len();

        let size = le_u32.parse_next(input)?;
        // never read past the surrounding header, even if `size` says so
        let size = size.min(start as u32);

        let mut config = ResTableConfig::default();

        if size >= 8 {
            (config.mcc, config.mnc) = (le_u16, le_u16).parse_next(input)?;
        }
        if size >= 12 {
            config.language = fixed::<2>(input)?;
            config.country = fixed::<2>(input)?;
        }
        if size >= 16 {
            (config.orientation, config.touchscreen, config.density) =
                (u8, u8, le_u16).parse_next(input)?;
        }
        if size >= 20 {
            // last byte is padding
            (config.keyboard, config.navigation, config.input_flags, _) =
                (u8, u8, u8, u8).parse_next(input)?;
        }
        if size >= 24 {
            (config.screen_width, config.screen_height) = (le_u16, le_u16).parse_next(input)?;
        }
        if size >= 28 {
            (config.sdk_version, config.minor_version) = (le_u16, le_u16).parse_next(input)?;
        }
        if size >= 32 {
            (
                config.screen_layout,
                config.ui_mode,
                config.smallest_screen_width_dp,
            ) = (u8, u8, le_u16).parse_next(input)?;
        }
        if size >= 36 {
            (config.screen_width_dp, config.screen_height_dp) =
                (le_u16, le_u16).parse_next(input)?;
        }
        if size >= 40 {
            config.locale_script = fixed::<4>(input)?;
        }
        if size >= 48 {
            config.locale_variant = fixed::<8>(input)?;
        }
        if size >= 52 {
            (config.screen_layout2, config.color_mode, _) = (u8, u8, le_u16).parse_next(input)?;
        }
        if size >= 53 {
            config.locale_script_was_computed = u8.parse_next(input)? != 0;
        }
        if size >= 61 {
            config.locale_numbering_system = fixed::<8>(input)?;
        }
        if size > Self::SIZE {
            warn!("got ResTable_config with unexpected size {}, extra fields ignored", size);
        }

        // consume leftovers
        let consumed = start - input.len();
        let _ = take((size as usize).saturating_sub(consumed)).parse_next(input)?;

        Ok(config)
    }

    /// `imsi` union, mcc in the low half
    #[inline(always)]
    pub fn imsi(&self) -> u32 {
        self.mcc as u32 | (self.mnc as u32) << 16
    }

    /// `locale` union as laid out in memory, language first
    #[inline(always)]
    pub fn locale(&self) -> u32 {
        u32::from_le_bytes([
            self.language[0],
            self.language[1],
            self.country[0],
            self.country[1],
        ])
    }

    #[inline(always)]
    pub fn screen_type(&self) -> u32 {
        self.orientation as u32 | (self.touchscreen as u32) << 8 | (self.density as u32) << 16
    }

    #[inline(always)]
    pub fn input(&self) -> u32 {
        self.keyboard as u32 | (self.navigation as u32) << 8 | (self.input_flags as u32) << 16
    }

    #[inline(always)]
    pub fn screen_size(&self) -> u32 {
        self.screen_width as u32 | (self.screen_height as u32) << 16
    }

    #[inline(always)]
    pub fn version(&self) -> u32 {
        self.sdk_version as u32 | (self.minor_version as u32) << 16
    }

    #[inline(always)]
    pub fn screen_size_dp(&self) -> u32 {
        self.screen_width_dp as u32 | (self.screen_height_dp as u32) << 16
    }

    /// Configuration with every axis set to "any"
    #[inline]
    pub fn is_default(&self) -> bool {
        *self == ResTableConfig::default()
    }
}

#[inline]
fn fixed<const N: usize>(input: &mut &[u8]) -> ModalResult<[u8; N]> {
    let bytes = take(N).parse_next(input)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::config_bytes;

    #[test]
    fn parse_full_config() {
        let config = ResTableConfig {
            mcc: 310,
            mnc: 4,
            language: *b"en",
            country: *b"US",
            orientation: ResTableConfig::ORIENTATION_LAND,
            density: ResTableConfig::DENSITY_XHIGH,
            input_flags: ResTableConfig::KEYSHIDDEN_YES,
            sdk_version: 26,
            screen_layout: ResTableConfig::LAYOUTDIR_RTL | ResTableConfig::SCREENSIZE_LARGE,
            smallest_screen_width_dp: 600,
            locale_script: *b"Latn",
            locale_variant: *b"posix\0\0\0",
            color_mode: ResTableConfig::HDR_YES,
            locale_numbering_system: *b"arab\0\0\0\0",
            ..Default::default()
        };

        let bytes = config_bytes(&config);
        let mut input = &bytes[..];
        assert_eq!(ResTableConfig::parse(&mut input).unwrap(), config);
        assert!(input.is_empty());
    }

    #[test]
    fn parse_short_config() {
        let full = ResTableConfig {
            mcc: 1,
            sdk_version: 21,
            screen_width_dp: 320,
            ..Default::default()
        };

        // old tools wrote only 28 bytes
        let mut bytes = config_bytes(&full)[..28].to_vec();
        bytes[..4].copy_from_slice(&28u32.to_le_bytes());
        bytes.extend_from_slice(&[0xaa; 4]);

        let mut input = &bytes[..];
        let parsed = ResTableConfig::parse(&mut input).unwrap();
        assert_eq!(parsed.mcc, 1);
        assert_eq!(parsed.sdk_version, 21);
        assert_eq!(parsed.screen_width_dp, 0);
        assert_eq!(input, &[0xaa; 4]);
    }

    #[test]
    fn unions() {
        let config = ResTableConfig {
            mcc: 0x0102,
            mnc: 0x0304,
            language: *b"en",
            ..Default::default()
        };
        assert_eq!(config.imsi(), 0x0304_0102);
        assert_eq!(config.locale(), u32::from_le_bytes([b'e', b'n', 0, 0]));
        assert!(!config.is_default());
        assert!(ResTableConfig::default().is_default());
    }
}
