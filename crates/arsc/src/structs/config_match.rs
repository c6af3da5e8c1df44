//! Configuration selection: which variants apply to a device and which of two
//! applicable variants wins.
//!
//! See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=2400

use std::cmp::Ordering;

use crate::structs::locale::{
    ENGLISH, UNITED_STATES, compare_regions, compute_script, is_close_to_us_english,
    langs_are_equivalent,
};
use crate::structs::{ResTableConfig, ResTableConfigFlags};

/// Outcome of comparing one axis: `Some(false)` when only `theirs` is set,
/// `Some(true)` when only `mine` is set
#[inline(always)]
fn specificity<T: Copy + PartialEq + Default>(mine: T, theirs: T) -> Option<bool> {
    if mine == theirs {
        None
    } else if mine == T::default() {
        Some(false)
    } else if theirs == T::default() {
        Some(true)
    } else {
        None
    }
}

macro_rules! decide {
    ($e:expr) => {
        if let Some(result) = $e {
            return result;
        }
    };
}

/// Axis differs and the request cares about it
#[inline(always)]
fn differs_masked(mine: u8, theirs: u8, requested: u8, mask: u8) -> bool {
    (mine ^ theirs) & mask != 0 && requested & mask != 0
}

impl ResTableConfig {
    /// Can this variant be used on a device with `settings`
    pub fn matches(&self, settings: &ResTableConfig) -> bool {
        if self.mcc != 0 && self.mcc != settings.mcc {
            return false;
        }
        if self.mnc != 0 && self.mnc != settings.mnc {
            return false;
        }

        if self.locale() != 0 && !self.locale_matches(settings) {
            return false;
        }

        let layout_dir = self.screen_layout & Self::MASK_LAYOUTDIR;
        if layout_dir != 0 && layout_dir != settings.screen_layout & Self::MASK_LAYOUTDIR {
            return false;
        }

        // larger screen buckets than the device never match
        let screen_size = self.screen_layout & Self::MASK_SCREENSIZE;
        if screen_size != 0 && screen_size > settings.screen_layout & Self::MASK_SCREENSIZE {
            return false;
        }

        let screen_long = self.screen_layout & Self::MASK_SCREENLONG;
        if screen_long != 0 && screen_long != settings.screen_layout & Self::MASK_SCREENLONG {
            return false;
        }

        let ui_mode_type = self.ui_mode & Self::MASK_UI_MODE_TYPE;
        if ui_mode_type != 0 && ui_mode_type != settings.ui_mode & Self::MASK_UI_MODE_TYPE {
            return false;
        }

        let ui_mode_night = self.ui_mode & Self::MASK_UI_MODE_NIGHT;
        if ui_mode_night != 0 && ui_mode_night != settings.ui_mode & Self::MASK_UI_MODE_NIGHT {
            return false;
        }

        if self.smallest_screen_width_dp != 0
            && self.smallest_screen_width_dp > settings.smallest_screen_width_dp
        {
            return false;
        }

        let round = self.screen_layout2 & Self::MASK_SCREENROUND;
        if round != 0 && round != settings.screen_layout2 & Self::MASK_SCREENROUND {
            return false;
        }

        let hdr = self.color_mode & Self::MASK_HDR;
        if hdr != 0 && hdr != settings.color_mode & Self::MASK_HDR {
            return false;
        }

        let wide = self.color_mode & Self::MASK_WIDE_COLOR_GAMUT;
        if wide != 0 && wide != settings.color_mode & Self::MASK_WIDE_COLOR_GAMUT {
            return false;
        }

        if self.screen_width_dp != 0 && self.screen_width_dp > settings.screen_width_dp {
            return false;
        }
        if self.screen_height_dp != 0 && self.screen_height_dp > settings.screen_height_dp {
            return false;
        }

        if self.orientation != 0 && self.orientation != settings.orientation {
            return false;
        }
        // density always matches, the system scales it
        if self.touchscreen != 0 && self.touchscreen != settings.touchscreen {
            return false;
        }

        let keys_hidden = self.input_flags & Self::MASK_KEYSHIDDEN;
        let set_keys_hidden = settings.input_flags & Self::MASK_KEYSHIDDEN;
        // KEYSHIDDEN_NO also matches a device reporting KEYSHIDDEN_SOFT
        if keys_hidden != 0
            && keys_hidden != set_keys_hidden
            && (keys_hidden != Self::KEYSHIDDEN_NO || set_keys_hidden != Self::KEYSHIDDEN_SOFT)
        {
            return false;
        }

        let nav_hidden = self.input_flags & Self::MASK_NAVHIDDEN;
        if nav_hidden != 0 && nav_hidden != settings.input_flags & Self::MASK_NAVHIDDEN {
            return false;
        }
        if self.keyboard != 0 && self.keyboard != settings.keyboard {
            return false;
        }
        if self.navigation != 0 && self.navigation != settings.navigation {
            return false;
        }

        if self.screen_width != 0 && self.screen_width > settings.screen_width {
            return false;
        }
        if self.screen_height != 0 && self.screen_height > settings.screen_height {
            return false;
        }

        if self.sdk_version != 0 && self.sdk_version > settings.sdk_version {
            return false;
        }
        if self.minor_version != 0 && self.minor_version != settings.minor_version {
            return false;
        }

        true
    }

    fn locale_matches(&self, settings: &ResTableConfig) -> bool {
        if self.language[0] != 0 && !langs_are_equivalent(self.language, settings.language) {
            return false;
        }

        // fall back to region equality when a script can't be determined
        let script = if settings.locale_script[0] == 0 {
            None
        } else if self.locale_script[0] == 0 && !self.locale_script_was_computed {
            Some(compute_script(self.language, self.country)).filter(|s| s[0] != 0)
        } else {
            Some(self.locale_script)
        };

        match script {
            Some(script) => script == settings.locale_script,
            None => self.country[0] == 0 || self.country == settings.country,
        }
    }

    /// Is this locale a better match than `o` for `requested`.
    ///
    /// Both configurations must already match `requested`.
    pub fn is_locale_better_than(&self, o: &ResTableConfig, requested: &ResTableConfig) -> bool {
        if requested.locale() == 0 {
            return false;
        }
        if self.locale() == 0 && o.locale() == 0 {
            return false;
        }

        if !langs_are_equivalent(self.language, o.language) {
            // one of them has no language. Resources without language are
            // where US English traditionally lives, so they beat en-001 descendants.
            if requested.language == ENGLISH {
                if requested.country == UNITED_STATES {
                    return if self.language[0] != 0 {
                        self.country[0] == 0 || self.country == UNITED_STATES
                    } else {
                        !(o.country[0] == 0 || o.country == UNITED_STATES)
                    };
                } else if is_close_to_us_english(requested.country) {
                    return if self.language[0] != 0 {
                        is_close_to_us_english(self.country)
                    } else {
                        !is_close_to_us_english(o.country)
                    };
                }
            }
            return self.language[0] != 0;
        }

        let region = compare_regions(
            self.country,
            o.country,
            requested.language,
            requested.locale_script,
            requested.country,
        );
        if region != Ordering::Equal {
            return region == Ordering::Greater;
        }

        let variant = self.locale_variant == requested.locale_variant;
        let o_variant = o.locale_variant == requested.locale_variant;
        if variant != o_variant {
            return variant;
        }

        let numbering = self.locale_numbering_system == requested.locale_numbering_system;
        let o_numbering = o.locale_numbering_system == requested.locale_numbering_system;
        if numbering != o_numbering {
            return numbering;
        }

        // identical beats equivalent (fil vs tl)
        self.language == requested.language && o.language != requested.language
    }

    /// Is this variant a better fit than `o` for `requested`.
    ///
    /// Without a request this falls back to [`ResTableConfig::is_more_specific_than`].
    pub fn is_better_than(&self, o: &ResTableConfig, requested: Option<&ResTableConfig>) -> bool {
        let Some(requested) = requested else {
            return self.is_more_specific_than(o);
        };

        if self.mcc != o.mcc && requested.mcc != 0 {
            return self.mcc != 0;
        }
        if self.mnc != o.mnc && requested.mnc != 0 {
            return self.mnc != 0;
        }

        if self.is_locale_better_than(o, requested) {
            return true;
        } else if o.is_locale_better_than(self, requested) {
            return false;
        }

        if differs_masked(
            self.screen_layout,
            o.screen_layout,
            requested.screen_layout,
            Self::MASK_LAYOUTDIR,
        ) {
            return self.screen_layout & Self::MASK_LAYOUTDIR
                > o.screen_layout & Self::MASK_LAYOUTDIR;
        }

        // smaller ones were filtered by matches(), the largest is the closest
        if self.smallest_screen_width_dp != o.smallest_screen_width_dp {
            return self.smallest_screen_width_dp > o.smallest_screen_width_dp;
        }

        if self.screen_size_dp() != 0 || o.screen_size_dp() != 0 {
            let (mine, other) = screen_delta(
                (self.screen_width_dp, self.screen_height_dp),
                (o.screen_width_dp, o.screen_height_dp),
                (requested.screen_width_dp, requested.screen_height_dp),
            );
            if mine != other {
                return mine < other;
            }
        }

        if differs_masked(
            self.screen_layout,
            o.screen_layout,
            requested.screen_layout,
            Self::MASK_SCREENSIZE,
        ) {
            // undefined counts as normal, unless the device is smaller than normal
            let my_size = self.screen_layout & Self::MASK_SCREENSIZE;
            let o_size = o.screen_layout & Self::MASK_SCREENSIZE;
            let (mut fixed_mine, mut fixed_other) = (my_size, o_size);
            if requested.screen_layout & Self::MASK_SCREENSIZE >= Self::SCREENSIZE_NORMAL {
                if fixed_mine == 0 {
                    fixed_mine = Self::SCREENSIZE_NORMAL;
                }
                if fixed_other == 0 {
                    fixed_other = Self::SCREENSIZE_NORMAL;
                }
            }
            if fixed_mine == fixed_other {
                return my_size != 0;
            }
            return fixed_mine > fixed_other;
        }

        if differs_masked(
            self.screen_layout,
            o.screen_layout,
            requested.screen_layout,
            Self::MASK_SCREENLONG,
        ) {
            return self.screen_layout & Self::MASK_SCREENLONG != 0;
        }

        if differs_masked(
            self.screen_layout2,
            o.screen_layout2,
            requested.screen_layout2,
            Self::MASK_SCREENROUND,
        ) {
            return self.screen_layout2 & Self::MASK_SCREENROUND != 0;
        }

        if differs_masked(
            self.color_mode,
            o.color_mode,
            requested.color_mode,
            Self::MASK_WIDE_COLOR_GAMUT,
        ) {
            return self.color_mode & Self::MASK_WIDE_COLOR_GAMUT != 0;
        }
        if differs_masked(self.color_mode, o.color_mode, requested.color_mode, Self::MASK_HDR) {
            return self.color_mode & Self::MASK_HDR != 0;
        }

        if self.orientation != o.orientation && requested.orientation != 0 {
            return self.orientation != 0;
        }

        if differs_masked(self.ui_mode, o.ui_mode, requested.ui_mode, Self::MASK_UI_MODE_TYPE) {
            return self.ui_mode & Self::MASK_UI_MODE_TYPE != 0;
        }
        if differs_masked(self.ui_mode, o.ui_mode, requested.ui_mode, Self::MASK_UI_MODE_NIGHT) {
            return self.ui_mode & Self::MASK_UI_MODE_NIGHT != 0;
        }

        if self.density != o.density {
            return self.is_density_better_than(o, requested);
        }

        if self.touchscreen != o.touchscreen && requested.touchscreen != 0 {
            return self.touchscreen != 0;
        }

        let keys_hidden = self.input_flags & Self::MASK_KEYSHIDDEN;
        let o_keys_hidden = o.input_flags & Self::MASK_KEYSHIDDEN;
        let req_keys_hidden = requested.input_flags & Self::MASK_KEYSHIDDEN;
        if keys_hidden != o_keys_hidden && req_keys_hidden != 0 {
            if keys_hidden == 0 {
                return false;
            } else if o_keys_hidden == 0 {
                return true;
            }
            // exact match beats KEYSHIDDEN_NO standing in for KEYSHIDDEN_SOFT
            if req_keys_hidden == keys_hidden {
                return true;
            } else if req_keys_hidden == o_keys_hidden {
                return false;
            }
        }

        let nav_hidden = self.input_flags & Self::MASK_NAVHIDDEN;
        let o_nav_hidden = o.input_flags & Self::MASK_NAVHIDDEN;
        if nav_hidden != o_nav_hidden && requested.input_flags & Self::MASK_NAVHIDDEN != 0 {
            if nav_hidden == 0 {
                return false;
            } else if o_nav_hidden == 0 {
                return true;
            }
        }

        if self.keyboard != o.keyboard && requested.keyboard != 0 {
            return self.keyboard != 0;
        }
        if self.navigation != o.navigation && requested.navigation != 0 {
            return self.navigation != 0;
        }

        if self.screen_size() != 0 || o.screen_size() != 0 {
            let (mine, other) = screen_delta(
                (self.screen_width, self.screen_height),
                (o.screen_width, o.screen_height),
                (requested.screen_width, requested.screen_height),
            );
            if mine != other {
                return mine < other;
            }
        }

        if self.sdk_version != o.sdk_version && requested.sdk_version != 0 {
            return self.sdk_version > o.sdk_version;
        }
        if self.minor_version != o.minor_version && requested.minor_version != 0 {
            return self.minor_version != 0;
        }

        false
    }

    /// Density buckets are always usable, pick the one that scales best.
    ///
    /// Scaling down is considered twice as good as scaling up.
    fn is_density_better_than(&self, o: &ResTableConfig, requested: &ResTableConfig) -> bool {
        let density_or_medium = |d: u16| {
            if d == 0 {
                Self::DENSITY_MEDIUM as i64
            } else {
                d as i64
            }
        };

        let this_density = density_or_medium(self.density);
        let other_density = density_or_medium(o.density);

        // anydpi always beats scaling
        if this_density == Self::DENSITY_ANY as i64 {
            return true;
        } else if other_density == Self::DENSITY_ANY as i64 {
            return false;
        }

        let requested_density = match requested.density {
            0 | Self::DENSITY_ANY => Self::DENSITY_MEDIUM as i64,
            d => d as i64,
        };

        let (h, l, im_bigger) = if other_density > this_density {
            (other_density, this_density, false)
        } else {
            (this_density, other_density, true)
        };

        if requested_density >= h {
            return im_bigger;
        }
        if l >= requested_density {
            return !im_bigger;
        }

        if (2 * l - requested_density) * h > requested_density * requested_density {
            !im_bigger
        } else {
            im_bigger
        }
    }

    /// Positive when this locale carries more qualifiers than `o`
    pub fn is_locale_more_specific_than(&self, o: &ResTableConfig) -> i32 {
        if self.locale() != 0 || o.locale() != 0 {
            if self.language[0] != o.language[0] {
                if self.language[0] == 0 {
                    return -1;
                }
                if o.language[0] == 0 {
                    return 1;
                }
            }
            if self.country[0] != o.country[0] {
                if self.country[0] == 0 {
                    return -1;
                }
                if o.country[0] == 0 {
                    return 1;
                }
            }
        }

        // variant > explicit script > numbering system
        let score = |c: &ResTableConfig| {
            let variant = (c.locale_variant[0] != 0) as i32 * 4;
            let script = (c.locale_script[0] != 0 && !c.locale_script_was_computed) as i32 * 2;
            let numbering = (c.locale_numbering_system[0] != 0) as i32;
            variant + script + numbering
        };
        score(self) - score(o)
    }

    /// Does this configuration specify an axis that `o` leaves as "any".
    ///
    /// Axes are checked in precedence order, density never counts.
    pub fn is_more_specific_than(&self, o: &ResTableConfig) -> bool {
        decide!(specificity(self.mcc, o.mcc));
        decide!(specificity(self.mnc, o.mnc));

        match self.is_locale_more_specific_than(o) {
            d if d < 0 => return false,
            d if d > 0 => return true,
            _ => {}
        }

        let masked = |mine: u8, theirs: u8, mask: u8| specificity(mine & mask, theirs & mask);

        decide!(masked(self.screen_layout, o.screen_layout, Self::MASK_LAYOUTDIR));
        decide!(specificity(
            self.smallest_screen_width_dp,
            o.smallest_screen_width_dp
        ));
        decide!(specificity(self.screen_width_dp, o.screen_width_dp));
        decide!(specificity(self.screen_height_dp, o.screen_height_dp));
        decide!(masked(self.screen_layout, o.screen_layout, Self::MASK_SCREENSIZE));
        decide!(masked(self.screen_layout, o.screen_layout, Self::MASK_SCREENLONG));
        decide!(masked(self.screen_layout2, o.screen_layout2, Self::MASK_SCREENROUND));
        decide!(masked(self.color_mode, o.color_mode, Self::MASK_HDR));
        decide!(masked(self.color_mode, o.color_mode, Self::MASK_WIDE_COLOR_GAMUT));
        decide!(specificity(self.orientation, o.orientation));
        decide!(masked(self.ui_mode, o.ui_mode, Self::MASK_UI_MODE_TYPE));
        decide!(masked(self.ui_mode, o.ui_mode, Self::MASK_UI_MODE_NIGHT));
        decide!(specificity(self.touchscreen, o.touchscreen));
        decide!(masked(self.input_flags, o.input_flags, Self::MASK_KEYSHIDDEN));
        decide!(masked(self.input_flags, o.input_flags, Self::MASK_NAVHIDDEN));
        decide!(specificity(self.keyboard, o.keyboard));
        decide!(specificity(self.navigation, o.navigation));
        decide!(specificity(self.screen_width, o.screen_width));
        decide!(specificity(self.screen_height, o.screen_height));
        decide!(specificity(self.sdk_version, o.sdk_version));
        decide!(specificity(self.minor_version, o.minor_version));

        false
    }

    /// Axes on which the two configurations differ
    pub fn diff(&self, o: &ResTableConfig) -> ResTableConfigFlags {
        let mut diffs = ResTableConfigFlags::empty();

        let mut set = |cond: bool, flag: ResTableConfigFlags| {
            if cond {
                diffs |= flag;
            }
        };

        set(self.mcc != o.mcc, ResTableConfigFlags::CONFIG_MCC);
        set(self.mnc != o.mnc, ResTableConfigFlags::CONFIG_MNC);
        set(self.orientation != o.orientation, ResTableConfigFlags::CONFIG_ORIENTATION);
        set(self.density != o.density, ResTableConfigFlags::CONFIG_DENSITY);
        set(self.touchscreen != o.touchscreen, ResTableConfigFlags::CONFIG_TOUCHSCREEN);
        set(
            (self.input_flags ^ o.input_flags) & (Self::MASK_KEYSHIDDEN | Self::MASK_NAVHIDDEN)
                != 0,
            ResTableConfigFlags::CONFIG_KEYBOARD_HIDDEN,
        );
        set(self.keyboard != o.keyboard, ResTableConfigFlags::CONFIG_KEYBOARD);
        set(self.navigation != o.navigation, ResTableConfigFlags::CONFIG_NAVIGATION);
        set(self.screen_size() != o.screen_size(), ResTableConfigFlags::CONFIG_SCREEN_SIZE);
        set(self.version() != o.version(), ResTableConfigFlags::CONFIG_VERSION);
        set(
            (self.screen_layout ^ o.screen_layout) & Self::MASK_LAYOUTDIR != 0,
            ResTableConfigFlags::CONFIG_LAYOUTDIR,
        );
        set(
            (self.screen_layout ^ o.screen_layout) & !Self::MASK_LAYOUTDIR != 0,
            ResTableConfigFlags::CONFIG_SCREEN_LAYOUT,
        );
        set(
            (self.screen_layout2 ^ o.screen_layout2) & Self::MASK_SCREENROUND != 0,
            ResTableConfigFlags::CONFIG_SCREEN_ROUND,
        );
        set(
            (self.color_mode ^ o.color_mode) & (Self::MASK_WIDE_COLOR_GAMUT | Self::MASK_HDR) != 0,
            ResTableConfigFlags::CONFIG_COLOR_MODE,
        );
        set(self.ui_mode != o.ui_mode, ResTableConfigFlags::CONFIG_UI_MODE);
        set(
            self.smallest_screen_width_dp != o.smallest_screen_width_dp,
            ResTableConfigFlags::CONFIG_SMALLEST_SCREEN_SIZE,
        );
        set(
            self.screen_size_dp() != o.screen_size_dp(),
            ResTableConfigFlags::CONFIG_SCREEN_SIZE,
        );
        set(
            compare_locales(self, o) != Ordering::Equal,
            ResTableConfigFlags::CONFIG_LOCALE,
        );

        diffs
    }

    /// Total order used to sort configurations, computed scripts are ignored
    pub fn compare(&self, o: &ResTableConfig) -> Ordering {
        self.imsi()
            .cmp(&o.imsi())
            .then_with(|| compare_locales(self, o))
            .then_with(|| self.screen_type().cmp(&o.screen_type()))
            .then_with(|| self.input().cmp(&o.input()))
            .then_with(|| self.screen_size().cmp(&o.screen_size()))
            .then_with(|| self.version().cmp(&o.version()))
            .then_with(|| self.screen_layout.cmp(&o.screen_layout))
            .then_with(|| self.screen_layout2.cmp(&o.screen_layout2))
            .then_with(|| self.color_mode.cmp(&o.color_mode))
            .then_with(|| self.ui_mode.cmp(&o.ui_mode))
            .then_with(|| self.smallest_screen_width_dp.cmp(&o.smallest_screen_width_dp))
            .then_with(|| self.screen_size_dp().cmp(&o.screen_size_dp()))
    }
}

fn compare_locales(l: &ResTableConfig, r: &ResTableConfig) -> Ordering {
    let script = |c: &ResTableConfig| {
        if c.locale_script_was_computed {
            [0; 4]
        } else {
            c.locale_script
        }
    };

    l.locale()
        .cmp(&r.locale())
        .then_with(|| script(l).cmp(&script(r)))
        .then_with(|| l.locale_variant.cmp(&r.locale_variant))
        .then_with(|| l.locale_numbering_system.cmp(&r.locale_numbering_system))
}

/// Summed distance of both dimensions from the request, unset dimensions count fully
fn screen_delta(mine: (u16, u16), other: (u16, u16), requested: (u16, u16)) -> (i32, i32) {
    let (mut my_delta, mut other_delta) = (0i32, 0i32);
    if requested.0 != 0 {
        my_delta += requested.0 as i32 - mine.0 as i32;
        other_delta += requested.0 as i32 - other.0 as i32;
    }
    if requested.1 != 0 {
        my_delta += requested.1 as i32 - mine.1 as i32;
        other_delta += requested.1 as i32 - other.1 as i32;
    }
    (my_delta, other_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(tag: &str) -> ResTableConfig {
        let mut config = ResTableConfig::default();
        config.set_bcp47_locale(tag);
        config
    }

    fn density(d: u16) -> ResTableConfig {
        ResTableConfig {
            density: d,
            ..Default::default()
        }
    }

    #[test]
    fn default_matches_everything() {
        let device = ResTableConfig {
            sdk_version: 28,
            density: 480,
            ..locale("en-US")
        };
        assert!(ResTableConfig::default().matches(&device));
    }

    #[test]
    fn newer_sdk_does_not_match() {
        let device = ResTableConfig {
            sdk_version: 21,
            ..Default::default()
        };
        let v26 = ResTableConfig {
            sdk_version: 26,
            ..Default::default()
        };
        assert!(!v26.matches(&device));
        assert!(device.matches(&v26));
    }

    #[test]
    fn locale_matching_uses_scripts() {
        let device = locale("zh-TW");
        assert!(locale("zh-HK").matches(&device));
        assert!(!locale("zh-CN").matches(&device));
        assert!(locale("zh").matches(&locale("zh-CN")));
        assert!(!locale("fr").matches(&device));
        assert!(locale("tl").matches(&locale("fil-PH")));
    }

    #[test]
    fn keyshidden_no_matches_soft() {
        let device = ResTableConfig {
            input_flags: ResTableConfig::KEYSHIDDEN_SOFT,
            ..Default::default()
        };
        let no = ResTableConfig {
            input_flags: ResTableConfig::KEYSHIDDEN_NO,
            ..Default::default()
        };
        assert!(no.matches(&device));
    }

    #[test]
    fn density_scaling() {
        let request = density(160);
        // scaling 240 down beats scaling 120 up
        assert!(density(240).is_better_than(&density(120), Some(&request)));
        assert!(!density(120).is_better_than(&density(240), Some(&request)));
        assert!(density(ResTableConfig::DENSITY_ANY).is_better_than(&density(640), Some(&request)));

        // exactly requested wins over everything but anydpi
        let request = density(480);
        assert!(density(480).is_better_than(&density(320), Some(&request)));
        assert!(density(480).is_better_than(&density(640), Some(&request)));
    }

    #[test]
    fn newer_matching_sdk_wins() {
        let request = ResTableConfig {
            sdk_version: 28,
            ..Default::default()
        };
        let v21 = ResTableConfig {
            sdk_version: 21,
            ..Default::default()
        };
        assert!(v21.is_better_than(&ResTableConfig::default(), Some(&request)));
    }

    #[test]
    fn locale_preference() {
        let request = locale("en-GB");
        assert!(locale("en-001").is_better_than(&locale("en-US"), Some(&request)));
        assert!(locale("en").is_better_than(&ResTableConfig::default(), Some(&request)));

        // no-locale resources hold US English
        let request = locale("en-US");
        assert!(ResTableConfig::default().is_better_than(&locale("en-GB"), Some(&request)));
        assert!(locale("en-US").is_better_than(&ResTableConfig::default(), Some(&request)));

        let request = locale("fil-PH");
        assert!(locale("fil").is_better_than(&locale("tl"), Some(&request)));
    }

    #[test]
    fn more_specific() {
        let en = locale("en");
        let land = ResTableConfig {
            orientation: ResTableConfig::ORIENTATION_LAND,
            ..Default::default()
        };
        // locale outranks orientation
        assert!(en.is_more_specific_than(&land));
        assert!(!land.is_more_specific_than(&en));
        assert!(!density(240).is_more_specific_than(&ResTableConfig::default()));
        assert!(land.is_better_than(&ResTableConfig::default(), None));
    }

    #[test]
    fn numbering_system_is_more_specific() {
        let plain = locale("ar");
        let latn = ResTableConfig {
            locale_numbering_system: *b"latn\0\0\0\0",
            ..locale("ar")
        };
        assert!(latn.is_more_specific_than(&plain));
        assert!(!plain.is_more_specific_than(&latn));
        assert!(latn.is_better_than(&plain, None));

        // an explicit script outweighs a numbering system
        let arab = locale("ar-Arab");
        assert!(arab.is_locale_more_specific_than(&latn) > 0);
    }

    #[test]
    fn better_than_is_antisymmetric() {
        let request = ResTableConfig {
            smallest_screen_width_dp: 720,
            orientation: ResTableConfig::ORIENTATION_LAND,
            density: 320,
            sdk_version: 28,
            ..locale("en-US")
        };

        let mut candidates = Vec::new();
        for base in [ResTableConfig::default(), locale("en"), locale("en-US")] {
            for sw in [0, 600, 720] {
                for orientation in [0, ResTableConfig::ORIENTATION_LAND] {
                    for d in [0, 120, 160, 240, 480, ResTableConfig::DENSITY_ANY] {
                        for sdk in [0, 21, 28] {
                            candidates.push(ResTableConfig {
                                smallest_screen_width_dp: sw,
                                orientation,
                                density: d,
                                sdk_version: sdk,
                                ..base
                            });
                        }
                    }
                }
            }
        }
        assert!(candidates.iter().all(|c| c.matches(&request)));

        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                // unset density and mdpi scale the same, each claims to win
                if matches!((a.density, b.density), (0, 160) | (160, 0)) {
                    continue;
                }
                assert!(
                    !(a.is_better_than(b, Some(&request)) && b.is_better_than(a, Some(&request))),
                    "{} and {} both win",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn diff_and_compare() {
        let a = ResTableConfig {
            density: 240,
            ..locale("en")
        };
        let b = ResTableConfig {
            density: 240,
            ..locale("de")
        };
        assert_eq!(a.diff(&b), ResTableConfigFlags::CONFIG_LOCALE);
        assert_eq!(a.diff(&a), ResTableConfigFlags::empty());
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert_ne!(a.compare(&b), Ordering::Equal);
        assert_eq!(a.compare(&b), b.compare(&a).reverse());
    }
}
