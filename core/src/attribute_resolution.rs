//! Final values of view attributes, combining explicit values, XML tags,
//! styles and the theme.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/AttributeResolution.cpp

use std::sync::Arc;

use log::debug;
use restable_arsc::XmlParser;
use restable_arsc::structs::{ResTableConfigFlags, ResValue, ResourceValueType};

use crate::asset_manager::{AssetManager, Cookie, SelectedValue, Unresolved};
use crate::bag::ResolvedBag;
use crate::errors::LookupError;
use crate::theme::Theme;

/// Attributes of the XML tag being inflated
pub trait XmlAttributeSource {
    fn attribute_count(&self) -> usize;

    /// Resource id of the attribute name, 0 if `idx` is out of range or the name has none
    fn attribute_name_resid(&self, idx: usize) -> u32;

    /// `None` if the value can't be translated for this runtime
    fn attribute_value(&self, idx: usize) -> Option<ResValue>;

    /// Index of the `style` attribute
    fn index_of_style(&self) -> Option<usize>;
}

impl XmlAttributeSource for XmlParser<'_> {
    #[inline]
    fn attribute_count(&self) -> usize {
        XmlParser::attribute_count(self)
    }

    #[inline]
    fn attribute_name_resid(&self, idx: usize) -> u32 {
        XmlParser::attribute_name_resid(self, idx)
    }

    #[inline]
    fn attribute_value(&self, idx: usize) -> Option<ResValue> {
        XmlParser::attribute_value(self, idx)
    }

    #[inline]
    fn index_of_style(&self) -> Option<usize> {
        XmlParser::index_of_style(self)
    }
}

/// Value picked for one requested attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub value: ResValue,

    /// Assets the value came from, `None` if it came from XML or is undefined
    pub cookie: Option<Cookie>,

    /// Last reference followed to reach `value`
    pub resource_id: u32,

    pub changing_configurations: ResTableConfigFlags,

    /// Density of the configuration the value was picked from
    pub density: u16,

    /// Style that defined the value, 0 if it didn't come from a style
    pub source_resource_id: u32,
}

impl ResolvedAttribute {
    /// Has a value, `@empty` counts as one
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.value.data_type != ResourceValueType::Null
            || self.value.data == ResValue::DATA_NULL_EMPTY
    }
}

/// Values in the order of the requested attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAttributes {
    pub values: Vec<ResolvedAttribute>,

    /// Positions in `values` that ended up with a value
    pub indices: Vec<usize>,
}

impl ResolvedAttributes {
    fn with_capacity(capacity: usize) -> ResolvedAttributes {
        ResolvedAttributes {
            values: Vec::with_capacity(capacity),
            indices: Vec::new(),
        }
    }

    fn push(&mut self, attribute: ResolvedAttribute, defined: bool) {
        if defined {
            self.indices.push(self.values.len());
        }
        self.values.push(attribute);
    }
}

#[inline]
fn is_undefined_null(value: &ResValue) -> bool {
    value.data_type == ResourceValueType::Null && value.data != ResValue::DATA_NULL_EMPTY
}

/// Default style of the view, either given directly or through a theme attribute.
///
/// Returns the style bag and the flags of everything consulted to find it.
fn default_style_bag(
    theme: &Theme<'_>,
    def_style_attr: u32,
    def_style_res: u32,
) -> (Option<Arc<ResolvedBag>>, ResTableConfigFlags) {
    let mut flags = ResTableConfigFlags::empty();
    let mut def_style_res = def_style_res;

    if def_style_attr != 0 {
        if let Ok(attribute) = theme.get_attribute(def_style_attr) {
            flags |= attribute.flags;
            if attribute.value.data_type == ResourceValueType::Reference {
                def_style_res = attribute.value.data;
            }
        }
    }

    if def_style_res == 0 {
        return (None, flags);
    }

    match theme.asset_manager().get_bag(def_style_res) {
        Ok(bag) => {
            flags |= bag.type_spec_flags;
            (Some(bag), flags)
        }
        Err(e) => {
            debug!("no default style 0x{:08x}: {}", def_style_res, e);
            (None, flags)
        }
    }
}

/// Value taken from a style bag along with the style that defined it
fn from_bag(
    bag: &ResolvedBag,
    attr: u32,
    flags: ResTableConfigFlags,
) -> Option<(SelectedValue, u32)> {
    let entry = bag.find(attr)?;
    let selected = SelectedValue {
        cookie: Some(entry.cookie),
        flags,
        ..SelectedValue::from_value(entry.value)
    };
    Some((selected, entry.style))
}

/// Value a failed chase settles on.
///
/// Hitting the iteration cap keeps everything reached. Any other failure
/// keeps the value reached but not its cookie.
fn settle(unresolved: Unresolved, cookie: Option<Cookie>) -> SelectedValue {
    match unresolved.error {
        LookupError::ResolutionLimitExceeded(_) => unresolved.reached,
        _ => SelectedValue {
            cookie,
            ..unresolved.reached
        },
    }
}

/// Chase attributes and references of a found value, or ask the theme if nothing was found
fn chase(theme: &Theme<'_>, attr: u32, selected: SelectedValue) -> SelectedValue {
    if selected.value.data_type != ResourceValueType::Null {
        return theme
            .resolve_attribute_reference(selected)
            .unwrap_or_else(|unresolved| settle(unresolved, selected.cookie));
    }

    if selected.value.data == ResValue::DATA_NULL_EMPTY {
        return selected;
    }

    let Ok(attribute) = theme.get_attribute(attr) else {
        return selected;
    };

    let from_theme = SelectedValue {
        cookie: attribute.cookie,
        flags: attribute.flags,
        ..SelectedValue::from_value(attribute.value)
    };
    theme
        .asset_manager()
        .follow_references(from_theme)
        .unwrap_or_else(|unresolved| settle(unresolved, selected.cookie))
}

/// Turn `@null` into the undefined value and build the output record
fn finish(selected: SelectedValue, source_resource_id: u32) -> ResolvedAttribute {
    let (value, cookie) = if selected.value.is_null_reference() {
        (ResValue::null(), None)
    } else {
        (selected.value, selected.cookie)
    };

    ResolvedAttribute {
        value,
        cookie,
        resource_id: selected.resid,
        changing_configurations: selected.flags,
        density: selected.config.density,
        source_resource_id,
    }
}

/// Resolve `attrs` for a view created from code.
///
/// Each attribute is taken from `src_values` (0 means not given, anything
/// else is an attribute id looked up in the theme), the default style, or
/// finally the theme itself.
pub fn resolve_attrs(
    theme: &Theme<'_>,
    def_style_attr: u32,
    def_style_res: u32,
    src_values: &[u32],
    attrs: &[u32],
) -> ResolvedAttributes {
    let (def_style_bag, def_style_flags) = default_style_bag(theme, def_style_attr, def_style_res);
    let mut out = ResolvedAttributes::with_capacity(attrs.len());

    for (idx, &attr) in attrs.iter().enumerate() {
        let mut selected = SelectedValue::empty();
        let mut source = 0;

        match src_values.get(idx).copied().unwrap_or(0) {
            0 => {
                if let Some(bag) = &def_style_bag {
                    if let Some((found, style)) = from_bag(bag, attr, def_style_flags) {
                        selected = found;
                        source = style;
                    }
                }
            }
            src => {
                selected.value = ResValue::new(ResourceValueType::Attribute, src);
            }
        }

        let resolved = finish(chase(theme, attr, selected), source);
        let defined = resolved.value.data_type != ResourceValueType::Null;
        out.push(resolved, defined);
    }

    out
}

/// Resolve `attrs` for a view inflated from the current tag of `xml`.
///
/// Sources in order: the tag's attributes, the tag's `style`, the default
/// style and the theme.
pub fn apply_style(
    theme: &Theme<'_>,
    xml: Option<&dyn XmlAttributeSource>,
    def_style_attr: u32,
    def_style_res: u32,
    attrs: &[u32],
) -> ResolvedAttributes {
    let assets = theme.asset_manager();
    let (def_style_bag, def_style_flags) = default_style_bag(theme, def_style_attr, def_style_res);

    let mut style_flags = ResTableConfigFlags::empty();
    let mut xml_style_bag = None;
    if let Some(style_idx) = xml.and_then(|xml| xml.index_of_style()) {
        let mut style_value = xml
            .and_then(|xml| xml.attribute_value(style_idx))
            .unwrap_or(ResValue::null());

        if style_value.data_type == ResourceValueType::Attribute {
            match theme.get_attribute(style_value.data) {
                Ok(attribute) => {
                    style_value = attribute.value;
                    style_flags |= attribute.flags;
                }
                Err(_) => style_value.data_type = ResourceValueType::Null,
            }
        }

        if style_value.data_type == ResourceValueType::Reference && style_value.data != 0 {
            match assets.get_bag(style_value.data) {
                Ok(bag) => {
                    style_flags |= bag.type_spec_flags;
                    xml_style_bag = Some(bag);
                }
                Err(e) => debug!("no style 0x{:08x}: {}", style_value.data, e),
            }
        }
    }

    let mut out = ResolvedAttributes::with_capacity(attrs.len());

    for &attr in attrs {
        let mut selected = SelectedValue::empty();
        let mut source = 0;

        if let Some(xml) = xml {
            let found = (0..xml.attribute_count()).find(|&i| xml.attribute_name_resid(i) == attr);
            if let Some(xml_idx) = found {
                selected.value = xml.attribute_value(xml_idx).unwrap_or(ResValue::null());
                selected.flags = style_flags;
            }
        }

        if is_undefined_null(&selected.value) {
            if let Some(bag) = &xml_style_bag {
                if let Some((found, style)) = from_bag(bag, attr, style_flags) {
                    selected = found;
                    source = style;
                }
            }
        }

        if is_undefined_null(&selected.value) {
            if let Some(bag) = &def_style_bag {
                if let Some((found, style)) = from_bag(bag, attr, def_style_flags) {
                    selected = found;
                    source = style;
                }
            }
        }

        let resolved = finish(chase(theme, attr, selected), source);
        let defined = resolved.is_defined();
        out.push(resolved, defined);
    }

    out
}

/// Resolve `attrs` from the current tag of `xml` alone, without styles or a theme.
///
/// Both the tag's attributes and `attrs` are expected to be sorted by resource id.
pub fn retrieve_attributes(
    assets: &AssetManager,
    xml: &dyn XmlAttributeSource,
    attrs: &[u32],
) -> ResolvedAttributes {
    let count = xml.attribute_count();
    let mut ix = 0;
    let mut cur_xml_attr = xml.attribute_name_resid(ix);

    let mut out = ResolvedAttributes::with_capacity(attrs.len());

    for &attr in attrs {
        let mut selected = SelectedValue::empty();

        while ix < count && attr > cur_xml_attr {
            ix += 1;
            cur_xml_attr = xml.attribute_name_resid(ix);
        }
        if ix < count && attr == cur_xml_attr {
            selected.value = xml.attribute_value(ix).unwrap_or(ResValue::null());
            ix += 1;
            cur_xml_attr = xml.attribute_name_resid(ix);
        }

        if selected.value.data_type != ResourceValueType::Null {
            let cookie = selected.cookie;
            selected = assets
                .follow_references(selected)
                .unwrap_or_else(|unresolved| settle(unresolved, cookie));
        }

        let resolved = finish(selected, 0);
        let defined = resolved.is_defined();
        out.push(resolved, defined);
    }

    out
}
