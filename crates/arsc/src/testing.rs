//! In-memory builders for binary chunks.
//!
//! Used by the unit tests of this crate and, through the `testing` feature,
//! by the tests of crates depending on it. Builders write the same layout as
//! aapt2 but don't try to be compact.

use std::collections::BTreeMap;

use crate::structs::{ResTableConfig, ResValue};

#[inline]
fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
fn put_value(out: &mut Vec<u8>, value: &ResValue) {
    put_u16(out, ResValue::SIZE as u16);
    out.push(0);
    out.push(value.data_type.into());
    put_u32(out, value.data);
}

#[inline]
fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Write `ResChunk_header` and patch the size once the body is known
fn chunk(type_: u16, header: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = 8 + header.len();
    let size = header_size + body.len();

    let mut out = Vec::with_capacity(size);
    put_u16(&mut out, type_);
    put_u16(&mut out, header_size as u16);
    put_u32(&mut out, size as u32);
    out.extend_from_slice(header);
    out.extend_from_slice(body);
    out
}

fn utf16_fixed(name: &str, units: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(units * 2);
    for unit in name.encode_utf16().take(units - 1) {
        put_u16(&mut out, unit);
    }
    out.resize(units * 2, 0);
    out
}

/// Builder for `RES_STRING_POOL_TYPE` chunks
#[derive(Debug, Clone, Default)]
pub struct StringPoolBuilder {
    strings: Vec<String>,
    utf8: bool,
    sorted: bool,
}

impl StringPoolBuilder {
    pub fn utf8(strings: &[&str]) -> StringPoolBuilder {
        StringPoolBuilder {
            strings: strings.iter().map(|s| s.to_string()).collect(),
            utf8: true,
            sorted: false,
        }
    }

    pub fn utf16(strings: &[&str]) -> StringPoolBuilder {
        StringPoolBuilder {
            utf8: false,
            ..Self::utf8(strings)
        }
    }

    /// Only sets the flag, strings must already be in order
    pub fn sorted(mut self) -> StringPoolBuilder {
        self.sorted = true;
        self
    }

    fn encode_utf8(s: &str, out: &mut Vec<u8>) {
        let encode_len = |len: usize, out: &mut Vec<u8>| {
            if len > 0x7f {
                out.push(0x80 | (len >> 8) as u8);
                out.push(len as u8);
            } else {
                out.push(len as u8);
            }
        };

        encode_len(s.encode_utf16().count(), out);
        encode_len(s.len(), out);
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }

    fn encode_utf16(s: &str, out: &mut Vec<u8>) {
        let units: Vec<u16> = s.encode_utf16().collect();
        if units.len() > 0x7fff {
            put_u16(out, 0x8000 | (units.len() >> 16) as u16);
            put_u16(out, units.len() as u16);
        } else {
            put_u16(out, units.len() as u16);
        }
        for unit in units {
            put_u16(out, unit);
        }
        put_u16(out, 0);
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.strings.len();

        let mut offsets = Vec::with_capacity(count * 4);
        let mut pool = Vec::new();
        for s in &self.strings {
            put_u32(&mut offsets, pool.len() as u32);
            if self.utf8 {
                Self::encode_utf8(s, &mut pool);
            } else {
                Self::encode_utf16(s, &mut pool);
            }
        }
        pad4(&mut pool);

        let mut flags = 0u32;
        if self.sorted {
            flags |= 1;
        }
        if self.utf8 {
            flags |= 1 << 8;
        }

        let strings_start = if count == 0 { 0 } else { 28 + offsets.len() };

        let mut header = Vec::with_capacity(20);
        put_u32(&mut header, count as u32);
        put_u32(&mut header, 0);
        put_u32(&mut header, flags);
        put_u32(&mut header, strings_start as u32);
        put_u32(&mut header, 0);

        offsets.extend(pool);
        chunk(0x0001, &header, &offsets)
    }
}

/// Serialize a configuration the way current tools do, 64 bytes
pub fn config_bytes(config: &ResTableConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(ResTableConfig::SIZE as usize);
    put_u32(&mut out, ResTableConfig::SIZE);
    put_u16(&mut out, config.mcc);
    put_u16(&mut out, config.mnc);
    out.extend_from_slice(&config.language);
    out.extend_from_slice(&config.country);
    out.push(config.orientation);
    out.push(config.touchscreen);
    put_u16(&mut out, config.density);
    out.push(config.keyboard);
    out.push(config.navigation);
    out.push(config.input_flags);
    out.push(0);
    put_u16(&mut out, config.screen_width);
    put_u16(&mut out, config.screen_height);
    put_u16(&mut out, config.sdk_version);
    put_u16(&mut out, config.minor_version);
    out.push(config.screen_layout);
    out.push(config.ui_mode);
    put_u16(&mut out, config.smallest_screen_width_dp);
    put_u16(&mut out, config.screen_width_dp);
    put_u16(&mut out, config.screen_height_dp);
    out.extend_from_slice(&config.locale_script);
    out.extend_from_slice(&config.locale_variant);
    out.push(config.screen_layout2);
    out.push(config.color_mode);
    put_u16(&mut out, 0);
    out.push(config.locale_script_was_computed as u8);
    out.extend_from_slice(&config.locale_numbering_system);
    out.resize(ResTableConfig::SIZE as usize, 0);
    out
}

/// Entry of a type chunk
#[derive(Debug, Clone)]
pub enum EntryBuilder {
    Value {
        key: u32,
        flags: u16,
        value: ResValue,
    },
    Bag {
        key: u32,
        flags: u16,
        parent: u32,
        map: Vec<(u32, ResValue)>,
    },
}

impl EntryBuilder {
    pub fn value(key: u32, value: ResValue) -> EntryBuilder {
        EntryBuilder::Value {
            key,
            flags: 0,
            value,
        }
    }

    pub fn bag(key: u32, parent: u32, map: Vec<(u32, ResValue)>) -> EntryBuilder {
        EntryBuilder::Bag {
            key,
            flags: 0,
            parent,
            map,
        }
    }

    /// Mark the entry as public
    pub fn public(mut self) -> EntryBuilder {
        match &mut self {
            EntryBuilder::Value { flags, .. } | EntryBuilder::Bag { flags, .. } => *flags |= 0x0002,
        }
        self
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            EntryBuilder::Value { key, flags, value } => {
                put_u16(out, 8);
                put_u16(out, *flags);
                put_u32(out, *key);
                put_value(out, value);
            }
            EntryBuilder::Bag {
                key,
                flags,
                parent,
                map,
            } => {
                put_u16(out, 16);
                put_u16(out, *flags | 0x0001);
                put_u32(out, *key);
                put_u32(out, *parent);
                put_u32(out, map.len() as u32);
                for (name, value) in map {
                    put_u32(out, *name);
                    put_value(out, value);
                }
            }
        }
    }
}

/// Builder for `RES_TABLE_TYPE_TYPE` chunks
#[derive(Debug, Clone)]
pub struct TypeChunkBuilder {
    id: u8,
    config: ResTableConfig,
    entries: Vec<Option<EntryBuilder>>,
    sparse: bool,
    offset16: bool,
}

impl TypeChunkBuilder {
    pub fn new(id: u8, config: ResTableConfig) -> TypeChunkBuilder {
        TypeChunkBuilder {
            id,
            config,
            entries: Vec::new(),
            sparse: false,
            offset16: false,
        }
    }

    pub fn entries(mut self, entries: Vec<Option<EntryBuilder>>) -> TypeChunkBuilder {
        self.entries = entries;
        self
    }

    pub fn sparse(mut self) -> TypeChunkBuilder {
        self.sparse = true;
        self
    }

    pub fn offset16(mut self) -> TypeChunkBuilder {
        self.offset16 = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        let mut entry_count = 0u32;

        for (idx, entry) in self.entries.iter().enumerate() {
            let offset = entry.as_ref().map(|entry| {
                let offset = data.len();
                entry.write(&mut data);
                offset
            });

            if self.sparse {
                if let Some(offset) = offset {
                    put_u16(&mut offsets, idx as u16);
                    put_u16(&mut offsets, (offset / 4) as u16);
                    entry_count += 1;
                }
            } else if self.offset16 {
                put_u16(&mut offsets, offset.map_or(0xffff, |o| (o / 4) as u16));
                entry_count += 1;
            } else {
                put_u32(&mut offsets, offset.map_or(0xffff_ffff, |o| o as u32));
                entry_count += 1;
            }
        }
        pad4(&mut offsets);

        let mut flags = 0u8;
        if self.sparse {
            flags |= 0x01;
        }
        if self.offset16 {
            flags |= 0x02;
        }

        let header_size = 8 + 12 + ResTableConfig::SIZE as usize;
        let mut header = Vec::with_capacity(header_size - 8);
        header.push(self.id);
        header.push(flags);
        put_u16(&mut header, 0);
        put_u32(&mut header, entry_count);
        put_u32(&mut header, (header_size + offsets.len()) as u32);
        header.extend(config_bytes(&self.config));

        offsets.extend(data);
        chunk(0x0201, &header, &offsets)
    }
}

/// Builder for `RES_TABLE_TYPE_SPEC_TYPE` chunks
pub fn type_spec_chunk(id: u8, flags: &[u32]) -> Vec<u8> {
    let mut header = Vec::with_capacity(8);
    header.push(id);
    header.push(0);
    put_u16(&mut header, 0);
    put_u32(&mut header, flags.len() as u32);

    let mut body = Vec::with_capacity(flags.len() * 4);
    for flag in flags {
        put_u32(&mut body, *flag);
    }
    chunk(0x0202, &header, &body)
}

/// Builder for `RES_TABLE_LIBRARY_TYPE` chunks
pub fn library_chunk(entries: &[(u32, &str)]) -> Vec<u8> {
    let mut header = Vec::with_capacity(4);
    put_u32(&mut header, entries.len() as u32);

    let mut body = Vec::with_capacity(entries.len() * 260);
    for (id, name) in entries {
        put_u32(&mut body, *id);
        body.extend(utf16_fixed(name, 128));
    }
    chunk(0x0203, &header, &body)
}

#[derive(Debug, Clone, Default)]
struct TypeData {
    spec_flags: BTreeMap<u16, u32>,
    configs: Vec<(ResTableConfig, BTreeMap<u16, EntryBuilder>)>,
}

/// Builder for a whole `RES_TABLE_PACKAGE_TYPE` chunk.
///
/// Entries are grouped per type and configuration, type specs are generated.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    id: u32,
    name: String,
    type_id_offset: u32,
    type_names: Vec<String>,
    keys: Vec<String>,
    types: BTreeMap<u8, TypeData>,
    libraries: Vec<(u32, String)>,
    extra_chunks: Vec<Vec<u8>>,
}

impl PackageBuilder {
    pub fn new(id: u32, name: &str) -> PackageBuilder {
        PackageBuilder {
            id,
            name: name.to_owned(),
            type_id_offset: 0,
            type_names: Vec::new(),
            keys: Vec::new(),
            types: BTreeMap::new(),
            libraries: Vec::new(),
            extra_chunks: Vec::new(),
        }
    }

    pub fn type_id_offset(mut self, offset: u32) -> PackageBuilder {
        self.type_id_offset = offset;
        self
    }

    /// Names of types 1, 2, ... in order, missing ones are generated
    pub fn type_names(mut self, names: &[&str]) -> PackageBuilder {
        self.type_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Key pool, [`EntryBuilder`] keys index into it
    pub fn keys(mut self, keys: &[&str]) -> PackageBuilder {
        self.keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add `entry` at `type_id`/`entry_id` in the variant for `config`
    pub fn entry(
        mut self,
        type_id: u8,
        entry_id: u16,
        config: ResTableConfig,
        entry: EntryBuilder,
    ) -> PackageBuilder {
        let data = self.types.entry(type_id).or_default();
        data.spec_flags.entry(entry_id).or_insert(0);

        match data.configs.iter_mut().find(|(c, _)| *c == config) {
            Some((_, entries)) => {
                entries.insert(entry_id, entry);
            }
            None => data
                .configs
                .push((config, BTreeMap::from([(entry_id, entry)]))),
        }
        self
    }

    /// OR `flags` into the type spec flags of an entry
    pub fn spec_flags(mut self, type_id: u8, entry_id: u16, flags: u32) -> PackageBuilder {
        *self
            .types
            .entry(type_id)
            .or_default()
            .spec_flags
            .entry(entry_id)
            .or_insert(0) |= flags;
        self
    }

    pub fn library(mut self, package_id: u32, name: &str) -> PackageBuilder {
        self.libraries.push((package_id, name.to_owned()));
        self
    }

    /// Raw chunk appended after the generated ones
    pub fn raw_chunk(mut self, chunk: Vec<u8>) -> PackageBuilder {
        self.extra_chunks.push(chunk);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let max_type = self.types.keys().next_back().copied().unwrap_or(0) as usize;
        let type_names: Vec<String> = (0..max_type.max(self.type_names.len()))
            .map(|idx| {
                self.type_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("type{}", idx + 1))
            })
            .collect();

        let type_refs: Vec<&str> = type_names.iter().map(String::as_str).collect();
        let key_refs: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let type_pool = StringPoolBuilder::utf16(&type_refs).build();
        let key_pool = StringPoolBuilder::utf8(&key_refs).build();

        let header_size = 288usize;
        let mut header = Vec::with_capacity(header_size - 8);
        put_u32(&mut header, self.id);
        header.extend(utf16_fixed(&self.name, 128));
        put_u32(&mut header, header_size as u32);
        put_u32(&mut header, type_names.len() as u32);
        put_u32(&mut header, (header_size + type_pool.len()) as u32);
        put_u32(&mut header, self.keys.len() as u32);
        put_u32(&mut header, self.type_id_offset);

        let mut body = type_pool;
        body.extend(key_pool);

        if !self.libraries.is_empty() {
            let libs: Vec<(u32, &str)> = self
                .libraries
                .iter()
                .map(|(id, name)| (*id, name.as_str()))
                .collect();
            body.extend(library_chunk(&libs));
        }

        for (type_id, data) in &self.types {
            let entry_count = data
                .spec_flags
                .keys()
                .next_back()
                .map_or(0, |&last| last as usize + 1);
            let flags: Vec<u32> = (0..entry_count)
                .map(|idx| data.spec_flags.get(&(idx as u16)).copied().unwrap_or(0))
                .collect();
            body.extend(type_spec_chunk(*type_id, &flags));

            for (config, entries) in &data.configs {
                let mut dense = vec![None; entry_count];
                for (idx, entry) in entries {
                    dense[*idx as usize] = Some(entry.clone());
                }
                body.extend(TypeChunkBuilder::new(*type_id, *config).entries(dense).build());
            }
        }

        for raw in &self.extra_chunks {
            body.extend_from_slice(raw);
        }

        chunk(0x0200, &header, &body)
    }
}

/// Builder for a `RES_TABLE_TYPE` file
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    strings: Vec<String>,
    packages: Vec<Vec<u8>>,
    package_count: Option<u32>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder::default()
    }

    /// Global value string pool
    pub fn strings(mut self, strings: &[&str]) -> TableBuilder {
        self.strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn package(mut self, package: PackageBuilder) -> TableBuilder {
        self.packages.push(package.build());
        self
    }

    /// Override the declared package count
    pub fn package_count(mut self, count: u32) -> TableBuilder {
        self.package_count = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(4);
        put_u32(
            &mut header,
            self.package_count.unwrap_or(self.packages.len() as u32),
        );

        let refs: Vec<&str> = self.strings.iter().map(String::as_str).collect();
        let mut body = StringPoolBuilder::utf8(&refs).build();
        for package in &self.packages {
            body.extend_from_slice(package);
        }

        chunk(0x0002, &header, &body)
    }
}

/// Builder for version 1 idmaps
#[derive(Debug, Clone)]
pub struct IdmapBuilder {
    target_package_id: u16,
    type_maps: Vec<(u16, u16, u16, Vec<u32>)>,
}

impl IdmapBuilder {
    pub fn new(target_package_id: u16) -> IdmapBuilder {
        IdmapBuilder {
            target_package_id,
            type_maps: Vec::new(),
        }
    }

    /// Map overlay type to target type, `entries[i]` is the overlay entry for target entry `offset + i`
    pub fn type_map(
        mut self,
        target_type_id: u16,
        overlay_type_id: u16,
        entry_id_offset: u16,
        entries: Vec<u32>,
    ) -> IdmapBuilder {
        self.type_maps
            .push((target_type_id, overlay_type_id, entry_id_offset, entries));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, 0x504D_4449);
        put_u32(&mut out, 1);
        put_u32(&mut out, 0);
        put_u32(&mut out, 0);
        out.resize(out.len() + 512, 0);
        put_u16(&mut out, self.target_package_id);
        put_u16(&mut out, self.type_maps.len() as u16);

        for (target, overlay, offset, entries) in &self.type_maps {
            put_u16(&mut out, *target);
            put_u16(&mut out, *overlay);
            put_u16(&mut out, entries.len() as u16);
            put_u16(&mut out, *offset);
            for entry in entries {
                put_u32(&mut out, *entry);
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
struct XmlAttr {
    resid: Option<u32>,
    name: String,
    value: ResValue,
}

/// Builder for a binary XML document holding a single element
#[derive(Debug, Clone)]
pub struct XmlBuilder {
    element: String,
    attributes: Vec<XmlAttr>,
}

impl XmlBuilder {
    pub fn new(element: &str) -> XmlBuilder {
        XmlBuilder {
            element: element.to_owned(),
            attributes: Vec::new(),
        }
    }

    /// Attribute bound to resource id `resid`
    pub fn attribute(mut self, resid: u32, name: &str, value: ResValue) -> XmlBuilder {
        self.attributes.push(XmlAttr {
            resid: Some(resid),
            name: name.to_owned(),
            value,
        });
        self
    }

    /// `style="..."` attribute, which has no resource id
    pub fn style(mut self, value: ResValue) -> XmlBuilder {
        self.attributes.push(XmlAttr {
            resid: None,
            name: "style".to_owned(),
            value,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        // names with resource ids go first so the resource map covers them
        let mut attrs: Vec<&XmlAttr> = self.attributes.iter().collect();
        attrs.sort_by_key(|a| (a.resid.is_none(), a.resid));

        let mut strings: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        let element_idx = strings.len() as u32;
        strings.push(&self.element);

        let mut resource_map = Vec::new();
        for resid in attrs.iter().filter_map(|a| a.resid) {
            put_u32(&mut resource_map, resid);
        }

        let mut ext = Vec::new();
        put_u32(&mut ext, 0xffff_ffff);
        put_u32(&mut ext, element_idx);
        put_u16(&mut ext, 20);
        put_u16(&mut ext, 20);
        put_u16(&mut ext, attrs.len() as u16);
        put_u16(&mut ext, 0);
        put_u16(&mut ext, 0);
        let style_index = attrs
            .iter()
            .position(|a| a.resid.is_none() && a.name == "style")
            .map_or(0, |idx| idx as u16 + 1);
        put_u16(&mut ext, style_index);
        for (idx, attr) in attrs.iter().enumerate() {
            put_u32(&mut ext, 0xffff_ffff);
            put_u32(&mut ext, idx as u32);
            put_u32(&mut ext, 0xffff_ffff);
            put_value(&mut ext, &attr.value);
        }

        let mut node_header = Vec::new();
        put_u32(&mut node_header, 1);
        put_u32(&mut node_header, 0xffff_ffff);

        let mut end = Vec::new();
        put_u32(&mut end, 0xffff_ffff);
        put_u32(&mut end, element_idx);

        let mut body = StringPoolBuilder::utf8(&strings).build();
        body.extend(chunk(0x0180, &[], &resource_map));
        body.extend(chunk(0x0102, &node_header, &ext));
        body.extend(chunk(0x0103, &node_header, &end));

        chunk(0x0003, &[], &body)
    }
}
