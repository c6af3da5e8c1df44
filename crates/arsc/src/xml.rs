//! Compiled XML documents, read as a flat stream of nodes.
//!
//! Only what attribute resolution needs is kept: element names, attribute
//! resource ids and typed values, and the `style` attribute index.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=1000

use log::{debug, warn};
use winnow::binary::{le_u16, le_u32};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::chunk::{Chunk, ChunkIterator};
use crate::dynamic_ref::DynamicRefTable;
use crate::errors::ArscError;
use crate::structs::{ResStringPool, ResValue, ResourceType};

/// String index meaning "none"
pub const NO_INDEX: u32 = 0xffff_ffff;

/// Line number and comment shared by every node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlNodeHeader {
    /// Line number in original source file at which this element appeared
    pub line_number: u32,

    /// Optional XML comment that was associated with this element; [`NO_INDEX`] if none
    pub comment: u32,
}

impl XmlNodeHeader {
    /// `ResXMLTree_node` including the chunk header
    pub const SIZE: usize = 16;

    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<XmlNodeHeader> {
        (le_u32, le_u32)
            .map(|(line_number, comment)| XmlNodeHeader {
                line_number,
                comment,
            })
            .parse_next(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Namespace of this attribute
    pub namespace_uri: u32,

    /// Name of this attribute, indexes the resource map as well as the string pool
    pub name: u32,

    /// The original raw string value of this attribute
    pub raw_value: u32,

    /// Processed typed value of this attribute
    pub typed_value: ResValue,
}

impl XmlAttribute {
    const DEFAULT_ATTRIBUTE_SIZE: u16 = 0x14;

    pub fn parse(attribute_size: u16) -> impl FnMut(&mut &[u8]) -> ModalResult<XmlAttribute> {
        move |input: &mut &[u8]| {
            let (namespace_uri, name, raw_value, typed_value) =
                (le_u32, le_u32, le_u32, ResValue::parse).parse_next(input)?;

            // attributes larger than the known structure carry trailing data
            if let Some(extra) = attribute_size.checked_sub(Self::DEFAULT_ATTRIBUTE_SIZE)
                && extra > 0
            {
                let _ = take(extra).parse_next(input)?;
            }

            Ok(XmlAttribute {
                namespace_uri,
                name,
                raw_value,
                typed_value,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlStartElement {
    pub header: XmlNodeHeader,

    /// String of the full namespace of this element
    pub namespace_uri: u32,

    /// String name of this node
    pub name: u32,

    /// Index (1-based) of the "id" attribute. 0 if none.
    pub id_index: u16,

    /// Index (1-based) of the "class" attribute. 0 if none.
    pub class_index: u16,

    /// Index (1-based) of the "style" attribute. 0 if none.
    pub style_index: u16,

    pub attributes: Vec<XmlAttribute>,
}

impl XmlStartElement {
    /// `ResXMLTree_attrExt`
    const EXT_SIZE: usize = 20;

    fn parse(chunk: &Chunk<'_>) -> Result<XmlStartElement, ArscError> {
        let header = XmlNodeHeader::parse(&mut chunk.header_bytes())
            .map_err(|_: ErrMode<ContextError>| ArscError::InvalidXml("node header is truncated"))?;

        let ext = chunk.data();
        if ext.len() < Self::EXT_SIZE {
            return Err(ArscError::InvalidXml("element is truncated"));
        }

        let mut input = ext;
        let (
            namespace_uri,
            name,
            attribute_start,
            attribute_size,
            attribute_count,
            id_index,
            class_index,
            style_index,
        ) = (
            le_u32, // namespace_uri
            le_u32, // name
            le_u16, // attribute_start
            le_u16, // attribute_size
            le_u16, // attribute_count
            le_u16, // id_index
            le_u16, // class_index
            le_u16, // style_index
        )
            .parse_next(&mut input)
            .map_err(|_: ErrMode<ContextError>| ArscError::InvalidXml("element is truncated"))?;

        let attributes_end = attribute_start as usize + attribute_size as usize * attribute_count as usize;
        if attributes_end > ext.len() {
            warn!(
                "bad XML block: attributes end at {}, past the element of size {}",
                attributes_end,
                ext.len()
            );
            return Err(ArscError::InvalidXml("attributes extend beyond the element"));
        }
        if attribute_count > 0 && attribute_size < XmlAttribute::DEFAULT_ATTRIBUTE_SIZE {
            return Err(ArscError::InvalidXml("attribute size is too small"));
        }

        let mut attrs = &ext[attribute_start as usize..attributes_end];
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        for _ in 0..attribute_count {
            let attribute = XmlAttribute::parse(attribute_size)(&mut attrs)
                .map_err(|_: ErrMode<ContextError>| ArscError::InvalidXml("attribute is truncated"))?;
            attributes.push(attribute);
        }

        Ok(XmlStartElement {
            header,
            namespace_uri,
            name,
            id_index,
            class_index,
            style_index,
            attributes,
        })
    }
}

/// Single event of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    StartNamespace {
        header: XmlNodeHeader,
        prefix: u32,
        uri: u32,
    },
    EndNamespace {
        header: XmlNodeHeader,
        prefix: u32,
        uri: u32,
    },
    StartElement(XmlStartElement),
    EndElement {
        header: XmlNodeHeader,
        namespace_uri: u32,
        name: u32,
    },
    CData {
        header: XmlNodeHeader,
        data: u32,
        typed_data: ResValue,
    },
}

impl XmlNode {
    fn parse(chunk: &Chunk<'_>) -> Result<XmlNode, ArscError> {
        if chunk.header_size() < XmlNodeHeader::SIZE {
            return Err(ArscError::InvalidXml("node header size is too small"));
        }

        let truncated = |_: ErrMode<ContextError>| ArscError::InvalidXml("node is truncated");
        let header = XmlNodeHeader::parse(&mut chunk.header_bytes()).map_err(truncated)?;
        let mut data = chunk.data();

        let node = match chunk.type_() {
            ResourceType::XmlStartNamespace => {
                let (prefix, uri) = (le_u32, le_u32).parse_next(&mut data).map_err(truncated)?;
                XmlNode::StartNamespace {
                    header,
                    prefix,
                    uri,
                }
            }
            ResourceType::XmlEndNamespace => {
                let (prefix, uri) = (le_u32, le_u32).parse_next(&mut data).map_err(truncated)?;
                XmlNode::EndNamespace {
                    header,
                    prefix,
                    uri,
                }
            }
            ResourceType::XmlStartElement => XmlNode::StartElement(XmlStartElement::parse(chunk)?),
            ResourceType::XmlEndElement => {
                let (namespace_uri, name) =
                    (le_u32, le_u32).parse_next(&mut data).map_err(truncated)?;
                XmlNode::EndElement {
                    header,
                    namespace_uri,
                    name,
                }
            }
            ResourceType::XmlCdata => {
                let (data, typed_data) =
                    (le_u32, ResValue::parse).parse_next(&mut data).map_err(truncated)?;
                XmlNode::CData {
                    header,
                    data,
                    typed_data,
                }
            }
            _ => return Err(ArscError::InvalidXml("unknown node type")),
        };

        Ok(node)
    }
}

/// Validated compiled XML document
#[derive(Debug, Clone)]
pub struct XmlTree {
    strings: ResStringPool,
    resource_ids: Vec<u32>,
    nodes: Vec<XmlNode>,
}

impl XmlTree {
    pub fn load(data: &[u8]) -> Result<XmlTree, ArscError> {
        let mut iter = ChunkIterator::new(data);
        let root = match iter.next() {
            Some(Ok(root)) => root,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ArscError::TooSmallError),
        };

        if root.type_() != ResourceType::Xml {
            return Err(ArscError::InvalidXml("root chunk is not RES_XML_TYPE"));
        }

        let mut strings = None;
        let mut resource_ids = Vec::new();
        let mut nodes = Vec::new();

        let mut children = root.children();
        for child in children.by_ref() {
            let child = match child {
                Ok(child) => child,
                Err(e) => {
                    warn!("{}", e);
                    break;
                }
            };

            match child.type_() {
                ResourceType::StringPool if strings.is_none() => {
                    strings = Some(ResStringPool::load(child.bytes())?);
                }
                ResourceType::StringPool => {
                    warn!("multiple string pools found in XML, ignoring");
                }
                ResourceType::XmlResourceMap if nodes.is_empty() => {
                    resource_ids = child
                        .data()
                        .chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect();
                }
                ResourceType::XmlStartNamespace
                | ResourceType::XmlEndNamespace
                | ResourceType::XmlStartElement
                | ResourceType::XmlEndElement
                | ResourceType::XmlCdata => {
                    nodes.push(XmlNode::parse(&child)?);
                }
                other => {
                    debug!("skipping unknown chunk {:?} in XML", other);
                }
            }
        }

        if children.had_fatal_error() {
            return Err(ArscError::InvalidXml("malformed chunk"));
        }

        let strings = strings.ok_or(ArscError::InvalidXml("no string pool"))?;
        if !nodes
            .iter()
            .any(|node| matches!(node, XmlNode::StartElement(_)))
        {
            return Err(ArscError::InvalidXml("no root element"));
        }

        Ok(XmlTree {
            strings,
            resource_ids,
            nodes,
        })
    }

    #[inline]
    pub fn strings(&self) -> &ResStringPool {
        &self.strings
    }

    #[inline]
    pub fn resource_ids(&self) -> &[u32] {
        &self.resource_ids
    }

    #[inline]
    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    /// Start tags in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlStartElement> {
        self.nodes.iter().filter_map(|node| match node {
            XmlNode::StartElement(element) => Some(element),
            _ => None,
        })
    }

    /// Cursor positioned before the first node.
    ///
    /// Resource ids and values are passed through `dynamic_ref_table` when given.
    #[inline]
    pub fn parser<'a>(&'a self, dynamic_ref_table: Option<&'a DynamicRefTable>) -> XmlParser<'a> {
        XmlParser {
            tree: self,
            dynamic_ref_table,
            position: None,
        }
    }
}

/// Cursor over the nodes of an [`XmlTree`], attribute accessors look at the
/// current start tag
#[derive(Debug, Clone)]
pub struct XmlParser<'a> {
    tree: &'a XmlTree,
    dynamic_ref_table: Option<&'a DynamicRefTable>,
    position: Option<usize>,
}

impl<'a> XmlParser<'a> {
    /// Advance to the next node
    pub fn next_node(&mut self) -> Option<&'a XmlNode> {
        let next = self.position.map_or(0, |p| p + 1);
        let node = self.tree.nodes.get(next)?;
        self.position = Some(next);
        Some(node)
    }

    /// Advance to the next start tag
    pub fn next_element(&mut self) -> Option<&'a XmlStartElement> {
        while let Some(node) = self.next_node() {
            if let XmlNode::StartElement(element) = node {
                return Some(element);
            }
        }
        None
    }

    #[inline]
    pub fn current(&self) -> Option<&'a XmlNode> {
        self.tree.nodes.get(self.position?)
    }

    #[inline]
    pub fn element(&self) -> Option<&'a XmlStartElement> {
        match self.current()? {
            XmlNode::StartElement(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_name(&self) -> Option<String> {
        self.tree.strings.string_at(self.element()?.name as usize)
    }

    #[inline]
    pub fn attribute_count(&self) -> usize {
        self.element().map_or(0, |e| e.attributes.len())
    }

    #[inline]
    fn attribute(&self, idx: usize) -> Option<&'a XmlAttribute> {
        self.element()?.attributes.get(idx)
    }

    pub fn attribute_name(&self, idx: usize) -> Option<String> {
        self.tree.strings.string_at(self.attribute(idx)?.name as usize)
    }

    /// Resource id the attribute name is bound to, 0 if none or untranslatable
    pub fn attribute_name_resid(&self, idx: usize) -> u32 {
        let Some(attribute) = self.attribute(idx) else {
            return 0;
        };

        let Some(&resid) = self.tree.resource_ids.get(attribute.name as usize) else {
            return 0;
        };

        match self.dynamic_ref_table {
            Some(table) => table.lookup_resource_id(resid).unwrap_or(0),
            None => resid,
        }
    }

    /// Typed value of the attribute, `None` if its reference can't be translated
    pub fn attribute_value(&self, idx: usize) -> Option<ResValue> {
        let value = self.attribute(idx)?.typed_value;
        match self.dynamic_ref_table {
            Some(table) => table.lookup_resource_value(value),
            None => Some(value),
        }
    }

    pub fn attribute_string_value(&self, idx: usize) -> Option<String> {
        let raw = self.attribute(idx)?.raw_value;
        if raw == NO_INDEX {
            return None;
        }
        self.tree.strings.string_at(raw as usize)
    }

    /// Index of the `style` attribute of the current tag
    #[inline]
    pub fn index_of_style(&self) -> Option<usize> {
        let style = self.element()?.style_index;
        (style > 0).then(|| style as usize - 1)
    }

    #[inline]
    pub fn index_of_id(&self) -> Option<usize> {
        let id = self.element()?.id_index;
        (id > 0).then(|| id as usize - 1)
    }

    #[inline]
    pub fn index_of_class(&self) -> Option<usize> {
        let class = self.element()?.class_index;
        (class > 0).then(|| class as usize - 1)
    }
}
