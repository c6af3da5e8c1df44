//! Flattening of bags (styles, arrays, plurals, ...) with their parents.

use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, error};
use restable_arsc::structs::{
    ResTableConfigFlags, ResTableEntry, ResValue, is_internal_resource_id,
};
use smallvec::SmallVec;

use crate::asset_manager::{AssetManager, Cookie};
use crate::errors::LookupError;

/// Parent chain being flattened, the requested bag first
type Chain = SmallVec<[OwnBag; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BagEntry {
    /// Attribute id, or an `ATTR_*` ordinal in `attr` bags
    pub key: u32,

    pub value: ResValue,

    /// Bag in the parent chain that defined the entry
    pub style: u32,

    pub cookie: Cookie,
}

/// Bag merged with all of its parents, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBag {
    /// Configuration axes any bag in the chain varies with
    pub type_spec_flags: ResTableConfigFlags,

    pub entries: Vec<BagEntry>,
}

impl ResolvedBag {
    /// Entry for `key`
    pub fn find(&self, key: u32) -> Option<&BagEntry> {
        self.entries
            .binary_search_by_key(&key, |entry| entry.key)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BagEntry> {
        self.entries.iter()
    }
}

/// Bag as written in the table, before inheriting anything
struct OwnBag {
    resid: u32,
    parent: u32,
    type_spec_flags: ResTableConfigFlags,
    entries: Vec<BagEntry>,
}

impl AssetManager {
    /// Resolve the bag `resid` with everything it inherits.
    ///
    /// Results are cached until a configuration change touches one of the
    /// bag's flags. Bags whose parent chain loops back onto itself are
    /// treated as having no parent.
    pub fn get_bag(&self, resid: u32) -> Result<Arc<ResolvedBag>, LookupError> {
        if let Some(bag) = self.cached_bag(resid) {
            return Ok(bag);
        }

        // walk up until a bag without parent, a flattened one or a cycle
        let mut chain: Chain = SmallVec::new();
        let mut positions: AHashMap<u32, usize> = AHashMap::new();
        let mut next = resid;

        let (mut inherited, cycle_start) = loop {
            let own = match self.own_bag(next) {
                Ok(own) => own,
                Err(e) => {
                    if let Some(child) = chain.last() {
                        error!(
                            "failed to find parent 0x{:08x} of bag 0x{:08x}",
                            next, child.resid
                        );
                    }
                    return Err(e);
                }
            };
            let parent = own.parent;
            positions.insert(next, chain.len());
            chain.push(own);

            if parent == 0 {
                break (None, chain.len());
            }
            if let Some(&start) = positions.get(&parent) {
                debug!(
                    "bag 0x{:08x} inherits from 0x{:08x} which is already being resolved",
                    next, parent
                );
                break (None, start);
            }
            if let Some(bag) = self.cached_bag(parent) {
                break (Some(bag), chain.len());
            }
            next = parent;
        };

        // flatten from the root down, bags on a parent cycle keep only their own entries
        for (idx, own) in chain.into_iter().enumerate().rev() {
            let bag_resid = own.resid;
            let bag = match &inherited {
                Some(parent) if idx < cycle_start => ResolvedBag {
                    type_spec_flags: own.type_spec_flags | parent.type_spec_flags,
                    entries: merge(&own.entries, &parent.entries),
                },
                _ => ResolvedBag {
                    type_spec_flags: own.type_spec_flags,
                    entries: own.entries,
                },
            };
            let bag = Arc::new(bag);

            self.cached_bags
                .borrow_mut()
                .insert(bag_resid, Arc::clone(&bag));
            inherited = Some(bag);
        }

        inherited.ok_or(LookupError::NotFound(resid))
    }

    fn cached_bag(&self, resid: u32) -> Option<Arc<ResolvedBag>> {
        self.cached_bags.borrow().get(&resid).cloned()
    }

    /// Entries of `resid` with keys and values translated to runtime ids
    fn own_bag(&self, resid: u32) -> Result<OwnBag, LookupError> {
        let entry = self.find_entry(resid, 0)?;
        let ResTableEntry::Complex { parent, map, .. } = entry.entry else {
            debug!("0x{:08x} is not a bag", resid);
            return Err(LookupError::NotFound(resid));
        };
        let table = entry.dynamic_ref_table;

        let mut entries = Vec::with_capacity(map.len());
        for item in map {
            let key = if is_internal_resource_id(item.name) {
                item.name
            } else {
                table.lookup_resource_id(item.name).ok_or_else(|| {
                    error!("failed to resolve key 0x{:08x} in bag 0x{:08x}", item.name, resid);
                    LookupError::DynamicReference(item.name)
                })?
            };

            let value = table.lookup_resource_value(item.value).ok_or_else(|| {
                error!(
                    "failed to resolve value t=0x{:02x} d=0x{:08x} for key 0x{:08x}",
                    u8::from(item.value.data_type),
                    item.value.data,
                    key
                );
                LookupError::DynamicReference(item.value.data)
            })?;

            entries.push(BagEntry {
                key,
                value,
                style: resid,
                cookie: entry.cookie,
            });
        }

        // parents are always written as dynamic references
        let parent = match *parent {
            0 => 0,
            parent => table.lookup_resource_id(parent).unwrap_or(parent),
        };

        Ok(OwnBag {
            resid,
            parent,
            type_spec_flags: entry.type_flags,
            entries,
        })
    }
}

/// Merge two key sorted lists, `child` wins on equal keys
fn merge(child: &[BagEntry], parent: &[BagEntry]) -> Vec<BagEntry> {
    let mut out = Vec::with_capacity(child.len() + parent.len());
    let (mut c, mut p) = (0, 0);

    while c < child.len() && p < parent.len() {
        let child_key = child[c].key;
        let parent_key = parent[p].key;

        if child_key <= parent_key {
            out.push(child[c]);
            c += 1;
        } else {
            out.push(parent[p]);
        }

        if child_key >= parent_key {
            p += 1;
        }
    }

    out.extend_from_slice(&child[c..]);
    out.extend_from_slice(&parent[p..]);
    out
}
