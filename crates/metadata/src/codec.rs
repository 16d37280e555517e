use crate::error::CodecError;
use crate::literal::{decode_list, encode_list, looks_like_list};
use crate::value::{FlatMetadata, Metadata, Scalar, Value};
use std::collections::btree_map::Entry;

pub const DELIMITER: char = '.';

/// Project nested metadata onto dot-joined keys.
///
/// Lists are stored as their list literal (see [`encode_list`]); empty nested mappings
/// leave no key behind. Two paths landing on the same flat key (`{"a.b": 1}` next to
/// `{"a": {"b": 2}}`) keep the first in key order and log the conflict; use
/// [`flatten_reporting`] to get conflicts back.
#[must_use]
pub fn flatten(metadata: &Metadata) -> FlatMetadata {
    let (flat, errors) = flatten_reporting(metadata);
    for err in errors {
        log::warn!("Metadata encode: {err}");
    }
    flat
}

pub fn flatten_reporting(metadata: &Metadata) -> (FlatMetadata, Vec<CodecError>) {
    let mut flat = FlatMetadata::new();
    let mut errors = Vec::new();
    flatten_into(&mut flat, &mut errors, None, metadata);
    (flat, errors)
}

fn flatten_into(
    out: &mut FlatMetadata,
    errors: &mut Vec<CodecError>,
    prefix: Option<&str>,
    map: &Metadata,
) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{DELIMITER}{key}"),
            None => key.clone(),
        };
        let leaf = match value {
            Value::Scalar(scalar) => scalar.clone(),
            Value::List(items) => Scalar::Str(encode_list(items)),
            Value::Map(inner) => {
                flatten_into(out, errors, Some(&path), inner);
                continue;
            }
        };
        match out.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(leaf);
            }
            Entry::Occupied(slot) => errors.push(CodecError::KeyConflict {
                key: slot.key().clone(),
            }),
        }
    }
}

/// Rebuild nested metadata from a flat payload, decoding list literals.
///
/// Decode failures keep the original string and are logged; use
/// [`unflatten_reporting`] to get them back.
#[must_use]
pub fn unflatten(flat: &FlatMetadata) -> Metadata {
    let (metadata, errors) = unflatten_reporting(flat);
    for err in errors {
        log::warn!("Metadata decode: {err}");
    }
    metadata
}

pub fn unflatten_reporting(flat: &FlatMetadata) -> (Metadata, Vec<CodecError>) {
    let mut root = Metadata::new();
    let mut errors = Vec::new();
    for (key, scalar) in flat {
        let value = decode_leaf(scalar, &mut errors);
        if let Err(err) = insert_path(&mut root, key, value) {
            errors.push(err);
        }
    }
    (root, errors)
}

fn decode_leaf(scalar: &Scalar, errors: &mut Vec<CodecError>) -> Value {
    match scalar {
        Scalar::Str(text) if looks_like_list(text) => match decode_list(text) {
            Ok(items) => Value::List(items),
            Err(err) => {
                errors.push(err);
                Value::Scalar(scalar.clone())
            }
        },
        _ => Value::Scalar(scalar.clone()),
    }
}

fn insert_path(root: &mut Metadata, key: &str, value: Value) -> Result<(), CodecError> {
    let conflict = || CodecError::KeyConflict {
        key: key.to_string(),
    };
    let mut parts = key.split(DELIMITER).peekable();
    let mut node = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            return match node.entry(part.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    Ok(())
                }
                Entry::Occupied(_) => Err(conflict()),
            };
        }
        let child = node
            .entry(part.to_string())
            .or_insert_with(|| Value::Map(Metadata::new()));
        node = match child {
            Value::Map(map) => map,
            _ => return Err(conflict()),
        };
    }
    Ok(())
}
