use alloc::string::String;
use alloc::vec;

use crate::{yaml_emitter_emit, Document, Emitter, EmitterError, Encoding, Event, NodeData};

/// Per-node bookkeeping the dumper uses to decide when a node needs an
/// anchor (referenced more than once) and whether it has already been
/// emitted (in which case later references become aliases).
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct AnchorInfo {
    pub(crate) references: i32,
    pub(crate) anchor: i32,
    pub(crate) serialized: bool,
}

/// Start a YAML stream.
///
/// This function should be used before [`yaml_emitter_dump`] is called.
pub fn yaml_emitter_open(emitter: &mut Emitter) -> Result<(), EmitterError> {
    assert!(!emitter.opened);
    let event = Event::new(crate::EventData::StreamStart {
        encoding: Encoding::Any,
    });
    yaml_emitter_emit(emitter, event)?;
    emitter.opened = true;
    Ok(())
}

/// Finish a YAML stream.
///
/// This function should be used after [`yaml_emitter_dump`] is called.
pub fn yaml_emitter_close(emitter: &mut Emitter) -> Result<(), EmitterError> {
    assert!(emitter.opened);
    if emitter.closed {
        return Ok(());
    }
    let event = Event::new(crate::EventData::StreamEnd);
    yaml_emitter_emit(emitter, event)?;
    emitter.closed = true;
    Ok(())
}

/// Emit a YAML document.
///
/// The document object may be generated using [`crate::yaml_parser_load`] or
/// assembled with [`Document::new`] and its `add_*` methods. The document's
/// nodes are consumed by this call.
pub fn yaml_emitter_dump(
    emitter: &mut Emitter,
    document: &mut Document,
) -> Result<(), EmitterError> {
    if !emitter.opened {
        yaml_emitter_open(emitter)?;
    }
    if document.nodes.is_empty() {
        yaml_emitter_close(emitter)?;
        return Ok(());
    }

    assert!(emitter.opened);
    emitter.anchors = vec![AnchorInfo::default(); document.nodes.len()];

    let event = Event::new(crate::EventData::DocumentStart {
        version_directive: document.version_directive,
        tag_directives: core::mem::take(&mut document.tag_directives),
        implicit: document.start_implicit,
    });
    yaml_emitter_emit(emitter, event)?;

    anchor_node(emitter, document, 1);
    dump_node(emitter, document, 1)?;

    let event = Event::new(crate::EventData::DocumentEnd {
        implicit: document.end_implicit,
    });
    yaml_emitter_emit(emitter, event)?;

    document.nodes.clear();
    emitter.anchors.clear();
    emitter.last_anchor_id = 0;
    Ok(())
}

fn anchor_node_sub(emitter: &mut Emitter, index: i32) {
    emitter.anchors[index as usize - 1].references += 1;
    if emitter.anchors[index as usize - 1].references == 2 {
        emitter.last_anchor_id += 1;
        emitter.anchors[index as usize - 1].anchor = emitter.last_anchor_id;
    }
}

fn anchor_node(emitter: &mut Emitter, document: &Document, index: i32) {
    let node = &document.nodes[index as usize - 1];
    emitter.anchors[index as usize - 1].references += 1;
    if emitter.anchors[index as usize - 1].references == 1 {
        match &node.data {
            NodeData::Sequence { items, .. } => {
                for item in items {
                    anchor_node_sub(emitter, *item);
                }
            }
            NodeData::Mapping { pairs, .. } => {
                for pair in pairs {
                    anchor_node_sub(emitter, pair.key);
                    anchor_node_sub(emitter, pair.value);
                }
            }
            NodeData::Scalar { .. } | NodeData::NoNode => {}
        }
    } else if emitter.anchors[index as usize - 1].references == 2 {
        emitter.last_anchor_id += 1;
        emitter.anchors[index as usize - 1].anchor = emitter.last_anchor_id;
    }
}

fn generate_anchor(anchor_id: i32) -> String {
    alloc::format!("id{anchor_id:03}")
}

fn dump_node(
    emitter: &mut Emitter,
    document: &mut Document,
    index: i32,
) -> Result<(), EmitterError> {
    let anchor_id = emitter.anchors[index as usize - 1].anchor;
    let anchor = (anchor_id != 0).then(|| generate_anchor(anchor_id));
    if emitter.anchors[index as usize - 1].serialized {
        return dump_alias(emitter, anchor.expect("serialized node always has an anchor"));
    }
    emitter.anchors[index as usize - 1].serialized = true;

    let node = core::mem::take(&mut document.nodes[index as usize - 1]);
    match node.data {
        NodeData::Scalar { .. } => dump_scalar(emitter, node, anchor),
        NodeData::Sequence { .. } => dump_sequence(emitter, document, node, anchor),
        NodeData::Mapping { .. } => dump_mapping(emitter, document, node, anchor),
        NodeData::NoNode => unreachable!("document node without content"),
    }
}

fn dump_alias(emitter: &mut Emitter, anchor: String) -> Result<(), EmitterError> {
    yaml_emitter_emit(emitter, Event::new(crate::EventData::Alias { anchor }))
}

fn dump_scalar(
    emitter: &mut Emitter,
    node: crate::Node,
    anchor: Option<String>,
) -> Result<(), EmitterError> {
    let plain_implicit = node.tag.as_deref() == Some(crate::DEFAULT_SCALAR_TAG);
    let quoted_implicit = plain_implicit;

    let NodeData::Scalar { value, style } = node.data else {
        unreachable!()
    };
    let event = Event::new(crate::EventData::Scalar {
        anchor,
        tag: node.tag,
        value,
        plain_implicit,
        quoted_implicit,
        style,
    });
    yaml_emitter_emit(emitter, event)
}

fn dump_sequence(
    emitter: &mut Emitter,
    document: &mut Document,
    node: crate::Node,
    anchor: Option<String>,
) -> Result<(), EmitterError> {
    let implicit = node.tag.as_deref() == Some(crate::DEFAULT_SEQUENCE_TAG);

    let NodeData::Sequence { items, style } = node.data else {
        unreachable!()
    };
    let event = Event::new(crate::EventData::SequenceStart {
        anchor,
        tag: node.tag,
        implicit,
        style,
    });
    yaml_emitter_emit(emitter, event)?;
    for item in items {
        dump_node(emitter, document, item)?;
    }
    yaml_emitter_emit(emitter, Event::new(crate::EventData::SequenceEnd))
}

fn dump_mapping(
    emitter: &mut Emitter,
    document: &mut Document,
    node: crate::Node,
    anchor: Option<String>,
) -> Result<(), EmitterError> {
    let implicit = node.tag.as_deref() == Some(crate::DEFAULT_MAPPING_TAG);

    let NodeData::Mapping { mut pairs, style } = node.data else {
        unreachable!()
    };
    if emitter.sort_keys {
        document.sort_mapping_pairs(&mut pairs);
    }
    let event = Event::new(crate::EventData::MappingStart {
        anchor,
        tag: node.tag,
        implicit,
        style,
    });
    yaml_emitter_emit(emitter, event)?;
    for pair in pairs {
        dump_node(emitter, document, pair.key)?;
        dump_node(emitter, document, pair.value)?;
    }
    yaml_emitter_emit(emitter, Event::new(crate::EventData::MappingEnd))
}
