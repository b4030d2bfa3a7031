// WHY: BHSA ships as a Text-Fabric feature directory; containment is decided by slot sets,
// so children are found by walking down from the parent's slots, never by joining node sets

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{features, AnnotationGraph, NodeId};
use crate::diagnostics::GraphError;

const OTYPE_FILE: &str = "otype.tf";
const OSLOTS_FILE: &str = "oslots.tf";

/// Features the adapter reads
pub const DEFAULT_FEATURES: &[&str] = &[
    features::BOOK,
    features::CHAPTER,
    features::VERSE,
    features::SURFACE,
    features::LEXEME,
    features::VOCALIZED_LEXEME,
    features::PART_OF_SPEECH,
];

/// Span of a non-slot node; slots are sorted ascending
#[derive(Debug, Clone)]
struct SlotSpan {
    node: NodeId,
    first: NodeId,
    last: NodeId,
}

/// A Text-Fabric dataset loaded from disk
#[derive(Debug)]
pub struct TextFabricDataset {
    type_names: Vec<String>,
    // index is NodeId - 1
    node_types: Vec<u16>,
    max_slot: NodeId,
    // index is NodeId - max_slot - 1
    oslots: Vec<Vec<NodeId>>,
    // per type, spans sorted by first slot
    spans_by_type: Vec<Vec<SlotSpan>>,
    features: HashMap<String, HashMap<NodeId, String>>,
}

impl TextFabricDataset {
    /// Load the structure plus the features the adapter needs
    pub fn load_default(dir: &Path) -> Result<Self> {
        Self::load(dir, DEFAULT_FEATURES)
    }

    /// Blocking, potentially large load; do it once per process
    pub fn load(dir: &Path, feature_names: &[&str]) -> Result<Self> {
        let start_time = std::time::Instant::now();
        info!("Loading Text-Fabric dataset from {}", dir.display());

        let otype = read_feature_file(&dir.join(OTYPE_FILE))?;
        let (type_names, node_types) = build_types(&otype.data, otype.first_line)?;
        let max_slot = node_types
            .iter()
            .take_while(|t| **t == node_types[0])
            .count() as NodeId;

        let oslots_file = read_feature_file(&dir.join(OSLOTS_FILE))?;
        let oslots = build_oslots(&oslots_file.data, oslots_file.first_line, max_slot, node_types.len())?;

        let mut features = HashMap::new();
        for name in feature_names {
            let path = dir.join(format!("{name}.tf"));
            if !path.exists() {
                warn!("Feature file missing, {} will read as absent: {}", name, path.display());
                continue;
            }
            let file = read_feature_file(&path)?;
            let values = parse_node_values(&file.data, file.first_line, 1)
                .with_context(|| format!("Malformed feature file {}", path.display()))?;
            debug!("Loaded feature {} with {} values", name, values.len());
            features.insert(name.to_string(), values);
        }

        let mut dataset = Self {
            type_names,
            node_types,
            max_slot,
            oslots,
            spans_by_type: Vec::new(),
            features,
        };
        dataset.index_spans();

        info!(
            "Loaded {} nodes ({} slots, {} types) in {}ms",
            dataset.node_types.len(),
            dataset.max_slot,
            dataset.type_names.len(),
            start_time.elapsed().as_millis()
        );
        Ok(dataset)
    }

    pub fn max_slot(&self) -> NodeId {
        self.max_slot
    }

    pub fn node_count(&self) -> usize {
        self.node_types.len()
    }

    fn type_id(&self, otype: &str) -> Result<usize, GraphError> {
        self.type_names
            .iter()
            .position(|t| t == otype)
            .ok_or_else(|| GraphError::UnknownType(otype.to_string()))
    }

    fn check_node(&self, node: NodeId) -> Result<(), GraphError> {
        if node == 0 || node as usize > self.node_types.len() {
            return Err(GraphError::UnknownNode(node));
        }
        Ok(())
    }

    /// Slots of a non-slot node
    fn oslots_of(&self, node: NodeId) -> &[NodeId] {
        &self.oslots[(node - self.max_slot - 1) as usize]
    }

    fn contains(&self, parent_slots: &[NodeId], child: NodeId) -> bool {
        if child <= self.max_slot {
            return parent_slots.binary_search(&child).is_ok();
        }
        self.oslots_of(child)
            .iter()
            .all(|slot| parent_slots.binary_search(slot).is_ok())
    }

    fn index_spans(&mut self) {
        let mut spans_by_type: Vec<Vec<SlotSpan>> = vec![Vec::new(); self.type_names.len()];
        for (i, type_id) in self.node_types.iter().enumerate() {
            let node = i as NodeId + 1;
            let (first, last) = if node <= self.max_slot {
                (node, node)
            } else {
                let slots = self.oslots_of(node);
                match (slots.first(), slots.last()) {
                    (Some(first), Some(last)) => (*first, *last),
                    _ => continue,
                }
            };
            spans_by_type[*type_id as usize].push(SlotSpan { node, first, last });
        }
        for spans in &mut spans_by_type {
            spans.sort_by_key(|s| (s.first, s.node));
        }
        self.spans_by_type = spans_by_type;
    }
}

impl AnnotationGraph for TextFabricDataset {
    fn nodes_of_type(&self, otype: &str) -> Result<Vec<NodeId>, GraphError> {
        let type_id = self.type_id(otype)?;
        Ok(self.spans_by_type[type_id].iter().map(|s| s.node).collect())
    }

    fn children(&self, parent: NodeId, otype: &str) -> Result<Vec<NodeId>, GraphError> {
        self.check_node(parent)?;
        let type_id = self.type_id(otype)?;
        if parent <= self.max_slot {
            return Ok(Vec::new());
        }
        let parent_slots = self.oslots_of(parent);
        let (Some(&low), Some(&high)) = (parent_slots.first(), parent_slots.last()) else {
            return Ok(Vec::new());
        };

        let spans = &self.spans_by_type[type_id];
        let start = spans.partition_point(|s| s.first < low);
        Ok(spans[start..]
            .iter()
            .take_while(|s| s.first <= high)
            .filter(|s| s.node != parent && s.last <= high && self.contains(parent_slots, s.node))
            .map(|s| s.node)
            .collect())
    }

    fn feature(&self, node: NodeId, name: &str) -> Result<Option<String>, GraphError> {
        self.check_node(node)?;
        let values = self.features.get(name).ok_or_else(|| GraphError::FeatureAccess {
            node,
            feature: name.to_string(),
            reason: "feature not loaded".to_string(),
        })?;
        Ok(values.get(&node).cloned())
    }
}

/// Metadata-stripped content of a `.tf` file
struct FeatureFile {
    data: Vec<String>,
    /// 1-based line number of the first data line
    first_line: usize,
}

fn read_feature_file(path: &Path) -> Result<FeatureFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read Text-Fabric file {}", path.display()))?;
    let mut lines = content.lines().enumerate();
    let mut first_line = 1;
    // Metadata block: `@key` lines ended by one blank line
    for (i, line) in lines.by_ref() {
        first_line = i + 2;
        if line.is_empty() {
            break;
        }
        if !line.starts_with('@') {
            anyhow::bail!("{}: line {} is not metadata", path.display(), i + 1);
        }
    }
    Ok(FeatureFile {
        data: lines.map(|(_, line)| line.to_string()).collect(),
        first_line,
    })
}

/// `3`, `5-7`, `1,4-6`
fn parse_node_spec(spec: &str) -> Result<Vec<NodeId>> {
    let mut nodes = Vec::new();
    for part in spec.split(',') {
        match part.split_once('-') {
            Some((a, b)) => {
                let a: NodeId = a.trim().parse()?;
                let b: NodeId = b.trim().parse()?;
                if b < a {
                    anyhow::bail!("Descending node range {part}");
                }
                nodes.extend(a..=b);
            }
            None => nodes.push(part.trim().parse()?),
        }
    }
    Ok(nodes)
}

fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Node feature lines: `value` for the next node, or `spec\tvalue`
fn parse_node_values(data: &[String], first_line: usize, first_node: NodeId) -> Result<HashMap<NodeId, String>> {
    let mut values = HashMap::new();
    let mut next = first_node;
    for (i, line) in data.iter().enumerate() {
        let (nodes, value) = match line.split_once('\t') {
            Some((spec, value)) => (
                parse_node_spec(spec).with_context(|| format!("line {}", first_line + i))?,
                value,
            ),
            None => (vec![next], line.as_str()),
        };
        if let Some(max) = nodes.iter().max() {
            next = max + 1;
        }
        if value.is_empty() {
            continue;
        }
        let value = unescape(value);
        for node in nodes {
            values.insert(node, value.clone());
        }
    }
    Ok(values)
}

fn build_types(data: &[String], first_line: usize) -> Result<(Vec<String>, Vec<u16>)> {
    let values = parse_node_values(data, first_line, 1)?;
    let node_count = values.keys().max().copied().unwrap_or(0) as usize;
    let mut type_names: Vec<String> = Vec::new();
    let mut node_types = Vec::with_capacity(node_count);
    for node in 1..=node_count as NodeId {
        let name = values
            .get(&node)
            .with_context(|| format!("{OTYPE_FILE}: node {node} has no type"))?;
        let id = match type_names.iter().position(|t| t == name) {
            Some(id) => id,
            None => {
                type_names.push(name.clone());
                type_names.len() - 1
            }
        };
        node_types.push(id as u16);
    }
    if node_types.is_empty() {
        anyhow::bail!("{OTYPE_FILE} declares no nodes");
    }
    Ok((type_names, node_types))
}

/// Edge lines: `slots` for the next node, or `node\tslots`; numbering starts after the last slot
fn build_oslots(data: &[String], first_line: usize, max_slot: NodeId, node_count: usize) -> Result<Vec<Vec<NodeId>>> {
    let mut oslots = vec![Vec::new(); node_count.saturating_sub(max_slot as usize)];
    let mut next = max_slot + 1;
    for (i, line) in data.iter().enumerate() {
        let context = || format!("{OSLOTS_FILE} line {}", first_line + i);
        let (node, slots) = match line.split_once('\t') {
            Some((node, slots)) => (node.trim().parse::<NodeId>().with_context(context)?, slots),
            None => (next, line.as_str()),
        };
        next = node + 1;
        if node <= max_slot || node as usize > node_count {
            anyhow::bail!("{}: node {} is outside the non-slot range", context(), node);
        }
        let mut slots = parse_node_spec(slots).with_context(context)?;
        slots.sort_unstable();
        slots.dedup();
        oslots[(node - max_slot - 1) as usize] = slots;
    }
    Ok(oslots)
}
