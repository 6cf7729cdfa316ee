//! Equipment tree handling: construction, pre-order flattening for bulk
//! insert, reassembly from parent-id adjacency, and cascade ordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::equipment::{Attachment, CreateEquipment, Equipment};

/// Build a persisted-shape tree from a create request. Every node gets a
/// fresh id and `created_at`, and each child's `parent_id` points at the
/// node it was nested under.
pub fn build_tree(data: &CreateEquipment, parent_id: Option<Uuid>, now: DateTime<Utc>) -> Equipment {
    let id = Uuid::new_v4();

    let attachments = data
        .attachments
        .iter()
        .map(|a| Attachment {
            id: Uuid::new_v4(),
            equipment_id: id,
            file_name: a.file_name.clone(),
            content_type: a.content_type.clone(),
            size_bytes: a.size_bytes,
            created_at: now,
        })
        .collect();

    let components = data
        .components
        .iter()
        .map(|component| build_tree(component, Some(id), now))
        .collect();

    Equipment {
        id,
        parent_id,
        name: data.name.clone(),
        model: data.model.clone(),
        serial_number: data.serial_number.clone(),
        manufacturer: data.manufacturer.clone(),
        quantity: data.quantity.unwrap_or(1),
        security_level_id: data.security_level_id,
        executor_id: data.executor_id,
        created_at: now,
        updated_at: None,
        inspection_method_ids: data.inspection_method_ids.clone(),
        attachments,
        components,
    }
}

/// Flatten trees depth-first, pre-order: each node is followed by its
/// components in order. Output nodes have empty `components`; `parent_id`
/// is taken as-is.
pub fn flatten(roots: impl IntoIterator<Item = Equipment>) -> Vec<Equipment> {
    let mut out = Vec::new();
    for root in roots {
        flatten_into(root, &mut out);
    }
    out
}

fn flatten_into(mut node: Equipment, out: &mut Vec<Equipment>) {
    let components = std::mem::take(&mut node.components);
    out.push(node);
    for component in components {
        flatten_into(component, out);
    }
}

/// Number of nodes in a tree, root included
pub fn count_nodes(root: &Equipment) -> usize {
    1 + root.components.iter().map(count_nodes).sum::<usize>()
}

/// Rebuild every tree in `nodes` whose root has no parent in the set
pub fn assemble_forest(nodes: Vec<Equipment>) -> Vec<Equipment> {
    let present: std::collections::HashSet<Uuid> = nodes.iter().map(|n| n.id).collect();
    let mut children = group_by_parent(nodes);

    let roots: Vec<Equipment> = children
        .iter_mut()
        .filter(|(parent, _)| match parent {
            None => true,
            Some(parent) => !present.contains(parent),
        })
        .flat_map(|(_, nodes)| std::mem::take(nodes))
        .collect();

    let mut roots: Vec<Equipment> = roots
        .into_iter()
        .map(|root| attach_components(root, &mut children))
        .collect();
    roots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
    roots
}

/// Rebuild the tree rooted at `root_id` from a flat node set
pub fn assemble(root_id: Uuid, nodes: Vec<Equipment>) -> Option<Equipment> {
    let mut children = group_by_parent(nodes);
    let root = children
        .values_mut()
        .find_map(|siblings| {
            let pos = siblings.iter().position(|n| n.id == root_id)?;
            Some(siblings.remove(pos))
        })?;
    Some(attach_components(root, &mut children))
}

fn group_by_parent(nodes: Vec<Equipment>) -> HashMap<Option<Uuid>, Vec<Equipment>> {
    let mut children: HashMap<Option<Uuid>, Vec<Equipment>> = HashMap::new();
    for node in nodes {
        children.entry(node.parent_id).or_default().push(node);
    }
    children
}

fn attach_components(mut node: Equipment, children: &mut HashMap<Option<Uuid>, Vec<Equipment>>) -> Equipment {
    let direct = children.remove(&Some(node.id)).unwrap_or_default();
    node.components = direct
        .into_iter()
        .map(|child| attach_components(child, children))
        .collect();
    node
}

/// Ids of `root_id` and all its descendants found in `nodes`, ordered so
/// that every child precedes its parent (safe physical deletion order).
pub fn deletion_order(root_id: Uuid, nodes: &[Equipment]) -> Vec<Uuid> {
    let mut by_parent: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id {
            by_parent.entry(parent).or_default().push(node.id);
        }
    }

    let mut pre_order = Vec::new();
    let mut stack = vec![root_id];
    while let Some(id) = stack.pop() {
        pre_order.push(id);
        if let Some(kids) = by_parent.get(&id) {
            stack.extend(kids.iter().rev());
        }
    }
    pre_order.reverse();
    pre_order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, components: Vec<CreateEquipment>) -> CreateEquipment {
        CreateEquipment {
            name: name.into(),
            model: None,
            serial_number: None,
            manufacturer: None,
            quantity: None,
            security_level_id: None,
            executor_id: None,
            inspection_method_ids: Vec::new(),
            attachments: Vec::new(),
            components,
        }
    }

    fn rig() -> CreateEquipment {
        request(
            "rig",
            vec![
                request("pump", vec![request("seal", vec![]), request("impeller", vec![])]),
                request("valve", vec![]),
            ],
        )
    }

    #[test]
    fn test_build_tree_links_parents() {
        let tree = build_tree(&rig(), None, Utc::now());

        assert_eq!(tree.parent_id, None);
        assert_eq!(tree.quantity, 1);
        let pump = &tree.components[0];
        assert_eq!(pump.parent_id, Some(tree.id));
        assert_eq!(pump.components[0].parent_id, Some(pump.id));
        assert_eq!(count_nodes(&tree), 5);
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let tree = build_tree(&rig(), None, Utc::now());
        let flat = flatten(vec![tree]);

        let names: Vec<&str> = flat.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["rig", "pump", "seal", "impeller", "valve"]);
        assert!(flat.iter().all(|n| n.components.is_empty()));

        // every parent appears before its children
        for (pos, node) in flat.iter().enumerate() {
            if let Some(parent) = node.parent_id {
                let parent_pos = flat.iter().position(|n| n.id == parent).unwrap();
                assert!(parent_pos < pos);
            }
        }
    }

    #[test]
    fn test_assemble_round_trips_tree() {
        let tree = build_tree(&rig(), None, Utc::now());
        let root_id = tree.id;
        let flat = flatten(vec![tree.clone()]);

        let rebuilt = assemble(root_id, flat).unwrap();
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_assemble_subtree_from_middle() {
        let tree = build_tree(&rig(), None, Utc::now());
        let pump_id = tree.components[0].id;
        let flat = flatten(vec![tree]);

        let pump = assemble(pump_id, flat).unwrap();
        assert_eq!(pump.name, "pump");
        assert_eq!(count_nodes(&pump), 3);
        assert!(assemble(Uuid::new_v4(), Vec::new()).is_none());
    }

    #[test]
    fn test_assemble_forest_finds_roots() {
        let now = Utc::now();
        let a = build_tree(&rig(), None, now);
        let b = build_tree(&request("crane", vec![]), None, now);
        let forest = assemble_forest(flatten(vec![a, b]));

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.iter().map(count_nodes).sum::<usize>(), 6);
    }

    #[test]
    fn test_deletion_order_children_first() {
        let tree = build_tree(&rig(), None, Utc::now());
        let root_id = tree.id;
        let flat = flatten(vec![tree]);

        let order = deletion_order(root_id, &flat);
        assert_eq!(order.len(), 5);
        assert_eq!(*order.last().unwrap(), root_id);
        for node in &flat {
            if let Some(parent) = node.parent_id {
                let child_pos = order.iter().position(|id| *id == node.id).unwrap();
                let parent_pos = order.iter().position(|id| *id == parent).unwrap();
                assert!(child_pos < parent_pos);
            }
        }
    }

    #[test]
    fn test_deletion_order_leaf() {
        let leaf = build_tree(&request("gauge", vec![]), None, Utc::now());
        assert_eq!(deletion_order(leaf.id, &[leaf.clone()]), vec![leaf.id]);
    }
}
