//! Tree assembler
//!
//! Write path: validates structural invariants over a parsed row batch and
//! performs an atomic full-table replace, resolving parent names to the
//! identifiers assigned earlier in the same pass. Read path: reconstructs
//! the nested tree (or the flat node list) from the persisted rows.

use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::NodeRow;
use crate::entity::organization_node::{self, TreeNode};
use crate::error::{AppError, AppResult};

pub struct TreeAssembler {
    db: DatabaseConnection,
}

impl TreeAssembler {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Structural validation over the whole batch: no negative levels, a
    /// root row must exist, and the distinct levels must form a contiguous
    /// range starting at 0.
    pub fn validate(rows: &[NodeRow]) -> AppResult<()> {
        if let Some(row) = rows.iter().find(|r| r.level < 0) {
            return Err(AppError::Validation(format!(
                "节点\"{}\"的层级无效：{}",
                row.name, row.level
            )));
        }

        if !rows.iter().any(|r| r.level == 0) {
            return Err(AppError::Validation(
                "缺少根节点（层级为0的节点）".to_string(),
            ));
        }

        let levels: HashSet<i32> = rows.iter().map(|r| r.level).collect();
        let max_level = levels.iter().copied().max().unwrap_or(0);
        for level in 1..=max_level {
            if !levels.contains(&level) {
                return Err(AppError::Validation(format!(
                    "层级不连续：缺少层级{}",
                    level
                )));
            }
        }

        Ok(())
    }

    /// Atomic full-table replace. Rows are inserted sorted by
    /// (level, order_index) so every parent is materialized before any child
    /// that references it; parent names resolve through a name→id map built
    /// during the same pass. Duplicate names are last-wins: a later row
    /// overwrites the earlier one as the resolution target. Any insert
    /// failure rolls the transaction back, leaving the previous tree intact.
    pub async fn replace(&self, rows: &[NodeRow]) -> AppResult<u64> {
        let mut sorted: Vec<&NodeRow> = rows.iter().collect();
        sorted.sort_by(|a, b| a.level.cmp(&b.level).then(a.order_index.cmp(&b.order_index)));

        let txn = self.db.begin().await?;

        organization_node::Entity::delete_many().exec(&txn).await?;

        let mut name_to_id: HashMap<&str, i64> = HashMap::new();
        let now = chrono::Utc::now();

        for row in &sorted {
            let parent_id = row
                .parent_name
                .as_deref()
                .and_then(|p| name_to_id.get(p))
                .copied();

            let personnel = row
                .personnel
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            let node = organization_node::ActiveModel {
                name: Set(row.name.clone()),
                node_type: Set(row.node_type.as_str().to_string()),
                parent_id: Set(parent_id),
                level: Set(row.level),
                order_index: Set(row.order_index),
                leader_name: Set(row.leader_name.clone()),
                personnel: Set(personnel),
                description: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            let inserted = node.insert(&txn).await?;
            name_to_id.insert(row.name.as_str(), inserted.id);
        }

        txn.commit().await?;

        Ok(sorted.len() as u64)
    }

    /// Reconstruct the nested tree from persisted rows, or None when the
    /// table is empty. The first level-0 node (in (level, order_index)
    /// order) becomes the root; children are sorted by order_index at every
    /// depth.
    pub async fn get_tree(&self) -> AppResult<Option<TreeNode>> {
        let nodes = self.ordered_nodes().await?;
        if nodes.is_empty() {
            return Ok(None);
        }

        let mut root: Option<organization_node::Model> = None;
        let mut children: HashMap<i64, Vec<organization_node::Model>> = HashMap::new();

        for node in nodes {
            if root.is_none() && node.level == 0 {
                root = Some(node);
            } else if let Some(parent_id) = node.parent_id {
                children.entry(parent_id).or_default().push(node);
            }
            // Nodes without a resolvable parent (and any extra level-0 rows)
            // are unreachable from the root and drop out of the tree
        }

        Ok(root.map(|model| Self::build_subtree(model, &mut children)))
    }

    fn build_subtree(
        model: organization_node::Model,
        children: &mut HashMap<i64, Vec<organization_node::Model>>,
    ) -> TreeNode {
        let mut node = TreeNode::from(model);
        let mut kids = children.remove(&node.id).unwrap_or_default();
        kids.sort_by_key(|m| m.order_index);
        node.children = kids
            .into_iter()
            .map(|m| Self::build_subtree(m, children))
            .collect();
        node
    }

    /// All nodes as a flat list ordered by (level, order_index)
    pub async fn get_all_nodes(&self) -> AppResult<Vec<organization_node::Model>> {
        self.ordered_nodes().await
    }

    pub async fn get_node_by_id(&self, id: i64) -> AppResult<Option<organization_node::Model>> {
        Ok(organization_node::Entity::find()
            .filter(organization_node::Column::Id.eq(id))
            .one(&self.db)
            .await?)
    }

    async fn ordered_nodes(&self) -> AppResult<Vec<organization_node::Model>> {
        Ok(organization_node::Entity::find()
            .order_by_asc(organization_node::Column::Level)
            .order_by_asc(organization_node::Column::OrderIndex)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_and_migrate;
    use crate::entity::organization_node::NodeType;
    use crate::org::PersonnelMember;

    fn row(name: &str, level: i32, order: i32, parent: Option<&str>) -> NodeRow {
        NodeRow {
            name: name.to_string(),
            node_type: NodeType::Department,
            level,
            order_index: order,
            leader_name: None,
            parent_name: parent.map(str::to_string),
            personnel: None,
        }
    }

    fn sample_rows() -> Vec<NodeRow> {
        vec![
            NodeRow {
                name: "寺务委员会".to_string(),
                node_type: NodeType::Committee,
                level: 0,
                order_index: 1,
                leader_name: Some("释一".to_string()),
                parent_name: None,
                personnel: Some(vec![PersonnelMember {
                    name: "张三".to_string(),
                    position: Some("组长".to_string()),
                }]),
            },
            row("监院一", 1, 2, Some("寺务委员会")),
            row("方丈办公室", 1, 1, Some("寺务委员会")),
            row("客堂", 2, 1, Some("监院一")),
        ]
    }

    async fn assembler() -> TreeAssembler {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        TreeAssembler::new(db)
    }

    #[test]
    fn test_validate_requires_root() {
        let rows = vec![row("a", 1, 1, None)];
        let err = TreeAssembler::validate(&rows).unwrap_err();
        assert!(err.to_string().contains("缺少根节点"));
    }

    #[test]
    fn test_validate_rejects_negative_level() {
        // Negative levels would only surface later as a storage failure, so
        // they must be rejected up front with a readable message
        let rows = vec![row("根", 0, 1, None), row("异常", -1, 1, None)];
        let err = TreeAssembler::validate(&rows).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("异常"), "got: {}", err);
        assert!(err.to_string().contains("层级无效"), "got: {}", err);
    }

    #[test]
    fn test_validate_level_contiguity() {
        // {0, 1, 3} skips 2
        let rows = vec![row("a", 0, 1, None), row("b", 1, 1, None), row("c", 3, 1, None)];
        let err = TreeAssembler::validate(&rows).unwrap_err();
        assert!(err.to_string().contains("缺少层级2"), "got: {}", err);

        // {0, 1, 2} is fine
        let rows = vec![row("a", 0, 1, None), row("b", 1, 1, None), row("c", 2, 1, None)];
        assert!(TreeAssembler::validate(&rows).is_ok());
    }

    #[tokio::test]
    async fn test_replace_round_trip() {
        let assembler = assembler().await;
        let rows = sample_rows();

        let count = assembler.replace(&rows).await.unwrap();
        assert_eq!(count, 4);

        let nodes = assembler.get_all_nodes().await.unwrap();
        assert_eq!(nodes.len(), rows.len());

        for input in &rows {
            let stored = nodes.iter().find(|n| n.name == input.name).unwrap();
            assert_eq!(stored.node_type, input.node_type.as_str());
            assert_eq!(stored.level, input.level);
            assert_eq!(stored.order_index, input.order_index);
            assert_eq!(stored.leader_name, input.leader_name);
            let stored_personnel: Option<Vec<PersonnelMember>> = stored
                .personnel
                .as_deref()
                .map(|p| serde_json::from_str(p).unwrap());
            assert_eq!(stored_personnel, input.personnel);
            assert_eq!(stored.description, None);
        }
    }

    #[tokio::test]
    async fn test_parent_linkage() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();

        let nodes = assembler.get_all_nodes().await.unwrap();
        let id_of = |name: &str| nodes.iter().find(|n| n.name == name).unwrap().id;

        let root = nodes.iter().find(|n| n.name == "寺务委员会").unwrap();
        assert_eq!(root.parent_id, None);

        let office = nodes.iter().find(|n| n.name == "方丈办公室").unwrap();
        assert_eq!(office.parent_id, Some(id_of("寺务委员会")));

        let hall = nodes.iter().find(|n| n.name == "客堂").unwrap();
        assert_eq!(hall.parent_id, Some(id_of("监院一")));
    }

    #[tokio::test]
    async fn test_replace_discards_previous_tree() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();

        let rows = vec![row("新根", 0, 1, None)];
        let count = assembler.replace(&rows).await.unwrap();
        assert_eq!(count, 1);

        let nodes = assembler.get_all_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "新根");
    }

    #[tokio::test]
    async fn test_replace_atomicity_on_mid_batch_fault() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();
        let before = assembler.get_all_nodes().await.unwrap();

        // The empty name violates the table's CHECK constraint; sorted by
        // (level, order_index) the failing insert comes after two successes
        let bad = vec![
            row("根", 0, 1, None),
            row("部门甲", 1, 1, Some("根")),
            row("", 1, 2, Some("根")),
        ];
        assert!(assembler.replace(&bad).await.is_err());

        let after = assembler.get_all_nodes().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_get_tree_structure_and_child_order() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();

        let tree = assembler.get_tree().await.unwrap().unwrap();
        assert_eq!(tree.name, "寺务委员会");
        assert_eq!(tree.level, 0);

        // Children ordered by order_index, not input order
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["方丈办公室", "监院一"]);

        let jianyuan = &tree.children[1];
        assert_eq!(jianyuan.children.len(), 1);
        assert_eq!(jianyuan.children[0].name, "客堂");
        assert!(jianyuan.children[0].children.is_empty());
    }

    #[tokio::test]
    async fn test_get_tree_idempotent() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();

        let first = assembler.get_tree().await.unwrap().unwrap();
        let second = assembler.get_tree().await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_tree_empty_table() {
        let assembler = assembler().await;
        assert!(assembler.get_tree().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_node_by_id() {
        let assembler = assembler().await;
        assembler.replace(&sample_rows()).await.unwrap();

        let nodes = assembler.get_all_nodes().await.unwrap();
        let found = assembler.get_node_by_id(nodes[0].id).await.unwrap();
        assert_eq!(found.unwrap().name, nodes[0].name);

        assert!(assembler.get_node_by_id(-1).await.unwrap().is_none());
    }

    /// Documents the name-collision behavior: when two rows share a name,
    /// the later-inserted row wins as the resolution target, so a child
    /// referencing that name links to the duplicate inserted last.
    #[tokio::test]
    async fn test_duplicate_names_last_wins() {
        let assembler = assembler().await;
        let rows = vec![
            row("根", 0, 1, None),
            row("办公室", 1, 1, Some("根")),
            row("办公室", 1, 2, Some("根")),
            row("档案组", 2, 1, Some("办公室")),
        ];
        assembler.replace(&rows).await.unwrap();

        let nodes = assembler.get_all_nodes().await.unwrap();
        let offices: Vec<&organization_node::Model> =
            nodes.iter().filter(|n| n.name == "办公室").collect();
        assert_eq!(offices.len(), 2);
        let later_office = offices.iter().max_by_key(|n| n.order_index).unwrap();

        let archive = nodes.iter().find(|n| n.name == "档案组").unwrap();
        assert_eq!(archive.parent_id, Some(later_office.id));
    }
}
