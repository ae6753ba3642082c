//! Organization node entity - 组织架构节点表
//!
//! 表名: organization_nodes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 节点类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// 委员会
    Committee,
    /// 职位
    Position,
    /// 部门
    Department,
    /// 子部门
    SubDepartment,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Committee => "committee",
            NodeType::Position => "position",
            NodeType::Department => "department",
            NodeType::SubDepartment => "sub_department",
        }
    }

    /// Map a human-entered type label (Chinese or English, case-insensitive)
    /// to a node type. Unrecognized labels default to Department.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "委员会" | "committee" => NodeType::Committee,
            "职位" | "position" => NodeType::Position,
            "部门" | "department" => NodeType::Department,
            "子部门" | "sub_department" => NodeType::SubDepartment,
            _ => NodeType::Department,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization_nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 节点名称 (非空)
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 节点类型: committee / position / department / sub_department
    #[sea_orm(column_name = "type", column_type = "String(Some(16))")]
    #[serde(rename = "type")]
    pub node_type: String,

    /// 父节点ID (根节点为 NULL)
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    /// 层级深度 (根节点为 0)
    pub level: i32,

    /// 兄弟节点排序
    pub order_index: i32,

    /// 负责人
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub leader_name: Option<String>,

    /// 人员列表 (JSON 数组: [{"name": ..., "position": ...}])
    #[sea_orm(column_type = "Text", nullable)]
    pub personnel: Option<String>,

    /// 描述 (导入时始终为空)
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 自引用父子关系通过手动查询处理

impl ActiveModelBehavior for ActiveModel {}

/// 组织架构树节点 (用于API响应)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent_id: Option<i64>,
    pub level: i32,
    pub order_index: i32,
    pub leader_name: Option<String>,
    pub personnel: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub children: Vec<TreeNode>,
}

impl From<Model> for TreeNode {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            node_type: model.node_type,
            parent_id: model.parent_id,
            level: model.level,
            order_index: model.order_index,
            leader_name: model.leader_name,
            personnel: model.personnel,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_label_mapping() {
        assert_eq!(NodeType::from_label("委员会"), NodeType::Committee);
        assert_eq!(NodeType::from_label("职位"), NodeType::Position);
        assert_eq!(NodeType::from_label("部门"), NodeType::Department);
        assert_eq!(NodeType::from_label("子部门"), NodeType::SubDepartment);
        assert_eq!(NodeType::from_label("COMMITTEE"), NodeType::Committee);
        assert_eq!(NodeType::from_label(" position "), NodeType::Position);
        // Unrecognized labels fall back to department
        assert_eq!(NodeType::from_label("小组"), NodeType::Department);
        assert_eq!(NodeType::from_label(""), NodeType::Department);
    }
}
