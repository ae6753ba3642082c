//! Regulation file entity - 规章制度文件表
//!
//! 表名: regulation_files

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 允许的部门分类 (闭集)
pub const DEPARTMENTS: [&str; 6] = ["方丈办公室", "维那", "监院一", "监院二", "监院三", "管理办法"];

/// Check whether a department tag belongs to the fixed closed set
pub fn is_valid_department(department: &str) -> bool {
    DEPARTMENTS.contains(&department)
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "regulation_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 所属部门
    #[sea_orm(column_type = "String(Some(32))")]
    pub department: String,

    /// 存储文件名
    #[sea_orm(column_type = "String(Some(255))")]
    pub file_name: String,

    /// 原始文件名
    #[sea_orm(column_type = "String(Some(255))")]
    pub original_name: String,

    /// 存储路径
    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    /// 文件大小 (字节)
    pub file_size: i64,

    /// MIME 类型或扩展名
    #[sea_orm(column_type = "String(Some(128))")]
    pub file_type: String,

    /// 上传者用户ID
    pub uploaded_by: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// uploaded_by 外键通过建表 DDL 声明，跨模块查询手动处理

impl ActiveModelBehavior for ActiveModel {}
