//! Entity module - SeaORM 实体定义
//!
//! 包含所有数据库表对应的实体模型

pub mod organization_node;
pub mod regulation_file;
pub mod user;
