//! User entity - 用户表
//!
//! 表名: users

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户角色
pub mod role {
    pub const USER: &str = "user";
    pub const ADMIN: &str = "admin";

    /// Normalize free-form role input, anything but "admin" becomes "user"
    pub fn normalize(input: &str) -> &'static str {
        if input == ADMIN {
            ADMIN
        } else {
            USER
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户名 (唯一)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub username: String,

    /// 密码 (bcrypt 哈希)
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    /// 用户角色: user 或 admin
    #[sea_orm(column_type = "String(Some(16))")]
    pub role: String,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == role::ADMIN
    }
}

/// 用户响应 (不含密码)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl From<Model> for UserResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalize() {
        assert_eq!(role::normalize("admin"), "admin");
        assert_eq!(role::normalize("user"), "user");
        assert_eq!(role::normalize("superuser"), "user");
    }
}
